//! Sheet calculation engine
//!
//! A [`Sheet`] owns a grid together with the display string of every formula cell.
//! Editing a cell recomputes only what the edit can change: the cell itself, the
//! formula cells that read it (transitively, in dependency order) and the volatile
//! cells. Every recomputed cell goes through [`compute_cell_with_options`], so the
//! cache always matches a full recompute.
//!
//! # Example
//!
//! ```rust
//! use cellcalc::{CalculationOptions, CellAddress, Grid, Sheet};
//!
//! let grid = Grid::from_rows(vec![vec!["5", "=A1*2", "=B1+10"]]);
//! let mut sheet = Sheet::new(grid, CalculationOptions::default());
//! assert_eq!(sheet.display(CellAddress::new(0, 2)), "20");
//!
//! let stats = sheet.set_cell("A1", "7").unwrap();
//! assert_eq!(stats.cells_calculated, 2);
//! assert_eq!(sheet.display(CellAddress::new(0, 2)), "24");
//! ```

use crate::{
    compute_cell_with_options, CellAddress, CellContent, CellError, DependencyGraph,
    EvaluationOptions, Grid, Result,
};
use std::collections::{HashMap, HashSet};

/// Options for sheet calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculationOptions {
    /// Options handed to every cell evaluation
    pub evaluation: EvaluationOptions,
    /// Include volatile functions (RAND, TODAY, ...) in every incremental update
    pub recalculate_volatile: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            evaluation: EvaluationOptions::default(),
            recalculate_volatile: true,
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells in the sheet
    pub formula_count: usize,
    /// Number of cells calculated
    pub cells_calculated: usize,
    /// Number of volatile cells recalculated
    pub volatile_cells: usize,
    /// Number of calculated cells showing `#CIRC!`
    pub circular_references: usize,
    /// Number of calculated cells showing any error code
    pub errors: usize,
}

/// A grid with cached display values
#[derive(Debug, Clone)]
pub struct Sheet {
    grid: Grid,
    options: CalculationOptions,
    graph: DependencyGraph,
    /// Display strings of formula cells; literals display as their raw text
    values: HashMap<CellAddress, String>,
}

impl Sheet {
    /// Create a sheet and compute every formula cell
    pub fn new(grid: Grid, options: CalculationOptions) -> Self {
        Self::new_with_stats(grid, options).0
    }

    /// Create a sheet, returning the statistics of its initial calculation
    pub fn new_with_stats(grid: Grid, options: CalculationOptions) -> (Self, CalculationStats) {
        let graph = DependencyGraph::from_grid(&grid);
        let mut sheet = Self {
            grid,
            options,
            graph,
            values: HashMap::new(),
        };
        let stats = sheet.recalculate();
        (sheet, stats)
    }

    /// The underlying grid
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Calculation options
    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    /// The dependency graph of the formula cells
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Display string of a cell
    pub fn display(&self, addr: CellAddress) -> &str {
        match self.values.get(&addr) {
            Some(value) => value,
            None => self.grid.raw(addr),
        }
    }

    /// Display strings of the whole used rectangle
    pub fn display_grid(&self) -> Vec<Vec<String>> {
        (0..self.grid.row_count())
            .map(|row| {
                (0..self.grid.col_count())
                    .map(|col| self.display(CellAddress::new(row, col)).to_string())
                    .collect()
            })
            .collect()
    }

    /// Recompute every formula cell
    pub fn recalculate(&mut self) -> CalculationStats {
        self.values.clear();

        let formulas: Vec<CellAddress> = self
            .grid
            .cells()
            .filter(|(_, raw)| CellContent::classify(raw).is_formula())
            .map(|(addr, _)| addr)
            .collect();

        let mut stats = CalculationStats {
            volatile_cells: self.graph.volatile_cells().len(),
            ..Default::default()
        };
        self.compute_cells(&formulas, &mut stats);

        tracing::debug!(
            cells = stats.cells_calculated,
            errors = stats.errors,
            "full recalculation"
        );
        stats
    }

    /// Edit a cell given its A1 label, then recompute what the edit affects
    pub fn set_cell(&mut self, label: &str, raw: impl Into<String>) -> Result<CalculationStats> {
        let addr = CellAddress::parse(label)?;
        Ok(self.set_cell_at(addr, raw))
    }

    /// Edit a cell, then recompute what the edit affects
    pub fn set_cell_at(&mut self, addr: CellAddress, raw: impl Into<String>) -> CalculationStats {
        let raw = raw.into();
        self.graph.set_formula(addr, &raw);
        self.grid.set(addr, raw);
        self.values.remove(&addr);

        // The edited cell first, then its dependents in order, then volatile cells
        let mut order = Vec::new();
        if CellContent::classify(self.grid.raw(addr)).is_formula() {
            order.push(addr);
        }
        order.extend(self.graph.affected_by(addr));

        let mut stats = CalculationStats::default();
        if self.options.recalculate_volatile {
            let scheduled: HashSet<CellAddress> = order.iter().copied().collect();
            let volatile: Vec<CellAddress> = self
                .graph
                .volatile_cells()
                .into_iter()
                .filter(|cell| !scheduled.contains(cell))
                .collect();
            stats.volatile_cells = volatile.len();
            order.extend(volatile);
        }

        self.compute_cells(&order, &mut stats);

        tracing::debug!(
            cell = %addr,
            cells = stats.cells_calculated,
            "incremental recalculation"
        );
        stats
    }

    fn compute_cells(&mut self, cells: &[CellAddress], stats: &mut CalculationStats) {
        for &addr in cells {
            let display = compute_cell_with_options(addr, &self.grid, &self.options.evaluation);

            match CellError::from_str(&display) {
                Some(CellError::Circ) => {
                    stats.circular_references += 1;
                    stats.errors += 1;
                }
                Some(_) => stats.errors += 1,
                None => {}
            }

            stats.cells_calculated += 1;
            self.values.insert(addr, display);
        }
        stats.formula_count = self.graph.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(label: &str) -> CellAddress {
        CellAddress::parse(label).unwrap()
    }

    #[test]
    fn test_simple_calculation() {
        let grid = Grid::from_rows(vec![vec!["10"], vec!["20"], vec!["=A1+A2"]]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());

        let stats = sheet.recalculate();
        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(stats.errors, 0);

        assert_eq!(sheet.display(at("A3")), "30");
        assert_eq!(sheet.display(at("A1")), "10");
    }

    #[test]
    fn test_new_with_stats() {
        let grid = Grid::from_rows(vec![vec!["2", "=A1*3", "=1/0", "=RAND()"]]);
        let (sheet, stats) = Sheet::new_with_stats(grid, CalculationOptions::default());

        assert_eq!(
            stats,
            CalculationStats {
                formula_count: 3,
                cells_calculated: 3,
                volatile_cells: 1,
                circular_references: 0,
                errors: 1,
            }
        );
        assert_eq!(sheet.display(at("B1")), "6");
        assert_eq!(sheet.display(at("C1")), "#DIV/0!");
    }

    #[test]
    fn test_chain_calculation() {
        let grid = Grid::from_rows(vec![
            vec!["5"],
            vec!["=A1*2"],
            vec!["=A2+10"],
            vec!["=A3*A1"],
        ]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());

        // A2 = 5*2 = 10
        assert_eq!(sheet.display(at("A2")), "10");
        // A3 = 10+10 = 20
        assert_eq!(sheet.display(at("A3")), "20");
        // A4 = 20*5 = 100
        assert_eq!(sheet.display(at("A4")), "100");

        let stats = sheet.set_cell("A1", "1").unwrap();
        assert_eq!(stats.cells_calculated, 3);
        assert_eq!(sheet.display(at("A4")), "12");
    }

    #[test]
    fn test_sum_range() {
        let grid = Grid::from_rows(vec![
            vec!["1"],
            vec!["2"],
            vec!["3"],
            vec!["4"],
            vec!["=SUM(A1:A4)"],
        ]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());
        assert_eq!(sheet.display(at("A5")), "10");

        sheet.set_cell("A3", "30").unwrap();
        assert_eq!(sheet.display(at("A5")), "37");
    }

    #[test]
    fn test_unrelated_cells_are_not_recomputed() {
        let grid = Grid::from_rows(vec![vec!["1", "=A1+1", "7", "=C1*2"]]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());

        let stats = sheet.set_cell("C1", "8").unwrap();
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(sheet.display(at("D1")), "16");
        assert_eq!(sheet.display(at("B1")), "2");
    }

    #[test]
    fn test_formula_replaced_by_literal() {
        let grid = Grid::from_rows(vec![vec!["=1+1", "=A1*10"]]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());
        assert_eq!(sheet.display(at("B1")), "20");

        let stats = sheet.set_cell("A1", "hello").unwrap();
        assert_eq!(stats.formula_count, 1);
        assert_eq!(sheet.display(at("A1")), "hello");
        assert_eq!(sheet.display(at("B1")), "#VALUE!");
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_circular_reference_stats() {
        let grid = Grid::from_rows(vec![vec!["=B1", "=A1", "=1/0"]]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());

        let stats = sheet.recalculate();
        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.errors, 3);
        assert_eq!(sheet.display(at("A1")), "#CIRC!");

        // Breaking the cycle fixes both cells
        sheet.set_cell("B1", "4").unwrap();
        assert_eq!(sheet.display(at("A1")), "4");
    }

    #[test]
    fn test_volatile_cells_recompute() {
        let grid = Grid::from_rows(vec![vec!["1", "=RAND()", "=TODAY()"]]);
        let mut sheet = Sheet::new(grid, CalculationOptions::default());

        let stats = sheet.set_cell("A1", "2").unwrap();
        assert_eq!(stats.volatile_cells, 2);
        assert_eq!(stats.cells_calculated, 2);

        let options = CalculationOptions {
            recalculate_volatile: false,
            ..CalculationOptions::default()
        };
        let mut sheet = Sheet::new(sheet.grid().clone(), options);
        let stats = sheet.set_cell("A1", "3").unwrap();
        assert_eq!(stats.cells_calculated, 0);
    }

    #[test]
    fn test_set_cell_grows_grid() {
        let mut sheet = Sheet::new(Grid::new(), CalculationOptions::default());
        sheet.set_cell("C3", "=2^3").unwrap();
        assert_eq!(sheet.display(at("C3")), "8");
        assert_eq!(sheet.display_grid().len(), 3);
        assert!(sheet.set_cell("3C", "1").is_err());
    }
}
