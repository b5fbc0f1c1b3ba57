//! Dependency tracking for formula calculation
//!
//! Records, for every formula cell of a grid, the cells and ranges it reads. The
//! graph answers "what must be recomputed when this cell changes" without touching
//! the evaluator: it only orders work, every recomputed cell is still evaluated
//! from scratch.

use crate::ast::FormulaExpr;
use crate::evaluator::function_registry;
use crate::parser::parse_formula;
use ahash::{AHashMap, AHashSet};
use cellcalc_core::{CellAddress, CellContent, CellRange, Grid};

/// Cells and ranges read by a parsed formula, in order of appearance, without repeats
///
/// A single-cell reference is reported as a one-cell range.
pub fn references(expr: &FormulaExpr) -> Vec<CellRange> {
    let mut refs = Vec::new();
    expr.walk(&mut |node| {
        let range = match node {
            FormulaExpr::CellRef(addr) => CellRange::single(*addr),
            FormulaExpr::RangeRef(range) => *range,
            _ => return,
        };
        if !refs.contains(&range) {
            refs.push(range);
        }
    });
    refs
}

/// Check whether a parsed formula calls a volatile function (RAND, TODAY, ...)
pub fn is_volatile(expr: &FormulaExpr) -> bool {
    let registry = function_registry();
    let mut volatile = false;
    expr.walk(&mut |node| {
        if let FormulaExpr::Function { name, .. } = node {
            volatile |= registry.is_volatile(name);
        }
    });
    volatile
}

/// Dependency graph for the formula cells of a grid
///
/// Precedents are kept as ranges, so a formula such as `=SUM(A1:A100000)` costs one
/// entry rather than one per cell. Single-cell references are also indexed in reverse,
/// so finding the readers of a cell only scans the multi-cell ranges.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Formula cell → ranges it reads
    precedents: AHashMap<CellAddress, Vec<CellRange>>,
    /// Cell → formula cells reading it through a single-cell reference
    readers: AHashMap<CellAddress, AHashSet<CellAddress>>,
    /// Formula cell → multi-cell ranges it reads
    spans: AHashMap<CellAddress, Vec<CellRange>>,
    /// Formula cells calling a volatile function
    volatile: AHashSet<CellAddress>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every formula cell of a grid
    pub fn from_grid(grid: &Grid) -> Self {
        let mut graph = Self::new();
        for (addr, raw) in grid.cells() {
            graph.set_formula(addr, raw);
        }
        tracing::debug!(
            formulas = graph.len(),
            volatile = graph.volatile.len(),
            "built dependency graph"
        );
        graph
    }

    /// Record the raw content of a cell, replacing whatever was recorded before
    ///
    /// Literals and unparseable formulas have no precedents.
    pub fn set_formula(&mut self, addr: CellAddress, raw: &str) {
        self.remove_formula(addr);

        let CellContent::Formula(body) = CellContent::classify(raw) else {
            return;
        };

        match parse_formula(body) {
            Ok(expr) => {
                if is_volatile(&expr) {
                    self.volatile.insert(addr);
                }
                let refs = references(&expr);
                for range in &refs {
                    if range.start == range.end {
                        self.readers.entry(range.start).or_default().insert(addr);
                    } else {
                        self.spans.entry(addr).or_default().push(*range);
                    }
                }
                self.precedents.insert(addr, refs);
            }
            Err(e) => {
                tracing::trace!(cell = %addr, error = %e, "formula does not parse, no precedents");
                self.precedents.insert(addr, Vec::new());
            }
        }
    }

    fn remove_formula(&mut self, addr: CellAddress) {
        self.volatile.remove(&addr);
        self.spans.remove(&addr);

        let Some(old) = self.precedents.remove(&addr) else {
            return;
        };
        for range in old.iter().filter(|r| r.start == r.end) {
            if let Some(readers) = self.readers.get_mut(&range.start) {
                readers.remove(&addr);
                if readers.is_empty() {
                    self.readers.remove(&range.start);
                }
            }
        }
    }

    /// Ranges the given cell reads (empty for literals)
    pub fn precedents_of(&self, addr: CellAddress) -> &[CellRange] {
        self.precedents
            .get(&addr)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Formula cells that read the given cell directly, in row-major order
    pub fn dependents_of(&self, addr: CellAddress) -> Vec<CellAddress> {
        let mut dependents: Vec<CellAddress> = self
            .readers
            .get(&addr)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        dependents.extend(
            self.spans
                .iter()
                .filter(|(_, ranges)| ranges.iter().any(|r| r.contains(&addr)))
                .map(|(&cell, _)| cell),
        );
        dependents.sort();
        dependents.dedup();
        dependents
    }

    /// Every formula cell that must be recomputed after `addr` changes
    ///
    /// Transitive, excludes `addr` itself, and ordered so that each cell comes after
    /// the cells it reads. Cycles are cut rather than followed forever.
    pub fn affected_by(&self, addr: CellAddress) -> Vec<CellAddress> {
        let mut order = Vec::new();
        let mut visited = AHashSet::new();
        visited.insert(addr);

        // Iterative post-order DFS; `true` marks a cell whose dependents are done
        let mut stack: Vec<(CellAddress, bool)> = self
            .dependents_of(addr)
            .into_iter()
            .rev()
            .map(|cell| (cell, false))
            .collect();

        while let Some((cell, expanded)) = stack.pop() {
            if expanded {
                order.push(cell);
                continue;
            }
            if !visited.insert(cell) {
                continue;
            }

            stack.push((cell, true));
            for dependent in self.dependents_of(cell).into_iter().rev() {
                if !visited.contains(&dependent) {
                    stack.push((dependent, false));
                }
            }
        }

        // Post-order puts dependents first
        order.reverse();
        order
    }

    /// Formula cells calling a volatile function, in row-major order
    pub fn volatile_cells(&self) -> Vec<CellAddress> {
        let mut cells: Vec<CellAddress> = self.volatile.iter().copied().collect();
        cells.sort();
        cells
    }

    /// Detect whether a cell reads itself, directly or through other formulas
    pub fn has_circular_reference(&self, addr: CellAddress) -> bool {
        let mut visited = AHashSet::new();
        let mut stack: Vec<CellAddress> = self.formula_precedents(addr);

        while let Some(cell) = stack.pop() {
            if cell == addr {
                return true;
            }
            if visited.insert(cell) {
                stack.extend(self.formula_precedents(cell));
            }
        }
        false
    }

    /// Formula cells inside the ranges a cell reads
    fn formula_precedents(&self, addr: CellAddress) -> Vec<CellAddress> {
        let mut cells = Vec::new();
        for range in self.precedents_of(addr) {
            if range.start == range.end {
                if self.precedents.contains_key(&range.start) {
                    cells.push(range.start);
                }
            } else {
                cells.extend(self.precedents.keys().filter(|cell| range.contains(cell)));
            }
        }
        cells
    }

    /// Number of formula cells tracked
    pub fn len(&self) -> usize {
        self.precedents.len()
    }

    /// Check if no formula cells are tracked
    pub fn is_empty(&self) -> bool {
        self.precedents.is_empty()
    }
}
