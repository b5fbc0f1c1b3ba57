//! Grid snapshot of raw cell strings

use crate::cell::{CellAddress, CellRange};

/// A rectangular snapshot of raw cell strings, stored row by row
///
/// Rows may have differing lengths; any cell outside the stored data reads as the
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Create an empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a grid from rows of raw cell strings
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    /// Get the raw string at an address
    pub fn raw(&self, addr: CellAddress) -> &str {
        self.raw_at(addr.row, addr.col)
    }

    /// Get the raw string at 0-based row/column indices
    pub fn raw_at(&self, row: u32, col: u16) -> &str {
        self.rows
            .get(row as usize)
            .and_then(|r| r.get(col as usize))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Set the raw string at an address, growing the grid as needed
    pub fn set(&mut self, addr: CellAddress, raw: impl Into<String>) {
        let row = addr.row as usize;
        let col = addr.col as usize;
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, String::new);
        }
        cells[col] = raw.into();
    }

    /// Number of stored rows
    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Width of the widest stored row
    pub fn col_count(&self) -> u16 {
        self.rows.iter().map(Vec::len).max().unwrap_or(0) as u16
    }

    /// The range covering every stored cell, if any
    pub fn used_range(&self) -> Option<CellRange> {
        let rows = self.row_count();
        let cols = self.col_count();
        if rows == 0 || cols == 0 {
            return None;
        }
        Some(CellRange::from_indices(0, 0, rows - 1, cols - 1))
    }

    /// Iterate over the stored rows
    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Iterate over every stored cell with its address
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &str)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, raw)| (CellAddress::new(r as u32, c as u16), raw.as_str()))
        })
    }
}
