//! Minimal tabular data model for delimited exports.
//!
//! Rows are compounds, columns are descriptors. Cells stay as strings until
//! the filtering stage coerces them; only the identifier and label columns
//! have meaning to this type, everything else is opaque.

use std::path::Path;

use crate::error::{CribrumError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// Read a delimited file with a header row.
    ///
    /// Ragged rows are tolerated (the descriptor tool emits trailing empty
    /// cells on some rows); short rows are padded with empty strings.
    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                CribrumError::Pipeline(format!("failed to open {}: {}", path.display(), e))
            })?;

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Write as comma-delimited with a header row.
    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell values of a named column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<String>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CribrumError::Pipeline(format!("column '{}' not found", name)))?;
        Ok(self.rows.iter().map(|r| r[idx].clone()).collect())
    }

    /// Apply a transform to every cell of a named column.
    pub fn map_column<F: Fn(&str) -> String>(&mut self, name: &str, f: F) -> Result<()> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CribrumError::Pipeline(format!("column '{}' not found", name)))?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        let idx = self
            .column_index(old)
            .ok_or_else(|| CribrumError::Pipeline(format!("column '{}' not found", old)))?;
        self.headers[idx] = new.to_string();
        Ok(())
    }

    /// Drop the named columns; names that are absent are ignored.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<usize> = (0..self.headers.len())
            .filter(|&i| !names.contains(&self.headers[i].as_str()))
            .collect();
        if keep.len() == self.headers.len() {
            return;
        }
        self.headers = keep.iter().map(|&i| self.headers[i].clone()).collect();
        for row in &mut self.rows {
            *row = keep.iter().map(|&i| row[i].clone()).collect();
        }
    }

    /// Detach a column, returning its values.
    pub fn remove_column(&mut self, name: &str) -> Result<Vec<String>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| CribrumError::Pipeline(format!("column '{}' not found", name)))?;
        self.headers.remove(idx);
        Ok(self.rows.iter_mut().map(|r| r.remove(idx)).collect())
    }

    /// Insert a column at the given position.
    pub fn insert_column(&mut self, idx: usize, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(CribrumError::Pipeline(format!(
                "column '{}' has {} values for {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }
        self.headers.insert(idx, name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.insert(idx, value);
        }
        Ok(())
    }

    /// Append a column as the trailing column.
    pub fn push_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        let idx = self.headers.len();
        self.insert_column(idx, name, values)
    }

    /// Vertical concatenation with outer-join column semantics: the result
    /// carries the union of both header sets (self's order first), and cells
    /// absent from a source are filled with "0".
    pub fn vstack(&self, other: &Table) -> Table {
        let mut headers = self.headers.clone();
        for h in &other.headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }

        let mut out = Table::new(headers.clone());
        for source in [self, other] {
            let indices: Vec<Option<usize>> =
                headers.iter().map(|h| source.column_index(h)).collect();
            for row in &source.rows {
                let out_row = indices
                    .iter()
                    .map(|idx| match idx {
                        Some(i) => row[*i].clone(),
                        None => "0".to_string(),
                    })
                    .collect();
                out.rows.push(out_row);
            }
        }
        out
    }

    /// Horizontal concatenation. Row counts must agree.
    pub fn hstack(&self, other: &Table) -> Result<Table> {
        if self.n_rows() != other.n_rows() {
            return Err(CribrumError::Pipeline(format!(
                "cannot hstack tables with {} and {} rows",
                self.n_rows(),
                other.n_rows()
            )));
        }
        let mut headers = self.headers.clone();
        headers.extend(other.headers.iter().cloned());
        let rows = self
            .rows
            .iter()
            .zip(&other.rows)
            .map(|(a, b)| {
                let mut row = a.clone();
                row.extend(b.iter().cloned());
                row
            })
            .collect();
        Ok(Table { headers, rows })
    }
}
