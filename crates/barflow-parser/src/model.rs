/// Cells exactly as they were read from disk. Empty fields are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub format: &'static str,
    /// Positional labels for layouts that carry no header row.
    pub labels: Option<Vec<String>>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn width(&self) -> usize {
        let row_width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        match &self.labels {
            Some(labels) => row_width.max(labels.len()),
            None => row_width,
        }
    }

    pub(crate) fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .and_then(|cell| cell.as_deref())
    }
}

/// A raw table after column pruning, header remapping and uppercasing.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub format: &'static str,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl NormalizedTable {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = Option<&'a str>> + 'a> {
        let index = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(move |row| row.get(index).and_then(|cell| cell.as_deref())),
        )
    }
}
