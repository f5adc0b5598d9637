use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Justify {
    #[default]
    Left,
    Right,
}

/// Fixed-width text grid. Row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTable {
    pub rows: Vec<Vec<String>>,
    pub justify: Justify,
    pub sep: String,
}

impl DisplayTable {
    pub fn new(justify: Justify) -> Self {
        Self {
            rows: Vec::new(),
            justify,
            sep: " ".to_string(),
        }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Body rows sorted on `column`, header kept first.
    pub fn sorted_by_column(&self, column: usize) -> DisplayTable {
        let mut rows = self.rows.clone();
        if let Some((_, body)) = rows.split_first_mut() {
            sort_by_column(body, column);
        }
        DisplayTable {
            rows,
            justify: self.justify,
            sep: self.sep.clone(),
        }
    }

    /// Reorders the player columns by their value on `row`, highest first.
    /// The label column never parses as a number, so it stays pinned on the left.
    pub fn sorted_players_by_row(&self, row: usize) -> DisplayTable {
        let mut columns = transpose(&self.rows);
        sort_by_column(&mut columns, row);
        DisplayTable {
            rows: transpose(&columns),
            justify: self.justify,
            sep: self.sep.clone(),
        }
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                let len = cell.chars().count();
                match widths.get_mut(idx) {
                    Some(width) => *width = (*width).max(len),
                    None => widths.push(len),
                }
            }
        }
        widths
    }
}

/// Stable descending sort on one column. Thousands separators are ignored;
/// non-numeric or missing cells sort as +inf.
pub fn sort_by_column(rows: &mut [Vec<String>], column: usize) {
    rows.sort_by(|a, b| {
        sort_key(b, column)
            .partial_cmp(&sort_key(a, column))
            .unwrap_or(Ordering::Equal)
    });
}

fn sort_key(row: &[String], column: usize) -> f64 {
    row.get(column)
        .and_then(|cell| cell.trim().replace(',', "").parse::<f64>().ok())
        .filter(|value| !value.is_nan())
        .unwrap_or(f64::INFINITY)
}

fn transpose(rows: &[Vec<String>]) -> Vec<Vec<String>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            rows.iter()
                .map(|row| row.get(col).cloned().unwrap_or_default())
                .collect()
        })
        .collect()
}

impl fmt::Display for DisplayTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.widths();
        for (row_idx, row) in self.rows.iter().enumerate() {
            if row_idx > 0 {
                writeln!(f)?;
            }
            for (idx, cell) in row.iter().enumerate() {
                if idx > 0 {
                    f.write_str(&self.sep)?;
                }
                let width = widths[idx];
                match self.justify {
                    Justify::Left => write!(f, "{cell:<width$}")?,
                    Justify::Right => write!(f, "{cell:>width$}")?,
                }
            }
        }
        Ok(())
    }
}
