use crate::Result;
use shadowdb_catalog::field::Field;
use shadowdb_catalog::tuple::Tuple;
use std::fmt::{self, Display};

/// The rows a query produced, together with the column names it asked for in order.
///
/// Rows keep every cell that survived projection, so a row may carry more than `columns`;
/// `columns` is the order to present them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Tuple>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Tuple>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Tuple> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decodes one column across all rows.
    pub fn values(&self, column: &str) -> Result<Vec<Field>> {
        self.rows.iter().map(|row| row.field(column)).collect()
    }
}

impl Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|name| match row.field(name) {
                        Ok(field) => field.to_string(),
                        Err(_) => String::new(),
                    })
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &rendered {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.len());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, values: &[String]| -> fmt::Result {
            let padded: Vec<String> = values
                .iter()
                .zip(&widths)
                .map(|(value, width)| format!("{value:<width$}"))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &self.columns)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;
        for row in &rendered {
            line(f, row)?;
        }
        Ok(())
    }
}
