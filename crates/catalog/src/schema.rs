use crate::column::Column;
use shadowdb_error::{errinput, Error, Result};
use std::sync::Arc;

pub type SchemaRef = Arc<Schema>;

/// The schema of a table: its columns, in the order their values are written to disk.
///
/// Columns are append-only. Existing columns are never removed or retyped, so every row
/// written under an earlier version of a schema still decodes under a later one.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct Schema {
    /// The column definitions of the tuple's values, in order.
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: &[Column]) -> Self {
        Schema {
            columns: columns.to_vec(),
        }
    }

    /// Appends a column. Names must be unique within a schema.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.column_index_of(column.name()).is_some() {
            return errinput!("column {} already exists", column.name());
        }
        self.columns.push(column);
        Ok(())
    }

    /// Returns an immutable view of the columns.
    pub fn columns(&self) -> &Vec<Column> {
        &self.columns
    }

    /// Given an index `i`, retrieves a reference to the schema's `i`-th column (if it exists).
    pub fn column_at(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or(Error::OutOfBounds)
    }

    /// Looks up and returns the index of the column with the given name, if one exists.
    pub fn column_index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name() == name)
    }

    /// Looks up a column by name, failing with an input error if there is none.
    pub fn column(&self, name: &str) -> Result<&Column> {
        match self.column_index_of(name) {
            Some(i) => Ok(&self.columns[i]),
            None => errinput!("unknown column {name}"),
        }
    }

    /// Returns the column names in order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Returns the number of columns in the schema.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "Schema[ NumColumns: {} ] :: ( {} )",
            self.num_columns(),
            columns
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::column::Column;
    use crate::schema::Schema;
    use crate::types::Type;
    use rand::Rng;
    use shadowdb_error::Error;

    #[test]
    fn test_add_column() {
        let mut schema = Schema::new(&create_n_columns(3));
        schema
            .add_column(Column::new("extra".to_string(), Type::Varchar))
            .unwrap();
        assert_eq!(schema.num_columns(), 4);
        assert_eq!(schema.column_index_of("extra"), Some(3));

        // Duplicate names are rejected and leave the schema untouched.
        assert!(matches!(
            schema.add_column(Column::new("0".to_string(), Type::Integer)),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(schema.num_columns(), 4);
    }

    #[test]
    fn test_equality() {
        let names = vec!["a", "b", "c"];
        let integer_columns = names
            .iter()
            .map(|name| Column::new(name.to_string(), Type::Integer))
            .collect::<Vec<_>>();
        let float_columns = names
            .iter()
            .map(|name| Column::new(name.to_string(), Type::Float))
            .collect::<Vec<_>>();

        // Schemas with matching column names BUT with differing column types aren't equal.
        assert_ne!(Schema::new(&integer_columns), Schema::new(&float_columns));
        assert_eq!(
            Schema::new(&integer_columns),
            Schema::new(&integer_columns.clone())
        );
    }

    #[test]
    fn test_num_columns() {
        let random = {
            let mut rng = rand::rng();
            rng.random_range(1..100)
        };
        assert_eq!(0, Schema::new(&create_n_columns(0)).num_columns());
        assert_eq!(random, Schema::new(&create_n_columns(random)).num_columns());
    }

    #[test]
    fn test_column_lookup() {
        let columns = create_n_columns(50);
        let schema = Schema::new(&columns);

        (0..50).for_each(|i| {
            assert_eq!(schema.column_at(i), Ok(&columns[i]));
            assert_eq!(schema.column(&i.to_string()), Ok(&columns[i]));
        });

        assert_eq!(schema.column_at(50).err(), Some(Error::OutOfBounds));
        assert!(schema.column_index_of("50").is_none());
        assert!(matches!(schema.column("50"), Err(Error::InvalidInput(_))));
    }

    fn create_n_columns(n: usize) -> Vec<Column> {
        (0..n)
            .map(|i| Column::new(i.to_string(), Type::Integer))
            .collect::<Vec<_>>()
    }
}
