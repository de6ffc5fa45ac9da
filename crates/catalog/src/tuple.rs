use crate::field::Field;
use crate::record_id::RecordId;
use crate::schema::Schema;
use crate::serde::Serde;
use crate::types::Type;
use bytes::Bytes;
use shadowdb_error::{errinput, Result};
use std::collections::HashMap;

/// One encoded value of a tuple together with the type it was encoded as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    field_type: Type,
    data: Bytes,
}

impl Cell {
    pub fn new(field_type: Type, data: Bytes) -> Self {
        Self { field_type, data }
    }

    /// Encodes a field into a cell of the field's own type.
    pub fn from_field(field: &Field) -> Self {
        Self {
            field_type: field.get_type(),
            data: Serde::encode_field(field),
        }
    }

    pub fn field_type(&self) -> Type {
        self.field_type
    }

    pub fn data(&self) -> &Bytes {
        // Cloning the returned `Bytes` only bumps a reference count.
        &self.data
    }

    pub fn decode(&self) -> Result<Field> {
        Serde::decode_field(&self.data, self.field_type)
    }
}

/// A row: column name to encoded value, plus where the row lives.
///
/// Besides the table's own columns a tuple flowing through a query may carry derived values
/// (e.g. `sum(price)`) and aliases, so its cells are keyed by name rather than by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuple {
    cells: HashMap<String, Cell>,
    rid: RecordId,
}

impl Tuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tuple from one field per schema column, in column order. Each field must match
    /// its column's type.
    pub fn from_fields(schema: &Schema, fields: Vec<Field>) -> Result<Self> {
        if fields.len() != schema.num_columns() {
            return errinput!(
                "expected {} values, got {}",
                schema.num_columns(),
                fields.len()
            );
        }
        let mut tuple = Tuple::new();
        for (column, field) in schema.columns().iter().zip(fields) {
            if field.get_type() != column.field_type() {
                return errinput!(
                    "column {} is {}, got a {} value",
                    column.name(),
                    column.field_type(),
                    field.get_type()
                );
            }
            tuple.set(column.name(), Cell::from_field(&field));
        }
        Ok(tuple)
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.cells.get(name)
    }

    /// Looks up a cell by name, failing with an input error if the tuple has no such column.
    pub fn cell(&self, name: &str) -> Result<&Cell> {
        match self.cells.get(name) {
            Some(cell) => Ok(cell),
            None => errinput!("unknown column {name}"),
        }
    }

    /// Decodes the named value.
    pub fn field(&self, name: &str) -> Result<Field> {
        self.cell(name)?.decode()
    }

    pub fn set(&mut self, name: impl Into<String>, cell: Cell) {
        self.cells.insert(name.into(), cell);
    }

    pub fn remove(&mut self, name: &str) -> Option<Cell> {
        self.cells.remove(name)
    }

    /// Keeps only the cells whose names satisfy the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.cells.retain(|name, _| keep(name));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    /// All cells, in no particular order.
    pub fn cells(&self) -> impl Iterator<Item = (&String, &Cell)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Decodes the values of the schema's columns, in column order.
    pub fn fields(&self, schema: &Schema) -> Result<Vec<Field>> {
        schema
            .columns()
            .iter()
            .map(|column| self.field(column.name()))
            .collect()
    }

    /// Copies out only the cells that belong to `schema`, dropping derived values.
    pub fn restrict_to(&self, schema: &Schema) -> Tuple {
        let mut tuple = Tuple {
            cells: HashMap::with_capacity(schema.num_columns()),
            rid: self.rid,
        };
        for column in schema.columns() {
            if let Some(cell) = self.cells.get(column.name()) {
                tuple.set(column.name(), cell.clone());
            }
        }
        tuple
    }

    pub fn record_id(&self) -> RecordId {
        self.rid
    }

    pub fn set_record_id(&mut self, rid: RecordId) {
        self.rid = rid;
    }
}

#[cfg(test)]
mod tests {
    use crate::column::Column;
    use crate::field::Field;
    use crate::record_id::RecordId;
    use crate::schema::Schema;
    use crate::tuple::{Cell, Tuple};
    use crate::types::Type;
    use shadowdb_error::Error;

    fn schema() -> Schema {
        Schema::new(&[
            Column::new("name".to_string(), Type::Varchar),
            Column::new("age".to_string(), Type::Integer),
        ])
    }

    #[test]
    fn test_from_fields() {
        let schema = schema();
        let tuple =
            Tuple::from_fields(&schema, vec!["john".into(), Field::Integer(8)]).unwrap();
        assert_eq!(tuple.field("age"), Ok(Field::Integer(8)));
        assert_eq!(
            tuple.fields(&schema).unwrap(),
            vec![Field::Varchar("john".into()), Field::Integer(8)]
        );
        assert!(tuple.record_id().is_pending());

        // Wrong arity and wrong types are input errors.
        assert!(matches!(
            Tuple::from_fields(&schema, vec!["john".into()]),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Tuple::from_fields(&schema, vec![Field::Integer(1), Field::Integer(8)]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_restrict_to_drops_derived_values() {
        let schema = schema();
        let mut tuple =
            Tuple::from_fields(&schema, vec!["amy".into(), Field::Integer(3)]).unwrap();
        tuple.set_record_id(RecordId::new(2, 1));
        tuple.set("sum(age)", Cell::from_field(&Field::Integer(3)));

        let restricted = tuple.restrict_to(&schema);
        assert_eq!(restricted.len(), 2);
        assert!(!restricted.contains("sum(age)"));
        assert_eq!(restricted.record_id(), RecordId::new(2, 1));
    }

    #[test]
    fn test_unknown_column() {
        let tuple = Tuple::new();
        assert!(matches!(tuple.field("nope"), Err(Error::InvalidInput(_))));
    }
}
