use crate::field::Field;
use crate::serde::Serde;
use crate::types::Type;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// The name of this column.
    name: String,
    /// This column value's type.
    field_type: Type,
    /// The encoded value used for rows that have no value for this column.
    default: Bytes,
}

impl Column {
    /// Creates a column whose default is the zero value of its type.
    pub fn new(name: String, field_type: Type) -> Self {
        let default = Serde::encode_field(&Field::default_for(field_type));
        Column {
            name,
            field_type,
            default,
        }
    }

    /// Creates a column typed after, and defaulting to, the given value.
    pub fn with_default(name: String, default: Field) -> Self {
        Column {
            name,
            field_type: default.get_type(),
            default: Serde::encode_field(&default),
        }
    }

    /// Returns the name of this column.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `field_type` of the column.
    pub fn field_type(&self) -> Type {
        self.field_type
    }

    /// Returns the encoded default value.
    pub fn default_bytes(&self) -> &Bytes {
        &self.default
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let default = Serde::decode_field(&self.default, self.field_type)
            .map(|d| d.to_string())
            .unwrap_or_else(|_| "?".to_string());
        write!(
            f,
            "Column[ {}, {}, Default: {} ]",
            self.name, self.field_type, default
        )
    }
}
