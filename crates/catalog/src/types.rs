use serde::{Deserialize, Serialize};
use shadowdb_error::{errdata, Result};

/// An exhaustive enumeration of all the data types of a [`crate::field::Field`] object.
///
/// The declaration order is significant: it is the order in which values of different types
/// compare, and each variant's tag byte prefixes every encoded field of that type.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Integer,
    Float,
    Varchar,
    Timestamp,
}

impl Type {
    /// The tag byte written in front of every encoded field of this type.
    pub fn tag(&self) -> u8 {
        match self {
            Type::Boolean => 0x01,
            Type::Integer => 0x02,
            Type::Float => 0x03,
            Type::Varchar => 0x04,
            Type::Timestamp => 0x05,
        }
    }

    /// Recovers a type from its tag byte.
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0x01 => Ok(Type::Boolean),
            0x02 => Ok(Type::Integer),
            0x03 => Ok(Type::Float),
            0x04 => Ok(Type::Varchar),
            0x05 => Ok(Type::Timestamp),
            other => errdata!("unknown type tag {other:#04x}"),
        }
    }

    /// Returns the byte size of an encoded payload of this type (without its tag), or `None` for
    /// variable-length types.
    pub fn size(&self) -> Option<usize> {
        match self {
            Type::Boolean => Some(1),
            Type::Integer => Some(8),
            Type::Float => Some(8),
            Type::Varchar => None,
            // Seconds since the epoch plus the sub-second nanoseconds.
            Type::Timestamp => Some(12),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Type::Boolean => "BOOLEAN",
            Type::Integer => "INTEGER",
            Type::Float => "FLOAT",
            Type::Varchar => "VARCHAR",
            Type::Timestamp => "TIMESTAMP",
        })
    }
}

impl std::str::FromStr for Type {
    type Err = shadowdb_error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(Type::Boolean),
            "int" | "integer" | "int64" | "bigint" => Ok(Type::Integer),
            "float" | "double" | "float64" => Ok(Type::Float),
            "string" | "text" | "varchar" => Ok(Type::Varchar),
            "timestamp" | "time" => Ok(Type::Timestamp),
            other => shadowdb_error::errinput!("unknown column type {other}"),
        }
    }
}
