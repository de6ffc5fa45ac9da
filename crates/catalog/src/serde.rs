use crate::field::Field;
use crate::schema::Schema;
use crate::tuple::{Cell, Tuple};
use crate::types::Type;
use bytes::{BufMut, Bytes};
use chrono::DateTime;
use shadowdb_error::{errdata, Result};

/// Width of the little-endian length prefix written before every field of a row and every row
/// of a page.
pub const LENGTH_PREFIX: usize = size_of::<u64>();

const SIGN_BIT: u64 = 1 << 63;

/// A utility struct that provides the mapping between decoded values and their on-disk bytes.
///
/// A single field is encoded as its type's tag byte followed by a payload whose byte-wise order
/// matches the order of the values it encodes:
///
/// ```text
/// Boolean   -> [tag, 0|1]
/// Integer   -> [tag, big-endian i64 with the sign bit flipped]
/// Float     -> [tag, big-endian IEEE bits, sign bit flipped (or all bits for negatives)]
/// Varchar   -> [tag, UTF-8 bytes]
/// Timestamp -> [tag, flipped big-endian seconds, big-endian nanoseconds]
/// ```
///
/// A row is its fields in schema column order, each as `[8-byte LE length][encoded field]`:
///
/// ```text
/// (7, "hi") with schema (INTEGER, VARCHAR)
///
/// ==> [9,0,0,0,0,0,0,0, 0x02, 0x80,0,0,0,0,0,0,7, 3,0,0,0,0,0,0,0, 0x04, b'h', b'i']
///      ^                ^                          ^                ^
///      |                |                          |                |
///   length of 7     encoded 7               length of "hi"    encoded "hi"
/// ```
pub struct Serde {}
impl Serde {
    /// Encodes a single field into its self-describing byte form.
    pub fn encode_field(field: &Field) -> Bytes {
        let mut bytes = Vec::with_capacity(1 + field.get_type().size().unwrap_or(16));
        bytes.put_u8(field.get_type().tag());
        match field {
            Field::Boolean(b) => bytes.put_u8(u8::from(*b)),
            Field::Integer(i) => bytes.put_u64(*i as u64 ^ SIGN_BIT),
            Field::Float(f) => {
                let bits = f.to_bits();
                let ordered = if bits & SIGN_BIT != 0 {
                    !bits
                } else {
                    bits ^ SIGN_BIT
                };
                bytes.put_u64(ordered);
            }
            Field::Varchar(s) => bytes.put_slice(s.as_bytes()),
            Field::Timestamp(ts) => {
                bytes.put_u64(ts.timestamp() as u64 ^ SIGN_BIT);
                bytes.put_u32(ts.timestamp_subsec_nanos());
            }
        }
        Bytes::from(bytes)
    }

    /// Decodes a field previously produced by [`Serde::encode_field`], requiring it to be of the
    /// given type.
    pub fn decode_field(bytes: &[u8], field_type: Type) -> Result<Field> {
        let field = Self::decode_any(bytes)?;
        if field.get_type() != field_type {
            return errdata!(
                "expected a {} value, found {}",
                field_type,
                field.get_type()
            );
        }
        Ok(field)
    }

    /// Decodes a field using the type recorded in its tag byte.
    pub fn decode_any(bytes: &[u8]) -> Result<Field> {
        let Some((&tag, payload)) = bytes.split_first() else {
            return errdata!("empty field encoding");
        };
        let field_type = Type::from_tag(tag)?;
        if let Some(size) = field_type.size() {
            if payload.len() != size {
                return errdata!(
                    "{} payload must be {} bytes, found {}",
                    field_type,
                    size,
                    payload.len()
                );
            }
        }

        let field = match field_type {
            Type::Boolean => match payload[0] {
                0 => Field::Boolean(false),
                1 => Field::Boolean(true),
                other => return errdata!("invalid boolean byte {other}"),
            },
            Type::Integer => {
                let raw = u64::from_be_bytes(payload.try_into()?);
                Field::Integer((raw ^ SIGN_BIT) as i64)
            }
            Type::Float => {
                let ordered = u64::from_be_bytes(payload.try_into()?);
                let bits = if ordered & SIGN_BIT != 0 {
                    ordered ^ SIGN_BIT
                } else {
                    !ordered
                };
                Field::Float(f64::from_bits(bits))
            }
            Type::Varchar => Field::Varchar(String::from_utf8(payload.to_vec())?),
            Type::Timestamp => {
                let secs = u64::from_be_bytes(payload[..8].try_into()?) ^ SIGN_BIT;
                let nanos = u32::from_be_bytes(payload[8..].try_into()?);
                match DateTime::from_timestamp(secs as i64, nanos) {
                    Some(ts) => Field::Timestamp(ts),
                    None => return errdata!("timestamp {secs}.{nanos} out of range"),
                }
            }
        };
        Ok(field)
    }

    /// Serializes a tuple in schema column order. Columns the tuple has no cell for are written
    /// as the column default.
    pub fn serialize(tuple: &Tuple, schema: &Schema) -> Vec<u8> {
        let mut bytes = Vec::new();
        for column in schema.columns() {
            let data = match tuple.get(column.name()) {
                Some(cell) => cell.data(),
                None => column.default_bytes(),
            };
            bytes.put_u64_le(data.len() as u64);
            bytes.put_slice(data);
        }
        bytes
    }

    /// Deserializes a row written by [`Serde::serialize`]. A row with fewer fields than the
    /// schema has columns was written before the trailing columns were added, so those take
    /// their defaults.
    pub fn deserialize(bytes: &[u8], schema: &Schema) -> Result<Tuple> {
        let mut tuple = Tuple::new();
        let mut columns = schema.columns().iter();
        let mut rest = bytes;

        while !rest.is_empty() {
            let (data, tail) = Self::split_prefixed(rest)?;
            let Some(column) = columns.next() else {
                return errdata!(
                    "row has more fields than the {} schema columns",
                    schema.num_columns()
                );
            };
            // Validate the value against its column before accepting it.
            Self::decode_field(data, column.field_type())?;
            tuple.set(
                column.name(),
                Cell::new(column.field_type(), Bytes::copy_from_slice(data)),
            );
            rest = tail;
        }

        for column in columns {
            tuple.set(
                column.name(),
                Cell::new(column.field_type(), column.default_bytes().clone()),
            );
        }
        Ok(tuple)
    }

    /// Splits `[8-byte LE length][payload]` off the front of `bytes`, returning the payload and
    /// the remainder.
    pub fn split_prefixed(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
        if bytes.len() < LENGTH_PREFIX {
            return errdata!(
                "truncated length prefix: {} of {} bytes",
                bytes.len(),
                LENGTH_PREFIX
            );
        }
        let (prefix, rest) = bytes.split_at(LENGTH_PREFIX);
        let len = usize::try_from(u64::from_le_bytes(prefix.try_into()?))?;
        if rest.len() < len {
            return errdata!("truncated payload: expected {} bytes, found {}", len, rest.len());
        }
        Ok(rest.split_at(len))
    }
}
