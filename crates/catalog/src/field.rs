use crate::types::Type;
use chrono::{DateTime, Utc};
use shadowdb_error::{errinput, Result};

/// A decoded scalar value. Tuples carry their values encoded (see [`crate::serde::Serde`]); a
/// `Field` is what an encoded value becomes once it is materialized for evaluation, e.g. when a
/// condition or aggregate function is applied to it.
#[derive(Debug, Clone)]
pub enum Field {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Varchar(String),
    Timestamp(DateTime<Utc>),
}

impl Field {
    /// Returns the zero value of the given type, used as the default of columns declared
    /// without one.
    pub fn default_for(field_type: Type) -> Self {
        match field_type {
            Type::Boolean => Field::Boolean(false),
            Type::Integer => Field::Integer(0),
            Type::Float => Field::Float(0.0),
            Type::Varchar => Field::Varchar(String::new()),
            Type::Timestamp => Field::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    /// Returns the corresponding [`crate::types::Type`] for the given field.
    pub fn get_type(&self) -> Type {
        match self {
            Field::Boolean(_) => Type::Boolean,
            Field::Integer(_) => Type::Integer,
            Field::Float(_) => Type::Float,
            Field::Varchar(_) => Type::Varchar,
            Field::Timestamp(_) => Type::Timestamp,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Field::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Field::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the field; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Integer(i) => Some(*i as f64),
            Field::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Field::Varchar(s) => Some(s),
            _ => None,
        }
    }

    /// Adds two numeric fields. Integer addition that overflows is carried out in floating
    /// point instead.
    pub fn checked_add(&self, other: &Field) -> Result<Field> {
        match (self, other) {
            (Field::Integer(l), Field::Integer(r)) => Ok(l
                .checked_add(*r)
                .map_or(Field::Float(*l as f64 + *r as f64), Field::Integer)),
            (Field::Integer(l), Field::Float(r)) => Ok(Field::Float(*l as f64 + r)),
            (Field::Float(l), Field::Integer(r)) => Ok(Field::Float(l + *r as f64)),
            (Field::Float(l), Field::Float(r)) => Ok(Field::Float(l + r)),
            (l, r) => errinput!("cannot add {} and {}", l.get_type(), r.get_type()),
        }
    }
}

impl From<bool> for Field {
    fn from(b: bool) -> Self {
        Field::Boolean(b)
    }
}

impl From<i64> for Field {
    fn from(i: i64) -> Self {
        Field::Integer(i)
    }
}

impl From<f64> for Field {
    fn from(f: f64) -> Self {
        Field::Float(f)
    }
}

impl From<&str> for Field {
    fn from(s: &str) -> Self {
        Field::Varchar(s.to_owned())
    }
}

impl From<String> for Field {
    fn from(s: String) -> Self {
        Field::Varchar(s)
    }
}

impl From<DateTime<Utc>> for Field {
    fn from(t: DateTime<Utc>) -> Self {
        Field::Timestamp(t)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Boolean(a), Field::Boolean(b)) => a.eq(b),
            (Field::Integer(a), Field::Integer(b)) => a.eq(b),
            (Field::Varchar(a), Field::Varchar(b)) => a.eq(b),
            (Field::Timestamp(a), Field::Timestamp(b)) => a.eq(b),
            (Field::Float(a), Field::Float(b)) => {
                // Match on NaN, in addition to equality, for floats.
                a.eq(b) || (a.is_nan() && b.is_nan())
            }
            _ => false,
        }
    }
}
impl Eq for Field {}

impl Ord for Field {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Field::Boolean(a), Field::Boolean(b)) => a.cmp(b),
            (Field::Integer(a), Field::Integer(b)) => a.cmp(b),
            (Field::Varchar(a), Field::Varchar(b)) => a.cmp(b),
            (Field::Timestamp(a), Field::Timestamp(b)) => a.cmp(b),
            // NaN is not comparable per IEEE, but we still need a total order to group and sort
            // on, so it sorts below every other float.
            (Field::Float(a), Field::Float(b)) => match (a.is_nan(), b.is_nan()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Less,
                (false, true) => std::cmp::Ordering::Greater,
                (false, false) => a.total_cmp(b),
            },
            // Values of different types order by their type.
            (a, b) => a.get_type().cmp(&b.get_type()),
        }
    }
}
impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Integer(i) => i.fmt(f),
            Self::Float(float) => float.fmt(f),
            Self::Varchar(varchar) => write!(f, "{}", varchar.escape_default()),
            Self::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::field::Field;
    use crate::types::Type;
    use chrono::{DateTime, Utc};

    #[test]
    fn test_creation() {
        // Booleans properly initialized.
        assert_eq!(Field::Boolean(true), true.into());
        assert_eq!(Field::Boolean(false), false.into());

        // Typical and MAX/MIN integers properly initialized.
        assert_eq!(Field::Integer(0), 0i64.into());
        assert_eq!(Field::Integer(-32), (-32i64).into());
        assert_eq!(Field::Integer(i64::MIN), i64::MIN.into());
        assert_eq!(Field::Integer(i64::MAX), i64::MAX.into());

        for f in [0.0, -0.0, 339.2, f64::MAX, f64::INFINITY, f64::NAN] {
            assert_eq!(Field::Float(f), Field::Float(f));
        }

        for text in ["Hello, world", "", "All love 🛸💕🕺", "339"] {
            assert_eq!(Field::Varchar(text.into()), text.into());
        }
    }

    #[test]
    fn test_defaults() {
        for ty in [
            Type::Boolean,
            Type::Integer,
            Type::Float,
            Type::Varchar,
            Type::Timestamp,
        ] {
            assert_eq!(Field::default_for(ty).get_type(), ty);
        }
        assert_eq!(
            Field::default_for(Type::Timestamp),
            Field::Timestamp(DateTime::<Utc>::UNIX_EPOCH)
        );
    }

    #[test]
    fn test_equality() {
        assert_ne!(Field::Boolean(false), Field::Integer(0));
        assert_ne!(Field::Integer(0), Field::Float(0.0));
        assert_ne!(Field::Integer(0), Field::Varchar("0".into()));
        assert_eq!(Field::Float(f64::NAN), Field::Float(f64::NAN));
        assert_ne!(Field::Float(1.0), Field::Float(f64::NAN));
    }

    #[test]
    fn test_comparison() {
        assert!(Field::Integer(-1) < Field::Integer(2));
        assert!(Field::Float(0.0) > Field::Float(-1.2));
        assert!(Field::Float(f64::NAN) < Field::Float(f64::NEG_INFINITY));
        assert!(Field::Varchar("a".into()) < Field::Varchar("b".into()));

        // Fields of different types order by type instead of panicking.
        assert!(Field::Boolean(true) < Field::Integer(0));
        assert!(Field::Integer(i64::MAX) < Field::Float(f64::MIN));
    }

    #[test]
    fn test_checked_add() {
        assert_eq!(
            Field::Integer(2).checked_add(&Field::Integer(3)),
            Ok(Field::Integer(5))
        );
        assert_eq!(
            Field::Integer(1).checked_add(&Field::Float(0.5)),
            Ok(Field::Float(1.5))
        );
        // Overflow falls back to floating point.
        assert!(matches!(
            Field::Integer(i64::MAX).checked_add(&Field::Integer(1)),
            Ok(Field::Float(_))
        ));
        assert!(Field::Varchar("a".into())
            .checked_add(&Field::Integer(1))
            .is_err());
    }
}
