pub type Result<T> = std::result::Result<T, Error>;
impl<T> From<Error> for Result<T> {
    fn from(e: Error) -> Self {
        Err(e)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Invalid data, which covers decoding failures: malformed field, row or page bytes, or an
    /// encoded value whose type tag does not match the column it is read for.
    InvalidData(String),
    /// Invalid user input: unknown tables, columns or functions, malformed statements, literal
    /// values that do not fit their column, unbalanced parentheses.
    InvalidInput(String),
    /// A storage backend read, write or sync failed.
    IO(String),
    /// An out-of-bounds access has occurred.
    OutOfBounds,
    /// The buffer pool could not produce a page it is responsible for.
    BufferPoolError(String),
    /// The transaction is not in a state that permits the requested operation.
    Transaction(String),
}

impl std::error::Error for Error {}
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::IO(msg) => write!(f, "IO error: {}", msg),
            Error::OutOfBounds => write!(f, "Out of bounds"),
            Error::BufferPoolError(msg) => write!(f, "Buffer error: {}", msg),
            Error::Transaction(msg) => write!(f, "Transaction error: {}", msg),
        }
    }
}

impl serde::de::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::InvalidData(msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Error::InvalidInput(msg.to_string())
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(e: std::array::TryFromSliceError) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IO(e.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Error::InvalidInput(e.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(e: std::num::ParseFloatError) -> Self {
        Error::InvalidInput(e.to_string())
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(e: std::num::TryFromIntError) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::InvalidData(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        // This occurs when a different thread panics when holding a lock. Since this is
        // fatal, we should panic here too.
        panic!("{e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            Error::InvalidData("short field".into()).to_string(),
            "Invalid data: short field"
        );
        assert_eq!(
            Error::Transaction("already committed".into()).to_string(),
            "Transaction error: already committed"
        );
    }

    #[test]
    fn test_conversions() {
        let io: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into();
        assert!(matches!(io, Error::IO(_)));

        let parse: Error = "x1".parse::<i64>().unwrap_err().into();
        assert!(matches!(parse, Error::InvalidInput(_)));

        let utf8: Error = String::from_utf8(vec![0xff]).unwrap_err().into();
        assert!(matches!(utf8, Error::InvalidData(_)));
    }
}
