//! Error handling for Wyvern bytecode.
//!
//! The central type is [`Error`], which covers every way a bytecode stream
//! can fail to decode or encode. The module also provides a type alias
//! [`Result<T>`](Result) for convenience.

/// Wyvern bytecode result type
///
/// This is a type alias for the standard library's [`Result`](core::result::Result) type with the
/// error type defaulting to [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors that can occur when reading or writing bytecode
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An opcode byte outside the stable enumeration was read
    #[error("Invalid instruction: {0}")]
    InvalidInstruction(u8),
    /// An operator code outside the stable enumeration was read
    #[error("Invalid operator code: {0}")]
    InvalidOperator(i16),
    /// A type tag outside the lattice was read
    #[error("Invalid type tag: {0}")]
    InvalidTypeTag(u8),
    /// An error occurred while reading or writing the byte stream
    #[error("IO error: {0}")]
    IoError(String),
}

/// Convert [`std::io::Error` errors](std::io::Error) to [`IoError`](Error::IoError)
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "end of stream");
        let error = Error::from(io_error);
        assert_eq!(error.to_string(), "IO error: end of stream");
    }
}
