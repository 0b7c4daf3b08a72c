//! Error handling for the FastCGI server

use std::error;
use std::fmt;
use std::io;

/// A Result for internal operations.
pub type Result<T> = ::std::result::Result<T, Error>;

/// All errors which might arise within the application
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Protocol(ProtocolError),
    Serialization(SerializationError),
    /// The application handler failed to produce a response
    Handler(String),
    /// The listen address could not be bound
    Bind { addr: String, source: io::Error }
}

/// The peer sent something that isn't FastCGI
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    UnsupportedVersion(u8),
    UnknownRole(u16),
    /// The stream ended partway through a record
    Truncated,
    /// A params stream ended partway through a name-value pair
    TruncatedParams,
    /// A name-value pair kept growing past what we are willing to buffer
    OversizedParams,
    /// The stream ended between records
    Closed
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SerializationError {
    TooLong
}

impl Error {
    /// Whether this error is the peer going away cleanly between records
    pub fn is_closed(&self) -> bool {
        match *self {
            Error::Protocol(ProtocolError::Closed) => true,
            _ => false
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "I/O error: {}", e),
            Error::Protocol(ref e) => write!(f, "protocol error: {}", e),
            Error::Serialization(SerializationError::TooLong) =>
                write!(f, "content too long to serialize"),
            Error::Handler(ref message) =>
                write!(f, "handler failed: {}", message),
            Error::Bind { ref addr, ref source } =>
                write!(f, "could not bind {}: {}", addr, source)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Bind { ref source, .. } => Some(source),
            _ => None
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProtocolError::UnsupportedVersion(v) =>
                write!(f, "unsupported protocol version {}", v),
            ProtocolError::UnknownRole(r) => write!(f, "unknown role {}", r),
            ProtocolError::Truncated => write!(f, "truncated record"),
            ProtocolError::TruncatedParams =>
                write!(f, "params stream ended inside a name-value pair"),
            ProtocolError::OversizedParams =>
                write!(f, "name-value pair too large to buffer"),
            ProtocolError::Closed => write!(f, "connection closed by peer")
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::UnexpectedEof =>
                Error::Protocol(ProtocolError::Truncated),
            _ => Error::Io(e)
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Error {
        Error::Protocol(e)
    }
}

impl From<SerializationError> for Error {
    fn from(e: SerializationError) -> Error {
        Error::Serialization(e)
    }
}
