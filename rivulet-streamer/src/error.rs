use rivulet_base::ManifestError;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum StreamError {
    StringError(String),
    IoError(Arc<std::io::Error>),
    JsonError(Arc<serde_json::Error>),
    ManifestError(ManifestError),
    HttpStatus(u16),
    TransportError(String),
    DecodeError(String),
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            StreamError::StringError(_) => None,
            StreamError::IoError(ref e) => Some(&**e),
            StreamError::JsonError(ref e) => Some(&**e),
            StreamError::ManifestError(ref e) => Some(e),
            StreamError::HttpStatus(_) => None,
            StreamError::TransportError(_) => None,
            StreamError::DecodeError(_) => None,
        }
    }
}

impl std::fmt::Display for StreamError {
    fn fmt(
        &self,
        fmt: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        match *self {
            StreamError::StringError(ref e) => e.fmt(fmt),
            StreamError::IoError(ref e) => e.fmt(fmt),
            StreamError::JsonError(ref e) => e.fmt(fmt),
            StreamError::ManifestError(ref e) => e.fmt(fmt),
            StreamError::HttpStatus(status) => write!(fmt, "HTTP status {}", status),
            StreamError::TransportError(ref e) => e.fmt(fmt),
            StreamError::DecodeError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for StreamError {
    fn from(str: &str) -> Self {
        StreamError::StringError(str.to_string())
    }
}

impl From<String> for StreamError {
    fn from(string: String) -> Self {
        StreamError::StringError(string)
    }
}

impl From<std::io::Error> for StreamError {
    fn from(error: std::io::Error) -> Self {
        StreamError::IoError(Arc::new(error))
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(error: serde_json::Error) -> Self {
        StreamError::JsonError(Arc::new(error))
    }
}

impl From<ManifestError> for StreamError {
    fn from(error: ManifestError) -> Self {
        StreamError::ManifestError(error)
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
