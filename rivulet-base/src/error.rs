use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ManifestError {
    StringError(String),
    JsonError(Arc<serde_json::Error>),
}

impl std::error::Error for ManifestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            ManifestError::StringError(_) => None,
            ManifestError::JsonError(ref e) => Some(&**e),
        }
    }
}

impl std::fmt::Display for ManifestError {
    fn fmt(
        &self,
        fmt: &mut std::fmt::Formatter,
    ) -> std::fmt::Result {
        match *self {
            ManifestError::StringError(ref e) => e.fmt(fmt),
            ManifestError::JsonError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for ManifestError {
    fn from(str: &str) -> Self {
        ManifestError::StringError(str.to_string())
    }
}

impl From<String> for ManifestError {
    fn from(string: String) -> Self {
        ManifestError::StringError(string)
    }
}

impl From<serde_json::Error> for ManifestError {
    fn from(error: serde_json::Error) -> Self {
        ManifestError::JsonError(Arc::new(error))
    }
}

pub type ManifestResult<T> = Result<T, ManifestError>;
