use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Load: {0}")]
    Load(String),
    #[error("Missing export: {0}")]
    MissingExport(&'static str),
    #[error("{0} failed")]
    Operation(&'static str),
    #[error("OS: {0}")]
    Os(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// Serialize as string so controllers can forward errors to a UI verbatim.
impl Serialize for HostError {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_message() {
        let err = HostError::Operation("UnsubclassWindow");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, "\"UnsubclassWindow failed\"");
    }
}
