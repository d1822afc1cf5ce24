//! Terminal result of a generation call.

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::error::{CopysmithError, ErrorKind, Result};

/// What `generate()` hands back to its caller.
///
/// There are no partial or streaming results. On the wire this becomes
/// `{"success": true, "text": ...}` or
/// `{"success": false, "errorKind": ..., "message": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success { text: String },
    Failure { kind: ErrorKind, message: String },
}

impl GenerationOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        GenerationOutcome::Success { text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success { .. })
    }

    /// The generated text, if this is a success.
    pub fn text(&self) -> Option<&str> {
        match self {
            GenerationOutcome::Success { text } => Some(text),
            GenerationOutcome::Failure { .. } => None,
        }
    }

    /// The failure classification, if this is a failure.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            GenerationOutcome::Success { .. } => None,
            GenerationOutcome::Failure { kind, .. } => Some(*kind),
        }
    }
}

impl From<CopysmithError> for GenerationOutcome {
    fn from(err: CopysmithError) -> Self {
        GenerationOutcome::Failure {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<Result<String>> for GenerationOutcome {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(text) => GenerationOutcome::Success { text },
            Err(err) => err.into(),
        }
    }
}

impl Serialize for GenerationOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GenerationOutcome::Success { text } => {
                let mut s = serializer.serialize_struct("GenerationOutcome", 2)?;
                s.serialize_field("success", &true)?;
                s.serialize_field("text", text)?;
                s.end()
            }
            GenerationOutcome::Failure { kind, message } => {
                let mut s = serializer.serialize_struct("GenerationOutcome", 3)?;
                s.serialize_field("success", &false)?;
                s.serialize_field("errorKind", kind.as_str())?;
                s.serialize_field("message", message)?;
                s.end()
            }
        }
    }
}
