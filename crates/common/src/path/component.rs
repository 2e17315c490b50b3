// File-name component validation: single segment, no traversal, bounded length.

use thiserror::Error;

/// Maximum component length in bytes, leaving room for a file extension
/// under the common 255-byte file-name limit.
pub const MAX_COMPONENT_BYTES: usize = 240;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComponentError {
    #[error("name is empty")]
    Empty,

    #[error("name exceeds maximum length of {MAX_COMPONENT_BYTES} bytes")]
    TooLong,

    #[error("name is a directory traversal component: {0}")]
    Traversal(String),

    #[error("name contains a path separator")]
    Separator,

    #[error("name contains null byte")]
    NullByte,
}

/// Check that `name` can be used verbatim as one path segment inside a
/// directory without escaping it.
///
/// Rules:
/// - Reject empty and whitespace-only names
/// - Reject `.` and `..`
/// - Reject `/` and `\` anywhere in the name
/// - Reject null bytes
/// - Enforce the byte length limit
pub fn validate_component(name: &str) -> Result<&str, ComponentError> {
    if name.trim().is_empty() {
        return Err(ComponentError::Empty);
    }
    if name.contains('\0') {
        return Err(ComponentError::NullByte);
    }
    if name == "." || name == ".." {
        return Err(ComponentError::Traversal(name.to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(ComponentError::Separator);
    }
    if name.len() > MAX_COMPONENT_BYTES {
        return Err(ComponentError::TooLong);
    }
    Ok(name)
}
