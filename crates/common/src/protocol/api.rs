// Result envelope returned by the local HTTP API: `{ "code", "message" }`.

use serde::{Deserialize, Serialize};

/// Stable result codes of the local API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok,
    DocumentNotFound,
    WorkspaceWriteFailed,
    EditorLaunchFailed,
}

impl ResultCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::DocumentNotFound => 1,
            Self::WorkspaceWriteFailed => 2,
            Self::EditorLaunchFailed => 3,
        }
    }

    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::DocumentNotFound => "the requested document could not be fetched, so it cannot be edited",
            Self::WorkspaceWriteFailed => "the document could not be written to the local workspace",
            Self::EditorLaunchFailed => "the document was opened but the editor failed to start",
        }
    }
}

/// The two-field result every API response carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResult {
    pub code: i32,
    pub message: String,
}

impl ApiResult {
    pub fn ok() -> Self {
        Self::from_code(ResultCode::Ok)
    }

    pub fn from_code(code: ResultCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self { code: code.as_i32(), message: message.into() }
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResultCode::Ok.as_i32()
    }
}
