// {
//   "command": "up",
//   "status": "success",
//   "data": [
//     {
//       "direction": "up",
//       "start_version": 0,
//       "applied_version": 2,
//       "applied": [{"version": 1, "description": "init_organizations", "direction": "up"}, ...]
//     }
//   ],
//   "error": null
// }
use crate::cli::error::{SwellowError, SwellowErrorKind};
use serde::Serialize;


#[derive(Serialize)]
#[serde(tag = "type", content = "message", rename_all = "snake_case")]
pub enum SwellowErrorJson {
    InvalidVersionInterval(String),
    Json(String),
    Migration(String),
    SetGlobalDefault(String),
    Store(String),
}

impl From<&SwellowError> for SwellowErrorJson {
    fn from(e: &SwellowError) -> Self {
        // The pretty CLI output (stderr-like message)
        let stderr = format!("{e}");

        match &e.kind {
            SwellowErrorKind::InvalidVersionInterval(..) => Self::InvalidVersionInterval(stderr),
            SwellowErrorKind::Json(_) => Self::Json(stderr),
            SwellowErrorKind::Migration(_) => Self::Migration(stderr),
            SwellowErrorKind::SetGlobalDefault(_) => Self::SetGlobalDefault(stderr),
            SwellowErrorKind::Store(_) => Self::Store(stderr),
        }
    }
}


#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SwellowStatus {
    Success,
    Error,
}

#[derive(Serialize)]
pub struct SwellowOutput<T: Serialize> {
    pub command: String,
    pub status: SwellowStatus,
    pub data: Option<T>,
    pub error: Option<SwellowErrorJson>,
}

impl<T: Serialize> SwellowOutput<T> {
    pub fn from_result(command: String, result: Result<T, SwellowError>) -> (Self, Option<SwellowError>) {
        match result {
            Ok(data) => (
                SwellowOutput { command, status: SwellowStatus::Success, data: Some(data), error: None },
                None,
            ),
            Err(error) => (
                SwellowOutput {
                    command,
                    status: SwellowStatus::Error,
                    data: None,
                    error: Some(SwellowErrorJson::from(&error)),
                },
                Some(error),
            ),
        }
    }
}
