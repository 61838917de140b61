//! Response envelope
//!
//! Every response carries the same shape: successes have `error: null`,
//! failures have `data: null` plus a machine error code.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    pub status: String,
    pub message: String,
    pub error: Option<ErrorBody>,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            error: None,
            data: Some(data),
        }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn failure(code: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            status: "failure".to_string(),
            message: detail.clone(),
            error: Some(ErrorBody {
                code: code.into(),
                detail,
            }),
            data: None,
        }
    }
}
