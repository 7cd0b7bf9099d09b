// Snapshot emitted by a log volume stream.

use serde::{Deserialize, Serialize};

use super::frame::Frame;
use crate::error::QueryError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsVolume {
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryError>,
    pub data: Vec<Frame>,
}

impl LogsVolume {
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            error: None,
            data: Vec::new(),
        }
    }

    pub fn done(data: Vec<Frame>) -> Self {
        Self {
            is_loading: false,
            error: None,
            data,
        }
    }

    pub fn failed(error: QueryError) -> Self {
        Self {
            is_loading: false,
            error: Some(error),
            data: Vec::new(),
        }
    }
}
