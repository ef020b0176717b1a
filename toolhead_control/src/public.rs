//! Public state query/update protocol.
//!
//! Requests and replies are JSON objects, one per line:
//!
//! ```text
//! {"op":"get_switch","name":"fan"}
//! {"op":"set_switch","name":"fan","state":true}
//! {"op":"set_switch","name":"fan","value":128}
//! {"op":"get_spindle"}
//! {"op":"set_spindle","on":true,"target_speed":12000}
//! ```
//!
//! A request naming an instance that does not exist yields no reply.

use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StateRequest {
    GetSwitch {
        name: String,
    },
    SetSwitch {
        name: String,
        #[serde(flatten)]
        update: SwitchUpdate,
    },
    GetSpindle,
    SetSpindle {
        on: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_speed: Option<i32>,
    },
}

impl StateRequest {
    pub fn from_json(line: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Switch write: either the logical state or the analog value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwitchUpdate {
    State { state: bool },
    Value { value: f32 },
}

/// Switch read-back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchReport {
    pub name: String,
    pub state: bool,
    pub value: f32,
}

/// Spindle read-back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpindleReport {
    pub on: bool,
    pub target_speed: i32,
}

/// Reply to a request that was taken by an instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateReply {
    Switch(SwitchReport),
    Spindle(SpindleReport),
}

impl StateReply {
    pub fn to_json(&self) -> Result<String, RequestError> {
        Ok(serde_json::to_string(self)?)
    }
}
