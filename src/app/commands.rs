//! Inbound commands and their replies.
//!
//! These are the schedule-management and manual-dispense requests the
//! outside world (HTTP bridge, stdin JSON lines, tests) hands to the
//! [`AppService`](super::service::AppService).  Fields a client may omit
//! are `Option`s so a missing field becomes a validation error reply
//! rather than a parse failure.
//!
//! Browser clients send `id` as a number (`Date.now()`) and
//! `compartment` as the string value of a form field, so both fields
//! accept either JSON shape.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AppCommand {
    /// Install or replace a daily dose.  A missing `id` is generated
    /// from the current timestamp.
    AddSchedule {
        #[serde(default, deserialize_with = "id_text")]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        time: Option<String>,
        #[serde(default, deserialize_with = "compartment_index")]
        compartment: Option<i64>,
    },

    ListSchedules,

    RemoveSchedule {
        #[serde(default, deserialize_with = "id_text")]
        id: Option<String>,
    },

    /// Dispense now; acknowledged before the carousel moves.
    ManualDispense {
        #[serde(default, deserialize_with = "compartment_index")]
        compartment: Option<i64>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Number(i64),
    Text(String),
}

fn id_text<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<TextOrNumber>::deserialize(de)?.map(|v| match v {
        TextOrNumber::Number(n) => n.to_string(),
        TextOrNumber::Text(s) => s,
    }))
}

fn compartment_index<'de, D: Deserializer<'de>>(de: D) -> Result<Option<i64>, D::Error> {
    match Option::<TextOrNumber>::deserialize(de)? {
        None => Ok(None),
        Some(TextOrNumber::Number(n)) => Ok(Some(n)),
        Some(TextOrNumber::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("compartment {s:?} is not an integer"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// One row of a schedule listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleView {
    pub id: String,
    pub name: String,
    /// Next trigger, in the scheduler's offset (`YYYY-MM-DD HH:MM:SS±HH:MM`).
    pub next_run_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub status: ReplyStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedules: Option<Vec<ScheduleView>>,
}

impl CommandReply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: message.into(),
            schedules: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: message.into(),
            schedules: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ReplyStatus::Success
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"error","message":"unencodable reply"}"#.to_owned())
    }
}
