use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Best-effort view of one HTTP exchange. `status` is `None` when no
/// response line was received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub status: Option<u16>,
    pub body: Vec<u8>,
}

/// What a probe produced, before it is reduced to a [`ProbeResult`].
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    Response(ProbeResult),
    Failed {
        error: String,
        partial: Option<ProbeResult>,
    },
}

impl ProbeOutcome {
    pub fn into_best_effort(self) -> ProbeResult {
        match self {
            ProbeOutcome::Response(result) => result,
            ProbeOutcome::Failed { partial, .. } => partial.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssertionKind {
    InvalidStatusCode,
    DidNotSee,
}

impl AssertionKind {
    pub fn describe(self) -> &'static str {
        match self {
            AssertionKind::InvalidStatusCode => "Status code did not match what was expected.",
            AssertionKind::DidNotSee => "Response body did not include a string that what was expected.",
        }
    }
}

/// The expected value an assertion was checking for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expected {
    Status(u16),
    Text(String),
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Status(code) => write!(f, "{}", code),
            Expected::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionError {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AssertionKind,
    pub failed_assertion: Expected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationOutcome {
    /// Title of the site the target belongs to.
    pub title: String,
    pub target_title: String,
    pub url: String,
    pub pass: bool,
    pub errors: Vec<AssertionError>,
}

pub type ResultSet = Vec<EvaluationOutcome>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: String,
    pub result_set: ResultSet,
}

impl LogEntry {
    /// Entry stamped with the current local time, e.g.
    /// `Mon Oct 19 2026 10:00:00 GMT+0200`.
    pub fn stamped(result_set: ResultSet) -> Self {
        Self {
            timestamp: Local::now().format("%a %b %d %Y %H:%M:%S GMT%z").to_string(),
            result_set,
        }
    }
}

/// Latest tick published for the results API.
#[derive(Debug, Default)]
pub struct MonitorState {
    pub latest: Option<LogEntry>,
}
