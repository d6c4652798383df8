//! Wire types exchanged with the sandbox service.

use serde::{Deserialize, Deserializer, Serialize};

/// Execution budget requested from the sandbox, in milliseconds.
pub const EXECUTION_TIMEOUT_MS: u64 = 10_000;

/// Body of `POST /execute` sent to the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Code to run.
    pub code: String,
    /// Execution budget in milliseconds.
    pub timeout: u64,
}

impl ExecuteRequest {
    /// Request `code` with the default execution budget.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into(), timeout: EXECUTION_TIMEOUT_MS }
    }
}

/// One captured console line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Stream kind, e.g. `log`, `error`, `result`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Rendered text.
    pub text: String,
}

/// The sandbox's verdict on one execution; relayed to the client as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxOutcome {
    /// Whether the code ran to completion.
    pub success: bool,
    /// Captured output in emission order. Missing or `null` reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub output: Vec<OutputLine>,
    /// Failure description, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<OutputLine>, D::Error> {
    Ok(Option::<Vec<OutputLine>>::deserialize(d)?.unwrap_or_default())
}
