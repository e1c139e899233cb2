//! Process state channel: each stage reads a JSON envelope from stdin
//! and writes the (possibly updated) state back to stdout for the
//! update-framework runner. Logs go to stderr; stdout carries only the
//! state JSON.

use std::io::{Read, Write};

use serde_json::json;

use lawsite_shared::{LawsiteError, Result, StateEnvelope};

/// Read the stage envelope. Empty input is a default (null-state)
/// envelope; malformed JSON is a state-channel error.
pub fn read_envelope(mut reader: impl Read) -> Result<StateEnvelope> {
    let mut input = String::new();
    reader
        .read_to_string(&mut input)
        .map_err(|e| LawsiteError::state(format!("cannot read stdin: {e}")))?;

    if input.trim().is_empty() {
        return Ok(StateEnvelope::default());
    }

    serde_json::from_str(&input)
        .map_err(|e| LawsiteError::state(format!("invalid state envelope: {e}")))
}

/// Write the state value back to the runner.
pub fn write_state(mut writer: impl Write, state: &serde_json::Value) -> Result<()> {
    let line = serde_json::to_string(state)
        .map_err(|e| LawsiteError::state(format!("cannot encode state: {e}")))?;
    writeln!(writer, "{line}").map_err(|e| LawsiteError::state(e.to_string()))
}

/// Report a failed stage to the runner as `{"error": ...}`; the non-zero
/// process exit carries the failure itself.
pub fn write_error(mut writer: impl Write, message: &str) -> Result<()> {
    let line = serde_json::to_string(&json!({ "error": message }))
        .map_err(|e| LawsiteError::state(format!("cannot encode error state: {e}")))?;
    writeln!(writer, "{line}").map_err(|e| LawsiteError::state(e.to_string()))
}
