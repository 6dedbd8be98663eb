//! Versioned machine-readable envelope for `--format json|yaml`.

use crate::error::{Result, SafenixError};
use chrono::Utc;
use serde::Serialize;

pub const CONTRACT_VERSION: &str = "v1";

#[derive(Debug, Serialize)]
pub struct MachineEnvelope<T>
where
    T: Serialize,
{
    pub version: String,
    pub command: String,
    pub ok: bool,
    pub data: T,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub meta: MachineMeta,
}

#[derive(Debug, Serialize)]
pub struct MachineMeta {
    pub generated_at: String,
    pub tool: String,
    pub tool_version: String,
}

impl<T: Serialize> MachineEnvelope<T> {
    pub fn new(command: &str, data: T, warnings: Vec<String>, errors: Vec<String>) -> Self {
        Self {
            version: CONTRACT_VERSION.to_string(),
            command: command.to_string(),
            ok: errors.is_empty(),
            data,
            warnings,
            errors,
            meta: MachineMeta {
                generated_at: Utc::now().to_rfc3339(),
                tool: crate::project_identity::BINARY_NAME.to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }
}

pub fn is_machine_format(format: &str) -> bool {
    matches!(format, "json" | "yaml")
}

pub fn render_v1<T>(envelope: &MachineEnvelope<T>, format: &str) -> Result<String>
where
    T: Serialize,
{
    match format {
        "json" => Ok(serde_json::to_string_pretty(envelope)?),
        "yaml" => Ok(serde_yml::to_string(envelope)?),
        other => Err(SafenixError::Other(format!(
            "'{}' is not a machine output format (use json or yaml)",
            other
        ))),
    }
}

pub fn emit_v1<T>(
    command: &str,
    data: T,
    warnings: Vec<String>,
    errors: Vec<String>,
    format: &str,
) -> Result<()>
where
    T: Serialize,
{
    let envelope = MachineEnvelope::new(command, data, warnings, errors);
    println!("{}", render_v1(&envelope, format)?.trim_end());
    Ok(())
}
