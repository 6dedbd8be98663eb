//! Settings Module
//!
//! Tool preferences read from `settings.kdl` (target document, backups,
//! output format, color, extra conflict rules).

use crate::core::conflicts::{ConflictRule, RuleTable, Subject};
use crate::document::text::line_col;
use crate::error::{Result, SafenixError};
use crate::utils::paths;
use kdl::{KdlDocument, KdlNode, KdlValue};
use std::fs;
use std::path::{Path, PathBuf};

pub const VALID_FORMATS: &[&str] = &["text", "json", "yaml"];
pub const VALID_COLORS: &[&str] = &["auto", "always", "never"];

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub target: Option<PathBuf>,
    pub backup: bool,
    pub format: String,
    pub color: String,
    /// Rules added on top of the built-in table
    pub conflicts: Vec<ConflictRule>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: None,
            backup: true,
            format: "text".to_string(),
            color: "auto".to_string(),
            conflicts: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the platform config directory, or defaults when
    /// no settings file exists
    pub fn load() -> Result<Self> {
        let file = paths::settings_file()?;
        if !file.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SafenixError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, Some(path))
    }

    pub fn parse(content: &str, file: Option<&Path>) -> Result<Self> {
        let doc: KdlDocument = content
            .parse()
            .map_err(|e: kdl::KdlError| SafenixError::ConfigError(describe_kdl_error(content, file, &e)))?;

        let mut settings = Self::default();
        for node in doc.nodes() {
            match node.name().value() {
                "target" => {
                    let raw = string_arg(node)?;
                    if raw.trim().is_empty() {
                        return Err(invalid(node, "path cannot be empty"));
                    }
                    settings.target = Some(paths::expand_home(Path::new(raw))?);
                }
                "backup" => {
                    settings.backup = single_arg(node)?
                        .as_bool()
                        .ok_or_else(|| invalid(node, "expected #true or #false"))?;
                }
                "format" => settings.format = one_of(node, VALID_FORMATS)?,
                "color" => settings.color = one_of(node, VALID_COLORS)?,
                "conflicts" => settings.conflicts.extend(parse_conflicts(node)?),
                other => {
                    return Err(SafenixError::ConfigError(format!(
                        "Unknown setting: '{}'. Valid settings: target, backup, format, color, conflicts",
                        other
                    )));
                }
            }
        }

        Ok(settings)
    }

    /// Built-in conflict rules plus the ones configured here
    pub fn rule_table(&self) -> RuleTable {
        let mut table = RuleTable::builtin();
        table.extend(self.conflicts.iter().cloned());
        table
    }
}

fn invalid(node: &KdlNode, reason: &str) -> SafenixError {
    SafenixError::ConfigError(format!(
        "Invalid value for '{}': {}",
        node.name().value(),
        reason
    ))
}

fn single_arg(node: &KdlNode) -> Result<&KdlValue> {
    let mut args = node.entries().iter().filter(|e| e.name().is_none());
    match (args.next(), args.next()) {
        (Some(entry), None) => Ok(entry.value()),
        _ => Err(invalid(node, "expected exactly one value")),
    }
}

fn string_arg(node: &KdlNode) -> Result<&str> {
    single_arg(node)?
        .as_string()
        .ok_or_else(|| invalid(node, "expected a string"))
}

fn one_of(node: &KdlNode, valid: &[&str]) -> Result<String> {
    let value = string_arg(node)?;
    if valid.contains(&value) {
        Ok(value.to_string())
    } else {
        Err(invalid(
            node,
            &format!("'{}' (valid: {})", value, valid.join(", ")),
        ))
    }
}

/// `conflicts { service "a" "b"; package "x" "y" message="..." }`
fn parse_conflicts(node: &KdlNode) -> Result<Vec<ConflictRule>> {
    let Some(children) = node.children() else {
        return Ok(Vec::new());
    };

    let mut rules = Vec::new();
    for child in children.nodes() {
        let kind = child.name().value();
        let make: fn(&str) -> Subject = match kind {
            "service" => Subject::service,
            "package" => Subject::package,
            other => {
                return Err(SafenixError::ConfigError(format!(
                    "Unknown conflict kind '{}' (expected service or package)",
                    other
                )));
            }
        };

        let mut subjects = Vec::new();
        let mut message = None;
        for entry in child.entries() {
            let text = entry
                .value()
                .as_string()
                .ok_or_else(|| invalid(child, "conflict members must be strings"))?;
            match entry.name().map(|n| n.value()) {
                Some("message") => message = Some(text.to_string()),
                Some(other) => {
                    return Err(invalid(child, &format!("unknown property '{}'", other)));
                }
                None => subjects.push(make(text)),
            }
        }

        if subjects.len() < 2 {
            return Err(invalid(child, "a conflict needs at least two members"));
        }

        let message = message.unwrap_or_else(|| {
            let names: Vec<String> = subjects.iter().map(|s| s.to_string()).collect();
            format!("{} are mutually exclusive", names.join(", "))
        });
        rules.push(ConflictRule::new(subjects, message));
    }
    Ok(rules)
}

fn describe_kdl_error(content: &str, file: Option<&Path>, error: &kdl::KdlError) -> String {
    let location = file
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "settings".to_string());

    match error.diagnostics.first() {
        Some(diag) => {
            let (line, column) = line_col(content, diag.span.offset());
            let message = diag.message.clone().unwrap_or_else(|| "parse error".to_string());
            match &diag.help {
                Some(help) => format!("{}:{}:{}: {} (help: {})", location, line, column, message, help),
                None => format!("{}:{}:{}: {}", location, line, column, message),
            }
        }
        None => format!("{}: failed to parse KDL document", location),
    }
}

#[cfg(test)]
mod tests;
