use crate::document::lexer::{TokenKind, tokenize};
use crate::error::{Result, SafenixError};
use crate::utils::sanitize::{validate_attribute_key, validate_package_name, validate_service_name};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A typed attribute value, rendered to Nix source on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<AttrValue>),
    /// A Nix expression written as-is (`pkgs.postgresql_16`, `[ 22 80 ]`)
    Raw(String),
}

impl AttrValue {
    /// Nix source for this value.
    pub fn render(&self) -> String {
        match self {
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Int(n) => n.to_string(),
            AttrValue::Str(s) => nix_string(s),
            AttrValue::List(items) if items.is_empty() => "[ ]".to_string(),
            AttrValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(AttrValue::render).collect();
                format!("[ {} ]", rendered.join(" "))
            }
            AttrValue::Raw(expr) => expr.trim().to_string(),
        }
    }

    /// Reject raw expressions that would not stay a single value once spliced.
    pub fn check(&self) -> Result<()> {
        match self {
            AttrValue::Raw(expr) => check_raw(expr),
            AttrValue::List(items) => items.iter().try_for_each(AttrValue::check),
            _ => Ok(()),
        }
    }

    /// Interpret a command-line value: booleans, integers, and anything that
    /// looks like an expression (`[..]`, `{..}`, `(..)`, `pkgs.x`) stay typed;
    /// `"quoted"` and everything else is a string.
    pub fn parse_cli(input: &str) -> AttrValue {
        let trimmed = input.trim();
        match trimmed {
            "true" => return AttrValue::Bool(true),
            "false" => return AttrValue::Bool(false),
            _ => {}
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return AttrValue::Int(n);
        }
        if let Some(inner) = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
        {
            return AttrValue::Str(inner.to_string());
        }
        let expression = trimmed.starts_with(['[', '{', '('])
            || ["pkgs.", "lib.", "config."]
                .iter()
                .any(|p| trimmed.starts_with(p));
        if expression {
            AttrValue::Raw(trimmed.to_string())
        } else {
            AttrValue::Str(input.to_string())
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Quote `s` as a double-quoted Nix string.
pub fn nix_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

fn check_raw(expr: &str) -> Result<()> {
    let reject = |why: &str| {
        Err(SafenixError::UnsupportedEditShape(format!(
            "raw value '{}' {}",
            crate::utils::sanitize::sanitize_for_display(expr),
            why
        )))
    };

    let tokens = match tokenize(expr) {
        Ok(tokens) => tokens,
        Err(e) => return reject(&format!("does not scan: {}", e.kind)),
    };
    if tokens.is_empty() {
        return reject("is empty");
    }

    // A top-level `;` would end the binding early unless a `let`, `with`
    // or `assert` in the value owns it
    let owned = tokens.iter().any(|t| {
        t.is_keyword(expr, "let") || t.is_keyword(expr, "with") || t.is_keyword(expr, "assert")
    });
    let mut depth = 0usize;
    for token in &tokens {
        if token.is_opener() {
            depth += 1;
        } else if token.is_closer() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.kind == TokenKind::Semi && !owned {
            return reject("contains a top-level ';'");
        }
    }
    Ok(())
}

/// One requested mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditRequest {
    AddPackage {
        name: String,
    },
    SetService {
        name: String,
        enabled: bool,
        #[serde(default)]
        attributes: BTreeMap<String, AttrValue>,
    },
}

impl EditRequest {
    pub fn add_package(name: impl Into<String>) -> Self {
        EditRequest::AddPackage { name: name.into() }
    }

    pub fn set_service(name: impl Into<String>, enabled: bool) -> Self {
        EditRequest::SetService {
            name: name.into(),
            enabled,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute for `SetService`; ignored for other requests.
    pub fn with_attribute(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        if let EditRequest::SetService { attributes, .. } = &mut self {
            attributes.insert(key.into(), value);
        }
        self
    }

    /// Package or service name the request targets.
    pub fn subject(&self) -> &str {
        match self {
            EditRequest::AddPackage { name } | EditRequest::SetService { name, .. } => name,
        }
    }

    /// Names and values must be splice-safe before anything is touched.
    pub fn validate(&self) -> Result<()> {
        match self {
            EditRequest::AddPackage { name } => validate_package_name(name),
            EditRequest::SetService {
                name, attributes, ..
            } => {
                validate_service_name(name)?;
                for (key, value) in attributes {
                    validate_attribute_key(key)?;
                    if key == "enable" {
                        return Err(SafenixError::UnsupportedEditShape(
                            "'enable' is set through the enabled flag, not as an attribute".to_string(),
                        ));
                    }
                    value.check()?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for EditRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditRequest::AddPackage { name } => write!(f, "add package {}", name),
            EditRequest::SetService {
                name,
                enabled,
                attributes,
            } => {
                write!(
                    f,
                    "{} service {}",
                    if *enabled { "enable" } else { "disable" },
                    name
                )?;
                if !attributes.is_empty() {
                    let keys: Vec<&str> = attributes.keys().map(String::as_str).collect();
                    write!(f, " ({})", keys.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_by_type() {
        assert_eq!(AttrValue::Bool(true).render(), "true");
        assert_eq!(AttrValue::Int(-3).render(), "-3");
        assert_eq!(AttrValue::Str("no".into()).render(), "\"no\"");
        assert_eq!(AttrValue::List(vec![]).render(), "[ ]");
        assert_eq!(
            AttrValue::List(vec![AttrValue::Int(22), AttrValue::Str("a".into())]).render(),
            "[ 22 \"a\" ]"
        );
        assert_eq!(AttrValue::Raw(" pkgs.postgresql_16 ".into()).render(), "pkgs.postgresql_16");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(nix_string("a\"b\\c"), r#""a\"b\\c""#);
        assert_eq!(nix_string("${HOME} $x"), r#""\${HOME} $x""#);
        assert_eq!(nix_string("l1\nl2"), r#""l1\nl2""#);
    }

    #[test]
    fn rendered_strings_scan_as_one_token() {
        let rendered = nix_string("tricky \" ${ } '' \\");
        let tokens = tokenize(&rendered).expect("tokenize");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Str);
    }

    #[test]
    fn cli_values() {
        assert_eq!(AttrValue::parse_cli("true"), AttrValue::Bool(true));
        assert_eq!(AttrValue::parse_cli("8080"), AttrValue::Int(8080));
        assert_eq!(AttrValue::parse_cli("\"no\""), AttrValue::Str("no".into()));
        assert_eq!(AttrValue::parse_cli("no"), AttrValue::Str("no".into()));
        assert_eq!(AttrValue::parse_cli("[ 22 80 ]"), AttrValue::Raw("[ 22 80 ]".into()));
        assert_eq!(AttrValue::parse_cli("pkgs.postgresql_16"), AttrValue::Raw("pkgs.postgresql_16".into()));
    }

    #[test]
    fn raw_values_are_checked() {
        assert!(AttrValue::Raw("{ a = 1; }".into()).check().is_ok());
        assert!(AttrValue::Raw("with pkgs; [ a ]".into()).check().is_ok());
        assert!(AttrValue::Raw("1; evil = 2".into()).check().is_err());
        assert!(AttrValue::Raw("[ 1".into()).check().is_err());
        assert!(AttrValue::Raw("  ".into()).check().is_err());
        assert!(AttrValue::List(vec![AttrValue::Raw("}".into())]).check().is_err());
    }

    #[test]
    fn request_validation() {
        assert!(EditRequest::add_package("htop").validate().is_ok());
        assert!(EditRequest::add_package("htop ]").validate().is_err());
        let svc = EditRequest::set_service("openssh", true)
            .with_attribute("settings.PermitRootLogin", AttrValue::Str("no".into()));
        assert!(svc.validate().is_ok());
        let bad = EditRequest::set_service("openssh", true).with_attribute("enable", AttrValue::Bool(true));
        assert!(matches!(bad.validate(), Err(SafenixError::UnsupportedEditShape(_))));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(EditRequest::add_package("htop").to_string(), "add package htop");
        let svc = EditRequest::set_service("docker", false).with_attribute("rootless", AttrValue::Bool(true));
        assert_eq!(svc.to_string(), "disable service docker (rootless)");
    }
}
