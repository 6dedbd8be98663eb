//! Fresh `configuration.nix` generation from parameterized templates.
//!
//! Every parameter value is validated and then written either as a quoted
//! Nix string or as a checked identifier, so a generated document always
//! passes [`validate`].

mod catalog;

use crate::core::types::nix_string;
use crate::core::validator::validate;
use crate::document::index::normalize_package_name;
use crate::error::{Result, SafenixError};
use crate::ui;
use crate::utils::sanitize::{validate_package_name, validate_service_name};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z_]+)@").expect("Invalid regex pattern"));

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("Invalid regex pattern")
});

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("Invalid regex pattern"));

static TIMEZONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_+/-]*$").expect("Invalid regex pattern"));

static LOCALE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z]{2,3}(_[A-Z]{2})?(\.[A-Za-z0-9-]+)?(@[a-z]+)?|C(\.UTF-8)?)$")
        .expect("Invalid regex pattern")
});

static STATE_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\.\d{2}$").expect("Invalid regex pattern"));

/// How a parameter is validated and rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Hostname,
    Username,
    Timezone,
    Locale,
    StateVersion,
    Packages,
    Services,
}

/// Where a parameter's value comes from when the caller omits it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Fill {
    Required,
    Default(&'static str),
    /// The running machine's hostname, falling back to `nixos`
    SystemHostname,
    /// Set parameters: defaults that caller values are added to
    Set(&'static str),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub fill: Fill,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        self.fill == Fill::Required
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Template {
    pub id: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    /// Services the body already configures; `services` entries under
    /// these are skipped
    #[serde(skip)]
    pub provides: &'static [&'static str],
    #[serde(skip)]
    pub body: &'static str,
}

impl Template {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

pub fn list_templates() -> &'static [Template] {
    catalog::TEMPLATES
}

pub fn find_template(id: &str) -> Result<&'static Template> {
    catalog::TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| SafenixError::UnknownTemplate(id.to_string()))
}

/// Render template `template_id` with `params`.
///
/// Unknown parameter names are errors rather than being ignored, so a typo
/// never silently falls back to a default.
pub fn generate(template_id: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let template = find_template(template_id)?;

    for name in params.keys() {
        if template.param(name).is_none() {
            return Err(SafenixError::UnknownParameter {
                template: template.id.to_string(),
                parameter: name.clone(),
            });
        }
    }

    let mut scalars = BTreeMap::new();
    let mut sets = BTreeMap::new();
    for spec in template.params {
        let given = params.get(spec.name).map(String::as_str);
        match spec.kind {
            ParamKind::Packages | ParamKind::Services => {
                sets.insert(spec.name, resolve_set(template, spec, given)?);
            }
            _ => {
                let value = resolve_scalar(template, spec, given)?;
                scalars.insert(spec.name, render_scalar(spec.kind, &value));
            }
        }
    }

    let output = expand(template, &scalars, &sets)?;
    validate(&output)?;
    ui::debug(&format!("Rendered template '{}' ({} bytes)", template.id, output.len()));
    Ok(output)
}

fn resolve_scalar(template: &Template, spec: &ParamSpec, given: Option<&str>) -> Result<String> {
    let value = match (given, spec.fill) {
        (Some(v), _) => v.trim().to_string(),
        (None, Fill::Default(v)) | (None, Fill::Set(v)) => v.to_string(),
        (None, Fill::SystemHostname) => system_hostname(),
        (None, Fill::Required) => {
            return Err(SafenixError::MissingRequiredParameter {
                template: template.id.to_string(),
                parameter: spec.name.to_string(),
            });
        }
    };
    check_scalar(spec, &value)?;
    Ok(value)
}

fn system_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.split('.').next().unwrap_or_default().to_string())
        .filter(|h| HOSTNAME_RE.is_match(h))
        .unwrap_or_else(|| "nixos".to_string())
}

fn check_scalar(spec: &ParamSpec, value: &str) -> Result<()> {
    let (pattern, expected): (&Regex, &str) = match spec.kind {
        ParamKind::Hostname => (&*HOSTNAME_RE, "letters, digits and inner '-', at most 63 chars"),
        ParamKind::Username => (&*USERNAME_RE, "lowercase login name"),
        ParamKind::Timezone => (&*TIMEZONE_RE, "tz database name such as Europe/Berlin"),
        ParamKind::Locale => (&*LOCALE_RE, "locale such as en_US.UTF-8"),
        ParamKind::StateVersion => (&*STATE_VERSION_RE, "release number in NN.NN form"),
        ParamKind::Packages | ParamKind::Services => return Ok(()),
    };
    if pattern.is_match(value) {
        return Ok(());
    }
    Err(SafenixError::InvalidParameter {
        parameter: spec.name.to_string(),
        reason: format!("'{}' is not a valid value (expected {})", value, expected),
    })
}

fn render_scalar(kind: ParamKind, value: &str) -> String {
    match kind {
        // Spliced as an attribute name; keywords need quoting
        ParamKind::Username if is_keyword(value) => nix_string(value),
        ParamKind::Username => value.to_string(),
        _ => nix_string(value),
    }
}

fn is_keyword(s: &str) -> bool {
    matches!(
        s,
        "assert" | "else" | "if" | "in" | "inherit" | "let" | "or" | "rec" | "then" | "with"
    )
}

fn split_set(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
}

fn resolve_set(template: &Template, spec: &ParamSpec, given: Option<&str>) -> Result<Vec<String>> {
    let defaults = match spec.fill {
        Fill::Set(d) => d,
        _ => "",
    };

    let mut items: Vec<String> = Vec::new();
    for raw in split_set(defaults).chain(given.into_iter().flat_map(split_set)) {
        let item = match spec.kind {
            ParamKind::Packages => {
                validate_package_name(raw).map_err(|e| invalid(spec, e))?;
                normalize_package_name(raw).to_string()
            }
            _ => {
                validate_service_name(raw).map_err(|e| invalid(spec, e))?;
                let provided = template
                    .provides
                    .iter()
                    .any(|p| raw == *p || raw.strip_prefix(p).is_some_and(|rest| rest.starts_with('.')));
                if provided {
                    ui::debug(&format!("Template '{}' already configures '{}'", template.id, raw));
                    continue;
                }
                raw.to_string()
            }
        };
        if !items.contains(&item) {
            items.push(item);
        }
    }
    Ok(items)
}

fn invalid(spec: &ParamSpec, err: SafenixError) -> SafenixError {
    SafenixError::InvalidParameter {
        parameter: spec.name.to_string(),
        reason: err.to_string(),
    }
}

fn expand(
    template: &Template,
    scalars: &BTreeMap<&str, String>,
    sets: &BTreeMap<&str, Vec<String>>,
) -> Result<String> {
    let mut out: Vec<String> = Vec::new();
    let mut unresolved: Vec<String> = Vec::new();
    let mut skip_blank = false;

    for line in template.body.lines() {
        if skip_blank && line.trim().is_empty() {
            skip_blank = false;
            continue;
        }
        skip_blank = false;

        let trimmed = line.trim();
        let set_name = trimmed
            .strip_prefix('@')
            .and_then(|s| s.strip_suffix('@'))
            .filter(|name| sets.contains_key(name));

        if let Some(name) = set_name {
            let indent = &line[..line.len() - line.trim_start().len()];
            let items = sets.get(name).map(Vec::as_slice).unwrap_or_default();
            if items.is_empty() {
                // Keep one blank line where the set would have been
                skip_blank = out.last().is_some_and(|l| l.trim().is_empty());
                continue;
            }
            for item in items {
                match name {
                    "services" => out.push(format!("{}services.{}.enable = true;", indent, item)),
                    _ => out.push(format!("{}{}", indent, item)),
                }
            }
            continue;
        }

        let rendered = PLACEHOLDER.replace_all(line, |caps: &regex::Captures| {
            let name = &caps[1];
            match scalars.get(name) {
                Some(value) => value.clone(),
                None => {
                    unresolved.push(name.to_string());
                    caps[0].to_string()
                }
            }
        });
        out.push(rendered.into_owned());
    }

    if let Some(placeholder) = unresolved.into_iter().next() {
        return Err(SafenixError::UnresolvedPlaceholder {
            template: template.id.to_string(),
            placeholder,
        });
    }

    let mut text = out.join("\n");
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests;
