//! Input validation for names that end up spliced into Nix source
//!
//! Package names, service names and attribute keys are written into the
//! document verbatim, so anything that is not a plain Nix attribute path is
//! rejected before a mutation is attempted.

use crate::error::{Result, SafenixError};
use regex::Regex;
use std::sync::LazyLock;

/// One Nix identifier segment (`firefox`, `nerd-fonts`, `python3Packages`)
static IDENT_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_'-]*$").expect("Invalid regex pattern"));

/// Segments that are keywords and cannot be used unquoted
const RESERVED: &[&str] = &[
    "assert", "else", "if", "in", "inherit", "let", "or", "rec", "then", "with",
];

const MAX_NAME_LEN: usize = 256;

fn check_path(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SafenixError::UnsupportedEditShape(format!(
            "{} cannot be empty",
            kind
        )));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(SafenixError::UnsupportedEditShape(format!(
            "{} too long (max {} chars)",
            kind, MAX_NAME_LEN
        )));
    }

    for segment in name.split('.') {
        if !IDENT_SEGMENT.is_match(segment) {
            return Err(SafenixError::UnsupportedEditShape(format!(
                "{} '{}' is not a plain attribute path",
                kind, name
            )));
        }
        if RESERVED.contains(&segment) {
            return Err(SafenixError::UnsupportedEditShape(format!(
                "{} '{}' uses the reserved word '{}'",
                kind, name, segment
            )));
        }
    }

    Ok(())
}

/// Validate a package attribute path such as `htop` or `pkgs.nerd-fonts.fira-code`.
pub fn validate_package_name(name: &str) -> Result<()> {
    check_path("Package name", name)
}

/// Validate a service name such as `openssh` or `xserver.desktopManager.gnome`.
pub fn validate_service_name(name: &str) -> Result<()> {
    check_path("Service name", name)
}

/// Validate a relative attribute key such as `settings.PermitRootLogin`.
pub fn validate_attribute_key(key: &str) -> Result<()> {
    check_path("Attribute key", key)
}

/// Shorten user input for display in messages.
pub fn sanitize_for_display(input: &str) -> String {
    const LIMIT: usize = 200;
    match input.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &input[..cut]),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests;
