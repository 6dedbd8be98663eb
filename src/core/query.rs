//! Read-only questions over a [`StructuralIndex`].
//!
//! Package names are compared after stripping a leading `pkgs.`. A dotted
//! service name such as `xserver.desktopManager.gnome` is looked up inside
//! the block of its first segment.

use crate::document::lexer::{TokenKind, tokenize};
use crate::document::{Binding, NamedBlock, StructuralIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub fn has_package(index: &StructuralIndex, name: &str) -> bool {
    index.package_lists().any(|list| list.contains(name))
}

/// Every package named in any system package list.
pub fn list_packages(index: &StructuralIndex) -> BTreeSet<String> {
    index
        .package_lists()
        .flat_map(|list| list.packages.iter().map(|p| p.name.clone()))
        .collect()
}

pub fn find_system_packages(index: &StructuralIndex) -> BTreeSet<String> {
    list_packages(index)
}

/// The block owning `name` and the remaining dotted path inside it.
pub fn resolve_service<'a>(index: &'a StructuralIndex, name: &'a str) -> Option<(&'a NamedBlock, &'a str)> {
    let (head, sub) = name.split_once('.').unwrap_or((name, ""));
    index.service(head).map(|block| (block, sub))
}

/// True when anything is declared for the service, enabled or not.
pub fn has_service(index: &StructuralIndex, name: &str) -> bool {
    resolve_service(index, name).is_some_and(|(block, sub)| block.declares(sub))
}

/// Literal `enable` value, `None` when absent or not a literal.
pub fn service_enabled_state(index: &StructuralIndex, name: &str) -> Option<bool> {
    resolve_service(index, name).and_then(|(block, sub)| block.enabled(sub))
}

pub fn is_service_enabled(index: &StructuralIndex, name: &str) -> bool {
    service_enabled_state(index, name) == Some(true)
}

/// Service name to whether it is literally enabled.
pub fn list_services(index: &StructuralIndex) -> BTreeMap<String, bool> {
    index
        .services()
        .map(|s| (s.name.clone(), s.enabled("") == Some(true)))
        .collect()
}

pub fn list_users(index: &StructuralIndex) -> BTreeSet<String> {
    index.users().map(|u| u.name.clone()).collect()
}

/// True when some binding sits at or below the dotted `prefix`.
pub fn has_attribute(index: &StructuralIndex, prefix: &str) -> bool {
    let wanted: Vec<&str> = prefix.split('.').collect();
    index.bindings.iter().any(|b| {
        b.path.len() >= wanted.len() && b.path.iter().zip(&wanted).all(|(a, w)| a == w)
    })
}

fn binding_at<'a>(index: &'a StructuralIndex, dotted: &str) -> Option<&'a Binding> {
    index.bindings.iter().find(|b| b.dotted() == dotted)
}

/// Contents of a plain `"..."` value.
fn string_value(binding: &Binding, text: &str) -> Option<String> {
    let raw = binding.value.slice(text).trim();
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains("${") {
        return None;
    }
    Some(inner.replace("\\\"", "\"").replace("\\\\", "\\"))
}

/// Paths and strings listed directly in the root `imports` list.
///
/// Items inside parentheses (`(import ./x.nix { })`) are expressions, not
/// imported files, and are left out.
pub fn list_imports(index: &StructuralIndex, text: &str) -> Vec<String> {
    let Some(binding) = index.root_bindings().find(|b| b.dotted() == "imports") else {
        return Vec::new();
    };
    let value = binding.value.slice(text);
    let Ok(tokens) = tokenize(value) else {
        return Vec::new();
    };

    let mut imports = Vec::new();
    let mut depth = 0usize;
    for token in &tokens {
        match token.kind {
            TokenKind::OpenBracket | TokenKind::OpenParen | TokenKind::OpenBrace | TokenKind::OpenInterp => depth += 1,
            TokenKind::CloseBracket | TokenKind::CloseParen | TokenKind::CloseBrace => {
                depth = depth.saturating_sub(1)
            }
            TokenKind::Path if depth == 1 => imports.push(token.text(value).to_string()),
            TokenKind::Str if depth == 1 => {
                let raw = token.text(value);
                if let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"'))
                    && !inner.contains("${")
                {
                    imports.push(inner.to_string());
                }
            }
            _ => {}
        }
    }
    imports
}

/// Structural overview of a document.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub packages: BTreeSet<String>,
    pub services: BTreeMap<String, bool>,
    pub users: BTreeSet<String>,
    pub top_level: Vec<String>,
    pub imports: Vec<String>,
    pub line_count: usize,
    pub has_hardware_config: bool,
    pub has_bootloader: bool,
    pub has_networking: bool,
    pub has_users: bool,
    pub hostname: Option<String>,
    pub state_version: Option<String>,
}

pub fn summarize(index: &StructuralIndex, text: &str) -> Summary {
    let users = list_users(index);
    let top_level: Vec<String> = {
        let mut seen = BTreeSet::new();
        index
            .root_bindings()
            .filter_map(|b| b.path.first())
            .filter(|head| seen.insert((*head).clone()))
            .cloned()
            .collect()
    };

    let has_hardware_config = binding_at(index, "imports")
        .is_some_and(|b| b.value.slice(text).contains("hardware-configuration.nix"));

    Summary {
        packages: list_packages(index),
        services: list_services(index),
        has_users: !users.is_empty(),
        users,
        top_level,
        imports: list_imports(index, text),
        line_count: text.lines().count(),
        has_hardware_config,
        has_bootloader: has_attribute(index, "boot.loader"),
        has_networking: has_attribute(index, "networking"),
        hostname: binding_at(index, "networking.hostName").and_then(|b| string_value(b, text)),
        state_version: binding_at(index, "system.stateVersion").and_then(|b| string_value(b, text)),
    }
}
