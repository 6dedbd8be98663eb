//! Conflict detection before mutation.
//!
//! Mutual exclusion is data: a [`ConflictRule`] lists subjects of which at
//! most one may be active. Built-in rules cover the usual NixOS pairs; more
//! come from the settings file. Detection never touches the document.

use crate::core::query::{has_package, is_service_enabled, resolve_service};
use crate::core::types::{AttrValue, EditRequest};
use crate::document::index::{join_key, normalize_package_name, strip_priority_wrapper};
use crate::document::{Block, ConfigDocument, NamedBlock, StructuralIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum Subject {
    /// Path under `services`, possibly dotted (`xserver.displayManager.gdm`)
    Service(String),
    /// Package attribute name without `pkgs.`
    Package(String),
}

impl Subject {
    pub fn service(name: &str) -> Self {
        Subject::Service(name.to_string())
    }

    pub fn package(name: &str) -> Self {
        Subject::Package(normalize_package_name(name).to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            Subject::Service(n) | Subject::Package(n) => n,
        }
    }

    /// Is this subject present in the document (enabled service or declared package)?
    fn is_active(&self, index: &StructuralIndex) -> bool {
        match self {
            Subject::Service(name) => is_service_enabled(index, name),
            Subject::Package(name) => has_package(index, name),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Service(n) => write!(f, "service '{}'", n),
            Subject::Package(n) => write!(f, "package '{}'", n),
        }
    }
}

/// Members are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRule {
    pub subjects: Vec<Subject>,
    pub message: String,
}

impl ConflictRule {
    pub fn new(subjects: Vec<Subject>, message: impl Into<String>) -> Self {
        Self {
            subjects,
            message: message.into(),
        }
    }

    fn services(names: &[&str], message: &str) -> Self {
        Self::new(names.iter().map(|n| Subject::service(n)).collect(), message)
    }

    pub fn contains(&self, subject: &Subject) -> bool {
        self.subjects.contains(subject)
    }
}

/// Old and new option paths of one service; never exclusive with each other.
const SERVICE_ALIASES: &[&[&str]] = &[
    &["xserver.desktopManager.gnome", "desktopManager.gnome"],
    &["xserver.displayManager.gdm", "displayManager.gdm"],
    &["xserver.displayManager.sddm", "displayManager.sddm"],
];

/// Same component under two spellings.
pub fn same_component(a: &Subject, b: &Subject) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Subject::Service(x), Subject::Service(y)) => SERVICE_ALIASES
            .iter()
            .any(|group| group.contains(&x.as_str()) && group.contains(&y.as_str())),
        _ => false,
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<ConflictRule>,
}

impl RuleTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        Self {
            rules: vec![
                ConflictRule::services(
                    &["pipewire", "pulseaudio"],
                    "PipeWire provides its own PulseAudio server",
                ),
                ConflictRule::services(
                    &[
                        "xserver.desktopManager.gnome",
                        "desktopManager.gnome",
                        "desktopManager.plasma6",
                        "xserver.desktopManager.plasma5",
                    ],
                    "GNOME and Plasma set conflicting defaults; enable one desktop",
                ),
                ConflictRule::services(
                    &[
                        "xserver.displayManager.gdm",
                        "displayManager.gdm",
                        "displayManager.sddm",
                        "xserver.displayManager.lightdm",
                    ],
                    "only one display manager can own the seat",
                ),
                ConflictRule::services(&["nginx", "httpd"], "both web servers bind ports 80 and 443"),
                ConflictRule::services(
                    &["tlp", "power-profiles-daemon"],
                    "TLP and power-profiles-daemon both manage power settings",
                ),
            ],
        }
    }

    pub fn push(&mut self, rule: ConflictRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ConflictRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Extend<ConflictRule> for RuleTable {
    fn extend<T: IntoIterator<Item = ConflictRule>>(&mut self, iter: T) {
        self.rules.extend(iter);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Package already declared
    Duplicate,
    MutualExclusion,
    /// Service already enabled with the requested attributes
    AlreadyEnabled,
    /// Service already absent or disabled with the requested attributes
    AlreadyDisabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub message: String,
    /// Index into `StructuralIndex::blocks` of the offending block
    pub block: Option<usize>,
    pub subject: Subject,
}

impl Conflict {
    /// Only mutual exclusion stops an edit; the rest make it a no-op.
    pub fn is_blocking(&self) -> bool {
        self.kind == ConflictKind::MutualExclusion
    }
}

/// Every conflict `request` would run into against the current document.
pub fn check(
    doc: &ConfigDocument,
    index: &StructuralIndex,
    rules: &RuleTable,
    request: &EditRequest,
) -> Vec<Conflict> {
    match request {
        EditRequest::AddPackage { name } => check_package(index, rules, name),
        EditRequest::SetService {
            name,
            enabled,
            attributes,
        } => check_service(doc.text(), index, rules, name, *enabled, attributes),
    }
}

fn check_package(index: &StructuralIndex, rules: &RuleTable, name: &str) -> Vec<Conflict> {
    let subject = Subject::package(name);

    if has_package(index, name) {
        let block = index
            .blocks
            .iter()
            .position(|b| matches!(b, Block::PackageList(l) if l.contains(name)));
        return vec![Conflict {
            kind: ConflictKind::Duplicate,
            message: format!("Package '{}' is already declared", subject.name()),
            block,
            subject,
        }];
    }

    exclusions(index, rules, &subject)
}

fn check_service(
    text: &str,
    index: &StructuralIndex,
    rules: &RuleTable,
    name: &str,
    enabled: bool,
    attributes: &BTreeMap<String, AttrValue>,
) -> Vec<Conflict> {
    let subject = Subject::service(name);
    let head = name.split('.').next().unwrap_or(name);
    let block_ref = index.position_of_service(head);

    if enabled {
        let conflicts = exclusions(index, rules, &subject);
        if !conflicts.is_empty() {
            return conflicts;
        }
    }

    let resolved = resolve_service(index, name);
    let attributes_match = match resolved {
        Some((block, sub)) => attributes
            .iter()
            .all(|(key, value)| attribute_matches(block, &join_key(sub, key), value, text)),
        None => attributes.is_empty(),
    };
    if !attributes_match {
        return Vec::new();
    }

    let state = resolved.map_or(EnableState::Unset, |(block, sub)| enable_state(block, sub));
    match (enabled, state) {
        (true, EnableState::On) => vec![Conflict {
            kind: ConflictKind::AlreadyEnabled,
            message: format!("Service '{}' is already enabled", name),
            block: block_ref,
            subject,
        }],
        (false, EnableState::Off | EnableState::Unset) => vec![Conflict {
            kind: ConflictKind::AlreadyDisabled,
            message: format!("Service '{}' is already disabled", name),
            block: block_ref,
            subject,
        }],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnableState {
    On,
    Off,
    Unset,
    /// Bound to something that is not a literal
    Computed,
}

fn enable_state(block: &NamedBlock, sub: &str) -> EnableState {
    match block.attributes.get(&join_key(sub, "enable")) {
        None => EnableState::Unset,
        Some(attr) => match attr.flag {
            Some(true) => EnableState::On,
            Some(false) => EnableState::Off,
            None => EnableState::Computed,
        },
    }
}

fn attribute_matches(block: &NamedBlock, key: &str, value: &AttrValue, text: &str) -> bool {
    block
        .attribute_text(key, text)
        .is_some_and(|current| strip_priority_wrapper(current) == value.render())
}

/// One `MutualExclusion` per active member sharing a rule with `subject`.
fn exclusions(index: &StructuralIndex, rules: &RuleTable, subject: &Subject) -> Vec<Conflict> {
    let mut seen = BTreeSet::new();
    let mut conflicts = Vec::new();

    for rule in rules.rules().iter().filter(|r| r.contains(subject)) {
        for other in rule.subjects.iter().filter(|s| !same_component(s, subject)) {
            if !other.is_active(index) || !seen.insert(other.clone()) {
                continue;
            }
            let block = match other {
                Subject::Service(name) => index.position_of_service(name.split('.').next().unwrap_or(name)),
                Subject::Package(_) => None,
            };
            conflicts.push(Conflict {
                kind: ConflictKind::MutualExclusion,
                message: format!("{} conflicts with {}: {}", subject, other, rule.message),
                block,
                subject: subject.clone(),
            });
        }
    }
    conflicts
}
