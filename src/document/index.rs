//! Structural index types produced by the analyzer.

use super::Span;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    PackageList,
    ServiceBlock,
    UserBlock,
    Other,
}

/// One `path = value;` binding the analyzer could see into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Full attribute path, including enclosing attribute-set prefixes
    pub path: Vec<String>,
    /// Segments contributed by enclosing attribute sets (not written locally)
    pub frame_prefix_len: usize,
    /// From the first attribute-path token through the terminating `;`
    pub span: Span,
    /// The value expression, excluding the `;`
    pub value: Span,
    pub value_is_attrset: bool,
}

impl Binding {
    pub fn dotted(&self) -> String {
        self.path.join(".")
    }

    /// The path as written at the binding site.
    pub fn local_path(&self) -> &[String] {
        &self.path[self.frame_prefix_len..]
    }

    /// The enclosing attribute-set prefix.
    pub fn frame_prefix(&self) -> &[String] {
        &self.path[..self.frame_prefix_len]
    }
}

/// An attribute-set value `{ ... }` bound to a known path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Body {
    pub prefix: Vec<String>,
    pub open: usize,
    /// Offset of the closing `}`
    pub close: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageEntry {
    /// Normalised name (`pkgs.` prefix stripped)
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageList {
    pub range: Span,
    /// Offset of `[`
    pub open: usize,
    /// Offset of `]`, the insertion anchor
    pub close: usize,
    /// `pkgs` in `with pkgs; [ ... ]`
    pub with_scope: Option<String>,
    pub packages: Vec<PackageEntry>,
    /// End of the last item of any shape (identifier, string, group)
    pub last_item_end: Option<usize>,
}

impl PackageList {
    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_package_name(name);
        self.packages.iter().any(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub value: Span,
    pub binding: Span,
    /// Literal `true`/`false`, looking through `mkDefault`/`mkForce`
    pub flag: Option<bool>,
}

/// A service or user account: every binding under `<namespace>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedBlock {
    pub name: String,
    /// Namespace path, e.g. `["services"]`
    pub namespace: Vec<String>,
    pub range: Span,
    /// Bindings whose local path names the block (`services.x.enable = ..`,
    /// `x = { .. }` inside `services = { .. }`)
    pub entries: Vec<Binding>,
    /// Relative dotted key (`enable`, `settings.PermitRootLogin`) to value
    pub attributes: BTreeMap<String, Attribute>,
    pub bodies: Vec<Body>,
}

impl NamedBlock {
    pub(crate) fn new(name: &str, namespace: &[&str], first: &Binding) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.iter().map(|s| s.to_string()).collect(),
            range: first.span,
            entries: Vec::new(),
            attributes: BTreeMap::new(),
            bodies: Vec::new(),
        }
    }

    /// Full attribute path of this block: namespace + name.
    pub fn path(&self) -> Vec<String> {
        let mut path = self.namespace.clone();
        path.push(self.name.clone());
        path
    }

    pub fn attribute_text<'a>(&self, key: &str, src: &'a str) -> Option<&'a str> {
        self.attributes.get(key).map(|a| a.value.slice(src).trim())
    }

    pub fn bool_attribute(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(|a| a.flag)
    }

    /// Enable state of the block itself (`sub` empty) or of a nested
    /// component such as `desktopManager.gnome`.
    pub fn enabled(&self, sub: &str) -> Option<bool> {
        self.bool_attribute(&join_key(sub, "enable"))
    }

    /// True when anything is declared at or below `sub`.
    pub fn declares(&self, sub: &str) -> bool {
        if sub.is_empty() {
            return true;
        }
        let nested = format!("{}.", sub);
        self.attributes
            .keys()
            .any(|k| k == sub || k.starts_with(&nested))
            || self.bodies.iter().any(|b| {
                let rel = b.prefix[self.namespace.len() + 1..].join(".");
                rel == sub || rel.starts_with(&nested)
            })
    }
}

/// A root-level binding that is not one of the recognised anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtherBlock {
    pub path: String,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    PackageList(PackageList),
    Service(NamedBlock),
    User(NamedBlock),
    Other(OtherBlock),
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::PackageList(_) => BlockKind::PackageList,
            Block::Service(_) => BlockKind::ServiceBlock,
            Block::User(_) => BlockKind::UserBlock,
            Block::Other(_) => BlockKind::Other,
        }
    }

    pub fn range(&self) -> Span {
        match self {
            Block::PackageList(list) => list.range,
            Block::Service(block) | Block::User(block) => block.range,
            Block::Other(other) => other.range,
        }
    }
}

/// Structural view of one document text. Rebuilt after every mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StructuralIndex {
    /// In order of first appearance
    pub blocks: Vec<Block>,
    /// The module's top-level attribute set
    pub root: Option<Body>,
    /// `services = { ... }` style namespace bodies
    pub namespaces: Vec<Body>,
    /// Every binding reachable from the root without evaluation
    pub bindings: Vec<Binding>,
}

impl StructuralIndex {
    pub fn package_lists(&self) -> impl Iterator<Item = &PackageList> {
        self.blocks.iter().filter_map(|b| match b {
            Block::PackageList(list) => Some(list),
            _ => None,
        })
    }

    pub fn services(&self) -> impl Iterator<Item = &NamedBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Service(block) => Some(block),
            _ => None,
        })
    }

    pub fn users(&self) -> impl Iterator<Item = &NamedBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::User(block) => Some(block),
            _ => None,
        })
    }

    pub fn service(&self, name: &str) -> Option<&NamedBlock> {
        self.services().find(|s| s.name == name)
    }

    pub fn user(&self, name: &str) -> Option<&NamedBlock> {
        self.users().find(|u| u.name == name)
    }

    /// Position of a block in `blocks`, used as the conflict block reference.
    pub fn position_of_service(&self, name: &str) -> Option<usize> {
        self.blocks
            .iter()
            .position(|b| matches!(b, Block::Service(s) if s.name == name))
    }

    /// Root-level bindings, in document order.
    pub fn root_bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(|b| b.frame_prefix_len == 0)
    }
}

/// `pkgs.firefox` and `firefox` name the same package.
pub fn normalize_package_name(name: &str) -> &str {
    name.strip_prefix("pkgs.").unwrap_or(name)
}

pub fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// `lib.mkForce true` -> `true`
pub fn strip_priority_wrapper(raw: &str) -> &str {
    const WRAPPERS: &[&str] = &["lib.mkDefault", "lib.mkForce", "mkDefault", "mkForce"];
    for wrapper in WRAPPERS {
        if let Some(rest) = raw.strip_prefix(wrapper)
            && rest.starts_with(char::is_whitespace)
        {
            return rest.trim();
        }
    }
    raw
}

pub(crate) fn literal_bool(raw: &str) -> Option<bool> {
    match strip_priority_wrapper(raw.trim()) {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
