//! Minimal, structure-aware edits.
//!
//! Every edit is expressed as a list of [`Splice`]s against the working
//! text. Bytes outside the splice spans are copied through untouched, so a
//! mutation can never reformat, reorder or drop anything it did not mean to
//! change. Placement and indentation are read off the surrounding text.

use crate::constants::{PACKAGE_LIST_PATH, SERVICES_NAMESPACE};
use crate::core::types::{AttrValue, EditRequest};
use crate::document::index::{join_key, normalize_package_name, strip_priority_wrapper};
use crate::document::text::{
    indent_at, indent_unit, line_end, line_start, newline_style, rest_of_line_is_trivia, starts_line,
};
use crate::document::{Binding, Body, ConfigDocument, NamedBlock, PackageList, Span, StructuralIndex};
use crate::error::{Result, SafenixError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Replace `[start, end)` with `replacement`; an insertion when `start == end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

impl Splice {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            replacement: text.into(),
        }
    }

    pub fn replace(span: Span, text: impl Into<String>) -> Self {
        Self {
            start: span.start,
            end: span.end,
            replacement: text.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub document: ConfigDocument,
    pub splices: Vec<Splice>,
}

impl MutationOutcome {
    pub fn changed(&self) -> bool {
        !self.splices.is_empty()
    }
}

/// Apply one request to `doc`, whose structure is `index`.
pub fn apply_edit(doc: &ConfigDocument, index: &StructuralIndex, request: &EditRequest) -> Result<MutationOutcome> {
    request.validate()?;

    let layout = Layout::of(doc.text());
    let splices = match request {
        EditRequest::AddPackage { name } => vec![add_package(&layout, index, name)?],
        EditRequest::SetService {
            name,
            enabled,
            attributes,
        } => set_service(&layout, index, name, *enabled, attributes)?,
    };

    let text = apply_splices(doc.text(), &splices)?;
    Ok(MutationOutcome {
        document: doc.with_text(text),
        splices,
    })
}

/// Rebuild `text` with `splices` applied. Splices may not overlap.
pub fn apply_splices(text: &str, splices: &[Splice]) -> Result<String> {
    let mut ordered: Vec<&Splice> = splices.iter().collect();
    ordered.sort_by_key(|s| (s.start, s.end));

    for pair in ordered.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(SafenixError::UnsupportedEditShape(format!(
                "overlapping edits at bytes {} and {}",
                pair[0].start, pair[1].start
            )));
        }
    }

    let growth: usize = splices.iter().map(|s| s.replacement.len()).sum();
    let mut out = String::with_capacity(text.len() + growth);
    let mut cursor = 0;
    for splice in ordered {
        out.push_str(&text[cursor..splice.start]);
        out.push_str(&splice.replacement);
        cursor = splice.end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}

/// Text to insert, one entry per line with its nesting depth.
struct Snippet {
    lines: Vec<(usize, String)>,
}

impl Snippet {
    fn line(text: String) -> Self {
        Self {
            lines: vec![(0, text)],
        }
    }

    fn render(&self, base: &str, layout: &Layout) -> String {
        let mut out = String::new();
        for (i, (depth, line)) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push_str(layout.nl);
                out.push_str(base);
                out.push_str(&layout.unit.repeat(*depth));
            }
            out.push_str(line);
        }
        out
    }

    fn inline(&self) -> String {
        self.lines
            .iter()
            .map(|(_, l)| l.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

enum Anchor {
    /// New line(s) starting at `offset`, which is a line start
    LineBefore {
        offset: usize,
        indent: String,
        blank_after: bool,
    },
    /// New line(s) after the line ending at `offset`
    LineAfter { offset: usize, indent: String },
    /// Same line, padded with spaces
    Inline { offset: usize, lead: bool, trail: bool },
}

struct Layout<'a> {
    text: &'a str,
    unit: String,
    nl: &'static str,
}

impl<'a> Layout<'a> {
    fn of(text: &'a str) -> Self {
        Self {
            text,
            unit: indent_unit(text),
            nl: newline_style(text),
        }
    }

    fn place(&self, anchor: &Anchor, snippet: &Snippet) -> Splice {
        match anchor {
            Anchor::LineBefore {
                offset,
                indent,
                blank_after,
            } => {
                let mut text = format!("{}{}{}", indent, snippet.render(indent, self), self.nl);
                if *blank_after {
                    text.push_str(self.nl);
                }
                Splice::insert(*offset, text)
            }
            Anchor::LineAfter { offset, indent } => Splice::insert(
                *offset,
                format!("{}{}{}", self.nl, indent, snippet.render(indent, self)),
            ),
            Anchor::Inline { offset, lead, trail } => Splice::insert(
                *offset,
                format!(
                    "{}{}{}",
                    if *lead { " " } else { "" },
                    snippet.inline(),
                    if *trail { " " } else { "" }
                ),
            ),
        }
    }

    /// Right after a binding: a new line if the rest of its line is free.
    fn after_binding(&self, span: Span) -> Anchor {
        if rest_of_line_is_trivia(self.text, span.end) {
            let mut offset = line_end(self.text, span.end);
            if offset > 0 && self.text.as_bytes()[offset - 1] == b'\r' {
                offset -= 1;
            }
            Anchor::LineAfter {
                offset,
                indent: indent_at(self.text, span.start).to_string(),
            }
        } else {
            Anchor::Inline {
                offset: span.end,
                lead: true,
                trail: false,
            }
        }
    }

    /// Just before the closing delimiter at `close`.
    fn before_close(&self, close: usize, indent_hint: Option<&str>) -> Anchor {
        if starts_line(self.text, close) {
            let indent = match indent_hint {
                Some(hint) => hint.to_string(),
                None => format!("{}{}", indent_at(self.text, close), self.unit),
            };
            return Anchor::LineBefore {
                offset: line_start(self.text, close),
                indent,
                blank_after: false,
            };
        }
        let spaced = self.text[..close].ends_with(char::is_whitespace);
        Anchor::Inline {
            offset: close,
            lead: !spaced,
            trail: true,
        }
    }

    /// Indentation of the last line-leading binding directly inside `body`.
    fn body_indent(&self, index: &StructuralIndex, body: &Body) -> Option<String> {
        index
            .bindings
            .iter()
            .filter(|b| b.frame_prefix() == body.prefix.as_slice() && b.span.start > body.open && b.span.end <= body.close)
            .rfind(|b| starts_line(self.text, b.span.start))
            .map(|b| indent_at(self.text, b.span.start).to_string())
    }

    /// Where new top-level bindings go: before `system.stateVersion`, else
    /// after the last top-level binding, else inside the empty root set.
    fn canonical_anchor(&self, index: &StructuralIndex) -> Result<Anchor> {
        if let Some(version) = index
            .root_bindings()
            .find(|b| b.dotted() == "system.stateVersion")
        {
            let start = version.span.start;
            if !starts_line(self.text, start) {
                return Ok(Anchor::Inline {
                    offset: start,
                    lead: false,
                    trail: true,
                });
            }
            let offset = line_start(self.text, start);
            let blank_before = offset > 0 && {
                let previous = line_start(self.text, offset - 1);
                self.text[previous..offset].trim().is_empty()
            };
            return Ok(Anchor::LineBefore {
                offset,
                indent: indent_at(self.text, start).to_string(),
                blank_after: blank_before,
            });
        }

        if let Some(last) = index.root_bindings().last() {
            return Ok(self.after_binding(last.span));
        }

        match &index.root {
            Some(root) => Ok(self.before_close(root.close, None)),
            None => Err(SafenixError::BlockNotFound(
                "document has no top-level attribute set to insert into".to_string(),
            )),
        }
    }
}

fn add_package(layout: &Layout, index: &StructuralIndex, name: &str) -> Result<Splice> {
    let name = normalize_package_name(name);

    let Some(list) = index.package_lists().next() else {
        // A list hidden behind parens or `mkIf` is still a definition
        let path: Vec<String> = PACKAGE_LIST_PATH.iter().map(|s| s.to_string()).collect();
        ensure_editable(index, &path)?;
        let anchor = layout.canonical_anchor(index)?;
        let snippet = Snippet {
            lines: vec![
                (0, format!("{} = with pkgs; [", PACKAGE_LIST_PATH.join("."))),
                (1, name.to_string()),
                (0, "];".to_string()),
            ],
        };
        return Ok(layout.place(&anchor, &snippet));
    };

    Ok(insert_into_list(layout, list, name))
}

fn insert_into_list(layout: &Layout, list: &PackageList, name: &str) -> Splice {
    let text = layout.text;
    let bare = list.with_scope.as_deref() == Some("pkgs")
        || (!list.packages.is_empty()
            && list
                .packages
                .iter()
                .all(|p| !p.span.slice(text).starts_with("pkgs.")));
    let item = if bare {
        name.to_string()
    } else {
        format!("pkgs.{}", name)
    };

    let multiline = text[list.open..list.close].contains('\n');
    if multiline && starts_line(text, list.close) {
        let open_line = line_start(text, list.open);
        let indent = match list.last_item_end {
            Some(end) if line_start(text, end - 1) > open_line => indent_at(text, end - 1).to_string(),
            _ => format!("{}{}", indent_at(text, list.close), layout.unit),
        };
        return Splice::insert(line_start(text, list.close), format!("{}{}{}", indent, item, layout.nl));
    }

    match list.last_item_end {
        Some(end) => Splice::insert(end, format!(" {}", item)),
        None if list.close == list.open + 1 => Splice::insert(list.close, format!(" {} ", item)),
        None => Splice::insert(list.close, format!("{} ", item)),
    }
}

fn path_of(prefix: &[&str], dotted: &str) -> Vec<String> {
    prefix
        .iter()
        .map(|s| s.to_string())
        .chain(dotted.split('.').map(str::to_string))
        .collect()
}

/// New bindings at `path` must not land under an expression we cannot see into.
fn ensure_editable(index: &StructuralIndex, path: &[String]) -> Result<()> {
    for binding in &index.bindings {
        let covers = binding.path.len() <= path.len() && path.starts_with(&binding.path);
        if !covers {
            continue;
        }
        if binding.path.len() == path.len() || !binding.value_is_attrset {
            return Err(SafenixError::UnsupportedEditShape(format!(
                "'{}' is defined by '{}' and cannot be extended in place",
                path.join("."),
                binding.dotted()
            )));
        }
    }
    Ok(())
}

/// Rewrite a value span, keeping a `mkDefault`/`mkForce` wrapper.
fn replace_value(text: &str, value: Span, rendered: &str) -> Option<Splice> {
    let raw = value.slice(text);
    let inner = strip_priority_wrapper(raw);
    if inner == rendered {
        return None;
    }
    Some(Splice::replace(Span::new(value.end - inner.len(), value.end), rendered))
}

fn set_service(
    layout: &Layout,
    index: &StructuralIndex,
    name: &str,
    enabled: bool,
    attributes: &BTreeMap<String, AttrValue>,
) -> Result<Vec<Splice>> {
    let (head, sub) = name.split_once('.').unwrap_or((name, ""));

    let mut wanted = vec![(join_key(sub, "enable"), enabled.to_string())];
    wanted.extend(
        attributes
            .iter()
            .map(|(key, value)| (join_key(sub, key), value.render())),
    );

    match index.service(head) {
        Some(block) => edit_service(layout, index, block, &wanted),
        None => synthesize_service(layout, index, name, &wanted[..], sub),
    }
}

/// Where a missing attribute of an existing block is written.
#[derive(PartialEq, Eq)]
enum Target {
    Body(usize),
    AfterEntry,
}

fn edit_service(
    layout: &Layout,
    index: &StructuralIndex,
    block: &NamedBlock,
    wanted: &[(String, String)],
) -> Result<Vec<Splice>> {
    let mut splices = Vec::new();
    let mut groups: Vec<(Target, Vec<String>)> = Vec::new();

    let last_entry: Option<&Binding> = block.entries.iter().max_by_key(|b| b.span.end);

    for (key, rendered) in wanted {
        if let Some(attr) = block.attributes.get(key) {
            splices.extend(replace_value(layout.text, attr.value, rendered));
            continue;
        }

        let mut full = block.path();
        full.extend(key.split('.').map(str::to_string));
        ensure_editable(index, &full)?;

        let deepest = block
            .bodies
            .iter()
            .enumerate()
            .filter(|(_, b)| b.prefix.len() < full.len() && full.starts_with(&b.prefix))
            .max_by_key(|(_, b)| b.prefix.len());

        let (target, local) = match (deepest, last_entry) {
            (Some((i, body)), _) => (Target::Body(i), full[body.prefix.len()..].join(".")),
            (None, Some(entry)) => (Target::AfterEntry, full[entry.frame_prefix_len..].join(".")),
            (None, None) => {
                return Err(SafenixError::BlockNotFound(format!(
                    "service '{}' has no editable binding",
                    block.name
                )));
            }
        };

        let line = format!("{} = {};", local, rendered);
        match groups.iter_mut().find(|(t, _)| *t == target) {
            Some((_, lines)) => lines.push(line),
            None => groups.push((target, vec![line])),
        }
    }

    for (target, lines) in groups {
        let snippet = Snippet {
            lines: lines.into_iter().map(|l| (0, l)).collect(),
        };
        let anchor = match target {
            Target::Body(i) => {
                let body = &block.bodies[i];
                let hint = layout.body_indent(index, body);
                layout.before_close(body.close, hint.as_deref())
            }
            Target::AfterEntry => match last_entry {
                Some(entry) => layout.after_binding(entry.span),
                None => continue,
            },
        };
        splices.push(layout.place(&anchor, &snippet));
    }

    Ok(splices)
}

fn synthesize_service(
    layout: &Layout,
    index: &StructuralIndex,
    name: &str,
    wanted: &[(String, String)],
    sub: &str,
) -> Result<Vec<Splice>> {
    let full = path_of(SERVICES_NAMESPACE, name);
    ensure_editable(index, &full)?;

    // keys in `wanted` are relative to the first segment; re-base on `name`
    let strip = if sub.is_empty() { 0 } else { sub.len() + 1 };
    let build = |local: &[String]| -> Snippet {
        let local = local.join(".");
        if wanted.len() == 1 {
            return Snippet::line(format!("{}.{} = {};", local, &wanted[0].0[strip..], wanted[0].1));
        }
        let mut lines = vec![(0, format!("{} = {{", local))];
        lines.extend(
            wanted
                .iter()
                .map(|(key, value)| (1, format!("{} = {};", &key[strip..], value))),
        );
        lines.push((0, "};".to_string()));
        Snippet { lines }
    };

    let last_entry = index
        .services()
        .flat_map(|s| s.entries.iter())
        .max_by_key(|b| b.span.end);

    let (anchor, snippet) = if let Some(entry) = last_entry {
        (layout.after_binding(entry.span), build(&full[entry.frame_prefix_len..]))
    } else if let Some(namespace) = index
        .namespaces
        .iter()
        .find(|b| b.prefix.iter().map(String::as_str).eq(SERVICES_NAMESPACE.iter().copied()))
    {
        let hint = layout.body_indent(index, namespace);
        (
            layout.before_close(namespace.close, hint.as_deref()),
            build(&full[SERVICES_NAMESPACE.len()..]),
        )
    } else {
        (layout.canonical_anchor(index)?, build(&full))
    };

    Ok(vec![layout.place(&anchor, &snippet)])
}

#[cfg(test)]
mod tests;
