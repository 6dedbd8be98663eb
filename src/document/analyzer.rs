//! Structural walk over lexer tokens.
//!
//! The walker never evaluates anything. It locates the module's top-level
//! attribute set (behind lambda formals, `let ... in`, `with X;` and
//! `assert`), then processes attribute-set frames from an explicit stack.
//! Each frame contributes `path = value;` bindings; values that are plain
//! attribute sets push a new frame with the extended prefix. Everything
//! else (`let` bodies, function applications, `mkIf` wrappers, lists other
//! than the package list) is skipped by delimiter matching and stays opaque.

use super::index::{
    Attribute, Binding, Block, Body, NamedBlock, OtherBlock, PackageEntry, PackageList, StructuralIndex,
    literal_bool, normalize_package_name,
};
use super::lexer::{ScanError, Token, TokenKind, tokenize};
use super::{ConfigDocument, Span};
use crate::constants::{PACKAGE_LIST_PATH, SERVICES_NAMESPACE, USERS_NAMESPACE};
use crate::error::{Result, SafenixError};
use std::collections::HashMap;

/// Build the structural index of a document's working text.
pub fn analyze(doc: &ConfigDocument) -> Result<StructuralIndex> {
    analyze_text(doc.text())
}

pub fn analyze_text(src: &str) -> Result<StructuralIndex> {
    let tokens = tokenize(src).map_err(|e| malformed(src, e))?;
    let walker = Walker::new(src, tokens);
    Ok(walker.run())
}

fn malformed(src: &str, err: ScanError) -> SafenixError {
    let (line, column) = err.line_col(src);
    SafenixError::MalformedDocument {
        offset: err.offset,
        line,
        column,
        detail: err.kind.to_string(),
    }
}

/// An attribute set whose bindings are visible, by token index.
struct Frame {
    prefix: Vec<String>,
    open: usize,
    close: usize,
}

struct Walker<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    /// For every opener token, the index of its closer
    matching: Vec<usize>,
    bindings: Vec<Binding>,
    bodies: Vec<Body>,
    /// Package lists keyed by the start of their binding
    lists: HashMap<usize, PackageList>,
}

impl<'a> Walker<'a> {
    fn new(src: &'a str, tokens: Vec<Token>) -> Self {
        let mut matching = vec![usize::MAX; tokens.len()];
        let mut open = Vec::new();
        for (i, token) in tokens.iter().enumerate() {
            if token.is_opener() {
                open.push(i);
            } else if token.is_closer()
                && let Some(o) = open.pop()
            {
                matching[o] = i;
            }
        }

        Self {
            src,
            tokens,
            matching,
            bindings: Vec::new(),
            bodies: Vec::new(),
            lists: HashMap::new(),
        }
    }

    fn run(mut self) -> StructuralIndex {
        let mut index = StructuralIndex::default();

        let Some(root_open) = self.expression_body(0, self.tokens.len()) else {
            return index;
        };
        let root_close = self.matching[root_open];
        index.root = Some(Body {
            prefix: Vec::new(),
            open: self.tokens[root_open].span.start,
            close: self.tokens[root_close].span.start,
        });

        let mut stack = vec![Frame {
            prefix: Vec::new(),
            open: root_open,
            close: root_close,
        }];
        while let Some(frame) = stack.pop() {
            self.walk_frame(&frame, &mut stack);
        }

        self.bindings.sort_by_key(|b| b.span.start);
        self.bodies.sort_by_key(|b| b.open);

        index.blocks = self.assemble_blocks();
        index.namespaces = self
            .bodies
            .iter()
            .filter(|b| is_namespace(&b.prefix))
            .cloned()
            .collect();
        index.bindings = self.bindings;
        index
    }

    fn text(&self, i: usize) -> &'a str {
        self.tokens[i].span.slice(self.src)
    }

    fn is_keyword(&self, i: usize, word: &str) -> bool {
        self.tokens.get(i).is_some_and(|t| t.is_keyword(self.src, word))
    }

    fn kind(&self, i: usize) -> Option<TokenKind> {
        self.tokens.get(i).map(|t| t.kind)
    }

    /// Index just past the token group starting at `i`.
    fn skip_group(&self, i: usize) -> usize {
        if self.tokens[i].is_opener() {
            self.matching[i] + 1
        } else {
            i + 1
        }
    }

    /// Next `;` at this nesting level in `[i, limit)`.
    fn next_semi(&self, mut i: usize, limit: usize) -> Option<usize> {
        while i < limit {
            if self.tokens[i].kind == TokenKind::Semi {
                return Some(i);
            }
            i = self.skip_group(i);
        }
        None
    }

    /// The `;` terminating a binding value that starts at `i`. Semicolons
    /// owned by `let`, `with` and `assert` inside the value are skipped.
    fn value_end(&self, mut i: usize, limit: usize) -> Option<usize> {
        let mut lets = 0usize;
        let mut pending = 0usize;
        while i < limit {
            let token = self.tokens[i];
            if token.is_opener() {
                i = self.matching[i] + 1;
                continue;
            }
            match token.kind {
                TokenKind::Ident => match self.text(i) {
                    "let" => lets += 1,
                    "in" if lets > 0 => lets -= 1,
                    "with" | "assert" => pending += 1,
                    _ => {}
                },
                TokenKind::Semi => {
                    if pending > 0 {
                        pending -= 1;
                    } else if lets == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Is the brace group at `i` lambda formals rather than an attribute set?
    fn is_formals(&self, i: usize) -> bool {
        if i > 0 && self.kind(i - 1) == Some(TokenKind::At) {
            return true;
        }
        let after = self.matching[i] + 1;
        matches!(self.kind(after), Some(TokenKind::Colon) | Some(TokenKind::At))
    }

    /// Find the attribute set an expression evaluates to, looking through
    /// lambdas, `let`, `with`, `assert`, `rec` and parentheses.
    fn expression_body(&self, start: usize, end: usize) -> Option<usize> {
        let mut i = start;
        while i < end {
            let token = self.tokens[i];
            match token.kind {
                TokenKind::OpenBrace if self.is_formals(i) => {
                    i = self.matching[i] + 1;
                    // `{ ... } @ args :`
                    if self.kind(i) == Some(TokenKind::At) {
                        i += 2;
                    }
                    if self.kind(i) == Some(TokenKind::Colon) {
                        i += 1;
                    }
                }
                TokenKind::OpenBrace => return Some(i),
                TokenKind::OpenParen => {
                    return self.expression_body(i + 1, self.matching[i]);
                }
                TokenKind::Ident => match self.text(i) {
                    "let" => {
                        i = self.skip_let(i + 1, end)?;
                    }
                    "with" | "assert" => {
                        i = self.next_semi(i + 1, end)? + 1;
                    }
                    "rec" => i += 1,
                    _ if self.kind(i + 1) == Some(TokenKind::Colon) => i += 2,
                    _ if self.kind(i + 1) == Some(TokenKind::At) => i += 2,
                    _ => return None,
                },
                _ => return None,
            }
        }
        None
    }

    /// Index just past the `in` closing a `let` whose bindings start at `i`.
    fn skip_let(&self, mut i: usize, end: usize) -> Option<usize> {
        let mut depth = 1usize;
        while i < end {
            if self.is_keyword(i, "let") {
                depth += 1;
            } else if self.is_keyword(i, "in") {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            i = self.skip_group(i);
        }
        None
    }

    fn walk_frame(&mut self, frame: &Frame, stack: &mut Vec<Frame>) {
        let close = frame.close;
        let mut i = frame.open + 1;

        while i < close {
            if self.kind(i) == Some(TokenKind::Semi) {
                i += 1;
                continue;
            }
            if self.is_keyword(i, "inherit") {
                i = self.next_semi(i, close).map_or(close, |s| s + 1);
                continue;
            }

            let Some((segments, assign)) = self.attr_path(i, close) else {
                i = self.value_end(i, close).map_or(close, |s| s + 1);
                continue;
            };

            let value_start = assign + 1;
            let semi = self.value_end(value_start, close);
            let value_end = semi.unwrap_or(close);

            let assign_end = self.tokens[assign].span.end;
            let value = if value_end > value_start {
                Span::new(
                    self.tokens[value_start].span.start,
                    self.tokens[value_end - 1].span.end,
                )
            } else {
                Span::new(assign_end, assign_end)
            };
            let span_end = match semi {
                Some(s) => self.tokens[s].span.end,
                None => value.end.max(assign_end),
            };
            let span = Span::new(self.tokens[i].span.start, span_end);

            let mut path = frame.prefix.clone();
            path.extend(segments);

            let attrset = self.attrset_value(value_start, value_end);
            if let Some(open) = attrset {
                let body_close = self.matching[open];
                self.bodies.push(Body {
                    prefix: path.clone(),
                    open: self.tokens[open].span.start,
                    close: self.tokens[body_close].span.start,
                });
                stack.push(Frame {
                    prefix: path.clone(),
                    open,
                    close: body_close,
                });
            } else if path_is(&path, PACKAGE_LIST_PATH)
                && let Some(list) = self.package_list(span, value_start, value_end)
            {
                self.lists.insert(span.start, list);
            }

            self.bindings.push(Binding {
                path,
                frame_prefix_len: frame.prefix.len(),
                span,
                value,
                value_is_attrset: attrset.is_some(),
            });

            i = semi.map_or(close, |s| s + 1);
        }
    }

    /// Parse `a.b."c".${d}` up to `=`; returns the segments and the `=` index.
    fn attr_path(&self, mut i: usize, limit: usize) -> Option<(Vec<String>, usize)> {
        let mut segments = Vec::new();
        while i < limit {
            match self.tokens[i].kind {
                TokenKind::Ident => {
                    segments.push(self.text(i).to_string());
                    i += 1;
                }
                TokenKind::Str => {
                    segments.push(string_segment(self.text(i)));
                    i += 1;
                }
                TokenKind::OpenInterp => {
                    let end = self.matching[i];
                    segments.push(self.src[self.tokens[i].span.start..self.tokens[end].span.end].to_string());
                    i = end + 1;
                }
                _ => return None,
            }
            match self.kind(i) {
                Some(TokenKind::Dot) => i += 1,
                Some(TokenKind::Assign) => return Some((segments, i)),
                _ => return None,
            }
        }
        None
    }

    /// The `{` of a value that is exactly one attribute set (`{ }` / `rec { }`).
    fn attrset_value(&self, start: usize, end: usize) -> Option<usize> {
        let open = if self.is_keyword(start, "rec") { start + 1 } else { start };
        if open < end && self.kind(open) == Some(TokenKind::OpenBrace) && self.matching[open] == end - 1 {
            Some(open)
        } else {
            None
        }
    }

    /// `[ ... ]` or `with X; [ ... ]`, optionally followed by `++ [ ... ]`.
    fn package_list(&self, range: Span, start: usize, end: usize) -> Option<PackageList> {
        let mut i = start;
        let mut with_scope = None;
        while self.is_keyword(i, "with") {
            let semi = self.next_semi(i + 1, end)?;
            if semi > i + 1 && with_scope.is_none() {
                let scope = &self.src[self.tokens[i + 1].span.start..self.tokens[semi - 1].span.end];
                with_scope = Some(scope.trim().to_string());
            }
            i = semi + 1;
        }
        if self.kind(i) != Some(TokenKind::OpenBracket) {
            return None;
        }

        let mut list = PackageList {
            range,
            open: self.tokens[i].span.start,
            close: self.tokens[self.matching[i]].span.start,
            with_scope,
            packages: Vec::new(),
            last_item_end: None,
        };

        let mut first = true;
        while i < end {
            if self.kind(i) == Some(TokenKind::OpenBracket) {
                let close = self.matching[i];
                let last = self.list_items(i + 1, close, &mut list.packages);
                if first {
                    list.last_item_end = last;
                    first = false;
                }
                i = close + 1;
            } else {
                i = self.skip_group(i);
            }
        }
        Some(list)
    }

    /// Collect identifier items in `[start, end)`; returns the end offset of
    /// the last item of any shape.
    fn list_items(&self, mut i: usize, end: usize, out: &mut Vec<PackageEntry>) -> Option<usize> {
        let mut last_end = None;
        while i < end {
            let token = self.tokens[i];
            if token.kind == TokenKind::Ident {
                let mut j = i + 1;
                while j + 1 < end
                    && self.kind(j) == Some(TokenKind::Dot)
                    && matches!(self.kind(j + 1), Some(TokenKind::Ident) | Some(TokenKind::Str))
                {
                    j += 2;
                }
                let span = Span::new(token.span.start, self.tokens[j - 1].span.end);
                out.push(PackageEntry {
                    name: normalize_package_name(span.slice(self.src)).to_string(),
                    span,
                });
                last_end = Some(span.end);
                i = j;
            } else {
                let next = self.skip_group(i);
                last_end = Some(self.tokens[next - 1].span.end);
                i = next;
            }
        }
        last_end
    }

    fn assemble_blocks(&mut self) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut named: HashMap<(bool, String), usize> = HashMap::new();

        for binding in &self.bindings {
            if let Some(list) = self.lists.remove(&binding.span.start) {
                blocks.push(Block::PackageList(list));
                continue;
            }

            let anchor = [(true, SERVICES_NAMESPACE), (false, USERS_NAMESPACE)]
                .into_iter()
                .find(|(_, ns)| binding.path.len() > ns.len() && path_is(&binding.path[..ns.len()], ns));

            if let Some((is_service, ns)) = anchor {
                let name = binding.path[ns.len()].clone();
                let slot = *named.entry((is_service, name.clone())).or_insert_with(|| {
                    let block = NamedBlock::new(&name, ns, binding);
                    blocks.push(if is_service {
                        Block::Service(block)
                    } else {
                        Block::User(block)
                    });
                    blocks.len() - 1
                });
                let (Block::Service(block) | Block::User(block)) = &mut blocks[slot] else {
                    continue;
                };

                if binding.frame_prefix_len <= ns.len() {
                    block.range = block.range.union(binding.span);
                    block.entries.push(binding.clone());
                }
                if binding.path.len() > ns.len() + 1 && !binding.value_is_attrset {
                    let key = binding.path[ns.len() + 1..].join(".");
                    block.attributes.insert(
                        key,
                        Attribute {
                            value: binding.value,
                            binding: binding.span,
                            flag: literal_bool(binding.value.slice(self.src)),
                        },
                    );
                }
                continue;
            }

            if binding.frame_prefix_len == 0 && !is_container(binding) {
                blocks.push(Block::Other(OtherBlock {
                    path: binding.dotted(),
                    range: binding.span,
                }));
            }
        }

        for block in &mut blocks {
            if let Block::Service(named) | Block::User(named) = block {
                let path = named.path();
                named.bodies = self
                    .bodies
                    .iter()
                    .filter(|b| b.prefix.starts_with(&path))
                    .cloned()
                    .collect();
            }
        }
        blocks
    }
}

fn path_is(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

/// `services = { ... }`, `users.users = { ... }` and friends hold anchors
/// rather than being one.
fn is_container(binding: &Binding) -> bool {
    binding.value_is_attrset && is_namespace(&binding.path)
}

fn is_namespace(prefix: &[String]) -> bool {
    if prefix.is_empty() {
        return false;
    }
    let within = |anchor: &[&str], inclusive: bool| {
        (prefix.len() < anchor.len() || (inclusive && prefix.len() == anchor.len()))
            && path_is(prefix, &anchor[..prefix.len()])
    };
    within(PACKAGE_LIST_PATH, false) || within(SERVICES_NAMESPACE, true) || within(USERS_NAMESPACE, true)
}

/// `"nginx"` names the attribute `nginx`; anything fancier is kept verbatim.
fn string_segment(raw: &str) -> String {
    match raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) if !inner.contains("${") && !inner.contains('\\') => inner.to_string(),
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests;
