//! Configuration document loading and structural analysis.
//!
//! A [`ConfigDocument`] owns two copies of the source: the original text as
//! read (used for diffs and rollback) and the working text that mutations
//! produce. Everything structural is derived from the working text by
//! [`analyze`], which never evaluates Nix; it only walks delimiters,
//! strings and comments.

pub mod analyzer;
pub mod index;
pub mod lexer;
pub mod text;

pub use analyzer::analyze;
pub use index::{Binding, Block, BlockKind, Body, NamedBlock, OtherBlock, PackageEntry, PackageList, StructuralIndex};

use crate::error::{Result, SafenixError};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Byte range `[start, end)` into a document's working text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn union(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// Where a document came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    File(PathBuf),
    Inline,
}

#[derive(Debug, Clone)]
pub struct ConfigDocument {
    origin: Origin,
    original: String,
    working: String,
}

impl ConfigDocument {
    /// Read a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let original = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SafenixError::NotFound {
                path: path.to_path_buf(),
            },
            _ => SafenixError::IoError {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        Ok(Self {
            origin: Origin::File(path.to_path_buf()),
            working: original.clone(),
            original,
        })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        let original = text.into();
        Self {
            origin: Origin::Inline,
            working: original.clone(),
            original,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            Origin::File(path) => Some(path),
            Origin::Inline => None,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn text(&self) -> &str {
        &self.working
    }

    pub fn is_modified(&self) -> bool {
        self.original != self.working
    }

    /// Derive a document with new working text, keeping origin and original.
    pub(crate) fn with_text(&self, working: String) -> Self {
        Self {
            origin: self.origin.clone(),
            original: self.original.clone(),
            working,
        }
    }

    /// Drop every mutation and return to the text as loaded.
    pub fn rollback(&mut self) {
        self.working = self.original.clone();
    }

    /// Unified diff from the original to the working text.
    pub fn diff(&self) -> String {
        if !self.is_modified() {
            return String::new();
        }
        let name = match &self.origin {
            Origin::File(path) => path.display().to_string(),
            Origin::Inline => "configuration.nix".to_string(),
        };
        let patch = diffy::create_patch(&self.original, &self.working);
        let body = diffy::PatchFormatter::new().fmt_patch(&patch).to_string();

        // diffy labels both sides "original"/"modified"; relabel with the document name
        let mut out = String::new();
        for (i, line) in body.lines().enumerate() {
            match i {
                0 if line.starts_with("--- ") => out.push_str(&format!("--- a/{}\n", name)),
                1 if line.starts_with("+++ ") => out.push_str(&format!("+++ b/{}\n", name)),
                _ => {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out
    }
}
