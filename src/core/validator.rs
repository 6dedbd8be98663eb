//! Post-mutation syntax check.
//!
//! This is a balance check, not a Nix parser: it guarantees that braces,
//! brackets, parentheses and `${ }` interpolations nest correctly and that
//! every string and block comment is terminated. Balanced text that Nix
//! would still reject (a missing `;`, `a = = b`) passes. Full grammar
//! validation is left to `nixos-rebuild` / `nix-instantiate --parse`.

use crate::document::lexer::tokenize;
use crate::error::{Result, SafenixError};

pub fn validate(text: &str) -> Result<()> {
    tokenize(text).map(|_| ()).map_err(|e| {
        let (line, column) = e.line_col(text);
        SafenixError::UnbalancedDelimiters {
            offset: e.offset,
            line,
            column,
            detail: e.kind.to_string(),
        }
    })
}
