use super::Context;
use crate::core::query;
use crate::core::validator::validate;
use crate::document::{ConfigDocument, analyze};
use crate::error::Result;
use crate::ui as output;
use crate::utils::machine_output;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct CheckData {
    target: PathBuf,
    blocks: usize,
    packages: usize,
    services: usize,
}

/// Balance check plus a structural pass. Balanced text can still be
/// rejected by Nix itself; `nixos-rebuild dry-build` is the final word.
pub fn run(ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let doc = ConfigDocument::load(&target)?;
    let index = analyze(&doc)?;
    validate(doc.text())?;

    let data = CheckData {
        target: target.clone(),
        blocks: index.blocks.len(),
        packages: query::list_packages(&index).len(),
        services: query::list_services(&index).len(),
    };

    let mut warnings = Vec::new();
    if index.root.is_none() {
        warnings.push("No top-level attribute set found; edits will be refused".to_string());
    }
    if index.package_lists().count() > 1 {
        warnings.push("environment.systemPackages is declared more than once; packages go to the first".to_string());
    }

    if ctx.is_machine() {
        return machine_output::emit_v1("check", &data, warnings, Vec::new(), &ctx.format);
    }

    output::success(&format!("{} is balanced", target.display()));
    output::keyval("Blocks", &data.blocks.to_string());
    output::keyval("Packages", &data.packages.to_string());
    output::keyval("Services", &data.services.to_string());
    for warning in &warnings {
        output::warning(warning);
    }
    Ok(())
}
