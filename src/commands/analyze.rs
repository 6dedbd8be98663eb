use super::Context;
use crate::controller;
use crate::core::query::Summary;
use crate::error::Result;
use crate::ui as output;
use crate::utils::machine_output;

pub fn run(ctx: &Context) -> Result<()> {
    let target = ctx.target()?;
    let summary = controller::analyze(&target)?;

    if ctx.is_machine() {
        return machine_output::emit_v1("analyze", &summary, Vec::new(), Vec::new(), &ctx.format);
    }

    output::header(&format!("{}", target.display()));
    print_summary(&summary);
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn print_summary(summary: &Summary) {
    output::keyval("Lines", &summary.line_count.to_string());
    if let Some(hostname) = &summary.hostname {
        output::keyval("Hostname", hostname);
    }
    if let Some(version) = &summary.state_version {
        output::keyval("State version", version);
    }
    output::keyval("Hardware config", yes_no(summary.has_hardware_config));
    output::keyval("Boot loader", yes_no(summary.has_bootloader));
    output::keyval("Networking", yes_no(summary.has_networking));

    if !summary.imports.is_empty() {
        output::header(&format!("Imports ({})", summary.imports.len()));
        for import in &summary.imports {
            output::indent(import, 1);
        }
    }

    output::header(&format!("Packages ({})", summary.packages.len()));
    for name in &summary.packages {
        output::indent(name, 1);
    }

    output::header(&format!("Services ({})", summary.services.len()));
    for (name, enabled) in &summary.services {
        output::indent(&format!("{} {}", name, if *enabled { "enabled" } else { "disabled" }), 1);
    }

    if summary.has_users {
        output::header(&format!("Users ({})", summary.users.len()));
        for user in &summary.users {
            output::indent(user, 1);
        }
    }

    output::header("Top-level attributes");
    output::indent(&summary.top_level.join(", "), 1);
}
