use super::Context;
use crate::error::Result;
use crate::templates::{Fill, list_templates};
use crate::ui as output;
use crate::utils::machine_output;

pub fn run(ctx: &Context) -> Result<()> {
    let catalogue = list_templates();

    if ctx.is_machine() {
        return machine_output::emit_v1("templates", catalogue, Vec::new(), Vec::new(), &ctx.format);
    }

    for template in catalogue {
        output::header(&format!("{}: {}", template.id, template.description));
        for param in template.params {
            let note = match param.fill {
                Fill::Required => "required".to_string(),
                Fill::Default(value) => format!("default {}", value),
                Fill::SystemHostname => "default: this machine's hostname".to_string(),
                Fill::Set("") => "default: none".to_string(),
                Fill::Set(values) => format!("always includes {}", values),
            };
            output::indent(&format!("{:<14} {} ({})", param.name, param.description, note), 1);
        }
    }
    Ok(())
}
