use super::{Context, split_assignment};
use crate::controller::persist;
use crate::error::{Result, SafenixError};
use crate::templates;
use crate::ui as output;
use crate::utils::machine_output;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct GenerateOptions {
    pub template: String,
    /// Raw `key=value` assignments from `--param`
    pub params: Vec<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Generated<'a> {
    template: &'a str,
    output: Option<&'a Path>,
    text: &'a str,
}

pub fn run(ctx: &Context, options: GenerateOptions) -> Result<()> {
    let mut params = BTreeMap::new();
    for raw in &options.params {
        let (key, value) = split_assignment(raw)?;
        if params.insert(key.clone(), value).is_some() {
            return Err(SafenixError::InvalidParameter {
                parameter: key,
                reason: "given more than once".to_string(),
            });
        }
    }

    let text = templates::generate(&options.template, &params)?;

    if let Some(path) = &options.output {
        if path.exists() && !ctx.force {
            return Err(SafenixError::Other(format!(
                "{} already exists; use --force to overwrite it",
                path.display()
            )));
        }
        persist::write_atomic(path, &text)?;
    }

    if ctx.is_machine() {
        let data = Generated {
            template: &options.template,
            output: options.output.as_deref(),
            text: &text,
        };
        return machine_output::emit_v1("generate", data, Vec::new(), Vec::new(), &ctx.format);
    }

    match &options.output {
        Some(path) => output::success(&format!(
            "Wrote '{}' template to {}",
            options.template,
            path.display()
        )),
        None => print!("{}", text),
    }
    Ok(())
}
