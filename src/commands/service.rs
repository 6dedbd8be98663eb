use super::{Context, run_edit, split_assignment};
use crate::core::types::{AttrValue, EditRequest};
use crate::error::Result;

#[derive(Debug)]
pub struct ServiceOptions {
    pub name: String,
    pub disable: bool,
    /// Raw `key=value` assignments from `--set`
    pub set: Vec<String>,
    pub apply: bool,
}

pub fn run(ctx: &Context, options: ServiceOptions) -> Result<()> {
    let mut request = EditRequest::set_service(&options.name, !options.disable);
    for raw in &options.set {
        let (key, value) = split_assignment(raw)?;
        request = request.with_attribute(key, AttrValue::parse_cli(&value));
    }
    run_edit(ctx, "service", &[request], options.apply)
}
