use super::{Context, run_edit};
use crate::core::types::EditRequest;
use crate::error::Result;

pub fn run(ctx: &Context, packages: &[String], apply: bool) -> Result<()> {
    let requests: Vec<EditRequest> = packages.iter().map(EditRequest::add_package).collect();
    run_edit(ctx, "add", &requests, apply)
}
