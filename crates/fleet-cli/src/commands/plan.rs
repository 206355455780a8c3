use miette::Result;

use fleet_ops::ops_plan;

use crate::cli::Selection;

pub fn exec(selection: Selection, json: bool) -> Result<()> {
    let ctx = super::load_context()?;
    let summary = ops_plan::plan(&ctx, &selection.packages, selection.all)?;
    if json {
        super::print_json(&summary)
    } else {
        ops_plan::print_plan(&summary);
        Ok(())
    }
}
