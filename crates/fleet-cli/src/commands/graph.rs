//! Handler for `fleet graph`.

use miette::Result;

use fleet_ops::ops_graph;

use crate::cli::Selection;

pub fn exec(selection: Selection, dot: bool, json: bool) -> Result<()> {
    let ctx = super::load_context()?;
    let graph = ops_graph::graph(&ctx, &selection.packages, selection.all)?;

    if dot {
        println!("{}", graph.to_dot());
    } else if json {
        super::print_json(&ops_graph::nodes(&graph))?;
    } else if graph.is_empty() {
        println!("No packages selected.");
    } else {
        ops_graph::print_graph(&graph);
    }
    Ok(())
}
