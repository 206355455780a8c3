//! Build command implementation.

use miette::Result;

use fleet_core::config::BuildOverrides;
use fleet_ops::ops_build::{self, BuildOptions};
use fleet_util::errors::FleetError;

use crate::cli::Selection;

pub async fn exec(
    selection: Selection,
    jobs: Option<u32>,
    build_number: Option<u64>,
    timeout_secs: Option<u64>,
    json: bool,
) -> Result<()> {
    let ctx = super::load_context()?;
    let opts = BuildOptions {
        patterns: selection.packages,
        all: selection.all,
        overrides: BuildOverrides {
            jobs,
            build_number,
            timeout_secs,
        },
        quiet: json,
    };

    let result = ops_build::build(&ctx, &opts).await?;
    let report = &result.report;

    if json {
        super::print_json(report)?;
    } else {
        ops_build::print_summary(report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(FleetError::Build {
            message: format!(
                "{} package(s) failed ({} directly, {} not built)",
                report.failed.len(),
                report.direct_failures().count(),
                report.cascade_failures().count()
            ),
        }
        .into())
    }
}
