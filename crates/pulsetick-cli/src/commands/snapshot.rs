use chrono::Utc;
use pulsetick_core::{build_daily_snapshot, parse_date, PulsetickConfig, SnapshotResponse};

use crate::cli::SnapshotArgs;
use crate::error::CliError;

use super::{open_warehouse, CommandOutput};

pub fn run(args: &SnapshotArgs, config: &PulsetickConfig) -> Result<CommandOutput, CliError> {
    let date = parse_date(&args.date)?;
    let warehouse = open_warehouse(config)?;
    let normalizer = config.normalizer();
    let snapshot_time = Utc::now().with_timezone(&normalizer.zone());

    let response = SnapshotResponse::from_result(build_daily_snapshot(
        &warehouse,
        &normalizer,
        date,
        snapshot_time,
    ));
    let is_error = !response.status.is_success();
    Ok(CommandOutput::ok(serde_json::to_value(&response)?).with_error(is_error))
}
