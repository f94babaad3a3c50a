use pulsetick_core::{PulsetickConfig, ResultStatus};
use pulsetick_warehouse::RunLogRecord;
use serde::Serialize;

use crate::cli::RunsArgs;
use crate::error::CliError;

use super::{open_warehouse, CommandOutput};

#[derive(Debug, Serialize)]
struct RunsResponse {
    status: ResultStatus,
    count: usize,
    data: Vec<RunLogRecord>,
}

pub fn run(args: &RunsArgs, config: &PulsetickConfig) -> Result<CommandOutput, CliError> {
    let warehouse = open_warehouse(config)?;
    let data = warehouse.recent_runs(args.limit)?;

    let response = RunsResponse {
        status: ResultStatus::Success,
        count: data.len(),
        data,
    };
    Ok(CommandOutput::ok(serde_json::to_value(&response)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsetick_core::{Warehouse, WarehouseConfig};
    use tempfile::tempdir;

    #[test]
    fn lists_recorded_runs() {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig::for_home(temp.path())).expect("warehouse");
        warehouse
            .record_run(&RunLogRecord {
                run_id: String::from("8b0e3c1e-5f7e-4d43-9d1a-2f6f0d5b8a11"),
                family: String::from("vix-level"),
                source: Some(String::from("Yahoo Finance (^VIX)")),
                status: String::from("success"),
                records_processed: 21,
                latency_ms: 412,
            })
            .expect("record run");
        drop(warehouse);

        let config = PulsetickConfig {
            home: Some(temp.path().to_path_buf()),
            ..PulsetickConfig::default()
        };
        let output = run(&RunsArgs { limit: 5 }, &config).expect("runs");

        assert_eq!(output.payload["count"], 1);
        assert_eq!(output.payload["data"][0]["family"], "vix-level");
        assert_eq!(output.payload["data"][0]["records_processed"], 21);
    }
}
