use pulsetick_core::{Collector, PulsetickConfig};

use crate::cli::{CollectAllArgs, CollectArgs};
use crate::error::CliError;

use super::{parse_family, standard_sources, CommandOutput, StoreHandle};

pub async fn run(args: &CollectArgs, config: &PulsetickConfig) -> Result<CommandOutput, CliError> {
    let family = parse_family(&args.family)?;
    let store = StoreHandle::open(config, args.dry_run)?;
    let sources = standard_sources(config);

    let result = Collector::new(&sources, store.as_store(), config.collector_settings())
        .collect(family)
        .await;

    Ok(CommandOutput::ok(serde_json::to_value(&result)?).with_error(!result.is_success()))
}

pub async fn run_all(
    args: &CollectAllArgs,
    config: &PulsetickConfig,
) -> Result<CommandOutput, CliError> {
    let store = StoreHandle::open(config, args.dry_run)?;
    let sources = standard_sources(config);

    let report = Collector::new(&sources, store.as_store(), config.collector_settings())
        .collect_all()
        .await;

    Ok(CommandOutput::ok(serde_json::to_value(&report)?).with_error(!report.status.is_success()))
}
