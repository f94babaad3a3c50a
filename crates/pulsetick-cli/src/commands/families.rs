use pulsetick_core::{MetricFamily, ProviderId, PulsetickConfig};
use serde::Serialize;

use crate::error::CliError;

use super::CommandOutput;

#[derive(Debug, Serialize)]
struct FamilyInfo {
    family: MetricFamily,
    label: &'static str,
    provider: ProviderId,
    candidates: &'static [&'static str],
    metrics: &'static [&'static str],
    configured: bool,
}

#[derive(Debug, Serialize)]
struct FamiliesResponseData {
    families: Vec<FamilyInfo>,
}

pub fn run(config: &PulsetickConfig) -> Result<CommandOutput, CliError> {
    let families = MetricFamily::ALL
        .into_iter()
        .map(|family| FamilyInfo {
            family,
            label: family.label(),
            provider: family.provider(),
            candidates: family.candidates(),
            metrics: family.metric_names(),
            configured: family.provider() != ProviderId::Fred || config.fred_api_key.is_some(),
        })
        .collect();

    let data = serde_json::to_value(FamiliesResponseData { families })?;
    Ok(CommandOutput::ok(data))
}
