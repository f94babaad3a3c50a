use pulsetick_core::{parse_date, DateWindow, PulsetickConfig, SeriesReader};

use crate::cli::GetArgs;
use crate::error::CliError;

use super::{open_warehouse, parse_family, CommandOutput};

pub fn run(args: &GetArgs, config: &PulsetickConfig) -> Result<CommandOutput, CliError> {
    let family = parse_family(&args.family)?;
    let window = read_window(args, config)?;
    let warehouse = open_warehouse(config)?;

    let response = SeriesReader::new(&warehouse, config.normalizer()).read(family, &window);
    Ok(CommandOutput::ok(serde_json::to_value(&response)?).with_error(!response.is_success()))
}

/// Explicit bounds win; otherwise the whole collection window is read.
fn read_window(args: &GetArgs, config: &PulsetickConfig) -> Result<DateWindow, CliError> {
    let default = config.read_window();
    let start = match args.start.as_deref() {
        Some(value) => parse_date(value)?,
        None => default.start(),
    };
    let end = match args.end.as_deref() {
        Some(value) => parse_date(value)?,
        None => default.end(),
    };
    Ok(DateWindow::new(start, end)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn args(family: &str, start: Option<&str>, end: Option<&str>) -> GetArgs {
        GetArgs {
            family: family.to_owned(),
            start: start.map(str::to_owned),
            end: end.map(str::to_owned),
        }
    }

    #[test]
    fn default_read_window_covers_the_last_collection_day() {
        let window = read_window(&args("vix-level", None, None), &PulsetickConfig::default())
            .expect("window");
        assert_eq!(window.to_string(), "2024-01-01..2024-02-01");

        let narrowed = read_window(
            &args("vix-level", Some("2024-01-10"), None),
            &PulsetickConfig::default(),
        )
        .expect("window");
        assert_eq!(narrowed.to_string(), "2024-01-10..2024-02-01");
    }

    #[test]
    fn empty_warehouse_reads_as_success() {
        let temp = tempdir().expect("tempdir");
        let config = PulsetickConfig {
            home: Some(temp.path().to_path_buf()),
            ..PulsetickConfig::default()
        };

        let output = run(&args("put-call-ratio", None, None), &config).expect("read");

        assert!(!output.is_error);
        assert_eq!(output.payload["count"], 0);
    }
}
