use std::io::{self, Write};

use serde_json::Value;

use crate::error::CliError;

/// Print one JSON document on stdout.
pub fn render(payload: &Value, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    write_payload(&mut stdout.lock(), payload, pretty)
}

fn write_payload(writer: &mut impl Write, payload: &Value, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, payload)?;
    } else {
        serde_json::to_writer(&mut *writer, payload)?;
    }
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compact_output_is_one_line() {
        let mut buffer = Vec::new();
        let payload = json!({"status": "success", "count": 0});
        write_payload(&mut buffer, &payload, false).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        assert_eq!(text, "{\"count\":0,\"status\":\"success\"}\n");
    }

    #[test]
    fn pretty_output_is_indented() {
        let mut buffer = Vec::new();
        write_payload(&mut buffer, &json!({"status": "error"}), true).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("\n  \"status\": \"error\"\n"));
    }
}
