use serde_json::Value;

use crate::cli::OutputFormat;

/// Print a JSON value pretty in JSON mode, or through `text` otherwise
pub fn output_value<F>(output_format: OutputFormat, value: &Value, text: F) -> anyhow::Result<()>
where
    F: FnOnce(&Value),
{
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => text(value),
    }
    Ok(())
}

/// Render a scalar cell for text tables
pub fn cell(value: Option<&Value>, width: usize) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() > width {
        let truncated: String = single_line.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", truncated)
    } else {
        single_line
    }
}

/// Parse repeated `key=value` filter arguments
pub fn parse_filters(raw: &[String]) -> anyhow::Result<Vec<(String, String)>> {
    raw.iter()
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
            _ => Err(anyhow::anyhow!("filter '{}' must look like column=value", pair)),
        })
        .collect()
}
