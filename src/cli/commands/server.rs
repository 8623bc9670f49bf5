use reqwest::Method;
use serde_json::Value;

use crate::cli::client::{envelope_data, ApiClient};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

/// `pnd health`
pub async fn health(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let (status, body) = client.raw(Method::GET, "/health", &[]).await?;
    output_value(output_format, &body, |body| {
        let data = body.get("data").cloned().unwrap_or(Value::Null);
        if status.is_success() {
            println!("✓ Server healthy (database: {})", data.get("database").and_then(Value::as_str).unwrap_or("?"));
        } else {
            println!(
                "✗ Server degraded: {}",
                data.get("database_error").and_then(Value::as_str).unwrap_or("unknown error")
            );
        }
    })?;
    if !status.is_success() {
        anyhow::bail!("health check returned HTTP {}", status.as_u16());
    }
    Ok(())
}

/// `pnd tables`
pub async fn tables(client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    let (status, body) = client.raw(Method::GET, "/api/admin/database/stats", &[]).await?;
    let stats = envelope_data(status, body)?;
    output_value(output_format, &stats, |stats| {
        println!("{:<20} {:<20} {:>8}", "TABLE", "LABEL", "ROWS");
        for stat in stats.as_array().into_iter().flatten() {
            let count = match stat.get("count").and_then(Value::as_i64) {
                Some(n) => n.to_string(),
                None => "?".to_string(),
            };
            println!(
                "{:<20} {:<20} {:>8}",
                stat.get("table").and_then(Value::as_str).unwrap_or(""),
                stat.get("label").and_then(Value::as_str).unwrap_or(""),
                count
            );
        }
    })
}
