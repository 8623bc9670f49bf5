use clap::Subcommand;
use reqwest::Method;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::utils::{cell, output_value, parse_filters};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum DataCommands {
    #[command(about = "List rows with filters and pagination")]
    List {
        #[arg(help = "Table name")]
        table: String,
        #[arg(long, help = "Page number (1-based)")]
        page: Option<u64>,
        #[arg(long, help = "Rows per page")]
        limit: Option<u64>,
        #[arg(long, help = "Free-text search across searchable columns")]
        search: Option<String>,
        #[arg(long, help = "Order, e.g. year.desc,subject.asc")]
        order: Option<String>,
        #[arg(long = "filter", help = "Equality filter column=value (repeatable)")]
        filters: Vec<String>,
    },

    #[command(about = "Show a single row")]
    Get {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row ID")]
        id: String,
    },

    #[command(about = "Delete a row")]
    Delete {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Row ID")]
        id: String,
    },
}

fn row_path(table: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("/api/admin/database/data/{}/{}", table, id),
        None => format!("/api/admin/database/data/{}", table),
    }
}

pub async fn handle(cmd: DataCommands, client: &ApiClient, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DataCommands::List { table, page, limit, search, order, filters } => {
            let mut query = parse_filters(&filters)?;
            query.extend(page.map(|p| ("page".to_string(), p.to_string())));
            query.extend(limit.map(|l| ("limit".to_string(), l.to_string())));
            query.extend(search.map(|s| ("search".to_string(), s)));
            query.extend(order.map(|o| ("order".to_string(), o)));

            let page = client.call(Method::GET, &row_path(&table, None), &query).await?;
            output_value(output_format, &page, print_page)
        }
        DataCommands::Get { table, id } => {
            let row = client.call(Method::GET, &row_path(&table, Some(&id)), &[]).await?;
            output_value(output_format, &row, |row| {
                for (key, value) in row.as_object().into_iter().flatten() {
                    println!("{:<20} {}", key, cell(Some(value), 100));
                }
            })
        }
        DataCommands::Delete { table, id } => {
            let result = client.call(Method::DELETE, &row_path(&table, Some(&id)), &[]).await?;
            output_value(output_format, &result, |_| println!("✓ Deleted {} {}", table, id))
        }
    }
}

fn print_page(page: &Value) {
    let rows = page.get("rows").and_then(Value::as_array).cloned().unwrap_or_default();
    let Some(first) = rows.first().and_then(Value::as_object) else {
        println!("No rows");
        return;
    };

    let columns: Vec<&String> = first.keys().take(6).collect();
    println!("{}", columns.iter().map(|c| format!("{:<24}", c)).collect::<String>());
    for row in &rows {
        let line: String = columns.iter().map(|c| format!("{:<24}", cell(row.get(c.as_str()), 22))).collect();
        println!("{}", line);
    }
    println!(
        "page {} of {} ({} rows total)",
        page.get("page").and_then(Value::as_u64).unwrap_or(1),
        page.get("total_pages").and_then(Value::as_u64).unwrap_or(1),
        page.get("total").and_then(Value::as_i64).unwrap_or(0)
    );
}
