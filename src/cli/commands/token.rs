use chrono::Duration;
use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "User id (profiles.id) the token is issued for")]
    pub sub: Uuid,
    #[arg(long, help = "Email claim")]
    pub email: Option<String>,
    #[arg(long, default_value_t = 12, help = "Validity in hours")]
    pub hours: i64,
    #[arg(long, env = "PND_JWT_SECRET", hide_env_values = true, help = "Signing secret")]
    pub secret: String,
}

/// `pnd token` - sign a development access token locally
pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let valid_for = Duration::try_hours(args.hours)
        .filter(|d| *d > Duration::zero() && *d <= Duration::days(366))
        .ok_or_else(|| anyhow::anyhow!("--hours must be between 1 and 8784"))?;
    let claims = Claims::new(args.sub, args.email, valid_for);
    let token = generate_jwt(&claims, &args.secret)?;

    let value = json!({ "token": token, "sub": claims.sub, "expires_at": claims.exp });
    output_value(output_format, &value, |_| println!("{}", token))
}
