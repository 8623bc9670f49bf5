pub mod client;
pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};

use self::client::ApiClient;

#[derive(Parser)]
#[command(name = "pnd")]
#[command(about = "Portal PND CLI - inspect and manage a running Portal PND API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, env = "PND_SERVER", default_value = "http://localhost:3000", help = "API base URL")]
    pub server: String,

    #[arg(long, global = true, env = "PND_TOKEN", hide_env_values = true, help = "Bearer token for authenticated routes")]
    pub token: Option<String>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check server and database health")]
    Health,

    #[command(about = "List admin-manageable tables with row counts")]
    Tables,

    #[command(about = "Browse and manage table rows (admin token required)")]
    Data {
        #[command(subcommand)]
        cmd: commands::data::DataCommands,
    },

    #[command(about = "Mint a development access token signed with PND_JWT_SECRET")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let client = ApiClient::new(&cli.server, cli.token.clone())?;

    match cli.command {
        Commands::Health => commands::server::health(&client, output_format).await,
        Commands::Tables => commands::server::tables(&client, output_format).await,
        Commands::Data { cmd } => commands::data::handle(cmd, &client, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
    }
}
