//! Order queue CLI
//!
//! A command-line tool for placing and completing orders and inspecting
//! the queue and wait-time model of a running queue-server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use commands::{debug, orders};
use output::{print_success, OutputFormat};

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Order queue CLI
#[derive(Parser)]
#[command(name = "qctl")]
#[command(author, version, about = "CLI for the order queue service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via QCTL_API_URL env var)
    #[arg(long, env = "QCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Notification channels to request for an order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Notify {
    #[default]
    None,
    Sms,
    Email,
    All,
}

impl Notify {
    fn code(self) -> u8 {
        match self {
            Notify::None => 0,
            Notify::Sms => 1,
            Notify::Email => 2,
            Notify::All => 3,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Place an order
    Place {
        /// Catalog item ids, e.g. "1,2,2"
        items: String,

        /// Phone number for SMS notifications
        #[arg(long)]
        phone: Option<String>,

        /// Email address for email notifications
        #[arg(long)]
        email: Option<String>,

        /// Channels to notify on placement and completion
        #[arg(long, value_enum, default_value_t = Notify::None)]
        notify: Notify,
    },

    /// Mark an order complete
    Complete {
        /// Order ID
        id: String,

        /// Completion time in RFC 3339 (defaults to now on the server)
        #[arg(long)]
        at: Option<String>,
    },

    /// Show a single order
    Order {
        /// Order ID
        id: String,
    },

    /// Show the active queue
    Queue,

    /// Show completed orders waiting for the next retrain
    Pending,

    /// Show orders already used for training
    Trained,

    /// Force a model retrain on the buffered outcomes
    Retrain,

    /// Dump all partitions and predictor state
    Dump {
        /// Write the dump to a file instead of stdout
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Manage saved CLI defaults
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show saved defaults
    Show,

    /// Save defaults used when flags are omitted
    Set {
        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        format: Option<OutputFormat>,
    },
}

fn validate_timestamp(raw: &str) -> Result<String> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Invalid completion time {:?}, expected RFC 3339", raw))?;
    Ok(raw.to_string())
}

fn resolve_format(flag: Option<OutputFormat>, saved: Option<&str>) -> OutputFormat {
    flag.or_else(|| saved.and_then(|s| OutputFormat::from_str(s, true).ok()))
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let saved = config::Config::load()?;

    let format = resolve_format(cli.format, saved.default_format.as_deref());
    let api_url = cli
        .api_url
        .or_else(|| saved.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Place {
            items,
            phone,
            email,
            notify,
        } => {
            let request = client::PlaceOrderRequest {
                item_ids: items,
                phone_number: phone,
                email,
                notification_pref: notify.code(),
            };
            orders::place_order(&client, request, format).await?;
        }
        Commands::Complete { id, at } => {
            let completed_at = at.as_deref().map(validate_timestamp).transpose()?;
            orders::complete_order(&client, &id, completed_at, format).await?;
        }
        Commands::Order { id } => {
            orders::show_order(&client, &id, format).await?;
        }
        Commands::Queue => debug::show_queue(&client, format).await?,
        Commands::Pending => debug::show_pending(&client, format).await?,
        Commands::Trained => debug::show_trained(&client, format).await?,
        Commands::Retrain => debug::retrain(&client, format).await?,
        Commands::Dump { output } => debug::dump(&client, output, format).await?,
        Commands::Config(cmd) => run_config(cmd, saved)?,
    }

    Ok(())
}

fn run_config(cmd: ConfigCommands, mut saved: config::Config) -> Result<()> {
    match cmd {
        ConfigCommands::Show => output::print_json(&saved)?,
        ConfigCommands::Set { api_url, format } => {
            if let Some(url) = api_url {
                url::Url::parse(&url).context("Invalid API URL")?;
                saved.api_url = Some(url);
            }
            if let Some(format) = format {
                let name = format
                    .to_possible_value()
                    .map(|v| v.get_name().to_string())
                    .unwrap_or_default();
                saved.default_format = Some(name);
            }
            let path = saved.save()?;
            print_success(&format!("Saved defaults to {}", path.display()));
        }
    }
    Ok(())
}
