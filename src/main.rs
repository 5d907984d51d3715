// src/main.rs
use anyhow::Result;
use clap::{Parser, Subcommand};
use skillbridge::market::{SessionStatus, SessionStore};
use skillbridge::{Advisor, AdvisorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "skillbridge", about = "Career guidance from live job-market signal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recommend courses and a learning path for a career goal
    Advise {
        #[arg(long)]
        role: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Ceiling of credit hours per semester
        #[arg(long)]
        max_credits: Option<u32>,
        /// Skip live scraping and use the deterministic fallback
        #[arg(long)]
        offline: bool,
    },
    /// Show the stored scraping-session status
    AuthStatus,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skillbridge=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AdvisorConfig::load()?;

    match cli.command {
        Command::Advise {
            role,
            location,
            max_credits,
            offline,
        } => {
            if offline {
                config = config.with_scraping_enabled(false);
            }
            if let Some(max) = max_credits {
                config = config.with_max_credits_per_term(max);
            }

            let advisor = Advisor::new(config)?;
            let guidance = advisor.advise(&role, &location).await?;
            println!("{}", serde_json::to_string_pretty(&guidance)?);
        }
        Command::AuthStatus => {
            let store = SessionStore::new(config.environment.session_path);
            let status = store.status();
            match status {
                SessionStatus::Active => println!("session: active"),
                SessionStatus::Expired => println!("session: expired"),
                SessionStatus::Absent => println!("session: absent"),
            }
        }
    }

    Ok(())
}
