//! Fedblock - operator CLI
//!
//! - `check`: decide whether an inbound activity is blocked for a local user
//! - `policy add` / `policy list`: manage federated-block policies
//! - `resolutions`: read the resolution audit trail as JSON lines
//!
//! Any failure exits non-zero; a failed check never reports `accepted`.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;

use commands::{AddPolicyArgs, CheckArgs};
use config::{FedblockConfig, StorageConfig};
use error::CliResult;
use fedblock_storage::{FedblockStorage, InMemoryStorage};

/// Fedblock CLI
#[derive(Parser)]
#[command(name = "fedblock")]
#[command(about = "Fedblock - inbound federated activity blocking", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FEDBLOCK_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configured one
    #[arg(long, env = "FEDBLOCK_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "FEDBLOCK_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decide whether an activity is blocked
    Check {
        /// Local user the activity is addressed to
        #[arg(long)]
        target: String,

        /// Sending actor IRI, repeatable
        #[arg(long = "from", required = true)]
        from: Vec<String>,

        #[arg(long)]
        activity_id: String,

        #[arg(long, default_value = "Create")]
        activity_type: String,
    },

    /// Manage policies
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Print recorded resolutions as JSON lines
    Resolutions {
        /// Only resolutions for this activity
        #[arg(long)]
        activity_id: Option<String>,

        /// Maximum records when listing everything (0 = all)
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum PolicyCommand {
    /// Add a policy
    Add {
        #[arg(long, allow_negative_numbers = true)]
        order: i64,

        /// One of always_grant, always_deny, instance_grant, instance_deny, actor_grant, actor_deny
        #[arg(long)]
        kind: String,

        /// Host for instance kinds, actor IRI for actor kinds
        #[arg(long)]
        subject: Option<String>,

        /// Owning local user; instance-wide when absent
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List policies in evaluation order
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "fedblock failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = FedblockConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    // Logs go to stderr so stdout stays machine-readable
    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match &config.storage {
        StorageConfig::Memory => {
            let storage = InMemoryStorage::new();
            commands::seed(&storage, &config.seed).await?;
            dispatch(Arc::new(storage), cli.command).await
        }
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            let storage = fedblock_storage::postgres::PostgresStorage::connect_with_options(
                url,
                *max_connections,
                *connect_timeout_secs,
            )
            .await?;
            dispatch(Arc::new(storage), cli.command).await
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => Err(error::CliError::Config(
            "postgres storage requires the `postgres` feature".to_string(),
        )),
    }
}

async fn dispatch<S: FedblockStorage + 'static>(storage: Arc<S>, command: Command) -> CliResult<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match command {
        Command::Check {
            target,
            from,
            activity_id,
            activity_type,
        } => {
            commands::check(
                storage,
                CheckArgs {
                    target,
                    from,
                    activity_id,
                    activity_type,
                },
                &mut out,
            )
            .await?;
        }
        Command::Policy {
            command:
                PolicyCommand::Add {
                    order,
                    kind,
                    subject,
                    owner,
                    description,
                },
        } => {
            commands::add_policy(
                storage.as_ref(),
                AddPolicyArgs {
                    order,
                    kind,
                    subject,
                    owner,
                    description,
                },
                &mut out,
            )
            .await?;
        }
        Command::Policy {
            command: PolicyCommand::List,
        } => {
            commands::list_policies(storage.as_ref(), &mut out).await?;
        }
        Command::Resolutions { activity_id, limit } => {
            commands::list_resolutions(storage.as_ref(), activity_id.as_deref(), limit, &mut out)
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_collects_repeated_senders() {
        let cli = Cli::try_parse_from([
            "fedblock",
            "check",
            "--target",
            "alice",
            "--from",
            "https://a.example/users/1",
            "--from",
            "https://b.example/users/2",
            "--activity-id",
            "https://a.example/activities/9",
        ])
        .unwrap();
        match cli.command {
            Command::Check {
                from,
                activity_type,
                ..
            } => {
                assert_eq!(from.len(), 2);
                assert_eq!(activity_type, "Create");
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_policy_add_accepts_negative_order() {
        let cli = Cli::try_parse_from([
            "fedblock", "policy", "add", "--order", "-5", "--kind", "always_deny",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Policy {
                command: PolicyCommand::Add { order: -5, .. }
            }
        ));
    }
}
