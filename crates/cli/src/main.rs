use std::process::ExitCode;
use std::time::Duration;

use api_shared::TransferCode;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dfs_client::{ClientConfig, ClientResult, DfsClient, outcome};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dfs")]
#[command(about = "DFS file service client")]
struct Cli {
    /// Server URI (falls back to DFS_SERVER_URI)
    #[arg(long, global = true)]
    server: Option<String>,
    /// Local mount directory (falls back to DFS_CLIENT_MOUNT)
    #[arg(long, global = true)]
    mount: Option<String>,
    /// Per-call deadline in milliseconds (falls back to DFS_DEADLINE_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file from the mount directory
    Store { filename: String },
    /// Download a file into the mount directory
    Fetch { filename: String },
    /// Delete a file on the server
    Delete { filename: String },
    /// List files on the server
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show size and timestamps of a file on the server
    Stat {
        filename: String,
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = resolve_config(cli.server, cli.mount, cli.timeout_ms)?;
    let client = DfsClient::connect_lazy(config)?;

    let code = match cli.command {
        Commands::Store { filename } => {
            report(&filename, client.store(&filename).await, |()| {
                println!("Stored {filename}");
                Ok(())
            })
        }
        Commands::Fetch { filename } => report(&filename, client.fetch(&filename).await, |bytes| {
            println!("Fetched {filename} ({bytes} bytes)");
            Ok(())
        }),
        Commands::Delete { filename } => {
            report(&filename, client.delete(&filename).await, |()| {
                println!("Deleted {filename}");
                Ok(())
            })
        }
        Commands::List { json } => report("list", client.list().await, |files| {
            if json {
                println!("{}", serde_json::to_string_pretty(&files)?);
            } else if files.is_empty() {
                println!("No files found.");
            } else {
                for (name, mtime) in &files {
                    println!("{}\t{}", format_time(*mtime), name);
                }
            }
            Ok(())
        }),
        Commands::Stat { filename, json } => {
            report(&filename, client.stat(&filename).await, |status| {
                if json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    println!("File: {filename}");
                    println!("Size: {}", status.size);
                    println!("Modified: {}", format_time(status.modified_time));
                    println!("Created: {}", format_time(status.creation_time));
                }
                Ok(())
            })
        }
    }?;

    Ok(ExitCode::from(code.exit_code()))
}

/// Command line flags win over the environment, which wins over the built-in defaults.
fn resolve_config(
    server: Option<String>,
    mount: Option<String>,
    timeout_ms: Option<u64>,
) -> anyhow::Result<ClientConfig> {
    let config = ClientConfig::resolve(
        server,
        mount.map(Into::into),
        timeout_ms.map(Duration::from_millis),
    )?;
    Ok(config)
}

/// Prints a successful result with `on_ok`, or the failure on stderr, and returns its code.
fn report<T>(
    subject: &str,
    result: ClientResult<T>,
    on_ok: impl FnOnce(T) -> anyhow::Result<()>,
) -> anyhow::Result<TransferCode> {
    let code = outcome(&result);
    match result {
        Ok(value) => on_ok(value)?,
        Err(e) => eprintln!("{subject}: {e} [{code}]"),
    }
    Ok(code)
}

fn format_time(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = resolve_config(
            Some("http://10.0.0.1:6000".into()),
            Some("/tmp/dfs-mount".into()),
            Some(250),
        )
        .unwrap();

        assert_eq!(config.server_uri(), "http://10.0.0.1:6000");
        assert_eq!(config.mount_root(), std::path::Path::new("/tmp/dfs-mount"));
        assert_eq!(config.deadline_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_zero_timeout_flag_is_rejected() {
        let result = resolve_config(Some("http://localhost:1".into()), Some("mnt".into()), Some(0));

        assert!(result.is_err());
    }

    #[test]
    fn test_format_time_is_rfc3339() {
        assert_eq!(format_time(0), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["dfs", "stat", "a.txt", "--json", "--timeout-ms", "5"]);

        assert_eq!(cli.timeout_ms, Some(5));
        assert!(matches!(
            cli.command,
            Commands::Stat { ref filename, json: true } if filename == "a.txt"
        ));
    }
}
