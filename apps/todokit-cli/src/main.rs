mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use todokit_api::{ApiClient, AuthSession, FileSessionStore, SessionError};
use tracing_subscriber::EnvFilter;

use crate::config::{CliConfig, CliOverrides};

/// todokit - command-line client for the todo backend
#[derive(Parser, Debug)]
#[command(name = "todokit")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Session file (overrides config)
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,

    /// Allow plain http:// to non-loopback hosts
    #[arg(long, global = true)]
    insecure: bool,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and keep the session
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        profile_image_url: Option<String>,
    },
    /// Sign out and forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Manage todos
    #[command(subcommand)]
    Todo(TodoCommand),
    /// Browse users
    #[command(subcommand)]
    User(UserCommand),
    /// List registered endpoints
    Endpoints,
    /// Call any endpoint by wire name
    Call {
        /// e.g. `todoGetOne`
        endpoint: String,
        /// Path parameter as `name=value`; repeatable
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
        /// JSON payload
        #[arg(long)]
        body: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum TodoCommand {
    List,
    Get { id: i64 },
    Add { item: String },
    Update { id: i64, item: String },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    List {
        #[arg(long)]
        skip: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
    },
    Get { user_id: String },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in `{raw}`"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// Filter used when `RUST_LOG` is unset
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (TODOKIT__*) -> 4) CLI overrides
    let mut config = CliConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&CliOverrides {
        base_url: cli.base_url.clone(),
        session_file: cli.session_file.clone(),
        insecure: cli.insecure,
    });

    init_logging(cli.verbose);

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no command given; see `todokit --help`");
    };

    let client = Arc::new(ApiClient::from_config(&config.api)?);
    let session_path = config.session_path()?;
    let session = AuthSession::new(client, Box::new(FileSessionStore::new(&session_path)));

    match session.restore() {
        Ok(Some(user)) => tracing::info!(email = %user.email, "using stored session"),
        Ok(None) => {}
        Err(SessionError::Corrupt(e)) => {
            tracing::warn!(path = %session_path.display(), error = %e, "ignoring unreadable session file");
        }
        Err(e) => return Err(e.into()),
    }

    commands::run(command, &session).await
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parses_call_with_params() {
        let cli = Cli::try_parse_from([
            "todokit",
            "-vv",
            "call",
            "itemGet",
            "--param",
            "id=42",
            "--base-url",
            "http://localhost:9000/api/v1",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:9000/api/v1"));
        match cli.command {
            Some(Command::Call {
                endpoint, params, ..
            }) => {
                assert_eq!(endpoint, "itemGet");
                assert_eq!(params, [("id".to_owned(), "42".to_owned())]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verbosity_picks_filter_level() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(7), "trace");
    }

    #[test]
    fn parses_todo_subcommands() {
        let cli = Cli::try_parse_from(["todokit", "todo", "update", "3", "buy bread"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Todo(TodoCommand::Update { id: 3, ref item })) if item == "buy bread"
        ));
    }

    #[test]
    fn key_value_needs_equals_sign() {
        assert_eq!(
            parse_key_val("a=b=c").unwrap(),
            ("a".to_owned(), "b=c".to_owned())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
