//! benefit_transfer - Beneficio account administration and transfers
//!
//! ```text
//! ┌──────────┐    ┌──────────────────┐    ┌─────────────────┐    ┌──────────┐
//! │  Config  │───▶│ TransferExecutor │───▶│ TransferService │───▶│ Postgres │
//! │  (YAML)  │    │ (begin/commit)   │    │ (lock + check)  │    │ accounts │
//! └──────────┘    └──────────────────┘    └─────────────────┘    └──────────┘
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr and the log file.

use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde_json::json;

use benefit_transfer::config::AppConfig;
use benefit_transfer::db::{Database, schema};
use benefit_transfer::{
    AccountId, AccountRegistry, NewAccount, PgAccountStore, TransferExecutor, TransferRequest,
};

const USAGE: &str = "\
Usage: benefit_transfer [--env <env>] <command>

Commands:
  init-schema                      Create the accounts table
  create <name> <balance> [desc]   Create an active account
  show <id>                        Print an account
  activate <id>                    Mark an account active
  deactivate <id>                  Mark an account inactive
  transfer <from> <to> <amount>    Move <amount> from one account to another";

// ============================================================
// ARGUMENTS
// ============================================================

#[derive(Debug, PartialEq)]
enum Command {
    InitSchema,
    Create {
        name: String,
        balance: Decimal,
        description: Option<String>,
    },
    Show(AccountId),
    SetActive(AccountId, bool),
    Transfer(TransferRequest),
}

fn get_env(args: &[String]) -> String {
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Arguments with `--env <value>` removed
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--env" || arg == "-e" {
            iter.next();
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn parse_id(s: &str) -> Result<AccountId, String> {
    AccountId::from_str(s).map_err(|_| format!("invalid account id: {}", s))
}

fn parse_amount(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s.trim()).map_err(|_| format!("invalid decimal: {}", s))
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let args = positional(args);
    match args.as_slice() {
        ["init-schema"] => Ok(Command::InitSchema),
        ["create", name, balance] => Ok(Command::Create {
            name: name.to_string(),
            balance: parse_amount(balance)?,
            description: None,
        }),
        ["create", name, balance, description] => Ok(Command::Create {
            name: name.to_string(),
            balance: parse_amount(balance)?,
            description: Some(description.to_string()),
        }),
        ["show", id] => Ok(Command::Show(parse_id(id)?)),
        ["activate", id] => Ok(Command::SetActive(parse_id(id)?, true)),
        ["deactivate", id] => Ok(Command::SetActive(parse_id(id)?, false)),
        ["transfer", from, to, amount] => Ok(Command::Transfer(TransferRequest::new(
            parse_id(from)?,
            parse_id(to)?,
            parse_amount(amount)?,
        ))),
        [] => Err("missing command".to_string()),
        [cmd, ..] => Err(format!("unknown command or wrong arguments: {}", cmd)),
    }
}

// ============================================================
// COMMANDS
// ============================================================

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    let url = config
        .postgres_url
        .as_deref()
        .context("postgres_url is not configured")?;
    let db = Database::connect(url, &config.pool)
        .await
        .context("Failed to connect to PostgreSQL")?;
    let store = PgAccountStore::new(db.pool().clone(), config.transfer.lock_timeout());

    match command {
        Command::InitSchema => {
            schema::init_schema(db.pool()).await?;
            println!("{}", json!({ "status": "ok" }));
        }
        Command::Create {
            name,
            balance,
            description,
        } => {
            let new_account = NewAccount::new(&name, description.as_deref(), balance)?;
            let account = store.create(&new_account).await?;
            tracing::info!(id = %account.id, balance = %account.balance, "Account created");
            println!("{}", serde_json::to_string(&account)?);
        }
        Command::Show(id) => {
            let account = store
                .get(id)
                .await?
                .with_context(|| format!("Account not found: {}", id))?;
            println!("{}", serde_json::to_string(&account)?);
        }
        Command::SetActive(id, active) => {
            let account = store.set_active(id, active).await?;
            tracing::info!(id = %id, active, "Account status changed");
            println!("{}", serde_json::to_string(&account)?);
        }
        Command::Transfer(request) => {
            let executor = TransferExecutor::from_config(store, &config.transfer);
            match executor.execute(&request).await {
                Ok(outcome) => println!("{}", serde_json::to_string(&outcome)?),
                Err(e) => {
                    println!("{}", json!({ "code": e.code(), "error": e.to_string() }));
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("error: {}\n\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };

    let env = get_env(&args);
    let app_config = match AppConfig::load(&env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            return ExitCode::from(1);
        }
    };
    let _log_guard = benefit_transfer::logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        git_hash = env!("GIT_HASH"),
        mode = ?app_config.transfer.mode,
        "Starting benefit_transfer"
    );

    match run(command, &app_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Command failed");
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
