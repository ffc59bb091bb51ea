use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use userstore_core::{Context, StoreError, User, UserStore, validate_user};
use userstore_sqlite::SqliteStore;

mod config;
mod render;
mod shell;

use config::{CliConfig, ConfigError};
use render::{OutputFormat, write_user, write_users};
use shell::{Shell, describe};

#[derive(Debug, Parser)]
#[command(name = "userstore", version)]
#[command(about = "Manage user records stored in a SQLite database")]
struct Cli {
    /// Database file path (`:memory:` for an ephemeral store).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Deadline for each store operation, in milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
    /// How long to wait on a locked database, in milliseconds.
    #[arg(long, global = true)]
    busy_timeout_ms: Option<u64>,
    /// Enable debug logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the interactive menu (default).
    Shell,
    /// Create a user.
    Create(CreateArgs),
    /// Show one user by id.
    Get(GetArgs),
    /// List all users.
    List(ListArgs),
    /// Change a user's username and/or email.
    Update(UpdateArgs),
    /// Permanently delete a user.
    Delete(DeleteArgs),
    /// Show database path, pragma settings, and record count.
    Status,
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct GetArgs {
    id: i64,
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Output format.
    #[arg(long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    id: i64,
    /// New username (kept when omitted).
    #[arg(long)]
    username: Option<String>,
    /// New email (kept when omitted).
    #[arg(long)]
    email: Option<String>,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    id: i64,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    yes: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{}", describe(.0))]
    Store(#[from] StoreError),
    #[error("{0}")]
    Invalid(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Store(StoreError::NotFound(_)) => 2,
            Self::Store(StoreError::Duplicate { .. }) => 3,
            _ => 1,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli)?;
    debug!(database = %config.database.display(), "resolved configuration");

    let store = SqliteStore::open(&config.database, &config.store)?;
    let root = Context::background();

    let result = match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => run_shell(&store, &config),
        Command::Create(args) => run_create(&store, &config, &root, args),
        Command::Get(args) => run_get(&store, &config, &root, args),
        Command::List(args) => run_list(&store, &config, &root, args),
        Command::Update(args) => run_update(&store, &config, &root, args),
        Command::Delete(args) => run_delete(&store, &config, &root, args),
        Command::Status => run_status(&store, &config, &root),
    };

    let closed = store.close();
    result?;
    closed?;
    Ok(())
}

/// Loads the config file, if any, and applies command-line overrides.
fn resolve_config(cli: &Cli) -> Result<CliConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    if let Some(ms) = cli.timeout_ms {
        config.operation_timeout_ms = Some(ms);
    }
    if let Some(ms) = cli.busy_timeout_ms {
        config.store.busy_timeout_ms = ms;
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// commands
// ---------------------------------------------------------------------------

fn run_shell(store: &dyn UserStore, config: &CliConfig) -> Result<(), CliError> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    Shell::new(store, config, stdin.lock(), stdout.lock()).run()?;
    Ok(())
}

fn run_create(
    store: &dyn UserStore,
    config: &CliConfig,
    root: &Context,
    args: CreateArgs,
) -> Result<(), CliError> {
    let mut user = User::new(args.username, args.email);
    ensure_valid(&user)?;

    store.create(&config.operation_context(root), &mut user)?;
    let mut out = io::stdout().lock();
    if args.format == OutputFormat::Table {
        writeln!(out, "User Created!")?;
    }
    write_user(&mut out, &user, args.format)?;
    Ok(())
}

fn run_get(
    store: &dyn UserStore,
    config: &CliConfig,
    root: &Context,
    args: GetArgs,
) -> Result<(), CliError> {
    let user = store.get_by_id(&config.operation_context(root), args.id)?;
    write_user(&mut io::stdout().lock(), &user, args.format)?;
    Ok(())
}

fn run_list(
    store: &dyn UserStore,
    config: &CliConfig,
    root: &Context,
    args: ListArgs,
) -> Result<(), CliError> {
    let users = store.list_all(&config.operation_context(root))?;
    write_users(&mut io::stdout().lock(), &users, args.format)?;
    Ok(())
}

fn run_update(
    store: &dyn UserStore,
    config: &CliConfig,
    root: &Context,
    args: UpdateArgs,
) -> Result<(), CliError> {
    if args.username.is_none() && args.email.is_none() {
        return Err(CliError::Invalid(
            "Specify at least one of --username or --email".to_string(),
        ));
    }

    let mut user = store.get_by_id(&config.operation_context(root), args.id)?;
    if let Some(username) = args.username {
        user.username = username;
    }
    if let Some(email) = args.email {
        user.email = email;
    }
    ensure_valid(&user)?;

    store.update(&config.operation_context(root), &user)?;
    println!("Updated user {}.", user.id);
    Ok(())
}

fn run_delete(
    store: &dyn UserStore,
    config: &CliConfig,
    root: &Context,
    args: DeleteArgs,
) -> Result<(), CliError> {
    if !args.yes {
        let user = store.get_by_id(&config.operation_context(root), args.id)?;
        let mut out = io::stdout().lock();
        write!(
            out,
            "Delete user {} ({})? (y/n): ",
            user.id, user.username
        )?;
        out.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim() != "y" {
            writeln!(out, "Delete cancelled.")?;
            return Ok(());
        }
    }

    store.delete(&config.operation_context(root), args.id)?;
    println!("User deleted successfully");
    Ok(())
}

fn run_status(store: &SqliteStore, config: &CliConfig, root: &Context) -> Result<(), CliError> {
    let status = store.status(&config.operation_context(root))?;
    println!("Store Status:");
    println!("  Database: {}", status.location);
    println!(
        "  Tables exist: {}",
        if status.tables_exist { "yes" } else { "no" }
    );
    println!("  User count: {}", status.user_count);
    println!("  Journal mode: {}", status.pragmas.journal_mode);
    println!("  Synchronous: {}", status.pragmas.synchronous);
    println!(
        "  Foreign keys: {}",
        if status.pragmas.foreign_keys { "on" } else { "off" }
    );
    println!("  Busy timeout: {} ms", status.pragmas.busy_timeout_ms);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ensure_valid(user: &User) -> Result<(), CliError> {
    let errors = validate_user(user);
    if errors.is_empty() {
        return Ok(());
    }
    let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
    Err(CliError::Invalid(messages.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_without_subcommand() {
        let cli = Cli::try_parse_from(["userstore", "--db", ":memory:"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.db, Some(PathBuf::from(":memory:")));
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "userstore",
            "list",
            "--db",
            "people.db",
            "--timeout-ms",
            "100",
            "--busy-timeout-ms",
            "250",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.database, PathBuf::from("people.db"));
        assert_eq!(config.operation_timeout_ms, Some(100));
        assert_eq!(config.store.busy_timeout_ms, 250);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Store(StoreError::NotFound(1)).exit_code(), 2);
        assert_eq!(
            CliError::Store(StoreError::Duplicate { field: None }).exit_code(),
            3
        );
        assert_eq!(CliError::Invalid("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_ensure_valid_joins_messages() {
        let err = ensure_valid(&User::new("", "")).unwrap_err();
        assert_eq!(err.to_string(), "username is required; email is required");
    }
}
