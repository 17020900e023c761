//! doc-numbering: maintenance CLI for the numbering database
//!
//! - `migrate`: apply schema migrations
//! - `reconcile`: align counters with finalized documents
//! - `next`: show the number the next finalization would get
//! - `validate`: pre-check a manual number

use clap::{Args, Parser, Subcommand};
use doc_numbering::Config;
use shared::models::{DocumentType, Scope};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "doc-numbering", version, about = "Sequential document numbering maintenance")]
struct Cli {
    /// SQLite database file (overrides DATABASE_PATH)
    #[arg(long, global = true, env = "DATABASE_PATH")]
    database: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations and exit
    Migrate,
    /// Reset counters to the highest finalized number (one scope, or every counter)
    Reconcile {
        #[command(flatten)]
        scope: OptionalScopeArgs,
    },
    /// Print the number the next finalization would receive
    Next {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Check whether a manual number is acceptable
    Validate {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Candidate number
        number: String,
        /// Check for a draft (always accepted)
        #[arg(long)]
        draft: bool,
    },
}

#[derive(Debug, Args)]
struct ScopeArgs {
    #[arg(long)]
    tenant: String,
    #[arg(long = "type", value_parser = parse_document_type)]
    document_type: DocumentType,
    /// Expanded prefix (e.g. F-202501); empty means every prefix
    #[arg(long, default_value = "")]
    prefix: String,
    #[arg(long)]
    year: i32,
}

impl ScopeArgs {
    fn scope(&self) -> Scope {
        Scope::new(
            self.document_type,
            self.prefix.clone(),
            self.tenant.clone(),
            self.year,
        )
    }
}

#[derive(Debug, Args)]
struct OptionalScopeArgs {
    #[arg(long)]
    tenant: Option<String>,
    #[arg(long = "type", value_parser = parse_document_type)]
    document_type: Option<DocumentType>,
    #[arg(long)]
    prefix: Option<String>,
    #[arg(long)]
    year: Option<i32>,
}

impl OptionalScopeArgs {
    /// `None` when no scope was given at all; a partial scope is an error
    fn scope(&self) -> Result<Option<Scope>, BoxError> {
        match (&self.tenant, self.document_type, self.year) {
            (Some(tenant), Some(document_type), Some(year)) => Ok(Some(Scope::new(
                document_type,
                self.prefix.clone().unwrap_or_default(),
                tenant.clone(),
                year,
            ))),
            (None, None, None) if self.prefix.is_none() => Ok(None),
            _ => Err("--tenant, --type and --year must be given together".into()),
        }
    }
}

fn parse_document_type(raw: &str) -> Result<DocumentType, String> {
    raw.parse().map_err(|e: shared::models::UnknownVariant| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_numbering=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(path) = cli.database {
        config.database_path = path;
    }

    tracing::info!(
        environment = %config.environment,
        database = %config.database_path,
        "Starting doc-numbering"
    );

    let engine = doc_numbering::connect(&config).await?;

    match cli.command {
        Command::Migrate => {
            println!("migrations applied to {}", config.database_path);
        }
        Command::Reconcile { scope } => {
            let reports = match scope.scope()? {
                Some(scope) => vec![engine.reconcile_counter(&scope).await?],
                None => engine.reconcile_all().await?,
            };
            for report in &reports {
                let before = report
                    .counter_before
                    .map_or_else(|| "-".to_string(), |n| n.to_string());
                println!(
                    "{}: counter {} -> {} (highest finalized {}){}",
                    report.scope,
                    before,
                    report.counter_after,
                    report.existing_max,
                    if report.changed() { "" } else { " unchanged" }
                );
            }
            tracing::info!(count = reports.len(), "Reconciliation finished");
        }
        Command::Next { scope } => {
            println!("{}", engine.peek_next_number(&scope.scope()).await?);
        }
        Command::Validate {
            scope,
            number,
            draft,
        } => {
            let outcome = engine
                .validate_manual_number(&scope.scope(), &number, draft)
                .await?;
            match outcome.message() {
                None => println!("{number}: valid"),
                Some(reason) => println!("{number}: invalid ({reason})"),
            }
        }
    }

    Ok(())
}
