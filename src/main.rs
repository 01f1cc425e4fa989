use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, Utc};
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod activity;
mod config;
mod dashboard;
mod db;
mod local;
mod mix;
mod models;
mod priority;
mod report;
mod store;
mod transfer;
mod trends;
mod views;
mod workload;

use crate::dashboard::DashboardSnapshot;
use crate::models::{non_blank, CasePatch, CaseRecord, Status, Urgency};
use crate::store::{CaseStore, QuickAction};
use crate::views::QueueFilter;

#[derive(Parser)]
#[command(name = "support-triage")]
#[command(about = "Scholar support case triage for Group Scholar", long_about = None)]
struct Cli {
    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Report which storage backend is in use and whether it responds
    Health,
    /// Append the sample cases
    Seed,
    /// Open a new case
    Add {
        #[arg(long)]
        scholar: String,
        #[arg(long)]
        summary: String,
        #[arg(long, default_value = "Email")]
        channel: String,
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "Medium")]
        urgency: Urgency,
        #[arg(long, default_value = "Open")]
        status: Status,
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        next_step: Option<String>,
        /// Defaults to today
        #[arg(long)]
        created: Option<NaiveDate>,
        /// Defaults to today
        #[arg(long)]
        last_touch: Option<NaiveDate>,
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// Change fields on an existing case
    Update {
        id: Uuid,
        #[arg(long)]
        scholar: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        channel: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        urgency: Option<Urgency>,
        #[arg(long)]
        status: Option<Status>,
        /// Pass an empty value to unassign
        #[arg(long)]
        owner: Option<String>,
        /// Pass an empty value to clear
        #[arg(long)]
        next_step: Option<String>,
        #[arg(long)]
        created: Option<NaiveDate>,
        #[arg(long)]
        last_touch: Option<NaiveDate>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Log a touchpoint on a case today
    Touch { id: Uuid },
    /// Mark a case resolved
    Resolve { id: Uuid },
    /// Reopen a resolved case
    Reopen { id: Uuid },
    /// Replace every case with the contents of a JSON or CSV file
    #[command(group(
        ArgGroup::new("source")
            .args(["json", "csv"])
            .required(true)
            .multiple(false)
    ))]
    Import {
        #[arg(long)]
        json: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Export every case as JSON
    Export {
        #[arg(long, default_value = "support-triage-export.json")]
        out: PathBuf,
    },
    /// Remove every case
    Clear,
    /// List cases by priority score
    Queue {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long, default_value = "all")]
        owner: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print every dashboard panel
    Dashboard {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long, default_value = "all")]
        owner: String,
    },
    /// Print the plain-text daily brief
    Brief,
    /// Write the dashboard as a markdown report
    Report {
        #[arg(long, default_value = "support-triage-report.md")]
        out: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = config::Config::from_env()?;
    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let now = Utc::now();

    let store = CaseStore::connect(&config).await?;

    match cli.command {
        Commands::InitDb => {
            if store.init().await? {
                println!("Schema ready.");
            } else {
                println!("Local file storage needs no schema.");
            }
        }
        Commands::Health => {
            store
                .health()
                .await
                .with_context(|| format!("{} storage unavailable", store.backend()))?;
            println!("Storage: {} (ok)", store.backend());
        }
        Commands::Seed => {
            let seeded = store.seed(today).await?;
            println!("Seeded {seeded} sample cases.");
        }
        Commands::Add {
            scholar,
            summary,
            channel,
            category,
            urgency,
            status,
            owner,
            next_step,
            created,
            last_touch,
            due,
        } => {
            let record = CaseRecord {
                id: Uuid::new_v4(),
                scholar,
                summary,
                channel,
                category,
                urgency,
                status,
                owner: owner.as_deref().and_then(non_blank),
                next_step: next_step.as_deref().and_then(non_blank),
                created: created.unwrap_or(today),
                last_touch: Some(last_touch.unwrap_or(today)),
                due,
            };
            let created = store.create(record, now).await?;
            println!("Created case {} for {}.", created.id, created.scholar);
        }
        Commands::Update {
            id,
            scholar,
            summary,
            channel,
            category,
            urgency,
            status,
            owner,
            next_step,
            created,
            last_touch,
            due,
            clear_due,
        } => {
            let patch = CasePatch {
                scholar,
                summary,
                channel,
                category,
                urgency,
                status,
                owner,
                next_step,
                created,
                last_touch,
                due: if clear_due { Some(None) } else { due.map(Some) },
            };
            if patch.is_empty() {
                anyhow::bail!("nothing to update; pass at least one field");
            }
            let Some(record) = store.update(id, &patch).await? else {
                anyhow::bail!("case not found: {id}");
            };
            println!(
                "Updated {} ({}): {}, {}, owner {}.",
                record.scholar,
                record.id,
                record.urgency,
                record.status,
                record.owner_label()
            );
        }
        Commands::Touch { id } => quick_action(&store, id, QuickAction::Touch, today).await?,
        Commands::Resolve { id } => quick_action(&store, id, QuickAction::Resolve, today).await?,
        Commands::Reopen { id } => quick_action(&store, id, QuickAction::Reopen, today).await?,
        Commands::Import { json, csv } => {
            let (records, source) = match (json, csv) {
                (Some(path), _) => (transfer::read_json_cases(&path)?, path),
                (None, Some(path)) => (transfer::read_csv_file(&path)?, path),
                (None, None) => anyhow::bail!("pass --json or --csv"),
            };
            let replaced = store.replace_all(records).await?;
            println!("Imported {} cases from {}.", replaced.len(), source.display());
        }
        Commands::Export { out } => {
            let cases = store.list().await?;
            std::fs::write(&out, transfer::export_json(&cases, now)?)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Exported {} cases to {}.", cases.len(), out.display());
        }
        Commands::Clear => {
            store.clear().await?;
            println!("All cases cleared.");
        }
        Commands::Queue {
            search,
            status,
            owner,
            limit,
        } => {
            let cases = priority::enrich(&store.list().await?, today);
            let filter = QueueFilter::new(search.as_deref(), &status, &owner);
            let queue = views::queue(&cases, &filter);

            if queue.is_empty() {
                println!("No cases match the current filters.");
                return Ok(());
            }

            println!("Cases by priority ({today}):");
            for item in queue.iter().take(limit) {
                println!(
                    "- [{} {}] {} ({}, {}, {}) {}: {}",
                    item.band,
                    item.score,
                    item.record.scholar,
                    item.record.urgency,
                    item.record.status,
                    item.record.owner_label(),
                    item.record.id,
                    item.recommendation
                );
            }
            let owners = views::owner_options(&cases);
            if !owners.is_empty() {
                println!("Owners: {}", owners.join(", "));
            }
        }
        Commands::Dashboard {
            json,
            search,
            status,
            owner,
        } => {
            let cases = priority::enrich(&store.list().await?, today);
            let events = store.recent_events().await?;
            let filter = QueueFilter::new(search.as_deref(), &status, &owner);
            let snapshot = DashboardSnapshot::build(&cases, &events, &filter, today, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", report::build_report(&snapshot));
            }
        }
        Commands::Brief => {
            let cases = priority::enrich(&store.list().await?, today);
            println!("{}", report::build_brief(&cases, today));
        }
        Commands::Report { out } => {
            let cases = priority::enrich(&store.list().await?, today);
            let events = store.recent_events().await?;
            let snapshot =
                DashboardSnapshot::build(&cases, &events, &QueueFilter::default(), today, now);
            std::fs::write(&out, report::build_report(&snapshot))
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

async fn quick_action(
    store: &CaseStore,
    id: Uuid,
    action: QuickAction,
    today: NaiveDate,
) -> anyhow::Result<()> {
    match store.apply_quick_action(id, action, today, Utc::now()).await? {
        Some(record) => {
            println!(
                "{} ({}) is now {}, last touch {}.",
                record.scholar,
                record.id,
                record.status,
                today
            );
            Ok(())
        }
        None => anyhow::bail!("case not found: {id}"),
    }
}
