//! Main entry point for the engine binary
//!
//! Opens an audit workspace with the real service implementations, ingests
//! the dataset files found in a data directory, waits for validation to
//! settle, then executes the selected rules and prints the run summary.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;

use engine::services::{GeminiAnalyst, JsonCatalog, RestStore, StagedTransfer, StructuralValidator};
use engine::{AuditWorkspace, EngineResult, FindingAnalyst, RunOptions, WorkspaceEvent};
use shared::{audit_error, audit_info, logging, Audit, AuditStatus, Severity};

/// Audit run orchestration engine
#[derive(Parser)]
#[command(name = "engine")]
#[command(about = "Validates audit datasets and executes detection rules against them")]
pub struct Args {
    /// Audit identifier the run is scoped to
    #[arg(long)]
    pub audit_id: String,

    /// Audit title
    #[arg(long, default_value = "Vergi Denetimi")]
    pub audit_title: String,

    /// Audited company name
    #[arg(long, default_value = "")]
    pub company: String,

    /// Audit period start (YYYY-MM-DD, defaults to January 1 of this year)
    #[arg(long)]
    pub period_start: Option<NaiveDate>,

    /// Audit period end (YYYY-MM-DD, defaults to December 31 of this year)
    #[arg(long)]
    pub period_end: Option<NaiveDate>,

    /// Dataset kind catalog (JSON)
    #[arg(long, default_value = "catalog/datasets.json")]
    pub datasets_catalog: PathBuf,

    /// Rule catalog (JSON)
    #[arg(long, default_value = "catalog/rules.json")]
    pub rules_catalog: PathBuf,

    /// Directory holding the source dataset files, named by kind
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Staging directory uploads are copied into
    #[arg(long, default_value = "staging")]
    pub staging_dir: PathBuf,

    /// Comma-separated rule ids to run (defaults to every runnable rule)
    #[arg(long, value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Independent timeout per rule execution, in seconds
    #[arg(long, default_value = "30")]
    pub per_rule_timeout_secs: u64,

    /// Narrate the first finding through the analyst collaborator
    #[arg(long)]
    pub analyze: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> EngineResult<()> {
    let args = Args::parse();
    logging::init_tracing_with_level(Some(&args.log_level));

    let audit = build_audit(&args);
    logging::log_startup(&audit.id, "audit workspace session");

    // Services: offline catalog, staged uploads, structural validation,
    // REST store for queries and persistence
    let catalog = JsonCatalog::load(&args.datasets_catalog, &args.rules_catalog).await?;
    let store = RestStore::from_env()?;
    let executor = store.clone();
    let transfer = StagedTransfer::new(args.staging_dir.clone());

    let mut workspace = AuditWorkspace::open(
        audit.clone(),
        transfer,
        StructuralValidator,
        executor,
        store,
        catalog,
    )
    .await?;

    // Stage every dataset file whose stem matches a required kind name
    let sources = discover_sources(&workspace, &args.data_dir).await?;
    if sources.is_empty() {
        audit_info!(audit.id, "📭 No dataset files found under {}", args.data_dir.display());
    }
    let started = workspace.upload_all(&sources).await?;
    audit_info!(audit.id, "⬆️ {} uploads started", started.len());

    wait_for_validation(&mut workspace).await;

    let progress = workspace.validation_progress().await;
    audit_info!(
        audit.id,
        "📊 Validation settled: {}/{} datasets validated ({}%)",
        progress.validated_count,
        progress.total_count,
        progress.percentage
    );
    for record in workspace.records().await {
        if let Some(message) = &record.error_message {
            audit_error!(audit.id, "⚠️ '{}': {}", record.kind.name, message);
        }
    }

    // Selection: explicit ids, or everything currently runnable
    let partition = workspace.resolve_runnability().await?;
    audit_info!(
        audit.id,
        "🧮 {} of {} rules runnable",
        partition.runnable.len(),
        partition.runnable.len() + partition.not_runnable.len()
    );
    let selected: HashSet<String> = if args.rules.is_empty() {
        partition.runnable.iter().map(|r| r.id.clone()).collect()
    } else {
        args.rules.iter().cloned().collect()
    };
    if selected.is_empty() {
        audit_info!(audit.id, "📭 Nothing to run; validate at least one dataset first");
        return Ok(());
    }

    // Ctrl+C cancels an in-flight run before persistence
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let options = RunOptions {
        per_rule_timeout: Duration::from_secs(args.per_rule_timeout_secs),
    };
    let result = workspace
        .run_rules_with_options(&selected, options, cancel_rx)
        .await?;

    print_summary(&result, selected.len());

    if args.analyze {
        if let Some(finding) = result.found_findings.first() {
            let analyst = GeminiAnalyst::from_env()?;
            let report = analyst.analyze(finding).await?;
            println!("\n--- Analist Raporu ({}) ---\n{report}", finding.rule_id);
        }
    }

    logging::log_shutdown(&audit.id, "session complete");
    Ok(())
}

fn build_audit(args: &Args) -> Audit {
    let year = Utc::now().year();
    let start = args
        .period_start
        .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
        .unwrap_or_default();
    let end = args
        .period_end
        .or_else(|| NaiveDate::from_ymd_opt(year, 12, 31))
        .unwrap_or_default();
    Audit {
        id: args.audit_id.clone(),
        company: args.company.clone(),
        title: args.audit_title.clone(),
        start_date: start,
        end_date: end,
        status: AuditStatus::Active,
    }
}

/// Map required kind names to files in the data directory whose stem
/// matches the kind name exactly
async fn discover_sources(
    workspace: &AuditWorkspace<
        impl engine::DatasetTransfer + 'static,
        impl engine::ContentValidator + 'static,
        impl engine::QueryExecutor,
        impl engine::FindingStore,
        impl engine::CatalogSource,
    >,
    data_dir: &std::path::Path,
) -> EngineResult<HashMap<String, PathBuf>> {
    let mut sources = HashMap::new();
    let mut entries = match tokio::fs::read_dir(data_dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(sources),
    };
    let kind_names: Vec<String> = workspace
        .records()
        .await
        .into_iter()
        .map(|r| r.kind.name)
        .collect();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        if kind_names.iter().any(|name| *name == stem) {
            sources.insert(stem, path);
        }
    }
    Ok(sources)
}

/// Drain advisory events until every upload/validation settles
async fn wait_for_validation(
    workspace: &mut AuditWorkspace<
        impl engine::DatasetTransfer + 'static,
        impl engine::ContentValidator + 'static,
        impl engine::QueryExecutor,
        impl engine::FindingStore,
        impl engine::CatalogSource,
    >,
) {
    let audit_id = workspace.audit().id.clone();
    let mut events = match workspace.take_events() {
        Some(events) => events,
        None => return,
    };
    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                match maybe_event {
                    Some(WorkspaceEvent::RecordSettled { record_id, status }) => {
                        audit_info!(audit_id, "📄 Record {} settled: {}", record_id, status);
                    }
                    Some(WorkspaceEvent::UploadProgress { .. }) => {}
                    None => break,
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {}
        }
        if !workspace.has_inflight().await {
            break;
        }
    }
}

fn print_summary(result: &shared::RunResult, selected_count: usize) {
    let count_by = |severity: Severity| {
        result
            .found_findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    };

    println!("\n--- Denetim Sonucu ---");
    println!("Kural çalıştırıldı: {} / {}", result.run_rule_count, selected_count);
    println!("Toplam bulgu: {}", result.found_findings.len());
    println!("  Yüksek riskli: {}", count_by(Severity::High));
    println!("  Orta riskli: {}", count_by(Severity::Medium));
    println!("  Düşük riskli: {}", count_by(Severity::Low));

    if !result.skipped_rules.is_empty() {
        println!("\nAtlanan kurallar (gerekli veri seti doğrulanmadı):");
        for rule in &result.skipped_rules {
            println!("  {}: {} - Gerekli Veri: {}", rule.id, rule.description, rule.required_data);
        }
    }
}
