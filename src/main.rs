use clap::{Args, Parser, Subcommand, ValueEnum};
use lead_sync::config::AppConfig;
use lead_sync::enrichment::{ChatCompletionInference, LeadInference, NoInference};
use lead_sync::error::AppError;
use lead_sync::notion::NotionClient;
use lead_sync::telemetry;
use lead_sync::workflows::leads::{
    load_raw_records_from_path, load_records_from_path, merge_records, write_records_to_path,
    LeadSyncService, MatchStrategy, SyncReport,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "lead-sync",
    about = "Sync QR business-card leads into the Notion lead database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or update Notion pages for every lead in a JSON export
    Sync(SyncArgs),
    /// Collapse leads sharing an attendee name and write the result as JSON
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
struct SyncArgs {
    /// JSON array of lead records
    input: PathBuf,
    /// Configuration profile (defaults to LEAD_SYNC_PROFILE or "default")
    #[arg(long)]
    profile: Option<String>,
    /// How incoming leads are matched to existing pages
    #[arg(long, value_enum, default_value_t = MatchBy::Name)]
    match_by: MatchBy,
    /// Write a per-record CSV report to this path
    #[arg(long)]
    report: Option<PathBuf>,
    /// Classify records without creating or updating pages
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// JSON array of lead records
    input: PathBuf,
    /// Where to write the merged records
    #[arg(long, short, default_value = "merged_output.json")]
    output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MatchBy {
    Name,
    Email,
}

impl From<MatchBy> for MatchStrategy {
    fn from(value: MatchBy) -> Self {
        match value {
            MatchBy::Name => MatchStrategy::Name,
            MatchBy::Email => MatchStrategy::Email,
        }
    }
}

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Sync(args) => run_sync(args),
        Command::Merge(args) => run_merge(args),
    }
}

fn run_sync(args: SyncArgs) -> Result<(), AppError> {
    let SyncArgs {
        input,
        profile,
        match_by,
        report,
        dry_run,
    } = args;

    let config = AppConfig::load(profile.as_deref())?;
    telemetry::init(&config.telemetry)?;
    info!(profile = %config.profile, dry_run, "starting lead sync");

    let records = load_records_from_path(&input)?;
    info!(records = records.len(), input = %input.display(), "loaded lead export");

    let notion = NotionClient::new(config.notion.clone(), &config.http)?;
    let inference: Box<dyn LeadInference> = if config.enrichment.enabled() {
        Box::new(ChatCompletionInference::new(&config.enrichment, &config.http)?)
    } else {
        warn!("OPENAI_API_KEY not set; industry, department, role and owner stay empty");
        Box::new(NoInference)
    };

    let service = LeadSyncService::new(Box::new(notion), inference, config.campaign.clone())
        .with_match_key(MatchStrategy::from(match_by).into_key())
        .with_dry_run(dry_run);

    let summary = service.sync(records)?;

    if let Some(path) = report {
        summary.write_csv_to_path(&path)?;
        info!(path = %path.display(), "wrote sync report");
    }

    render_sync_report(&summary);
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<(), AppError> {
    let records = load_raw_records_from_path(&args.input)?;
    let total = records.len();
    let merged = merge_records(records);
    write_records_to_path(&args.output, &merged)?;

    println!("Merged {} records into {}", total, merged.len());
    println!("Wrote {}", args.output.display());
    Ok(())
}

fn render_sync_report(report: &SyncReport) {
    if report.dry_run {
        println!("Dry run: no pages were created or updated");
    }
    println!("Existing pages indexed: {}", report.existing_pages);
    if report.existing_unmatched > 0 {
        println!("Existing pages without a match key: {}", report.existing_unmatched);
    }
    if report.existing_truncated {
        println!("Warning: existing page query was truncated; some contacts may be duplicated");
    }
    if report.duplicates_dropped > 0 {
        println!("Duplicate incoming records dropped: {}", report.duplicates_dropped);
    }

    println!("Updated pages: {}", report.updated());
    println!("Created pages: {}", report.created());
    println!("Skipped (empty note): {}", report.skipped());

    let failed = report.failed();
    if failed == 0 {
        println!("Failures: none");
    } else {
        println!("Failures: {failed}");
        for (name, err) in report.failures() {
            let label = if name.is_empty() { "<no name>" } else { name };
            println!("- {label}: {err}");
        }
    }
}
