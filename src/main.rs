//! crackscan command-line front end
//!
//! ```bash
//! crackscan scan wall.jpg
//! crackscan survey ./drone_flight --sort
//! crackscan history --limit 20
//! crackscan settings show
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crackscan::model::load_classifier_async;
use crackscan::pipeline::{list_survey_images, BatchOrchestrator, BatchSummary};
use crackscan::state::record::confidence_percent;
use crackscan::{
    Classification, ClassifierState, GeoTagMode, HistoryStore, InspectError, InspectionRecord,
    Inspector, Settings,
};

#[derive(Parser)]
#[command(name = "crackscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect concrete surface photos for cracks", long_about = None)]
struct Cli {
    /// Settings file (defaults to the application data directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Classifier model artifact
    #[arg(long, global = true, env = "CRACKSCAN_MODEL")]
    model: Option<PathBuf>,

    /// Scan history file
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    /// How EXIF geotags are reported (decode, placeholder)
    #[arg(long, global = true)]
    geotag: Option<GeoTagMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a single photo and log it to the scan history
    Scan {
        image: PathBuf,

        /// Where to write the edge overlay PNG
        #[arg(long, conflicts_with = "no_overlay")]
        overlay: Option<PathBuf>,

        /// Don't write an overlay
        #[arg(long)]
        no_overlay: bool,

        /// Print the report fields as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a batch survey over every photo in a folder
    Survey {
        folder: PathBuf,

        /// Process photos sorted by file name instead of filesystem order
        #[arg(long)]
        sort: bool,

        /// Print the report rows as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the scan log, newest first
    History {
        /// Only show this many entries
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },
    /// Show or persist the effective settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    Show,
    Save,
}

/// Initializes the tracing subscriber, filtered by `RUST_LOG`
fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let settings_path = cli.settings.clone().unwrap_or_else(Settings::default_path);
    let settings = effective_settings(&cli, &settings_path);

    let result = match cli.command {
        Commands::Settings { action } => run_settings(action, &settings, &settings_path),
        Commands::History { limit, json } => run_history(&settings, limit, json),
        Commands::Scan {
            image,
            overlay,
            no_overlay,
            json,
        } => {
            let inspector = start_inspector(&settings).await;
            let overlay = if no_overlay {
                None
            } else {
                Some(overlay.unwrap_or_else(|| default_overlay_path(&settings, &image)))
            };
            blocking(move || run_scan(&inspector, &image, overlay.as_deref(), json)).await
        }
        Commands::Survey { folder, sort, json } => {
            // Model loads in the background while the folder is listed
            let loader = tokio::spawn(load_classifier_async(settings.model_path.clone()));
            let sort = sort || settings.sort_batch_input;
            let listing = list_survey_images(&folder, sort);

            let classifier = ClassifierState::from_load(join_load(loader.await));
            report_predictor(&classifier);
            let inspector =
                Inspector::new(classifier, HistoryStore::open(&settings.history_path), &settings);

            match listing {
                Ok(paths) => blocking(move || run_survey(&inspector, &paths, json)).await,
                Err(e) => Err(e),
            }
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn effective_settings(cli: &Cli, settings_path: &Path) -> Settings {
    let mut settings = Settings::load_or_default(settings_path);
    if let Some(model) = &cli.model {
        settings.model_path = model.clone();
    }
    if let Some(history) = &cli.history {
        settings.history_path = history.clone();
    }
    if let Some(mode) = cli.geotag {
        settings.geotag_mode = mode;
    }
    settings
}

async fn start_inspector(settings: &Settings) -> Inspector {
    let loaded = tokio::spawn(load_classifier_async(settings.model_path.clone())).await;
    let classifier = ClassifierState::from_load(join_load(loaded));
    report_predictor(&classifier);
    Inspector::new(classifier, HistoryStore::open(&settings.history_path), settings)
}

fn join_load<T>(
    joined: Result<crackscan::Result<T>, tokio::task::JoinError>,
) -> crackscan::Result<T> {
    joined.map_err(|e| InspectError::PredictorUnavailable(format!("Task join error: {}", e)))?
}

/// Tell the operator once that every result will be UNKNOWN
fn report_predictor(classifier: &ClassifierState) {
    if let Some(reason) = classifier.unavailable_reason() {
        eprintln!("❌ Could not load model!\n   {}", reason);
        eprintln!("   Every photo will be reported as UNKNOWN.");
    }
}

async fn blocking<F>(work: F) -> crackscan::Result<()>
where
    F: FnOnce() -> crackscan::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| InspectError::Inference(format!("Task join error: {}", e)))?
}

fn default_overlay_path(settings: &Settings, image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    settings.overlay_dir.join(format!("{}_overlay.png", stem))
}

fn run_scan(
    inspector: &Inspector,
    image: &Path,
    overlay: Option<&Path>,
    json: bool,
) -> crackscan::Result<()> {
    let record = inspector.analyze(image);

    let overlay_written = match overlay {
        Some(path) => match record.save_overlay(path) {
            Ok(true) => Some(path.to_path_buf()),
            Ok(false) => None,
            Err(e) => {
                tracing::warn!("⚠️  {}", e);
                None
            }
        },
        None => None,
    };

    if json {
        let fields = record.report_fields();
        println!("{}", to_json(&fields)?);
        return Ok(());
    }

    print_record(&record);
    if let Some(path) = overlay_written {
        println!("Overlay: {}", path.display());
    }
    Ok(())
}

fn print_record(record: &InspectionRecord) {
    match record.classification {
        Classification::Crack => {
            println!("⚠️  CRACK DETECTED");
            println!("Confidence: {}%", confidence_percent(record.confidence));
        }
        Classification::Safe => {
            println!("✅ SAFE STRUCTURE");
            println!("Confidence: {}%", confidence_percent(1.0 - record.confidence));
        }
        Classification::Unknown => {
            println!("❓ UNKNOWN");
        }
    }
    println!("Condition: {}", record.severity_description());
    println!("GPS: {}", record.geo_tag);
}

fn run_survey(inspector: &Inspector, paths: &[PathBuf], json: bool) -> crackscan::Result<()> {
    let mut batch = BatchOrchestrator::new(inspector);

    let summary = batch.run(paths, |progress| {
        if !json {
            println!(
                "[{}/{}] {} : {}   {}% | cracks {} | safe {}",
                progress.completed,
                progress.total,
                progress.item.filename,
                progress.item.result,
                progress.percent(),
                progress.crack_count,
                progress.safe_count,
            );
        }
    });

    if json {
        println!("{}", to_json(&summary.report_rows())?);
    } else {
        print_summary(summary);
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("🏁 Drone Mission Complete: {} images scanned", summary.processed());
    println!("Summary: {}", summary.summary_line());
    for row in summary.report_rows() {
        println!(
            "{:>4}  {:<32} {:<8} {:>3}%  {}",
            row.id,
            row.filename,
            row.result,
            row.confidence_percent(),
            row.width
        );
    }
}

fn run_history(settings: &Settings, limit: Option<usize>, json: bool) -> crackscan::Result<()> {
    let history = HistoryStore::open(&settings.history_path);
    let entries = history.entries();
    let shown = &entries[..limit.unwrap_or(entries.len()).min(entries.len())];

    if json {
        println!("{}", to_json(&shown)?);
        return Ok(());
    }

    if shown.is_empty() {
        println!("Scan log is empty.");
        return Ok(());
    }
    for entry in shown {
        println!(
            "{}  {:<32} {:<6} {}%",
            entry.time,
            entry.file,
            entry.result,
            confidence_percent(entry.confidence as f32)
        );
    }
    Ok(())
}

fn run_settings(
    action: SettingsAction,
    settings: &Settings,
    settings_path: &Path,
) -> crackscan::Result<()> {
    match action {
        SettingsAction::Show => {
            println!("# {}", settings_path.display());
            println!("{}", to_json(settings)?);
            Ok(())
        }
        SettingsAction::Save => settings.save(settings_path),
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> crackscan::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| InspectError::Persistence {
        path: PathBuf::from("<stdout>"),
        source: e,
    })
}
