use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use cli::{report_to_csv, AnalysisRequest};
use color_eyre::eyre::{eyre, Result};
use tracing::info;
use tracing_subscriber::{self, EnvFilter};

use jobs::{AnalysisConfig, AnalysisReport, JobStatus, Orchestrator};
use rasterize::PdfiumOpener;
use surface::io::sheets_to_geojson_string;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an analysis described by a request file (.toml or .json)
    Process {
        /// Path to the request file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Analyze a single plan set with default settings
    Analyze {
        /// Path to the plan-set PDF
        #[arg(short, long)]
        input: PathBuf,
        /// Output directory for the report files
        #[arg(short, long, default_value = "results")]
        output_dir: PathBuf,
        /// Rasterization resolution
        #[arg(long, default_value = "300.0")]
        dpi: f64,
    },
    /// Print the JSON schema of the analysis report
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Process { config } => {
            let request = AnalysisRequest::from_file(config)?;
            run(&request).await?;
        }
        Commands::Analyze { input, output_dir, dpi } => {
            let mut request = AnalysisRequest::new(
                input.to_string_lossy().to_string(),
                output_dir.to_string_lossy().to_string(),
            );
            request.config = AnalysisConfig {
                dpi: *dpi,
                ..AnalysisConfig::default()
            };
            run(&request).await?;
        }
        Commands::Schema => {
            let schema = schemars::schema_for!(AnalysisReport);
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
    }

    Ok(())
}

async fn run(request: &AnalysisRequest) -> Result<()> {
    info!("Analyzing plan set: {}", request.input);
    let bytes = std::fs::read(&request.input)?;

    let orchestrator = Orchestrator::new(PdfiumOpener, request.config.clone());
    let id = orchestrator.submit(&bytes).await?;

    let report = loop {
        let snapshot = orchestrator.poll(id)?;
        match snapshot.status {
            JobStatus::Completed => {
                break snapshot
                    .report
                    .ok_or_else(|| eyre!("completed job carried no report"))?;
            }
            JobStatus::Error => {
                return Err(eyre!(
                    "analysis failed: {}",
                    snapshot.error.unwrap_or_else(|| "unknown error".to_string())
                ));
            }
            JobStatus::Queued | JobStatus::Running => {
                info!(
                    "Processing sheet {}/{}",
                    snapshot.progress.current_sheet, snapshot.progress.total_sheets
                );
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    };

    write_outputs(&report, Path::new(&request.output_dir))?;

    let summary = &report.summary;
    info!(
        "Measured {} polygons across {} sheets ({} flagged for review)",
        summary.total_polygons,
        report.sheets.len(),
        summary.polygons_needing_review
    );
    info!(
        "Impervious {:.2} sqft ({:.2}%), pervious {:.2} sqft ({:.2}%)",
        summary.total_impervious_sqft,
        summary.percent_impervious,
        summary.total_pervious_sqft,
        summary.percent_pervious
    );
    Ok(())
}

fn write_outputs(report: &AnalysisReport, output_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let json_path = output_dir.join("report.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
    info!("Report written to {:?}", json_path);

    let geojson_path = output_dir.join("polygons.geojson");
    std::fs::write(&geojson_path, sheets_to_geojson_string(&report.sheets)?)?;
    info!("GeoJSON written to {:?}", geojson_path);

    let csv_path = output_dir.join("areas.csv");
    std::fs::write(&csv_path, report_to_csv(report))?;
    info!("CSV written to {:?}", csv_path);

    Ok(())
}
