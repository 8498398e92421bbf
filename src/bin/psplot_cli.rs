use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use psplot_core::acquisition::{DummyAcquirer, FallbackAcquirer, LineAcquirer};
use psplot_core::analysis::{Bar, CentroidClassifier, SortMode};
use psplot_core::config::AppConfig;
use psplot_core::pipeline::{CaptureRequest, ImportOutcome, MeasurementPipeline};
use psplot_core::records::RecordLabels;
use serde::Serialize;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "psplot",
    about = "Measurement harness for the plastic spectral scanner"
)]
struct Cli {
    /// Configuration file (defaults to ./psplot.json, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Calibrate once, then take regular captures and print each outcome as JSON
    Simulate {
        /// Number of regular captures after calibration
        #[arg(long, default_value_t = 3)]
        count: usize,
        /// Scanner device to open read/write (dummy data when absent or failing).
        /// The device is opened as a plain file with no read timeout: configure
        /// the port beforehand (e.g. `stty -F <dev> min 0 time 20`) or a silent
        /// scanner blocks the capture indefinitely
        #[arg(long)]
        device: Option<PathBuf>,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "unknown")]
        material: String,
        #[arg(long, default_value = "")]
        color: String,
        /// Skip calibration and accept null normalized values
        #[arg(long)]
        no_calibration: bool,
        /// Centroid model used to classify each capture
        #[arg(long)]
        model: Option<PathBuf>,
        /// Write the resulting dataset as CSV
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Load a dataset and print per-series record counts
    Inspect {
        dataset: PathBuf,
    },
    /// Load a dataset and classify its newest record
    Predict {
        dataset: PathBuf,
        #[arg(long)]
        model: Option<PathBuf>,
        /// Sort bars ascending by probability instead of class order
        #[arg(long)]
        by_score: bool,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Simulate {
            count,
            device,
            name,
            material,
            color,
            no_calibration,
            model,
            export,
        } => run_simulate(
            &config,
            SimulateArgs {
                count,
                device,
                labels: RecordLabels::new(&name, &material, &color),
                no_calibration,
                model,
                export,
            },
        ),
        Commands::Inspect { dataset } => run_inspect(&config, &dataset),
        Commands::Predict {
            dataset,
            model,
            by_score,
        } => run_predict(&config, &dataset, model, by_score),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::from(0))
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

struct SimulateArgs {
    count: usize,
    device: Option<PathBuf>,
    labels: RecordLabels,
    no_calibration: bool,
    model: Option<PathBuf>,
    export: Option<PathBuf>,
}

fn open_acquirer(config: &AppConfig, device: Option<&Path>) -> FallbackAcquirer {
    let dummy = DummyAcquirer::from_config(&config.hardware);
    let Some(path) = device else {
        tracing::warn!("No scanner device given, using dummy data");
        return FallbackAcquirer::offline(dummy);
    };

    match OpenOptions::new().read(true).write(true).open(path) {
        Ok(port) => {
            let mut line = LineAcquirer::new(
                port,
                &config.hardware.request_token,
                config.channel_count(),
            );
            if let Err(err) = line.skip_greeting() {
                tracing::warn!("Scanner greeting not received: {}", err);
            }
            FallbackAcquirer::new(Box::new(line), Some(dummy))
        }
        Err(err) => {
            tracing::warn!(
                "Cannot open scanner {}, using dummy data: {}",
                path.display(),
                err
            );
            FallbackAcquirer::offline(dummy)
        }
    }
}

fn load_model(config: &AppConfig, model: Option<PathBuf>) -> Result<Option<CentroidClassifier>> {
    match model.or_else(|| config.classifier.model_path.clone()) {
        Some(path) => CentroidClassifier::load(&path)
            .map(Some)
            .with_context(|| format!("loading model {}", path.display())),
        None => Ok(None),
    }
}

fn build_pipeline(
    config: &AppConfig,
    acquirer: FallbackAcquirer,
    model: Option<PathBuf>,
) -> Result<MeasurementPipeline> {
    let pipeline = MeasurementPipeline::from_config(config, acquirer)
        .map_err(|reason| anyhow!("invalid configuration: {}", reason))?;
    Ok(match load_model(config, model)? {
        Some(classifier) => pipeline.with_classifier(Box::new(classifier)),
        None => pipeline,
    })
}

fn run_simulate(config: &AppConfig, args: SimulateArgs) -> Result<ExitCode> {
    let acquirer = open_acquirer(config, args.device.as_deref());
    let mut pipeline = build_pipeline(config, acquirer, args.model)?;

    if args.no_calibration {
        pipeline.override_no_calibration_warning();
    } else {
        let outcome = pipeline
            .capture(CaptureRequest::calibration())
            .context("calibration capture")?;
        println!("{}", serde_json::to_string(&outcome)?);
    }

    for i in 0..args.count {
        let outcome = pipeline
            .capture(CaptureRequest::regular(args.labels.clone()))
            .with_context(|| format!("regular capture {}", i + 1))?;
        println!("{}", serde_json::to_string(&outcome)?);
    }

    if let Some(path) = args.export {
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        pipeline
            .export_dataset(BufWriter::new(file))
            .with_context(|| format!("exporting {}", path.display()))?;
        tracing::info!("Wrote {} records to {}", pipeline.records().len(), path.display());
    }

    Ok(ExitCode::from(0))
}

fn load_dataset(
    config: &AppConfig,
    dataset: &Path,
    model: Option<PathBuf>,
) -> Result<(MeasurementPipeline, ImportOutcome)> {
    let acquirer = FallbackAcquirer::offline(DummyAcquirer::from_config(&config.hardware));
    let mut pipeline = build_pipeline(config, acquirer, model)?;
    let file = File::open(dataset).with_context(|| format!("opening {}", dataset.display()))?;
    let outcome = pipeline
        .import_dataset(file)
        .with_context(|| format!("importing {}", dataset.display()))?;
    Ok((pipeline, outcome))
}

#[derive(Serialize)]
struct SeriesSummary<'a> {
    bucket: String,
    identity: &'a str,
    label: &'a str,
    records: usize,
}

#[derive(Serialize)]
struct InspectReport<'a> {
    records: usize,
    calibration_records: usize,
    series: Vec<SeriesSummary<'a>>,
}

fn run_inspect(config: &AppConfig, dataset: &Path) -> Result<ExitCode> {
    let (pipeline, outcome) = load_dataset(config, dataset, None)?;
    let report = InspectReport {
        records: outcome.records,
        calibration_records: outcome.calibration_records,
        series: pipeline
            .series()
            .entries()
            .map(|entry| SeriesSummary {
                bucket: entry.key().bucket.to_string(),
                identity: &entry.key().identity,
                label: entry.label(),
                records: entry.len(),
            })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_predict(
    config: &AppConfig,
    dataset: &Path,
    model: Option<PathBuf>,
    by_score: bool,
) -> Result<ExitCode> {
    let (pipeline, outcome) = load_dataset(config, dataset, model)?;
    if !pipeline.has_classifier() {
        return Err(anyhow!("no model given and none configured"));
    }
    if let Some(err) = outcome.prediction_error {
        return Err(anyhow::Error::new(err).context("classifying newest record"));
    }
    if outcome.prediction.is_none() {
        eprintln!("Newest record has no normalized values; nothing to classify");
        return Ok(ExitCode::from(2));
    }

    let mode = if by_score {
        SortMode::ByScore
    } else {
        SortMode::Default
    };
    let bars: Vec<Bar> = pipeline.ordering(mode);
    for bar in &bars {
        println!("{:>8} {:>3}%", bar.label, bar.display);
    }
    Ok(ExitCode::from(0))
}
