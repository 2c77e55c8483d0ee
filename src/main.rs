//! Gaze Focus Agent CLI
//!
//! Attention classification and training-data labeling from face-mesh
//! landmarks.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::RecvTimeoutError;
use gaze_focus_agent::{
    config::Config,
    core::{
        Dataset, DenseNetwork, EyeProfile, EyeRegions, FeatureExtractor, GazePipeline,
        LabelOutcome, LabelingSession, LiveInference, PipelineEvent, TemporalClassifier,
        Unavailable, WindowMode,
    },
    source::{FrameReader, FrameThrottle, InputEvent, InputSource, SourceError},
    transparency::{create_shared_log_with_persistence, Counter, CounterValues, TransparencyLog},
    Decision, PRIVACY_DECLARATION, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gaze-focus")]
#[command(version = VERSION)]
#[command(about = "Attention classification from facial landmarks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify a landmark stream as focused or distracted
    Classify {
        /// Input file of JSON lines, or `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: String,

        /// Scoring model weights (overrides the configured model)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Scores per decision window
        #[arg(long)]
        window: Option<usize>,

        /// Emit a decision for every frame once the window is full
        #[arg(long)]
        sliding: bool,

        /// Window means above this are distracted
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Run a labeling session and export a training dataset
    Label {
        /// Input file of JSON lines, or `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: String,

        /// Dataset file to write
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Eye contour points to use
        #[arg(long, value_enum)]
        profile: Option<ProfileArg>,

        /// Continue an existing dataset
        #[arg(long)]
        append: Option<PathBuf>,
    },

    /// Print the gaze features of every frame as JSON lines
    Extract {
        /// Input file of JSON lines, or `-` for stdin
        #[arg(long, short, default_value = "-")]
        input: String,
    },

    /// Concatenate datasets into one file
    Combine {
        /// Datasets to combine, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Combined dataset file
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Show per-class counts of a dataset
    Stats {
        /// Dataset file
        file: PathBuf,
    },

    /// Show configuration and cumulative statistics
    Status,

    /// Display privacy declaration
    Privacy,

    /// Show configuration
    Config {
        /// Write the current configuration (defaults if none) to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProfileArg {
    /// 8 contour points per eye
    Contour,
    /// Contour plus 2 lower-lid points per eye
    LowerLid,
}

impl From<ProfileArg> for EyeProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Contour => EyeProfile::Contour,
            ProfileArg::LowerLid => EyeProfile::ContourWithLowerLid,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify {
            input,
            model,
            window,
            sliding,
            threshold,
        } => cmd_classify(&input, model, window, sliding, threshold),
        Commands::Label {
            input,
            output,
            profile,
            append,
        } => cmd_label(&input, output, profile, append),
        Commands::Extract { input } => cmd_extract(&input),
        Commands::Combine { files, output } => cmd_combine(&files, &output),
        Commands::Stats { file } => cmd_stats(&file),
        Commands::Status => cmd_status(),
        Commands::Privacy => {
            println!("{PRIVACY_DECLARATION}");
            Ok(())
        }
        Commands::Config { init } => cmd_config(init),
    }
}

fn cmd_classify(
    input: &str,
    model: Option<PathBuf>,
    window: Option<usize>,
    sliding: bool,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(window) = window {
        config.window_size = window;
    }
    if sliding {
        config.window_mode = WindowMode::Sliding;
    }
    if let Some(threshold) = threshold {
        config.decision_threshold = threshold;
    }
    config.validate()?;

    let mut classifier = TemporalClassifier::new(extractor_for(&config), config.window_size)
        .with_mode(config.window_mode)
        .with_threshold(config.decision_threshold);

    match model.or_else(|| config.model_path.clone()) {
        Some(path) => {
            let network = DenseNetwork::load(&path)
                .with_context(|| format!("loading scoring model from {}", path.display()))?;
            tracing::info!(model = %path.display(), "scoring model loaded");
            classifier.set_scorer(Box::new(network));
        }
        None => tracing::warn!("no scoring model configured, decisions are unavailable"),
    }

    println!("Gaze Focus Agent v{VERSION}");
    println!(
        "  Window: {} frames ({:?}), threshold {}",
        config.window_size, config.window_mode, config.decision_threshold
    );
    println!();

    let log = create_shared_log_with_persistence(config.data_path.join("transparency.json"));
    let mut throttle = FrameThrottle::new(config.min_frame_interval);
    let mut live = LiveInference::new(classifier);
    let mut reported_unknown = false;

    let outcome = drive(input, &log, |event| {
        let frame = match event {
            InputEvent::Frame(frame) => frame,
            other => {
                record_non_frame(&log, &other);
                return Ok(());
            }
        };
        if !accept_frame(&log, &mut throttle, &frame) {
            return Ok(());
        }

        match live.on_frame(frame) {
            PipelineEvent::Decided(decision) => {
                reported_unknown = false;
                log.record(match decision {
                    Decision::Focused => Counter::DecisionsFocused,
                    Decision::Distracted => Counter::DecisionsDistracted,
                });
                match live.last_window() {
                    Some(window) => println!(
                        "[{}] {decision} (mean {:.3}, sd {:.3}, n={})",
                        Utc::now().format("%H:%M:%S"),
                        window.mean_score,
                        window.std_dev,
                        window.samples
                    ),
                    None => println!("[{}] {decision}", Utc::now().format("%H:%M:%S")),
                }
            }
            PipelineEvent::Unavailable(Unavailable::NoModel) => {
                if !reported_unknown {
                    println!("[{}] unknown", Utc::now().format("%H:%M:%S"));
                    tracing::warn!("classification unavailable: no scoring model loaded");
                    reported_unknown = true;
                }
            }
            PipelineEvent::Unavailable(reason) => {
                tracing::warn!(%reason, "frame not scored");
            }
            PipelineEvent::Skipped(reason) => {
                log.record(Counter::FramesSkipped);
                tracing::debug!(%reason, "frame skipped");
            }
            PipelineEvent::Accumulating { .. } | PipelineEvent::Stored | PipelineEvent::Dropped => {}
        }
        Ok(())
    });

    finish(&log);
    outcome
}

fn cmd_label(
    input: &str,
    output: Option<PathBuf>,
    profile: Option<ProfileArg>,
    append: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = load_config()?;
    if let Some(profile) = profile {
        config.eye_regions = EyeRegions::for_profile(profile.into());
    }
    config.validate()?;

    let export_path = output.unwrap_or_else(|| {
        config.export_path.join(format!(
            "dataset_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    });

    let mut session = LabelingSession::new(extractor_for(&config));
    if let Some(path) = append {
        let existing = Dataset::load(&path)
            .with_context(|| format!("loading dataset {}", path.display()))?;
        println!("Continuing {} ({} records)", path.display(), existing.len());
        session = session.with_dataset(existing);
    }

    let session_id = Uuid::new_v4();
    let _span = tracing::info_span!("label", session = %session_id).entered();

    println!("Gaze Focus Agent v{VERSION}");
    println!("Session ID: {session_id}");
    println!("Dataset: {}", export_path.display());
    println!();

    let log = create_shared_log_with_persistence(config.data_path.join("transparency.json"));
    let mut throttle = FrameThrottle::new(config.min_frame_interval);

    let outcome = drive(input, &log, |event| {
        match event {
            InputEvent::Frame(frame) => {
                if accept_frame(&log, &mut throttle, &frame)
                    && GazePipeline::on_frame(&mut session, frame) == PipelineEvent::Dropped
                {
                    log.record(Counter::FramesDropped);
                }
            }
            InputEvent::Capture => {
                if session.capture() {
                    println!("Captured. Label the frame as focused or distracted.");
                }
            }
            InputEvent::Label { label } => match session.label(label) {
                LabelOutcome::Recorded { index, .. } => {
                    log.record(Counter::RecordsLabeled);
                    let counts = session.counts();
                    println!(
                        "[{}] #{index} {label} ({} focused, {} distracted)",
                        Utc::now().format("%H:%M:%S"),
                        counts.focused,
                        counts.distracted
                    );
                }
                LabelOutcome::NotCaptured => {
                    tracing::debug!(%label, "label ignored, nothing captured");
                }
                LabelOutcome::NoActiveCapture => {
                    println!("No face seen yet. Waiting for a frame.");
                }
                LabelOutcome::FeatureUnavailable(reason) => {
                    log.record(Counter::FramesSkipped);
                    println!("Captured frame is unusable ({reason}). Discard and capture again.");
                }
            },
            InputEvent::Discard => {
                if session.discard() {
                    println!("Capture discarded.");
                }
            }
            InputEvent::Export => export_dataset(&log, session.dataset(), &export_path)?,
            InputEvent::NoFace => log.record(Counter::NoFaceFrames),
        }
        Ok(())
    });

    if !session.dataset().is_empty() {
        export_dataset(&log, session.dataset(), &export_path)?;
    }

    finish(&log);
    outcome
}

fn cmd_extract(input: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let extractor = extractor_for(&config);
    let log = TransparencyLog::new();

    drive(input, &log, |event| {
        let frame = match event {
            InputEvent::Frame(frame) => frame,
            other => {
                record_non_frame(&log, &other);
                return Ok(());
            }
        };
        log.record(Counter::FramesReceived);

        let line = match extractor.extract(&frame) {
            Ok(features) => serde_json::json!({
                "timestamp_ms": frame.timestamp_ms,
                "features": features,
            }),
            Err(reason) => {
                log.record(Counter::FramesSkipped);
                serde_json::json!({
                    "timestamp_ms": frame.timestamp_ms,
                    "unavailable": reason.to_string(),
                })
            }
        };
        println!("{line}");
        Ok(())
    })
}

fn cmd_combine(files: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let datasets = files
        .iter()
        .map(|path| {
            let dataset = Dataset::load(path)
                .with_context(|| format!("loading dataset {}", path.display()))?;
            println!("  {}: {} records", path.display(), dataset.len());
            Ok(dataset)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let combined = Dataset::combine(datasets);
    combined
        .export(output)
        .with_context(|| format!("writing {}", output.display()))?;

    let counts = combined.counts();
    println!(
        "Combined {} records ({} focused, {} distracted) into {}",
        combined.len(),
        counts.focused,
        counts.distracted,
        output.display()
    );
    Ok(())
}

fn cmd_stats(file: &Path) -> anyhow::Result<()> {
    let dataset =
        Dataset::load(file).with_context(|| format!("loading dataset {}", file.display()))?;
    let counts = dataset.counts();
    let share = |n: u64| {
        if counts.total() == 0 {
            0.0
        } else {
            n as f64 * 100.0 / counts.total() as f64
        }
    };

    println!("Dataset: {}", file.display());
    println!("  Records: {}", counts.total());
    println!("  Focused: {} ({:.1}%)", counts.focused, share(counts.focused));
    println!(
        "  Distracted: {} ({:.1}%)",
        counts.distracted,
        share(counts.distracted)
    );
    Ok(())
}

fn cmd_status() -> anyhow::Result<()> {
    let config = load_config()?;

    println!("Gaze Focus Agent Status");
    println!("=======================");
    println!();
    println!("Configuration:");
    println!("  Window: {} frames ({:?})", config.window_size, config.window_mode);
    println!("  Decision threshold: {}", config.decision_threshold);
    match &config.model_path {
        Some(path) => println!(
            "  Scoring model: {} ({})",
            path.display(),
            if path.exists() { "found" } else { "missing" }
        ),
        None => println!("  Scoring model: not configured"),
    }
    println!("  Dataset directory: {}", config.export_path.display());
    println!();

    let stats_path = config.data_path.join("transparency.json");
    if !stats_path.exists() {
        println!("No previous session data found.");
        return Ok(());
    }

    let content = std::fs::read_to_string(&stats_path)
        .with_context(|| format!("reading {}", stats_path.display()))?;
    let counts: CounterValues = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", stats_path.display()))?;

    println!("Cumulative Statistics:");
    println!("  Frames received: {}", counts.frames_received);
    println!("  Frames dropped: {}", counts.frames_dropped);
    println!("  Frames skipped: {}", counts.frames_skipped);
    println!(
        "  Decisions: {} focused, {} distracted",
        counts.decisions_focused, counts.decisions_distracted
    );
    println!("  Records labeled: {}", counts.records_labeled);
    println!("  Datasets exported: {}", counts.datasets_exported);
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    let config = load_config()?;

    if init {
        config
            .save()
            .with_context(|| format!("writing {}", Config::config_path().display()))?;
        println!("Wrote {}", Config::config_path().display());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", Config::config_path().display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let config = Config::load()
        .with_context(|| format!("loading {}", Config::config_path().display()))?;
    if let Err(e) = config.ensure_directories() {
        tracing::warn!(error = %e, "could not create data directories");
    }
    Ok(config)
}

fn extractor_for(config: &Config) -> FeatureExtractor {
    FeatureExtractor::new(config.eye_regions.clone(), config.degenerate_policy)
}

/// Feed every input event to `on_event` until the input ends or Ctrl+C.
fn drive(
    input: &str,
    log: &TransparencyLog,
    mut on_event: impl FnMut(InputEvent) -> anyhow::Result<()>,
) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")?;

    let source = InputSource::from_arg(input);
    let mut reader = FrameReader::new(source.clone());
    reader
        .start()
        .with_context(|| format!("opening input {source}"))?;

    let receiver = reader.receiver().clone();
    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => on_event(event)?,
            Ok(Err(SourceError::Malformed { line, message })) => {
                log.record(Counter::MalformedLines);
                tracing::warn!(line, %message, "skipping malformed input line");
            }
            Ok(Err(e)) => bail!("reading {source}: {e}"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!(%source, "input exhausted");
                break;
            }
        }
    }

    if reader.is_running() {
        tracing::info!(%source, "interrupted before end of input");
        reader.stop();
    }
    Ok(())
}

/// Count a frame and apply the rate cap. Returns false if it was dropped.
fn accept_frame(
    log: &TransparencyLog,
    throttle: &mut FrameThrottle,
    frame: &gaze_focus_agent::LandmarkFrame,
) -> bool {
    log.record(Counter::FramesReceived);
    if throttle.accept(frame) {
        true
    } else {
        log.record(Counter::FramesDropped);
        false
    }
}

fn record_non_frame(log: &TransparencyLog, event: &InputEvent) {
    match event {
        InputEvent::NoFace => log.record(Counter::NoFaceFrames),
        other => tracing::debug!(kind = other.kind(), "event ignored in this mode"),
    }
}

fn export_dataset(log: &TransparencyLog, dataset: &Dataset, path: &Path) -> anyhow::Result<()> {
    dataset
        .export(path)
        .with_context(|| format!("writing dataset {}", path.display()))?;
    log.record(Counter::DatasetsExported);
    println!("Exported {} records to {}", dataset.len(), path.display());
    Ok(())
}

fn finish(log: &TransparencyLog) {
    if let Err(e) = log.save() {
        tracing::warn!(error = %e, "could not save transparency log");
    }
    println!();
    println!("{}", log.summary());
}
