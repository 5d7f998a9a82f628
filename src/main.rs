use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser};
use is_terminal::IsTerminal;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gstgraph::{
    parse_signal, Catalog, ErrorStrategy, Figure, GraphDefinitions, OutputFormat, PipelineConfig,
    SeriesWriter, StopSignal, StreamPipeline,
};

#[derive(Parser)]
#[command(name = "gstgraph")]
#[command(about = "Extract time series from GStreamer debug logs")]
#[command(version)]
struct Args {
    /// GStreamer debug log (GST_DEBUG_FILE output)
    #[arg(value_name = "LOG")]
    input: Option<PathBuf>,

    /// Signal expression, e.g. vdec.chain.pts or queue2.chain.size.rate_over_time()
    #[arg(short = 's', long = "signal", action = ArgAction::Append)]
    signals: Vec<String>,

    /// YAML file with extra extractors, groups and figures
    #[arg(short = 'd', long = "definitions")]
    definitions: Option<PathBuf>,

    /// Name of the figure holding the --signal series
    #[arg(long, default_value = "signals")]
    title: String,

    /// Record field used to fan series out per instance
    #[arg(long, value_name = "KEY", default_value = "source")]
    split_by: String,

    /// One panel per split key value instead of one shared panel
    #[arg(long)]
    split: bool,

    /// Keep reading as the log grows (Ctrl-C to stop)
    #[arg(short = 'f', long)]
    follow: bool,

    /// Poll interval in follow mode
    #[arg(long, value_name = "DURATION", default_value = "100ms", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Jsonl)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short = 'o', long = "output")]
    output_file: Option<PathBuf>,

    /// Fail on first malformed line instead of skipping it
    #[arg(long)]
    fail_fast: bool,

    /// Warn about lines matched by more than one extractor
    #[arg(long)]
    detect_overlaps: bool,

    /// Maximum line length
    #[arg(long, default_value = "1048576")] // 1MB
    max_line_length: usize,

    /// List every known signal path and exit
    #[arg(long)]
    list: bool,

    /// Debug mode - log processing details
    #[arg(long)]
    debug: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .init();
}

fn run(args: Args) -> Result<()> {
    let mut catalog = Catalog::builtin().context("built-in extractors")?;
    let definitions = match &args.definitions {
        Some(path) => {
            let definitions = GraphDefinitions::load(path)?;
            catalog.extend_from(&definitions)?;
            Some(definitions)
        }
        None => None,
    };

    if args.list {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for field in catalog.fields() {
            match field.unit {
                Some(unit) => writeln!(out, "{}\t{} ({})", field.path, field.description, unit)?,
                None => writeln!(out, "{}\t{}", field.path, field.description)?,
            }
        }
        return Ok(());
    }

    let mut figures = match &definitions {
        Some(definitions) => definitions.figures(&catalog)?,
        None => Vec::new(),
    };
    if !args.signals.is_empty() {
        let signals = args
            .signals
            .iter()
            .map(|expr| parse_signal(expr, &catalog))
            .collect::<Result<Vec<_>, _>>()?;
        figures.push(
            Figure::new(args.title.clone(), signals)
                .split_key(args.split_by.clone())
                .split(args.split),
        );
    }
    if figures.is_empty() {
        bail!("nothing to extract: pass --signal or a definitions file with figures (see --list)");
    }

    let Some(input) = &args.input else {
        bail!("no log file given");
    };

    let config = PipelineConfig {
        error_strategy: if args.fail_fast {
            ErrorStrategy::FailFast
        } else {
            ErrorStrategy::Skip
        },
        debug: args.debug,
        poll_interval: args.interval,
        max_line_length: args.max_line_length,
        detect_overlaps: args.detect_overlaps,
        ..PipelineConfig::default()
    };

    let mut pipeline = StreamPipeline::new(config);
    for figure in figures {
        pipeline.add_figure(figure);
    }
    tracing::info!(
        "{} figures fed by {} extractors",
        pipeline.figures().len(),
        pipeline.extractors().len()
    );

    // Set up output
    let output: Box<dyn Write> = match &args.output_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file '{}'", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    };
    let mut writer = SeriesWriter::new(args.format, output);

    let stats = if args.follow {
        let stop = StopSignal::new();
        let handler_stop = stop.clone();
        ctrlc::set_handler(move || handler_stop.stop())
            .context("Failed to install Ctrl-C handler")?;
        pipeline.follow_file(input, &mut writer, &stop)?
    } else {
        pipeline.analyze_file(input, &mut writer)?
    };
    writer.finish()?;

    if stats.errors > 0 {
        tracing::warn!(
            "{} of {} lines could not be parsed",
            stats.errors,
            stats.lines_read
        );
    }
    if args.debug {
        for info in &stats.parse_errors {
            tracing::info!(
                "line {} ({}): {}",
                info.line_number,
                info.extractor,
                info.error
            );
        }
    }

    Ok(())
}
