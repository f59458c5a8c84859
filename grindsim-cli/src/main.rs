mod params;
mod progress;
mod reports;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use log::{debug, warn};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use grindsim_engine::{
    Aggregator, CancelToken, EMPTY_REPORT, RunOptions, SimConfig, Summarize, TailWindow, Trial,
    TrialBatch, TrialFamily, TrialOutcome, default_worker_count, run_with_token,
};
use params::ParamSheet;
use progress::ProgressMeter;
use reports::RunReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FamilyArg {
    /// Grind an endless queue of enemies
    #[value(alias = "fight")]
    Fighting,
    /// Pickpocket on a fixed schedule
    #[value(alias = "theft", alias = "thieve")]
    Thieving,
}

impl From<FamilyArg> for TrialFamily {
    fn from(arg: FamilyArg) -> Self {
        match arg {
            FamilyArg::Fighting => Self::Fighting,
            FamilyArg::Thieving => Self::Thieving,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Coloured summary for terminals
    Console,
    /// Machine-readable summary
    Json,
    /// Markdown table
    Markdown,
}

#[derive(Debug, Parser)]
#[command(name = "grindsim", version)]
#[command(about = "Monte Carlo estimates for idle-game fighting and thieving loops")]
struct Args {
    /// Which simulator to run
    #[arg(value_enum)]
    family: FamilyArg,

    /// Number of trials (defaults to the sheet's "Iterations", then 5000)
    #[arg(long, short = 'n')]
    trials: Option<usize>,

    /// Master seed for a reproducible run
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads (defaults to available parallelism minus one)
    #[arg(long)]
    workers: Option<usize>,

    /// Size of the best/worst tails as a trial count
    #[arg(long, conflicts_with = "tail_fraction")]
    tail_count: Option<usize>,

    /// Size of the best/worst tails as a share of the batch
    #[arg(long)]
    tail_fraction: Option<f64>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Parameter sheet to load (missing files fall back to defaults)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Override a sheet value, e.g. --set "Steal Interval=2.65"
    #[arg(long = "set", value_name = "LABEL=VALUE")]
    overrides: Vec<String>,

    /// Write the effective parameter sheet to this path
    #[arg(long)]
    save_params: Option<PathBuf>,

    /// Suppress banner and progress output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let sheet = resolve_sheet(&args)?;
    if let Some(path) = &args.save_params {
        sheet
            .save(path)
            .with_context(|| format!("failed to save parameters to {}", path.display()))?;
        debug!("saved parameter sheet to {}", path.display());
    }
    let config = sheet.to_config()?;
    let options = build_run_options(&args, &sheet)?;
    let aggregator = Aggregator::new(resolve_tail_window(&args)?);

    if !args.quiet {
        announce_banner(config.family(), &options);
    }

    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());

    let quiet = args.quiet;
    let report =
        tokio::task::spawn_blocking(move || execute(config, &options, cancel, aggregator, quiet))
            .await
            .context("simulation task failed")??;

    write_report(&args, &report)
}

fn resolve_sheet(args: &Args) -> Result<ParamSheet> {
    let family = TrialFamily::from(args.family);
    let mut sheet = match &args.params {
        Some(path) => ParamSheet::load(path, family)?,
        None => ParamSheet::defaults(family),
    };
    for assignment in &args.overrides {
        sheet.set(assignment)?;
    }
    Ok(sheet)
}

fn build_run_options(args: &Args, sheet: &ParamSheet) -> Result<RunOptions> {
    let trials = match args.trials {
        Some(trials) => trials,
        None => sheet.trials()?,
    };
    let workers = args.workers.unwrap_or_else(default_worker_count);
    let mut options = RunOptions::new(trials).with_workers(workers);
    if let Some(seed) = args.seed {
        options = options.with_seed(seed);
    }
    Ok(options)
}

fn resolve_tail_window(args: &Args) -> Result<TailWindow> {
    match (args.tail_count, args.tail_fraction) {
        (Some(count), _) => Ok(TailWindow::Count(count)),
        (None, Some(fraction)) => {
            if fraction.is_nan() || fraction <= 0.0 || fraction > 1.0 {
                bail!("--tail-fraction must be in (0, 1], got {fraction}");
            }
            Ok(TailWindow::Fraction(fraction))
        }
        (None, None) => Ok(TailWindow::default()),
    }
}

fn announce_banner(family: TrialFamily, options: &RunOptions) {
    eprintln!("{}", "⚔️  Grindsim".bright_cyan().bold());
    eprintln!("{}", "================================".cyan());
    eprintln!(
        "Running {} {family} trials on {} workers",
        options.trials, options.workers
    );
}

fn install_interrupt_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after in-flight trials");
            cancel.cancel();
        }
    });
}

fn execute(
    config: SimConfig,
    options: &RunOptions,
    cancel: CancelToken,
    aggregator: Aggregator,
    quiet: bool,
) -> Result<RunReport> {
    match config {
        SimConfig::Fighting(config) => {
            run_family(Arc::new(config), options, cancel, aggregator, quiet)
        }
        SimConfig::Thieving(config) => {
            run_family(Arc::new(config), options, cancel, aggregator, quiet)
        }
    }
}

fn run_family<T>(
    trial: Arc<T>,
    options: &RunOptions,
    cancel: CancelToken,
    aggregator: Aggregator,
    quiet: bool,
) -> Result<RunReport>
where
    T: Trial,
    T::Outcome: Summarize,
{
    let family = <T::Outcome as TrialOutcome>::FAMILY;
    let started = Instant::now();
    let mut handle = run_with_token(trial, options, cancel)?;
    let mut batch = TrialBatch::for_trials(options.trials);
    let mut meter = ProgressMeter::stderr(family.label(), options.trials, !quiet);
    handle.drain_into(&mut batch, |progress, partial| {
        meter.observe(progress, || aggregator.render(partial));
    });
    let outcome = handle.finish()?;

    let summary = aggregator.summarize(&batch);
    let text = summary
        .as_ref()
        .map_or_else(|| EMPTY_REPORT.to_string(), ToString::to_string);
    Ok(RunReport {
        family,
        generated_at: Utc::now().to_rfc3339(),
        outcome,
        tail_window: aggregator.window(),
        wall_time_ms: started.elapsed().as_millis(),
        summary: summary.map(serde_json::to_value).transpose()?,
        text,
    })
}

fn write_report(args: &Args, report: &RunReport) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, report)?,
        ReportFormat::Markdown => reports::generate_markdown_report(&mut output_target, report)?,
        ReportFormat::Console => reports::generate_console_report(&mut output_target, report)?,
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
