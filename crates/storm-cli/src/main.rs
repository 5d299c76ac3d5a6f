mod summary;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use storm_core::config::{FrameRange, OutputPaths, PipelineParams};
use storm_core::consts::{DEFAULT_FACTOR, DEFAULT_ROI_LEN, DEFAULT_THRESHOLD};
use storm_core::driver;
use storm_core::error::StormError;
use storm_core::scheduler::{CancellationToken, ProgressReporter};
use tracing_subscriber::EnvFilter;

/// Reconstruct a super-resolution dSTORM image from a frame stack.
#[derive(Parser)]
#[command(
    name = "storm",
    version,
    about = "dSTORM super-resolution localization pipeline",
    disable_help_flag = true
)]
struct Cli {
    /// Prints usage, exits 0
    #[arg(short = '?', long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// Input frame stack (.tif/.tiff, .sif, or .h5/.hdf5 with the `hdf5` feature)
    infile: PathBuf,

    /// Rendered super-resolution image; defaults to INFILE with a .png extension
    outfile: Option<PathBuf>,

    /// Up-sampling factor (must be a power of two)
    #[arg(short = 'g', long, default_value_t = DEFAULT_FACTOR)]
    factor: u32,

    /// Minimum filtered intensity for a maximum candidate
    #[arg(short = 't', long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    /// ROI edge length around each candidate (must stay odd)
    #[arg(short = 'm', long = "roi-len", default_value_t = DEFAULT_ROI_LEN)]
    roi_len: u32,

    /// Wiener filter image: loaded if it exists, else built from data and saved here
    #[arg(short = 'f', long)]
    filter: Option<PathBuf>,

    /// Text catalogue output path
    #[arg(short = 'c', long = "coordsfile")]
    coordsfile: Option<PathBuf>,

    /// Frame subset as `[start]:[end][:stride]`; negative bounds count from the end
    #[arg(short = 'F', long = "frames", default_value = "")]
    frames: String,

    /// Progress detail on stderr
    #[arg(short, long)]
    verbose: bool,
}

struct CliProgress {
    bar: ProgressBar,
    done: AtomicUsize,
}

impl ProgressReporter for CliProgress {
    fn begin_stage(&self, name: &str, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message(name.to_string());
        self.bar.set_position(0);
        self.done.store(0, Ordering::Relaxed);
    }

    fn advance(&self, done: usize) {
        self.done.store(done, Ordering::Relaxed);
        self.bar.set_position(done as u64);
    }

    fn finish_stage(&self) {
        self.bar.finish_and_clear();
    }
}

fn exit_code_for(err: &StormError) -> u8 {
    // Every runtime error maps to exit code 1; usage errors (bad CLI
    // arguments) are caught in main() before run() is ever called and exit
    // 255 (the `u8` truncation of the documented `-1`).
    match err {
        StormError::Cancelled => 0,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            // `--help`/`-?` and `--version` print and exit 0, matching
            // clap's own intent for those kinds; everything else is a
            // genuine usage error, which the spec documents as exit -1.
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(255),
            };
        }
    };

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", style("error:").red().bold(), err);
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run(cli: &Cli) -> Result<(), StormError> {
    let outputs = OutputPaths::derive(&cli.infile, cli.outfile.clone());
    let outputs = OutputPaths {
        image: outputs.image,
        coordsfile: cli.coordsfile.clone().unwrap_or(outputs.coordsfile),
        filter: cli.filter.clone().unwrap_or(outputs.filter),
    };

    let params = PipelineParams {
        factor: cli.factor,
        threshold: cli.threshold,
        roi_len: cli.roi_len,
        frame_range: FrameRange::parse(&cli.frames)?,
        ..Default::default()
    };

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("=>-"),
    );
    let progress = CliProgress {
        bar,
        done: AtomicUsize::new(0),
    };
    let cancel = CancellationToken::new();

    let result = driver::run(&cli.infile, &outputs, &params, &progress, &cancel);
    let summary = result?;

    summary::print_run_summary(&summary, &outputs);
    Ok(())
}
