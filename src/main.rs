use clap::{Parser, Subcommand};
use pixbatch::imaging::codec::{self, supported_input_extensions};
use pixbatch::imaging::{ForegroundSegmenter, Quality, SegmentationParams, U2NetBackend};
use pixbatch::process::{self, BatchInput, BatchOptions};
use pixbatch::session::Session;
use pixbatch::types::{OperationSelection, OutputFormat, ResizeTarget, Shape};
use pixbatch::{config, output};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "pixbatch")]
#[command(about = "Batch resize, square crop/extend and background removal")]
#[command(long_about = "\
Batch resize, square crop/extend and background removal

Every input image goes through the same steps, in this order:

  1. resize          exact WxH, only when both sides shrink
  2. shape           square-crop | square-extend | ratio-extend (3:4)
  3. background      U2-Net foreground mask, composited on white

Results are written as <name>.<ext> into the output directory, with a
report.json listing every input and what happened to it. An image that
fails is reported and skipped; the rest of the batch still completes.

A rerun into the same output directory first deletes the files named in
the previous report.json. Nothing else in the directory is touched.

Ctrl-C stops the process at once. Cancelling between images, with the
unstarted ones reported as skipped, is only available to library callers
through Session::cancel_token.

Run 'pixbatch gen-config' to generate a documented pixbatch.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ProcessArgs {
    /// Image files or directories
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "pixbatch-out")]
    output: PathBuf,

    /// Resize to the configured target size
    #[arg(long)]
    resize: bool,

    /// Resize to this exact size (implies --resize)
    #[arg(long, value_name = "WxH")]
    size: Option<ResizeTarget>,

    /// Shape operation: none, square-crop, square-extend, ratio-extend
    #[arg(long, default_value = "none")]
    shape: Shape,

    /// Replace the background with white
    #[arg(long)]
    remove_background: bool,

    /// Output format: JPEG, JPEG2000, PNG (default from config)
    #[arg(long)]
    format: Option<OutputFormat>,

    /// JPEG quality 1-100 (default from config)
    #[arg(long)]
    quality: Option<u32>,

    /// Segmentation model path (default from config)
    #[arg(long)]
    model: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Transform a batch of images
    Process(ProcessArgs),
    /// Print format and dimensions of each input without processing
    Check {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// List the configured resize presets
    Presets,
    /// Print a stock pixbatch.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Process(args) => {
            let cfg = config::load_config(&cli.config)?;
            run_process(&cfg, args)?;
        }
        Command::Check { inputs } => {
            let entries: Vec<_> = collect_inputs(&inputs)?
                .into_iter()
                .map(|path| {
                    let info = std::fs::read(&path)
                        .map_err(|e| e.to_string())
                        .and_then(|bytes| codec::identify(&bytes).map_err(|e| e.to_string()));
                    (path.display().to_string(), info)
                })
                .collect();
            for line in output::format_check_output(&entries) {
                println!("{}", line);
            }
        }
        Command::Presets => {
            let cfg = config::load_config(&cli.config)?;
            for preset in &cfg.resize.presets {
                let marker = if *preset == cfg.resize.target { " (default)" } else { "" };
                println!("{}{}", preset, marker);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_process(
    cfg: &config::BatchConfig,
    args: ProcessArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    init_thread_pool(&cfg.processing);

    let mut selection = OperationSelection::default().with_shape(args.shape);
    if let Some(size) = args.size {
        selection = selection.with_resize(size);
    } else if args.resize {
        selection = selection.with_resize(cfg.resize.target);
    }
    if args.remove_background {
        selection = selection.with_background_removal();
    }

    let options = BatchOptions {
        selection,
        format: args.format.unwrap_or(cfg.output.format),
        quality: Quality::new(args.quality.unwrap_or(cfg.output.quality)),
    };

    let inputs = read_inputs(&collect_inputs(&args.inputs)?)?;

    // Loaded lazily on the first image that needs it, then shared.
    let segmenter: Option<Arc<U2NetBackend>> = selection.remove_background.then(|| {
        let model = args.model.clone().unwrap_or_else(|| cfg.background.model.clone());
        let params = SegmentationParams {
            input_size: cfg.background.input_size,
            ..SegmentationParams::default()
        };
        Arc::new(U2NetBackend::new(model).with_params(params))
    });

    let session = Session::in_dir(&args.output)?;

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_process_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = process::process_batch(
        &session,
        &inputs,
        &options,
        segmenter.as_deref().map(|s| s as &dyn ForegroundSegmenter),
        Some(tx),
    );
    printer.join().ok();
    let result = result?;

    session.write_results(&result)?;

    for line in output::format_batch_summary(&result) {
        println!("{}", line);
    }
    println!("==> Output: {}", session.path().display());
    Ok(())
}

/// Map `-v` occurrences to a default filter; `RUST_LOG` still wins.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| supported_input_extensions().contains(&e.to_ascii_lowercase().as_str()))
}

/// Expand arguments into a sorted file list.
///
/// Files named directly are always included so that unsupported ones show up
/// as per-image errors. Directories are walked and filtered by extension.
fn collect_inputs(args: &[PathBuf]) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for arg in args {
        if arg.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(arg).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && has_supported_extension(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            files.push(arg.clone());
        }
    }
    Ok(files)
}

fn read_inputs(paths: &[PathBuf]) -> std::io::Result<Vec<BatchInput>> {
    paths
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(BatchInput::new(filename, bytes))
        })
        .collect()
}
