//! cctag CLI: detect concentric-circle tags in images and render printable markers.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use cctag::print::{render_marker, write_png, write_svg, MarkerRenderSpec};
use cctag::{
    annotate_file, detect_from_gray_with, format_detections, load_gray, DetectConfig,
    DetectReport, MarkerBank,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "cctag")]
#[command(about = "Detect concentric-circle tags (CCTags) and render printable markers")]
#[command(version)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect markers in an image.
    Detect(DetectArgs),
    /// Render one marker to PNG or SVG.
    Print(PrintArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Input image (any format the `image` crate decodes).
    image: PathBuf,

    /// Save a copy with a green dot on every marker center.
    #[arg(long)]
    annotate: Option<PathBuf>,

    /// JSON config; command-line options override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Text bank file, one id per line.
    #[arg(long)]
    bank: Option<PathBuf>,

    /// Number of crowns per marker.
    #[arg(long)]
    crowns: Option<usize>,

    /// Report and draw only markers with a reliable id.
    #[arg(long)]
    reliable_only: bool,

    /// Print a JSON report instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct PrintArgs {
    /// Marker id in the bank.
    #[arg(long)]
    id: usize,

    /// Output file; `.svg` writes vector output, anything else PNG.
    #[arg(long)]
    out: PathBuf,

    #[arg(long, default_value_t = 3)]
    crowns: usize,

    /// Text bank file, one id per line.
    #[arg(long)]
    bank: Option<PathBuf>,

    /// PNG canvas side in pixels.
    #[arg(long, default_value_t = 256)]
    size: usize,

    /// Outer radius: pixels for PNG, millimeters for SVG.
    #[arg(long)]
    radius: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    init_logging(&cli.log_level)?;
    match cli.command {
        Commands::Detect(args) => run_detect(args),
        Commands::Print(args) => run_print(args),
    }
}

#[cfg(not(feature = "tracing"))]
fn init_logging(level: &str) -> CliResult<()> {
    cctag::core::init_with_level(cctag::core::parse_level(level))?;
    Ok(())
}

#[cfg(feature = "tracing")]
fn init_logging(_level: &str) -> CliResult<()> {
    cctag::core::init_tracing(false);
    Ok(())
}

fn build_config(args: &DetectArgs) -> CliResult<DetectConfig> {
    let mut cfg = match &args.config {
        Some(path) => DetectConfig::load_json(path)?,
        None => DetectConfig::default(),
    };
    cfg.image_path = path_string(&args.image);
    if let Some(out) = &args.annotate {
        cfg.annotate_path = Some(path_string(out));
    }
    if let Some(bank) = &args.bank {
        cfg.bank_path = Some(path_string(bank));
    }
    if let Some(crowns) = args.crowns {
        cfg.params.n_crowns = crowns;
    }
    if args.reliable_only {
        cfg.params.keep_unreliable = false;
        cfg.annotate.reliable_only = true;
    }
    Ok(cfg)
}

fn run_detect(args: DetectArgs) -> CliResult<()> {
    let cfg = build_config(&args)?;
    let detector = cfg.build_detector()?;
    let img = load_gray(&cfg.image_path)?;
    let markers = detect_from_gray_with(&img, &detector)?;
    log::info!("{}: {} markers", cfg.image_path, markers.len());

    if let Some(out) = &cfg.annotate_path {
        annotate_file(&cfg.image_path, out, &markers, &cfg.annotate)?;
    }

    let report = DetectReport {
        image_path: cfg.image_path.clone(),
        width: img.width(),
        height: img.height(),
        markers,
    };
    if let Some(path) = &cfg.output_path {
        report.write_json(path)?;
    }
    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print!("{}", format_detections(&report.markers));
    }
    Ok(())
}

fn run_print(args: PrintArgs) -> CliResult<()> {
    let bank = match &args.bank {
        Some(path) => MarkerBank::load(path, args.crowns)?,
        None => MarkerBank::builtin(args.crowns)?,
    };
    if is_svg(&args.out) {
        write_svg(&args.out, &bank, args.id, args.radius.unwrap_or(50.0))?;
    } else {
        let radius = args.radius.unwrap_or(0.4 * args.size as f64);
        let img = render_marker(
            &bank,
            args.id,
            &MarkerRenderSpec::centered(args.size, radius),
        )?;
        write_png(&args.out, &img)?;
    }
    log::info!("marker {} written to {}", args.id, args.out.display());
    Ok(())
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
