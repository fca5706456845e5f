use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "surfer", version)]
struct Cli {
    /// Log scheduler activity to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene file through every quality tier and write the final frame as a PNG.
    Render(RenderArgs),
    /// Parse a scene file and compile its formula without rendering.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene file (`.jsurf`).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Side length of the square display, in pixels.
    #[arg(long, default_value_t = 256)]
    size: u32,

    /// JSON options file (scheduler and evaluator tunables).
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Evaluate rows in parallel.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Print one JSON line per pass to stdout.
    #[arg(long, default_value_t = false)]
    report: bool,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input scene file (`.jsurf`).
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut opts = match &args.opts {
        Some(path) => surfer::SurferOpts::from_path(path)?,
        None => surfer::SurferOpts::default(),
    };
    if args.parallel {
        opts.evaluator.parallel = true;
    }
    if args.threads.is_some() {
        opts.evaluator.threads = args.threads;
    }

    let evaluator = surfer::CpuEvaluator::new(opts.evaluator)?;
    let display = surfer::MemoryDisplay::new(args.size, args.size);
    let mut view = surfer::SurfaceView::new(Box::new(evaluator), display, opts.scheduler)?;
    view.load_from_path(&args.in_path)
        .with_context(|| format!("load scene '{}'", args.in_path.display()))?;
    view.run_until_idle()?;
    if !view.error_message().is_empty() {
        anyhow::bail!("render failed: {}", view.error_message());
    }

    if args.report {
        for report in view.scheduler_mut().take_reports() {
            println!("{}", serde_json::to_string(&report)?);
        }
    }
    let frame = view
        .display()
        .frame()
        .context("no frame was rendered (empty display?)")?;
    view.shutdown(surfer::ShutdownMode::Cancel)?;

    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.to_rgba8(),
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let cfg = surfer::SceneConfig::from_path(&args.in_path)?;
    let program = surfer::SurfaceProgram::compile(&cfg.surface_equation)?;
    program.bind_parameters(&cfg.parameters)?;
    println!("{}: ok", args.in_path.display());
    println!("formula: {}", program.source());
    for (name, value) in &cfg.parameters {
        println!("  {name} = {value}");
    }
    println!("camera: {}", cfg.camera_kind.as_config_str());
    Ok(())
}
