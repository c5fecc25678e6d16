use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use inkmark::config::Config;
use inkmark::file_type::RequestedType;
use inkmark::job::JobContext;
use inkmark::pool::RenderPool;
use inkmark::task::TaskStatus;
use inkmark::watermark::{WatermarkOptions, WatermarkPosition};
use std::path::PathBuf;

/// Inkmark - text watermarks for images, PDFs and Word documents
#[derive(Parser, Debug)]
#[command(name = "inkmark")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark one or more files
    Watermark(WatermarkArgs),
    /// Print font search diagnostics as JSON
    Fonts,
    /// Print the effective configuration as JSON
    Config,
}

#[derive(Args, Debug)]
struct WatermarkArgs {
    /// Input files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Watermark text (1-200 characters)
    #[arg(short, long)]
    text: String,

    /// File type; auto detects from the extension
    #[arg(long = "type", value_enum, default_value_t = RequestedType::Auto)]
    file_type: RequestedType,

    #[arg(long)]
    font_size: Option<u32>,

    /// Color as #RRGGBB
    #[arg(long)]
    font_color: Option<String>,

    #[arg(long)]
    opacity: Option<f32>,

    /// Rotation in degrees, counter-clockwise
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f32>,

    /// Gap between tiles
    #[arg(long)]
    spacing: Option<u32>,

    /// tile, center, top_left, top_right, bottom_left or bottom_right
    #[arg(long)]
    position: Option<WatermarkPosition>,

    /// Overrides output_dir from the configuration
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

impl WatermarkArgs {
    fn options(&self, defaults: &WatermarkOptions) -> WatermarkOptions {
        WatermarkOptions {
            font_size: self.font_size.unwrap_or(defaults.font_size),
            font_color: self
                .font_color
                .clone()
                .unwrap_or_else(|| defaults.font_color.clone()),
            opacity: self.opacity.unwrap_or(defaults.opacity),
            angle: self.angle.unwrap_or(defaults.angle),
            spacing: self.spacing.unwrap_or(defaults.spacing),
            position: self.position.unwrap_or(defaults.position),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    inkmark::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize logging subsystem")?;

    match cli.command {
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Fonts => {
            let ctx = JobContext::from_config(config);
            println!("{}", serde_json::to_string_pretty(&ctx.fonts().report())?);
            Ok(())
        }
        Command::Watermark(args) => {
            if let Some(dir) = &args.output_dir {
                config.output_dir = dir.clone();
            }
            run_watermark(config, args)
        }
    }
}

fn run_watermark(config: Config, args: WatermarkArgs) -> anyhow::Result<()> {
    let options = args.options(&config.defaults);
    options.validate().context("Invalid watermark options")?;
    inkmark::watermark::validate_text(&args.text).context("Invalid watermark text")?;

    let pool = RenderPool::new(config.workers).context("Failed to start render pool")?;

    tracing::info!(
        files = args.files.len(),
        workers = pool.size(),
        output_dir = %config.output_dir.display(),
        "starting watermark batch"
    );

    let ctx = JobContext::from_config(config);
    let jobs = args
        .files
        .iter()
        .map(|file| ctx.submit(file, args.text.as_str(), args.file_type, Some(options.clone())))
        .collect();

    let records = ctx.run_all(&pool, jobs);
    println!("{}", serde_json::to_string_pretty(&records)?);

    let failed = records
        .iter()
        .filter(|r| r.status == TaskStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} files failed", failed, records.len());
    }
    Ok(())
}
