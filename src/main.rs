use clap::Parser;
use std::path::PathBuf;

use screwhole::report::{ScanReport, render_text};
use screwhole::{DebugImages, HoleDetector, ScanConfig, ScanError};

#[derive(Parser)]
#[command(name = "screwhole")]
#[command(about = "Detect screw holes on a board image and classify them as filled or empty")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Enable verbose output (debug log level unless RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,

    /// Write the annotated frame to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write the cleaned binary mask to this file
    #[arg(long, value_name = "FILE")]
    mask_out: Option<PathBuf>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// JSON file overriding the default parameters
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of a text table
    #[arg(long)]
    json: bool,

    /// Run candidate generators one after another
    #[arg(long)]
    sequential: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let mut config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    if args.sequential {
        config.parallel = false;
    }

    if let Some(debug_dir) = &args.debug_out {
        DebugImages::prepare_output_dir(debug_dir)?;
    }

    log::debug!("Loading image: {:?}", args.image_path);
    let img = image::open(&args.image_path).map_err(|source| ScanError::ImageNotFound {
        path: args.image_path.clone(),
        source,
    })?;
    log::debug!("Image loaded: {}x{}", img.width(), img.height());

    let detector = HoleDetector::new(config);
    let output = match &args.debug_out {
        Some(debug_dir) => {
            let mut debug = DebugImages::new();
            let output = detector.detect_with_debug(&img, &mut debug)?;
            let saved = debug.save_to(debug_dir)?;
            log::info!("Saved {} debug images to {}", saved, debug_dir.display());
            output
        }
        None => detector.detect(&img)?,
    };

    if let Some(path) = &args.output {
        output.save_annotated(path)?;
        log::info!("Annotated image written to {}", path.display());
    }
    if let Some(path) = &args.mask_out {
        output.save_mask(path)?;
        log::info!("Cleaned mask written to {}", path.display());
    }

    if args.json {
        let image = args.image_path.to_str();
        println!("{}", ScanReport::new(&output, image).to_json()?);
    } else {
        print!("{}", render_text(&output));
    }

    Ok(())
}
