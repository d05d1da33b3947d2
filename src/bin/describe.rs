//! Scene description driver
//!
//! Loads one description (or every `.yaml` in a folder), resolves the
//! requested frames and prints them or writes one file per frame.
//!
//! Usage:
//!   cargo run --features cli --bin describe -- demo_bin_pack --frames 3
//!   cargo run --features cli --bin describe -- ./configs --setup --output out/
//!   RUST_LOG=scene_description=debug cargo run --features cli --bin describe -- demo --format json

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use serde_yaml::Value;
use tracing_subscriber::EnvFilter;

use scene_description::config::{wrap_document, ConfigLoader};
use scene_description::Description;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

/// Resolve scene descriptions frame by frame
#[derive(Parser, Debug)]
#[command(name = "describe")]
#[command(about = "Resolve scene descriptions into per-frame values")]
struct Args {
    /// Description file, name in the config directory, or folder of descriptions
    input: String,

    /// Directory searched for named descriptions (default: $SCENE_DESCRIPTION_DIR or "configs")
    #[arg(long)]
    config_dir: Option<String>,

    /// Number of frames (default: the description's num_frames)
    #[arg(long, short = 'n')]
    frames: Option<i64>,

    /// Also resolve the setup frame
    #[arg(long)]
    setup: bool,

    /// Write frames under DIR/descriptions/ instead of printing them
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "yaml")]
    format: Format,
}

#[derive(Serialize)]
struct FrameReport<'a> {
    source: String,
    frame: i64,
    seed: i64,
    passes: usize,
    description: &'a Value,
}

fn render<T: Serialize>(value: &T, format: Format) -> Result<String> {
    Ok(match format {
        Format::Yaml => serde_yaml::to_string(value)?,
        Format::Json => serde_json::to_string_pretty(value)?,
    })
}

fn emit(args: &Args, report: &FrameReport<'_>) -> Result<()> {
    let Some(output) = &args.output else {
        println!("{}", render(report, args.format)?);
        return Ok(());
    };

    let dir = output.join("descriptions");
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let name = report
        .description
        .get("output_name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| report.seed.to_string());
    let extension = match args.format {
        Format::Yaml => "yaml",
        Format::Json => "json",
    };
    let path = dir.join(format!("{name}.{extension}"));
    fs::write(&path, render(&wrap_document(report.description), args.format)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("frame {} -> {}", report.frame, path.display());
    Ok(())
}

fn describe(loader: &ConfigLoader, path: &Path, args: &Args) -> Result<()> {
    let config = loader.load(&path.to_string_lossy())?;
    let mut description = Description::build(&config)?;
    let source = path.display().to_string();

    if args.setup {
        let setup = description.resolve_setup()?;
        emit(
            args,
            &FrameReport {
                source: source.clone(),
                frame: -1,
                seed: description.seed(),
                passes: setup.passes,
                description: &setup.value,
            },
        )?;
    }

    let frames = args.frames.unwrap_or(description.num_frames());
    for frame in 0..frames {
        let scene = description.resolve_frame(frame)?;
        emit(
            args,
            &FrameReport {
                source: source.clone(),
                frame,
                seed: description.seed(),
                passes: scene.passes,
                description: &scene.value,
            },
        )?;
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();
    let loader = match &args.config_dir {
        Some(dir) => ConfigLoader::new(dir.clone()),
        None => ConfigLoader::from_env(),
    };

    for path in loader.resolve_paths(&args.input)? {
        describe(&loader, &path, &args).with_context(|| format!("Failed to describe {}", path.display()))?;
    }
    Ok(())
}
