mod cli;

use livedash::{config, Packager};
use livedash_h264::extract_nal_units;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "livedash=trace,livedash_h264=trace,livedash_dash=trace".to_string()
        } else {
            "livedash=info,livedash_h264=info,livedash_dash=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Timestamps { file, fps } => {
            print_timestamps(&file, cli.config.as_deref(), fps)
        }
        Commands::Manifest {
            file,
            fps,
            segment_frames,
        } => print_manifest(&file, cli.config.as_deref(), fps, segment_frames),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("livedash {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_session(
    file: &Path,
    config_path: Option<&Path>,
    fps: Option<u32>,
) -> Result<(Packager, Vec<u8>)> {
    let mut config = config::load_config_or_default(config_path)?;
    if fps.is_some() {
        config.video.frame_rate = fps;
    }
    config::validate_config(&config)?;

    if !file.exists() {
        anyhow::bail!("Input file does not exist: {:?}", file);
    }
    let data =
        std::fs::read(file).with_context(|| format!("Failed to read stream: {:?}", file))?;
    tracing::info!("Read {} bytes from {:?}", data.len(), file);

    Ok((Packager::new(&config)?, data))
}

fn print_timestamps(file: &Path, config_path: Option<&Path>, fps: Option<u32>) -> Result<()> {
    let (mut packager, data) = open_session(file, config_path, fps)?;

    println!("frame\tpts\tcts");
    let mut frame = 0;
    for unit in extract_nal_units(&data) {
        match packager.push_nal(&unit.data, 0) {
            Ok(Some(timing)) => {
                println!("{}\t{}\t{}", frame, timing.pts, timing.cts);
                frame += 1;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Skipping {:?} NAL unit: {:#}", unit.nal_type, e),
        }
    }

    tracing::info!("Timed {} pictures", frame);
    Ok(())
}

fn print_manifest(
    file: &Path,
    config_path: Option<&Path>,
    fps: Option<u32>,
    segment_frames: u32,
) -> Result<()> {
    if segment_frames == 0 {
        anyhow::bail!("--segment-frames must be at least 1");
    }
    let (mut packager, data) = open_session(file, config_path, fps)?;

    let mut pending = Vec::new();
    let mut frames = 0;
    for unit in extract_nal_units(&data) {
        match packager.push_nal(&unit.data, 0) {
            Ok(Some(_)) => frames += 1,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Skipping {:?} NAL unit: {:#}", unit.nal_type, e);
                continue;
            }
        }
        pending.extend_from_slice(&START_CODE);
        pending.extend_from_slice(&unit.data);

        if frames == segment_frames {
            packager.append_video_frames(frames, std::mem::take(&mut pending))?;
            frames = 0;
        }
    }
    if frames > 0 {
        packager.append_video_frames(frames, pending)?;
    }

    let xml = packager
        .manifest()
        .generate_xml()
        .context("Failed to generate manifest")?;
    println!("{}", xml);
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            config::Config::default()
        }
    };

    println!(
        "  Manifest: {} segments per track, {} ms update period",
        config.manifest.max_segments, config.manifest.min_buffer_ms
    );
    match config.video.frame_rate {
        Some(fps) => println!("  Video: {} fps, timescale {}", fps, config.video.timescale),
        None => println!(
            "  Video: frame rate from SPS, timescale {}",
            config.video.timescale
        ),
    }
    if config.audio.enabled {
        println!(
            "  Audio: {} Hz, {} channels, {}",
            config.audio.sample_rate, config.audio.channels, config.audio.codecs
        );
    } else {
        println!("  Audio: disabled");
    }

    Ok(())
}
