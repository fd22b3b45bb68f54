//! softraster: render one frame of a scene to PNG files
//!
//! Usage: softraster [--config PATH] [--scene NAME] [--mode MODE] [--out DIR]
//!
//! Writes render.png, depth.png and instances.png into the output directory.
//! Verbosity is controlled with RUST_LOG.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use log::{error, info};
use softraster::rasterizer::RenderMode;
use softraster::world::{load_config, save_frame};
use softraster::VERSION;

struct Args {
    config: PathBuf,
    scene: String,
    mode: Option<RenderMode>,
    out: PathBuf,
}

fn usage() -> String {
    let modes: Vec<&str> = RenderMode::ALL.iter().map(|m| m.label()).collect();
    format!(
        "softraster v{}\n\nUsage: softraster [--config PATH] [--scene NAME] [--mode MODE] [--out DIR]\n\nModes: {}",
        VERSION,
        modes.join(", ")
    )
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        config: PathBuf::from("assets/scenes/default.ron"),
        scene: "default".to_string(),
        mode: None,
        out: PathBuf::from("images"),
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        if flag == "-h" || flag == "--help" {
            return Ok(None);
        }
        let value = it.next().ok_or_else(|| format!("{} needs a value", flag))?;
        match flag.as_str() {
            "-c" | "--config" => args.config = PathBuf::from(value),
            "-s" | "--scene" => args.scene = value,
            "-m" | "--mode" => {
                let mode = RenderMode::from_label(&value).ok_or_else(|| format!("unknown render mode '{}'", value))?;
                args.mode = Some(mode);
            }
            "-o" | "--out" => args.out = PathBuf::from(value),
            _ => return Err(format!("unknown argument '{}'", flag)),
        }
    }
    Ok(Some(args))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.config)?;
    let mut scene = config.load_scene(&args.scene)?;
    if let Some(mode) = args.mode {
        scene.set_mode(mode);
    }

    let start = Instant::now();
    scene.draw()?;
    info!(
        "Rendered '{}' through '{}' in {:.3}s ({})",
        args.scene,
        scene.active_camera_name(),
        start.elapsed().as_secs_f64(),
        scene.renderer().mode().label()
    );

    save_frame(scene.renderer(), &args.out)?;
    info!("Images written to {:?}", args.out);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", usage());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, usage());
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
