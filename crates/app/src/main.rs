use clap::Parser;
use control::{ControllerConfig, GearTrainController};
use gearcore::{GearEvent, GearSpec};
use log::{info, warn};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::fs;
use std::path::PathBuf;

/// Build a gear scene, run it for a few frames and print the final state
#[derive(Parser, Debug)]
#[command(name = "geartrain")]
#[command(version, about = "Spur gear train simulator", long_about = None)]
struct Cli {
    /// JSON scene file; a built-in demo scene is used when omitted
    scene: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: LevelFilter,

    /// Override the number of frames to run
    #[arg(short, long)]
    frames: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Scene {
    controller: ControllerConfig,
    input_rpm: f64,
    frames: usize,
    /// Seconds per frame
    frame_dt: f64,
    gears: Vec<SceneGear>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SceneGear {
    #[serde(default)]
    spec: GearSpec,
    position: [f64; 2],
    #[serde(default)]
    driver: bool,
}

impl SceneGear {
    fn new(teeth: u32, module: f64, x: f64, y: f64) -> Self {
        Self {
            spec: GearSpec::default().with_teeth(teeth).with_module(module),
            position: [x, y],
            driver: false,
        }
    }
}

impl Default for Scene {
    /// A three-gear chain plus one gear with a mismatched module
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            input_rpm: 30.0,
            frames: 60,
            frame_dt: 1.0 / 60.0,
            gears: vec![
                SceneGear::new(20, 2.0, 0.0, 0.0),
                SceneGear::new(30, 2.0, 50.0, 0.0),
                SceneGear::new(15, 2.0, 50.0, 45.0),
                SceneGear::new(12, 3.0, -38.0, 0.0),
            ],
        }
    }
}

fn load_scene(path: Option<&PathBuf>) -> Result<Scene, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            let scene = serde_json::from_str(&text)?;
            info!("loaded scene from {}", path.display());
            Ok(scene)
        }
        None => {
            info!("no scene file given, using the demo scene");
            Ok(Scene::default())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    TermLogger::init(
        cli.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let mut scene = load_scene(cli.scene.as_ref())?;
    if let Some(frames) = cli.frames {
        scene.frames = frames;
    }

    let mut controller = GearTrainController::new(scene.controller.clone());
    controller.subscribe(|event: &GearEvent| match serde_json::to_string(event) {
        Ok(json) => info!("event {}", json),
        Err(err) => warn!("could not encode {:?}: {}", event, err),
    });

    for gear in &scene.gears {
        let [x, y] = gear.position;
        let id = controller.add_gear(gear.spec, Point3::new(x, y, 0.0));
        if gear.driver {
            controller.set_driver(id)?;
        }
    }

    let report = controller.rebuild_connectivity()?;
    info!(
        "{} meshes, {} incompatible pairs",
        report.connected.len(),
        report.incompatible.len()
    );

    match controller.play(scene.input_rpm) {
        Ok(()) => {
            for _ in 0..scene.frames {
                controller.advance_frame(scene.frame_dt);
            }
            info!("ran {:.2} s of playback", controller.playback_time());
        }
        Err(err) => warn!("playback refused: {}", err),
    }

    let gears: Vec<_> = controller.gears().collect();
    println!("{}", serde_json::to_string_pretty(&gears)?);
    Ok(())
}
