//! Avatar simulator.
//!
//! Builds a small stage (a floor and a wall), creates a scene node for every
//! joint in an avatar config, and drives the config's trackers along a scripted
//! walk toward the wall. Joint poses are logged every frame and summarised at
//! the end.
//!
//! Usage: cargo run -p avatar-sim -- --config avatar-sim/configs/demo.json

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Result};
use cgmath::{Point3, Vector3};
use clap::Parser;
use vess::{Avatar, AvatarConfig, MotionModelConfig, SharedTracker, TrackerRegistry};
use vess_scene::{Geometry, IntersectMask, Scene};

#[derive(Parser)]
#[command(name = "avatar-sim")]
#[command(about = "Step an avatar config through a scripted walk")]
#[command(version)]
struct Cli {
    /// Avatar config (.json)
    #[arg(short, long)]
    config: PathBuf,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 120)]
    frames: u32,

    /// Seconds per frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,

    /// Walking speed along +x, in units per second
    #[arg(long, default_value_t = 1.5)]
    speed: f32,

    /// Distance from the start to the wall
    #[arg(long, default_value_t = 3.0)]
    wall: f32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.dt <= 0.0 {
        bail!("--dt must be positive");
    }

    let config = AvatarConfig::from_path(&cli.config)?;
    let mut scene = build_stage(&config, cli.wall)?;

    let mut registry = TrackerRegistry::new();
    let trackers: Vec<(String, SharedTracker)> = tracker_names(&config)
        .into_iter()
        .map(|name| {
            let tracker = registry.register_shared(name.clone());
            (name, tracker)
        })
        .collect();

    let mut avatar = Avatar::from_config(&config, &mut scene, &registry);
    if !avatar.is_initted() {
        for error in avatar.setup_errors() {
            eprintln!("  {}", error);
        }
        bail!("Avatar {} could not be set up", config.name);
    }

    // The scripted walk is measured from the first sample
    drive_trackers(&trackers, 0.0, cli.speed);
    avatar.reset();

    eprintln!(
        "Simulating {} for {} frames ({} trackers, {} joints)...",
        avatar.name(),
        cli.frames,
        trackers.len(),
        avatar.joints().len()
    );

    let mut failures = 0;
    for frame in 1..=cli.frames {
        let time = frame as f64 * cli.dt;
        drive_trackers(&trackers, time as f32, cli.speed);

        if let Err(e) = avatar.update(&mut scene, Some(cli.dt)) {
            log::error!("frame {}: {}", frame, e);
            failures += 1;
        }

        for (index, joint) in avatar.joints().iter().enumerate() {
            let position = joint.position();
            log::debug!(
                "frame {} {}: ({:.3}, {:.3}, {:.3})",
                frame,
                avatar.joint_name(index).unwrap_or("?"),
                position.x,
                position.y,
                position.z
            );
        }
    }

    print_summary(&avatar, &scene);
    if failures > 0 {
        bail!("{} of {} frames reported errors", failures, cli.frames);
    }
    Ok(())
}

/// Floor at z = 0 and a wall across the walking direction, with one node per joint.
fn build_stage(config: &AvatarConfig, wall: f32) -> Result<Scene> {
    let mut scene = Scene::new();

    let stage = scene.add_component(None, Some("stage"))?;
    let floor = scene.add_geometry(
        Some(stage),
        Some("floor"),
        Geometry::ground_plane(50.0, 0.0),
    )?;
    scene.set_intersect_mask(floor, IntersectMask::TERRAIN);

    let wall = scene.add_geometry(
        Some(stage),
        Some("wall"),
        Geometry::axis_box(
            Point3::new(wall, -10.0, -1.0),
            Point3::new(wall + 0.2, 10.0, 3.0),
        ),
    )?;
    scene.set_intersect_mask(wall, IntersectMask::OBSTACLE);

    let avatar_root = scene.add_component(None, Some(config.name.as_str()))?;
    for joint in &config.joints {
        if scene.find_node_by_name(&joint.node).is_none() {
            scene.add_component(Some(avatar_root), Some(joint.node.as_str()))?;
        }
    }

    Ok(scene)
}

/// Every tracker the config's motion models refer to.
fn tracker_names(config: &AvatarConfig) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for model in &config.models {
        match model {
            MotionModelConfig::Tracked(c) => {
                names.insert(c.tracker.clone());
            }
            MotionModelConfig::Head(c) => {
                names.insert(c.back_tracker.clone());
                names.insert(c.head_tracker.clone());
            }
            MotionModelConfig::ThreeTrackerArm(c) => {
                names.insert(c.back_tracker.clone());
                names.insert(c.elbow_tracker.clone());
                names.insert(c.hand_tracker.clone());
            }
        }
    }
    names
}

/// Moves every tracker along a walk in +x.
///
/// Trackers hang below each other in name order, 0.3 apart, and sway sideways
/// more the further down they hang.
fn drive_trackers(trackers: &[(String, SharedTracker)], time: f32, speed: f32) {
    for (rank, (_, tracker)) in trackers.iter().enumerate() {
        let depth = rank as f32;
        let sway = 0.1 * depth * (time * 3.0).sin();
        tracker.set_position(Vector3::new(speed * time, sway, 1.5 - 0.3 * depth));
    }
}

fn print_summary(avatar: &Avatar, scene: &Scene) {
    eprintln!("Final joint positions (world):");
    for (index, joint) in avatar.joints().iter().enumerate() {
        let name = avatar.joint_name(index).unwrap_or("?");
        match scene.global_transform(joint.node()) {
            Some(world) => eprintln!(
                "  {:<10} ({:>7.3}, {:>7.3}, {:>7.3})",
                name, world.w.x, world.w.y, world.w.z
            ),
            None => eprintln!("  {:<10} (node missing)", name),
        }
    }
}
