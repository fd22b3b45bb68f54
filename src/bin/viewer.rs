//! Interactive viewer: renders the active camera of a scene every frame
//!
//! Usage: viewer [--config PATH] [--scene NAME]
//!
//! Keys:
//! - Arrows: move the active camera (forward/back, left/right)
//! - Shift + arrows: rotate the active camera
//! - PageUp / PageDown: move the active camera along its local Y axis
//! - 1-4: render mode
//! - C: next camera
//! - L: toggle look-at on the world origin
//! - S: save the color image, Z: save depth and instance images

use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use macroquad::prelude::*;
use softraster::rasterizer::{Pose, RenderMode};
use softraster::world::{load_config, save_color_png, save_depth_png, save_instances_png, Scene};
use softraster::VERSION;

const MOVE_STEP: f64 = 0.5;
const TURN_STEP: f64 = 10.0;
const IMAGE_DIR: &str = "images";

fn window_conf() -> Conf {
    Conf {
        window_title: format!("softraster viewer v{}", VERSION),
        window_width: 1280,
        window_height: 720,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn parse_args() -> (PathBuf, String) {
    let mut config = PathBuf::from("assets/scenes/default.ron");
    let mut scene = "default".to_string();
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        match (flag.as_str(), it.next()) {
            ("-c" | "--config", Some(v)) => config = PathBuf::from(v),
            ("-s" | "--scene", Some(v)) => scene = v,
            _ => warn!("Ignoring argument '{}'", flag),
        }
    }
    (config, scene)
}

fn load_scene(config: &Path, name: &str) -> Result<Scene, softraster::world::ConfigError> {
    load_config(config)?.load_scene(name)
}

fn timestamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn save_color(scene: &Scene) {
    let r = scene.renderer();
    let path = Path::new(IMAGE_DIR).join(format!("render_{}.png", timestamp()));
    let result = std::fs::create_dir_all(IMAGE_DIR)
        .map_err(image::ImageError::IoError)
        .and_then(|_| save_color_png(r.color(), r.width(), r.height(), &path));
    match result {
        Ok(()) => info!("Saved render to {:?}", path),
        Err(e) => error!("Could not save render: {}", e),
    }
}

fn save_buffers(scene: &Scene) {
    let r = scene.renderer();
    let stamp = timestamp();
    let depth = Path::new(IMAGE_DIR).join(format!("render_zbuffer_{}.png", stamp));
    let instances = Path::new(IMAGE_DIR).join(format!("render_instances_{}.png", stamp));
    let result = std::fs::create_dir_all(IMAGE_DIR)
        .map_err(image::ImageError::IoError)
        .and_then(|_| save_depth_png(r.depth(), r.width(), r.height(), &depth))
        .and_then(|_| save_instances_png(r.instances(), r.width(), r.height(), &instances));
    match result {
        Ok(()) => info!("Saved depth and instance images to {:?}", IMAGE_DIR),
        Err(e) => error!("Could not save buffers: {}", e),
    }
}

/// Apply this frame's key presses to the scene
fn handle_input(scene: &mut Scene) {
    let shift = is_key_down(KeyCode::LeftShift) || is_key_down(KeyCode::RightShift);
    let camera = scene.active_camera_mut();

    if is_key_pressed(KeyCode::Up) {
        if shift { camera.rotate(TURN_STEP, 0.0, 0.0) } else { camera.move_z(MOVE_STEP) }
    }
    if is_key_pressed(KeyCode::Down) {
        if shift { camera.rotate(-TURN_STEP, 0.0, 0.0) } else { camera.move_z(-MOVE_STEP) }
    }
    if is_key_pressed(KeyCode::Left) {
        if shift { camera.rotate(0.0, -TURN_STEP, 0.0) } else { camera.move_x(-MOVE_STEP) }
    }
    if is_key_pressed(KeyCode::Right) {
        if shift { camera.rotate(0.0, TURN_STEP, 0.0) } else { camera.move_x(MOVE_STEP) }
    }
    if is_key_pressed(KeyCode::PageUp) {
        camera.move_y(-MOVE_STEP);
    }
    if is_key_pressed(KeyCode::PageDown) {
        camera.move_y(MOVE_STEP);
    }

    let mode_keys = [KeyCode::Key1, KeyCode::Key2, KeyCode::Key3, KeyCode::Key4];
    for (i, key) in mode_keys.iter().enumerate() {
        if is_key_pressed(*key) {
            if let Some(mode) = RenderMode::from_index(i) {
                info!("Render mode: {}", mode.label());
                scene.set_mode(mode);
            }
        }
    }

    if is_key_pressed(KeyCode::C) {
        if let Err(e) = scene.cycle_camera() {
            error!("{}", e);
        }
    }
    if is_key_pressed(KeyCode::L) {
        let target = match scene.active_camera().look_at_target() {
            Some(_) => None,
            None => Some(Pose::IDENTITY),
        };
        if let Err(e) = scene.set_camera_to_look_at(target, None) {
            error!("{}", e);
        }
        info!("Look-at {}", if target.is_some() { "on" } else { "off" });
    }
    if is_key_pressed(KeyCode::S) {
        save_color(scene);
    }
    if is_key_pressed(KeyCode::Z) {
        save_buffers(scene);
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let (config, scene_name) = parse_args();
    let mut scene = match load_scene(&config, &scene_name) {
        Ok(scene) => scene,
        Err(e) => {
            error!("Could not load scene '{}' from {:?}: {}", scene_name, config, e);
            return;
        }
    };

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }
        handle_input(&mut scene);

        let start = Instant::now();
        if let Err(e) = scene.draw() {
            error!("{}", e);
            break;
        }
        let render_time = start.elapsed().as_secs_f64();

        clear_background(Color::from_rgba(30, 30, 35, 255));

        // Letterbox the frame into the window, keeping its aspect ratio
        let r = scene.renderer();
        let (fw, fh) = (r.width() as f32, r.height() as f32);
        let scale = (screen_width() / fw).min(screen_height() / fh);
        let (draw_w, draw_h) = (fw * scale, fh * scale);
        let draw_x = (screen_width() - draw_w) / 2.0;
        let draw_y = (screen_height() - draw_h) / 2.0;

        let texture = Texture2D::from_rgba8(r.width() as u16, r.height() as u16, r.color());
        texture.set_filter(FilterMode::Nearest);
        draw_texture_ex(
            &texture,
            draw_x,
            draw_y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(Vec2::new(draw_w, draw_h)),
                ..Default::default()
            },
        );

        draw_text(
            &format!(
                "{} | {} | {} | {:.3}s ({:.1} FPS)",
                scene_name,
                scene.active_camera_name(),
                r.mode().label(),
                render_time,
                1.0 / render_time.max(1e-6)
            ),
            10.0,
            20.0,
            20.0,
            Color::from_rgba(220, 220, 220, 255),
        );

        next_frame().await
    }
}
