//! Scene files
//!
//! Uses RON for human-readable scene descriptions: a table of named models
//! (paths to `.obj` files or model directories) and a table of named scenes
//! placing those models, cameras and lights.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use super::model::Model;
use super::scene::Scene;
use crate::rasterizer::{Camera, CameraConfig, Color, Light, Pose, RenderError, RenderMode, RenderSettings, Vec3};

/// Error type for scene loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    ImageError(image::ImageError),
    /// Malformed OBJ record, with its 1-based line number
    ObjError { line: usize, message: String },
    UnknownScene(String),
    UnknownModel(String),
    RenderError(RenderError),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<image::ImageError> for ConfigError {
    fn from(e: image::ImageError) -> Self {
        ConfigError::ImageError(e)
    }
}

impl From<RenderError> for ConfigError {
    fn from(e: RenderError) -> Self {
        ConfigError::RenderError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::ImageError(e) => write!(f, "Image error: {}", e),
            ConfigError::ObjError { line, message } => write!(f, "OBJ error on line {}: {}", line, message),
            ConfigError::UnknownScene(name) => write!(f, "Scene '{}' not found", name),
            ConfigError::UnknownModel(name) => write!(f, "Model '{}' not found", name),
            ConfigError::RenderError(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One placed model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Instance name, also the model name unless `model` is given
    pub name: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub pose: Pose,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub name: String,
    pub pose: Pose,
    pub direction: Vec3,
    pub color: Color,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self::from(&Light::default())
    }
}

impl From<&Light> for LightConfig {
    fn from(light: &Light) -> Self {
        Self {
            name: light.name.clone(),
            pose: light.pose,
            direction: light.direction(),
            color: light.color,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub objects: Vec<ObjectConfig>,
    pub cameras: Vec<CameraConfig>,
    /// Defaults to the first camera by name
    pub active_camera: Option<String>,
    /// Overrides `settings.mode`
    pub render_mode: Option<RenderMode>,
    pub lights: Vec<LightConfig>,
    /// Lock every camera onto this pose
    pub look_at: Option<Pose>,
    pub settings: RenderSettings,
}

/// Top level of a scene file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub models: BTreeMap<String, PathBuf>,
    pub scenes: BTreeMap<String, SceneConfig>,
}

/// Parsed scene file plus the directory its relative paths start from
#[derive(Debug, Clone)]
pub struct Config {
    pub file: SceneFile,
    pub base_dir: PathBuf,
}

/// Load a scene file from disk
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let config = load_config_from_str(&contents, base_dir)?;
    info!(
        "Loaded {:?}: {} models, {} scenes",
        path,
        config.file.models.len(),
        config.file.scenes.len()
    );
    Ok(config)
}

/// Parse a scene file from a RON string (for embedded scenes or testing)
pub fn load_config_from_str<P: Into<PathBuf>>(s: &str, base_dir: P) -> Result<Config, ConfigError> {
    let file: SceneFile = ron::from_str(s)?;
    Ok(Config { file, base_dir: base_dir.into() })
}

impl Config {
    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.file.scenes.keys().map(String::as_str)
    }

    /// Model path resolved against the scene file's directory
    pub fn model_path(&self, name: &str) -> Result<PathBuf, ConfigError> {
        let path = self
            .file
            .models
            .get(name)
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()))?;
        Ok(if path.is_absolute() { path.clone() } else { self.base_dir.join(path) })
    }

    /// Build the named scene without touching any model files
    pub fn build_scene(&self, name: &str) -> Result<Scene, ConfigError> {
        let conf = self
            .file
            .scenes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownScene(name.to_string()))?;

        let mut models = Vec::with_capacity(conf.objects.len());
        for object in &conf.objects {
            let model_name = object.model.as_deref().unwrap_or(&object.name);
            let path = self.model_path(model_name)?;
            models.push(Model::from_path(&object.name, path, object.pose));
        }

        let mut cameras = Vec::with_capacity(conf.cameras.len());
        for camera in &conf.cameras {
            cameras.push(Camera::new(camera.clone())?);
        }

        let mut lights = Vec::with_capacity(conf.lights.len());
        for light in &conf.lights {
            lights.push(Light::new(&light.name, light.pose, light.direction, light.color)?);
        }

        let mut settings = conf.settings.clone();
        if let Some(mode) = conf.render_mode {
            settings.mode = mode;
        }

        let mut scene = Scene::new(models, cameras, lights, conf.active_camera.as_deref(), settings)?;
        if conf.look_at.is_some() {
            scene.set_camera_to_look_at(conf.look_at, None)?;
        }
        Ok(scene)
    }

    /// Build the named scene and load every model it places
    pub fn load_scene(&self, name: &str) -> Result<Scene, ConfigError> {
        let mut scene = self.build_scene(name)?;
        scene.load()?;
        info!("Scene '{}' loaded", name);
        Ok(scene)
    }
}
