//! Scene: the models, cameras and lights of one frame, and the renderer drawing them

use std::collections::BTreeMap;

use log::{info, warn};

use super::config::ConfigError;
use super::model::Model;
use crate::rasterizer::{
    Camera, CameraConfig, Light, Object3D, Pose, RenderError, RenderMode, RenderSettings, Renderer,
};

/// Models, cameras and lights with exactly one active camera.
///
/// The renderer is always sized to the active camera's resolution.
pub struct Scene {
    models: BTreeMap<String, Model>,
    cameras: BTreeMap<String, Camera>,
    lights: Vec<Light>,
    active_camera: String,
    renderer: Renderer,
    loaded: bool,
}

impl Scene {
    /// Assemble a scene. With no cameras a `default` one is created; with no
    /// active camera named, the first camera by name is used.
    pub fn new(
        models: Vec<Model>,
        cameras: Vec<Camera>,
        lights: Vec<Light>,
        active_camera: Option<&str>,
        settings: RenderSettings,
    ) -> Result<Self, RenderError> {
        let models: BTreeMap<String, Model> = models.into_iter().map(|m| (m.name.clone(), m)).collect();
        let mut cameras: BTreeMap<String, Camera> = cameras.into_iter().map(|c| (c.name.clone(), c)).collect();
        if cameras.is_empty() {
            let camera = Camera::new(CameraConfig::default())?;
            cameras.insert(camera.name.clone(), camera);
        }

        let active = match active_camera {
            Some(name) => name.to_string(),
            None => cameras.keys().next().cloned().unwrap_or_default(),
        };
        if !cameras.contains_key(&active) {
            return Err(RenderError::UnknownCamera(active));
        }

        let (w, h) = cameras[&active].resolution();
        let mut scene = Self {
            models,
            cameras,
            lights,
            active_camera: active.clone(),
            renderer: Renderer::new(w, h, settings),
            loaded: false,
        };
        scene.set_active_camera(&active)?;
        Ok(scene)
    }

    /// Read every model's geometry and size the renderer to the active camera
    pub fn load(&mut self) -> Result<(), ConfigError> {
        for model in self.models.values_mut() {
            model.load()?;
        }
        let (w, h) = self.active_camera().resolution();
        self.renderer.resize(w, h);
        self.loaded = true;
        Ok(())
    }

    pub fn unload(&mut self) {
        for model in self.models.values_mut() {
            model.unload();
        }
        self.loaded = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Switch cameras: the new one is hidden from its own view, the old one
    /// shown again, and the buffers resized
    pub fn set_active_camera(&mut self, name: &str) -> Result<(), RenderError> {
        if !self.cameras.contains_key(name) {
            return Err(RenderError::UnknownCamera(name.to_string()));
        }
        if let Some(previous) = self.cameras.get_mut(&self.active_camera) {
            previous.visible = true;
            previous.show_axes = true;
        }
        self.active_camera = name.to_string();
        let camera = self.active_camera_mut();
        camera.visible = false;
        camera.show_axes = false;
        let (w, h) = camera.resolution();
        self.renderer.resize(w, h);
        info!("Active camera: '{}' ({}x{})", name, w, h);
        Ok(())
    }

    /// Make the camera after the active one (by name, wrapping) active
    pub fn cycle_camera(&mut self) -> Result<(), RenderError> {
        let next = self
            .cameras
            .keys()
            .skip_while(|k| **k != self.active_camera)
            .nth(1)
            .or_else(|| self.cameras.keys().next())
            .cloned()
            .unwrap_or_default();
        self.set_active_camera(&next)
    }

    pub fn active_camera_name(&self) -> &str {
        &self.active_camera
    }

    pub fn active_camera(&self) -> &Camera {
        &self.cameras[&self.active_camera]
    }

    pub fn active_camera_mut(&mut self) -> &mut Camera {
        self.cameras
            .get_mut(&self.active_camera)
            .unwrap_or_else(|| unreachable!("active camera is always present"))
    }

    pub fn camera(&self, name: &str) -> Option<&Camera> {
        self.cameras.get(name)
    }

    pub fn camera_mut(&mut self, name: &str) -> Option<&mut Camera> {
        self.cameras.get_mut(name)
    }

    pub fn camera_names(&self) -> Vec<&str> {
        self.cameras.keys().map(String::as_str).collect()
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    pub fn model_mut(&mut self, name: &str) -> Option<&mut Model> {
        self.models.get_mut(name)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Lock one camera (or all of them when `camera` is None) onto `target`,
    /// or release the lock with None
    pub fn set_camera_to_look_at(&mut self, target: Option<Pose>, camera: Option<&str>) -> Result<(), RenderError> {
        match camera {
            Some(name) => self
                .cameras
                .get_mut(name)
                .ok_or_else(|| RenderError::UnknownCamera(name.to_string()))?
                .set_look_at(target),
            None => self.cameras.values_mut().for_each(|c| c.set_look_at(target)),
        }
        Ok(())
    }

    pub fn set_mode(&mut self, mode: RenderMode) {
        self.renderer.set_mode(mode);
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Clear and redraw everything through the active camera.
    ///
    /// Draw order, and so instance ids, is models by name then cameras by
    /// name. Only the first light is used.
    pub fn draw(&mut self) -> Result<&[u8], RenderError> {
        if !self.loaded {
            return Err(RenderError::SceneNotLoaded);
        }
        if self.lights.len() > 1 {
            warn!("Scene has {} lights, only the first is used", self.lights.len());
        }
        let objects: Vec<&dyn Object3D> = self
            .models
            .values()
            .map(|m| m as &dyn Object3D)
            .chain(self.cameras.values().map(|c| c as &dyn Object3D))
            .collect();
        let camera = &self.cameras[&self.active_camera];

        self.renderer.clear();
        Ok(self.renderer.draw(&objects, camera, self.lights.first()))
    }

    /// Color buffer of the last frame
    pub fn current_render(&self) -> &[u8] {
        self.renderer.color()
    }
}
