//! Models placed in the world, and the Wavefront OBJ reader that feeds them

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::config::ConfigError;
use crate::rasterizer::{Mesh, Object3D, Pose, Texture, Vec2, Vec3};

/// Image extensions tried for `*diffuse*` textures
const TEXTURE_EXTENSIONS: [&str; 5] = ["tga", "png", "jpg", "jpeg", "bmp"];

/// A mesh with a placement in the world.
///
/// Geometry is read lazily: a model built from a path holds no mesh until
/// `load()` succeeds.
#[derive(Debug, Clone)]
pub struct Model {
    pub name: String,
    pub pose: Pose,
    /// `.obj` file or directory holding one
    source: Option<PathBuf>,
    mesh: Option<Mesh>,
    pub visible: bool,
    pub show_axes: bool,
}

impl Model {
    /// Model whose geometry will be read from `path` on `load()`
    pub fn from_path<P: Into<PathBuf>>(name: &str, path: P, pose: Pose) -> Self {
        Self {
            name: name.to_string(),
            pose,
            source: Some(path.into()),
            mesh: None,
            visible: true,
            show_axes: true,
        }
    }

    /// Model around an already built mesh; `load()` and `unload()` keep it
    pub fn from_mesh(name: &str, mesh: Mesh, pose: Pose) -> Self {
        Self {
            name: name.to_string(),
            pose,
            source: None,
            mesh: Some(mesh),
            visible: true,
            show_axes: true,
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.mesh.is_some()
    }

    /// Read the mesh and its diffuse texture, if any
    pub fn load(&mut self) -> Result<(), ConfigError> {
        let Some(source) = &self.source else {
            return Ok(());
        };
        let (obj_path, texture_path) = resolve_paths(source)?;
        let mut mesh = parse_obj(&fs::read_to_string(&obj_path)?)?;
        if let Some(texture_path) = texture_path {
            debug!("Model '{}': diffuse texture {:?}", self.name, texture_path);
            mesh = mesh.with_texture(Texture::from_file(&texture_path)?);
        }
        info!(
            "Model '{}' loaded from {:?}: {} vertices, {} triangles",
            self.name,
            obj_path,
            mesh.vertices().len(),
            mesh.faces().len()
        );
        self.mesh = Some(mesh);
        Ok(())
    }

    /// Drop file-backed geometry
    pub fn unload(&mut self) {
        if self.source.is_some() {
            self.mesh = None;
        }
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
    }

    /// Move along the local X axis
    pub fn move_x(&mut self, step: f64) {
        self.pose = self.pose * Pose::translation(step, 0.0, 0.0);
    }

    /// Move along the local Y axis
    pub fn move_y(&mut self, step: f64) {
        self.pose = self.pose * Pose::translation(0.0, step, 0.0);
    }

    /// Move along the local Z axis
    pub fn move_z(&mut self, step: f64) {
        self.pose = self.pose * Pose::translation(0.0, 0.0, step);
    }
}

impl Object3D for Model {
    fn name(&self) -> &str {
        &self.name
    }

    fn pose(&self) -> Pose {
        self.pose
    }

    fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn shows_axes(&self) -> bool {
        self.show_axes
    }
}

/// Files below `dir`, recursively, in name order
fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// OBJ file and optional diffuse texture for a model path.
///
/// A file path must name an `.obj`. A directory is searched recursively for
/// the first `.obj` and the first image whose name contains `diffuse`.
pub fn resolve_paths(path: &Path) -> Result<(PathBuf, Option<PathBuf>), ConfigError> {
    if !path.is_dir() {
        if has_extension(path, "obj") {
            return Ok((path.to_path_buf(), None));
        }
        return Err(ConfigError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{:?} is not an .obj file", path),
        )));
    }

    let mut files = Vec::new();
    walk(path, &mut files)?;
    let obj = files.iter().find(|f| has_extension(f, "obj")).cloned().ok_or_else(|| {
        ConfigError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no .obj file under {:?}", path),
        ))
    })?;
    let texture = files
        .iter()
        .find(|f| {
            let stem = f.file_stem().map(|s| s.to_string_lossy().to_lowercase()).unwrap_or_default();
            stem.contains("diffuse") && TEXTURE_EXTENSIONS.iter().any(|ext| has_extension(f, ext))
        })
        .cloned();
    Ok((obj, texture))
}

fn obj_error(line: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::ObjError { line, message: message.into() }
}

fn parse_floats<'a>(line: usize, tokens: impl Iterator<Item = &'a str>, count: usize) -> Result<Vec<f64>, ConfigError> {
    let values = tokens
        .take(count)
        .map(|t| t.parse::<f64>().map_err(|_| obj_error(line, format!("bad number '{}'", t))))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() < count {
        return Err(obj_error(line, format!("expected {} numbers, got {}", count, values.len())));
    }
    Ok(values)
}

/// 1-based or negative (relative to the end) OBJ index into a 0-based one
fn resolve_index(line: usize, token: &str, len: usize) -> Result<usize, ConfigError> {
    let i: i64 = token
        .parse()
        .map_err(|_| obj_error(line, format!("bad index '{}'", token)))?;
    let resolved = match i {
        0 => None,
        i if i > 0 => Some(i as usize - 1),
        i => (len as i64).checked_add(i).filter(|&r| r >= 0).map(|r| r as usize),
    };
    resolved.ok_or_else(|| obj_error(line, format!("index {} is out of range", i)))
}

/// Parse Wavefront OBJ text: `v`, `vt` and `f` records.
///
/// Face tokens may be `v`, `v/vt`, `v/vt/vn` or `v//vn`; normals are
/// ignored. Polygons are fan-triangulated. Texture coordinates are kept only
/// when every face has them.
pub fn parse_obj(src: &str) -> Result<Mesh, ConfigError> {
    let mut vertices = Vec::new();
    let mut uvs = Vec::new();
    let mut polygons: Vec<Vec<usize>> = Vec::new();
    let mut uv_polygons: Vec<Vec<usize>> = Vec::new();
    let mut all_faces_have_uvs = true;

    for (n, raw) in src.lines().enumerate() {
        let line = n + 1;
        let content = raw.split('#').next().unwrap_or("");
        let mut tokens = content.split_whitespace();
        match tokens.next() {
            Some("v") => {
                let v = parse_floats(line, tokens, 3)?;
                vertices.push(Vec3::new(v[0], v[1], v[2]));
            }
            Some("vt") => {
                let t = parse_floats(line, tokens, 2)?;
                uvs.push(Vec2::new(t[0], t[1]));
            }
            Some("f") => {
                let mut poly = Vec::new();
                let mut uv_poly = Vec::new();
                for token in tokens {
                    let mut parts = token.split('/');
                    let v = parts.next().unwrap_or("");
                    poly.push(resolve_index(line, v, vertices.len())?);
                    match parts.next() {
                        Some(t) if !t.is_empty() => uv_poly.push(resolve_index(line, t, uvs.len())?),
                        _ => all_faces_have_uvs = false,
                    }
                }
                if poly.len() < 3 {
                    return Err(obj_error(line, format!("face has {} vertices, need at least 3", poly.len())));
                }
                polygons.push(poly);
                uv_polygons.push(uv_poly);
            }
            _ => {}
        }
    }

    let mesh = Mesh::from_polygons(vertices, &polygons)?;
    if uvs.is_empty() || polygons.is_empty() {
        return Ok(mesh);
    }
    if !all_faces_have_uvs {
        warn!("OBJ has texture coordinates on some faces only, ignoring them");
        return Ok(mesh);
    }
    Ok(mesh.with_uv_polygons(uvs, &uv_polygons)?)
}
