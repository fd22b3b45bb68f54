//! Triangle meshes and the drawable-object seam between the world and the renderer

use super::error::RenderError;
use super::math::{Vec2, Vec3};
use super::pose::Pose;
use super::types::Texture;

/// Validated triangle mesh in object space.
///
/// Fields are private so every face index the renderer sees has been checked
/// against the vertex and texture-coordinate arrays.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    vertices: Vec<Vec3>,
    uvs: Vec<Vec2>,
    faces: Vec<[usize; 3]>,
    /// Empty, or one texture-coordinate triple per face
    uv_faces: Vec<[usize; 3]>,
    texture: Option<Texture>,
}

fn check_indices(faces: &[[usize; 3]], len: usize) -> Result<(), RenderError> {
    for &index in faces.iter().flatten() {
        if index >= len {
            return Err(RenderError::IndexOutOfRange { index, len });
        }
    }
    Ok(())
}

/// Split polygons into triangle fans
fn triangulate(polygons: &[Vec<usize>]) -> Result<Vec<[usize; 3]>, RenderError> {
    let mut out = Vec::with_capacity(polygons.len());
    for (i, poly) in polygons.iter().enumerate() {
        if poly.len() < 3 {
            return Err(RenderError::InvalidMesh(format!(
                "face {} has {} indices, need at least 3",
                i,
                poly.len()
            )));
        }
        for k in 1..poly.len() - 1 {
            out.push([poly[0], poly[k], poly[k + 1]]);
        }
    }
    Ok(out)
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[usize; 3]>) -> Result<Self, RenderError> {
        check_indices(&faces, vertices.len())?;
        Ok(Self {
            vertices,
            faces,
            ..Default::default()
        })
    }

    /// Build from polygons of 3 or more vertex indices, fan-triangulating the larger ones
    pub fn from_polygons(vertices: Vec<Vec3>, polygons: &[Vec<usize>]) -> Result<Self, RenderError> {
        Self::new(vertices, triangulate(polygons)?)
    }

    /// Attach texture coordinates, one polygon per vertex polygon
    pub fn with_uv_polygons(self, uvs: Vec<Vec2>, polygons: &[Vec<usize>]) -> Result<Self, RenderError> {
        let uv_faces = triangulate(polygons)?;
        self.with_uvs(uvs, uv_faces)
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>, uv_faces: Vec<[usize; 3]>) -> Result<Self, RenderError> {
        if uv_faces.len() != self.faces.len() {
            return Err(RenderError::InvalidMesh(format!(
                "{} texture faces for {} faces",
                uv_faces.len(),
                self.faces.len()
            )));
        }
        check_indices(&uv_faces, uvs.len())?;
        self.uvs = uvs;
        self.uv_faces = uv_faces;
        Ok(self)
    }

    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    /// Texture coordinates of face `i`, if the mesh has them
    pub fn face_uvs(&self, i: usize) -> Option<[Vec2; 3]> {
        let f = self.uv_faces.get(i)?;
        Some([self.uvs[f[0]], self.uvs[f[1]], self.uvs[f[2]]])
    }
}

/// Anything the renderer can place in the world and draw
pub trait Object3D {
    fn name(&self) -> &str;

    fn pose(&self) -> Pose;

    /// None until the geometry is loaded
    fn mesh(&self) -> Option<&Mesh>;

    fn is_visible(&self) -> bool;

    fn shows_axes(&self) -> bool {
        true
    }

    /// Mesh vertices with the object's pose applied
    fn world_vertices(&self) -> Vec<Vec3> {
        let m = self.pose().to_matrix();
        self.mesh()
            .map(|mesh| mesh.vertices().iter().map(|&v| m.transform_point(v)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn test_out_of_range_face() {
        let err = Mesh::new(quad(), vec![[0, 1, 4]]).unwrap_err();
        assert_eq!(err, RenderError::IndexOutOfRange { index: 4, len: 4 });
    }

    #[test]
    fn test_fan_triangulation() {
        let mesh = Mesh::from_polygons(quad(), &[vec![0, 1, 2, 3]]).unwrap();
        assert_eq!(mesh.faces(), &[[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_short_polygon_rejected() {
        let err = Mesh::from_polygons(quad(), &[vec![0, 1]]).unwrap_err();
        assert!(matches!(err, RenderError::InvalidMesh(_)));
    }

    #[test]
    fn test_uvs_must_match_faces() {
        let mesh = Mesh::new(quad(), vec![[0, 1, 2]]).unwrap();
        let uvs = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0)];
        assert!(mesh.clone().with_uvs(uvs.clone(), vec![]).is_err());
        let mesh = mesh.with_uvs(uvs, vec![[0, 1, 2]]).unwrap();
        assert_eq!(mesh.face_uvs(0).unwrap()[2], Vec2::new(1.0, 1.0));
        assert!(mesh.face_uvs(1).is_none());
    }
}
