//! Packed mesh geometry with named submeshes.
//!
//! Several generated shapes are concatenated into one vertex list and one
//! 16-bit index list so the whole scene draws from a single vertex/index
//! buffer pair. Each shape keeps its own index range and base vertex.

use shapes_rhi::vertex::Vertex;
use tracing::debug;

use crate::error::{ResourceError, ResourceResult};
use crate::geometry::MeshData;

/// Vertices addressable by a 16-bit index list.
pub const MAX_PACKED_VERTICES: usize = u16::MAX as usize + 1;

/// Index range of one shape inside a [`MeshGeometry`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubmeshGeometry {
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
}

/// Vertex and index data of several shapes packed back to back.
#[derive(Clone, Debug, Default)]
pub struct MeshGeometry {
    name: String,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    submeshes: Vec<(String, SubmeshGeometry)>,
}

impl MeshGeometry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends `mesh` as the submesh `submesh_name`.
    ///
    /// Indices stay local to the shape; the submesh records the base vertex
    /// to add at draw time.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken or the packed vertex count would leave the
    /// range a 16-bit index list can address.
    pub fn push_submesh(
        &mut self,
        submesh_name: impl Into<String>,
        mesh: &MeshData,
    ) -> ResourceResult<SubmeshGeometry> {
        let submesh_name = submesh_name.into();
        if self.submesh(&submesh_name).is_some() {
            return Err(ResourceError::DuplicateSubmesh {
                mesh: self.name.clone(),
                submesh: submesh_name,
            });
        }

        let base_vertex = self.vertices.len();
        let total = base_vertex + mesh.vertices.len();
        if total > MAX_PACKED_VERTICES {
            return Err(ResourceError::IndexOverflow {
                mesh: self.name.clone(),
                vertices: total,
            });
        }

        let indices: Vec<u16> = mesh
            .indices
            .iter()
            .map(|&i| u16::try_from(i))
            .collect::<Result<_, _>>()
            .map_err(|_| ResourceError::IndexOverflow {
                mesh: self.name.clone(),
                vertices: total,
            })?;

        let submesh = SubmeshGeometry {
            index_count: indices.len() as u32,
            start_index: self.indices.len() as u32,
            base_vertex: base_vertex as i32,
        };

        self.vertices.extend(
            mesh.vertices
                .iter()
                .map(|v| Vertex::new(v.position, v.normal)),
        );
        self.indices.extend_from_slice(&indices);

        debug!(
            "Mesh '{}': submesh '{}' = {} indices at {} (base vertex {})",
            self.name, submesh_name, submesh.index_count, submesh.start_index, submesh.base_vertex
        );

        self.submeshes.push((submesh_name, submesh));
        Ok(submesh)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn submesh(&self, name: &str) -> Option<&SubmeshGeometry> {
        self.submeshes
            .iter()
            .find_map(|(n, s)| (n == name).then_some(s))
    }

    /// Like [`MeshGeometry::submesh`], but a missing name is an error.
    pub fn require_submesh(&self, name: &str) -> ResourceResult<SubmeshGeometry> {
        self.submesh(name)
            .copied()
            .ok_or_else(|| ResourceError::MissingSubmesh {
                mesh: self.name.clone(),
                submesh: name.to_string(),
            })
    }

    /// Submeshes in insertion order.
    pub fn submeshes(&self) -> impl Iterator<Item = (&str, &SubmeshGeometry)> {
        self.submeshes.iter().map(|(n, s)| (n.as_str(), s))
    }
}
