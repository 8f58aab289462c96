//! Error types for geometry and material construction.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResourceError {
    /// Combined vertex count does not fit a 16-bit index.
    #[error("Mesh '{mesh}' has {vertices} vertices, more than 16-bit indices can address")]
    IndexOverflow { mesh: String, vertices: usize },

    /// A generator was called with parameters that describe no geometry.
    #[error("Invalid geometry parameters: {0}")]
    InvalidParameters(String),

    /// Two submeshes of one mesh share a name.
    #[error("Mesh '{mesh}' already has a submesh named '{submesh}'")]
    DuplicateSubmesh { mesh: String, submesh: String },

    /// A submesh was looked up by a name the mesh does not have.
    #[error("Mesh '{mesh}' has no submesh named '{submesh}'")]
    MissingSubmesh { mesh: String, submesh: String },
}

pub type ResourceResult<T> = Result<T, ResourceError>;

impl From<ResourceError> for shapes_core::Error {
    fn from(err: ResourceError) -> Self {
        shapes_core::Error::Resource(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_overflow_message() {
        let err = ResourceError::IndexOverflow {
            mesh: "shapeGeo".to_string(),
            vertices: 70_000,
        };
        assert!(err.to_string().contains("70000"));
    }

    #[test]
    fn test_into_core_error() {
        let err: shapes_core::Error = ResourceError::InvalidParameters("m < 2".into()).into();
        assert!(matches!(err, shapes_core::Error::Resource(_)));
    }
}
