//! Scene side of the shapes demo.
//!
//! - [`OrbitCamera`]: spherical camera orbiting the origin
//! - [`Light`]: GPU light records
//! - [`SceneRegistry`]: render items and materials with dirty counters
//! - [`build_shapes_scene`]: the fixed box, grid, column and sphere layout

pub mod camera;
pub mod light;
pub mod registry;
pub mod shapes;
pub mod transform;

pub use camera::OrbitCamera;
pub use light::{Light, MAX_LIGHTS};
pub use registry::{
    DirtyCounter, MaterialId, MeshId, RenderItem, RenderItemId, SceneMaterial, SceneRegistry,
};
pub use shapes::build_shapes_scene;
pub use transform::Transform;
