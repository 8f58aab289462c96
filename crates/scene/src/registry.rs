//! Scene object registry.
//!
//! The registry owns every mesh, material and render item of the scene and
//! hands out small integer handles. Each render item and material carries a
//! [`DirtyCounter`] that counts how many frame resources still hold a stale
//! copy of its constants.
//!
//! # Example
//!
//! ```
//! use glam::Mat4;
//! use shapes_resources::geometry::create_box;
//! use shapes_resources::{Material, MeshGeometry};
//! use shapes_rhi::PrimitiveTopology;
//! use shapes_scene::SceneRegistry;
//!
//! let mut registry = SceneRegistry::new(3);
//! let mut geo = MeshGeometry::new("geo");
//! let submesh = geo.push_submesh("box", &create_box(1.0, 1.0, 1.0, 0)).unwrap();
//! let mesh = registry.add_mesh(geo);
//! let material = registry.add_material(Material::default());
//! let item = registry.add_render_item(
//!     "box", Mat4::IDENTITY, mesh, submesh, material, PrimitiveTopology::TriangleList,
//! );
//!
//! assert_eq!(registry.item(item).unwrap().dirty_frames(), 3);
//! ```

use std::collections::HashMap;

use glam::{Mat4, Vec4};
use shapes_resources::{Material, MeshGeometry, SubmeshGeometry};
use shapes_rhi::PrimitiveTopology;
use tracing::debug;

use crate::light::Light;

/// Counts how many frame resources still need a fresh copy of a record.
///
/// Set to the ring size on creation and on every mutation; decremented once
/// per frame tick that writes the record into the current slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirtyCounter {
    remaining: usize,
    frames: usize,
}

impl DirtyCounter {
    /// A counter that starts dirty for all `frames` slots.
    pub fn new(frames: usize) -> Self {
        Self {
            remaining: frames,
            frames,
        }
    }

    /// Every slot is stale again. Repeated marks do not accumulate.
    #[inline]
    pub fn mark(&mut self) {
        self.remaining = self.frames;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.remaining > 0
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// One more slot received the current value.
    #[inline]
    pub fn consume(&mut self) {
        debug_assert!(self.remaining > 0, "dirty counter underflow");
        self.remaining = self.remaining.saturating_sub(1);
    }
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Position in creation order, which is also the constant-buffer index.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Handle to a mesh owned by a [`SceneRegistry`].
    MeshId
);
handle!(
    /// Handle to a material owned by a [`SceneRegistry`].
    MaterialId
);
handle!(
    /// Handle to a render item owned by a [`SceneRegistry`].
    RenderItemId
);

/// One drawable instance of a submesh.
#[derive(Clone, Debug)]
pub struct RenderItem {
    world: Mat4,
    tex_transform: Mat4,
    dirty: DirtyCounter,
    object_index: usize,
    material: MaterialId,
    mesh: MeshId,
    submesh: SubmeshGeometry,
    topology: PrimitiveTopology,
}

impl RenderItem {
    #[inline]
    pub fn world(&self) -> Mat4 {
        self.world
    }

    #[inline]
    pub fn tex_transform(&self) -> Mat4 {
        self.tex_transform
    }

    /// Index into the per-frame object constant array.
    #[inline]
    pub fn object_index(&self) -> usize {
        self.object_index
    }

    #[inline]
    pub fn material(&self) -> MaterialId {
        self.material
    }

    #[inline]
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    #[inline]
    pub fn submesh(&self) -> &SubmeshGeometry {
        &self.submesh
    }

    #[inline]
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    /// Frame resources that have not seen the current world transform yet.
    #[inline]
    pub fn dirty_frames(&self) -> usize {
        self.dirty.remaining()
    }
}

/// A material plus its propagation state.
#[derive(Clone, Debug)]
pub struct SceneMaterial {
    material: Material,
    dirty: DirtyCounter,
    cb_index: usize,
}

impl SceneMaterial {
    #[inline]
    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Index into the per-frame material constant array.
    #[inline]
    pub fn cb_index(&self) -> usize {
        self.cb_index
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    #[inline]
    pub fn dirty_frames(&self) -> usize {
        self.dirty.remaining()
    }
}

/// Name lookup for tooling and tests. The frame loop only uses handles.
#[derive(Debug, Default)]
struct NameTable {
    items: HashMap<String, RenderItemId>,
    materials: HashMap<String, MaterialId>,
}

/// Owner of everything the frame loop draws.
#[derive(Debug)]
pub struct SceneRegistry {
    frame_count: usize,
    meshes: Vec<MeshGeometry>,
    materials: Vec<SceneMaterial>,
    items: Vec<RenderItem>,
    lights: Vec<Light>,
    ambient_light: Vec4,
    names: NameTable,
}

impl SceneRegistry {
    /// Empty registry for a ring of `frame_count` frame resources.
    pub fn new(frame_count: usize) -> Self {
        debug_assert!(frame_count > 0, "frame ring must have at least one slot");
        Self {
            frame_count,
            meshes: Vec::new(),
            materials: Vec::new(),
            items: Vec::new(),
            lights: Vec::new(),
            ambient_light: Vec4::new(0.25, 0.25, 0.35, 1.0),
            names: NameTable::default(),
        }
    }

    pub fn add_mesh(&mut self, mesh: MeshGeometry) -> MeshId {
        let id = MeshId(self.meshes.len() as u32);
        debug!(
            "Registered mesh '{}' ({} vertices, {} indices) as {:?}",
            mesh.name(),
            mesh.vertices().len(),
            mesh.indices().len(),
            id
        );
        self.meshes.push(mesh);
        id
    }

    /// Registers `material` at the next material constant index.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = MaterialId(self.materials.len() as u32);
        self.names.materials.insert(material.name.clone(), id);
        debug!("Registered material '{}' as {:?}", material.name, id);
        self.materials.push(SceneMaterial {
            material,
            dirty: DirtyCounter::new(self.frame_count),
            cb_index: id.index(),
        });
        id
    }

    /// Registers a render item at the next object constant index.
    ///
    /// The item starts dirty so every frame resource receives it.
    pub fn add_render_item(
        &mut self,
        name: impl Into<String>,
        world: Mat4,
        mesh: MeshId,
        submesh: SubmeshGeometry,
        material: MaterialId,
        topology: PrimitiveTopology,
    ) -> RenderItemId {
        debug_assert!(mesh.index() < self.meshes.len(), "unknown mesh {:?}", mesh);
        debug_assert!(
            material.index() < self.materials.len(),
            "unknown material {:?}",
            material
        );

        let id = RenderItemId(self.items.len() as u32);
        let name = name.into();
        debug!("Registered render item '{}' as {:?}", name, id);
        self.names.items.insert(name, id);
        self.items.push(RenderItem {
            world,
            tex_transform: Mat4::IDENTITY,
            dirty: DirtyCounter::new(self.frame_count),
            object_index: id.index(),
            material,
            mesh,
            submesh,
            topology,
        });
        id
    }

    /// Replaces an item's world transform and marks it dirty in every slot.
    pub fn set_world(&mut self, id: RenderItemId, world: Mat4) {
        let item = self.items.get_mut(id.index());
        debug_assert!(item.is_some(), "unknown render item {:?}", id);
        if let Some(item) = item {
            item.world = world;
            item.dirty.mark();
        }
    }

    pub fn set_tex_transform(&mut self, id: RenderItemId, tex_transform: Mat4) {
        let item = self.items.get_mut(id.index());
        debug_assert!(item.is_some(), "unknown render item {:?}", id);
        if let Some(item) = item {
            item.tex_transform = tex_transform;
            item.dirty.mark();
        }
    }

    /// Edits a material in place and marks it dirty in every slot.
    pub fn update_material(&mut self, id: MaterialId, edit: impl FnOnce(&mut Material)) {
        let entry = self.materials.get_mut(id.index());
        debug_assert!(entry.is_some(), "unknown material {:?}", id);
        if let Some(entry) = entry {
            edit(&mut entry.material);
            entry.dirty.mark();
        }
    }

    pub fn item(&self, id: RenderItemId) -> Option<&RenderItem> {
        self.items.get(id.index())
    }

    /// Render items in insertion order.
    pub fn items(&self) -> &[RenderItem] {
        &self.items
    }

    /// Hands every dirty render item to `write`, in insertion order, and
    /// consumes one count for each write that succeeds.
    ///
    /// This is the only way a counter goes down, so it must run exactly once
    /// per frame tick against that tick's frame resource. Returns how many
    /// items were written; stops at the first error, leaving that item dirty.
    pub fn write_dirty_items<E>(
        &mut self,
        mut write: impl FnMut(&RenderItem) -> Result<(), E>,
    ) -> Result<usize, E> {
        let mut written = 0;
        for item in self.items.iter_mut().filter(|item| item.is_dirty()) {
            write(item)?;
            item.dirty.consume();
            written += 1;
        }
        Ok(written)
    }

    pub fn material(&self, id: MaterialId) -> Option<&SceneMaterial> {
        self.materials.get(id.index())
    }

    pub fn materials(&self) -> &[SceneMaterial] {
        &self.materials
    }

    /// Material counterpart of [`SceneRegistry::write_dirty_items`].
    pub fn write_dirty_materials<E>(
        &mut self,
        mut write: impl FnMut(&SceneMaterial) -> Result<(), E>,
    ) -> Result<usize, E> {
        let mut written = 0;
        for entry in self.materials.iter_mut().filter(|entry| entry.is_dirty()) {
            write(entry)?;
            entry.dirty.consume();
            written += 1;
        }
        Ok(written)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&MeshGeometry> {
        self.meshes.get(id.index())
    }

    pub fn meshes(&self) -> impl Iterator<Item = (MeshId, &MeshGeometry)> {
        self.meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| (MeshId(i as u32), mesh))
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Replaces the light list. Lights are static scene data and not dirty-tracked.
    pub fn set_lights(&mut self, lights: Vec<Light>) {
        self.lights = lights;
    }

    #[inline]
    pub fn ambient_light(&self) -> Vec4 {
        self.ambient_light
    }

    pub fn set_ambient_light(&mut self, ambient: Vec4) {
        self.ambient_light = ambient;
    }

    #[inline]
    pub fn object_count(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Ring size the dirty counters were created for.
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn lookup_item(&self, name: &str) -> Option<RenderItemId> {
        self.names.items.get(name).copied()
    }

    pub fn lookup_material(&self, name: &str) -> Option<MaterialId> {
        self.names.materials.get(name).copied()
    }
}
