//! The per-tick constant update pass.
//!
//! Objects and materials are written only while their dirty counter is
//! non-zero, and only into the current frame resource. Each write consumes one
//! count, so a mutation reaches every slot of the ring over the next N ticks.
//! The pass record has no counter and is rewritten every tick.

use shapes_rhi::{ConstantBuffer, RhiResult};
use shapes_scene::SceneRegistry;
use tracing::trace;

use crate::constants::{MaterialConstants, ObjectConstants, PassConstants};
use crate::upload_buffer::UploadBuffer;

/// Writes every dirty render item into `objects`. Returns how many were written.
pub fn update_object_constants<B: ConstantBuffer>(
    scene: &mut SceneRegistry,
    objects: &mut UploadBuffer<B, ObjectConstants>,
) -> RhiResult<usize> {
    scene.write_dirty_items(|item| {
        objects.copy_data(item.object_index(), &ObjectConstants::from(item))?;
        trace!(
            "Object {} written ({} slot(s) stale before this write)",
            item.object_index(),
            item.dirty_frames()
        );
        Ok(())
    })
}

/// Writes every dirty material into `materials`. Returns how many were written.
pub fn update_material_constants<B: ConstantBuffer>(
    scene: &mut SceneRegistry,
    materials: &mut UploadBuffer<B, MaterialConstants>,
) -> RhiResult<usize> {
    scene.write_dirty_materials(|entry| {
        materials.copy_data(entry.cb_index(), &MaterialConstants::from(entry.material()))
    })
}

/// Writes the pass record.
pub fn update_pass_constants<B: ConstantBuffer>(
    pass: &mut UploadBuffer<B, PassConstants>,
    constants: &PassConstants,
) -> RhiResult<()> {
    pass.copy_data(0, constants)
}
