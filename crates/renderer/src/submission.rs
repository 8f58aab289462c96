//! Command-list recording for the shapes pass.
//!
//! Every draw is self-describing: it binds geometry, topology and both
//! constant addresses itself. Items are drawn in registry insertion order.

use shapes_rhi::{
    Command, ConstantBuffer, FillMode, GeometryId, ResourceState, RhiError, RhiResult,
    ScissorRect, Viewport,
};
use shapes_scene::SceneRegistry;

use crate::constants::{MaterialConstants, ObjectConstants, PassConstants};
use crate::upload_buffer::UploadBuffer;

/// Render target and pipeline selection for one pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassTarget {
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    pub fill_mode: FillMode,
}

/// The constant arrays of the frame resource being recorded.
pub struct FrameConstants<'a, B> {
    pub objects: &'a UploadBuffer<B, ObjectConstants>,
    pub materials: &'a UploadBuffer<B, MaterialConstants>,
    pub pass: &'a UploadBuffer<B, PassConstants>,
}

/// Appends one bind-and-draw sequence per render item.
///
/// `geometry` maps mesh handles (by index) to uploaded geometry. The scene is
/// fixed, so an item whose mesh or material does not resolve is a broken
/// scene, not something to draw around.
///
/// # Errors
///
/// Returns [`RhiError::InvalidHandle`] for the first unresolvable item; in
/// debug builds this asserts instead.
pub fn record_render_items<B: ConstantBuffer>(
    scene: &SceneRegistry,
    geometry: &[GeometryId],
    constants: &FrameConstants<'_, B>,
    out: &mut Vec<Command>,
) -> RhiResult<()> {
    for item in scene.items() {
        let geometry_id = geometry.get(item.mesh().index()).copied();
        debug_assert!(geometry_id.is_some(), "no geometry for {:?}", item.mesh());
        let geometry_id = geometry_id.ok_or_else(|| {
            RhiError::InvalidHandle(format!("No geometry uploaded for {:?}", item.mesh()))
        })?;

        let material = scene.material(item.material());
        debug_assert!(material.is_some(), "unknown material {:?}", item.material());
        let material = material.ok_or_else(|| {
            RhiError::InvalidHandle(format!("Unknown material {:?}", item.material()))
        })?;

        let submesh = item.submesh();
        out.extend([
            Command::BindGeometry(geometry_id),
            Command::SetTopology(item.topology()),
            Command::SetObjectConstants(constants.objects.address_of(item.object_index())),
            Command::SetMaterialConstants(constants.materials.address_of(material.cb_index())),
            Command::DrawIndexedInstanced {
                index_count: submesh.index_count,
                instance_count: 1,
                start_index: submesh.start_index,
                base_vertex: submesh.base_vertex,
                start_instance: 0,
            },
        ]);
    }
    Ok(())
}

/// Records the whole frame: transition, clear, pass setup, draws, transition back.
pub fn record_shapes_pass<B: ConstantBuffer>(
    scene: &SceneRegistry,
    geometry: &[GeometryId],
    constants: &FrameConstants<'_, B>,
    target: &PassTarget,
    out: &mut Vec<Command>,
) -> RhiResult<()> {
    out.clear();
    out.extend([
        Command::SetPipeline(target.fill_mode),
        Command::Transition {
            from: ResourceState::Present,
            to: ResourceState::RenderTarget,
        },
        Command::BeginPass {
            clear_color: target.clear_color,
            clear_depth: 1.0,
            clear_stencil: 0,
        },
        Command::SetViewport(Viewport::full(target.width, target.height)),
        Command::SetScissor(ScissorRect::full(target.width, target.height)),
        Command::SetPassConstants(constants.pass.address_of(0)),
    ]);

    record_render_items(scene, geometry, constants, out)?;

    out.extend([
        Command::EndPass,
        Command::Transition {
            from: ResourceState::RenderTarget,
            to: ResourceState::Present,
        },
    ]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapes_rhi::software::SoftwareBuffer;
    use shapes_rhi::{QueueMode, SoftwareBackend};
    use shapes_scene::build_shapes_scene;

    struct Fixture {
        objects: UploadBuffer<SoftwareBuffer, ObjectConstants>,
        materials: UploadBuffer<SoftwareBuffer, MaterialConstants>,
        pass: UploadBuffer<SoftwareBuffer, PassConstants>,
        _backend: SoftwareBackend,
    }

    fn fixture(scene: &SceneRegistry) -> Fixture {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        Fixture {
            objects: UploadBuffer::new(&mut backend, scene.object_count(), "o").unwrap(),
            materials: UploadBuffer::new(&mut backend, scene.material_count(), "m").unwrap(),
            pass: UploadBuffer::new(&mut backend, 1, "p").unwrap(),
            _backend: backend,
        }
    }

    fn target(fill_mode: FillMode) -> PassTarget {
        PassTarget {
            width: 800,
            height: 600,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            fill_mode,
        }
    }

    fn record(scene: &SceneRegistry, f: &Fixture, fill_mode: FillMode) -> Vec<Command> {
        let constants = FrameConstants {
            objects: &f.objects,
            materials: &f.materials,
            pass: &f.pass,
        };
        let mut out = Vec::new();
        record_shapes_pass(scene, &[GeometryId(0)], &constants, &target(fill_mode), &mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_pass_frame_structure() {
        let scene = build_shapes_scene(3).unwrap();
        let f = fixture(&scene);
        let commands = record(&scene, &f, FillMode::Solid);

        assert_eq!(commands[0], Command::SetPipeline(FillMode::Solid));
        assert!(matches!(commands[2], Command::BeginPass { .. }));
        assert_eq!(
            commands.last(),
            Some(&Command::Transition {
                from: ResourceState::RenderTarget,
                to: ResourceState::Present,
            })
        );
        // 6 setup + 5 per item + 2 teardown
        assert_eq!(commands.len(), 6 + 5 * 22 + 2);
    }

    #[test]
    fn test_draw_addresses_use_aligned_stride() {
        let scene = build_shapes_scene(3).unwrap();
        let f = fixture(&scene);
        let commands = record(&scene, &f, FillMode::Solid);

        let object_addresses: Vec<u64> = commands
            .iter()
            .filter_map(|c| match c {
                Command::SetObjectConstants(a) => Some(*a),
                _ => None,
            })
            .collect();
        let base = f.objects.buffer().gpu_address();
        let expected: Vec<u64> = (0..22).map(|i| base + i * 256).collect();
        assert_eq!(object_addresses, expected);

        let sphere = scene.lookup_material("sphere").unwrap();
        let last_material = commands.iter().rev().find_map(|c| match c {
            Command::SetMaterialConstants(a) => Some(*a),
            _ => None,
        });
        assert_eq!(
            last_material,
            Some(f.materials.buffer().gpu_address() + sphere.index() as u64 * 256)
        );
    }

    #[test]
    fn test_draws_follow_submeshes() {
        let scene = build_shapes_scene(3).unwrap();
        let f = fixture(&scene);
        let commands = record(&scene, &f, FillMode::Solid);

        let draws: Vec<(u32, u32, i32)> = commands
            .iter()
            .filter_map(|c| match *c {
                Command::DrawIndexedInstanced {
                    index_count,
                    start_index,
                    base_vertex,
                    instance_count,
                    ..
                } => {
                    assert_eq!(instance_count, 1);
                    Some((index_count, start_index, base_vertex))
                }
                _ => None,
            })
            .collect();

        let expected: Vec<(u32, u32, i32)> = scene
            .items()
            .iter()
            .map(|item| {
                let s = item.submesh();
                (s.index_count, s.start_index, s.base_vertex)
            })
            .collect();
        assert_eq!(draws, expected);
    }

    #[test]
    fn test_wireframe_only_changes_pipeline() {
        let scene = build_shapes_scene(3).unwrap();
        let f = fixture(&scene);
        let solid = record(&scene, &f, FillMode::Solid);
        let wire = record(&scene, &f, FillMode::Wireframe);

        assert_eq!(wire[0], Command::SetPipeline(FillMode::Wireframe));
        assert_eq!(solid[1..], wire[1..]);
    }

    fn record_without_geometry(scene: &SceneRegistry, f: &Fixture) -> RhiResult<()> {
        let constants = FrameConstants {
            objects: &f.objects,
            materials: &f.materials,
            pass: &f.pass,
        };
        let mut out = Vec::new();
        record_shapes_pass(scene, &[], &constants, &target(FillMode::Solid), &mut out)
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "no geometry for")]
    fn test_missing_geometry_asserts() {
        let scene = build_shapes_scene(3).unwrap();
        let f = fixture(&scene);
        let _ = record_without_geometry(&scene, &f);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_missing_geometry_is_an_error() {
        let scene = build_shapes_scene(3).unwrap();
        let f = fixture(&scene);
        assert!(matches!(
            record_without_geometry(&scene, &f),
            Err(RhiError::InvalidHandle(_))
        ));
    }
}
