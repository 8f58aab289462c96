//! End-to-end frame pipelining against the software backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use glam::{Mat4, Vec3, Vec4};
use shapes_core::{AppConfig, CameraConfig};
use shapes_renderer::{FrameInput, FrameOrchestrator, ObjectConstants, PassConstants};
use shapes_rhi::software::ExecutedFrame;
use shapes_rhi::{FillMode, QueueMode, SoftwareBackend};
use shapes_scene::{OrbitCamera, RenderItemId, build_shapes_scene};

const FRAME_COUNT: usize = 3;
const ITEM_COUNT: usize = 22;

fn orchestrator(mode: QueueMode) -> FrameOrchestrator<SoftwareBackend> {
    let mut config = AppConfig::default();
    config.frames.frame_resources = FRAME_COUNT;
    config.frames.fence_timeout_ms = Some(5_000);
    let scene = build_shapes_scene(FRAME_COUNT).unwrap();
    let camera = OrbitCamera::new(&CameraConfig::default(), 800.0 / 600.0);
    FrameOrchestrator::new(SoftwareBackend::new(mode), scene, camera, &config).unwrap()
}

fn tick(orch: &mut FrameOrchestrator<SoftwareBackend>, total_time: f32) -> shapes_renderer::FrameStats {
    orch.tick(&FrameInput {
        wireframe: false,
        total_time,
        delta_time: 1.0 / 60.0,
    })
    .unwrap()
}

fn box_id(orch: &FrameOrchestrator<SoftwareBackend>) -> RenderItemId {
    orch.scene().lookup_item("box").unwrap()
}

fn object_world(frame: &ExecutedFrame, draw: usize) -> Mat4 {
    let bytes = &frame.draws[draw].object_bytes[..size_of::<ObjectConstants>()];
    bytemuck::pod_read_unaligned::<ObjectConstants>(bytes).world
}

fn pass_record(frame: &ExecutedFrame) -> PassConstants {
    bytemuck::pod_read_unaligned(&frame.pass_bytes[..size_of::<PassConstants>()])
}

#[test]
fn test_mutation_reaches_every_slot() {
    let mut orch = orchestrator(QueueMode::Immediate);
    for i in 0..FRAME_COUNT {
        tick(&mut orch, i as f32);
    }

    let id = box_id(&orch);
    let moved = Mat4::from_translation(Vec3::new(3.0, 1.0, -2.0));
    orch.scene_mut().set_world(id, moved);

    let written: Vec<usize> = (0..FRAME_COUNT + 1)
        .map(|i| tick(&mut orch, i as f32).objects_written)
        .collect();
    assert_eq!(written, vec![1, 1, 1, 0]);

    for frame in orch.pool().frames() {
        assert_eq!(frame.object_cb().read(id.index()).unwrap().world, moved);
    }
    assert!(!orch.scene().item(id).unwrap().is_dirty());
}

#[test]
fn test_repeated_mutation_restarts_propagation() {
    let mut orch = orchestrator(QueueMode::Immediate);
    for i in 0..FRAME_COUNT {
        tick(&mut orch, i as f32);
    }

    let id = box_id(&orch);
    orch.scene_mut().set_world(id, Mat4::from_translation(Vec3::X));
    tick(&mut orch, 0.0);
    assert_eq!(orch.scene().item(id).unwrap().dirty_frames(), FRAME_COUNT - 1);

    let last = Mat4::from_translation(Vec3::Z);
    orch.scene_mut().set_world(id, last);
    assert_eq!(orch.scene().item(id).unwrap().dirty_frames(), FRAME_COUNT);

    let written: Vec<usize> = (0..FRAME_COUNT + 1)
        .map(|_| tick(&mut orch, 0.0).objects_written)
        .collect();
    assert_eq!(written, vec![1, 1, 1, 0]);
    for frame in orch.pool().frames() {
        assert_eq!(frame.object_cb().read(id.index()).unwrap().world, last);
    }
}

#[test]
fn test_material_edit_reaches_every_slot() {
    let mut orch = orchestrator(QueueMode::Immediate);
    for i in 0..FRAME_COUNT {
        tick(&mut orch, i as f32);
    }

    let id = orch.scene().lookup_material("sphere").unwrap();
    let albedo = Vec4::new(0.9, 0.1, 0.1, 1.0);
    orch.scene_mut().update_material(id, |m| m.diffuse_albedo = albedo);

    let written: Vec<usize> = (0..FRAME_COUNT + 1)
        .map(|i| tick(&mut orch, i as f32).materials_written)
        .collect();
    assert_eq!(written, vec![1, 1, 1, 0]);

    for frame in orch.pool().frames() {
        assert_eq!(frame.material_cb().read(id.index()).unwrap().diffuse_albedo, albedo);
    }
    assert!(!orch.scene().material(id).unwrap().is_dirty());
}

#[test]
fn test_repeated_material_edit_restarts_propagation() {
    let mut orch = orchestrator(QueueMode::Immediate);
    for i in 0..FRAME_COUNT {
        tick(&mut orch, i as f32);
    }

    let id = orch.scene().lookup_material("grid").unwrap();
    orch.scene_mut().update_material(id, |m| m.roughness = 0.5);
    tick(&mut orch, 0.0);
    assert_eq!(orch.scene().material(id).unwrap().dirty_frames(), FRAME_COUNT - 1);

    orch.scene_mut().update_material(id, |m| m.roughness = 0.75);
    assert_eq!(orch.scene().material(id).unwrap().dirty_frames(), FRAME_COUNT);

    let written: Vec<usize> = (0..FRAME_COUNT + 1)
        .map(|_| tick(&mut orch, 0.0).materials_written)
        .collect();
    assert_eq!(written, vec![1, 1, 1, 0]);
    for frame in orch.pool().frames() {
        assert_eq!(frame.material_cb().read(id.index()).unwrap().roughness, 0.75);
    }
}

#[test]
fn test_counters_stay_within_ring_size() {
    let mut orch = orchestrator(QueueMode::Immediate);
    for i in 0..10 {
        for item in orch.scene().items() {
            assert!(item.dirty_frames() <= FRAME_COUNT);
        }
        for material in orch.scene().materials() {
            assert!(material.dirty_frames() <= FRAME_COUNT);
        }
        if i % 4 == 0 {
            let id = box_id(&orch);
            orch.scene_mut().set_world(id, Mat4::from_scale(Vec3::splat(i as f32 + 1.0)));
        }
        tick(&mut orch, i as f32);
    }
}

#[test]
fn test_slot_reuse_waits_for_gpu() {
    let mut orch = orchestrator(QueueMode::Deferred);
    let controller = orch.backend().controller();

    // Sentinel slots never block.
    for _ in 0..FRAME_COUNT {
        assert!(!tick(&mut orch, 0.0).blocked);
    }
    assert_eq!(controller.pending_lists(), FRAME_COUNT);

    let retired = Arc::new(AtomicBool::new(false));
    let gpu = {
        let controller = controller.clone();
        let retired = Arc::clone(&retired);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            retired.store(true, Ordering::SeqCst);
            controller.retire_all();
        })
    };

    let stats = tick(&mut orch, 0.0);
    assert!(stats.blocked);
    assert!(retired.load(Ordering::SeqCst), "slot reused before the GPU finished it");
    assert_eq!(stats.slot, 0);
    assert!(orch.pool().completed_value().unwrap() >= 1);
    gpu.join().unwrap();

    orch.drain().unwrap();
    assert_eq!(controller.hazard_count(), 0);
}

#[test]
fn test_frames_in_flight_bounded_by_ring() {
    let mut orch = orchestrator(QueueMode::Threaded {
        latency: Duration::from_millis(3),
    });
    let controller = orch.backend().controller();

    for i in 0..24 {
        let stats = tick(&mut orch, i as f32 * 0.016);
        assert_eq!(stats.slot, i % FRAME_COUNT);
        assert_eq!(stats.fence_value, i as u64 + 1);
    }
    orch.drain().unwrap();

    assert!(controller.max_lists_in_flight() <= FRAME_COUNT);
    assert_eq!(controller.submitted_lists(), 24);
    assert_eq!(controller.hazard_count(), 0);
    assert_eq!(controller.invalid_draw_count(), 0);
}

#[test]
fn test_gpu_reads_the_values_written_for_its_frame() {
    let mut orch = orchestrator(QueueMode::Threaded {
        latency: Duration::from_millis(2),
    });
    let controller = orch.backend().controller();
    let id = box_id(&orch);

    // A fresh transform every tick keeps the box dirty in every slot.
    for i in 0..12 {
        let world = Mat4::from_translation(Vec3::new(0.0, i as f32, 0.0));
        orch.scene_mut().set_world(id, world);
        tick(&mut orch, i as f32);
    }
    orch.drain().unwrap();

    let executed = controller.take_executed();
    assert_eq!(executed.len(), 12);
    for (i, frame) in executed.iter().enumerate() {
        assert_eq!(object_world(frame, id.index()).w_axis.y, i as f32);
        assert_eq!(pass_record(frame).total_time, i as f32);
    }
    assert_eq!(controller.hazard_count(), 0);
}

#[test]
fn test_draw_order_matches_insertion_order() {
    let mut orch = orchestrator(QueueMode::Immediate);
    let controller = orch.backend().controller();
    tick(&mut orch, 0.0);
    tick(&mut orch, 1.0);

    let expected: Vec<(u32, u32, i32)> = orch
        .scene()
        .items()
        .iter()
        .map(|item| {
            let sub = item.submesh();
            (sub.index_count, sub.start_index, sub.base_vertex)
        })
        .collect();
    assert_eq!(expected.len(), ITEM_COUNT);

    for frame in controller.take_executed() {
        let drawn: Vec<(u32, u32, i32)> = frame
            .draws
            .iter()
            .map(|d| (d.index_count, d.start_index, d.base_vertex))
            .collect();
        assert_eq!(drawn, expected);
        assert!(frame.draws.iter().all(|d| d.instance_count == 1));
    }
    assert_eq!(controller.invalid_draw_count(), 0);
}

#[test]
fn test_object_addresses_follow_aligned_stride() {
    let mut orch = orchestrator(QueueMode::Immediate);
    let controller = orch.backend().controller();
    let stats = tick(&mut orch, 0.0);

    let objects = orch.pool().frame(stats.slot).unwrap().object_cb();
    let base = objects.address_of(0);
    let stride = objects.stride();
    assert_eq!(stride % 256, 0);

    let frame = controller.take_executed().pop().unwrap();
    for (item, draw) in orch.scene().items().iter().zip(&frame.draws) {
        assert_eq!(draw.object_address, base + item.object_index() as u64 * stride);
    }
}

#[test]
fn test_wireframe_toggle_leaves_constants_alone() {
    let mut orch = orchestrator(QueueMode::Immediate);
    let controller = orch.backend().controller();

    let solid = orch
        .tick(&FrameInput {
            wireframe: false,
            total_time: 1.0,
            delta_time: 0.1,
        })
        .unwrap();
    let dirty_after_solid: Vec<usize> =
        orch.scene().items().iter().map(|i| i.dirty_frames()).collect();

    let wire = orch
        .tick(&FrameInput {
            wireframe: true,
            total_time: 1.0,
            delta_time: 0.1,
        })
        .unwrap();
    let dirty_after_wire: Vec<usize> =
        orch.scene().items().iter().map(|i| i.dirty_frames()).collect();

    assert_eq!(solid.objects_written, wire.objects_written);
    assert_eq!(solid.draws, wire.draws);
    assert!(dirty_after_solid.iter().zip(&dirty_after_wire).all(|(a, b)| a - 1 == *b));

    let executed = controller.take_executed();
    assert_eq!(executed[0].fill_mode, Some(FillMode::Solid));
    assert_eq!(executed[1].fill_mode, Some(FillMode::Wireframe));
    assert_eq!(pass_record(&executed[0]), pass_record(&executed[1]));
    for (a, b) in executed[0].draws.iter().zip(&executed[1].draws) {
        assert_eq!(a.object_bytes, b.object_bytes);
        assert_eq!(a.material_bytes, b.material_bytes);
    }
}

#[test]
fn test_pass_constants_rewritten_every_tick() {
    let mut orch = orchestrator(QueueMode::Immediate);
    let controller = orch.backend().controller();

    for i in 0..FRAME_COUNT + 2 {
        tick(&mut orch, i as f32 * 0.5);
    }
    orch.camera_mut().rotate(glam::Vec2::new(40.0, 0.0));
    tick(&mut orch, 10.0);

    let executed = controller.take_executed();
    let times: Vec<f32> = executed.iter().map(|f| pass_record(f).total_time).collect();
    assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0, 10.0]);

    let before = pass_record(&executed[4]);
    let after = pass_record(&executed[5]);
    assert_ne!(before.view, after.view);
    assert_eq!(after.eye_pos_w, orch.camera().eye_position());
}

#[test]
fn test_frame_brackets_back_buffer_transitions() {
    use shapes_rhi::ResourceState::{Present, RenderTarget};

    let mut orch = orchestrator(QueueMode::Immediate);
    let controller = orch.backend().controller();
    tick(&mut orch, 0.0);

    let frame = controller.take_executed().pop().unwrap();
    assert_eq!(
        frame.transitions,
        vec![(Present, RenderTarget), (RenderTarget, Present)]
    );
    assert_eq!(frame.clear_color, Some(AppConfig::default().render.clear_color));
}
