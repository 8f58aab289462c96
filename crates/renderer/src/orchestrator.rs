//! The per-frame state machine.
//!
//! ```text
//! Idle -> SelectSlot -> WaitForSlot -> UpdateConstants
//!      -> RecordCommands -> Submit -> AdvanceFence -> Idle
//! ```
//!
//! One [`FrameOrchestrator::tick`] walks the whole cycle once. `WaitForSlot`
//! is the only state that can block, which bounds the CPU lead over the GPU
//! to the ring size.

use shapes_core::AppConfig;
use shapes_rhi::{Backend, Command, FillMode, GeometryId, RhiResult};
use shapes_scene::{OrbitCamera, SceneRegistry};
use tracing::{debug, error, info, trace};

use crate::constants::{PassConstants, PassInputs};
use crate::frame_pool::FrameResourcePool;
use crate::submission::{FrameConstants, PassTarget, record_shapes_pass};
use crate::update::{update_material_constants, update_object_constants, update_pass_constants};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FrameState {
    #[default]
    Idle,
    SelectSlot,
    WaitForSlot,
    UpdateConstants,
    RecordCommands,
    Submit,
    AdvanceFence,
}

impl FrameState {
    /// The only legal successor.
    pub fn next(self) -> Self {
        match self {
            FrameState::Idle => FrameState::SelectSlot,
            FrameState::SelectSlot => FrameState::WaitForSlot,
            FrameState::WaitForSlot => FrameState::UpdateConstants,
            FrameState::UpdateConstants => FrameState::RecordCommands,
            FrameState::RecordCommands => FrameState::Submit,
            FrameState::Submit => FrameState::AdvanceFence,
            FrameState::AdvanceFence => FrameState::Idle,
        }
    }
}

/// Per-tick input from the platform layer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Draw with the wireframe pipeline this tick.
    pub wireframe: bool,
    pub total_time: f32,
    pub delta_time: f32,
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Ticks completed before this one.
    pub frame: u64,
    pub slot: usize,
    /// Checkpoint given to the slot.
    pub fence_value: u64,
    pub objects_written: usize,
    pub materials_written: usize,
    pub draws: usize,
    /// Whether `WaitForSlot` had to wait on the fence.
    pub blocked: bool,
}

/// Drives the frame-resource ring against a backend.
///
/// Field order matters for drop: frame resources go before the backend that
/// created them.
pub struct FrameOrchestrator<B: Backend> {
    pool: FrameResourcePool<B>,
    scene: SceneRegistry,
    camera: OrbitCamera,
    geometry: Vec<GeometryId>,
    state: FrameState,
    width: u32,
    height: u32,
    clear_color: [f32; 4],
    commands: Vec<Command>,
    frames: u64,
    backend: B,
}

fn enter(state: &mut FrameState, next: FrameState) {
    debug_assert_eq!(
        state.next(),
        next,
        "illegal frame state transition {:?} -> {:?}",
        state,
        next
    );
    trace!("{:?} -> {:?}", state, next);
    *state = next;
}

impl<B: Backend> FrameOrchestrator<B> {
    /// Uploads the scene geometry and allocates one frame resource per ring slot.
    pub fn new(
        mut backend: B,
        scene: SceneRegistry,
        camera: OrbitCamera,
        config: &AppConfig,
    ) -> RhiResult<Self> {
        debug_assert_eq!(
            scene.frame_count(),
            config.frames.frame_resources,
            "dirty counters and frame ring disagree on the ring size"
        );

        let geometry = scene
            .meshes()
            .map(|(_, mesh)| backend.create_geometry(mesh.vertices(), mesh.indices()))
            .collect::<RhiResult<Vec<_>>>()?;

        let pool = FrameResourcePool::new(
            &mut backend,
            scene.frame_count(),
            scene.object_count(),
            scene.material_count(),
            config.frames.fence_timeout(),
        )?;

        info!(
            "Frame orchestrator ready: {} items, {} materials, {} frame resources",
            scene.object_count(),
            scene.material_count(),
            pool.frame_count()
        );

        Ok(Self {
            pool,
            scene,
            camera,
            geometry,
            state: FrameState::Idle,
            width: config.window.width,
            height: config.window.height,
            clear_color: config.render.clear_color,
            commands: Vec::new(),
            frames: 0,
            backend,
        })
    }

    /// Renders one frame.
    ///
    /// # Errors
    ///
    /// Any backend error is fatal; the orchestrator is left in the state
    /// that failed.
    pub fn tick(&mut self, input: &FrameInput) -> RhiResult<FrameStats> {
        enter(&mut self.state, FrameState::SelectSlot);
        let slot = self.pool.advance();

        enter(&mut self.state, FrameState::WaitForSlot);
        let blocked = self.pool.wait_until_ready(&mut self.backend)?;

        enter(&mut self.state, FrameState::UpdateConstants);
        let frame = self.pool.current_mut();
        let objects_written = update_object_constants(&mut self.scene, frame.object_cb_mut())?;
        let materials_written =
            update_material_constants(&mut self.scene, frame.material_cb_mut())?;
        let pass = PassConstants::new(
            &self.camera,
            &PassInputs {
                render_width: self.width,
                render_height: self.height,
                total_time: input.total_time,
                delta_time: input.delta_time,
                ambient_light: self.scene.ambient_light(),
                lights: self.scene.lights(),
            },
        );
        update_pass_constants(frame.pass_cb_mut(), &pass)?;

        enter(&mut self.state, FrameState::RecordCommands);
        self.backend.begin_frame()?;
        let frame = self.pool.current_mut();
        let target = PassTarget {
            width: self.width,
            height: self.height,
            clear_color: self.clear_color,
            fill_mode: FillMode::from_wireframe(input.wireframe),
        };
        record_shapes_pass(
            &self.scene,
            &self.geometry,
            &FrameConstants {
                objects: frame.object_cb(),
                materials: frame.material_cb(),
                pass: frame.pass_cb(),
            },
            &target,
            &mut self.commands,
        )?;
        self.backend.record(frame.allocator_mut(), &self.commands)?;

        enter(&mut self.state, FrameState::Submit);
        self.backend.submit(frame.allocator_mut())?;

        enter(&mut self.state, FrameState::AdvanceFence);
        let fence_value = self.pool.advance_fence(&mut self.backend)?;

        enter(&mut self.state, FrameState::Idle);

        let stats = FrameStats {
            frame: self.frames,
            slot,
            fence_value,
            objects_written,
            materials_written,
            draws: self
                .commands
                .iter()
                .filter(|c| matches!(c, Command::DrawIndexedInstanced { .. }))
                .count(),
            blocked,
        };
        self.frames += 1;

        debug!(
            "Frame {}: slot {}, fence {}, {} object(s) and {} material(s) written{}",
            stats.frame,
            stats.slot,
            stats.fence_value,
            stats.objects_written,
            stats.materials_written,
            if stats.blocked { ", waited on GPU" } else { "" }
        );
        Ok(stats)
    }

    /// Updates the render-target size and camera aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to zero dimensions");
            return;
        }
        self.width = width;
        self.height = height;
        self.camera.set_aspect(width as f32 / height as f32);
    }

    /// Blocks until every submitted frame has completed.
    pub fn drain(&mut self) -> RhiResult<()> {
        self.backend.wait_idle()?;
        self.pool.drain()
    }

    #[inline]
    pub fn state(&self) -> FrameState {
        self.state
    }

    #[inline]
    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn scene(&self) -> &SceneRegistry {
        &self.scene
    }

    /// Mutations made here reach the GPU through the dirty counters.
    pub fn scene_mut(&mut self) -> &mut SceneRegistry {
        &mut self.scene
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn pool(&self) -> &FrameResourcePool<B> {
        &self.pool
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Command list recorded by the last tick.
    pub fn last_commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn render_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl<B: Backend> Drop for FrameOrchestrator<B> {
    fn drop(&mut self) {
        match self.drain() {
            Ok(()) => info!(
                "Frame orchestrator shut down after {} frame(s)",
                self.frames
            ),
            Err(e) => error!("Failed to drain in-flight frames on shutdown: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use shapes_core::CameraConfig;
    use shapes_rhi::{QueueMode, SoftwareBackend};
    use shapes_scene::build_shapes_scene;

    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    fn orchestrator(mode: QueueMode) -> FrameOrchestrator<SoftwareBackend> {
        let mut config = AppConfig::default();
        config.frames.fence_timeout_ms = Some(TEST_TIMEOUT.as_millis() as u64);
        let scene = build_shapes_scene(config.frames.frame_resources).unwrap();
        let camera = OrbitCamera::new(&CameraConfig::default(), 4.0 / 3.0);
        FrameOrchestrator::new(SoftwareBackend::new(mode), scene, camera, &config).unwrap()
    }

    #[test]
    fn test_state_cycle() {
        let mut state = FrameState::Idle;
        let mut seen = Vec::new();
        for _ in 0..7 {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                FrameState::SelectSlot,
                FrameState::WaitForSlot,
                FrameState::UpdateConstants,
                FrameState::RecordCommands,
                FrameState::Submit,
                FrameState::AdvanceFence,
                FrameState::Idle,
            ]
        );
    }

    #[test]
    fn test_tick_returns_to_idle() {
        let mut orch = orchestrator(QueueMode::Immediate);
        let stats = orch.tick(&FrameInput::default()).unwrap();
        assert_eq!(orch.state(), FrameState::Idle);
        assert_eq!(stats.slot, 0);
        assert_eq!(stats.fence_value, 1);
        assert_eq!(stats.objects_written, 22);
        assert_eq!(stats.materials_written, 4);
        assert_eq!(stats.draws, 22);
        assert!(!stats.blocked);
    }

    #[test]
    fn test_initial_population_takes_n_ticks() {
        let mut orch = orchestrator(QueueMode::Immediate);
        let written: Vec<usize> = (0..5)
            .map(|_| orch.tick(&FrameInput::default()).unwrap().objects_written)
            .collect();
        assert_eq!(written, vec![22, 22, 22, 0, 0]);
    }

    #[test]
    fn test_resize_updates_target_and_aspect() {
        let mut orch = orchestrator(QueueMode::Immediate);
        orch.resize(1000, 500);
        assert_eq!(orch.render_size(), (1000, 500));
        assert_eq!(orch.camera().aspect(), 2.0);
        orch.resize(0, 500);
        assert_eq!(orch.render_size(), (1000, 500));
    }

    #[test]
    fn test_drop_drains_deferred_queue() {
        let mut orch = orchestrator(QueueMode::Deferred);
        let controller = orch.backend().controller();
        orch.tick(&FrameInput::default()).unwrap();
        assert_eq!(controller.pending_lists(), 1);
        drop(orch);
        assert_eq!(controller.pending_lists(), 0);
    }
}
