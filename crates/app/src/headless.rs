//! Windowless run on the software backend.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use shapes_core::{AppConfig, GameTimer};
use shapes_renderer::{FrameInput, FrameOrchestrator};
use shapes_rhi::{QueueMode, SoftwareBackend};
use shapes_scene::{OrbitCamera, build_shapes_scene};
use tracing::info;

/// Simulated GPU execution time per command list.
const GPU_LATENCY: Duration = Duration::from_millis(4);

/// Totals reported after a headless run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub blocked_frames: u64,
    pub submitted_lists: u64,
    pub max_lists_in_flight: usize,
    pub hazards: u64,
    pub invalid_draws: u64,
}

/// Renders `frames` ticks and fails if the simulated GPU saw a race.
pub fn run(config: &AppConfig, frames: u64, wireframe: bool) -> Result<HeadlessSummary> {
    run_with_queue(
        config,
        frames,
        wireframe,
        QueueMode::Threaded {
            latency: GPU_LATENCY,
        },
    )
}

fn run_with_queue(
    config: &AppConfig,
    frames: u64,
    wireframe: bool,
    mode: QueueMode,
) -> Result<HeadlessSummary> {
    let backend = SoftwareBackend::new(mode);
    let controller = backend.controller();

    let scene = build_shapes_scene(config.frames.frame_resources)
        .context("Failed to build the shapes scene")?;
    let aspect = config.window.width as f32 / config.window.height as f32;
    let camera = OrbitCamera::new(&config.camera, aspect);
    let mut orchestrator = FrameOrchestrator::new(backend, scene, camera, config)
        .context("Failed to create frame orchestrator")?;

    info!(
        "Headless run: {} frame(s), {} frame resources, {:?}",
        frames, config.frames.frame_resources, mode
    );

    let mut timer = GameTimer::new();
    let mut summary = HeadlessSummary {
        frames,
        ..Default::default()
    };
    for _ in 0..frames {
        timer.tick();
        let stats = orchestrator.tick(&FrameInput {
            wireframe,
            total_time: timer.total_time(),
            delta_time: timer.delta_time(),
        })?;
        if stats.blocked {
            summary.blocked_frames += 1;
        }
        info!(
            "Frame {}: slot {} fence {} objects {} materials {} draws {}{}",
            stats.frame,
            stats.slot,
            stats.fence_value,
            stats.objects_written,
            stats.materials_written,
            stats.draws,
            if stats.blocked { " (waited)" } else { "" }
        );
    }
    orchestrator.drain()?;

    summary.submitted_lists = controller.submitted_lists();
    summary.max_lists_in_flight = controller.max_lists_in_flight();
    summary.hazards = controller.hazard_count();
    summary.invalid_draws = controller.invalid_draw_count();

    info!(
        "Headless summary: {} list(s) submitted, at most {} in flight, {} blocked frame(s), {} hazard(s), {} invalid draw(s)",
        summary.submitted_lists,
        summary.max_lists_in_flight,
        summary.blocked_frames,
        summary.hazards,
        summary.invalid_draws
    );

    if summary.hazards > 0 {
        bail!(
            "{} CPU write(s) raced with in-flight GPU reads",
            summary.hazards
        );
    }
    if summary.invalid_draws > 0 {
        bail!("{} draw(s) fell outside the bound geometry", summary.invalid_draws);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_run_is_race_free() {
        let config = AppConfig::default();
        let summary = run_with_queue(
            &config,
            12,
            false,
            QueueMode::Threaded {
                latency: Duration::from_millis(1),
            },
        )
        .unwrap();
        assert_eq!(summary.submitted_lists, 12);
        assert!(summary.max_lists_in_flight <= config.frames.frame_resources);
        assert_eq!(summary.hazards, 0);
    }

    #[test]
    fn test_single_frame_resource_serializes() {
        let mut config = AppConfig::default();
        config.frames.frame_resources = 1;
        let summary = run_with_queue(
            &config,
            4,
            true,
            QueueMode::Threaded {
                latency: Duration::from_millis(1),
            },
        )
        .unwrap();
        assert_eq!(summary.max_lists_in_flight, 1);
        assert_eq!(summary.hazards, 0);
    }

    #[test]
    fn test_zero_frames() {
        let summary =
            run_with_queue(&AppConfig::default(), 0, false, QueueMode::Immediate).unwrap();
        assert_eq!(summary.submitted_lists, 0);
    }
}
