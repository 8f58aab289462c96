//! Headless software backend.
//!
//! A simulated GPU that honours the same contracts as a real queue: command
//! lists execute in submission order, fences are signalled only after every
//! prior submission has executed, and constant buffers are read by address
//! at *execution* time, not at record time. That last property is what makes
//! frame pipelining observable: if the CPU overwrites a constant record while
//! a submitted frame still has to read it, the frame sees the new bytes and
//! the backend counts a hazard.
//!
//! # Queue modes
//!
//! - [`QueueMode::Immediate`] executes each command list inside `submit`.
//! - [`QueueMode::Deferred`] holds work until [`QueueController::retire_one`]
//!   or [`QueueController::retire_all`] is called, typically from another thread.
//! - [`QueueMode::Threaded`] runs a worker thread that executes each command
//!   list after a fixed latency.
//!
//! # Example
//!
//! ```
//! use shapes_rhi::backend::{Backend, ConstantBuffer, GpuFence};
//! use shapes_rhi::software::{QueueMode, SoftwareBackend};
//!
//! # fn main() -> shapes_rhi::RhiResult<()> {
//! let mut backend = SoftwareBackend::new(QueueMode::Immediate);
//! let fence = backend.create_fence(0)?;
//! let mut allocator = backend.create_command_allocator()?;
//! backend.record(&mut allocator, &[])?;
//! backend.submit(&mut allocator)?;
//! backend.signal(&fence, 1)?;
//! assert_eq!(fence.completed_value()?, 1);
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::backend::{
    Backend, Command, ConstantBuffer, FillMode, GeometryId, GpuAddress, GpuFence,
    PrimitiveTopology, ResourceState,
};
use crate::error::{RhiError, RhiResult};
use crate::vertex::Vertex;

/// Constant record alignment, matching the common 256-byte CBV rule.
pub const SOFTWARE_CONSTANT_ALIGNMENT: u64 = 256;

/// Each buffer owns a 4 GiB window of the simulated address space.
const ADDRESS_SHIFT: u32 = 32;
const OFFSET_MASK: u64 = (1 << ADDRESS_SHIFT) - 1;

fn base_address(buffer: usize) -> GpuAddress {
    ((buffer as u64) + 1) << ADDRESS_SHIFT
}

fn resolve_address(address: GpuAddress) -> Option<(usize, u64)> {
    let window = address >> ADDRESS_SHIFT;
    if window == 0 {
        return None;
    }
    Some(((window - 1) as usize, address & OFFSET_MASK))
}

/// How the simulated queue executes submitted work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueMode {
    Immediate,
    Deferred,
    Threaded { latency: Duration },
}

/// Host-side timeline fence.
#[derive(Clone, Debug, Default)]
pub struct HostFence {
    inner: Arc<(Mutex<u64>, Condvar)>,
}

impl HostFence {
    pub fn new(initial_value: u64) -> Self {
        Self {
            inner: Arc::new((Mutex::new(initial_value), Condvar::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        // A poisoned value is still a valid counter.
        self.inner.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set the completed value. Lower values are ignored.
    pub fn signal(&self, value: u64) {
        let mut completed = self.lock();
        if value < *completed {
            warn!(
                "Ignoring non-monotonic fence signal {} (completed {})",
                value, *completed
            );
            return;
        }
        *completed = value;
        self.inner.1.notify_all();
    }
}

impl GpuFence for HostFence {
    fn completed_value(&self) -> RhiResult<u64> {
        Ok(*self.lock())
    }

    fn wait(&self, value: u64, timeout: Option<Duration>) -> RhiResult<()> {
        let completed = self.lock();
        let cvar = &self.inner.1;
        let completed = match timeout {
            None => cvar
                .wait_while(completed, |c| *c < value)
                .unwrap_or_else(|e| e.into_inner()),
            Some(timeout) => {
                cvar.wait_timeout_while(completed, timeout, |c| *c < value)
                    .unwrap_or_else(|e| e.into_inner())
                    .0
            }
        };
        if *completed < value {
            return Err(RhiError::FenceTimeout {
                value,
                completed: *completed,
            });
        }
        Ok(())
    }
}

/// What one executed draw saw.
#[derive(Clone, Debug, PartialEq)]
pub struct ExecutedDraw {
    pub geometry: Option<GeometryId>,
    pub topology: PrimitiveTopology,
    pub object_address: GpuAddress,
    pub material_address: GpuAddress,
    pub pass_address: GpuAddress,
    /// One aligned constant slot read from the object address at execution time.
    pub object_bytes: Vec<u8>,
    /// One aligned constant slot read from the material address at execution time.
    pub material_bytes: Vec<u8>,
    pub index_count: u32,
    pub instance_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
}

/// What one executed command list did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutedFrame {
    pub allocator: u32,
    pub fill_mode: Option<FillMode>,
    pub clear_color: Option<[f32; 4]>,
    pub transitions: Vec<(ResourceState, ResourceState)>,
    /// Pass record bytes read at execution time.
    pub pass_bytes: Vec<u8>,
    pub draws: Vec<ExecutedDraw>,
}

/// A byte range some pending command list will read.
#[derive(Clone, Copy, Debug)]
struct ReadRange {
    buffer: usize,
    start: u64,
    end: u64,
}

#[derive(Debug)]
struct SubmittedList {
    allocator: u32,
    commands: Vec<Command>,
    reads: Vec<ReadRange>,
}

#[derive(Debug)]
enum QueueItem {
    Commands(SubmittedList),
    Signal(HostFence, u64),
}

#[derive(Debug, Default)]
struct GeometryRecord {
    vertex_count: usize,
    index_count: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    buffers: Vec<Vec<u8>>,
    geometries: Vec<GeometryRecord>,
    pending: VecDeque<QueueItem>,
    executed: Vec<ExecutedFrame>,
    submitted_lists: u64,
    max_lists_in_flight: usize,
    hazards: u64,
    invalid_draws: u64,
    shutdown: bool,
}

impl QueueState {
    fn pending_lists(&self) -> usize {
        self.pending
            .iter()
            .filter(|item| matches!(item, QueueItem::Commands(_)))
            .count()
    }

    /// Count a hazard if a pending command list still reads `[start, end)` of `buffer`.
    fn check_write(&mut self, buffer: usize, start: u64, end: u64) {
        let overlaps = self.pending.iter().any(|item| match item {
            QueueItem::Commands(list) => list
                .reads
                .iter()
                .any(|r| r.buffer == buffer && r.start < end && start < r.end),
            QueueItem::Signal(..) => false,
        });
        if overlaps {
            self.hazards += 1;
            warn!(
                "CPU write to buffer {} bytes {}..{} races with in-flight GPU read",
                buffer, start, end
            );
        }
    }

    fn read_span(&self, address: GpuAddress, len: u64) -> Vec<u8> {
        let Some((buffer, offset)) = resolve_address(address) else {
            return Vec::new();
        };
        let Some(bytes) = self.buffers.get(buffer) else {
            return Vec::new();
        };
        let start = (offset as usize).min(bytes.len());
        let end = (offset.saturating_add(len) as usize).min(bytes.len());
        bytes[start..end].to_vec()
    }

    fn buffer_len(&self, address: GpuAddress) -> u64 {
        resolve_address(address)
            .and_then(|(buffer, offset)| {
                self.buffers
                    .get(buffer)
                    .map(|b| (b.len() as u64).saturating_sub(offset))
            })
            .unwrap_or(0)
    }

    /// Pop and execute the front queue item. Returns false if the queue was empty.
    fn execute_front(&mut self, alignment: u64) -> bool {
        let Some(item) = self.pending.pop_front() else {
            return false;
        };
        match item {
            QueueItem::Commands(list) => {
                let frame = self.execute(list, alignment);
                trace!(
                    "Executed command list from allocator {} ({} draws)",
                    frame.allocator,
                    frame.draws.len()
                );
                self.executed.push(frame);
            }
            QueueItem::Signal(fence, value) => {
                trace!("Queue signalled fence value {}", value);
                fence.signal(value);
            }
        }
        true
    }

    fn execute(&mut self, list: SubmittedList, alignment: u64) -> ExecutedFrame {
        let mut frame = ExecutedFrame {
            allocator: list.allocator,
            ..Default::default()
        };
        let mut geometry = None;
        let mut topology = PrimitiveTopology::default();
        let mut pass_address = 0;
        let mut object_address = 0;
        let mut material_address = 0;

        for command in &list.commands {
            match *command {
                Command::SetPipeline(mode) => frame.fill_mode = Some(mode),
                Command::Transition { from, to } => frame.transitions.push((from, to)),
                Command::BeginPass { clear_color, .. } => frame.clear_color = Some(clear_color),
                Command::EndPass | Command::SetViewport(_) | Command::SetScissor(_) => {}
                Command::SetPassConstants(address) => {
                    pass_address = address;
                    frame.pass_bytes = self.read_span(address, self.buffer_len(address));
                }
                Command::BindGeometry(id) => geometry = Some(id),
                Command::SetTopology(t) => topology = t,
                Command::SetObjectConstants(address) => object_address = address,
                Command::SetMaterialConstants(address) => material_address = address,
                Command::DrawIndexedInstanced {
                    index_count,
                    instance_count,
                    start_index,
                    base_vertex,
                    ..
                } => {
                    self.validate_draw(geometry, start_index, index_count, base_vertex);
                    frame.draws.push(ExecutedDraw {
                        geometry,
                        topology,
                        object_address,
                        material_address,
                        pass_address,
                        object_bytes: self.read_span(object_address, alignment),
                        material_bytes: self.read_span(material_address, alignment),
                        index_count,
                        instance_count,
                        start_index,
                        base_vertex,
                    });
                }
            }
        }
        frame
    }

    fn validate_draw(
        &mut self,
        geometry: Option<GeometryId>,
        start_index: u32,
        index_count: u32,
        base_vertex: i32,
    ) {
        let record = geometry.and_then(|id| self.geometries.get(id.0 as usize));
        let valid = match record {
            Some(record) => {
                (start_index as usize + index_count as usize) <= record.index_count
                    && base_vertex >= 0
                    && (base_vertex as usize) < record.vertex_count.max(1)
            }
            None => false,
        };
        if !valid {
            self.invalid_draws += 1;
            warn!(
                "Draw outside bound geometry {:?}: start {} count {} base vertex {}",
                geometry, start_index, index_count, base_vertex
            );
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<QueueState>,
    changed: Condvar,
    alignment: u64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Cloneable handle for observing and driving the simulated queue.
#[derive(Clone, Debug)]
pub struct QueueController {
    shared: Arc<Shared>,
}

impl QueueController {
    /// Execute the oldest pending queue item. Returns false if nothing was pending.
    pub fn retire_one(&self) -> bool {
        let mut state = self.shared.lock();
        let retired = state.execute_front(self.shared.alignment);
        self.shared.changed.notify_all();
        retired
    }

    /// Execute everything pending. Returns the number of items executed.
    pub fn retire_all(&self) -> usize {
        let mut state = self.shared.lock();
        let mut count = 0;
        while state.execute_front(self.shared.alignment) {
            count += 1;
        }
        self.shared.changed.notify_all();
        count
    }

    /// Command lists submitted but not yet executed.
    pub fn pending_lists(&self) -> usize {
        self.shared.lock().pending_lists()
    }

    /// Largest number of command lists ever pending at once.
    pub fn max_lists_in_flight(&self) -> usize {
        self.shared.lock().max_lists_in_flight
    }

    pub fn submitted_lists(&self) -> u64 {
        self.shared.lock().submitted_lists
    }

    /// CPU writes or allocator resets that raced with pending GPU work.
    pub fn hazard_count(&self) -> u64 {
        self.shared.lock().hazards
    }

    /// Draws whose index range fell outside the bound geometry.
    pub fn invalid_draw_count(&self) -> u64 {
        self.shared.lock().invalid_draws
    }

    /// Snapshot of every executed command list, oldest first.
    pub fn executed(&self) -> Vec<ExecutedFrame> {
        self.shared.lock().executed.clone()
    }

    /// Drain the execution log.
    pub fn take_executed(&self) -> Vec<ExecutedFrame> {
        std::mem::take(&mut self.shared.lock().executed)
    }
}

/// Constant buffer living in the simulated address space.
#[derive(Debug)]
pub struct SoftwareBuffer {
    shared: Arc<Shared>,
    index: usize,
    size: u64,
}

impl ConstantBuffer for SoftwareBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn gpu_address(&self) -> GpuAddress {
        base_address(self.index)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> RhiResult<()> {
        let end = offset + data.len() as u64;
        if end > self.size {
            return Err(RhiError::OutOfBounds {
                offset,
                len: data.len() as u64,
                size: self.size,
            });
        }
        let mut state = self.shared.lock();
        state.check_write(self.index, offset, end);
        state.buffers[self.index][offset as usize..end as usize].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> RhiResult<()> {
        let end = offset + out.len() as u64;
        if end > self.size {
            return Err(RhiError::OutOfBounds {
                offset,
                len: out.len() as u64,
                size: self.size,
            });
        }
        let state = self.shared.lock();
        out.copy_from_slice(&state.buffers[self.index][offset as usize..end as usize]);
        Ok(())
    }
}

/// Command allocator: owns the command memory of one frame's list.
#[derive(Debug)]
pub struct SoftwareCommandAllocator {
    id: u32,
    commands: Vec<Command>,
}

impl SoftwareCommandAllocator {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

/// Headless simulated GPU.
pub struct SoftwareBackend {
    shared: Arc<Shared>,
    mode: QueueMode,
    next_allocator: u32,
    worker: Option<JoinHandle<()>>,
}

impl SoftwareBackend {
    pub fn new(mode: QueueMode) -> Self {
        let shared = Arc::new(Shared {
            alignment: SOFTWARE_CONSTANT_ALIGNMENT,
            ..Default::default()
        });

        let worker = match mode {
            QueueMode::Threaded { latency } => {
                let worker_shared = shared.clone();
                match std::thread::Builder::new()
                    .name("software-queue".to_string())
                    .spawn(move || run_queue(&worker_shared, latency))
                {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        warn!("Failed to spawn queue worker, executing inline: {}", e);
                        None
                    }
                }
            }
            QueueMode::Immediate | QueueMode::Deferred => None,
        };

        info!("Software backend created ({:?} queue)", mode);

        Self {
            shared,
            mode,
            next_allocator: 0,
            worker,
        }
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn controller(&self) -> QueueController {
        QueueController {
            shared: self.shared.clone(),
        }
    }

    fn enqueue(&mut self, item: QueueItem) {
        let mut state = self.shared.lock();
        state.pending.push_back(item);
        if self.mode == QueueMode::Immediate || self.worker.is_none() && self.is_threaded() {
            while state.execute_front(self.shared.alignment) {}
        }
        self.shared.changed.notify_all();
    }

    fn is_threaded(&self) -> bool {
        matches!(self.mode, QueueMode::Threaded { .. })
    }
}

/// Worker loop: execute the front item after `latency`, keeping it visible as
/// pending while it "runs" so CPU writes during that window count as hazards.
fn run_queue(shared: &Shared, latency: Duration) {
    debug!("Software queue worker started ({:?} latency)", latency);
    loop {
        {
            let state = shared.lock();
            let state = shared
                .changed
                .wait_while(state, |s| s.pending.is_empty() && !s.shutdown)
                .unwrap_or_else(|e| e.into_inner());
            if state.pending.is_empty() && state.shutdown {
                break;
            }
        }
        if !latency.is_zero() {
            std::thread::sleep(latency);
        }
        let mut state = shared.lock();
        state.execute_front(shared.alignment);
        shared.changed.notify_all();
    }
    debug!("Software queue worker stopped");
}

impl Backend for SoftwareBackend {
    type Buffer = SoftwareBuffer;
    type CommandAllocator = SoftwareCommandAllocator;
    type Fence = HostFence;

    fn name(&self) -> &'static str {
        "software"
    }

    fn constant_buffer_alignment(&self) -> u64 {
        self.shared.alignment
    }

    fn create_constant_buffer(&mut self, size: u64, label: &str) -> RhiResult<SoftwareBuffer> {
        if size == 0 || size > OFFSET_MASK {
            return Err(RhiError::InvalidHandle(format!(
                "Constant buffer '{}' has unsupported size {}",
                label, size
            )));
        }
        let mut state = self.shared.lock();
        let index = state.buffers.len();
        state.buffers.push(vec![0; size as usize]);
        debug!(
            "Created constant buffer '{}': {} bytes at {:#x}",
            label,
            size,
            base_address(index)
        );
        Ok(SoftwareBuffer {
            shared: self.shared.clone(),
            index,
            size,
        })
    }

    fn create_command_allocator(&mut self) -> RhiResult<SoftwareCommandAllocator> {
        let id = self.next_allocator;
        self.next_allocator += 1;
        debug!("Created command allocator {}", id);
        Ok(SoftwareCommandAllocator {
            id,
            commands: Vec::new(),
        })
    }

    fn reset_command_allocator(&mut self, allocator: &mut SoftwareCommandAllocator) -> RhiResult<()> {
        let mut state = self.shared.lock();
        let in_use = state.pending.iter().any(|item| {
            matches!(item, QueueItem::Commands(list) if list.allocator == allocator.id)
        });
        if in_use {
            state.hazards += 1;
            warn!(
                "Command allocator {} reset while the GPU still executes its list",
                allocator.id
            );
        }
        allocator.commands.clear();
        Ok(())
    }

    fn create_fence(&mut self, initial_value: u64) -> RhiResult<HostFence> {
        debug!("Created fence with initial value {}", initial_value);
        Ok(HostFence::new(initial_value))
    }

    fn create_geometry(&mut self, vertices: &[Vertex], indices: &[u16]) -> RhiResult<GeometryId> {
        let mut state = self.shared.lock();
        let id = GeometryId(state.geometries.len() as u32);
        state.geometries.push(GeometryRecord {
            vertex_count: vertices.len(),
            index_count: indices.len(),
        });
        debug!(
            "Uploaded geometry {:?}: {} vertices, {} indices",
            id,
            vertices.len(),
            indices.len()
        );
        Ok(id)
    }

    fn begin_frame(&mut self) -> RhiResult<()> {
        Ok(())
    }

    fn record(
        &mut self,
        allocator: &mut SoftwareCommandAllocator,
        commands: &[Command],
    ) -> RhiResult<()> {
        allocator.commands.extend_from_slice(commands);
        Ok(())
    }

    fn submit(&mut self, allocator: &mut SoftwareCommandAllocator) -> RhiResult<()> {
        let alignment = self.shared.alignment;
        let reads = {
            let state = self.shared.lock();
            allocator
                .commands
                .iter()
                .filter_map(|command| {
                    let (address, len) = match *command {
                        Command::SetObjectConstants(a) | Command::SetMaterialConstants(a) => {
                            (a, alignment)
                        }
                        Command::SetPassConstants(a) => (a, state.buffer_len(a)),
                        _ => return None,
                    };
                    let (buffer, start) = resolve_address(address)?;
                    Some(ReadRange {
                        buffer,
                        start,
                        end: start + len,
                    })
                })
                .collect()
        };

        {
            let mut state = self.shared.lock();
            state.submitted_lists += 1;
            let in_flight = state.pending_lists() + 1;
            state.max_lists_in_flight = state.max_lists_in_flight.max(in_flight);
        }

        trace!(
            "Submitting {} commands from allocator {}",
            allocator.commands.len(),
            allocator.id
        );
        self.enqueue(QueueItem::Commands(SubmittedList {
            allocator: allocator.id,
            commands: allocator.commands.clone(),
            reads,
        }));
        Ok(())
    }

    fn signal(&mut self, fence: &HostFence, value: u64) -> RhiResult<()> {
        self.enqueue(QueueItem::Signal(fence.clone(), value));
        Ok(())
    }

    fn wait_idle(&mut self) -> RhiResult<()> {
        match self.mode {
            QueueMode::Immediate => {}
            QueueMode::Deferred => {
                let retired = self.controller().retire_all();
                debug!("Flushed {} deferred queue item(s)", retired);
            }
            QueueMode::Threaded { .. } => {
                let state = self.shared.lock();
                let _idle = self
                    .shared
                    .changed
                    .wait_while(state, |s| !s.pending.is_empty())
                    .unwrap_or_else(|e| e.into_inner());
            }
        }
        Ok(())
    }
}

impl Drop for SoftwareBackend {
    fn drop(&mut self) {
        {
            let mut state = self.shared.lock();
            state.shutdown = true;
            self.shared.changed.notify_all();
        }
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Software queue worker panicked");
        }
        info!("Software backend destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn draw(index_count: u32) -> Command {
        Command::DrawIndexedInstanced {
            index_count,
            instance_count: 1,
            start_index: 0,
            base_vertex: 0,
            start_instance: 0,
        }
    }

    #[test]
    fn test_address_round_trip() {
        let address = base_address(3) + 512;
        assert_eq!(resolve_address(address), Some((3, 512)));
        assert_eq!(resolve_address(42), None);
    }

    #[test]
    fn test_buffer_write_read() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let mut buffer = backend.create_constant_buffer(512, "test").unwrap();
        buffer.write(256, &[1, 2, 3, 4]).unwrap();
        let mut out = [0u8; 4];
        buffer.read(256, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_buffer_write_out_of_bounds() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let mut buffer = backend.create_constant_buffer(16, "small").unwrap();
        let err = buffer.write(12, &[0; 8]).unwrap_err();
        assert!(matches!(err, RhiError::OutOfBounds { size: 16, .. }));
    }

    #[test]
    fn test_distinct_buffer_addresses() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let a = backend.create_constant_buffer(256, "a").unwrap();
        let b = backend.create_constant_buffer(256, "b").unwrap();
        assert_ne!(a.gpu_address(), b.gpu_address());
    }

    #[test]
    fn test_host_fence_signal_and_wait() {
        let fence = HostFence::new(0);
        let signaller = fence.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            signaller.signal(5);
        });
        fence.wait(5, None).unwrap();
        assert_eq!(fence.completed_value().unwrap(), 5);
        handle.join().unwrap();
    }

    #[test]
    fn test_host_fence_ignores_lower_values() {
        let fence = HostFence::new(4);
        fence.signal(2);
        assert_eq!(fence.completed_value().unwrap(), 4);
    }

    #[test]
    fn test_host_fence_timeout() {
        let fence = HostFence::new(1);
        let err = fence.wait(2, Some(Duration::from_millis(10))).unwrap_err();
        assert!(matches!(
            err,
            RhiError::FenceTimeout {
                value: 2,
                completed: 1
            }
        ));
    }

    #[test]
    fn test_immediate_queue_executes_on_submit() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let controller = backend.controller();
        let fence = backend.create_fence(0).unwrap();
        let mut alloc = backend.create_command_allocator().unwrap();
        backend
            .record(&mut alloc, &[Command::SetPipeline(FillMode::Wireframe)])
            .unwrap();
        backend.submit(&mut alloc).unwrap();
        backend.signal(&fence, 1).unwrap();

        assert_eq!(fence.completed_value().unwrap(), 1);
        let executed = controller.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].fill_mode, Some(FillMode::Wireframe));
    }

    #[test]
    fn test_deferred_queue_reads_at_execution_time() {
        let mut backend = SoftwareBackend::new(QueueMode::Deferred);
        let controller = backend.controller();
        let geometry = backend
            .create_geometry(&[Vertex::default(); 3], &[0, 1, 2])
            .unwrap();
        let mut buffer = backend.create_constant_buffer(256, "objects").unwrap();
        buffer.write(0, &[7; 4]).unwrap();

        let mut alloc = backend.create_command_allocator().unwrap();
        backend
            .record(
                &mut alloc,
                &[
                    Command::BindGeometry(geometry),
                    Command::SetObjectConstants(buffer.gpu_address()),
                    draw(3),
                ],
            )
            .unwrap();
        backend.submit(&mut alloc).unwrap();
        assert_eq!(controller.pending_lists(), 1);

        // Overwriting while the list is pending is visible to the GPU and counted.
        buffer.write(0, &[9; 4]).unwrap();
        assert_eq!(controller.hazard_count(), 1);

        assert!(controller.retire_one());
        let executed = controller.executed();
        assert_eq!(&executed[0].draws[0].object_bytes[..4], &[9; 4]);
        assert_eq!(controller.invalid_draw_count(), 0);

        // Once retired, writes are safe.
        buffer.write(0, &[1; 4]).unwrap();
        assert_eq!(controller.hazard_count(), 1);
    }

    #[test]
    fn test_allocator_reset_while_pending_is_a_hazard() {
        let mut backend = SoftwareBackend::new(QueueMode::Deferred);
        let controller = backend.controller();
        let mut alloc = backend.create_command_allocator().unwrap();
        backend.record(&mut alloc, &[Command::EndPass]).unwrap();
        backend.submit(&mut alloc).unwrap();
        backend.reset_command_allocator(&mut alloc).unwrap();
        assert_eq!(controller.hazard_count(), 1);
        assert!(alloc.commands().is_empty());
    }

    #[test]
    fn test_signal_waits_for_prior_work() {
        let mut backend = SoftwareBackend::new(QueueMode::Deferred);
        let controller = backend.controller();
        let fence = backend.create_fence(0).unwrap();
        let mut alloc = backend.create_command_allocator().unwrap();
        backend.submit(&mut alloc).unwrap();
        backend.signal(&fence, 1).unwrap();

        assert_eq!(fence.completed_value().unwrap(), 0);
        assert!(controller.retire_one());
        assert_eq!(fence.completed_value().unwrap(), 0);
        assert!(controller.retire_one());
        assert_eq!(fence.completed_value().unwrap(), 1);
        assert!(!controller.retire_one());
    }

    #[test]
    fn test_invalid_draw_is_counted() {
        let mut backend = SoftwareBackend::new(QueueMode::Immediate);
        let controller = backend.controller();
        let geometry = backend
            .create_geometry(&[Vertex::default(); 3], &[0, 1, 2])
            .unwrap();
        let mut alloc = backend.create_command_allocator().unwrap();
        backend
            .record(&mut alloc, &[Command::BindGeometry(geometry), draw(6)])
            .unwrap();
        backend.submit(&mut alloc).unwrap();
        assert_eq!(controller.invalid_draw_count(), 1);
    }

    #[test]
    fn test_threaded_queue_signals_fence() {
        let mut backend = SoftwareBackend::new(QueueMode::Threaded {
            latency: Duration::from_millis(5),
        });
        let fence = backend.create_fence(0).unwrap();
        let mut alloc = backend.create_command_allocator().unwrap();
        backend.submit(&mut alloc).unwrap();
        backend.signal(&fence, 1).unwrap();
        fence.wait(1, Some(Duration::from_secs(5))).unwrap();
        backend.wait_idle().unwrap();
        assert_eq!(backend.controller().pending_lists(), 0);
        assert_eq!(backend.controller().executed().len(), 1);
    }

    #[test]
    fn test_deferred_wait_idle_flushes() {
        let mut backend = SoftwareBackend::new(QueueMode::Deferred);
        let fence = backend.create_fence(0).unwrap();
        let mut alloc = backend.create_command_allocator().unwrap();
        backend.submit(&mut alloc).unwrap();
        backend.signal(&fence, 3).unwrap();
        backend.wait_idle().unwrap();
        assert_eq!(fence.completed_value().unwrap(), 3);
    }

    #[test]
    fn test_backend_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<SoftwareBackend>();
        assert_send::<SoftwareBuffer>();
        assert_send::<HostFence>();
    }
}
