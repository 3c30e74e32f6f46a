//! The two ways an [`AudioGraph`] gets ticked: driven by an ASIO callback,
//! or paced by a dedicated soft-clock thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::graph::AudioGraph;

/// Drives the graph from an ASIO driver's buffer-ready callback. Sample
/// rate and block size are dictated by the driver; cancellation happens by
/// stopping the driver so it no longer calls back.
pub struct HardwareDriven;

impl HardwareDriven {
    /// Runs one per-tick routine. Call this from the driver's callback,
    /// after the `AsioSource` nodes have published via `receive()` and
    /// before the `AsioSink` nodes are drained via `provide()`.
    pub fn on_callback(graph: &mut AudioGraph) -> rme_core::Result<()> {
        graph.tick()
    }
}

/// Paces the graph with a dedicated thread targeting `block / rate` seconds
/// per tick, using an absolute next-tick deadline. A tick that overruns the
/// deadline logs a warning and rebases to `now + period` rather than
/// attempting to catch up.
pub struct SoftClocked {
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SoftClocked {
    pub fn new() -> Self {
        Self { stop_flag: Arc::new(AtomicBool::new(false)), handle: None }
    }

    /// Spawns the ticker thread. `graph` is driven under a mutex since the
    /// ticker thread and the caller both need to reach it (the caller to
    /// inspect state, `stop()` to join cleanly).
    pub fn start(&mut self, graph: Arc<Mutex<AudioGraph>>, rate: u32, block: usize) {
        let period = Duration::from_secs_f64(block as f64 / rate as f64);
        let stop_flag = Arc::clone(&self.stop_flag);
        stop_flag.store(false, Ordering::Release);
        self.handle = Some(thread::spawn(move || run_soft_loop(graph, period, stop_flag)));
    }

    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for SoftClocked {
    fn default() -> Self {
        Self::new()
    }
}

fn run_soft_loop(graph: Arc<Mutex<AudioGraph>>, period: Duration, stop_flag: Arc<AtomicBool>) {
    let mut deadline = Instant::now() + period;
    loop {
        if stop_flag.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
        } else {
            log::warn!("soft-clock tick overran its deadline by {:?}", now - deadline);
            deadline = now;
        }
        deadline += period;

        let mut guard = graph.lock().unwrap();
        if let Err(e) = guard.tick() {
            log::error!("soft-clock tick failed: {e}");
        }
        if guard.all_file_sources_exhausted() {
            if let Err(e) = guard.stop() {
                log::error!("soft-clock self-stop failed: {e}");
            }
            return;
        }
        drop(guard);

        if stop_flag.load(Ordering::Acquire) {
            return;
        }
    }
}
