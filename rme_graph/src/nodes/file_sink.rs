//! A node whose background writer thread drains a bounded queue of
//! [`AudioBuffer`]s into a [`MediaEncoder`], finalizing (atomic
//! write-then-rename) when stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat};
use rme_core::spsc::{BlockQueue, Consumer, Producer};
use rme_core::{ErrorKind, Result, RmeError};
use rme_file::{MediaEncoder, WavEncoder};

use crate::node::{AudioNode, NodeCommon, NodeKind, NodeParams, NodeState};

const QUEUE_CAPACITY: usize = 10;

pub struct FileSink {
    common: NodeCommon,
    path: String,
    rate: u32,
    queue_tx: Option<Producer<AudioBuffer>>,
    writer_thread: Option<JoinHandle<()>>,
    channel_count: usize,
    stop_flag: Arc<AtomicBool>,
}

impl FileSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: NodeCommon::new(name, 1, 0),
            path: String::new(),
            rate: 0,
            queue_tx: None,
            writer_thread: None,
            channel_count: 1,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Drains the queue until told to stop and the queue runs dry, then
/// finalizes the file. Polls rather than blocks since the queue itself
/// never blocks.
fn run_writer(mut encoder: Box<dyn MediaEncoder>, mut rx: Consumer<AudioBuffer>, stop_flag: Arc<AtomicBool>, name: String) {
    loop {
        match rx.try_pop() {
            Some(buffer) => {
                if let Err(e) = encoder.encode_block(&buffer) {
                    log::error!("{name}: encode_block failed: {e}");
                }
            }
            None if stop_flag.load(Ordering::Acquire) => break,
            None => thread::sleep(std::time::Duration::from_millis(1)),
        }
    }
    if let Err(e) = encoder.finalize() {
        log::error!("{name}: finalize failed: {e}");
    }
}

impl AudioNode for FileSink {
    fn node_type(&self) -> NodeKind {
        NodeKind::FileSink
    }

    fn name(&self) -> &str {
        &self.common.name
    }

    fn input_pads(&self) -> usize {
        1
    }

    fn output_pads(&self) -> usize {
        0
    }

    fn configure(
        &mut self,
        params: &NodeParams,
        rate: u32,
        _block: usize,
        _format: SampleFormat,
        layout: &ChannelLayout,
    ) -> Result<()> {
        self.path = params
            .get("path")
            .ok_or_else(|| RmeError::new(ErrorKind::Config, self.common.name.clone(), "missing 'path' parameter"))?
            .clone();
        self.rate = rate;
        self.channel_count = layout.channel_count();
        self.common.set_state(NodeState::Configured)
    }

    fn start(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Running)?;
        let rate = self.rate;
        self.spawn_writer(rate)
    }

    fn stop(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Stopped)?;
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.writer_thread.take() {
            let _ = handle.join();
        }
        self.queue_tx = None;
        Ok(())
    }

    fn process(&mut self) -> Result<()> {
        Ok(())
    }

    fn output(&self, _pad: usize) -> Option<AudioBuffer> {
        None
    }

    fn set_input(&mut self, pad: usize, buffer: AudioBuffer) -> Result<()> {
        if pad != 0 {
            return Err(RmeError::new(ErrorKind::Range, self.common.name.clone(), "no such input pad"));
        }
        let Some(tx) = self.queue_tx.as_mut() else {
            return Err(RmeError::new(ErrorKind::State, self.common.name.clone(), "set_input() called before start()"));
        };
        if tx.try_push(buffer).is_err() {
            self.common.record_error("writer queue full; buffer dropped");
            log::warn!("{}: writer queue full, dropping a block", self.common.name);
        }
        Ok(())
    }

    fn state(&self) -> NodeState {
        self.common.state
    }

    fn last_error(&self) -> Option<&str> {
        self.common.last_error.as_deref()
    }
}

impl FileSink {
    /// Opens the output file and spawns the writer thread. Split out of
    /// `start()` because opening fallibly borrows `self` twice otherwise.
    fn spawn_writer(&mut self, rate: u32) -> Result<()> {
        let encoder: Box<dyn MediaEncoder> = Box::new(WavEncoder::create(&self.path, rate, self.channel_count)?);
        let (tx, rx) = BlockQueue::open(QUEUE_CAPACITY);
        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = Arc::clone(&self.stop_flag);
        let name = self.common.name.clone();
        self.writer_thread = Some(thread::spawn(move || run_writer(encoder, rx, stop_flag, name)));
        self.queue_tx = Some(tx);
        Ok(())
    }
}
