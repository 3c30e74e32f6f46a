//! A node whose background reader thread decodes a media file into a
//! bounded queue of [`AudioBuffer`]s, which `output()` drains without
//! blocking the realtime caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use rme_buffer::{AudioBuffer, ChannelLayout, SampleFormat, StorageLayout};
use rme_core::spsc::{BlockQueue, Consumer, Producer};
use rme_core::{ErrorKind, Result, RmeError};
use rme_file::{MediaDecoder, WavDecoder};

use crate::node::{AudioNode, NodeCommon, NodeKind, NodeParams, NodeState};

const QUEUE_CAPACITY: usize = 10;

pub struct FileSource {
    common: NodeCommon,
    path: String,
    looping: bool,
    rate: u32,
    block: usize,
    format: SampleFormat,
    channel_count: usize,
    queue_rx: Option<Mutex<Consumer<AudioBuffer>>>,
    reader_thread: Option<JoinHandle<()>>,
    stop_flag: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    runtime_error: Arc<Mutex<Option<String>>>,
}

impl FileSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            common: NodeCommon::new(name, 0, 1),
            path: String::new(),
            looping: false,
            rate: 0,
            block: 0,
            format: SampleFormat::F32,
            channel_count: 1,
            queue_rx: None,
            reader_thread: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
            runtime_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the reader has reached end of file and will not loop.
    pub fn is_exhausted(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn zero_block(&self) -> Option<AudioBuffer> {
        if self.block == 0 {
            return None;
        }
        let mut buffer = AudioBuffer::new(
            self.block,
            self.rate,
            self.format,
            StorageLayout::Planar,
            ChannelLayout::with_channel_count(self.channel_count),
        )
        .ok()?;
        buffer.zero().ok()?;
        Some(buffer)
    }
}

impl AudioNode for FileSource {
    fn node_type(&self) -> NodeKind {
        NodeKind::FileSource
    }

    fn name(&self) -> &str {
        &self.common.name
    }

    fn input_pads(&self) -> usize {
        0
    }

    fn output_pads(&self) -> usize {
        1
    }

    fn configure(
        &mut self,
        params: &NodeParams,
        rate: u32,
        block: usize,
        format: SampleFormat,
        layout: &ChannelLayout,
    ) -> Result<()> {
        self.path = params
            .get("path")
            .ok_or_else(|| RmeError::new(ErrorKind::Config, self.common.name.clone(), "missing 'path' parameter"))?
            .clone();
        self.looping = params.get("loop").map(|v| v == "true").unwrap_or(false);
        self.rate = rate;
        self.block = block;
        self.format = format;
        self.channel_count = layout.channel_count();
        self.finished.store(false, Ordering::Release);
        self.common.set_state(NodeState::Configured)
    }

    fn start(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Running)?;
        let decoder: Box<dyn MediaDecoder> = Box::new(WavDecoder::open(&self.path)?);
        let (tx, rx): (Producer<AudioBuffer>, Consumer<AudioBuffer>) = BlockQueue::open(QUEUE_CAPACITY);
        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = Arc::clone(&self.stop_flag);
        let finished = Arc::clone(&self.finished);
        let runtime_error = Arc::clone(&self.runtime_error);
        let block = self.block;
        let looping = self.looping;
        let name = self.common.name.clone();
        self.reader_thread = Some(thread::spawn(move || {
            run_reader(decoder, tx, stop_flag, finished, runtime_error, block, looping, name)
        }));
        self.queue_rx = Some(Mutex::new(rx));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.common.set_state(NodeState::Stopped)?;
        self.stop_flag.store(true, Ordering::Release);
        if let Some(handle) = self.reader_thread.take() {
            let _ = handle.join();
        }
        self.queue_rx = None;
        Ok(())
    }

    fn process(&mut self) -> Result<()> {
        Ok(())
    }

    fn output(&self, pad: usize) -> Option<AudioBuffer> {
        if pad != 0 {
            return None;
        }
        let rx = self.queue_rx.as_ref()?;
        match rx.lock().ok()?.try_pop() {
            Some(buffer) => Some(buffer),
            None if self.finished.load(Ordering::Acquire) => None,
            None => self.zero_block(),
        }
    }

    fn set_input(&mut self, _pad: usize, _buffer: AudioBuffer) -> Result<()> {
        Err(RmeError::new(ErrorKind::Config, self.common.name.clone(), "FileSource has no input pads"))
    }

    fn state(&self) -> NodeState {
        self.common.state
    }

    fn last_error(&self) -> Option<&str> {
        self.common.last_error.as_deref()
    }

    fn is_finished(&self) -> bool {
        self.is_exhausted()
    }
}

#[allow(clippy::too_many_arguments)]
fn run_reader(
    mut decoder: Box<dyn MediaDecoder>,
    mut tx: Producer<AudioBuffer>,
    stop_flag: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    runtime_error: Arc<Mutex<Option<String>>>,
    block: usize,
    looping: bool,
    name: String,
) {
    loop {
        if stop_flag.load(Ordering::Acquire) {
            return;
        }
        match decoder.decode_block(block) {
            Ok(Some(mut buffer)) => {
                // The queue is realtime-safe (never blocks); back off and
                // retry rather than dropping a decoded block.
                while let Err(rejected) = tx.try_push(buffer) {
                    if stop_flag.load(Ordering::Acquire) {
                        return;
                    }
                    buffer = rejected;
                    thread::sleep(std::time::Duration::from_millis(1));
                }
            }
            Ok(None) if looping => {
                if let Err(e) = decoder.seek_to_start() {
                    log::error!("{name}: seek_to_start failed: {e}");
                    *runtime_error.lock().unwrap() = Some(e.to_string());
                    finished.store(true, Ordering::Release);
                    return;
                }
            }
            Ok(None) => {
                finished.store(true, Ordering::Release);
                return;
            }
            Err(e) => {
                log::error!("{name}: decode_block failed: {e}");
                *runtime_error.lock().unwrap() = Some(e.to_string());
                finished.store(true, Ordering::Release);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat as HoundFormat, WavSpec, WavWriter};
    use std::io::BufWriter;
    use std::time::{Duration, Instant};
    use tempfile::NamedTempFile;

    fn write_test_wav(samples: &[f32]) -> NamedTempFile {
        let temp = NamedTempFile::new().unwrap();
        let spec = WavSpec { channels: 1, sample_rate: 48_000, bits_per_sample: 32, sample_format: HoundFormat::Float };
        let mut writer = WavWriter::new(BufWriter::new(temp.reopen().unwrap()), spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        temp
    }

    fn wait_for<F: Fn() -> bool>(predicate: F) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !predicate() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn non_looping_source_reports_exhaustion_once_drained() {
        let temp = write_test_wav(&[0.0, 0.1, 0.2]);
        let mut node = FileSource::new("file-in");
        let mut params = NodeParams::new();
        params.insert("path".to_string(), temp.path().to_str().unwrap().to_string());
        node.configure(&params, 48_000, 3, SampleFormat::F32, &ChannelLayout::mono()).unwrap();
        node.start().unwrap();

        wait_for(|| node.is_exhausted());
        assert!(node.output(0).is_some());
        assert!(node.output(0).is_none());
        node.stop().unwrap();
    }

    #[test]
    fn looping_source_never_reports_exhaustion() {
        let temp = write_test_wav(&[0.0, 0.1, 0.2]);
        let mut node = FileSource::new("file-in");
        let mut params = NodeParams::new();
        params.insert("path".to_string(), temp.path().to_str().unwrap().to_string());
        params.insert("loop".to_string(), "true".to_string());
        node.configure(&params, 48_000, 3, SampleFormat::F32, &ChannelLayout::mono()).unwrap();
        node.start().unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(!node.is_exhausted());
        node.stop().unwrap();
    }
}
