//! [`AudioBuffer`]: shared, format-aware PCM storage with zero-copy views.

use std::sync::Arc;

use rme_core::{ErrorKind, Result, RmeError};

use crate::format::SampleFormat;
use crate::layout::ChannelLayout;

/// Whether a buffer's planes hold one channel each, or all channels
/// interleaved into a single plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLayout {
    Planar,
    Interleaved,
}

/// The shared, immutable-once-published backing store for an [`AudioBuffer`].
///
/// A fresh allocation holds exactly one [`Arc`] reference; mutation
/// (`zero`, `fill`) is only offered while that reference is unique, which
/// models the spec's "writer writes before publishing, no intra-tick
/// mutation by two parties" rule without a runtime lock.
#[derive(Debug)]
struct Inner {
    frames: usize,
    rate: u32,
    format: SampleFormat,
    storage: StorageLayout,
    channels: ChannelLayout,
    /// One plane when interleaved, `N` planes when planar. Each plane is
    /// `frames * bytes_per_sample` (planar) or `frames * N * bytes_per_sample`
    /// (interleaved, single plane) bytes long.
    planes: Vec<Vec<u8>>,
}

/// One block of PCM audio, shared by reference along graph connections.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    inner: Arc<Inner>,
    /// Sub-range `[view_start, view_start + view_frames)` into `inner`, in
    /// frames. A freshly allocated buffer views its entire extent.
    view_start: usize,
    view_frames: usize,
}

impl AudioBuffer {
    /// Allocate a new, zero-filled buffer.
    pub fn new(
        frames: usize,
        rate: u32,
        format: SampleFormat,
        storage: StorageLayout,
        channels: ChannelLayout,
    ) -> Result<Self> {
        if frames == 0 || channels.channel_count() == 0 {
            return Err(RmeError::new(
                ErrorKind::Resource,
                "AudioBuffer::new",
                "frames and channel count must both be nonzero",
            ));
        }
        let n = channels.channel_count();
        let bps = format.bytes_per_sample();
        let planes = match storage {
            StorageLayout::Planar => (0..n).map(|_| vec![0u8; frames * bps]).collect(),
            StorageLayout::Interleaved => vec![vec![0u8; frames * n * bps]],
        };
        Ok(Self {
            inner: Arc::new(Inner {
                frames,
                rate,
                format,
                storage,
                channels,
                planes,
            }),
            view_start: 0,
            view_frames: frames,
        })
    }

    /// Build a buffer directly from already-filled plane bytes, e.g. when a
    /// decoder produces exact sample data and a zero-then-write pass would
    /// be wasted work. `planes` must have the shape `new` would allocate.
    pub fn from_planes(
        frames: usize,
        rate: u32,
        format: SampleFormat,
        storage: StorageLayout,
        channels: ChannelLayout,
        planes: Vec<Vec<u8>>,
    ) -> Result<Self> {
        let expected_plane_count = match storage {
            StorageLayout::Planar => channels.channel_count(),
            StorageLayout::Interleaved => 1,
        };
        if planes.len() != expected_plane_count {
            return Err(RmeError::new(
                ErrorKind::Resource,
                "AudioBuffer::from_planes",
                "plane count does not match storage layout and channel count",
            ));
        }
        let bps = format.bytes_per_sample();
        let expected_len = match storage {
            StorageLayout::Planar => frames * bps,
            StorageLayout::Interleaved => frames * channels.channel_count() * bps,
        };
        if planes.iter().any(|p| p.len() != expected_len) {
            return Err(RmeError::new(
                ErrorKind::Resource,
                "AudioBuffer::from_planes",
                "plane length does not match frame count and sample format",
            ));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                frames,
                rate,
                format,
                storage,
                channels,
                planes,
            }),
            view_start: 0,
            view_frames: frames,
        })
    }

    pub fn frames(&self) -> usize {
        self.view_frames
    }

    pub fn rate(&self) -> u32 {
        self.inner.rate
    }

    pub fn format(&self) -> SampleFormat {
        self.inner.format
    }

    pub fn storage_layout(&self) -> StorageLayout {
        self.inner.storage
    }

    pub fn channels(&self) -> &ChannelLayout {
        &self.inner.channels
    }

    /// Number of planes: `N` when planar, `1` when interleaved.
    pub fn plane_count(&self) -> usize {
        self.inner.planes.len()
    }

    /// Length in bytes of the visible (view-restricted) portion of plane `i`.
    pub fn plane_len(&self, i: usize) -> usize {
        let bps = self.inner.format.bytes_per_sample();
        match self.inner.storage {
            StorageLayout::Planar => {
                let _ = i;
                self.view_frames * bps
            }
            StorageLayout::Interleaved => self.view_frames * self.inner.channels.channel_count() * bps,
        }
    }

    fn plane_offset(&self) -> usize {
        let bps = self.inner.format.bytes_per_sample();
        match self.inner.storage {
            StorageLayout::Planar => self.view_start * bps,
            StorageLayout::Interleaved => self.view_start * self.inner.channels.channel_count() * bps,
        }
    }

    /// Raw bytes of plane `i`, restricted to this buffer's view.
    pub fn plane_ptr(&self, i: usize) -> &[u8] {
        let offset = self.plane_offset();
        let len = self.plane_len(i);
        &self.inner.planes[i][offset..offset + len]
    }

    /// Raw bytes of channel `c`: for planar storage this is `plane_ptr(c)`;
    /// for interleaved storage it is a strided view into `plane_ptr(0)`
    /// starting at the channel's first sample — callers must stride by
    /// `N * bytes_per_sample` to walk frames.
    pub fn channel_ptr(&self, c: usize) -> &[u8] {
        match self.inner.storage {
            StorageLayout::Planar => self.plane_ptr(c),
            StorageLayout::Interleaved => {
                let bps = self.inner.format.bytes_per_sample();
                let plane = self.plane_ptr(0);
                &plane[c * bps..]
            }
        }
    }

    /// Returns a view over `[start, start+count)` frames of this buffer.
    /// The view shares storage with `self` and keeps it alive; it does not
    /// copy any bytes.
    pub fn view(&self, start: usize, count: usize) -> Result<Self> {
        if start + count > self.view_frames {
            return Err(RmeError::new(
                ErrorKind::Range,
                "AudioBuffer::view",
                "sub-range exceeds buffer extent",
            ));
        }
        Ok(Self {
            inner: Arc::clone(&self.inner),
            view_start: self.view_start + start,
            view_frames: count,
        })
    }

    /// Deep copy of the visible (view-restricted) extent as a standalone
    /// buffer.
    pub fn deep_clone(&self) -> Self {
        let planes = (0..self.plane_count())
            .map(|i| self.plane_ptr(i).to_vec())
            .collect();
        Self {
            inner: Arc::new(Inner {
                frames: self.view_frames,
                rate: self.inner.rate,
                format: self.inner.format,
                storage: self.inner.storage,
                channels: self.inner.channels.clone(),
                planes,
            }),
            view_start: 0,
            view_frames: self.view_frames,
        }
    }

    /// Fill every visible plane byte with zero. Requires this buffer to be
    /// the sole owner of its storage (true for a buffer fresh off `new`
    /// that has not yet been shared along a connection); returns a `State`
    /// error otherwise, matching the "writer writes before publishing" rule.
    pub fn zero(&mut self) -> Result<()> {
        let offset = self.plane_offset();
        let len = self.plane_len(0);
        let inner = Arc::get_mut(&mut self.inner).ok_or_else(|| {
            RmeError::new(
                ErrorKind::State,
                "AudioBuffer::zero",
                "buffer is shared; cannot mutate a published buffer",
            )
        })?;
        for (i, plane) in inner.planes.iter_mut().enumerate() {
            let len = if i == 0 { len } else { self.view_frames * inner.format.bytes_per_sample() };
            plane[offset..offset + len].fill(0);
        }
        Ok(())
    }
}
