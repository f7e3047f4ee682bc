//! Contracts for the host-provided media collaborators: the renderer that
//! draws frames, the hardware encoder, the container muxer, and the
//! audio-merge utility. The pipeline drives these; it never interprets
//! renderer or codec internals.

use std::path::Path;

use crate::{
    config::EncodeConfig,
    error::Result,
    ordering::{Canvas, Slot},
};

/// Parameters the encoder is allocated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub bit_rate: u32,
    pub frame_rate: u32,
    pub keyframe_interval_s: u32,
}

impl From<&EncodeConfig> for EncoderSettings {
    fn from(config: &EncodeConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            bit_rate: config.bit_rate,
            frame_rate: config.frame_rate,
            keyframe_interval_s: config.keyframe_interval_s,
        }
    }
}

/// Stream format the encoder announces once it has started producing output.
/// The muxer's video track can only be created from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFormat {
    pub mime: String,
    pub width: u32,
    pub height: u32,
}

/// Metadata attached to one compressed output buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferInfo {
    pub presentation_time_us: i64,
    pub size: usize,
    /// Codec configuration data, already consumed via the format change;
    /// never written to the muxer.
    pub codec_config: bool,
}

/// One poll of the encoder's output side
#[derive(Debug, Clone)]
pub enum PullResult {
    /// No output ready within the poll interval
    Again,
    /// The encoder announced its stream format; must happen exactly once
    FormatChanged(TrackFormat),
    /// A compressed buffer is ready; release it back after copying
    Buffer {
        id: u64,
        info: BufferInfo,
        data: Vec<u8>,
    },
    /// The encoder finished flushing after an end-of-stream request
    EndOfStream,
}

/// Draws timeline slots into the encoder's input surface. Called repeatedly
/// and synchronously from the worker thread. Implementations dispatch per
/// slot, so a host can select an effect strategy from the slot descriptor.
pub trait Renderer: Send {
    /// A slot became active; bind its media and reset effect state
    fn begin_slot(&mut self, slot: &Slot) -> Result<()>;

    /// Draw the frame for the given elapsed time within the active slot
    fn draw(&mut self, elapsed_ms: u64) -> Result<()>;

    /// Timestamp the drawn frame and hand it to the encoder's input
    fn present_frame(&mut self, timestamp_ns: i64) -> Result<()>;

    /// Release the render surface
    fn release(&mut self);
}

/// Compressed video encoder with an asynchronous output queue
pub trait VideoEncoder: Send {
    fn start(&mut self) -> Result<()>;

    /// Signal that no more input frames will arrive
    fn request_end_of_stream(&mut self) -> Result<()>;

    /// Poll for output, waiting at most `timeout_us`
    fn pull_output(&mut self, timeout_us: u64) -> Result<PullResult>;

    /// Return an output buffer to the encoder's pool
    fn release_output_buffer(&mut self, id: u64) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn release(&mut self);
}

/// Container muxer. Starts in a not-yet-started state; the video track is
/// added from the encoder's announced format, then `start` is called once.
pub trait SampleMuxer: Send {
    fn add_track(&mut self, format: &TrackFormat) -> Result<usize>;

    fn start(&mut self) -> Result<()>;

    fn write_sample(&mut self, track: usize, data: &[u8], info: &BufferInfo) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn release(&mut self);
}

/// Merges a video-only file with a bundled audio track into the final reel
pub trait AudioMerger: Send {
    fn merge(&mut self, audio_track: u32, video_path: &Path, output_path: &Path) -> Result<()>;
}

/// Factory for the session's collaborators. The pipeline allocates everything
/// through this during Preparing so a host (or a test) supplies the whole
/// media stack in one place.
pub trait MediaBackend: Send {
    fn create_renderer(&mut self, canvas: Canvas) -> Result<Box<dyn Renderer>>;

    fn create_encoder(&mut self, settings: &EncoderSettings) -> Result<Box<dyn VideoEncoder>>;

    /// Allocate the muxer against the intermediate video-only path. Creation
    /// failure surfaces as `PipelineError::EncoderIo`.
    fn create_muxer(&mut self, video_path: &Path) -> Result<Box<dyn SampleMuxer>>;

    fn create_audio_merger(&mut self) -> Result<Box<dyn AudioMerger>>;
}
