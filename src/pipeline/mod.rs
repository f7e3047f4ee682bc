//! The encoding pipeline: drives the frame-by-frame render loop, computes
//! presentation timestamps, drains compressed output into the muxer, and
//! manages pause/cancel/failure semantics, followed by the post-process
//! audio merge.
//!
//! One dedicated worker runs `Preparing -> Running -> Draining -> Finalizing`
//! sequentially; pause, resume, and cancel arrive from a control thread
//! through the shared [`PipelineControl`]. All terminal states converge on
//! the same resource release and cleanup path.

pub mod backend;
pub mod control;
pub mod output;

pub use backend::{
    AudioMerger, BufferInfo, EncoderSettings, MediaBackend, PullResult, Renderer, SampleMuxer,
    TrackFormat, VideoEncoder,
};
pub use control::PipelineControl;
pub use output::OutputPaths;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    config::{Config, EncodeConfig},
    error::{PipelineError, ReelError, Result},
    ordering::{Canvas, Timeline},
    script::Script,
    timer::{SlotTimer, TimerMode},
};

/// Terminal-state callbacks exposed to the surrounding application
pub trait SaveCallback: Send {
    fn on_save_done(&mut self, path: &Path, recommended_trim_offset_ms: u64);
    fn on_cancelled(&mut self);
    fn on_failed(&mut self);
}

/// Mutable per-run state: frame budget accounting and muxer protocol state
#[derive(Debug)]
struct EncodingSession {
    frame_rate: u32,
    total_frames: u64,
    frames_emitted: u64,
    cursor_ns: i64,
    video_track: Option<usize>,
    muxer_started: bool,
    drain_timeout_us: u64,
}

impl EncodingSession {
    fn new(config: &EncodeConfig) -> Self {
        Self {
            frame_rate: config.frame_rate,
            total_frames: config.total_frames(),
            frames_emitted: 0,
            cursor_ns: 0,
            video_track: None,
            muxer_started: false,
            drain_timeout_us: config.drain_timeout_us,
        }
    }

    /// Presentation time of frame `n` within its slot, in milliseconds
    fn presentation_time_ms(&self, frame: u64) -> u64 {
        frame * 1000 / self.frame_rate as u64
    }
}

/// Collaborator handles owned by the worker for the session's lifetime.
/// Handles are taken on release, so a second finalize pass is a no-op.
#[derive(Default)]
struct SessionResources {
    renderer: Option<Box<dyn Renderer>>,
    encoder: Option<Box<dyn VideoEncoder>>,
    muxer: Option<Box<dyn SampleMuxer>>,
}

impl SessionResources {
    /// Best-effort release of everything still held. Errors are logged and
    /// the remaining resources are still released.
    fn finalize(&mut self, muxer_started: bool) {
        if let Some(mut encoder) = self.encoder.take() {
            if let Err(e) = encoder.stop() {
                warn!("encoder stop failed during finalize: {e}");
            }
            encoder.release();
        }

        if let Some(mut renderer) = self.renderer.take() {
            renderer.release();
        }

        if let Some(mut muxer) = self.muxer.take() {
            if muxer_started {
                if let Err(e) = muxer.stop() {
                    warn!("muxer stop failed during finalize: {e}");
                }
            }
            muxer.release();
        }
    }
}

/// Encodes one ordered timeline into a muxed video file
pub struct EncodingPipeline<B: MediaBackend> {
    config: Config,
    script: Script,
    timeline: Timeline,
    backend: B,
    control: Arc<PipelineControl>,
}

impl<B: MediaBackend> EncodingPipeline<B> {
    pub fn new(config: Config, script: Script, timeline: Timeline, backend: B) -> Self {
        Self {
            config,
            script,
            timeline,
            backend,
            control: Arc::new(PipelineControl::new()),
        }
    }

    /// Shared control surface for the thread issuing pause/resume/cancel
    pub fn control(&self) -> Arc<PipelineControl> {
        Arc::clone(&self.control)
    }

    pub fn pause(&self) {
        self.control.pause();
    }

    pub fn resume(&self) {
        self.control.resume();
    }

    /// Run the full session on the calling thread and report the terminal
    /// state through `callback`. Consumes the pipeline; a new export builds a
    /// new one.
    pub fn prepare_and_run(mut self, callback: &mut dyn SaveCallback) {
        let dir = self.config.output.directory.clone();
        let paths = match OutputPaths::resolve(&dir, &self.config.output.file_prefix) {
            Ok(paths) => paths,
            Err(e) => {
                error!("failed to prepare output location: {e}");
                callback.on_failed();
                return;
            }
        };

        info!(
            "🎬 encoding {} slots ({} frames) into {:?}",
            self.timeline.len(),
            self.config.encode.total_frames(),
            paths.output
        );

        let mut session = EncodingSession::new(&self.config.encode);
        let mut resources = SessionResources::default();
        let run_result = self.execute(&paths, &mut session, &mut resources);

        // Finalizing: success, cancellation, and failure all pass through
        // the same release routine.
        debug!("state: finalizing");
        resources.finalize(session.muxer_started);

        match run_result {
            Ok(()) => self.complete(&paths, callback),
            Err(e) => {
                output::remove_if_exists(&paths.video);
                output::remove_if_exists(&paths.output);
                if is_cancellation(&e) {
                    info!("encoding cancelled, partial output removed");
                    callback.on_cancelled();
                } else {
                    error!("encoding failed: {e}");
                    callback.on_failed();
                }
            }
        }

        output::clear_stray_files(&dir);
    }

    /// Preparing, Running, and Draining. Any error unwinds to the caller,
    /// which owns Finalizing.
    fn execute(
        &mut self,
        paths: &OutputPaths,
        session: &mut EncodingSession,
        resources: &mut SessionResources,
    ) -> Result<()> {
        debug!("state: preparing");
        let settings = EncoderSettings::from(&self.config.encode);
        let canvas = Canvas {
            width: settings.width,
            height: settings.height,
        };

        let mut encoder = self.backend.create_encoder(&settings)?;
        encoder.start()?;
        resources.encoder = Some(encoder);
        resources.renderer = Some(self.backend.create_renderer(canvas)?);
        // The muxer stays unstarted: the container needs the format the
        // encoder only announces once it is running.
        resources.muxer = Some(self.backend.create_muxer(&paths.video)?);

        let SessionResources {
            renderer: Some(renderer),
            encoder: Some(encoder),
            muxer: Some(muxer),
        } = resources
        else {
            return Err(PipelineError::Failure {
                reason: "collaborators were not allocated".to_string(),
            }
            .into());
        };

        debug!("state: running");
        let slot_count = self.timeline.len();
        for (index, slot) in self.timeline.slots().iter().enumerate() {
            if session.frames_emitted >= session.total_frames {
                break;
            }

            renderer.begin_slot(slot)?;

            let remaining = session.total_frames - session.frames_emitted;
            let frames_in_slot = if index + 1 == slot_count {
                // The final slot absorbs the rounding remainder exactly.
                remaining
            } else {
                (slot.duration_ms * session.frame_rate as u64 / 1000).min(remaining)
            };
            let interval_ms = frames_in_slot * 1000 / session.frame_rate as u64;
            let mut timer = SlotTimer::new(interval_ms, TimerMode::Encode);

            for frame in 0..frames_in_slot {
                self.control.wait_if_paused()?;

                let elapsed_ms = session.presentation_time_ms(frame);
                timer.set_encode_elapsed(elapsed_ms);
                renderer.draw(elapsed_ms)?;

                // Feed pending encoder output to the muxer between frames.
                if frame + 1 < frames_in_slot {
                    drain(encoder.as_mut(), muxer.as_mut(), session, &self.control, false)?;
                }

                // Rounding can schedule one frame past the planned interval.
                if timer.elapsed() > interval_ms {
                    break;
                }

                let timestamp_ns = session.cursor_ns + elapsed_ms as i64 * 1_000_000;
                renderer.present_frame(timestamp_ns)?;
            }

            session.frames_emitted += frames_in_slot;
            // Advance by the planned interval, not by what actually rendered,
            // so downstream slots keep the intended schedule.
            session.cursor_ns += interval_ms as i64 * 1_000_000;
        }

        debug!("state: draining");
        drain(encoder.as_mut(), muxer.as_mut(), session, &self.control, true)?;
        Ok(())
    }

    /// Completed state: the pre-merge pause-wait, the audio merge, and the
    /// success report.
    fn complete(&mut self, paths: &OutputPaths, callback: &mut dyn SaveCallback) {
        // Second pause-wait point, shared with the in-loop one through the
        // same flag and lock.
        if self.control.wait_if_paused().is_err() {
            output::remove_if_exists(&paths.video);
            output::remove_if_exists(&paths.output);
            info!("encoding cancelled before audio merge");
            callback.on_cancelled();
            return;
        }

        let audio_track = self.script.theme().audio_track();
        let merged = self
            .backend
            .create_audio_merger()
            .and_then(|mut merger| merger.merge(audio_track, &paths.video, &paths.output));

        // The video-only intermediate is never a deliverable.
        output::remove_if_exists(&paths.video);

        match merged {
            Ok(()) => {
                let trim = self.script.theme().recommended_trim_offset_ms();
                info!("✅ reel saved to {:?} (trim offset {}ms)", paths.output, trim);
                callback.on_save_done(&paths.output, trim);
            }
            Err(e) => {
                error!("audio merge failed: {e}");
                output::remove_if_exists(&paths.output);
                callback.on_failed();
            }
        }
    }
}

fn is_cancellation(error: &ReelError) -> bool {
    matches!(error, ReelError::Pipeline(e) if e.is_cancellation())
}

/// Pull pending compressed output from the encoder into the muxer.
///
/// With `end_of_stream` unset this returns as soon as nothing is ready. With
/// it set, end of stream is signalled to the encoder first and the loop spins
/// until the encoder reports end of stream on output. The first format event
/// adds the muxer's single video track and starts it; a second one, or data
/// before the muxer started, is a protocol violation.
fn drain(
    encoder: &mut dyn VideoEncoder,
    muxer: &mut dyn SampleMuxer,
    session: &mut EncodingSession,
    control: &PipelineControl,
    end_of_stream: bool,
) -> Result<()> {
    if end_of_stream {
        debug!("requesting end of stream");
        encoder.request_end_of_stream()?;
    }

    loop {
        if control.is_cancelled() {
            return Err(PipelineError::Cancelled.into());
        }

        match encoder.pull_output(session.drain_timeout_us)? {
            PullResult::Again => {
                if !end_of_stream {
                    break;
                }
                // keep spinning to await end of stream
            }
            PullResult::FormatChanged(format) => {
                if session.muxer_started {
                    return Err(PipelineError::ProtocolViolation {
                        reason: "encoder format changed twice".to_string(),
                    }
                    .into());
                }
                debug!("encoder output format ready: {:?}", format);
                let track = muxer.add_track(&format)?;
                muxer.start()?;
                session.video_track = Some(track);
                session.muxer_started = true;
            }
            PullResult::Buffer { id, info, data } => {
                // Codec configuration was already consumed via the format
                // change; never write it as a sample.
                let write_size = if info.codec_config { 0 } else { info.size };

                if write_size != 0 {
                    if data.is_empty() {
                        return Err(PipelineError::ProtocolViolation {
                            reason: format!("output buffer {id} was empty"),
                        }
                        .into());
                    }
                    let Some(track) = session.video_track else {
                        return Err(PipelineError::ProtocolViolation {
                            reason: "data buffer arrived before muxer start".to_string(),
                        }
                        .into());
                    };
                    muxer.write_sample(track, &data, &info)?;
                }

                encoder.release_output_buffer(id)?;
            }
            PullResult::EndOfStream => {
                if !end_of_stream {
                    warn!("encoder reached end of stream unexpectedly");
                }
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::Slot;
    use crate::script::{Script, SlotSpec, Theme};
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
    use tempfile::tempdir;

    const CANVAS: Canvas = Canvas {
        width: 1280,
        height: 720,
    };

    #[derive(Default)]
    struct Recorder {
        begun_slots: usize,
        presented: Vec<i64>,
        tracks_added: usize,
        muxer_starts: usize,
        samples: Vec<usize>,
        muxer_stops: usize,
        muxer_releases: usize,
        encoder_stops: usize,
        encoder_releases: usize,
        renderer_releases: usize,
        released_buffers: Vec<u64>,
        eos_requested: bool,
        merges: usize,
    }

    type Shared = Arc<Mutex<Recorder>>;

    struct MockRenderer {
        rec: Shared,
    }

    impl Renderer for MockRenderer {
        fn begin_slot(&mut self, _slot: &Slot) -> Result<()> {
            self.rec.lock().unwrap().begun_slots += 1;
            Ok(())
        }

        fn draw(&mut self, _elapsed_ms: u64) -> Result<()> {
            Ok(())
        }

        fn present_frame(&mut self, timestamp_ns: i64) -> Result<()> {
            self.rec.lock().unwrap().presented.push(timestamp_ns);
            Ok(())
        }

        fn release(&mut self) {
            self.rec.lock().unwrap().renderer_releases += 1;
        }
    }

    struct MockEncoder {
        rec: Shared,
        pending: VecDeque<PullResult>,
        eos_requested: bool,
    }

    impl VideoEncoder for MockEncoder {
        fn start(&mut self) -> Result<()> {
            Ok(())
        }

        fn request_end_of_stream(&mut self) -> Result<()> {
            self.eos_requested = true;
            self.rec.lock().unwrap().eos_requested = true;
            Ok(())
        }

        fn pull_output(&mut self, _timeout_us: u64) -> Result<PullResult> {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            if self.eos_requested {
                Ok(PullResult::EndOfStream)
            } else {
                Ok(PullResult::Again)
            }
        }

        fn release_output_buffer(&mut self, id: u64) -> Result<()> {
            self.rec.lock().unwrap().released_buffers.push(id);
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.rec.lock().unwrap().encoder_stops += 1;
            Ok(())
        }

        fn release(&mut self) {
            self.rec.lock().unwrap().encoder_releases += 1;
        }
    }

    struct MockMuxer {
        rec: Shared,
    }

    impl SampleMuxer for MockMuxer {
        fn add_track(&mut self, _format: &TrackFormat) -> Result<usize> {
            self.rec.lock().unwrap().tracks_added += 1;
            Ok(0)
        }

        fn start(&mut self) -> Result<()> {
            self.rec.lock().unwrap().muxer_starts += 1;
            Ok(())
        }

        fn write_sample(&mut self, _track: usize, data: &[u8], _info: &BufferInfo) -> Result<()> {
            self.rec.lock().unwrap().samples.push(data.len());
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.rec.lock().unwrap().muxer_stops += 1;
            Ok(())
        }

        fn release(&mut self) {
            self.rec.lock().unwrap().muxer_releases += 1;
        }
    }

    struct MockMerger {
        rec: Shared,
        fail: bool,
    }

    impl AudioMerger for MockMerger {
        fn merge(&mut self, _audio_track: u32, video: &Path, output: &Path) -> Result<()> {
            if self.fail {
                return Err(PipelineError::MergeFailed {
                    reason: "mock merge failure".to_string(),
                }
                .into());
            }
            let data = std::fs::read(video)?;
            std::fs::write(output, data)?;
            self.rec.lock().unwrap().merges += 1;
            Ok(())
        }
    }

    struct MockBackend {
        rec: Shared,
        encoder_script: VecDeque<PullResult>,
        merger_fails: bool,
    }

    impl MockBackend {
        fn new(rec: Shared, encoder_script: Vec<PullResult>) -> Self {
            Self {
                rec,
                encoder_script: encoder_script.into(),
                merger_fails: false,
            }
        }
    }

    impl MediaBackend for MockBackend {
        fn create_renderer(&mut self, _canvas: Canvas) -> Result<Box<dyn Renderer>> {
            Ok(Box::new(MockRenderer {
                rec: Arc::clone(&self.rec),
            }))
        }

        fn create_encoder(&mut self, _settings: &EncoderSettings) -> Result<Box<dyn VideoEncoder>> {
            Ok(Box::new(MockEncoder {
                rec: Arc::clone(&self.rec),
                pending: std::mem::take(&mut self.encoder_script),
                eos_requested: false,
            }))
        }

        fn create_muxer(&mut self, video_path: &Path) -> Result<Box<dyn SampleMuxer>> {
            // A real muxer allocates the container file up front.
            std::fs::write(video_path, b"video-only")?;
            Ok(Box::new(MockMuxer {
                rec: Arc::clone(&self.rec),
            }))
        }

        fn create_audio_merger(&mut self) -> Result<Box<dyn AudioMerger>> {
            Ok(Box::new(MockMerger {
                rec: Arc::clone(&self.rec),
                fail: self.merger_fails,
            }))
        }
    }

    #[derive(Default)]
    struct CallbackLog {
        saved: Option<(PathBuf, u64)>,
        cancelled: bool,
        failed: bool,
    }

    impl SaveCallback for CallbackLog {
        fn on_save_done(&mut self, path: &Path, recommended_trim_offset_ms: u64) {
            self.saved = Some((path.to_path_buf(), recommended_trim_offset_ms));
        }

        fn on_cancelled(&mut self) {
            self.cancelled = true;
        }

        fn on_failed(&mut self) {
            self.failed = true;
        }
    }

    fn format_event() -> PullResult {
        PullResult::FormatChanged(TrackFormat {
            mime: "video/avc".to_string(),
            width: 1280,
            height: 720,
        })
    }

    fn config_buffer(id: u64) -> PullResult {
        PullResult::Buffer {
            id,
            info: BufferInfo {
                presentation_time_us: 0,
                size: 12,
                codec_config: true,
            },
            data: vec![0u8; 12],
        }
    }

    fn data_buffer(id: u64) -> PullResult {
        PullResult::Buffer {
            id,
            info: BufferInfo {
                presentation_time_us: id as i64 * 20_000,
                size: 64,
                codec_config: false,
            },
            data: vec![1u8; 64],
        }
    }

    fn happy_script() -> Vec<PullResult> {
        vec![format_event(), config_buffer(0), data_buffer(1), data_buffer(2)]
    }

    fn test_config(dir: &Path, duration_ms: u64, frame_rate: u32) -> Config {
        let mut config = Config::default();
        config.output.directory = dir.to_path_buf();
        config.encode.total_duration_ms = duration_ms;
        config.encode.frame_rate = frame_rate;
        config
    }

    fn slot_timeline(durations: &[u64]) -> Timeline {
        let mut timeline = Timeline::new(0);
        for &duration in durations {
            timeline.push(Slot::filler(CANVAS, duration, 0));
        }
        timeline
    }

    fn test_script(durations: &[u64]) -> Script {
        Script::new(
            0,
            Theme::Memory,
            durations.iter().map(|&d| SlotSpec::filler(d)).collect(),
        )
    }

    fn build_pipeline(
        dir: &Path,
        durations: &[u64],
        duration_ms: u64,
        frame_rate: u32,
        encoder_script: Vec<PullResult>,
    ) -> (EncodingPipeline<MockBackend>, Shared) {
        let rec: Shared = Arc::new(Mutex::new(Recorder::default()));
        let backend = MockBackend::new(Arc::clone(&rec), encoder_script);
        let pipeline = EncodingPipeline::new(
            test_config(dir, duration_ms, frame_rate),
            test_script(durations),
            slot_timeline(durations),
            backend,
        );
        (pipeline, rec)
    }

    #[test]
    fn successful_run_saves_and_removes_intermediate() {
        let dir = tempdir().unwrap();
        let (pipeline, rec) =
            build_pipeline(dir.path(), &[400, 300, 250], 1000, 50, happy_script());

        let mut callback = CallbackLog::default();
        pipeline.prepare_and_run(&mut callback);

        let (path, trim) = callback.saved.expect("on_save_done not invoked");
        assert!(path.exists());
        assert_eq!(trim, Theme::Memory.recommended_trim_offset_ms());
        assert!(!callback.cancelled);
        assert!(!callback.failed);

        // The dot-prefixed video-only file is gone after the merge.
        let hidden: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(hidden.is_empty());

        let rec = rec.lock().unwrap();
        assert_eq!(rec.begun_slots, 3);
        assert_eq!(rec.tracks_added, 1);
        assert_eq!(rec.muxer_starts, 1);
        assert_eq!(rec.merges, 1);
        assert!(rec.eos_requested);
        // Config buffer consumed but not written; data buffers written.
        assert_eq!(rec.samples.len(), 2);
        assert_eq!(rec.released_buffers, vec![0, 1, 2]);
    }

    #[test]
    fn frame_budget_is_exact_and_timestamps_increase() {
        let dir = tempdir().unwrap();
        // Planned slot frames are 20 + 15 + 12 = 47; the last slot absorbs
        // the remainder so the budget of 50 is hit exactly.
        let (pipeline, rec) =
            build_pipeline(dir.path(), &[400, 300, 250], 1000, 50, happy_script());

        let mut callback = CallbackLog::default();
        pipeline.prepare_and_run(&mut callback);
        assert!(callback.saved.is_some());

        let rec = rec.lock().unwrap();
        assert_eq!(rec.presented.len(), 50);
        for pair in rec.presented.windows(2) {
            assert!(pair[0] < pair[1], "timestamps must strictly increase");
        }
    }

    #[test]
    fn cancel_during_pause_wait_reports_cancelled_and_cleans_up() {
        let dir = tempdir().unwrap();
        let (pipeline, _rec) =
            build_pipeline(dir.path(), &[500, 500], 1000, 50, happy_script());
        let control = pipeline.control();

        control.pause();
        let worker = thread::spawn(move || {
            let mut callback = CallbackLog::default();
            pipeline.prepare_and_run(&mut callback);
            callback
        });

        // Let the worker reach the first pause-wait, then cancel.
        thread::sleep(Duration::from_millis(50));
        control.cancel();
        let callback = worker.join().unwrap();

        assert!(callback.cancelled);
        assert!(!callback.failed);
        assert!(callback.saved.is_none());

        // No partial artifacts survive cancellation.
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert!(leftovers.is_empty(), "leftover files: {leftovers:?}");
    }

    #[test]
    fn pause_then_resume_completes_normally() {
        let dir = tempdir().unwrap();
        let (pipeline, _rec) =
            build_pipeline(dir.path(), &[500, 500], 1000, 50, happy_script());
        let control = pipeline.control();

        control.pause();
        let worker = thread::spawn(move || {
            let mut callback = CallbackLog::default();
            pipeline.prepare_and_run(&mut callback);
            callback
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!worker.is_finished());
        control.resume();

        let callback = worker.join().unwrap();
        assert!(callback.saved.is_some());
    }

    #[test]
    fn second_format_change_fails_the_pipeline() {
        let dir = tempdir().unwrap();
        let script = vec![
            format_event(),
            config_buffer(0),
            data_buffer(1),
            format_event(),
        ];
        let (pipeline, _rec) = build_pipeline(dir.path(), &[1000], 1000, 10, script);

        let mut callback = CallbackLog::default();
        pipeline.prepare_and_run(&mut callback);

        assert!(callback.failed);
        assert!(!callback.cancelled);
        assert!(callback.saved.is_none());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert!(leftovers.is_empty(), "leftover files: {leftovers:?}");
    }

    #[test]
    fn data_before_muxer_start_is_a_protocol_violation() {
        let dir = tempdir().unwrap();
        let script = vec![data_buffer(1)];
        let (pipeline, rec) = build_pipeline(dir.path(), &[1000], 1000, 10, script);

        let mut callback = CallbackLog::default();
        pipeline.prepare_and_run(&mut callback);

        assert!(callback.failed);
        assert_eq!(rec.lock().unwrap().samples.len(), 0);
    }

    #[test]
    fn merge_failure_reports_failed_and_removes_output() {
        let dir = tempdir().unwrap();
        let rec: Shared = Arc::new(Mutex::new(Recorder::default()));
        let mut backend = MockBackend::new(Arc::clone(&rec), happy_script());
        backend.merger_fails = true;

        let pipeline = EncodingPipeline::new(
            test_config(dir.path(), 1000, 50),
            test_script(&[500, 500]),
            slot_timeline(&[500, 500]),
            backend,
        );

        let mut callback = CallbackLog::default();
        pipeline.prepare_and_run(&mut callback);

        assert!(callback.failed);
        assert!(callback.saved.is_none());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert!(leftovers.is_empty(), "leftover files: {leftovers:?}");
    }

    #[test]
    fn finalize_twice_releases_each_resource_once() {
        let rec: Shared = Arc::new(Mutex::new(Recorder::default()));
        let mut resources = SessionResources {
            renderer: Some(Box::new(MockRenderer {
                rec: Arc::clone(&rec),
            })),
            encoder: Some(Box::new(MockEncoder {
                rec: Arc::clone(&rec),
                pending: VecDeque::new(),
                eos_requested: false,
            })),
            muxer: Some(Box::new(MockMuxer {
                rec: Arc::clone(&rec),
            })),
        };

        resources.finalize(true);
        resources.finalize(true);

        let rec = rec.lock().unwrap();
        assert_eq!(rec.encoder_stops, 1);
        assert_eq!(rec.encoder_releases, 1);
        assert_eq!(rec.renderer_releases, 1);
        assert_eq!(rec.muxer_stops, 1);
        assert_eq!(rec.muxer_releases, 1);
    }

    #[test]
    fn unstarted_muxer_is_released_without_stop() {
        let rec: Shared = Arc::new(Mutex::new(Recorder::default()));
        let mut resources = SessionResources {
            renderer: None,
            encoder: None,
            muxer: Some(Box::new(MockMuxer {
                rec: Arc::clone(&rec),
            })),
        };

        resources.finalize(false);

        let rec = rec.lock().unwrap();
        assert_eq!(rec.muxer_stops, 0);
        assert_eq!(rec.muxer_releases, 1);
    }

    #[test]
    fn stray_files_are_cleared_in_terminal_states() {
        let dir = tempdir().unwrap();
        let stray = dir.path().join("scratch.bin");
        std::fs::write(&stray, b"junk").unwrap();

        let (pipeline, _rec) = build_pipeline(dir.path(), &[1000], 1000, 10, happy_script());
        let mut callback = CallbackLog::default();
        pipeline.prepare_and_run(&mut callback);

        assert!(callback.saved.is_some());
        assert!(!stray.exists());
    }
}
