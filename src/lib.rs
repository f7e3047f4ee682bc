//! # Microreel
//!
//! Assemble short slideshow reels from a pool of photos and video clips:
//! pick which media fills each themed timeline slot, then encode the
//! timeline into a muxed video with the theme's music merged in.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use microreel::{
//!     config::Config,
//!     media::MediaPool,
//!     ordering::{Canvas, OrderingEngine},
//!     script::{Script, Theme},
//! };
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let pool = MediaPool::from_manifest("media.toml")?;
//! let script = Script::standard(Theme::Memory);
//!
//! let mut engine = OrderingEngine::new(config.ordering.clone());
//! let canvas = Canvas { width: config.encode.width, height: config.encode.height };
//! let timeline = engine.compute_order(&pool, &script, canvas, true)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - [`media`] - The media pool: items, manifests, chronological order
//! - [`ordering`] - Slot assignment with placement and spacing rules
//! - [`script`] - Theme scripts: slot kinds and timing
//! - [`pipeline`] - The encoding state machine and its collaborators
//! - [`timer`] - Per-slot elapsed-time tracking
//! - [`config`] - Configuration management
//!
//! The pipeline never touches codecs directly; a host supplies the renderer,
//! encoder, muxer, and audio merger through the
//! [`MediaBackend`](pipeline::MediaBackend) trait.

pub mod config;
pub mod error;
pub mod media;
pub mod ordering;
pub mod pipeline;
pub mod script;
pub mod timer;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    error::{ReelError, Result},
    media::MediaPool,
    ordering::{OrderingEngine, Timeline},
    pipeline::{EncodingPipeline, MediaBackend, PipelineControl, SaveCallback},
    script::{Script, Theme},
};
