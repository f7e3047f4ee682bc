//! Content ordering: which media item occupies which slot of the effect
//! timeline, subject to placement, spacing, and repetition-balance rules.

mod engine;

pub use engine::OrderingEngine;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::{
    media::{FaceRegion, GeoTag, MediaId, MediaItem, MediaKind},
    script::{ScriptId, SlotKind},
};

/// Output canvas dimensions the filler slots are sized to
#[derive(Debug, Clone, Copy)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

/// One entry of the output timeline
#[derive(Debug, Clone)]
pub struct Slot {
    /// Timeline role from the script (filler, uncounted, counted)
    pub kind: SlotKind,

    /// How the slot renders: still image or video sub-clip. Fillers and
    /// adjacency-substituted videos render as images.
    pub media: MediaKind,

    /// Assigned pool item, or `None` for filler slots
    pub item: Option<MediaId>,

    /// Resolved render geometry
    pub width: u32,
    pub height: u32,
    pub center_x: f32,
    pub center_y: f32,

    /// Timing, stamped from the script
    pub duration_ms: u64,
    pub sleep_ms: u64,

    /// Which sub-clip segment a video slot plays
    pub video_part: usize,

    /// Metadata mirrored from the assigned item for the renderer
    pub faces: Vec<FaceRegion>,
    pub captured_at: Option<DateTime<Utc>>,
    pub geo: Option<GeoTag>,

    /// Set when the assignment was replayed from a cached prior ordering, so
    /// downstream geometry is not recomputed.
    pub restored: bool,
}

impl Slot {
    pub fn filler(canvas: Canvas, duration_ms: u64, sleep_ms: u64) -> Self {
        Self {
            kind: SlotKind::Filler,
            media: MediaKind::Image,
            item: None,
            width: canvas.width,
            height: canvas.height,
            center_x: 0.0,
            center_y: 0.0,
            duration_ms,
            sleep_ms,
            video_part: 0,
            faces: Vec::new(),
            captured_at: None,
            geo: None,
            restored: false,
        }
    }

    pub fn image(kind: SlotKind, item: &MediaItem, duration_ms: u64, sleep_ms: u64) -> Self {
        Self {
            kind,
            media: MediaKind::Image,
            item: Some(item.id),
            width: item.width,
            height: item.height,
            center_x: 0.0,
            center_y: 0.0,
            duration_ms,
            sleep_ms,
            video_part: 0,
            faces: item.faces.clone(),
            captured_at: Some(item.captured_at),
            geo: item.geo,
            restored: false,
        }
    }

    pub fn video(item: &MediaItem, part: usize, duration_ms: u64, sleep_ms: u64) -> Self {
        Self {
            kind: SlotKind::Counted,
            media: MediaKind::Video,
            item: Some(item.id),
            width: item.width,
            height: item.height,
            center_x: 0.0,
            center_y: 0.0,
            duration_ms,
            sleep_ms,
            video_part: part,
            faces: Vec::new(),
            captured_at: Some(item.captured_at),
            geo: None,
            restored: false,
        }
    }

    pub fn is_video(&self) -> bool {
        self.media == MediaKind::Video
    }

    pub fn has_content(&self) -> bool {
        self.item.is_some()
    }
}

/// Ordered sequence of slots for one script run
#[derive(Debug, Clone)]
pub struct Timeline {
    script_id: ScriptId,
    slots: Vec<Slot>,
}

impl Timeline {
    pub fn new(script_id: ScriptId) -> Self {
        Self {
            script_id,
            slots: Vec::new(),
        }
    }

    pub fn script_id(&self) -> ScriptId {
        self.script_id
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push(slot);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// Planned duration of the whole timeline in milliseconds
    pub fn total_duration_ms(&self) -> u64 {
        self.slots.iter().map(|s| s.duration_ms).sum()
    }
}

/// The counted-content assignment vector of one prior run, replayed when the
/// same script runs again without shuffle.
#[derive(Debug, Clone)]
pub struct CachedOrder {
    /// Selected item per counted slot, in slot order
    pub assignments: Vec<MediaId>,

    /// Resolved slot centers from the prior run, restored on replay
    pub centers: Vec<(f32, f32)>,
}

/// Per-script store of prior orderings, owned by the engine and cleared on
/// [`OrderCache::reset`].
#[derive(Debug, Default)]
pub struct OrderCache {
    orders: HashMap<ScriptId, CachedOrder>,
}

impl OrderCache {
    pub fn get(&self, script_id: ScriptId) -> Option<&CachedOrder> {
        self.orders.get(&script_id)
    }

    pub fn insert(&mut self, script_id: ScriptId, order: CachedOrder) {
        self.orders.insert(script_id, order);
    }

    pub fn contains(&self, script_id: ScriptId) -> bool {
        self.orders.contains_key(&script_id)
    }

    pub fn reset(&mut self) {
        self.orders.clear();
    }
}
