use serde::{Deserialize, Serialize};

use crate::ordering::Timeline;

/// Identifier of a script, used to key cached orderings
pub type ScriptId = u32;

/// Visual theme of a reel. The theme decides the music track and the
/// recommended thumbnail trim offset of the finished file; the per-effect
/// drawing itself lives behind the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Kids,
    Carnival,
    Life,
    Memory,
    Romance,
    Sports,
    Vintage,
    City,
}

impl Theme {
    /// Offset into the finished reel that makes a good cover frame, in
    /// milliseconds. Tuned per theme.
    pub fn recommended_trim_offset_ms(&self) -> u64 {
        match self {
            Theme::Kids => 0,
            Theme::Carnival => 17_000,
            Theme::Life => 28_500,
            Theme::Memory => 4_000,
            Theme::Romance => 0,
            Theme::Sports => 21_200,
            Theme::Vintage => 11_000,
            Theme::City => 0,
        }
    }

    /// Identifier of the bundled audio track for this theme
    pub fn audio_track(&self) -> u32 {
        *self as u32
    }
}

/// Kind of one timeline position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// No media content (caption or title card)
    Filler,
    /// Content shown but excluded from repetition accounting
    Uncounted,
    /// Content subject to spacing, adjacency, and repetition rules
    Counted,
}

/// Per-effect-step descriptor from the theme script
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SlotSpec {
    pub kind: SlotKind,

    /// How long the slot is on screen, in milliseconds
    pub duration_ms: u64,

    /// Delay before the slot's effect starts animating, in milliseconds
    pub sleep_ms: u64,
}

impl SlotSpec {
    pub fn counted(duration_ms: u64) -> Self {
        Self {
            kind: SlotKind::Counted,
            duration_ms,
            sleep_ms: 0,
        }
    }

    pub fn uncounted(duration_ms: u64) -> Self {
        Self {
            kind: SlotKind::Uncounted,
            duration_ms,
            sleep_ms: 0,
        }
    }

    pub fn filler(duration_ms: u64) -> Self {
        Self {
            kind: SlotKind::Filler,
            duration_ms,
            sleep_ms: 0,
        }
    }
}

/// A theme's slot list: which timeline positions carry content, which are
/// captions, and how long each one runs.
#[derive(Debug, Clone)]
pub struct Script {
    id: ScriptId,
    theme: Theme,
    slots: Vec<SlotSpec>,
}

impl Script {
    pub fn new(id: ScriptId, theme: Theme, slots: Vec<SlotSpec>) -> Self {
        Self { id, theme, slots }
    }

    /// The stock 30-second slot layout for a theme: a title card, an opening
    /// uncounted beat, a run of counted content slots, and a closing card.
    pub fn standard(theme: Theme) -> Self {
        let mut slots = vec![SlotSpec::filler(1_500), SlotSpec::uncounted(1_500)];
        for _ in 0..12 {
            slots.push(SlotSpec::counted(2_000));
        }
        slots.push(SlotSpec::filler(3_000));
        Self::new(theme as ScriptId, theme, slots)
    }

    pub fn id(&self) -> ScriptId {
        self.id
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn slots(&self) -> &[SlotSpec] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> &SlotSpec {
        &self.slots[index]
    }

    pub fn is_filler(&self, index: usize) -> bool {
        self.slots[index].kind == SlotKind::Filler
    }

    pub fn is_counted(&self, index: usize) -> bool {
        self.slots[index].kind == SlotKind::Counted
    }

    pub fn filler_count(&self) -> usize {
        self.kind_count(SlotKind::Filler)
    }

    pub fn uncounted_count(&self) -> usize {
        self.kind_count(SlotKind::Uncounted)
    }

    pub fn counted_count(&self) -> usize {
        self.kind_count(SlotKind::Counted)
    }

    fn kind_count(&self, kind: SlotKind) -> usize {
        self.slots.iter().filter(|s| s.kind == kind).count()
    }

    /// Re-stamp per-slot durations onto a timeline. Interactive preview can
    /// reassign durations after an ordering was computed; the encode pass
    /// calls this so the timeline carries the script's current timing.
    pub fn apply_timing(&self, timeline: &mut Timeline) {
        for (slot, spec) in timeline.slots_mut().iter_mut().zip(self.slots.iter()) {
            slot.duration_ms = spec.duration_ms;
            slot.sleep_ms = spec.sleep_ms;
        }
    }
}
