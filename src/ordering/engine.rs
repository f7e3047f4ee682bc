use std::collections::HashMap;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::{
    config::OrderingConfig,
    error::{OrderingError, Result},
    media::{MediaId, MediaItem, MediaPool},
    ordering::{CachedOrder, Canvas, OrderCache, Slot, Timeline},
    script::{Script, SlotKind},
};

/// Sizes of the five contiguous placement bands a non-shuffled run partitions
/// its counted slots into. Start, center, and end drain the chronological
/// bucket; the two half bands are filled by windowed random selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bands {
    pub start: usize,
    pub first_half: usize,
    pub center: usize,
    pub last_half: usize,
    pub end: usize,
}

impl Bands {
    fn empty() -> Self {
        Self {
            start: 0,
            first_half: 0,
            center: 0,
            last_half: 0,
            end: 0,
        }
    }

    pub(crate) fn total(&self) -> usize {
        self.start + self.first_half + self.center + self.last_half + self.end
    }
}

/// Partition `counted` slots into placement bands. Start, center, and end get
/// a sixth each; the halves split what is left, with the second half taking
/// the remainder.
pub(crate) fn partition_bands(counted: usize) -> Bands {
    let sixth = counted / 6;
    let start = sixth;
    let center = sixth;
    let end = sixth;
    let first_half = (counted - start - center - end) / 2;
    let last_half = counted - start - center - end - first_half;
    Bands {
        start,
        first_half,
        center,
        last_half,
        end,
    }
}

/// Trim the chronological bucket down to the items the start, center, and end
/// bands will consume: keep the first `start`, a middle run of `center`, and
/// the last `end` entries.
fn prune_chronological(bucket: &mut Vec<MediaId>, bands: &Bands) {
    let reserved = bands.start + bands.center + bands.end;
    if bucket.len() <= reserved {
        return;
    }

    let surplus = bucket.len() - reserved;
    for _ in 0..surplus / 2 {
        bucket.remove(bands.start);
    }
    for _ in 0..(surplus - surplus / 2) {
        bucket.remove(bands.start + bands.center);
    }
}

/// How many upcoming chronological-bucket heads the random picker must leave
/// alone so the center and end bands are not starved.
fn lookahead_reserve(bands: &Bands, lookback: usize) -> usize {
    let range = lookback as isize;
    let mut pos: isize = 0;

    if bands.first_half > 0 {
        if (bands.first_half as isize) - 1 < range {
            pos = range - ((bands.first_half as isize) - 1);
        }
        if (bands.center as isize) < pos {
            pos = bands.center as isize;
        }
    } else {
        if (bands.last_half as isize) - 1 < range {
            pos = range - ((bands.last_half as isize) - 1);
        }
        if (bands.end as isize) < pos {
            pos = bands.end as isize;
        }
    }

    pos.max(0) as usize
}

/// Last `lookback` distinct content item ids already placed on the timeline,
/// most recent first.
fn recent_items(timeline: &Timeline, lookback: usize) -> Vec<MediaId> {
    let mut seen = Vec::new();
    for slot in timeline.slots().iter().rev() {
        if let Some(id) = slot.item {
            if !seen.contains(&id) {
                seen.push(id);
                if seen.len() == lookback {
                    break;
                }
            }
        }
    }
    seen
}

/// Selects, for each slot of a script's effect timeline, the media item that
/// occupies it. Owns the per-script cache of prior orderings and the
/// per-video sub-clip cursors.
pub struct OrderingEngine {
    config: OrderingConfig,
    cache: OrderCache,
    rng: SmallRng,
    segment_cursors: HashMap<MediaId, usize>,
}

impl OrderingEngine {
    pub fn new(config: OrderingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self {
            config,
            cache: OrderCache::default(),
            rng,
            segment_cursors: HashMap::new(),
        }
    }

    /// Forget cached orderings and sub-clip cursors
    pub fn reset(&mut self) {
        self.cache.reset();
        self.segment_cursors.clear();
    }

    pub fn cache(&self) -> &OrderCache {
        &self.cache
    }

    /// Produce an ordered timeline for `script` from `pool`.
    ///
    /// Filler slots are sized to the canvas and carry no item. Uncounted
    /// slots take a uniformly random item outside the repetition budget.
    /// Counted slots run the placement policy: cached replay when the same
    /// script re-runs without shuffle, chronological placement bands when the
    /// pool supports them, windowed random selection otherwise. Video items
    /// never open or close the timeline and never play back to back; a
    /// forbidden position substitutes the video's fallback still instead.
    pub fn compute_order(
        &mut self,
        pool: &MediaPool,
        script: &Script,
        canvas: Canvas,
        shuffle: bool,
    ) -> Result<Timeline> {
        if pool.is_empty() {
            return Err(OrderingError::InsufficientContent {
                reason: "media pool is empty".to_string(),
            }
            .into());
        }

        let slot_count = script.slot_count();
        let counted_total = script.counted_count();
        let pool_len = pool.len();
        let mut shuffle = shuffle;

        // A cached order only fits a script whose counted shape is unchanged;
        // a stale entry for a reshaped script is recomputed and overwritten.
        let replay: Option<CachedOrder> = if !shuffle {
            self.cache
                .get(script.id())
                .filter(|cached| cached.assignments.len() == counted_total)
                .cloned()
        } else {
            None
        };

        let mut chrono: Vec<MediaId> = pool.items().iter().map(|item| item.id).collect();
        let mut bands = Bands::empty();

        if replay.is_none() && !shuffle {
            if pool_len < counted_total / 2 {
                // Too few items to fill the placement bands meaningfully.
                debug!("pool of {pool_len} too small for banded placement, shuffling");
                shuffle = true;
            } else if pool_len < slot_count {
                bands = partition_bands(counted_total);
                prune_chronological(&mut chrono, &bands);
                debug!(
                    "placement bands: start={} first_half={} center={} last_half={} end={}",
                    bands.start, bands.first_half, bands.center, bands.last_half, bands.end
                );
            }
        }

        let mut use_counts: HashMap<MediaId, u32> = HashMap::new();
        let mut timeline = Timeline::new(script.id());
        let mut assignments = Vec::with_capacity(counted_total);
        let mut centers = Vec::with_capacity(counted_total);
        let mut past_video = false;
        let mut counted_idx = 0usize;

        for i in 0..slot_count {
            let spec = *script.slot(i);

            if spec.kind == SlotKind::Filler {
                timeline.push(Slot::filler(canvas, spec.duration_ms, spec.sleep_ms));
                continue;
            }

            if spec.kind == SlotKind::Uncounted {
                // Shown but outside the repetition budget.
                let item = &pool.items()[self.rng.gen_range(0..pool_len)];
                timeline.push(Slot::image(
                    SlotKind::Uncounted,
                    item,
                    spec.duration_ms,
                    spec.sleep_ms,
                ));
                continue;
            }

            let (selected, restored, center) = if let Some(cached) = replay.as_ref() {
                (
                    cached.assignments[counted_idx],
                    true,
                    Some(cached.centers[counted_idx]),
                )
            } else if shuffle {
                let exclusion = recent_items(&timeline, self.config.lookback);
                (self.windowed_pick(pool, &use_counts, &exclusion), false, None)
            } else if pool_len >= slot_count {
                // Enough items for strict chronological placement.
                (pool.items()[i].id, false, None)
            } else if !chrono.is_empty()
                && (bands.start > 0
                    || (bands.first_half == 0 && bands.center > 0)
                    || (bands.last_half == 0 && bands.end > 0))
            {
                let id = chrono.remove(0);
                if bands.start > 0 {
                    bands.start -= 1;
                } else if bands.first_half == 0 && bands.center > 0 {
                    bands.center -= 1;
                } else {
                    bands.end -= 1;
                }
                (id, false, None)
            } else {
                let mut exclusion = recent_items(&timeline, self.config.lookback);
                let reserve = lookahead_reserve(&bands, self.config.lookback).min(chrono.len());
                exclusion.extend_from_slice(&chrono[..reserve]);

                let id = self.windowed_pick(pool, &use_counts, &exclusion);
                if bands.first_half > 0 {
                    bands.first_half -= 1;
                } else if bands.last_half > 0 {
                    bands.last_half -= 1;
                }
                (id, false, None)
            };

            let item = pool
                .get(selected)
                .ok_or(OrderingError::UnknownItem { id: selected })?;

            let mut slot =
                self.place_counted(item, pool, &spec, counted_idx, counted_total, &mut past_video);
            slot.restored = restored;
            if let Some((x, y)) = center {
                slot.center_x = x;
                slot.center_y = y;
            }

            *use_counts.entry(selected).or_insert(0) += 1;
            assignments.push(selected);
            centers.push((slot.center_x, slot.center_y));
            counted_idx += 1;
            timeline.push(slot);
        }

        self.cache
            .insert(script.id(), CachedOrder { assignments, centers });

        info!(
            "ordered {} slots ({} counted) from pool of {}, shuffle={}",
            slot_count, counted_total, pool_len, shuffle
        );

        Ok(timeline)
    }

    /// Re-resolve a previously computed ordering against the current pool
    /// and the script's current timing.
    ///
    /// Interactive duration edits re-time the script without changing the
    /// assignment; before encoding, each slot takes its duration from the
    /// script again and has its media metadata refreshed by id lookup, while
    /// the assignment order, render kinds, and sub-clip indices are
    /// preserved. Filler slots keep no metadata but are re-timed too.
    pub fn recompute_for_new_timing(
        &self,
        prior: &Timeline,
        pool: &MediaPool,
        script: &Script,
    ) -> Result<Timeline> {
        let mut timeline = Timeline::new(prior.script_id());

        for (i, slot) in prior.slots().iter().enumerate() {
            let mut refreshed = match slot.item {
                None => slot.clone(),
                Some(id) => {
                    let item = pool.get(id).ok_or(OrderingError::UnknownItem { id })?;
                    let mut s = slot.clone();
                    s.width = item.width;
                    s.height = item.height;
                    s.captured_at = Some(item.captured_at);
                    if !s.is_video() {
                        s.faces = item.faces.clone();
                        s.geo = item.geo;
                    }
                    s
                }
            };
            if i < script.slot_count() {
                let spec = script.slot(i);
                refreshed.duration_ms = spec.duration_ms;
                refreshed.sleep_ms = spec.sleep_ms;
            }
            timeline.push(refreshed);
        }

        Ok(timeline)
    }

    /// Uniform pick among the least-used pool items, avoiding the exclusion
    /// window when that leaves anything to choose from.
    ///
    /// Restricting candidates to the current minimum use count keeps item
    /// repetition within one round of the pool, which gives the
    /// `ceil(counted / distinct)` bound.
    fn windowed_pick(
        &mut self,
        pool: &MediaPool,
        use_counts: &HashMap<MediaId, u32>,
        exclusion: &[MediaId],
    ) -> MediaId {
        let count_of = |id: MediaId| *use_counts.get(&id).unwrap_or(&0);

        let min = pool
            .items()
            .iter()
            .map(|item| count_of(item.id))
            .min()
            .unwrap_or(0);

        let eligible: Vec<MediaId> = pool
            .items()
            .iter()
            .map(|item| item.id)
            .filter(|&id| count_of(id) == min)
            .collect();

        let preferred: Vec<MediaId> = eligible
            .iter()
            .copied()
            .filter(|id| !exclusion.contains(id))
            .collect();

        let candidates = if preferred.is_empty() { &eligible } else { &preferred };
        candidates[self.rng.gen_range(0..candidates.len())]
    }

    /// Build the slot for an accepted counted pick, applying the video
    /// adjacency rule and advancing the item's sub-clip cursor.
    fn place_counted(
        &mut self,
        item: &MediaItem,
        pool: &MediaPool,
        spec: &crate::script::SlotSpec,
        counted_idx: usize,
        counted_total: usize,
        past_video: &mut bool,
    ) -> Slot {
        if !item.is_video() {
            *past_video = false;
            return Slot::image(SlotKind::Counted, item, spec.duration_ms, spec.sleep_ms);
        }

        let forbidden = counted_idx == 0 || *past_video || counted_idx + 1 == counted_total;
        let part = self.advance_segment_cursor(item);

        if forbidden {
            *past_video = false;
            match item.fallback_image.and_then(|id| pool.get(id)) {
                Some(fallback) => {
                    Slot::image(SlotKind::Counted, fallback, spec.duration_ms, spec.sleep_ms)
                }
                // No designated still: show the video's own poster frame.
                None => Slot::image(SlotKind::Counted, item, spec.duration_ms, spec.sleep_ms),
            }
        } else {
            *past_video = true;
            Slot::video(item, part, spec.duration_ms, spec.sleep_ms)
        }
    }

    /// Round-robin cursor over a video's candidate seek offsets
    fn advance_segment_cursor(&mut self, item: &MediaItem) -> usize {
        let segments = item.segment_count().max(1);
        let cursor = self.segment_cursors.entry(item.id).or_insert(0);
        let part = *cursor;
        *cursor = (*cursor + 1) % segments;
        part
    }
}
