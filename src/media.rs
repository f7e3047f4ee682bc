use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MediaError, Result};

/// Identifier of a media item within one pool
pub type MediaId = u32;

/// Kind of a pool entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// One detected face region, in pixel coordinates of the source media
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Optional geo tag captured with the media
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTag {
    pub latitude: f64,
    pub longitude: f64,
}

/// One entry of the media pool. Immutable after load; owned by the pool for
/// the duration of one assembly session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub kind: MediaKind,
    pub width: u32,
    pub height: u32,

    /// Capture date, used for chronological placement
    pub captured_at: DateTime<Utc>,

    /// Detected face regions, if any
    #[serde(default)]
    pub faces: Vec<FaceRegion>,

    #[serde(default)]
    pub geo: Option<GeoTag>,

    /// Candidate seek offsets for video sub-clips, in milliseconds
    #[serde(default)]
    pub seek_offsets_ms: Vec<u64>,

    /// Still image substituted when adjacency rules forbid this video
    #[serde(default)]
    pub fallback_image: Option<MediaId>,
}

impl MediaItem {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    /// Number of sub-clip segments this item can supply. Images have none.
    pub fn segment_count(&self) -> usize {
        self.seek_offsets_ms.len()
    }
}

/// Read-only pool of media items for one assembly session, kept sorted by
/// capture date so chronological placement can drain it front to back.
#[derive(Debug, Clone, Default)]
pub struct MediaPool {
    items: Vec<MediaItem>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    items: Vec<MediaItem>,
}

impl MediaPool {
    pub fn new(mut items: Vec<MediaItem>) -> Self {
        items.sort_by_key(|item| item.captured_at);
        Self { items }
    }

    /// Load a pool from a TOML manifest. Decoding the actual pixel data is the
    /// renderer's business; the manifest carries only metadata.
    pub fn from_manifest<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| MediaError::ManifestNotFound {
            path: path.display().to_string(),
        })?;

        let manifest: Manifest =
            toml::from_str(&content).map_err(|e| MediaError::ManifestParse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let pool = Self::new(manifest.items);
        pool.validate()?;

        debug!("Loaded media pool: {} items", pool.len());
        Ok(pool)
    }

    fn validate(&self) -> Result<()> {
        for item in &self.items {
            if item.width == 0 || item.height == 0 {
                return Err(MediaError::InvalidItem {
                    id: item.id,
                    reason: "zero-sized media".to_string(),
                }
                .into());
            }

            if item.is_video() {
                if item.seek_offsets_ms.is_empty() {
                    return Err(MediaError::InvalidItem {
                        id: item.id,
                        reason: "video item has no seek offsets".to_string(),
                    }
                    .into());
                }
                if item.fallback_image.is_none() {
                    warn!(
                        "video item {} has no fallback image; it cannot occupy \
                         first, last, or post-video slots",
                        item.id
                    );
                }
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in capture-date order
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn get(&self, id: MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of distinct video items in the pool
    pub fn video_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_video()).count()
    }
}
