//! Output file placement: collision-free final paths, the hidden sibling
//! path for the video-only intermediate, and terminal-state cleanup.

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use crate::error::Result;

/// Resolved file locations for one encoding session
#[derive(Debug, Clone)]
pub struct OutputPaths {
    /// Final muxed reel
    pub output: PathBuf,

    /// Hidden sibling holding video-only output until the audio merge lands
    pub video: PathBuf,
}

impl OutputPaths {
    /// Pick a collision-free output path in `dir`, named
    /// `<prefix><yyyymmdd>.mp4` with a `_1`, `_2`, … suffix when taken, and
    /// derive the dot-prefixed intermediate next to it.
    pub fn resolve(dir: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let stamp = Local::now().format("%Y%m%d");
        let base = format!("{prefix}{stamp}");
        let output = collision_free(dir, &base);
        let video = hidden_sibling(&output);

        debug!("output resolved to {:?} (intermediate {:?})", output, video);
        Ok(Self { output, video })
    }
}

fn collision_free(dir: &Path, base: &str) -> PathBuf {
    let canonical = dir.join(format!("{base}.mp4"));
    if !canonical.exists() {
        return canonical;
    }

    for i in 1.. {
        let candidate = dir.join(format!("{base}_{i}.mp4"));
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!()
}

fn hidden_sibling(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!(".{name}"))
}

/// Best-effort delete of a partial artifact
pub fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("failed to remove {:?}: {e}", path);
        }
    }
}

/// Remove stray non-final-format files left in the output directory.
/// Runs in every terminal state.
pub fn clear_stray_files(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.contains(".mp4") {
            debug!("removing stray output file {:?}", path);
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("failed to remove stray file {:?}: {e}", path);
            }
        }
    }
}
