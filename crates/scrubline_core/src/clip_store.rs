use crate::error::{CoreError, Result};
use crate::types::*;
use std::collections::HashSet;

/// Id of the clip seeded from the bound media's duration.
pub const MEDIA_CLIP_ID: &str = "main-video";
pub const MEDIA_CLIP_LABEL: &str = "Video Track";
pub const MEDIA_CLIP_COLOR: &str = "bg-slate-600";

/// Ordered clips sharing one occupancy track.
///
/// Order is stable: clips are relocated in place and never reordered, so
/// anything keyed on position (render order, store-order collision passes)
/// stays put for the whole session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipStore {
    clips: Vec<Clip>,
}

impl ClipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection. Rejects empty or negative durations,
    /// negative starts, duplicate ids, and overlapping intervals; the store is
    /// left untouched on error.
    pub fn replace_all(&mut self, clips: Vec<Clip>) -> Result<()> {
        let mut seen = HashSet::new();
        for clip in &clips {
            if clip.duration_us <= TimeUs::ZERO {
                return Err(CoreError::InvalidDuration(clip.duration_us.as_seconds()));
            }
            if clip.start_us < TimeUs::ZERO {
                return Err(CoreError::InvalidStart(clip.start_us));
            }
            if !seen.insert(&clip.id) {
                return Err(CoreError::DuplicateClip(clip.id.clone()));
            }
        }
        if has_overlap(&clips) {
            return Err(CoreError::OverlapDetected);
        }
        self.clips = clips;
        Ok(())
    }

    /// Seed the store with one clip spanning `[0, duration)` of the bound media.
    pub fn seed_from_media(&mut self, duration_secs: f64) -> Result<ClipId> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(CoreError::InvalidDuration(duration_secs));
        }
        let clip = Clip::new(
            MEDIA_CLIP_ID,
            TimeUs::ZERO,
            TimeUs::from_seconds(duration_secs),
            MEDIA_CLIP_LABEL,
            MEDIA_CLIP_COLOR,
        );
        let id = clip.id.clone();
        self.replace_all(vec![clip])?;
        Ok(id)
    }

    /// Set a clip's start in place. No overlap check; see [`move_clip`](Self::move_clip).
    pub fn update_start_time(&mut self, id: &ClipId, new_start_us: TimeUs) -> Result<()> {
        let clip = self
            .clips
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| CoreError::ClipNotFound(id.clone()))?;
        clip.start_us = new_start_us;
        Ok(())
    }

    /// Relocate a clip, refusing positions that would overlap another clip.
    pub fn move_clip(&mut self, id: &ClipId, new_start_us: TimeUs) -> Result<()> {
        if new_start_us < TimeUs::ZERO {
            return Err(CoreError::InvalidStart(new_start_us));
        }
        let clip = self
            .find_by_id(id)
            .ok_or_else(|| CoreError::ClipNotFound(id.clone()))?;
        let duration = clip.duration_us;
        if self
            .all_except(id)
            .any(|other| other.overlaps(new_start_us, duration))
        {
            return Err(CoreError::OverlapDetected);
        }
        self.update_start_time(id, new_start_us)
    }

    pub fn find_by_id(&self, id: &ClipId) -> Option<&Clip> {
        self.clips.iter().find(|c| &c.id == id)
    }

    /// Every clip but `id`, in store order.
    pub fn all_except<'a>(&'a self, id: &'a ClipId) -> impl Iterator<Item = &'a Clip> + 'a {
        self.clips.iter().filter(move |c| &c.id != id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clip> {
        self.clips.iter()
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

fn has_overlap(clips: &[Clip]) -> bool {
    let mut sorted: Vec<&Clip> = clips.iter().collect();
    sorted.sort_by_key(|c| c.start_us);
    sorted.windows(2).any(|w| w[0].end_us() > w[1].start_us)
}
