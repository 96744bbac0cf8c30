//! Map live "nearest full-route index" readings onto the key waypoints.

use serde::Serialize;

use super::reducer::KeyRoute;
use crate::models::TrackPosition;

/// Largest key index whose full-route index is at or before `nearest`.
/// `nearest` is clamped into the route first, so out-of-range readings still count.
pub fn segment_at(full_indices: &[usize], full_length: usize, nearest: i64) -> usize {
    let last = full_length.saturating_sub(1) as i64;
    let nearest = nearest.clamp(0, last) as usize;
    full_indices
        .iter()
        .rposition(|&index| index <= nearest)
        .unwrap_or(0)
}

/// What the progress graph shows right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub segment: usize,
    pub total: usize,
    pub current: String,
    pub next: Option<String>,
    pub message: Option<String>,
}

/// Keeps the high-water segment so GPS noise never moves progress backwards.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    route: KeyRoute,
    segment: usize,
    message: Option<String>,
}

impl ProgressTracker {
    pub fn new(route: KeyRoute) -> Self {
        Self {
            route,
            segment: 0,
            message: None,
        }
    }

    /// Fold one poll result in. `None` clears the status message but keeps progress.
    pub fn observe(&mut self, position: Option<&TrackPosition>) -> Progress {
        match position {
            Some(pos) => {
                let nearest = pos.nearest_index.unwrap_or(0);
                let segment = segment_at(&self.route.full_indices, self.route.full_length, nearest);
                self.segment = self.segment.max(segment);
                self.message = Some(pos.message.clone()).filter(|m| !m.is_empty());
            }
            None => self.message = None,
        }
        self.progress()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            segment: self.segment,
            total: self.route.len(),
            current: self.route.labels[self.segment].clone(),
            next: self.route.labels.get(self.segment + 1).cloned(),
            message: self.message.clone(),
        }
    }
}
