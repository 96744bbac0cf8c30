//! Session snapshot for the host display and the control API.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::models::{MusicTrack, PlayPhase, SessionState, TrackPosition};
use crate::route::{Progress, ProgressTracker};
use crate::session::SessionNotice;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub phase: Option<PlayPhase>,
    pub news_index: usize,
    pub news_total: usize,
    pub caption: Option<String>,
    pub now_playing: Option<MusicTrack>,
    pub progress: Option<Progress>,
}

impl SessionSnapshot {
    pub fn apply(&mut self, notice: &SessionNotice) {
        match notice {
            SessionNotice::Phase {
                phase,
                news_index,
                news_total,
            } => {
                self.phase = Some(*phase);
                self.news_index = *news_index;
                self.news_total = *news_total;
                if !phase.is_speech() {
                    self.caption = None;
                }
            }
            SessionNotice::State(state) => self.state = *state,
            SessionNotice::Caption(text) => self.caption = Some(text.clone()),
            SessionNotice::NowPlaying(track) => self.now_playing = track.clone(),
            SessionNotice::Ended { .. } => {
                self.caption = None;
                self.now_playing = None;
            }
        }
    }
}

/// Fold session notices into the snapshot until the session goes away.
pub async fn relay_notices(
    mut notices: mpsc::UnboundedReceiver<SessionNotice>,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
) {
    while let Some(notice) = notices.recv().await {
        match &notice {
            SessionNotice::Caption(text) => info!("Narration: {text}"),
            SessionNotice::NowPlaying(Some(track)) => info!("Track: {} ({})", track.title, track.channel),
            _ => {}
        }
        snapshot.send_modify(|s| s.apply(&notice));
    }
}

/// Fold tracking results into route progress until the poller goes away.
pub async fn relay_progress(
    mut positions: watch::Receiver<Option<TrackPosition>>,
    mut tracker: ProgressTracker,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
) {
    let initial = tracker.progress();
    snapshot.send_modify(|s| s.progress = Some(initial));

    while positions.changed().await.is_ok() {
        let position = positions.borrow_and_update().clone();
        let before = tracker.progress().segment;
        let progress = tracker.observe(position.as_ref());
        if progress.segment != before {
            info!(
                "Route progress: {} ({}/{})",
                progress.current,
                progress.segment + 1,
                progress.total
            );
        }
        snapshot.send_modify(|s| s.progress = Some(progress));
    }
}
