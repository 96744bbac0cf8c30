//! Music player: choose a query, find a track, hand it to the host video
//! player and report when it ends.
//!
//! The opening track plays once per session. After that, tracks come in
//! cycles of `music_ratio`, each drawn from the cyclic phrase list.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::queries::{phrase_at, query_for_weather, FALLBACK_MUSIC_QUERY, MUSIC_SEARCH_PHRASES};
use super::{Completion, PlaybackOutcome, RunCounter, RunId, VideoHost, VideoInstance};
use crate::backend::CommuteBackend;
use crate::error::BackendError;
use crate::models::MusicTrack;
use crate::session::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Opening,
    Cycle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicStart {
    /// Search for `query` and report back with this run.
    Search { run: RunId, query: String },
    Playing(MusicTrack),
    /// The player could not be created; go to the news phase.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicStep {
    Ignored,
    Playing(MusicTrack),
    /// More songs left in this cycle.
    LoadNext,
    /// Go to the news phase with the current segments.
    ToNews,
    /// Fetch fresh news, then go to the news phase.
    RefreshNews,
}

pub struct MusicPlayer<V: VideoHost> {
    host: V,
    events: mpsc::UnboundedSender<SessionEvent>,
    runs: RunCounter,
    music_ratio: u32,
    remaining: u32,
    phrase_cursor: usize,
    slot: Slot,
    instance: Option<V::Instance>,
    paused: bool,
}

impl<V: VideoHost> MusicPlayer<V> {
    pub fn new(host: V, music_ratio: u32, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            host,
            events,
            runs: RunCounter::default(),
            music_ratio: music_ratio.max(1),
            remaining: 0,
            phrase_cursor: 0,
            slot: Slot::Opening,
            instance: None,
            paused: false,
        }
    }

    #[cfg(test)]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[cfg(test)]
    pub fn phrase_cursor(&self) -> usize {
        self.phrase_cursor
    }

    /// Opening track: a pre-selected track wins, otherwise search by weather.
    pub fn open(
        &mut self,
        preselected: Option<MusicTrack>,
        weather: &str,
        news_count: usize,
        weekday: chrono::Weekday,
    ) -> MusicStart {
        self.slot = Slot::Opening;
        let run = self.runs.next();
        match preselected {
            Some(track) => {
                info!("Opening with pre-selected track: {}", track.title);
                match self.load(run, track) {
                    Some(track) => MusicStart::Playing(track),
                    None => MusicStart::Failed,
                }
            }
            None => {
                let pick = query_for_weather(weather, news_count, weekday);
                info!("Opening track search \"{}\": {}", pick.query, pick.concept);
                MusicStart::Search {
                    run,
                    query: pick.query.to_string(),
                }
            }
        }
    }

    /// Begin a music cycle of `music_ratio` songs.
    pub fn start_cycle(&mut self) -> MusicStart {
        self.remaining = self.music_ratio;
        debug!("Music cycle started: {} songs", self.remaining);
        self.next_track()
    }

    /// Draw the next cyclic phrase and request a search for it.
    pub fn next_track(&mut self) -> MusicStart {
        self.slot = Slot::Cycle;
        let query = phrase_at(self.phrase_cursor).to_string();
        self.phrase_cursor = (self.phrase_cursor + 1) % MUSIC_SEARCH_PHRASES.len();
        let run = self.runs.next();
        MusicStart::Search { run, query }
    }

    /// Search for `run` finished.
    pub fn on_search(&mut self, run: RunId, result: Result<Option<MusicTrack>, BackendError>) -> MusicStep {
        if !self.runs.is_current(run) {
            debug!("Dropping stale search result for run {run}");
            return MusicStep::Ignored;
        }

        match result {
            Ok(Some(track)) => match self.load(run, track) {
                Some(track) => MusicStep::Playing(track),
                None => MusicStep::ToNews,
            },
            Ok(None) => match self.slot {
                Slot::Opening => {
                    warn!("No opening track found, going straight to news");
                    MusicStep::ToNews
                }
                Slot::Cycle => {
                    warn!("No track found even with fallback, refreshing news");
                    MusicStep::RefreshNews
                }
            },
            Err(e) => {
                warn!("Music search failed: {e}");
                MusicStep::ToNews
            }
        }
    }

    /// The player for `run` reported the end of its track.
    pub fn on_track_ended(&mut self, run: RunId, outcome: PlaybackOutcome) -> MusicStep {
        if !self.runs.is_current(run) || self.instance.is_none() {
            debug!("Dropping stale track end for run {run}");
            return MusicStep::Ignored;
        }
        if let PlaybackOutcome::Failed(reason) = &outcome {
            warn!("Track playback ended abnormally: {reason}");
        }
        self.destroy();

        match self.slot {
            Slot::Opening => MusicStep::ToNews,
            Slot::Cycle => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining > 0 {
                    debug!("{} songs left in this cycle", self.remaining);
                    MusicStep::LoadNext
                } else {
                    MusicStep::RefreshNews
                }
            }
        }
    }

    /// Pause the live track. A track loaded while paused starts paused.
    pub fn pause(&mut self) {
        self.paused = true;
        if let Some(instance) = &self.instance {
            instance.pause();
        }
    }

    pub fn resume(&mut self) {
        self.paused = false;
        if let Some(instance) = &self.instance {
            instance.resume();
        }
    }

    /// Drop the player and supersede any search in flight.
    pub fn stop(&mut self) {
        self.runs.invalidate();
        self.destroy();
    }

    fn load(&mut self, run: RunId, track: MusicTrack) -> Option<MusicTrack> {
        self.destroy();
        match self.host.create(&track, self.paused, Completion::music(run, self.events.clone())) {
            Ok(instance) => {
                if self.paused {
                    info!("Loaded paused: {} ({})", track.title, track.channel);
                } else {
                    info!("Now playing: {} ({})", track.title, track.channel);
                }
                self.instance = Some(instance);
                Some(track)
            }
            Err(e) => {
                warn!("Could not start player for {}: {e}", track.title);
                None
            }
        }
    }

    fn destroy(&mut self) {
        if self.instance.take().is_some() {
            debug!("Destroyed video player");
        }
    }
}

/// Search `query`, retrying once with the fallback phrase, and pick a random hit.
pub async fn find_track<B: CommuteBackend>(
    backend: Arc<B>,
    query: String,
) -> Result<Option<MusicTrack>, BackendError> {
    let mut results = backend.search_music(&query).await?;
    if results.is_empty() {
        info!("No results for \"{query}\", trying \"{FALLBACK_MUSIC_QUERY}\"");
        results = backend.search_music(FALLBACK_MUSIC_QUERY).await?;
    }
    Ok(pick_random(results))
}

fn pick_random(results: Vec<MusicTrack>) -> Option<MusicTrack> {
    results.choose(&mut rand::thread_rng()).cloned()
}
