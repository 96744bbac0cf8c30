//! Phase bookkeeping for a session.
//!
//! greeting → song intro → first track → news[0..n] → music → news[0..n] → …
//!
//! Greeting and song intro only happen once. While paused, transitions still
//! move the phase but the state stays `Paused` until `resume`.

use crate::models::{PlayPhase, SessionState};

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phase: PlayPhase,
    news_index: usize,
    state: SessionState,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self {
            phase: PlayPhase::Greeting,
            news_index: 0,
            state: SessionState::Idle,
        }
    }
}

impl PhaseMachine {
    pub fn phase(&self) -> PlayPhase {
        self.phase
    }

    pub fn news_index(&self) -> usize {
        self.news_index
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == SessionState::Paused
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::PlayingRadio | SessionState::PlayingMusic)
    }

    pub fn start(&mut self) {
        self.phase = PlayPhase::Greeting;
        self.news_index = 0;
        self.state = SessionState::PlayingRadio;
    }

    /// The current speech segment is over (played, failed, skipped or empty).
    pub fn after_speech(&mut self, news_len: usize) -> PlayPhase {
        match self.phase {
            PlayPhase::Greeting => self.phase = PlayPhase::SongIntro,
            PlayPhase::SongIntro => self.enter(PlayPhase::FirstTrack),
            PlayPhase::News if self.news_index + 1 < news_len => self.news_index += 1,
            PlayPhase::News => {
                self.news_index = 0;
                self.enter(PlayPhase::Music);
            }
            PlayPhase::FirstTrack | PlayPhase::Music => {}
        }
        self.phase
    }

    /// Start a round of news segments from the first one.
    pub fn enter_news(&mut self) {
        self.news_index = 0;
        self.enter(PlayPhase::News);
    }

    pub fn pause(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.state = SessionState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.is_paused() {
            return false;
        }
        self.state = Self::state_for(self.phase);
        true
    }

    pub fn end(&mut self) {
        self.state = SessionState::Ended;
    }

    fn enter(&mut self, phase: PlayPhase) {
        self.phase = phase;
        if !matches!(self.state, SessionState::Paused | SessionState::Ended) {
            self.state = Self::state_for(phase);
        }
    }

    fn state_for(phase: PlayPhase) -> SessionState {
        if phase.is_speech() {
            SessionState::PlayingRadio
        } else {
            SessionState::PlayingMusic
        }
    }
}
