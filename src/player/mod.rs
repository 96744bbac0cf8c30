//! Segment players and the host media handles they own.
//!
//! Each player tags its async work with a [`RunId`]. Only the latest run of a
//! player may touch playback state; anything reported for an older run is
//! dropped on arrival.

pub mod audio;
pub mod music;
pub mod queries;
pub mod speech;
pub mod video;

use tokio::sync::mpsc;

use crate::error::PlaybackError;
use crate::models::MusicTrack;
use crate::session::SessionEvent;

pub use music::{MusicPlayer, MusicStart, MusicStep};
pub use speech::{SpeechPlayer, SpeechStart, SpeechStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RunId(u64);

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Strictly increasing run identifiers for one playback lane.
#[derive(Debug, Default)]
pub struct RunCounter {
    latest: u64,
}

impl RunCounter {
    pub fn next(&mut self) -> RunId {
        self.latest += 1;
        RunId(self.latest)
    }

    pub fn is_current(&self, run: RunId) -> bool {
        run.0 == self.latest
    }

    /// Supersede the current run without starting a new one.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Ended,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lane {
    Speech,
    Music,
}

/// One-shot "this media finished" signal handed to a host handle.
#[derive(Debug)]
pub struct Completion {
    run: RunId,
    lane: Lane,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl Completion {
    pub fn speech(run: RunId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            run,
            lane: Lane::Speech,
            tx,
        }
    }

    pub fn music(run: RunId, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            run,
            lane: Lane::Music,
            tx,
        }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    pub fn finish(self, outcome: PlaybackOutcome) {
        let run = self.run;
        let event = match self.lane {
            Lane::Speech => SessionEvent::SpeechEnded { run, outcome },
            Lane::Music => SessionEvent::TrackEnded { run, outcome },
        };
        // Receiver gone means the session is over.
        let _ = self.tx.send(event);
    }
}

/// Host audio element for narration. At most one handle is live at a time.
pub trait AudioOutput {
    type Handle: SpeechHandle;

    /// Start playing an encoded clip. `done` fires on natural end or playback error.
    fn play(&mut self, audio: Vec<u8>, done: Completion) -> Result<Self::Handle, PlaybackError>;
}

/// A playing narration clip. Dropping it stops playback and releases the buffer.
pub trait SpeechHandle {
    fn pause(&self);
    fn resume(&self);
}

/// Host embeddable video player factory.
pub trait VideoHost {
    type Instance: VideoInstance;

    /// Construct a player for `track`, held at the start when `paused`.
    /// `done` fires when the player reports it ended.
    fn create(&mut self, track: &MusicTrack, paused: bool, done: Completion) -> Result<Self::Instance, PlaybackError>;
}

/// A live player instance. Dropping it destroys the player.
pub trait VideoInstance {
    fn pause(&self);
    fn resume(&self);
}
