//! Narration player: one synthesized clip per phase entry.
//!
//! Lifecycle of a run: `begin` → (caller requests synthesis) → `on_audio` →
//! `on_finished`. `skip`, `cancel` and a new `begin` all supersede the run and
//! release whatever clip is playing.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{AudioOutput, Completion, PlaybackOutcome, RunCounter, RunId, SpeechHandle};
use crate::error::BackendError;
use crate::session::SessionEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStart {
    /// Blank text: advance right away, nothing was requested.
    Empty,
    /// Synthesis should be requested for this run.
    Requested(RunId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechStep {
    /// Stale or cancelled result, state untouched.
    Ignored,
    Playing,
    /// The segment is over (played, failed, or skipped): move to the next phase.
    Advance,
}

pub struct SpeechPlayer<A: AudioOutput> {
    output: A,
    events: mpsc::UnboundedSender<SessionEvent>,
    runs: RunCounter,
    cancelled: bool,
    active: Option<A::Handle>,
}

impl<A: AudioOutput> SpeechPlayer<A> {
    pub fn new(output: A, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self {
            output,
            events,
            runs: RunCounter::default(),
            cancelled: false,
            active: None,
        }
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_current(&self, run: RunId) -> bool {
        self.runs.is_current(run) && !self.cancelled
    }

    /// Start a new run for `text`, superseding any earlier one.
    pub fn begin(&mut self, text: &str) -> SpeechStart {
        self.release();
        if text.trim().is_empty() {
            self.runs.invalidate();
            self.cancelled = true;
            debug!("Empty narration text, skipping synthesis");
            return SpeechStart::Empty;
        }
        self.cancelled = false;
        let run = self.runs.next();
        debug!("Speech run {run} requested ({} chars)", text.chars().count());
        SpeechStart::Requested(run)
    }

    /// Synthesis finished for `run`.
    pub fn on_audio(&mut self, run: RunId, result: Result<Vec<u8>, BackendError>) -> SpeechStep {
        if !self.is_current(run) {
            debug!("Dropping stale speech audio for run {run}");
            return SpeechStep::Ignored;
        }

        let audio = match result {
            Ok(audio) => audio,
            Err(e) => {
                warn!("Speech synthesis failed, skipping segment: {e}");
                self.cancelled = true;
                return SpeechStep::Advance;
            }
        };

        self.release();
        match self.output.play(audio, Completion::speech(run, self.events.clone())) {
            Ok(handle) => {
                self.active = Some(handle);
                SpeechStep::Playing
            }
            Err(e) => {
                warn!("Speech playback failed to start: {e}");
                self.cancelled = true;
                SpeechStep::Advance
            }
        }
    }

    /// The clip of `run` ended naturally or hit a playback error. Both advance.
    pub fn on_finished(&mut self, run: RunId, outcome: PlaybackOutcome) -> SpeechStep {
        if !self.is_current(run) {
            debug!("Dropping stale speech completion for run {run}");
            return SpeechStep::Ignored;
        }
        if let PlaybackOutcome::Failed(reason) = &outcome {
            warn!("Speech playback error, treating as finished: {reason}");
        }
        self.release();
        self.cancelled = true;
        SpeechStep::Advance
    }

    /// User skip: stop everything for the current run. The caller advances.
    pub fn skip(&mut self) {
        info!("Skipping narration");
        self.cancel();
    }

    /// Supersede the current run and release its clip.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.runs.invalidate();
        self.release();
    }

    /// Pause in place. Returns false when nothing is playing yet; the caller
    /// should then `cancel` and restart the segment on resume.
    pub fn pause(&self) -> bool {
        match &self.active {
            Some(handle) => {
                handle.pause();
                true
            }
            None => false,
        }
    }

    /// Resume the paused clip. Returns false when there is none.
    pub fn resume(&self) -> bool {
        match &self.active {
            Some(handle) => {
                handle.resume();
                true
            }
            None => false,
        }
    }

    /// Stop everything and hand back the output, e.g. for the closing segment.
    pub fn into_output(mut self) -> A {
        self.cancel();
        self.output
    }

    fn release(&mut self) {
        if self.active.take().is_some() {
            debug!("Released narration clip");
        }
    }
}
