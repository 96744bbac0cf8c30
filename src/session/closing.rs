//! Closing segment: a farewell written from the session transcript, spoken once.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::backend::CommuteBackend;
use crate::config::VoiceRequest;
use crate::player::{AudioOutput, Completion, PlaybackOutcome, RunCounter};
use crate::session::SessionEvent;

/// Write and speak the closing text. Returns the text when one was written,
/// whether or not it could be played.
pub async fn play_closing<B, A>(backend: &B, output: &mut A, transcript: &str, voice: &VoiceRequest) -> Option<String>
where
    B: CommuteBackend,
    A: AudioOutput,
{
    if transcript.trim().is_empty() {
        return None;
    }

    let text = match backend.closing_script(transcript).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => return None,
        Err(e) => {
            warn!("Closing script failed: {e}");
            return None;
        }
    };
    info!("Closing: {text}");

    let audio = match backend.synthesize(&text, voice).await {
        Ok(audio) => audio,
        Err(e) => {
            warn!("Closing synthesis failed: {e}");
            return Some(text);
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let run = RunCounter::default().next();
    let handle = match output.play(audio, Completion::speech(run, tx)) {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Closing playback failed: {e}");
            return Some(text);
        }
    };

    if let Some(SessionEvent::SpeechEnded {
        outcome: PlaybackOutcome::Failed(reason),
        ..
    }) = rx.recv().await
    {
        warn!("Closing playback error: {reason}");
    }
    drop(handle);
    Some(text)
}
