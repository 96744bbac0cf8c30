//! rodio narration output.
//!
//! Each clip gets its own `Sink`. A blocking watcher polls the sink and fires
//! the completion once it drains; dropping the clip stops the sink and tells
//! the watcher to exit quietly.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info};

use super::{AudioOutput, Completion, PlaybackOutcome, SpeechHandle};
use crate::error::PlaybackError;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct RodioOutput {
    // Kept alive for the process lifetime; sinks connect to its mixer.
    stream: OutputStream,
}

impl RodioOutput {
    pub fn open() -> Result<Self, PlaybackError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::Output(e.to_string()))?;
        stream.log_on_drop(false);
        info!("Audio output opened");
        Ok(Self { stream })
    }
}

pub struct RodioClip {
    sink: Arc<Sink>,
    released: Arc<AtomicBool>,
}

impl SpeechHandle for RodioClip {
    fn pause(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }
}

impl Drop for RodioClip {
    fn drop(&mut self) {
        self.released.store(true, Ordering::Relaxed);
        self.sink.stop();
    }
}

impl AudioOutput for RodioOutput {
    type Handle = RodioClip;

    fn play(&mut self, audio: Vec<u8>, done: Completion) -> Result<RodioClip, PlaybackError> {
        let source = Decoder::new(Cursor::new(audio)).map_err(|e| PlaybackError::Decode(e.to_string()))?;

        let sink = Arc::new(Sink::connect_new(self.stream.mixer()));
        sink.append(source);

        let released = Arc::new(AtomicBool::new(false));
        let watcher_sink = sink.clone();
        let watcher_released = released.clone();
        tokio::task::spawn_blocking(move || loop {
            if watcher_released.load(Ordering::Relaxed) {
                debug!("Clip {} released before it finished", done.run());
                return;
            }
            if watcher_sink.empty() {
                done.finish(PlaybackOutcome::Ended);
                return;
            }
            std::thread::sleep(POLL_INTERVAL);
        });

        Ok(RodioClip { sink, released })
    }
}
