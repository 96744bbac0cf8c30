//! Session orchestration.
//!
//! greeting → song intro → first track → news → music → refreshed news → …
//!
//! The session is an actor: it owns the phase machine and both players, spawns
//! network work, and applies results as `SessionEvent`s on its own task. Every
//! event carries the run it was issued for, so late results from superseded
//! runs are dropped by the player they belong to.

pub mod closing;
pub mod news;
pub mod phase;

use std::sync::Arc;

use chrono::Weekday;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::backend::CommuteBackend;
use crate::config::VoiceRequest;
use crate::error::BackendError;
use crate::models::{MusicTrack, PlayPhase, RadioScripts, SessionConfig, SessionState};
use crate::player::music::find_track;
use crate::player::queries::song_intro_text;
use crate::player::{
    AudioOutput, MusicPlayer, MusicStart, MusicStep, PlaybackOutcome, RunCounter, RunId, SpeechPlayer,
    SpeechStart, SpeechStep, VideoHost,
};
use phase::PhaseMachine;

/// Results reported back to the session by spawned work and host media.
#[derive(Debug)]
pub enum SessionEvent {
    SpeechAudio {
        run: RunId,
        result: Result<Vec<u8>, BackendError>,
    },
    SpeechEnded {
        run: RunId,
        outcome: PlaybackOutcome,
    },
    TrackFound {
        run: RunId,
        result: Result<Option<MusicTrack>, BackendError>,
    },
    TrackEnded {
        run: RunId,
        outcome: PlaybackOutcome,
    },
    NewsRefreshed {
        run: RunId,
        segments: Option<Vec<String>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Skip,
    End,
}

/// What the session tells the host about itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    Phase {
        phase: PlayPhase,
        news_index: usize,
        news_total: usize,
    },
    State(SessionState),
    /// Narration text that is about to be spoken.
    Caption(String),
    NowPlaying(Option<MusicTrack>),
    Ended { transcript: String },
}

/// Context gathered while loading, used for the opening track and its intro.
#[derive(Debug, Clone)]
pub struct Opening {
    pub track: Option<MusicTrack>,
    pub mood: Option<String>,
    pub weather: String,
    pub news_count: usize,
    pub weekday: Weekday,
}

impl Opening {
    pub fn intro_text(&self) -> String {
        song_intro_text(self.track.as_ref().map(|t| t.title.as_str()), self.mood.as_deref())
    }
}

/// Everything the host needs after the session loop returns.
pub struct Finished<A> {
    pub scripts: RadioScripts,
    pub transcript: String,
    pub output: A,
}

pub struct Session<B, A, V>
where
    B: CommuteBackend,
    A: AudioOutput,
    V: VideoHost,
{
    backend: Arc<B>,
    config: SessionConfig,
    voice: VoiceRequest,
    scripts: RadioScripts,
    opening: Opening,
    intro: String,
    machine: PhaseMachine,
    speech: SpeechPlayer<A>,
    music: MusicPlayer<V>,
    refreshes: RunCounter,
    events: mpsc::UnboundedSender<SessionEvent>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    published: Option<(PlayPhase, usize, SessionState)>,
}

impl<B, A, V> Session<B, A, V>
where
    B: CommuteBackend,
    A: AudioOutput,
    V: VideoHost,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: Arc<B>,
        config: SessionConfig,
        voice: VoiceRequest,
        scripts: RadioScripts,
        opening: Opening,
        audio: A,
        video: V,
        notices: mpsc::UnboundedSender<SessionNotice>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let intro = opening.intro_text();
        let session = Self {
            speech: SpeechPlayer::new(audio, events.clone()),
            music: MusicPlayer::new(video, config.music_ratio, events.clone()),
            backend,
            config,
            voice,
            scripts,
            opening,
            intro,
            machine: PhaseMachine::default(),
            refreshes: RunCounter::default(),
            events,
            notices,
            published: None,
        };
        (session, events_rx)
    }

    #[cfg(test)]
    pub fn phase(&self) -> PlayPhase {
        self.machine.phase()
    }

    #[cfg(test)]
    pub fn news_index(&self) -> usize {
        self.machine.news_index()
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.machine.state()
    }

    /// Drive the session until `End` arrives or the command channel closes.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
        mut commands: mpsc::Receiver<Command>,
    ) -> Finished<A> {
        self.start();

        loop {
            tokio::select! {
                Some(event) = events.recv() => self.handle(event),
                command = commands.recv() => match command {
                    Some(Command::End) => break,
                    Some(command) => self.command(command),
                    None => {
                        debug!("Command channel closed, ending session");
                        break;
                    }
                },
            }
        }

        let transcript = self.end();
        Finished {
            scripts: self.scripts,
            transcript,
            output: self.speech.into_output(),
        }
    }

    pub fn start(&mut self) {
        if self.machine.state() != SessionState::Idle {
            return;
        }
        info!(
            "Session started: {} news segments, radio {} / music {}",
            self.scripts.news.len(),
            self.config.radio_ratio,
            self.config.music_ratio
        );
        self.machine.start();
        self.publish();
        self.play_speech();
    }

    pub fn handle(&mut self, event: SessionEvent) {
        if self.machine.state() == SessionState::Ended {
            return;
        }
        match event {
            SessionEvent::SpeechAudio { run, result } => {
                let step = self.speech.on_audio(run, result);
                self.apply_speech(step);
            }
            SessionEvent::SpeechEnded { run, outcome } => {
                let step = self.speech.on_finished(run, outcome);
                self.apply_speech(step);
            }
            SessionEvent::TrackFound { run, result } => {
                let step = self.music.on_search(run, result);
                self.apply_music(step);
            }
            SessionEvent::TrackEnded { run, outcome } => {
                let step = self.music.on_track_ended(run, outcome);
                self.apply_music(step);
            }
            SessionEvent::NewsRefreshed { run, segments } => self.on_news_refreshed(run, segments),
        }
    }

    pub fn command(&mut self, command: Command) {
        match command {
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Skip => self.skip(),
            Command::End => {
                self.end();
            }
        }
    }

    /// Stop all playback and return the transcript. Idempotent.
    pub fn end(&mut self) -> String {
        let transcript = self.scripts.transcript();
        if self.machine.state() == SessionState::Ended {
            return transcript;
        }
        self.speech.cancel();
        self.music.stop();
        self.refreshes.invalidate();
        self.machine.end();
        self.publish();
        info!("Session ended");
        self.notify(SessionNotice::Ended {
            transcript: transcript.clone(),
        });
        transcript
    }

    fn pause(&mut self) {
        if !self.machine.pause() {
            debug!("Pause ignored in state {}", self.machine.state());
            return;
        }
        if self.machine.phase().is_speech() && !self.speech.pause() {
            // Nothing audible yet: drop the request, resume starts over.
            self.speech.cancel();
        }
        self.music.pause();
        self.publish();
    }

    fn resume(&mut self) {
        if !self.machine.resume() {
            debug!("Resume ignored in state {}", self.machine.state());
            return;
        }
        self.publish();
        self.music.resume();
        if self.machine.phase().is_speech() && !self.speech.resume() {
            self.play_speech();
        }
    }

    fn skip(&mut self) {
        if self.machine.state() != SessionState::PlayingRadio || !self.machine.phase().is_speech() {
            debug!("Skip ignored in {} / {}", self.machine.phase(), self.machine.state());
            return;
        }
        self.speech.skip();
        self.speech_done();
    }

    fn apply_speech(&mut self, step: SpeechStep) {
        match step {
            SpeechStep::Ignored | SpeechStep::Playing => {}
            SpeechStep::Advance => self.speech_done(),
        }
    }

    fn apply_music(&mut self, step: MusicStep) {
        match step {
            MusicStep::Ignored => {}
            MusicStep::Playing(track) => self.now_playing(track),
            MusicStep::LoadNext => {
                self.notify(SessionNotice::NowPlaying(None));
                let start = self.music.next_track();
                self.apply_music_start(start);
            }
            MusicStep::ToNews => {
                self.notify(SessionNotice::NowPlaying(None));
                self.enter_news();
            }
            MusicStep::RefreshNews => {
                self.notify(SessionNotice::NowPlaying(None));
                self.refresh_news();
            }
        }
    }

    fn apply_music_start(&mut self, start: MusicStart) {
        match start {
            MusicStart::Search { run, query } => {
                debug!("Searching music for \"{query}\" ({run})");
                let backend = self.backend.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = find_track(backend, query).await;
                    let _ = events.send(SessionEvent::TrackFound { run, result });
                });
            }
            MusicStart::Playing(track) => self.now_playing(track),
            MusicStart::Failed => self.enter_news(),
        }
    }

    fn now_playing(&self, track: MusicTrack) {
        self.notify(SessionNotice::NowPlaying(Some(track)));
    }

    /// The current narration segment is over; move on.
    fn speech_done(&mut self) {
        let phase = self.machine.after_speech(self.scripts.news.len());
        self.publish();
        match phase {
            PlayPhase::Greeting | PlayPhase::SongIntro | PlayPhase::News => self.play_speech(),
            PlayPhase::FirstTrack => {
                let start = self.music.open(
                    self.opening.track.take(),
                    &self.opening.weather,
                    self.opening.news_count,
                    self.opening.weekday,
                );
                self.apply_music_start(start);
            }
            PlayPhase::Music => {
                let start = self.music.start_cycle();
                self.apply_music_start(start);
            }
        }
    }

    fn enter_news(&mut self) {
        self.machine.enter_news();
        self.publish();
        self.play_speech();
    }

    fn refresh_news(&mut self) {
        let run = self.refreshes.next();
        info!("Refreshing news ({run})");
        let backend = self.backend.clone();
        let config = self.config.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let segments = news::refresh(backend.as_ref(), &config).await;
            let _ = events.send(SessionEvent::NewsRefreshed { run, segments });
        });
    }

    fn on_news_refreshed(&mut self, run: RunId, segments: Option<Vec<String>>) {
        if !self.refreshes.is_current(run) {
            debug!("Dropping stale news refresh {run}");
            return;
        }
        if let Some(segments) = segments {
            self.scripts.replace_news(segments);
        }
        self.enter_news();
    }

    /// Narrate the text of the current phase. Deferred while paused.
    fn play_speech(&mut self) {
        if self.machine.is_paused() {
            debug!("Paused, deferring {} narration", self.machine.phase());
            return;
        }
        let text = self.current_text();
        match self.speech.begin(&text) {
            SpeechStart::Empty => self.speech_done(),
            SpeechStart::Requested(run) => {
                self.notify(SessionNotice::Caption(text.clone()));
                let backend = self.backend.clone();
                let voice = self.voice.clone();
                let events = self.events.clone();
                tokio::spawn(async move {
                    let result = backend.synthesize(&text, &voice).await;
                    let _ = events.send(SessionEvent::SpeechAudio { run, result });
                });
            }
        }
    }

    fn current_text(&self) -> String {
        match self.machine.phase() {
            PlayPhase::Greeting => self.scripts.greeting.clone(),
            PlayPhase::SongIntro => self.intro.clone(),
            PlayPhase::News => self
                .scripts
                .news
                .get(self.machine.news_index())
                .cloned()
                .unwrap_or_default(),
            PlayPhase::FirstTrack | PlayPhase::Music => String::new(),
        }
    }

    fn publish(&mut self) {
        let now = (self.machine.phase(), self.machine.news_index(), self.machine.state());
        let Some(before) = self.published.replace(now) else {
            info!("Phase: {} / State: {}", now.0, now.2);
            self.notify(SessionNotice::Phase {
                phase: now.0,
                news_index: now.1,
                news_total: self.scripts.news.len(),
            });
            self.notify(SessionNotice::State(now.2));
            return;
        };
        if (before.0, before.1) != (now.0, now.1) {
            info!("Phase: {} → {} (news {})", before.0, now.0, now.1);
            self.notify(SessionNotice::Phase {
                phase: now.0,
                news_index: now.1,
                news_total: self.scripts.news.len(),
            });
        }
        if before.2 != now.2 {
            info!("State: {} → {}", before.2, now.2);
            self.notify(SessionNotice::State(now.2));
        }
    }

    fn notify(&self, notice: SessionNotice) {
        // Nobody listening is fine.
        let _ = self.notices.send(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{article, track, FakeAudio, FakeBackend, FakeVideo};
    use std::time::Duration;

    type TestSession = Session<FakeBackend, FakeAudio, FakeVideo>;

    struct Harness {
        session: TestSession,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        notices: mpsc::UnboundedReceiver<SessionNotice>,
        backend: Arc<FakeBackend>,
        audio: FakeAudio,
        video: FakeVideo,
        phases: Vec<(PlayPhase, usize)>,
        states: Vec<SessionState>,
    }

    impl Harness {
        fn new(backend: FakeBackend, audio: FakeAudio, video: FakeVideo, radio: u32, music: u32) -> Self {
            let backend = Arc::new(backend);
            let config = SessionConfig {
                radio_ratio: radio,
                music_ratio: music,
                ..SessionConfig::default()
            };
            let scripts = RadioScripts::new(
                "안녕하세요".into(),
                vec!["멘트: a".to_string(), "멘트: b".to_string()],
            );
            let opening = Opening {
                track: None,
                mood: None,
                weather: "맑음".into(),
                news_count: 2,
                weekday: Weekday::Mon,
            };
            let voice = crate::config::SpeechConfig::default().voice(config.narrator);
            let (notices_tx, notices) = mpsc::unbounded_channel();
            let (session, events) = Session::new(
                backend.clone(),
                config,
                voice,
                scripts,
                opening,
                audio.clone(),
                video.clone(),
                notices_tx,
            );
            Self {
                session,
                events,
                notices,
                backend,
                audio,
                video,
                phases: vec![],
                states: vec![],
            }
        }

        fn drain_notices(&mut self) {
            while let Ok(notice) = self.notices.try_recv() {
                match notice {
                    SessionNotice::Phase { phase, news_index, .. } => self.phases.push((phase, news_index)),
                    SessionNotice::State(state) => self.states.push(state),
                    _ => {}
                }
            }
        }

        /// Process the next event the session is waiting for.
        async fn step(&mut self) {
            let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
                .await
                .expect("session stalled")
                .expect("event channel open");
            self.session.handle(event);
            self.drain_notices();
        }

        async fn run_until(&mut self, done: impl Fn(&Harness) -> bool) {
            for _ in 0..500 {
                self.drain_notices();
                if done(self) {
                    return;
                }
                self.step().await;
            }
            panic!("condition never reached, phases: {:?}", self.phases);
        }
    }

    fn scripted_backend() -> FakeBackend {
        let backend = FakeBackend::default();
        backend.set_articles(vec![article("a"), article("b"), article("c")]);
        backend.set_search_results("morning city pop playlist", vec![track("first")]);
        for phrase in crate::player::queries::MUSIC_SEARCH_PHRASES {
            backend.set_search_results(phrase, vec![track(phrase)]);
        }
        backend
    }

    #[tokio::test]
    async fn test_full_cycle_order() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::auto(), FakeVideo::auto(), 2, 1);
        h.session.start();
        h.run_until(|h| h.phases.len() >= 9).await;

        assert_eq!(
            h.phases[..9],
            [
                (PlayPhase::Greeting, 0),
                (PlayPhase::SongIntro, 0),
                (PlayPhase::FirstTrack, 0),
                (PlayPhase::News, 0),
                (PlayPhase::News, 1),
                (PlayPhase::Music, 0),
                (PlayPhase::News, 0),
                (PlayPhase::News, 1),
                (PlayPhase::Music, 0),
            ]
        );
        // Intro is empty without a pre-selected track, so it is never synthesized.
        assert_eq!(
            h.audio.played()[..5],
            ["안녕하세요", "멘트: a", "멘트: b", "멘트: a", "멘트: b"]
        );
        assert_eq!(h.video.created()[..2], ["first".to_string(), "morning pop playlist".to_string()]);
        assert_eq!(h.backend.news_requests().len(), 1);
        assert_eq!(h.video.max_live(), 1);
    }

    #[tokio::test]
    async fn test_opening_phases_never_repeat() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::auto(), FakeVideo::auto(), 2, 2);
        h.session.start();
        h.run_until(|h| h.backend.news_requests().len() >= 3 && h.phases.len() >= 20).await;

        let opening = h.phases.iter().filter(|(p, _)| matches!(p, PlayPhase::Greeting | PlayPhase::SongIntro));
        assert_eq!(opening.count(), 2);
        let first_track = h.phases.iter().filter(|(p, _)| *p == PlayPhase::FirstTrack);
        assert_eq!(first_track.count(), 1);
    }

    #[tokio::test]
    async fn test_music_ratio_refreshes_after_last_song() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::auto(), FakeVideo::auto(), 2, 3);
        h.session.start();
        h.run_until(|h| h.backend.news_requests().len() == 1 && h.session.phase() == PlayPhase::News)
            .await;

        // Opening track plus three cycle tracks before the first refresh.
        assert_eq!(h.video.created().len(), 4);
        assert_eq!(h.video.live(), 0);
    }

    /// Get a manual session to the point where news[0] synthesis is in flight.
    async fn into_first_news(h: &mut Harness) {
        h.session.start();
        h.step().await; // greeting audio
        h.audio.finish_current(PlaybackOutcome::Ended);
        h.step().await; // greeting ended → intro empty → first track search
        h.step().await; // track found
        h.video.finish_current();
        h.step().await; // track ended → news[0] requested
        assert_eq!((h.session.phase(), h.session.news_index()), (PlayPhase::News, 0));
    }

    #[tokio::test]
    async fn test_skip_in_flight_news_drops_its_audio() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        into_first_news(&mut h).await;

        h.session.command(Command::Skip);
        assert_eq!((h.session.phase(), h.session.news_index()), (PlayPhase::News, 1));

        h.step().await; // stale news[0] audio
        h.step().await; // news[1] audio
        assert_eq!(h.audio.played(), vec!["안녕하세요".to_string(), "멘트: b".to_string()]);
        assert_eq!(h.audio.live(), 1);
    }

    #[tokio::test]
    async fn test_skip_playing_news_releases_clip() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        into_first_news(&mut h).await;
        h.step().await; // news[0] playing
        assert_eq!(h.audio.live(), 1);

        h.session.command(Command::Skip);
        assert_eq!(h.audio.live(), 0);
        assert_eq!(h.session.news_index(), 1);
    }

    #[tokio::test]
    async fn test_skip_ignored_during_music() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.step().await;
        h.audio.finish_current(PlaybackOutcome::Ended);
        h.step().await;
        assert_eq!(h.session.phase(), PlayPhase::FirstTrack);

        h.session.command(Command::Skip);
        assert_eq!(h.session.phase(), PlayPhase::FirstTrack);
    }

    #[tokio::test]
    async fn test_pause_resume_playing_clip_in_place() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.step().await;

        h.session.command(Command::Pause);
        assert_eq!(h.session.state(), SessionState::Paused);
        assert!(h.audio.is_paused());

        h.session.command(Command::Resume);
        assert_eq!(h.session.state(), SessionState::PlayingRadio);
        assert!(!h.audio.is_paused());
        assert_eq!(h.audio.plays(), 1);
    }

    #[tokio::test]
    async fn test_pause_during_synthesis_restarts_segment() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        h.session.start();

        h.session.command(Command::Pause);
        h.step().await; // cancelled greeting audio arrives and is dropped
        assert_eq!(h.audio.plays(), 0);

        h.session.command(Command::Resume);
        h.step().await;
        assert_eq!(h.audio.played(), vec!["안녕하세요".to_string()]);
        assert_eq!(h.backend.synthesized(), vec!["안녕하세요".to_string(), "안녕하세요".to_string()]);
    }

    #[tokio::test]
    async fn test_pause_music_pauses_player() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.step().await;
        h.audio.finish_current(PlaybackOutcome::Ended);
        h.step().await;
        h.step().await;
        assert_eq!(h.video.live(), 1);

        h.session.command(Command::Pause);
        h.drain_notices();
        assert!(h.video.is_paused());
        assert_eq!(h.states.last(), Some(&SessionState::Paused));

        h.session.command(Command::Resume);
        h.drain_notices();
        assert!(!h.video.is_paused());
        assert_eq!(h.states.last(), Some(&SessionState::PlayingMusic));
    }

    #[tokio::test]
    async fn test_track_found_while_paused_starts_paused() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.step().await;
        h.audio.finish_current(PlaybackOutcome::Ended);
        h.step().await; // greeting ended → first track search in flight
        assert_eq!(h.video.live(), 0);

        h.session.command(Command::Pause);
        h.step().await; // track found
        assert_eq!(h.video.live(), 1);
        assert!(h.video.is_paused());

        h.session.command(Command::Resume);
        assert!(!h.video.is_paused());
    }

    #[tokio::test]
    async fn test_pause_carried_into_news_does_not_hold_next_track() {
        let backend = scripted_backend();
        backend.set_articles(vec![article("x")]);
        for phrase in crate::player::queries::MUSIC_SEARCH_PHRASES {
            backend.set_search_results(phrase, vec![]);
        }
        let mut h = Harness::new(backend, FakeAudio::auto(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.run_until(|h| h.video.live() == 1).await;
        h.video.finish_current();
        h.run_until(|h| h.session.phase() == PlayPhase::Music).await;

        // Paused during the cyclic search, which comes back empty and refreshes.
        h.session.command(Command::Pause);
        h.run_until(|h| h.session.phase() == PlayPhase::News).await;
        assert_eq!(h.session.state(), SessionState::Paused);

        h.session.command(Command::Resume);
        for phrase in crate::player::queries::MUSIC_SEARCH_PHRASES {
            h.backend.set_search_results(phrase, vec![track("next")]);
        }
        h.run_until(|h| h.video.live() == 1 && h.session.phase() == PlayPhase::Music).await;
        assert!(!h.video.is_paused());
    }

    #[tokio::test]
    async fn test_failed_refresh_replays_previous_news() {
        let backend = scripted_backend();
        backend.fail_news(true);
        let mut h = Harness::new(backend, FakeAudio::auto(), FakeVideo::auto(), 2, 1);
        h.session.start();
        h.run_until(|h| h.phases.len() >= 9).await;

        assert_eq!(
            h.phases[5..9],
            [
                (PlayPhase::Music, 0),
                (PlayPhase::News, 0),
                (PlayPhase::News, 1),
                (PlayPhase::Music, 0),
            ]
        );
        assert_eq!(h.backend.news_requests().len(), 1);
        assert_eq!(
            h.audio.played()[..5],
            ["안녕하세요", "멘트: a", "멘트: b", "멘트: a", "멘트: b"]
        );
    }

    #[tokio::test]
    async fn test_cyclic_empty_search_refreshes_then_narrates() {
        let backend = FakeBackend::default();
        backend.set_articles(vec![article("x")]);
        backend.set_search_results("morning city pop playlist", vec![track("first")]);
        let mut h = Harness::new(backend, FakeAudio::auto(), FakeVideo::auto(), 2, 3);
        h.session.start();
        h.run_until(|h| h.audio.played().iter().any(|t| t == "멘트: x")).await;

        assert_eq!(
            h.backend.searches(),
            vec![
                "morning city pop playlist".to_string(),
                "morning pop playlist".to_string(),
                crate::player::queries::FALLBACK_MUSIC_QUERY.to_string(),
            ]
        );
        assert_eq!(h.backend.news_requests().len(), 1);
        assert_eq!(h.video.created(), vec!["first".to_string()]);
        assert_eq!((h.session.phase(), h.session.news_index()), (PlayPhase::News, 0));
    }

    #[tokio::test]
    async fn test_refresh_landing_after_end_is_ignored() {
        let backend = scripted_backend();
        backend.set_articles(vec![article("x")]);
        let mut h = Harness::new(backend, FakeAudio::auto(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.run_until(|h| h.video.live() == 1).await;
        h.video.finish_current();
        h.run_until(|h| h.session.phase() == PlayPhase::Music && h.video.live() == 1)
            .await;

        h.video.finish_current();
        h.step().await; // last song ended → refresh in flight
        let transcript = h.session.end();
        let phases = h.phases.len();
        let plays = h.audio.plays();

        h.step().await; // refreshed news arrives
        assert_eq!(h.backend.news_requests().len(), 1);
        assert_eq!(h.session.end(), transcript);
        assert_eq!(h.session.state(), SessionState::Ended);
        assert_eq!(h.phases.len(), phases);
        assert_eq!(h.audio.plays(), plays);
    }

    #[tokio::test]
    async fn test_synthesis_failure_advances_through_narration() {
        let backend = scripted_backend();
        backend.fail_tts(true);
        let mut h = Harness::new(backend, FakeAudio::auto(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.run_until(|h| h.session.phase() == PlayPhase::FirstTrack).await;
        assert_eq!(h.audio.plays(), 0);
    }

    #[tokio::test]
    async fn test_end_releases_everything() {
        let mut h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        h.session.start();
        h.step().await;
        assert_eq!(h.audio.live(), 1);

        let transcript = h.session.end();
        assert_eq!(transcript, "안녕하세요\n\n멘트: a\n\n멘트: b");
        assert_eq!(h.session.state(), SessionState::Ended);
        assert_eq!(h.audio.live(), 0);
        assert_eq!(h.video.live(), 0);

        // Completion from the released clip is ignored once ended.
        h.audio.finish_current(PlaybackOutcome::Ended);
        h.step().await;
        assert_eq!(h.session.phase(), PlayPhase::Greeting);
    }

    #[tokio::test]
    async fn test_run_returns_transcript_on_end() {
        let h = Harness::new(scripted_backend(), FakeAudio::manual(), FakeVideo::manual(), 2, 1);
        let (commands_tx, commands) = mpsc::channel(4);
        let task = tokio::spawn(h.session.run(h.events, commands));

        commands_tx.send(Command::Pause).await.unwrap();
        commands_tx.send(Command::End).await.unwrap();
        let finished = task.await.unwrap();

        assert_eq!(finished.transcript, finished.scripts.transcript());
        assert_eq!(h.audio.live(), 0);
    }
}
