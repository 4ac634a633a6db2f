//! The process-wide instrument studio
//!
//! One `Studio` owns the engine and everything that schedules sound on it:
//! the sequence scheduler, the keyboard's voices, the mixer and the two
//! recorders. Only one kind of playback runs at a time; starting sequence
//! playback stops the mixer and vice versa.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, span, warn, Level, Span};

use crate::config::ToneboxConfig;
use crate::engine::{
    AudioBuffer, Clock, Completion, DrumInstrument, Engine, MelodyInstrument, MultiTrackMixer, NodeId,
    PlaybackSink, Recorder, Render, SequenceScheduler, SessionId, TrackId, VoiceRegistry, DEFAULT_LOOP_SECS,
    DEFAULT_NOTE_MS,
};
use crate::error::Result;
use crate::sequence::{Sequence, SequenceKind};
use crate::synth::{percussion, Kit, KitLibrary, Pad, ToneKind, ToneSynth, Tuning, DEFAULT_KIT};

/// A live input that can be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Keyboard,
    Pads,
}

/// Engine plus every component that plays through it
pub struct Studio {
    engine: Engine,
    scheduler: SequenceScheduler,
    voices: VoiceRegistry,
    mixer: MultiTrackMixer,
    key_recorder: Recorder,
    pad_recorder: Recorder,
    kits: KitLibrary,
    kit: String,
    tone: ToneKind,
    keyboard: ToneSynth,
    melody_note_ms: u64,
    now_playing: Option<String>,
    span: Span,
}

impl Studio {
    /// A studio with default settings
    pub fn new(sample_rate: f64, clock: Arc<dyn Clock>) -> Self {
        Self::with_loop(sample_rate, clock, DEFAULT_LOOP_SECS)
    }

    fn with_loop(sample_rate: f64, clock: Arc<dyn Clock>, loop_secs: f64) -> Self {
        let mut engine = Engine::new(sample_rate);
        let mixer = MultiTrackMixer::new(&mut engine, loop_secs);
        let tone = ToneKind::Piano;

        Self {
            scheduler: SequenceScheduler::new(clock.clone()),
            voices: VoiceRegistry::new(),
            mixer,
            key_recorder: Recorder::new(clock.clone(), SequenceKind::Melodic { tone }),
            pad_recorder: Recorder::new(
                clock,
                SequenceKind::Percussive {
                    kit: Some(DEFAULT_KIT.to_string()),
                },
            ),
            engine,
            kits: KitLibrary::new(),
            kit: DEFAULT_KIT.to_string(),
            tone,
            keyboard: ToneSynth::new(Tuning::KEYBOARD),
            melody_note_ms: DEFAULT_NOTE_MS,
            now_playing: None,
            span: span!(Level::INFO, "studio"),
        }
    }

    /// A studio set up from configuration. `sample_rate` is the rate the
    /// output actually runs at, which may differ from the configured one.
    pub fn from_config(config: &ToneboxConfig, sample_rate: f64, clock: Arc<dyn Clock>) -> Self {
        let mut studio = Self::with_loop(sample_rate, clock, config.mixer.loop_duration_secs);
        for i in 0..config.mixer.tracks {
            studio.add_track(&format!("Track {}", i + 1));
        }

        for kit in &config.kits {
            studio.kits.add(kit.clone());
        }
        studio.set_kit(&config.instrument.kit);
        studio.set_tone(config.instrument.tone);
        studio.set_sustain(config.instrument.sustain);
        studio.set_volume(config.master.volume);
        studio.melody_note_ms = config.playback.melody_note_ms;
        studio
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    pub fn mixer(&self) -> &MultiTrackMixer {
        &self.mixer
    }

    pub fn scheduler(&self) -> &SequenceScheduler {
        &self.scheduler
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    pub fn kits(&self) -> &KitLibrary {
        &self.kits
    }

    // Sequence playback

    /// Play a sequence with the instrument its kind calls for. Stops the
    /// mixer and any current session first.
    pub fn play_sequence(&mut self, sequence: &Sequence, sink: Box<dyn PlaybackSink>) -> Option<SessionId> {
        self.mixer.stop(&mut self.engine);
        self.now_playing = None;

        match &sequence.kind {
            SequenceKind::Melodic { tone } => {
                let instrument = MelodyInstrument::new(*tone).with_note_ms(self.melody_note_ms);
                self.scheduler.play(&mut self.engine, sequence, &instrument, sink)
            }
            SequenceKind::Percussive { kit } => {
                let name = kit.as_deref().unwrap_or(self.kit.as_str());
                let instrument = DrumInstrument::new(self.kits.get(name).clone());
                self.scheduler.play(&mut self.engine, sequence, &instrument, sink)
            }
        }
    }

    /// Toggle playback of a feed post. Pressing play on the post that is
    /// already playing stops it; any other post replaces it.
    pub fn play_post(&mut self, id: &str, sequence: &Sequence, sink: Box<dyn PlaybackSink>) -> Option<SessionId> {
        if self.now_playing.as_deref() == Some(id) {
            debug!(post = id, "Toggling post off");
            self.stop_playback();
            return None;
        }

        let session = self.play_sequence(sequence, sink);
        if session.is_some() {
            self.now_playing = Some(id.to_string());
        }
        session
    }

    /// Id of the post currently playing
    pub fn now_playing(&self) -> Option<&str> {
        self.now_playing.as_deref()
    }

    pub fn stop_playback(&mut self) {
        self.scheduler.stop(&mut self.engine);
        self.now_playing = None;
    }

    /// Advance progress of the current session
    pub fn tick(&mut self) -> Option<Completion> {
        let outcome = self.scheduler.tick(&mut self.engine);
        if outcome.is_some() {
            self.now_playing = None;
        }
        outcome
    }

    /// Whether sequence playback is idle
    pub fn is_idle(&self) -> bool {
        self.scheduler.is_idle()
    }

    // Live keyboard

    /// Press a key on the keyboard, logging it when recording
    pub fn key_down(&mut self, note: &str) -> NodeId {
        let synth = self.keyboard;
        let tone = self.tone;
        let sustain = self.voices.sustain();
        let id = self
            .voices
            .note_on(&mut self.engine, note, |engine| synth.key_down(engine, note, tone, sustain));
        self.key_recorder.log_event(note);
        id
    }

    pub fn key_up(&mut self, note: &str) -> bool {
        self.voices.note_off(&mut self.engine, note)
    }

    // Live pads

    /// Hit a pad with the current kit, logging it when recording.
    /// Unknown pads make no sound and are not logged.
    pub fn hit_pad(&mut self, key: &str) -> Vec<NodeId> {
        let Some(pad) = Pad::from_key(key) else {
            debug!(key, "Ignoring unknown pad");
            return Vec::new();
        };
        let at = self.engine.current_time();
        let kit = self.kits.get(&self.kit);
        let ids = percussion::trigger_pad(&mut self.engine, pad, at, kit);
        self.pad_recorder.log_event(pad.id());
        ids
    }

    // Recording

    pub fn start_recording(&mut self, input: Input) {
        self.recorder_mut(input).start();
    }

    /// Stop recording `input` and return what it captured
    pub fn stop_recording(&mut self, input: Input) -> Sequence {
        self.recorder_mut(input).stop()
    }

    pub fn recorder(&self, input: Input) -> &Recorder {
        match input {
            Input::Keyboard => &self.key_recorder,
            Input::Pads => &self.pad_recorder,
        }
    }

    fn recorder_mut(&mut self, input: Input) -> &mut Recorder {
        match input {
            Input::Keyboard => &mut self.key_recorder,
            Input::Pads => &mut self.pad_recorder,
        }
    }

    // Mixer

    pub fn add_track(&mut self, name: &str) -> TrackId {
        self.mixer.add_track(&mut self.engine, name)
    }

    pub fn schedule_clip(
        &mut self,
        track: TrackId,
        buffer: Arc<AudioBuffer>,
        start_offset: f64,
        source_offset: f64,
        duration: f64,
    ) -> Result<()> {
        self.mixer.schedule_clip(track, buffer, start_offset, source_offset, duration)
    }

    /// Start the mixer transport, stopping sequence playback first
    pub fn play_mixer(&mut self) -> usize {
        self.stop_playback();
        self.mixer.play(&mut self.engine)
    }

    pub fn stop_mixer(&mut self) {
        self.mixer.stop(&mut self.engine);
    }

    pub fn set_track_muted(&mut self, track: TrackId, muted: bool) -> Result<()> {
        self.mixer.set_track_muted(&mut self.engine, track, muted)
    }

    pub fn toggle_mute(&mut self, track: TrackId) -> Result<bool> {
        self.mixer.toggle_mute(&mut self.engine, track)
    }

    pub fn set_mixer_volume(&mut self, volume: f64) -> f64 {
        self.mixer.set_master_volume(&mut self.engine, volume)
    }

    pub fn mixer_progress(&self) -> Option<f64> {
        self.mixer.progress(&self.engine)
    }

    // Settings

    /// Select a kit by name. Unknown names select the standard kit;
    /// returns whether the name was found.
    pub fn set_kit(&mut self, name: &str) -> bool {
        let _enter = self.span.enter();
        let found = self.kits.contains(name);
        let kit = self.kits.get(name).name.clone();
        if !found {
            warn!(requested = name, using = %kit, "Kit not found");
        }
        info!(kit = %kit, "Kit selected");
        self.pad_recorder.set_kind(SequenceKind::Percussive { kit: Some(kit.clone()) });
        self.kit = kit;
        found
    }

    pub fn kit(&self) -> &Kit {
        self.kits.get(&self.kit)
    }

    pub fn set_tone(&mut self, tone: ToneKind) {
        self.tone = tone;
        self.key_recorder.set_kind(SequenceKind::Melodic { tone });
    }

    pub fn tone(&self) -> ToneKind {
        self.tone
    }

    pub fn set_sustain(&mut self, sustain: bool) {
        self.voices.set_sustain(sustain);
    }

    pub fn sustain(&self) -> bool {
        self.voices.sustain()
    }

    /// Set the master volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.engine.set_volume(volume)
    }

    /// Silence everything: playback, mixer and held keys
    pub fn stop_all(&mut self) {
        self.stop_playback();
        self.mixer.stop(&mut self.engine);
        self.voices.stop_all(&mut self.engine);
        self.engine.stop_all();
    }
}

impl Render for Studio {
    fn render_sample(&mut self) -> f64 {
        self.engine.process()
    }
}

/// Tick a shared studio every `interval` until sequence playback ends.
///
/// Returns `Finished` when the session plays out and `Stopped` when it is
/// stopped from elsewhere (or nothing was playing).
pub async fn drive(studio: Arc<Mutex<Studio>>, interval: Duration) -> Completion {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Ok(mut studio) = studio.lock() else {
            return Completion::Stopped;
        };
        if let Some(outcome) = studio.tick() {
            return outcome;
        }
        if studio.is_idle() {
            return Completion::Stopped;
        }
    }
}

/// Start `sequence` and drive it to the end. An empty sequence finishes
/// without a tick.
pub async fn play_and_drive(
    studio: Arc<Mutex<Studio>>,
    sequence: &Sequence,
    sink: Box<dyn PlaybackSink>,
    interval: Duration,
) -> Completion {
    let session = match studio.lock() {
        Ok(mut studio) => studio.play_sequence(sequence, sink),
        Err(_) => return Completion::Stopped,
    };
    match session {
        Some(_) => drive(studio, interval).await,
        None => Completion::Finished,
    }
}
