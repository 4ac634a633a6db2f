//! Sequence playback
//!
//! The scheduler places every event of a sequence on the audio clock up
//! front, then a periodic `tick` reports progress against wall time until
//! the sequence's total length has elapsed.
//!
//! ```text
//! Idle --play--> Scheduled --tick--> Playing --tick@100%--> Finished --> Idle
//!                    \__________________\_______stop______> Stopped  --> Idle
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, span, Level, Span};

use super::clock::Clock;
use super::sink::{Completion, PlaybackSink};
use super::{Engine, NodeId};
use crate::sequence::{Event, Sequence};
use crate::synth::{percussion, Kit, ToneKind, ToneSynth};

/// Default length of a melodic event without a duration
pub const DEFAULT_NOTE_MS: u64 = 300;

/// Something that can sound the events of a sequence
pub trait Instrument {
    /// Schedule `event` at audio-clock time `at`, returning its nodes
    fn sound(&self, engine: &mut Engine, event: &Event, at: f64) -> Vec<NodeId>;

    /// Length assumed for an event that carries no duration
    fn default_duration_ms(&self, event: &Event) -> u64;
}

/// Plays note events through the tone synthesizer
#[derive(Debug, Clone)]
pub struct MelodyInstrument {
    synth: ToneSynth,
    tone: ToneKind,
    note_ms: u64,
}

impl MelodyInstrument {
    pub fn new(tone: ToneKind) -> Self {
        Self {
            synth: ToneSynth::default(),
            tone,
            note_ms: DEFAULT_NOTE_MS,
        }
    }

    pub fn with_note_ms(mut self, note_ms: u64) -> Self {
        self.note_ms = note_ms;
        self
    }
}

impl Instrument for MelodyInstrument {
    fn sound(&self, engine: &mut Engine, event: &Event, at: f64) -> Vec<NodeId> {
        let duration_ms = event.duration_ms.unwrap_or(self.note_ms);
        let id = self
            .synth
            .synthesize(engine, &event.key, at, duration_ms as f64 / 1000.0, self.tone);
        vec![id]
    }

    fn default_duration_ms(&self, _event: &Event) -> u64 {
        self.note_ms
    }
}

/// Plays pad events through the percussion synthesizer
#[derive(Debug, Clone)]
pub struct DrumInstrument {
    kit: Kit,
}

impl DrumInstrument {
    pub fn new(kit: Kit) -> Self {
        Self { kit }
    }

    pub fn kit(&self) -> &Kit {
        &self.kit
    }
}

impl Instrument for DrumInstrument {
    fn sound(&self, engine: &mut Engine, event: &Event, at: f64) -> Vec<NodeId> {
        percussion::trigger(engine, &event.key, at, &self.kit)
    }

    fn default_duration_ms(&self, event: &Event) -> u64 {
        percussion::natural_duration_ms(&event.key, &self.kit)
    }
}

/// Longest `time + duration` over all events, in any order
pub fn total_duration_ms(events: &[Event], instrument: &dyn Instrument) -> u64 {
    events
        .iter()
        .map(|e| {
            let duration = e.duration_ms.unwrap_or_else(|| instrument.default_duration_ms(e));
            e.time_ms.saturating_add(duration)
        })
        .max()
        .unwrap_or(0)
}

/// Identifies one run of `play`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// Where the scheduler is in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Events are on the audio clock, no tick has run yet
    Scheduled,
    Playing,
}

struct Session {
    id: SessionId,
    nodes: Vec<NodeId>,
    started_ms: f64,
    total_ms: u64,
    progress: f64,
    sink: Box<dyn PlaybackSink>,
}

/// Plays one sequence at a time
pub struct SequenceScheduler {
    clock: Arc<dyn Clock>,
    state: PlaybackState,
    session: Option<Session>,
    next_id: u64,
    span: Span,
}

impl SequenceScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: PlaybackState::Idle,
            session: None,
            next_id: 0,
            span: span!(Level::INFO, "scheduler"),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == PlaybackState::Idle
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Total length of the current session in milliseconds
    pub fn total_ms(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.total_ms)
    }

    /// Latest progress of the current session
    pub fn progress(&self) -> Option<f64> {
        self.session.as_ref().map(|s| s.progress)
    }

    /// Nodes the current session scheduled
    pub fn session_nodes(&self) -> &[NodeId] {
        self.session.as_ref().map(|s| s.nodes.as_slice()).unwrap_or(&[])
    }

    /// Start playing `sequence`, stopping any session already running.
    ///
    /// An empty sequence finishes immediately: `on_finish` is called, no
    /// progress is reported, the scheduler stays idle and `None` is
    /// returned.
    pub fn play(
        &mut self,
        engine: &mut Engine,
        sequence: &Sequence,
        instrument: &dyn Instrument,
        mut sink: Box<dyn PlaybackSink>,
    ) -> Option<SessionId> {
        self.stop(engine);

        let _enter = self.span.enter();
        if sequence.is_empty() {
            debug!(title = %sequence.title, "Empty sequence, finishing immediately");
            sink.on_finish();
            return None;
        }

        let total_ms = total_duration_ms(&sequence.events, instrument);
        let base = engine.current_time();
        let mut nodes = Vec::new();
        for event in &sequence.events {
            let at = base + event.time_ms as f64 / 1000.0;
            let ids = instrument.sound(engine, event, at);
            debug!(key = %event.key, at, nodes = ids.len(), "Scheduled event");
            nodes.extend(ids);
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;
        info!(
            session = %id,
            title = %sequence.title,
            events = sequence.len(),
            total_ms,
            "Playback started"
        );

        self.session = Some(Session {
            id,
            nodes,
            started_ms: self.clock.now_ms(),
            total_ms,
            progress: 0.0,
            sink,
        });
        self.state = PlaybackState::Scheduled;
        Some(id)
    }

    /// Periodic progress update.
    ///
    /// Returns `Some(Completion::Finished)` on the tick that completes the
    /// session; `None` otherwise, including when idle.
    pub fn tick(&mut self, engine: &mut Engine) -> Option<Completion> {
        let now = self.clock.now_ms();
        let session = self.session.as_mut()?;
        self.state = PlaybackState::Playing;

        let elapsed = (now - session.started_ms).max(0.0);
        let percent = if session.total_ms == 0 {
            100.0
        } else {
            (100.0 * elapsed / session.total_ms as f64).min(100.0)
        };
        // Never report a smaller value than before
        let percent = percent.max(session.progress);
        session.progress = percent;
        session.sink.on_progress(percent);

        if percent < 100.0 {
            return None;
        }

        let mut session = self.session.take()?;
        engine.stop_nodes(&session.nodes);
        self.state = PlaybackState::Idle;

        let _enter = self.span.enter();
        info!(session = %session.id, "Playback finished");
        session.sink.on_finish();
        Some(Completion::Finished)
    }

    /// Cut the current session short. No callbacks fire for it afterwards.
    /// Does nothing when idle.
    pub fn stop(&mut self, engine: &mut Engine) {
        let Some(session) = self.session.take() else {
            return;
        };
        let stopped = engine.stop_nodes(&session.nodes);
        self.state = PlaybackState::Idle;

        let _enter = self.span.enter();
        info!(session = %session.id, stopped, "Playback stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::clock::ManualClock;
    use crate::engine::sink::{watch, FnSink, NullSink};
    use std::sync::{Arc, Mutex};

    const SR: f64 = 1000.0;

    #[derive(Default)]
    struct Log {
        progress: Vec<f64>,
        finished: usize,
    }

    fn logging_sink(log: &Arc<Mutex<Log>>) -> Box<dyn PlaybackSink> {
        let p = log.clone();
        let f = log.clone();
        Box::new(FnSink::new(
            move |percent| p.lock().unwrap().progress.push(percent),
            move || f.lock().unwrap().finished += 1,
        ))
    }

    fn setup() -> (Engine, SequenceScheduler, ManualClock) {
        let clock = ManualClock::new();
        let scheduler = SequenceScheduler::new(Arc::new(clock.clone()));
        (Engine::new(SR), scheduler, clock)
    }

    fn drums() -> DrumInstrument {
        DrumInstrument::new(Kit::standard())
    }

    fn kick_snare() -> Sequence {
        Sequence::percussive(
            None,
            vec![Event::new("kick", 0), Event::new("snare", 500).with_duration(200)],
        )
    }

    #[test]
    fn test_total_duration_kick_snare() {
        assert_eq!(total_duration_ms(&kick_snare().events, &drums()), 700);
    }

    #[test]
    fn test_total_duration_saturates() {
        let events = vec![Event::new("kick", u64::MAX), Event::new("snare", 10)];
        assert_eq!(total_duration_ms(&events, &drums()), u64::MAX);
    }

    #[test]
    fn test_far_future_event_plays_without_finishing_early() {
        let (mut engine, mut scheduler, clock) = setup();
        let seq = Sequence::from_json(r#"{"data": [{"note": "C4", "time": 1e30}]}"#).unwrap();
        let log = Arc::new(Mutex::new(Log::default()));

        let melody = MelodyInstrument::new(ToneKind::Piano);
        assert!(scheduler.play(&mut engine, &seq, &melody, logging_sink(&log)).is_some());
        assert_eq!(scheduler.total_ms(), Some(crate::sequence::MAX_OFFSET_MS + DEFAULT_NOTE_MS));

        clock.advance_ms(50.0);
        assert_eq!(scheduler.tick(&mut engine), None);
        assert_eq!(log.lock().unwrap().finished, 0);
        assert!(scheduler.progress().unwrap() < 1.0);

        scheduler.stop(&mut engine);
        assert_eq!(engine.active_node_count(), 0);
    }

    #[test]
    fn test_total_duration_order_independent() {
        let melody = MelodyInstrument::new(ToneKind::Piano);
        let sorted = vec![
            Event::new("C4", 0),
            Event::new("E4", 400).with_duration(1000),
            Event::new("G4", 900),
        ];
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        shuffled.swap(0, 1);

        assert_eq!(total_duration_ms(&sorted, &melody), 1400);
        assert_eq!(total_duration_ms(&shuffled, &melody), 1400);
    }

    #[test]
    fn test_total_duration_empty() {
        assert_eq!(total_duration_ms(&[], &drums()), 0);
    }

    #[test]
    fn test_kick_snare_scenario() {
        let (mut engine, mut scheduler, clock) = setup();
        let log = Arc::new(Mutex::new(Log::default()));

        let id = scheduler.play(&mut engine, &kick_snare(), &drums(), logging_sink(&log));
        assert!(id.is_some());
        assert_eq!(scheduler.state(), PlaybackState::Scheduled);
        assert_eq!(scheduler.total_ms(), Some(700));
        // Kick is one node, snare is tone plus noise
        assert_eq!(scheduler.session_nodes().len(), 3);

        let mut completions = Vec::new();
        for _ in 0..20 {
            clock.advance_ms(50.0);
            engine.advance(0.05);
            if let Some(c) = scheduler.tick(&mut engine) {
                completions.push(c);
            }
        }

        assert_eq!(completions, vec![Completion::Finished]);
        assert!(scheduler.is_idle());
        assert_eq!(engine.active_node_count(), 0);

        let log = log.lock().unwrap();
        assert_eq!(log.finished, 1);
        assert_eq!(log.progress.len(), 14);
        assert_eq!(log.progress.last(), Some(&100.0));
        assert!(log.progress.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_sequence_finishes_immediately() {
        let (mut engine, mut scheduler, _clock) = setup();
        let log = Arc::new(Mutex::new(Log::default()));

        let empty = Sequence::percussive(None, Vec::new());
        assert_eq!(scheduler.play(&mut engine, &empty, &drums(), logging_sink(&log)), None);
        assert!(scheduler.is_idle());
        assert_eq!(scheduler.tick(&mut engine), None);

        let log = log.lock().unwrap();
        assert_eq!(log.finished, 1);
        assert!(log.progress.is_empty());
    }

    #[test]
    fn test_zero_length_finishes_on_first_tick() {
        let (mut engine, mut scheduler, _clock) = setup();
        let log = Arc::new(Mutex::new(Log::default()));

        let unknown = Sequence::percussive(None, vec![Event::new("gong", 0)]);
        scheduler.play(&mut engine, &unknown, &drums(), logging_sink(&log));
        assert_eq!(scheduler.tick(&mut engine), Some(Completion::Finished));

        let log = log.lock().unwrap();
        assert_eq!(log.progress, vec![100.0]);
        assert_eq!(log.finished, 1);
    }

    #[test]
    fn test_stop_silences_callbacks() {
        let (mut engine, mut scheduler, clock) = setup();
        let log = Arc::new(Mutex::new(Log::default()));

        scheduler.play(&mut engine, &kick_snare(), &drums(), logging_sink(&log));
        clock.advance_ms(100.0);
        scheduler.tick(&mut engine);
        assert_eq!(scheduler.state(), PlaybackState::Playing);

        scheduler.stop(&mut engine);
        assert!(scheduler.is_idle());
        assert_eq!(engine.active_node_count(), 0);

        clock.advance_ms(1000.0);
        assert_eq!(scheduler.tick(&mut engine), None);

        let log = log.lock().unwrap();
        assert_eq!(log.progress.len(), 1);
        assert_eq!(log.finished, 0);
    }

    #[test]
    fn test_stop_idempotent() {
        let (mut engine, mut scheduler, _clock) = setup();
        scheduler.stop(&mut engine);
        scheduler.play(&mut engine, &kick_snare(), &drums(), Box::new(NullSink));
        scheduler.stop(&mut engine);
        scheduler.stop(&mut engine);
        assert!(scheduler.is_idle());
        assert_eq!(engine.active_node_count(), 0);
    }

    #[test]
    fn test_stop_cuts_nodes_not_yet_sounding() {
        let (mut engine, mut scheduler, _clock) = setup();
        let late = Sequence::melodic(ToneKind::Synth, vec![Event::new("C5", 5000)]);
        scheduler.play(&mut engine, &late, &MelodyInstrument::new(ToneKind::Synth), Box::new(NullSink));
        assert_eq!(engine.active_node_count(), 1);

        scheduler.stop(&mut engine);
        let out = engine.render(6000);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_play_replaces_session() {
        let (mut engine, mut scheduler, clock) = setup();
        let first = Arc::new(Mutex::new(Log::default()));
        let second = Arc::new(Mutex::new(Log::default()));

        let a = scheduler.play(&mut engine, &kick_snare(), &drums(), logging_sink(&first));
        let first_nodes = scheduler.session_nodes().to_vec();
        let b = scheduler.play(&mut engine, &kick_snare(), &drums(), logging_sink(&second));
        assert_ne!(a, b);
        assert!(first_nodes.iter().all(|id| !engine.contains(*id)));

        clock.advance_ms(700.0);
        scheduler.tick(&mut engine);

        assert_eq!(first.lock().unwrap().finished, 0);
        assert!(first.lock().unwrap().progress.is_empty());
        assert_eq!(second.lock().unwrap().finished, 1);
    }

    #[test]
    fn test_events_placed_on_audio_clock() {
        let (mut engine, mut scheduler, _clock) = setup();
        engine.advance(2.0);
        let melody = Sequence::melodic(ToneKind::Flute, vec![Event::new("A4", 250)]);
        scheduler.play(&mut engine, &melody, &MelodyInstrument::new(ToneKind::Flute), Box::new(NullSink));

        let id = scheduler.session_nodes()[0];
        assert!((engine.node(id).unwrap().start() - 2.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_watch_reports_stopped() {
        let (mut engine, mut scheduler, _clock) = setup();
        let (sink, watch) = watch();
        scheduler.play(&mut engine, &kick_snare(), &drums(), Box::new(sink));
        scheduler.stop(&mut engine);
        assert_eq!(watch.finished().await, Completion::Stopped);
    }
}
