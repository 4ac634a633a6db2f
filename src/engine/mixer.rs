//! Multi-track clip mixer
//!
//! Each track owns a bus feeding the mixer's master bus. Clips are
//! arranged on tracks ahead of time; `play` puts every clip that has not
//! started yet on the audio clock in one pass. The transport reports a
//! looping position but clips are not re-triggered.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, span, Level, Span};

use super::clips::AudioBuffer;
use super::{BusId, Engine, NodeId, SoundNode};
use crate::error::{Error, Result};

/// Default transport loop length in seconds
pub const DEFAULT_LOOP_SECS: f64 = 8.0;

/// Handle to a mixer track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(usize);

impl TrackId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// A buffer segment placed on a track
#[derive(Debug, Clone)]
pub struct Clip {
    pub buffer: Arc<AudioBuffer>,
    /// Seconds after transport start
    pub start_offset: f64,
    /// Seconds into the buffer
    pub source_offset: f64,
    pub duration: f64,
}

/// A named lane of clips
#[derive(Debug)]
pub struct Track {
    name: String,
    bus: BusId,
    clips: Vec<Clip>,
    muted: bool,
    sources: Vec<NodeId>,
}

impl Track {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

/// Arranges clips on tracks and plays them together
pub struct MultiTrackMixer {
    master: BusId,
    master_volume: f64,
    tracks: Vec<Track>,
    playing: bool,
    started_at: f64,
    loop_duration: f64,
    span: Span,
}

impl MultiTrackMixer {
    /// Create a mixer with its master bus on `engine`
    pub fn new(engine: &mut Engine, loop_duration: f64) -> Self {
        let master_volume = 1.0;
        let loop_duration = if loop_duration > 0.0 {
            loop_duration
        } else {
            DEFAULT_LOOP_SECS
        };
        Self {
            master: engine.add_bus(master_volume, None),
            master_volume,
            tracks: Vec::new(),
            playing: false,
            started_at: 0.0,
            loop_duration,
            span: span!(Level::INFO, "mixer"),
        }
    }

    pub fn add_track(&mut self, engine: &mut Engine, name: &str) -> TrackId {
        let bus = engine.add_bus(1.0, Some(self.master));
        self.tracks.push(Track {
            name: name.to_string(),
            bus,
            clips: Vec::new(),
            muted: false,
            sources: Vec::new(),
        });
        TrackId(self.tracks.len() - 1)
    }

    /// Place `duration` seconds of `buffer`, beginning `source_offset`
    /// seconds into it, at `start_offset` seconds after transport start
    pub fn schedule_clip(
        &mut self,
        track: TrackId,
        buffer: Arc<AudioBuffer>,
        start_offset: f64,
        source_offset: f64,
        duration: f64,
    ) -> Result<()> {
        if !start_offset.is_finite() || !source_offset.is_finite() || !duration.is_finite() {
            return Err(Error::InvalidClip("clip times must be finite".to_string()));
        }
        if source_offset < 0.0 || duration <= 0.0 {
            return Err(Error::InvalidClip(format!(
                "offset {} / duration {} out of range",
                source_offset, duration
            )));
        }
        if source_offset >= buffer.duration_secs() {
            return Err(Error::InvalidClip(format!(
                "offset {} is past the end of a {:.2}s buffer",
                source_offset,
                buffer.duration_secs()
            )));
        }

        let t = self.track_mut(track)?;
        t.clips.push(Clip {
            buffer,
            start_offset,
            source_offset,
            duration,
        });
        Ok(())
    }

    /// Start the transport. Returns the number of clips scheduled; does
    /// nothing while already playing.
    pub fn play(&mut self, engine: &mut Engine) -> usize {
        if self.playing {
            return 0;
        }
        let _enter = self.span.enter();

        let now = engine.current_time();
        self.playing = true;
        self.started_at = now;

        let mut scheduled = 0;
        for track in self.tracks.iter_mut().filter(|t| !t.muted) {
            for clip in &track.clips {
                let at = now + clip.start_offset;
                if at < now {
                    debug!(track = %track.name, start = clip.start_offset, "Skipping clip already past");
                    continue;
                }
                let node = SoundNode::buffer(
                    clip.buffer.samples(),
                    clip.buffer.sample_rate(),
                    engine.sample_rate(),
                    at,
                    clip.source_offset,
                    clip.duration,
                )
                .with_bus(track.bus);
                track.sources.push(engine.schedule(node));
                scheduled += 1;
            }
        }

        info!(tracks = self.tracks.len(), clips = scheduled, "Mixer playing");
        scheduled
    }

    /// Stop every scheduled clip and rewind the transport
    pub fn stop(&mut self, engine: &mut Engine) {
        let stopped: usize = self
            .tracks
            .iter_mut()
            .map(|t| engine.stop_nodes(&std::mem::take(&mut t.sources)))
            .sum();

        if self.playing {
            let _enter = self.span.enter();
            info!(stopped, "Mixer stopped");
        }
        self.playing = false;
        self.started_at = 0.0;
    }

    pub fn set_track_muted(&mut self, engine: &mut Engine, track: TrackId, muted: bool) -> Result<()> {
        let t = self.track_mut(track)?;
        t.muted = muted;
        engine.set_bus_gain(t.bus, if muted { 0.0 } else { 1.0 });
        debug!(track = %t.name, muted, "Track mute changed");
        Ok(())
    }

    /// Flip a track's mute, returning the new state
    pub fn toggle_mute(&mut self, engine: &mut Engine, track: TrackId) -> Result<bool> {
        let muted = !self.track(track)?.muted;
        self.set_track_muted(engine, track, muted)?;
        Ok(muted)
    }

    /// Set the mixer's own output level, clamped to 0.0..=1.0
    pub fn set_master_volume(&mut self, engine: &mut Engine, volume: f64) -> f64 {
        self.master_volume = volume.clamp(0.0, 1.0);
        engine.set_bus_gain(self.master, self.master_volume);
        self.master_volume
    }

    pub fn master_volume(&self) -> f64 {
        self.master_volume
    }

    /// Seconds since `play`, while playing
    pub fn elapsed(&self, engine: &Engine) -> Option<f64> {
        self.playing
            .then(|| (engine.current_time() - self.started_at).max(0.0))
    }

    /// Position in the loop, 0.0..1.0, while playing
    pub fn progress(&self, engine: &Engine) -> Option<f64> {
        self.elapsed(engine)
            .map(|elapsed| (elapsed % self.loop_duration) / self.loop_duration)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn loop_duration(&self) -> f64 {
        self.loop_duration
    }

    pub fn track(&self, track: TrackId) -> Result<&Track> {
        self.tracks.get(track.0).ok_or(Error::UnknownTrack(track.0))
    }

    pub fn tracks(&self) -> impl Iterator<Item = (TrackId, &Track)> {
        self.tracks.iter().enumerate().map(|(i, t)| (TrackId(i), t))
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn track_mut(&mut self, track: TrackId) -> Result<&mut Track> {
        self.tracks.get_mut(track.0).ok_or(Error::UnknownTrack(track.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 1000.0;

    fn ones(seconds: f64) -> Arc<AudioBuffer> {
        Arc::new(AudioBuffer::new(SR, vec![1.0; (seconds * SR) as usize]))
    }

    fn setup() -> (Engine, MultiTrackMixer) {
        let mut engine = Engine::new(SR);
        let mixer = MultiTrackMixer::new(&mut engine, DEFAULT_LOOP_SECS);
        (engine, mixer)
    }

    #[test]
    fn test_add_tracks() {
        let (mut engine, mut mixer) = setup();
        let a = mixer.add_track(&mut engine, "Drums");
        let b = mixer.add_track(&mut engine, "Bass");
        assert_ne!(a, b);
        assert_eq!(mixer.track_count(), 2);
        assert_eq!(mixer.track(b).unwrap().name(), "Bass");
    }

    #[test]
    fn test_schedule_clip_validation() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Drums");

        assert!(mixer.schedule_clip(track, ones(1.0), 0.0, 0.0, 1.0).is_ok());
        assert!(mixer.schedule_clip(track, ones(1.0), 0.0, 0.0, 0.0).is_err());
        assert!(mixer.schedule_clip(track, ones(1.0), 0.0, -1.0, 1.0).is_err());
        assert!(mixer.schedule_clip(track, ones(1.0), 0.0, 2.0, 1.0).is_err());
        assert!(mixer.schedule_clip(track, ones(1.0), f64::NAN, 0.0, 1.0).is_err());
        assert!(matches!(
            mixer.schedule_clip(TrackId(9), ones(1.0), 0.0, 0.0, 1.0),
            Err(Error::UnknownTrack(9))
        ));
        assert_eq!(mixer.track(track).unwrap().clips().len(), 1);
    }

    #[test]
    fn test_play_schedules_clip_segments() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Drums");
        mixer.schedule_clip(track, ones(2.0), 0.5, 1.0, 0.25).unwrap();

        assert_eq!(mixer.play(&mut engine), 1);
        let out = engine.render(1000);
        assert!(out[..500].iter().all(|&s| s == 0.0));
        assert!(out[500..750].iter().all(|&s| s == 1.0));
        assert!(out[750..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_play_twice_is_noop() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Drums");
        mixer.schedule_clip(track, ones(1.0), 0.0, 0.0, 1.0).unwrap();

        assert_eq!(mixer.play(&mut engine), 1);
        assert_eq!(mixer.play(&mut engine), 0);
        assert_eq!(engine.active_node_count(), 1);
    }

    #[test]
    fn test_past_clips_skipped() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Drums");
        mixer.schedule_clip(track, ones(1.0), -0.5, 0.0, 1.0).unwrap();
        mixer.schedule_clip(track, ones(1.0), 0.0, 0.0, 1.0).unwrap();

        assert_eq!(mixer.play(&mut engine), 1);
    }

    #[test]
    fn test_muted_tracks_not_scheduled() {
        let (mut engine, mut mixer) = setup();
        let drums = mixer.add_track(&mut engine, "Drums");
        let bass = mixer.add_track(&mut engine, "Bass");
        mixer.schedule_clip(drums, ones(1.0), 0.0, 0.0, 1.0).unwrap();
        mixer.schedule_clip(bass, ones(1.0), 0.0, 0.0, 1.0).unwrap();

        mixer.set_track_muted(&mut engine, bass, true).unwrap();
        assert_eq!(mixer.play(&mut engine), 1);
    }

    #[test]
    fn test_mute_takes_effect_immediately() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Lead");
        mixer.schedule_clip(track, ones(2.0), 0.0, 0.0, 2.0).unwrap();
        mixer.play(&mut engine);

        assert_eq!(engine.process(), 1.0);
        assert!(mixer.toggle_mute(&mut engine, track).unwrap());
        assert_eq!(engine.process(), 0.0);
        assert!(!mixer.toggle_mute(&mut engine, track).unwrap());
        assert_eq!(engine.process(), 1.0);
    }

    #[test]
    fn test_master_volume() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Pad");
        mixer.schedule_clip(track, ones(1.0), 0.0, 0.0, 1.0).unwrap();
        mixer.play(&mut engine);

        assert_eq!(mixer.set_master_volume(&mut engine, 2.0), 1.0);
        assert_eq!(mixer.set_master_volume(&mut engine, 0.5), 0.5);
        assert_eq!(engine.process(), 0.5);
    }

    #[test]
    fn test_stop_rewinds_and_silences() {
        let (mut engine, mut mixer) = setup();
        let track = mixer.add_track(&mut engine, "Drums");
        mixer.schedule_clip(track, ones(1.0), 0.0, 0.0, 1.0).unwrap();
        mixer.schedule_clip(track, ones(1.0), 3.0, 0.0, 1.0).unwrap();
        mixer.play(&mut engine);
        engine.advance(0.5);

        mixer.stop(&mut engine);
        mixer.stop(&mut engine);
        assert!(!mixer.is_playing());
        assert_eq!(mixer.progress(&engine), None);
        assert_eq!(engine.active_node_count(), 0);
    }

    #[test]
    fn test_progress_loops() {
        let (mut engine, mut mixer) = setup();
        mixer.play(&mut engine);
        engine.advance(2.0);
        assert!((mixer.progress(&engine).unwrap() - 0.25).abs() < 1e-9);
        engine.advance(8.0);
        assert!((mixer.progress(&engine).unwrap() - 0.25).abs() < 1e-9);
    }
}
