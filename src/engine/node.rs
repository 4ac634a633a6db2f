//! Scheduled sound nodes
//!
//! A `SoundNode` is one sound source with its own gain automation, an
//! optional filter, a start time and an optional stop time, all on the
//! engine's audio clock. Nodes are owned by the `Engine` and addressed by
//! `NodeId`.

use std::fmt;
use std::sync::Arc;

use crate::synth::{Envelope, Filter, Oscillator, Waveform};

/// Handle to a node registered with an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle to a mix bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(pub(crate) usize);

/// Reads a slice of a shared sample buffer
#[derive(Debug, Clone)]
pub struct BufferCursor {
    data: Arc<[f32]>,
    position: f64,
    end: f64,
    step: f64,
    looping: bool,
}

impl BufferCursor {
    fn new(data: Arc<[f32]>, buffer_rate: f64, output_rate: f64, offset_secs: f64, duration_secs: f64) -> Self {
        let len = data.len() as f64;
        let position = (offset_secs.max(0.0) * buffer_rate).min(len);
        let end = (position + duration_secs.max(0.0) * buffer_rate).min(len);
        Self {
            data,
            position,
            end,
            step: buffer_rate / output_rate,
            looping: false,
        }
    }

    /// Reads `duration_secs` worth of samples, wrapping to the start of
    /// the data as often as needed. Empty data is exhausted at once.
    fn looped(data: Arc<[f32]>, buffer_rate: f64, output_rate: f64, duration_secs: f64) -> Self {
        let end = if data.is_empty() {
            0.0
        } else {
            duration_secs.max(0.0) * buffer_rate
        };
        Self {
            data,
            position: 0.0,
            end,
            step: buffer_rate / output_rate,
            looping: true,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.end
    }

    fn next(&mut self) -> f64 {
        if self.is_exhausted() {
            return 0.0;
        }
        let mut index = self.position as usize;
        if self.looping {
            index %= self.data.len();
        }
        let sample = self.data[index] as f64;
        self.position += self.step;
        sample
    }
}

/// What a node plays
#[derive(Debug, Clone)]
pub enum Source {
    /// A single oscillator with pitch automation
    Oscillator { osc: Oscillator, pitch: Envelope },
    /// Several fixed-pitch oscillators summed, for metallic partials
    Cluster { oscs: Vec<Oscillator> },
    /// A segment of a sample buffer
    Buffer(BufferCursor),
}

/// One schedulable sound
#[derive(Debug, Clone)]
pub struct SoundNode {
    source: Source,
    gain: Envelope,
    filter: Option<Filter>,
    start: f64,
    stop: Option<f64>,
    bus: Option<BusId>,
}

impl SoundNode {
    fn with_source(source: Source, start: f64) -> Self {
        Self {
            source,
            gain: Envelope::new(1.0),
            filter: None,
            start,
            stop: None,
            bus: None,
        }
    }

    /// An oscillator starting at `start`
    pub fn oscillator(waveform: Waveform, frequency: f64, sample_rate: f64, start: f64) -> Self {
        Self::with_source(
            Source::Oscillator {
                osc: Oscillator::new(waveform, frequency, sample_rate),
                pitch: Envelope::new(frequency),
            },
            start,
        )
    }

    /// Summed oscillators at fixed frequencies
    pub fn cluster(waveform: Waveform, frequencies: &[f64], sample_rate: f64, start: f64) -> Self {
        let oscs = frequencies
            .iter()
            .map(|&f| Oscillator::new(waveform, f, sample_rate))
            .collect();
        Self::with_source(Source::Cluster { oscs }, start)
    }

    /// Play `duration_secs` of `data` beginning `offset_secs` into it.
    /// The node ends on its own when the segment is used up.
    pub fn buffer(
        data: Arc<[f32]>,
        buffer_rate: f64,
        output_rate: f64,
        start: f64,
        offset_secs: f64,
        duration_secs: f64,
    ) -> Self {
        let cursor = BufferCursor::new(data, buffer_rate, output_rate, offset_secs, duration_secs);
        Self::with_source(Source::Buffer(cursor), start)
    }

    /// Play `duration_secs` of `data` from its start, looping over it
    /// when the duration is longer than the data
    pub fn looped_buffer(data: Arc<[f32]>, buffer_rate: f64, output_rate: f64, start: f64, duration_secs: f64) -> Self {
        let cursor = BufferCursor::looped(data, buffer_rate, output_rate, duration_secs);
        Self::with_source(Source::Buffer(cursor), start)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_bus(mut self, bus: BusId) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn with_stop(mut self, time: f64) -> Self {
        self.stop = Some(time);
        self
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop_time(&self) -> Option<f64> {
        self.stop
    }

    pub fn set_stop(&mut self, time: f64) {
        self.stop = Some(time);
    }

    pub fn bus(&self) -> Option<BusId> {
        self.bus
    }

    pub fn gain(&self) -> &Envelope {
        &self.gain
    }

    pub fn gain_mut(&mut self) -> &mut Envelope {
        &mut self.gain
    }

    /// Pitch automation, for single-oscillator nodes
    pub fn pitch_mut(&mut self) -> Option<&mut Envelope> {
        match &mut self.source {
            Source::Oscillator { pitch, .. } => Some(pitch),
            _ => None,
        }
    }

    /// Whether the node has reached its stop time or run out of samples
    pub fn is_done(&self, time: f64) -> bool {
        if self.stop.is_some_and(|stop| time >= stop) {
            return true;
        }
        match &self.source {
            Source::Buffer(cursor) => cursor.is_exhausted(),
            _ => false,
        }
    }

    /// Render the sample at `time`. Silent before the start time.
    pub fn render(&mut self, time: f64) -> f64 {
        if time < self.start {
            return 0.0;
        }

        let raw = match &mut self.source {
            Source::Oscillator { osc, pitch } => {
                osc.set_frequency(pitch.value_at(time));
                osc.generate()
            }
            Source::Cluster { oscs } => {
                if oscs.is_empty() {
                    0.0
                } else {
                    let n = oscs.len() as f64;
                    oscs.iter_mut().map(|o| o.generate()).sum::<f64>() / n
                }
            }
            Source::Buffer(cursor) => cursor.next(),
        };

        let shaped = match &mut self.filter {
            Some(filter) => filter.process(raw),
            None => raw,
        };

        shaped * self.gain.value_at(time)
    }
}
