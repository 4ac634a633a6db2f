//! Audio engine for tonebox
//!
//! Owns the audio clock, the active node list, mix buses and the master
//! volume. Every sound the synthesizers produce is registered here so a
//! global stop can cut it short.

pub mod clips;
pub mod clock;
pub mod export;
pub mod mixer;
pub mod node;
pub mod player;
pub mod recorder;
pub mod scheduler;
pub mod sink;
pub mod voices;

pub use clips::{library_entry, AudioBuffer, ClipKind, LibraryEntry, DEFAULT_LIBRARY};
pub use clock::{Clock, ManualClock, SystemClock};
pub use export::WavExporter;
pub use mixer::{MultiTrackMixer, TrackId, DEFAULT_LOOP_SECS};
pub use node::{BusId, NodeId, SoundNode};
pub use player::{Player, PlayerOptions};
pub use recorder::Recorder;
pub use scheduler::{
    total_duration_ms, DrumInstrument, Instrument, MelodyInstrument, PlaybackState, SequenceScheduler, SessionId,
    DEFAULT_NOTE_MS,
};
pub use sink::{watch, ChannelSink, Completion, FnSink, NullSink, PlaybackSink, PlaybackWatch};
pub use voices::{Voice, VoiceRegistry};

use crate::synth::{Envelope, NoiseCache};
use std::sync::Arc;
use tracing::{debug, span, Level, Span};

/// Anything that can fill an output buffer
pub trait Render: Send {
    fn render_sample(&mut self) -> f64;

    /// Fill a mono buffer
    fn fill_buffer(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.render_sample() as f32;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bus {
    gain: f64,
    parent: Option<BusId>,
}

/// The audio graph
pub struct Engine {
    sample_rate: f64,
    frame: u64,
    nodes: Vec<(NodeId, SoundNode)>,
    next_id: u64,
    buses: Vec<Bus>,
    volume: f64,
    noise: NoiseCache,
    span: Span,
}

impl Engine {
    /// Create an engine running at `sample_rate`
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            frame: 0,
            nodes: Vec::new(),
            next_id: 0,
            buses: Vec::new(),
            volume: 1.0,
            noise: NoiseCache::new(sample_rate),
            span: span!(Level::INFO, "engine"),
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Current position of the audio clock in seconds
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Set the master volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f64) -> f64 {
        self.volume = volume.clamp(0.0, 1.0);
        self.volume
    }

    /// The shared white-noise buffer
    pub fn noise(&self) -> Arc<[f32]> {
        self.noise.buffer()
    }

    /// Register a node on the active list
    pub fn schedule(&mut self, node: SoundNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push((id, node));
        id
    }

    /// Stop and disconnect a node immediately.
    ///
    /// Returns false when the node is unknown or already gone; stopping
    /// twice is harmless.
    pub fn stop_node(&mut self, id: NodeId) -> bool {
        match self.nodes.iter().position(|(nid, _)| *nid == id) {
            Some(idx) => {
                self.nodes.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Schedule a node to stop at `time`
    pub fn stop_node_at(&mut self, id: NodeId, time: f64) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                node.set_stop(time);
                true
            }
            None => false,
        }
    }

    /// Stop a batch of nodes, returning how many were still live
    pub fn stop_nodes(&mut self, ids: &[NodeId]) -> usize {
        ids.iter().filter(|&&id| self.stop_node(id)).count()
    }

    /// Stop everything
    pub fn stop_all(&mut self) {
        let _enter = self.span.enter();
        if !self.nodes.is_empty() {
            debug!(count = self.nodes.len(), "Stopping all nodes");
        }
        self.nodes.clear();
    }

    pub fn node(&self, id: NodeId) -> Option<&SoundNode> {
        self.nodes.iter().find(|(nid, _)| *nid == id).map(|(_, n)| n)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SoundNode> {
        self.nodes.iter_mut().find(|(nid, _)| *nid == id).map(|(_, n)| n)
    }

    /// Gain automation of a live node
    pub fn gain_param_mut(&mut self, id: NodeId) -> Option<&mut Envelope> {
        self.node_mut(id).map(|n| n.gain_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|(nid, _)| *nid == id)
    }

    /// Number of nodes on the active list
    pub fn active_node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn active_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|(id, _)| *id)
    }

    /// Create a gain stage, optionally feeding another bus
    pub fn add_bus(&mut self, gain: f64, parent: Option<BusId>) -> BusId {
        self.buses.push(Bus {
            gain: gain.max(0.0),
            parent,
        });
        BusId(self.buses.len() - 1)
    }

    pub fn set_bus_gain(&mut self, bus: BusId, gain: f64) {
        if let Some(b) = self.buses.get_mut(bus.0) {
            b.gain = gain.max(0.0);
        }
    }

    pub fn bus_gain(&self, bus: BusId) -> Option<f64> {
        self.buses.get(bus.0).map(|b| b.gain)
    }

    /// Generate the next sample (mix of all live nodes)
    pub fn process(&mut self) -> f64 {
        let t = self.current_time();
        self.nodes.retain(|(_, node)| !node.is_done(t));

        let buses = &self.buses;
        let mut output = 0.0;
        for (_, node) in self.nodes.iter_mut() {
            let sample = node.render(t);
            if sample != 0.0 {
                output += sample * effective_gain(buses, node.bus());
            }
        }

        self.frame += 1;
        output * self.volume
    }

    /// Render `frames` samples
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        (0..frames).map(|_| self.process() as f32).collect()
    }

    /// Advance the clock by `seconds`, rendering and discarding the audio
    pub fn advance(&mut self, seconds: f64) {
        let frames = (seconds * self.sample_rate).round() as usize;
        for _ in 0..frames {
            self.process();
        }
    }
}

impl Render for Engine {
    fn render_sample(&mut self) -> f64 {
        self.process()
    }
}

/// Product of a bus's gain and all of its parents
fn effective_gain(buses: &[Bus], bus: Option<BusId>) -> f64 {
    let mut gain = 1.0;
    let mut current = bus;
    // Parents are always created before children, so the walk terminates
    while let Some(BusId(idx)) = current {
        match buses.get(idx) {
            Some(b) => {
                gain *= b.gain;
                current = b.parent.filter(|p| p.0 < idx);
            }
            None => break,
        }
    }
    gain
}
