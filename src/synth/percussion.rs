//! Drum synthesis
//!
//! Each pad has a fixed recipe: pitch drops for kick and toms, filtered
//! noise for cymbals and claps, a tone plus noise blend for the snare and
//! a cluster of square partials for the hi-hat. Kits tune the recipes
//! through `PadParams`.

use tracing::debug;

use super::filter::Filter;
use super::kit::{Kit, Pad};
use super::oscillator::Waveform;
use crate::engine::{Engine, NodeId, SoundNode};

const KICK_FREQUENCY: f64 = 150.0;
const KICK_DECAY: f64 = 0.5;

const SNARE_FREQUENCY: f64 = 250.0;
const SNARE_TONE_DECAY: f64 = 0.1;
const SNARE_TONE_LENGTH: f64 = 0.2;
const SNARE_NOISE_DECAY: f64 = 0.2;

const HIHAT_CUTOFF: f64 = 5000.0;
const HIHAT_DECAY: f64 = 0.1;
const HIHAT_FUNDAMENTAL: f64 = 40.0;
/// Partial ratios of the classic analog hi-hat
const HIHAT_RATIOS: [f64; 6] = [2.0, 3.0, 4.16, 5.43, 6.79, 8.21];

const TOM_HIGH_FREQUENCY: f64 = 200.0;
const TOM_LOW_FREQUENCY: f64 = 100.0;
const TOM_DECAY: f64 = 0.5;
const TOM_FLOOR_HZ: f64 = 20.0;

const CRASH_CENTER: f64 = 3000.0;
const CRASH_DECAY: f64 = 1.5;
const RIDE_CENTER: f64 = 5000.0;
const RIDE_DECAY: f64 = 0.8;
const CYMBAL_Q: f64 = 0.5;

const CLAP_CENTER: f64 = 900.0;
const CLAP_Q: f64 = 1.0;
const CLAP_ATTACK: f64 = 0.01;
const CLAP_DECAY: f64 = 0.15;
const CLAP_LENGTH: f64 = 0.2;

/// Gain every percussive decay ends on
const FLOOR: f64 = 0.01;

/// Schedule the sound for `key` at `start`. Unknown keys produce nothing.
pub fn trigger(engine: &mut Engine, key: &str, start: f64, kit: &Kit) -> Vec<NodeId> {
    match Pad::from_key(key) {
        Some(pad) => trigger_pad(engine, pad, start, kit),
        None => {
            debug!(key, "Ignoring unknown pad");
            Vec::new()
        }
    }
}

/// Schedule the sound for `pad` at `start`
pub fn trigger_pad(engine: &mut Engine, pad: Pad, start: f64, kit: &Kit) -> Vec<NodeId> {
    let params = kit.params(pad);
    match pad {
        Pad::Kick => {
            let freq = params.frequency.unwrap_or(KICK_FREQUENCY);
            let decay = params.decay.unwrap_or(KICK_DECAY);
            vec![pitch_drop(engine, freq, 0.01, 1.0, start, decay)]
        }
        Pad::Snare => {
            let freq = params.frequency.unwrap_or(SNARE_FREQUENCY);
            let mut tone = SoundNode::oscillator(Waveform::Triangle, freq, engine.sample_rate(), start)
                .with_stop(start + SNARE_TONE_LENGTH);
            tone.gain_mut()
                .set_value_at(0.5, start)
                .exponential_ramp_to(FLOOR, start + SNARE_TONE_DECAY);
            let mut ids = vec![engine.schedule(tone)];

            if params.noise.unwrap_or(true) {
                let decay = params.decay.unwrap_or(SNARE_NOISE_DECAY);
                let burst = noise_burst(engine, start, decay, 1.0);
                ids.push(engine.schedule(burst));
            }
            ids
        }
        Pad::HiHat => {
            let cutoff = params.cutoff.unwrap_or(HIHAT_CUTOFF);
            let decay = params.decay.unwrap_or(HIHAT_DECAY);
            let partials: Vec<f64> = HIHAT_RATIOS.iter().map(|r| r * HIHAT_FUNDAMENTAL).collect();

            let mut node = SoundNode::cluster(Waveform::Square, &partials, engine.sample_rate(), start)
                .with_filter(Filter::high_pass(engine.sample_rate(), cutoff))
                .with_stop(start + decay);
            node.gain_mut()
                .set_value_at(0.7, start)
                .exponential_ramp_to(FLOOR, start + decay);
            vec![engine.schedule(node)]
        }
        Pad::TomHigh | Pad::TomLow => {
            let default_freq = if pad == Pad::TomHigh {
                TOM_HIGH_FREQUENCY
            } else {
                TOM_LOW_FREQUENCY
            };
            let freq = params.frequency.unwrap_or(default_freq);
            let decay = params.decay.unwrap_or(TOM_DECAY);
            vec![pitch_drop(engine, freq, TOM_FLOOR_HZ, 0.8, start, decay)]
        }
        Pad::Crash | Pad::Ride => {
            let (center, default_decay) = if pad == Pad::Crash {
                (CRASH_CENTER, CRASH_DECAY)
            } else {
                (RIDE_CENTER, RIDE_DECAY)
            };
            let center = params.cutoff.unwrap_or(center);
            let decay = params.decay.unwrap_or(default_decay);

            let node = noise_burst(engine, start, decay, 0.6)
                .with_filter(Filter::band_pass(engine.sample_rate(), center, CYMBAL_Q));
            vec![engine.schedule(node)]
        }
        Pad::Clap => {
            let center = params.cutoff.unwrap_or(CLAP_CENTER);
            let sr = engine.sample_rate();
            let mut node = SoundNode::buffer(engine.noise(), sr, sr, start, 0.0, CLAP_LENGTH)
                .with_filter(Filter::band_pass(sr, center, CLAP_Q));
            node.gain_mut()
                .set_value_at(0.0, start)
                .linear_ramp_to(0.8, start + CLAP_ATTACK)
                .exponential_ramp_to(FLOOR, start + CLAP_DECAY);
            vec![engine.schedule(node)]
        }
    }
}

/// How long the sound for `key` lasts under `kit`, in milliseconds.
/// Unknown keys last 0 ms.
pub fn natural_duration_ms(key: &str, kit: &Kit) -> u64 {
    Pad::from_key(key)
        .map(|pad| natural_duration(pad, kit))
        .unwrap_or(0)
}

/// Length of a pad's sound in milliseconds
pub fn natural_duration(pad: Pad, kit: &Kit) -> u64 {
    let params = kit.params(pad);
    let seconds = match pad {
        Pad::Kick => params.decay.unwrap_or(KICK_DECAY),
        Pad::Snare => {
            let noise = if params.noise.unwrap_or(true) {
                params.decay.unwrap_or(SNARE_NOISE_DECAY)
            } else {
                0.0
            };
            noise.max(SNARE_TONE_LENGTH)
        }
        Pad::HiHat => params.decay.unwrap_or(HIHAT_DECAY),
        Pad::TomHigh | Pad::TomLow => params.decay.unwrap_or(TOM_DECAY),
        Pad::Crash => params.decay.unwrap_or(CRASH_DECAY),
        Pad::Ride => params.decay.unwrap_or(RIDE_DECAY),
        Pad::Clap => CLAP_LENGTH,
    };
    (seconds * 1000.0).round() as u64
}

/// Sine with pitch and gain both decaying exponentially over `decay`
fn pitch_drop(engine: &mut Engine, freq: f64, end_freq: f64, peak: f64, start: f64, decay: f64) -> NodeId {
    let mut node = SoundNode::oscillator(Waveform::Sine, freq, engine.sample_rate(), start)
        .with_stop(start + decay);
    if let Some(pitch) = node.pitch_mut() {
        pitch.set_value_at(freq, start).exponential_ramp_to(end_freq, start + decay);
    }
    node.gain_mut()
        .set_value_at(peak, start)
        .exponential_ramp_to(FLOOR, start + decay);
    engine.schedule(node)
}

/// Shared noise decaying from `peak` over `decay`. Decays longer than the
/// noise buffer loop over it.
fn noise_burst(engine: &Engine, start: f64, decay: f64, peak: f64) -> SoundNode {
    let sr = engine.sample_rate();
    let mut node = SoundNode::looped_buffer(engine.noise(), sr, sr, start, decay);
    node.gain_mut()
        .set_value_at(peak, start)
        .exponential_ramp_to(FLOOR, start + decay);
    node
}
