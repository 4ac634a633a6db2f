//! Drum pads and kit presets

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name of the kit used when a lookup fails
pub const DEFAULT_KIT: &str = "STANDARD";

/// The eight pads of the octapad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pad {
    #[serde(rename = "kick")]
    Kick,
    #[serde(rename = "snare")]
    Snare,
    #[serde(rename = "hihat", alias = "hi-hat")]
    HiHat,
    #[serde(rename = "tom1", alias = "tom-high")]
    TomHigh,
    #[serde(rename = "tom2", alias = "tom-low")]
    TomLow,
    #[serde(rename = "crash")]
    Crash,
    #[serde(rename = "ride")]
    Ride,
    #[serde(rename = "clap")]
    Clap,
}

impl Pad {
    /// Every pad, in the order the pads sit on the instrument
    pub const ALL: [Pad; 8] = [
        Pad::Crash,
        Pad::Ride,
        Pad::TomHigh,
        Pad::TomLow,
        Pad::HiHat,
        Pad::Snare,
        Pad::Kick,
        Pad::Clap,
    ];

    /// Resolve a pad identifier.
    ///
    /// Accepts canonical ids (`tom1`), descriptive names (`tom-high`) and
    /// feed-style ids that merely contain a pad name (`pad-kick-2`).
    pub fn from_key(key: &str) -> Option<Pad> {
        let key = key.trim().to_ascii_lowercase();
        let pad = match key.as_str() {
            "kick" | "bass" | "bassdrum" => Pad::Kick,
            "snare" => Pad::Snare,
            "hihat" | "hi-hat" | "hi_hat" | "hat" => Pad::HiHat,
            "tom1" | "tom-high" | "tom_high" | "tomhigh" | "hightom" => Pad::TomHigh,
            "tom2" | "tom-low" | "tom_low" | "tomlow" | "lowtom" => Pad::TomLow,
            "crash" => Pad::Crash,
            "ride" => Pad::Ride,
            "clap" => Pad::Clap,
            other => {
                const CONTAINED: [(&str, Pad); 7] = [
                    ("kick", Pad::Kick),
                    ("snare", Pad::Snare),
                    ("hihat", Pad::HiHat),
                    ("hi-hat", Pad::HiHat),
                    ("crash", Pad::Crash),
                    ("ride", Pad::Ride),
                    ("clap", Pad::Clap),
                ];
                return CONTAINED
                    .iter()
                    .find(|(name, _)| other.contains(name))
                    .map(|(_, pad)| *pad);
            }
        };
        Some(pad)
    }

    /// Canonical identifier, as stored in recordings
    pub fn id(&self) -> &'static str {
        match self {
            Pad::Kick => "kick",
            Pad::Snare => "snare",
            Pad::HiHat => "hihat",
            Pad::TomHigh => "tom1",
            Pad::TomLow => "tom2",
            Pad::Crash => "crash",
            Pad::Ride => "ride",
            Pad::Clap => "clap",
        }
    }
}

impl fmt::Display for Pad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Per-pad synthesis overrides. Unset fields use the pad's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PadParams {
    /// Base pitch in Hz
    pub frequency: Option<f64>,
    /// Decay length in seconds
    pub decay: Option<f64>,
    /// Filter cutoff or centre in Hz
    pub cutoff: Option<f64>,
    /// Whether the snare mixes in a noise burst
    pub noise: Option<bool>,
}

impl PadParams {
    fn frequency(frequency: f64) -> Self {
        Self {
            frequency: Some(frequency),
            ..Self::default()
        }
    }

    fn cutoff(cutoff: f64) -> Self {
        Self {
            cutoff: Some(cutoff),
            ..Self::default()
        }
    }
}

/// A named set of pad parameters and display labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kit {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub pads: BTreeMap<Pad, PadParams>,
}

impl Kit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            labels: Vec::new(),
            pads: BTreeMap::new(),
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_pad(mut self, pad: Pad, params: PadParams) -> Self {
        self.pads.insert(pad, params);
        self
    }

    /// Parameters for a pad; all defaults when the kit does not set any
    pub fn params(&self, pad: Pad) -> PadParams {
        self.pads.get(&pad).copied().unwrap_or_default()
    }

    /// Display label of a pad, falling back to its id
    pub fn label(&self, pad: Pad) -> String {
        Pad::ALL
            .iter()
            .position(|p| *p == pad)
            .and_then(|idx| self.labels.get(idx))
            .cloned()
            .unwrap_or_else(|| pad.id().to_uppercase())
    }

    pub fn standard() -> Self {
        Kit::new("STANDARD")
            .with_labels(&["CRASH", "RIDE", "TOM 1", "TOM 2", "HI-HAT", "SNARE", "KICK", "CLAP"])
            .with_pad(
                Pad::Kick,
                PadParams {
                    frequency: Some(150.0),
                    decay: Some(0.5),
                    ..PadParams::default()
                },
            )
            .with_pad(
                Pad::Snare,
                PadParams {
                    frequency: Some(250.0),
                    noise: Some(true),
                    ..PadParams::default()
                },
            )
            .with_pad(Pad::HiHat, PadParams::cutoff(5000.0))
            .with_pad(Pad::TomHigh, PadParams::frequency(200.0))
            .with_pad(Pad::TomLow, PadParams::frequency(100.0))
            .with_pad(Pad::Clap, PadParams::cutoff(900.0))
    }

    pub fn techno() -> Self {
        Kit::new("TECHNO")
            .with_labels(&[
                "PERC 1", "CYMBAL", "SUB TOM", "CLAVE", "CLOSED H", "RIMSHOT", "KICK DEEP", "FX HIT",
            ])
            .with_pad(
                Pad::Kick,
                PadParams {
                    frequency: Some(80.0),
                    decay: Some(0.3),
                    ..PadParams::default()
                },
            )
            .with_pad(
                Pad::Snare,
                PadParams {
                    frequency: Some(350.0),
                    decay: Some(0.05),
                    noise: Some(true),
                    ..PadParams::default()
                },
            )
            .with_pad(Pad::HiHat, PadParams::cutoff(8000.0))
            .with_pad(Pad::TomHigh, PadParams::frequency(150.0))
            .with_pad(Pad::TomLow, PadParams::frequency(70.0))
            .with_pad(Pad::Clap, PadParams::cutoff(1500.0))
    }

    pub fn vintage() -> Self {
        Kit::new("VINTAGE")
            .with_labels(&[
                "HIGH HAT", "SNARE LO", "FLOOR", "MID TOM", "PEDAL H", "SIDE STICK", "KICK WARM", "CLAP LO",
            ])
            .with_pad(
                Pad::Kick,
                PadParams {
                    frequency: Some(100.0),
                    decay: Some(0.6),
                    ..PadParams::default()
                },
            )
            .with_pad(
                Pad::Snare,
                PadParams {
                    frequency: Some(200.0),
                    noise: Some(true),
                    ..PadParams::default()
                },
            )
            .with_pad(Pad::HiHat, PadParams::cutoff(3500.0))
            .with_pad(Pad::TomHigh, PadParams::frequency(250.0))
            .with_pad(Pad::TomLow, PadParams::frequency(120.0))
            .with_pad(Pad::Clap, PadParams::cutoff(600.0))
    }
}

impl Default for Kit {
    fn default() -> Self {
        Kit::standard()
    }
}

/// Kit presets plus any kits added from configuration
#[derive(Debug, Clone)]
pub struct KitLibrary {
    kits: Vec<Kit>,
}

impl KitLibrary {
    /// The three built-in presets
    pub fn new() -> Self {
        Self {
            kits: vec![Kit::standard(), Kit::techno(), Kit::vintage()],
        }
    }

    /// Add a kit, replacing any kit with the same name
    pub fn add(&mut self, kit: Kit) {
        match self.kits.iter_mut().find(|k| k.name.eq_ignore_ascii_case(&kit.name)) {
            Some(existing) => *existing = kit,
            None => self.kits.push(kit),
        }
    }

    /// Exact lookup, case-insensitive
    pub fn find(&self, name: &str) -> Option<&Kit> {
        self.kits.iter().find(|k| k.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Lookup that falls back to the standard kit
    pub fn get(&self, name: &str) -> &Kit {
        if let Some(kit) = self.find(name) {
            return kit;
        }
        warn!(kit = name, "Unknown kit, using {}", DEFAULT_KIT);
        self.standard()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kits.iter().map(|k| k.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Kit> {
        self.kits.iter()
    }

    fn standard(&self) -> &Kit {
        // The library is created with the standard kit and `add` can only
        // replace it, never remove it
        &self.kits[0]
    }
}

impl Default for KitLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pad_from_key() {
        assert_eq!(Pad::from_key("kick"), Some(Pad::Kick));
        assert_eq!(Pad::from_key("HIHAT"), Some(Pad::HiHat));
        assert_eq!(Pad::from_key("hi-hat"), Some(Pad::HiHat));
        assert_eq!(Pad::from_key("tom1"), Some(Pad::TomHigh));
        assert_eq!(Pad::from_key("tom_low"), Some(Pad::TomLow));
        assert_eq!(Pad::from_key("tomlow"), Some(Pad::TomLow));
        assert_eq!(Pad::from_key("pad-snare-3"), Some(Pad::Snare));
        assert_eq!(Pad::from_key("cowbell"), None);
        assert_eq!(Pad::from_key(""), None);
    }

    #[test]
    fn test_pad_id_round_trip() {
        for pad in Pad::ALL {
            assert_eq!(Pad::from_key(pad.id()), Some(pad));
        }
    }

    #[test]
    fn test_preset_values() {
        let techno = Kit::techno();
        assert_eq!(techno.params(Pad::Kick).frequency, Some(80.0));
        assert_eq!(techno.params(Pad::Snare).decay, Some(0.05));
        assert_eq!(techno.params(Pad::HiHat).cutoff, Some(8000.0));
        assert_eq!(techno.params(Pad::Crash), PadParams::default());

        let vintage = Kit::vintage();
        assert_eq!(vintage.params(Pad::TomHigh).frequency, Some(250.0));
        assert_eq!(vintage.params(Pad::Clap).cutoff, Some(600.0));
    }

    #[test]
    fn test_labels() {
        let kit = Kit::standard();
        assert_eq!(kit.labels.len(), 8);
        assert_eq!(kit.label(Pad::Kick), "KICK");
        assert_eq!(Kit::techno().label(Pad::Crash), "PERC 1");
        assert_eq!(Kit::new("BARE").label(Pad::Ride), "RIDE");
    }

    #[test]
    fn test_library_fallback() {
        let library = KitLibrary::new();
        assert_eq!(library.get("techno").name, "TECHNO");
        assert_eq!(library.get("NOPE").name, "STANDARD");
        assert!(!library.contains("NOPE"));
    }

    #[test]
    fn test_library_add_replaces() {
        let mut library = KitLibrary::new();
        library.add(Kit::new("LOFI").with_pad(Pad::Kick, PadParams::frequency(60.0)));
        library.add(Kit::new("lofi").with_pad(Pad::Kick, PadParams::frequency(55.0)));

        assert_eq!(library.names().count(), 4);
        assert_eq!(library.get("LOFI").params(Pad::Kick).frequency, Some(55.0));
    }

    #[test]
    fn test_kit_deserialize() {
        let yaml = "name: LOFI\npads:\n  kick: { frequency: 60.0, decay: 0.8 }\n  tom-low: { frequency: 90.0 }\n";
        let kit: Kit = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(kit.params(Pad::Kick).decay, Some(0.8));
        assert_eq!(kit.params(Pad::TomLow).frequency, Some(90.0));
        assert!(kit.labels.is_empty());
    }
}
