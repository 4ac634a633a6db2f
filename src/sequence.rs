//! Recorded performances and their stored form
//!
//! A `Sequence` is the in-memory shape the scheduler plays. Whether it is
//! melodic or percussive is decided once, when it is read from its stored
//! JSON form, and carried as `SequenceKind` from then on.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::synth::ToneKind;

/// Stored type of a keyboard recording
pub const MELODIC_TYPE: &str = "piano";
/// Stored type of a pad recording
pub const PERCUSSIVE_TYPE: &str = "octapad-recording";

/// Longest event time or duration accepted from stored data
pub const MAX_OFFSET_MS: u64 = 24 * 60 * 60 * 1000;

/// One note or pad hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Note name or pad id
    pub key: String,
    /// Offset from the start of the sequence
    pub time_ms: u64,
    pub duration_ms: Option<u64>,
}

impl Event {
    pub fn new(key: impl Into<String>, time_ms: u64) -> Self {
        Self {
            key: key.into(),
            time_ms,
            duration_ms: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// What plays a sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceKind {
    Melodic { tone: ToneKind },
    Percussive { kit: Option<String> },
}

impl SequenceKind {
    pub fn is_percussive(&self) -> bool {
        matches!(self, SequenceKind::Percussive { .. })
    }
}

/// A titled list of events
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub kind: SequenceKind,
    pub title: String,
    pub timestamp: u64,
    pub events: Vec<Event>,
}

impl Sequence {
    pub fn new(kind: SequenceKind, events: Vec<Event>) -> Self {
        Self {
            kind,
            title: String::new(),
            timestamp: 0,
            events,
        }
    }

    pub fn melodic(tone: ToneKind, events: Vec<Event>) -> Self {
        Self::new(SequenceKind::Melodic { tone }, events)
    }

    pub fn percussive(kit: Option<String>, events: Vec<Event>) -> Self {
        Self::new(SequenceKind::Percussive { kit }, events)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Classify and normalize a stored sequence
    pub fn from_stored(stored: StoredSequence) -> Self {
        let items: &[Value] = stored.data.as_array().map(Vec::as_slice).unwrap_or(&[]);
        let data: Vec<StoredEvent> = items
            .iter()
            .map(|item| StoredEvent::deserialize(item).unwrap_or_default())
            .collect();

        let percussive = stored.kit.is_some()
            || data
                .first()
                .is_some_and(|first| first.pad.is_some() || first.pad_id.is_some());

        let kind = if percussive {
            SequenceKind::Percussive { kit: stored.kit }
        } else {
            SequenceKind::Melodic {
                tone: stored
                    .preview_tone
                    .as_deref()
                    .map(ToneKind::from_name)
                    .unwrap_or_default(),
            }
        };

        let events = data.into_iter().filter_map(StoredEvent::into_event).collect();

        Self {
            kind,
            title: stored.title,
            timestamp: stored.timestamp,
            events,
        }
    }

    /// Parse the stored JSON form
    pub fn from_json(json: &str) -> Result<Self> {
        let stored: StoredSequence = serde_json::from_str(json)?;
        Ok(Self::from_stored(stored))
    }

    /// Read a stored sequence from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// The persistence shape, ready for an external store
    pub fn to_stored(&self, title: &str, timestamp: u64) -> StoredSequence {
        let percussive = self.kind.is_percussive();
        let data: Vec<StoredEvent> = self
            .events
            .iter()
            .map(|event| StoredEvent {
                note: (!percussive).then(|| event.key.clone()),
                pad: percussive.then(|| event.key.clone()),
                pad_id: None,
                time: Some(event.time_ms as f64),
                duration: event.duration_ms.map(|d| d as f64),
            })
            .collect();

        let (kind, kit, preview_tone) = match &self.kind {
            SequenceKind::Melodic { tone } => (MELODIC_TYPE, None, Some(tone.name().to_string())),
            SequenceKind::Percussive { kit } => (PERCUSSIVE_TYPE, kit.clone(), None),
        };

        StoredSequence {
            kind: kind.to_string(),
            title: title.to_string(),
            timestamp,
            data: serde_json::to_value(data).unwrap_or(Value::Array(Vec::new())),
            kit,
            preview_tone,
        }
    }
}

/// Stored JSON form of a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSequence {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: u64,
    /// Kept loose; anything other than a list reads as no events
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_tone: Option<String>,
}

impl StoredSequence {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct StoredEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pad: Option<String>,
    #[serde(rename = "padId", skip_serializing_if = "Option::is_none")]
    pad_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<f64>,
    #[serde(alias = "durationMs", skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
}

impl StoredEvent {
    fn into_event(self) -> Option<Event> {
        let key = self.note.or(self.pad).or(self.pad_id)?;
        Some(Event {
            key,
            time_ms: offset_ms(self.time.unwrap_or(0.0)),
            duration_ms: self.duration.filter(|d| d.is_finite()).map(offset_ms),
        })
    }
}

/// Event times and durations, clamped to at most one day
fn offset_ms(value: f64) -> u64 {
    whole_ms(value).min(MAX_OFFSET_MS)
}

/// Round to whole milliseconds, treating negative or non-finite values as 0
fn whole_ms(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().map(whole_ms).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_melodic_ingestion() {
        let json = r#"{
            "type": "piano",
            "title": "Tune",
            "timestamp": 1700000000000,
            "previewTone": "FLUTE",
            "data": [
                {"note": "C4", "time": 0},
                {"note": "E4", "time": 250.4, "duration": 600}
            ]
        }"#;
        let seq = Sequence::from_json(json).unwrap();

        assert_eq!(seq.kind, SequenceKind::Melodic { tone: ToneKind::Flute });
        assert_eq!(seq.title, "Tune");
        assert_eq!(seq.timestamp, 1_700_000_000_000);
        assert_eq!(seq.events[0], Event::new("C4", 0));
        assert_eq!(seq.events[1], Event::new("E4", 250).with_duration(600));
    }

    #[test]
    fn test_percussive_by_pad_id() {
        let json = r#"{"type": "recording", "data": [{"padId": "kick", "time": 0}, {"padId": "snare", "time": 500}]}"#;
        let seq = Sequence::from_json(json).unwrap();
        assert_eq!(seq.kind, SequenceKind::Percussive { kit: None });
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_percussive_by_kit() {
        let json = r#"{"type": "octapad-recording", "kit": "TECHNO", "data": []}"#;
        let seq = Sequence::from_json(json).unwrap();
        assert_eq!(seq.kind, SequenceKind::Percussive { kit: Some("TECHNO".into()) });
        assert!(seq.is_empty());
    }

    #[test]
    fn test_malformed_data() {
        let seq = Sequence::from_json(r#"{"data": "nope"}"#).unwrap();
        assert!(seq.is_empty());
        assert!(!seq.kind.is_percussive());

        let seq = Sequence::from_json(r#"{"title": "no data"}"#).unwrap();
        assert!(seq.is_empty());
    }

    #[test]
    fn test_items_without_key_skipped() {
        let json = r#"{"data": [{"note": "C4", "time": -20}, {"time": 100}, 42, {"note": "D4"}]}"#;
        let seq = Sequence::from_json(json).unwrap();
        assert_eq!(seq.events, vec![Event::new("C4", 0), Event::new("D4", 0)]);
    }

    #[test]
    fn test_duration_ms_alias() {
        let json = r#"{"data": [{"pad": "crash", "time": 0, "durationMs": 120}]}"#;
        let seq = Sequence::from_json(json).unwrap();
        assert_eq!(seq.events[0], Event::new("crash", 0).with_duration(120));
    }

    #[test]
    fn test_huge_offsets_clamped() {
        let json = r#"{"data": [{"note": "C4", "time": 1e30, "duration": 1e300}]}"#;
        let seq = Sequence::from_json(json).unwrap();
        assert_eq!(
            seq.events[0],
            Event::new("C4", MAX_OFFSET_MS).with_duration(MAX_OFFSET_MS)
        );

        let seq = Sequence::from_json(r#"{"timestamp": 1700000000000.0, "data": []}"#).unwrap();
        assert_eq!(seq.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(Sequence::from_json("not json").is_err());
    }

    #[test]
    fn test_to_stored_percussive() {
        let seq = Sequence::percussive(Some("VINTAGE".into()), vec![Event::new("kick", 0), Event::new("clap", 250)]);
        let stored = seq.to_stored("Beat", 42);

        assert_eq!(stored.kind, PERCUSSIVE_TYPE);
        assert_eq!(stored.kit.as_deref(), Some("VINTAGE"));
        assert_eq!(stored.data[1]["pad"], "clap");
        assert_eq!(stored.data[1]["time"], 250.0);
        assert!(stored.data[1].get("duration").is_none());

        let json = stored.to_json().unwrap();
        let back = Sequence::from_json(&json).unwrap();
        assert_eq!(back.events, seq.events);
        assert_eq!(back.title, "Beat");
    }

    #[test]
    fn test_to_stored_melodic() {
        let seq = Sequence::melodic(ToneKind::Synth, vec![Event::new("A4", 10).with_duration(300)]);
        let stored = seq.to_stored("Lead", 7);
        assert_eq!(stored.kind, MELODIC_TYPE);
        assert_eq!(stored.preview_tone.as_deref(), Some("SYNTH"));
        assert_eq!(stored.data[0]["note"], "A4");

        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["previewTone"], "SYNTH");
        assert!(json.get("kit").is_none());
    }
}
