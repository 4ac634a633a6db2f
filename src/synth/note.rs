//! Note names and equal-tempered tuning

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Frequency used when a note cannot be resolved
pub const DEFAULT_FREQUENCY: f64 = 440.0;

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// A pitch class plus octave, e.g. `C#4`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    pitch_class: u8,
    octave: i32,
}

impl Note {
    /// Create a note from a pitch class (0 = C) and an octave
    pub fn new(pitch_class: u8, octave: i32) -> Self {
        Self {
            pitch_class: pitch_class % 12,
            octave,
        }
    }

    /// Pitch class, 0 = C through 11 = B
    pub fn pitch_class(&self) -> u8 {
        self.pitch_class
    }

    pub fn octave(&self) -> i32 {
        self.octave
    }

    /// Absolute semitone index (C0 = 0)
    pub fn semitone(&self) -> i32 {
        self.octave * 12 + self.pitch_class as i32
    }

    /// MIDI note number (C4 = 60)
    pub fn midi_number(&self) -> i32 {
        self.semitone() + 12
    }

    /// Transpose by a number of semitones
    pub fn transposed(&self, semitones: i32) -> Self {
        let absolute = self.semitone() + semitones;
        Self {
            pitch_class: absolute.rem_euclid(12) as u8,
            octave: absolute.div_euclid(12),
        }
    }
}

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || Error::InvalidNote(s.to_string());

        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(invalid)?;
        let base: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let (accidental, octave_str) = match rest.chars().next() {
            Some('#') => (1, &rest[1..]),
            Some('b') => (-1, &rest[1..]),
            _ => (0, rest),
        };

        let octave: i32 = octave_str.parse().map_err(|_| invalid())?;
        Ok(Note::new(0, 0).transposed(octave * 12 + base + accidental))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SHARP_NAMES[self.pitch_class as usize], self.octave)
    }
}

/// An equal-tempered tuning anchored at a reference note
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    reference: Note,
    reference_hz: f64,
}

impl Tuning {
    /// A4 = 440 Hz, used for feed playback
    pub const CONCERT: Tuning = Tuning {
        reference: Note { pitch_class: 9, octave: 4 },
        reference_hz: 440.0,
    };

    /// C2 = 65.41 Hz, the lowest key of the keyboard
    pub const KEYBOARD: Tuning = Tuning {
        reference: Note { pitch_class: 0, octave: 2 },
        reference_hz: 65.41,
    };

    pub fn new(reference: Note, reference_hz: f64) -> Self {
        Self {
            reference,
            reference_hz,
        }
    }

    /// Frequency of a note: `reference_hz * 2^(offset / 12)`
    pub fn frequency(&self, note: Note) -> f64 {
        let offset = (note.semitone() - self.reference.semitone()) as f64;
        self.reference_hz * 2.0_f64.powf(offset / 12.0)
    }

    /// Resolve a note name, falling back to 440 Hz when it does not parse
    pub fn frequency_of(&self, name: &str) -> f64 {
        name.parse::<Note>()
            .map(|note| self.frequency(note))
            .unwrap_or(DEFAULT_FREQUENCY)
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning::CONCERT
    }
}

/// The keyboard's key range, C2 through C7
pub fn keyboard_notes() -> Vec<Note> {
    let mut notes: Vec<Note> = (2..=6)
        .flat_map(|octave| (0..12).map(move |pc| Note::new(pc, octave)))
        .collect();
    notes.push(Note::new(0, 7));
    notes
}
