//! Slider and note helpers
//!
//! The slider spans D#3 (156Hz) to F6 (1397Hz) on an exponential scale, so
//! equal slider distances are equal musical intervals.

/// Frequency at slider position 0
pub const SLIDER_MIN_HZ: f32 = 156.0;

/// Ratio between the slider's top and bottom frequencies
const SLIDER_RANGE_RATIO: f32 = 8.916_666_666_7;

/// log2(156)
const LOG2_SLIDER_MIN: f32 = 7.285_402_218_9;

/// 100 / log2(SLIDER_RANGE_RATIO), in percent per octave
const PERCENT_PER_OCTAVE: f32 = 31.680_613_94;

/// MIDI numbers of the lowest and highest named notes (D#3, F6)
const LOWEST_NOTE: u8 = 51;
const HIGHEST_NOTE: u8 = 89;

const NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const SOLFEGE: [&str; 12] = [
    "ド", "ド#", "レ", "レ#", "ミ", "ファ", "ファ#", "ソ", "ソ#", "ラ", "ラ#", "シ",
];

/// Target frequency for a slider position in `0.0..=1.0`
pub fn slider_to_frequency(position: f32) -> f32 {
    SLIDER_MIN_HZ * SLIDER_RANGE_RATIO.powf(position)
}

/// Slider position in percent for a frequency; 0 below the slider range
pub fn frequency_to_slider(hz: f32) -> f32 {
    if hz < SLIDER_MIN_HZ {
        return 0.0;
    }
    (hz.log2() - LOG2_SLIDER_MIN) * PERCENT_PER_OCTAVE
}

/// An equal-tempered note inside the slider range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    pub midi: u8,
}

impl Note {
    /// English name with octave, e.g. "D#3"
    pub fn name(&self) -> String {
        let octave = i32::from(self.midi) / 12 - 1;
        format!("{}{}", NAMES[usize::from(self.midi % 12)], octave)
    }

    /// Japanese solfege name, e.g. "レ#"
    pub fn solfege(&self) -> &'static str {
        SOLFEGE[usize::from(self.midi % 12)]
    }

    /// Equal-tempered frequency rounded to whole Hz
    pub fn rounded_hz(&self) -> u32 {
        (440.0f64 * 2f64.powf((f64::from(self.midi) - 69.0) / 12.0)).round() as u32
    }
}

/// Note whose rounded frequency is exactly `hz`, if any
pub fn note_at(hz: u32) -> Option<Note> {
    (LOWEST_NOTE..=HIGHEST_NOTE)
        .map(|midi| Note { midi })
        .find(|note| note.rounded_hz() == hz)
}

/// Name of the note at a reported frequency, e.g. "A4" for 440
pub fn note_name(hz: u32) -> Option<String> {
    note_at(hz).map(|note| note.name())
}
