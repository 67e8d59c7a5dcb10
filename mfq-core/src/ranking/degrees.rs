//! Per-field degrees of a matched note

use crate::config::DurationBounds;
use crate::pattern::NoteSpec;
use crate::pitch::{absolute_tone_distance, class_tone_distance, PitchClass};

use super::row::NoteMatchResult;

fn clamp(degree: f64) -> f64 {
    if degree.is_nan() {
        0.0
    } else {
        degree.clamp(0.0, 1.0)
    }
}

/// Direct-mode pitch degree
///
/// Graded by tone distance within `pitch_distance + 0.5`: absolute distance
/// when the request names an octave, cyclic class distance otherwise.
pub fn pitch_degree(requested: &NoteSpec, matched: &NoteMatchResult, pitch_distance: f64) -> f64 {
    let spelling = match requested.pitch {
        None => return 1.0,
        Some(PitchClass::Rest) => {
            return if matched.pitch == Some(PitchClass::Rest) { 1.0 } else { 0.0 };
        }
        Some(PitchClass::Note(spelling)) => spelling,
    };
    let Some(found) = matched.pitch.and_then(PitchClass::spelling) else {
        return 0.0;
    };

    let distance = match (requested.octave, matched.octave) {
        (Some(requested_octave), Some(matched_octave)) => {
            absolute_tone_distance(spelling, requested_octave, found, matched_octave)
        }
        _ => class_tone_distance(spelling, found),
    };
    clamp(1.0 - distance / (pitch_distance + 0.5))
}

/// Degree of a realized interval against the expected one
///
/// An unconstrained expectation grades 1.0; a missing realized interval under
/// a constrained expectation grades 0.0.
pub fn interval_degree(expected: Option<f64>, realized: Option<f64>, pitch_distance: f64) -> f64 {
    match (expected, realized) {
        (None, _) => 1.0,
        (Some(_), None) => 0.0,
        (Some(expected), Some(realized)) => {
            clamp(1.0 - (realized - expected).abs() / (pitch_distance + 0.5))
        }
    }
}

pub fn duration_degree(
    requested: &NoteSpec,
    matched: &NoteMatchResult,
    duration_factor: f64,
    bounds: DurationBounds,
) -> f64 {
    match requested.effective_duration() {
        None => 1.0,
        Some(duration) => bounds.degree(duration, matched.duration, duration_factor),
    }
}

/// Slack between the previous matched note's end and this note's start
///
/// 1.0 for the first note and whenever no gap is allowed.
pub fn sequencing_degree(previous_end: Option<f64>, start: f64, duration_gap: f64) -> f64 {
    match previous_end {
        Some(previous_end) if duration_gap > 0.0 => {
            clamp(1.0 - (start - previous_end).max(0.0) / duration_gap)
        }
        _ => 1.0,
    }
}
