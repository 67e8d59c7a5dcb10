//! Melodic intervals and duration ratios between consecutive note specifications
//!
//! Both the compiler (to bound expected intervals) and the ranking engine
//! (to grade transposed matches) read these. A `None` entry means the step is
//! unconstrained because one side is missing the needed information.

use crate::pattern::{NoteSpec, QueryPattern};
use crate::pitch::absolute_semitone;

/// Signed interval in tones from `from` to `to`
///
/// `None` unless both notes carry a pitched class and an octave.
pub fn interval_between(from: &NoteSpec, to: &NoteSpec) -> Option<f64> {
    let a = absolute_semitone(from.pitch?.spelling()?, from.octave?);
    let b = absolute_semitone(to.pitch?.spelling()?, to.octave?);
    Some(f64::from(b - a) / 2.0)
}

/// Intervals of every step, `len(pattern) - 1` entries
pub fn intervals_of(pattern: &QueryPattern) -> Vec<Option<f64>> {
    pattern
        .notes
        .windows(2)
        .map(|pair| interval_between(&pair[0], &pair[1]))
        .collect()
}

/// Ratio of each note's (dotted) duration to its predecessor's
///
/// `None` when either duration is unspecified or zero.
pub fn duration_ratios_of(pattern: &QueryPattern) -> Vec<Option<f64>> {
    pattern
        .notes
        .windows(2)
        .map(|pair| {
            let previous = pair[0].effective_duration()?;
            let current = pair[1].effective_duration()?;
            if previous == 0.0 || current == 0.0 {
                None
            } else {
                Some(current / previous)
            }
        })
        .collect()
}

/// Sign of an interval, as tested in contour matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Repeat,
}

impl Direction {
    pub fn of(interval: f64) -> Self {
        if interval > 0.0 {
            Direction::Up
        } else if interval < 0.0 {
            Direction::Down
        } else {
            Direction::Repeat
        }
    }

    /// Comparison operator used against zero in the compiled filter
    pub fn operator(&self) -> &'static str {
        match self {
            Direction::Up => ">",
            Direction::Down => "<",
            Direction::Repeat => "=",
        }
    }
}
