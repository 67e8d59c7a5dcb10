//! Parsed representation of a fuzzy melodic query
//!
//! A `ParsedQuery` is produced once per search by the extractor and is
//! shared read-only by the compiler and the ranking engine. Nothing is ever
//! re-derived from generated query text.

use crate::membership::MembershipFunction;
use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One position of the melodic pattern
///
/// Every field is optional; `None` means "unconstrained".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSpec {
    pub pitch: Option<PitchClass>,
    pub octave: Option<i32>,
    /// Reciprocal of the note-length denominator (a quarter note, written `4`, is `0.25`)
    pub duration: Option<f64>,
    /// Number of augmentation dots
    #[serde(default)]
    pub dots: u8,
    /// Exempt this position from every tolerance
    #[serde(default)]
    pub fixed: bool,
}

impl NoteSpec {
    /// Multiplier contributed by augmentation dots (`2 - 0.5^n`, ×1.5 for one dot)
    pub fn dot_multiplier(&self) -> f64 {
        2.0 - 0.5f64.powi(i32::from(self.dots))
    }

    /// Duration including the dotted multiplier
    pub fn effective_duration(&self) -> Option<f64> {
        self.duration.map(|d| d * self.dot_multiplier())
    }
}

/// Ordered note specifications; order is melodic order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPattern {
    pub notes: Vec<NoteSpec>,
}

impl QueryPattern {
    pub fn new(notes: Vec<NoteSpec>) -> Self {
        Self { notes }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Number of steps (consecutive note pairs)
    pub fn steps(&self) -> usize {
        self.notes.len().saturating_sub(1)
    }
}

/// Tolerances, mode flags and filters of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyParameters {
    /// Pitch tolerance in tones
    pub pitch_distance: f64,
    /// Multiplicative duration tolerance (≥ 1)
    pub duration_factor: f64,
    /// Permitted timing slack between matched positions
    pub duration_gap: f64,
    /// Alpha-cut applied to sequence degrees
    pub alpha: f64,
    pub allow_transposition: bool,
    pub contour_match: bool,
    pub collections: Option<Vec<String>>,
}

impl Default for FuzzyParameters {
    fn default() -> Self {
        Self {
            pitch_distance: 0.0,
            duration_factor: 1.0,
            duration_gap: 0.0,
            alpha: 0.0,
            allow_transposition: false,
            contour_match: false,
            collections: None,
        }
    }
}

impl FuzzyParameters {
    /// Matching mode; transposition takes precedence over contour
    pub fn mode(&self) -> MatchMode {
        if self.allow_transposition {
            MatchMode::Transposition
        } else if self.contour_match {
            MatchMode::Contour
        } else {
            MatchMode::Direct
        }
    }
}

/// Compilation / ranking mode, fixed for a whole query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Absolute pitches, optionally within a pitch neighborhood
    Direct,
    /// Intervals within a tolerance of the expected intervals
    Transposition,
    /// Interval direction only
    Contour,
}

impl MatchMode {
    pub fn uses_intervals(&self) -> bool {
        !matches!(self, MatchMode::Direct)
    }
}

/// Attribute of a step that a membership function can govern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAttribute {
    /// Interval in tones between notes `k` and `k + 1`
    Interval,
    /// Duration of note `k + 1` divided by the duration of note `k`
    DurationRatio,
}

impl StepAttribute {
    /// Keyword prefix used in the pattern description (`interval_0`, `ratio_0`)
    pub fn keyword(&self) -> &'static str {
        match self {
            StepAttribute::Interval => "interval",
            StepAttribute::DurationRatio => "ratio",
        }
    }
}

/// `<attribute>_<step> IS <function>` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipRef {
    pub attribute: StepAttribute,
    pub step: usize,
    pub function: String,
}

/// Everything extracted from one pattern description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub pattern: QueryPattern,
    pub parameters: FuzzyParameters,
    /// Declared membership functions keyed by name
    pub functions: BTreeMap<String, MembershipFunction>,
    /// Attribute bindings in declaration order
    pub memberships: Vec<MembershipRef>,
}

impl ParsedQuery {
    /// Membership references governing `attribute` at `step`
    pub fn memberships_at(
        &self,
        attribute: StepAttribute,
        step: usize,
    ) -> impl Iterator<Item = &MembershipRef> {
        self.memberships
            .iter()
            .filter(move |m| m.attribute == attribute && m.step == step)
    }

    /// Whether any membership reference constrains an interval
    pub fn has_interval_memberships(&self) -> bool {
        self.memberships
            .iter()
            .any(|m| m.attribute == StepAttribute::Interval)
    }

    /// Whether realized intervals are bound and projected for this query
    ///
    /// True for multi-note patterns in Transposition/Contour mode, or when an
    /// interval membership reference exists.
    pub fn uses_intervals(&self) -> bool {
        self.pattern.len() > 1
            && (self.parameters.mode().uses_intervals() || self.has_interval_memberships())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_multiplier() {
        let mut note = NoteSpec {
            pitch: None,
            octave: None,
            duration: Some(0.25),
            dots: 0,
            fixed: false,
        };
        assert_eq!(note.effective_duration(), Some(0.25));
        note.dots = 1;
        assert_eq!(note.effective_duration(), Some(0.375));
        note.dots = 2;
        assert_eq!(note.effective_duration(), Some(0.4375));
    }

    #[test]
    fn test_mode_precedence() {
        let mut params = FuzzyParameters::default();
        assert_eq!(params.mode(), MatchMode::Direct);
        params.contour_match = true;
        assert_eq!(params.mode(), MatchMode::Contour);
        params.allow_transposition = true;
        assert_eq!(params.mode(), MatchMode::Transposition);
    }

    #[test]
    fn test_steps() {
        assert_eq!(QueryPattern::default().steps(), 0);
        let note = NoteSpec {
            pitch: None,
            octave: None,
            duration: None,
            dots: 0,
            fixed: false,
        };
        assert_eq!(QueryPattern::new(vec![note.clone(), note.clone(), note]).steps(), 2);
    }
}
