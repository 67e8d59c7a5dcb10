//! Ranking engine: raw rows → graded, filtered, ordered sequences
//!
//! Each row is rebuilt into a [`SequenceMatchResult`] using the positional
//! column contract, then every note receives pitch, duration and sequencing
//! degrees. Only dimensions with a non-trivial tolerance take part in the
//! note degree (minimum of the active degrees); a zero tolerance was already
//! enforced exactly by the compiled filter. Note degrees aggregate into a
//! sequence degree with [`aggregate::yager_almost_all`], sequences under the
//! alpha-cut are dropped, and the rest are sorted by degree, best first,
//! keeping row order among ties.

pub mod aggregate;
pub mod degrees;
pub mod row;

use crate::compiler::validate;
use crate::config::RankOptions;
use crate::error::Result;
use crate::intervals::intervals_of;
use crate::pattern::{MatchMode, ParsedQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use row::{NoteMatchResult, Row, SequenceMatchResult};

/// A matched note with its degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNote {
    pub note: NoteMatchResult,
    #[serde(rename = "pitch_deg")]
    pub pitch_degree: f64,
    #[serde(rename = "duration_deg")]
    pub duration_degree: f64,
    #[serde(rename = "sequencing_deg")]
    pub sequencing_degree: f64,
    #[serde(rename = "note_deg")]
    pub note_degree: f64,
}

/// A matched window with its overall degree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSequence {
    pub source: String,
    pub start: f64,
    pub end: f64,
    #[serde(rename = "overall_degree")]
    pub degree: f64,
    pub notes: Vec<RankedNote>,
}

/// Grade, filter and order raw result rows
///
/// Any row that does not follow the column contract aborts ranking with
/// `Error::SchemaMismatch`.
pub fn rank(rows: &[Row], query: &ParsedQuery, options: &RankOptions) -> Result<Vec<RankedSequence>> {
    validate(query)?;

    let positions = query.pattern.len();
    let intervals = query.uses_intervals();
    let alpha = query.parameters.alpha;

    let mut ranked = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let sequence = SequenceMatchResult::from_row(row, index, positions, intervals)?;
        let scored = score(sequence, query, options);
        debug!(
            row = index,
            source = %scored.source,
            degree = scored.degree,
            retained = scored.degree >= alpha,
            "Scored sequence"
        );
        if scored.degree >= alpha {
            ranked.push(scored);
        }
    }

    // stable: ties keep row order
    ranked.sort_by(|a, b| b.degree.total_cmp(&a.degree));

    info!(
        mode = ?query.parameters.mode(),
        rows = rows.len(),
        retained = ranked.len(),
        alpha,
        "Ranked result rows"
    );
    Ok(ranked)
}

/// Grade one reconstructed sequence against the query
pub fn score(sequence: SequenceMatchResult, query: &ParsedQuery, options: &RankOptions) -> RankedSequence {
    let params = &query.parameters;
    let mode = params.mode();
    let expected_intervals = intervals_of(&query.pattern);

    let pitch_graded = params.pitch_distance > 0.0;
    let duration_graded = params.duration_factor != 1.0;
    let sequencing_graded = params.duration_gap > 0.0;

    let mut previous_end = None;
    let mut notes = Vec::with_capacity(sequence.notes.len());

    for (idx, (requested, matched)) in query
        .pattern
        .notes
        .iter()
        .zip(sequence.notes.into_iter())
        .enumerate()
    {
        let pitch_degree = match mode {
            MatchMode::Direct => {
                degrees::pitch_degree(requested, &matched, params.pitch_distance)
            }
            // absolute pitch is never constrained for the first note
            MatchMode::Transposition | MatchMode::Contour if idx == 0 => 1.0,
            MatchMode::Transposition | MatchMode::Contour => degrees::interval_degree(
                expected_intervals.get(idx - 1).copied().flatten(),
                sequence.intervals.get(idx - 1).copied().flatten(),
                params.pitch_distance,
            ),
        };
        let duration_degree = degrees::duration_degree(
            requested,
            &matched,
            params.duration_factor,
            options.duration_bounds,
        );
        let sequencing_degree =
            degrees::sequencing_degree(previous_end, matched.start, params.duration_gap);
        previous_end = Some(matched.end);

        let mut active = Vec::with_capacity(3);
        if pitch_graded {
            active.push(pitch_degree);
        }
        if duration_graded {
            active.push(duration_degree);
        }
        if sequencing_graded {
            active.push(sequencing_degree);
        }
        let note_degree = aggregate::minimum(&active);

        notes.push(RankedNote {
            note: matched,
            pitch_degree,
            duration_degree,
            sequencing_degree,
            note_degree,
        });
    }

    let note_degrees: Vec<f64> = notes.iter().map(|n| n.note_degree).collect();
    RankedSequence {
        source: sequence.source,
        start: sequence.start,
        end: sequence.end,
        degree: aggregate::yager_almost_all(&note_degrees),
        notes,
    }
}
