//! Exports of ranked and crisp results
//!
//! The JSON export is a list of sequences, each with `source`, `start`, `end`,
//! `overall_degree` and `notes` (the matched note plus `pitch_deg`,
//! `duration_deg`, `sequencing_deg` and `note_deg`). Crisp exports drop the
//! degrees.

use crate::columns::{self, Column};
use crate::error::Result;
use crate::pitch::PitchClass;
use crate::ranking::row::RowReader;
use crate::ranking::{RankedSequence, Row};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

pub fn to_json(sequences: &[RankedSequence]) -> Result<String> {
    Ok(serde_json::to_string_pretty(sequences)?)
}

/// Human-readable report, one block per sequence separated by blank lines
pub fn to_text(sequences: &[RankedSequence]) -> String {
    let mut out = String::new();
    for sequence in sequences {
        let _ = writeln!(
            out,
            "Source: {}, Start: {}, End: {}, Overall Degree: {}",
            sequence.source, sequence.start, sequence.end, sequence.degree
        );
        for (idx, ranked) in sequence.notes.iter().enumerate() {
            let _ = writeln!(out, "  Note {}: {}", idx + 1, ranked.note);
            let _ = writeln!(out, "    Pitch Degree: {}", ranked.pitch_degree);
            let _ = writeln!(out, "    Duration Degree: {}", ranked.duration_degree);
            let _ = writeln!(out, "    Sequencing Degree: {}", ranked.sequencing_degree);
            let _ = writeln!(out, "    Aggregated Note Degree: {}", ranked.note_degree);
        }
        out.push('\n');
    }
    out
}

/// A note of an un-graded result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrispNote {
    pub pitch: Option<PitchClass>,
    pub octave: Option<i32>,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrispEntry {
    pub note: CrispNote,
}

/// A sequence of an un-graded result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrispSequence {
    pub source: String,
    pub start: f64,
    pub end: f64,
    pub notes: Vec<CrispEntry>,
}

/// Convert rows of a crisp query without consulting the pattern
///
/// Positions are discovered by probing `pitch_0`, `pitch_1`, ... until a
/// column is missing.
pub fn crisp_from_rows(rows: &[Row]) -> Result<Vec<CrispSequence>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let reader = RowReader::new(row, index);
            let mut notes = Vec::new();
            let mut n = 0;
            while reader.has(&Column::Pitch.at(n)) {
                notes.push(CrispEntry {
                    note: CrispNote {
                        pitch: reader.pitch(n)?,
                        octave: reader.optional_integer(&Column::Octave.at(n))?,
                        duration: reader.number(&Column::Duration.at(n))?,
                        start: reader.number(&Column::Start.at(n))?,
                        end: reader.number(&Column::End.at(n))?,
                    },
                });
                n += 1;
            }
            Ok(CrispSequence {
                source: reader.identifier(columns::SOURCE)?,
                start: reader.number(columns::START)?,
                end: reader.number(columns::END)?,
                notes,
            })
        })
        .collect()
}

pub fn crisp_to_json(rows: &[Row]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&crisp_from_rows(rows)?)?)
}
