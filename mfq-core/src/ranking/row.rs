//! Typed access to raw result rows
//!
//! A row maps projected column names to JSON values. Missing columns and
//! wrongly typed values are schema mismatches; `null` is accepted only in
//! nullable columns (see [`Column::nullable`]).

use crate::columns::{self, Column};
use crate::error::{Error, Result};
use crate::pitch::PitchClass;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::debug;

/// One result row as produced by the execution boundary
pub type Row = serde_json::Map<String, Value>;

pub(crate) struct RowReader<'a> {
    row: &'a Row,
    index: usize,
}

impl<'a> RowReader<'a> {
    pub(crate) fn new(row: &'a Row, index: usize) -> Self {
        Self { row, index }
    }

    pub(crate) fn has(&self, column: &str) -> bool {
        self.row.contains_key(column)
    }

    fn value(&self, column: &str) -> Result<&'a Value> {
        self.row
            .get(column)
            .ok_or_else(|| Error::schema(self.index, column, "missing column"))
    }

    fn mismatch(&self, column: &str, expected: &str, found: &Value) -> Error {
        Error::schema(
            self.index,
            column,
            format!("expected {}, found {}", expected, found),
        )
    }

    pub(crate) fn number(&self, column: &str) -> Result<f64> {
        let value = self.value(column)?;
        value
            .as_f64()
            .ok_or_else(|| self.mismatch(column, "a number", value))
    }

    pub(crate) fn optional_number(&self, column: &str) -> Result<Option<f64>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            value => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.mismatch(column, "a number or null", value)),
        }
    }

    pub(crate) fn optional_integer(&self, column: &str) -> Result<Option<i32>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            value => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| self.mismatch(column, "an integer or null", value)),
        }
    }

    pub(crate) fn optional_text(&self, column: &str) -> Result<Option<&'a str>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text.as_str())),
            value => Err(self.mismatch(column, "a string or null", value)),
        }
    }

    /// Identifier columns accept strings or integers
    pub(crate) fn identifier(&self, column: &str) -> Result<String> {
        match self.value(column)? {
            Value::String(text) => Ok(text.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
            value => Err(self.mismatch(column, "a string or integer", value)),
        }
    }

    /// Pitch class from `pitch_<i>` and, when projected, `accid_<i>`
    ///
    /// An accidental code with no semitone spelling (microtonal marks) leaves
    /// the pitch unknown; only an unknown `class` is a mismatch.
    pub(crate) fn pitch(&self, position: usize) -> Result<Option<PitchClass>> {
        let pitch_column = Column::Pitch.at(position);
        let accid_column = Column::Accidental.at(position);
        let Some(class) = self.optional_text(&pitch_column)? else {
            return Ok(None);
        };
        let accid = if self.has(&accid_column) {
            self.optional_text(&accid_column)?
        } else {
            None
        };
        if let Some(pitch) = PitchClass::from_graph(class, accid) {
            return Ok(Some(pitch));
        }
        if PitchClass::from_graph(class, None).is_none() {
            return Err(Error::schema(
                self.index,
                &pitch_column,
                format!("unknown pitch class `{}`", class),
            ));
        }
        debug!(
            row = self.index,
            column = %accid_column,
            accid = ?accid,
            "Unrecognized accidental, pitch left unknown"
        );
        Ok(None)
    }
}

/// One matched note, bound to a pattern position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMatchResult {
    pub pitch: Option<PitchClass>,
    pub octave: Option<i32>,
    pub duration: f64,
    pub start: f64,
    pub end: f64,
    pub id: String,
}

impl NoteMatchResult {
    pub(crate) fn read(reader: &RowReader<'_>, position: usize) -> Result<Self> {
        Ok(Self {
            pitch: reader.pitch(position)?,
            octave: reader.optional_integer(&Column::Octave.at(position))?,
            duration: reader.number(&Column::Duration.at(position))?,
            start: reader.number(&Column::Start.at(position))?,
            end: reader.number(&Column::End.at(position))?,
            id: reader.identifier(&Column::Id.at(position))?,
        })
    }
}

impl fmt::Display for NoteMatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.pitch, self.octave) {
            (Some(PitchClass::Rest), _) => write!(f, "rest")?,
            (Some(pitch), Some(octave)) => write!(f, "{}{}", pitch, octave)?,
            (Some(pitch), None) => write!(f, "{}", pitch)?,
            (None, _) => write!(f, "?")?,
        }
        write!(
            f,
            " (duration {}, {} to {}, id {})",
            self.duration, self.start, self.end, self.id
        )
    }
}

/// One matched window, reconstructed from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceMatchResult {
    pub source: String,
    pub start: f64,
    pub end: f64,
    pub notes: Vec<NoteMatchResult>,
    /// Realized interval of each step; empty when intervals were not projected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intervals: Vec<Option<f64>>,
}

impl SequenceMatchResult {
    /// Rebuild a sequence of `positions` notes from row `index`
    pub fn from_row(row: &Row, index: usize, positions: usize, intervals: bool) -> Result<Self> {
        let reader = RowReader::new(row, index);
        let notes = (0..positions)
            .map(|i| NoteMatchResult::read(&reader, i))
            .collect::<Result<Vec<_>>>()?;
        let intervals = if intervals {
            (0..positions.saturating_sub(1))
                .map(|k| reader.optional_number(&Column::Interval.at(k)))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };

        Ok(Self {
            source: reader.identifier(columns::SOURCE)?,
            start: reader.number(columns::START)?,
            end: reader.number(columns::END)?,
            notes,
            intervals,
        })
    }
}
