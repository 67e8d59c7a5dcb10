//! Column names shared by the compiled projection and the ranking engine
//!
//! Per-position columns are suffixed with the 0-based position (`pitch_0`,
//! `octave_0`, ...). `interval_i` describes the step from position `i` to
//! `i + 1` and is only projected when intervals are in use.

pub const SOURCE: &str = "source";
pub const START: &str = "start";
pub const END: &str = "end";

/// Per-position column families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Pitch,
    Accidental,
    Octave,
    Duration,
    Start,
    End,
    Id,
    Interval,
}

impl Column {
    pub fn prefix(self) -> &'static str {
        match self {
            Column::Pitch => "pitch",
            Column::Accidental => "accid",
            Column::Octave => "octave",
            Column::Duration => "duration",
            Column::Start => "start",
            Column::End => "end",
            Column::Id => "id",
            Column::Interval => "interval",
        }
    }

    /// Column name at `position`
    pub fn at(self, position: usize) -> String {
        format!("{}_{}", self.prefix(), position)
    }

    /// Whether a null value is an acceptable "unknown" in this column
    pub fn nullable(self) -> bool {
        matches!(
            self,
            Column::Pitch | Column::Accidental | Column::Octave | Column::Interval
        )
    }
}
