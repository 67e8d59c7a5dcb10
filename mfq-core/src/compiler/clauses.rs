//! Clause builder shared by every matching mode
//!
//! Variable naming: `e<i>` events, `f<i>` facts, `n<i>` direct `NEXT` edges,
//! `p<i>` variable-length paths and `totalInterval_<i>` their summed
//! intervals, all indexed by pattern position (or step, for edges/paths).

use super::literal;
use crate::columns::{self, Column};
use crate::config::CompileOptions;
use crate::intervals::{intervals_of, Direction};
use crate::pattern::{MatchMode, NoteSpec, ParsedQuery, StepAttribute};
use crate::pitch::{absolute_semitone, nearby_pitches, PitchClass, Spelling};

pub(super) fn event(i: usize) -> String {
    format!("e{}", i)
}

pub(super) fn fact(i: usize) -> String {
    format!("f{}", i)
}

pub(super) struct ClauseBuilder<'a> {
    query: &'a ParsedQuery,
    options: &'a CompileOptions,
    mode: MatchMode,
    positions: usize,
    intervals: Vec<Option<f64>>,
    /// Interval values are bound and projected
    uses_intervals: bool,
    /// Consecutive positions are joined by variable-length paths
    gapped: bool,
}

impl<'a> ClauseBuilder<'a> {
    pub(super) fn new(query: &'a ParsedQuery, options: &'a CompileOptions) -> Self {
        let mode = query.parameters.mode();
        let positions = query.pattern.len();
        Self {
            query,
            options,
            mode,
            positions,
            intervals: intervals_of(&query.pattern),
            uses_intervals: query.uses_intervals(),
            gapped: query.parameters.duration_gap > 0.0,
        }
    }

    pub(super) fn mode(&self) -> MatchMode {
        self.mode
    }

    pub(super) fn uses_intervals(&self) -> bool {
        self.uses_intervals
    }

    fn steps(&self) -> usize {
        self.positions.saturating_sub(1)
    }

    /// Upper bound on `NEXT` hops between two matched positions
    pub(super) fn max_hops(&self) -> usize {
        let gap = self.query.parameters.duration_gap;
        let intervening = (gap / self.options.shortest_note).floor().max(1.0) as usize;
        intervening + 1
    }

    fn interval_expr(&self, step: usize) -> String {
        if self.gapped {
            format!("totalInterval_{}", step)
        } else {
            format!("n{}.interval", step)
        }
    }

    pub(super) fn structural(&self) -> String {
        let mut patterns = Vec::with_capacity(self.positions * 2);

        if self.gapped && self.steps() > 0 {
            let hops = self.max_hops();
            for k in 0..self.steps() {
                let from = if k == 0 {
                    format!("({}:Event)", event(0))
                } else {
                    format!("({})", event(k))
                };
                patterns.push(format!(
                    "p{} = {}-[:NEXT*1..{}]->({}:Event)",
                    k,
                    from,
                    hops,
                    event(k + 1)
                ));
            }
        } else {
            let mut chain = format!("({}:Event)", event(0));
            for k in 0..self.steps() {
                chain.push_str(&format!("-[n{}:NEXT]->({}:Event)", k, event(k + 1)));
            }
            patterns.push(chain);
        }

        for i in 0..self.positions {
            patterns.push(format!("({})--({}:Fact)", event(i), fact(i)));
        }

        format!("MATCH\n {}", patterns.join(",\n "))
    }

    pub(super) fn binding(&self) -> Option<String> {
        if !(self.uses_intervals && self.gapped) {
            return None;
        }
        let reductions: Vec<String> = (0..self.steps())
            .map(|k| {
                format!(
                    "reduce(totalInterval = 0.0, rel IN relationships(p{k}) | totalInterval + rel.interval) AS totalInterval_{k}",
                    k = k
                )
            })
            .collect();
        Some(format!(
            "WITH\n {},\n {},\n {}",
            self.events().join(", "),
            self.facts().join(", "),
            reductions.join(",\n ")
        ))
    }

    pub(super) fn filter(&self) -> Option<String> {
        let mut conditions = Vec::new();
        for (idx, note) in self.query.pattern.notes.iter().enumerate() {
            if self.mode == MatchMode::Direct {
                conditions.extend(self.pitch_condition(idx, note));
            } else if idx + 1 < self.positions {
                conditions.extend(self.interval_condition(idx, note));
            }
            conditions.extend(self.duration_condition(idx, note));
            if self.gapped && idx + 1 < self.positions {
                conditions.push(format!(
                    "{}.end >= {}.start - {}",
                    event(idx),
                    event(idx + 1),
                    literal::number(self.query.parameters.duration_gap)
                ));
            }
        }
        conditions.extend(self.membership_conditions());

        if conditions.is_empty() {
            None
        } else {
            Some(format!("WHERE\n {}", conditions.join(" AND\n ")))
        }
    }

    pub(super) fn collection(&self) -> Option<String> {
        let names = self.query.parameters.collections.as_ref()?;
        if names.is_empty() {
            return None;
        }
        let tests: Vec<String> = names
            .iter()
            .map(|name| format!("{}.collection CONTAINS {}", event(0), literal::string(name)))
            .collect();
        Some(format!(
            "WITH\n {}\nWHERE ({})",
            self.carried_variables().join(", "),
            tests.join(" OR ")
        ))
    }

    /// `RETURN` clause and the column names it produces, in order
    pub(super) fn projection(&self) -> (String, Vec<String>) {
        let mut lines = Vec::with_capacity(self.positions + 1);
        let mut names = Vec::new();

        for i in 0..self.positions {
            let (e, f) = (event(i), fact(i));
            let mut items = vec![
                (format!("{}.class", f), Column::Pitch.at(i)),
                (
                    format!("coalesce({f}.accid, {f}.accid_ges)", f = f),
                    Column::Accidental.at(i),
                ),
                (format!("{}.octave", f), Column::Octave.at(i)),
                (format!("{}.duration", e), Column::Duration.at(i)),
                (format!("{}.start", e), Column::Start.at(i)),
                (format!("{}.end", e), Column::End.at(i)),
                (format!("{}.id", e), Column::Id.at(i)),
            ];
            if self.uses_intervals && i + 1 < self.positions {
                items.push((self.interval_expr(i), Column::Interval.at(i)));
            }
            lines.push(
                items
                    .iter()
                    .map(|(expr, column)| format!("{} AS {}", expr, column))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            names.extend(items.into_iter().map(|(_, column)| column));
        }

        let last = event(self.positions.saturating_sub(1));
        lines.push(format!(
            "{first}.source AS {}, {first}.start AS {}, {last}.end AS {}",
            columns::SOURCE,
            columns::START,
            columns::END,
            first = event(0),
            last = last
        ));
        names.extend([columns::SOURCE, columns::START, columns::END].map(String::from));

        (format!("RETURN\n {}", lines.join(",\n ")), names)
    }

    fn events(&self) -> Vec<String> {
        (0..self.positions).map(event).collect()
    }

    fn facts(&self) -> Vec<String> {
        (0..self.positions).map(fact).collect()
    }

    fn carried_variables(&self) -> Vec<String> {
        let mut vars = self.events();
        vars.extend(self.facts());
        if self.uses_intervals {
            vars.extend((0..self.steps()).map(|k| {
                if self.gapped {
                    format!("totalInterval_{}", k)
                } else {
                    format!("n{}", k)
                }
            }));
        }
        vars
    }

    fn pitch_condition(&self, idx: usize, note: &NoteSpec) -> Option<String> {
        let f = fact(idx);
        let spelling = match note.pitch {
            None => return note.octave.map(|o| format!("{}.octave = {}", f, o)),
            Some(PitchClass::Rest) => {
                return Some(format!(
                    "{}.class = {}",
                    f,
                    literal::string(PitchClass::REST_CODE)
                ))
            }
            Some(PitchClass::Note(spelling)) => spelling,
        };

        let distance = self.query.parameters.pitch_distance;
        if distance == 0.0 || note.fixed {
            return Some(spelling_condition(&f, spelling, note.octave));
        }

        let center_octave = note.octave.unwrap_or(self.options.default_octave);
        let mut disjuncts: Vec<String> = Vec::new();
        for (neighbor, octave) in nearby_pitches(spelling, center_octave, distance) {
            // the graph stores notes as written, so every enharmonic spelling is admitted
            let written = Spelling::enharmonics(absolute_semitone(neighbor, octave));
            for (spelled, spelled_octave) in written {
                let disjunct = format!(
                    "({})",
                    spelling_condition(&f, spelled, note.octave.map(|_| spelled_octave))
                );
                // without an octave, wide neighborhoods revisit the same class
                if !disjuncts.contains(&disjunct) {
                    disjuncts.push(disjunct);
                }
            }
        }
        Some(format!("(\n  {}\n )", disjuncts.join(" OR\n  ")))
    }

    fn interval_condition(&self, step: usize, note: &NoteSpec) -> Option<String> {
        let expected = self.intervals.get(step).copied().flatten()?;
        let x = self.interval_expr(step);
        let distance = self.query.parameters.pitch_distance;

        if note.fixed {
            return Some(format!("{} = {}", x, literal::number(expected)));
        }
        match self.mode {
            MatchMode::Transposition if distance > 0.0 => Some(format!(
                "{lo} <= {x} AND {x} <= {hi}",
                lo = literal::number(expected - distance),
                hi = literal::number(expected + distance),
                x = x
            )),
            MatchMode::Transposition => Some(format!("{} = {}", x, literal::number(expected))),
            MatchMode::Contour => {
                // a membership function on this step supersedes the sign test
                if self
                    .query
                    .memberships_at(StepAttribute::Interval, step)
                    .next()
                    .is_some()
                {
                    None
                } else {
                    Some(format!("{} {} 0.0", x, Direction::of(expected).operator()))
                }
            }
            MatchMode::Direct => None,
        }
    }

    fn duration_condition(&self, idx: usize, note: &NoteSpec) -> Option<String> {
        let duration = note.effective_duration()?;
        let e = event(idx);
        let factor = self.query.parameters.duration_factor;

        if factor == 1.0 || note.fixed {
            return Some(format!("{}.duration = {}", e, literal::number(duration)));
        }
        let (min, max) = self.options.duration_bounds.bounds(duration, factor);
        Some(format!(
            "{e}.duration >= {} AND {e}.duration <= {}",
            literal::number(min),
            literal::number(max),
            e = e
        ))
    }

    fn membership_conditions(&self) -> Vec<String> {
        let mut conditions = Vec::new();
        for membership in &self.query.memberships {
            let Some(function) = self.query.functions.get(&membership.function) else {
                continue;
            };
            let x = match membership.attribute {
                StepAttribute::Interval => self.interval_expr(membership.step),
                StepAttribute::DurationRatio => format!(
                    "{}.duration / {}.duration",
                    event(membership.step + 1),
                    event(membership.step)
                ),
            };
            let support = function.support();
            if let Some(min) = support.min {
                conditions.push(format!("{} >= {}", x, literal::number(min)));
            }
            if let Some(max) = support.max {
                conditions.push(format!("{} <= {}", x, literal::number(max)));
            }
        }
        conditions
    }
}

/// Equality on letter, effective accidental and (optionally) octave
fn spelling_condition(f: &str, spelling: Spelling, octave: Option<i32>) -> String {
    let mut condition = format!(
        "{f}.class = {} AND coalesce({f}.accid, {f}.accid_ges, 'n') = {}",
        literal::string(spelling.letter.as_str()),
        literal::string(spelling.accidental.graph_code()),
        f = f
    );
    if let Some(octave) = octave {
        condition.push_str(&format!(" AND {}.octave = {}", f, octave));
    }
    condition
}
