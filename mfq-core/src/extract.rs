//! Parameter extractor: pattern-description text → `ParsedQuery`
//!
//! The description is a sequence of directives separated by whitespace:
//!
//! ```text
//! TOLERANT pitch=1.0, duration=1.5, gap=0.25
//! ALPHA 0.6
//! ALLOW_TRANSPOSITION
//! ALLOW_CONTOUR
//! COLLECTIONS "bretagne" "vendee"
//! DEFINETRAP stepUp AS (0.5, 1.0, 1.0, 1.5)
//! interval_0 IS stepUp
//! {class:'c', octave:4, dur:4}
//! {class:'e', octave:None, dur:8, dots:1} FIXED
//! ```
//!
//! `//` starts a comment running to the end of the line. Any unrecognized or
//! malformed fragment aborts extraction with `Error::Parse`; partial results
//! are never returned.

use crate::compiler::literal;
use crate::error::{Error, Result};
use crate::membership::{MembershipFunction, Shape};
use crate::pattern::{FuzzyParameters, MembershipRef, NoteSpec, ParsedQuery, StepAttribute};
use crate::pitch::PitchClass;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt::Write as _;
use tracing::debug;

const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
}

static TOLERANT_RE: Lazy<Regex> = Lazy::new(|| {
    compile(&format!(
        r"^TOLERANT[ \t]+(\w+[ \t]*=[ \t]*{n}(?:[ \t]*,[ \t]*\w+[ \t]*=[ \t]*{n})*)",
        n = NUMBER
    ))
});
static ALPHA_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^ALPHA[ \t]+({})", NUMBER)));
static TRANSPOSITION_RE: Lazy<Regex> = Lazy::new(|| compile(r"^ALLOW_TRANSPOSITION\b"));
static CONTOUR_RE: Lazy<Regex> = Lazy::new(|| compile(r"^ALLOW_CONTOUR\b"));
static COLLECTIONS_RE: Lazy<Regex> =
    Lazy::new(|| compile(r#"^COLLECTIONS((?:[ \t]+"[^"\n]*")+)"#));
static COLLECTION_NAME_RE: Lazy<Regex> = Lazy::new(|| compile(r#""([^"\n]*)""#));
static DEFINE_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"^DEFINE(\w+)[ \t]+(\w+)[ \t]+AS[ \t]*\(([^)\n]*)\)"));
static MEMBERSHIP_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"^(interval|ratio)_(\d+)[ \t]+IS[ \t]+(\w+)"));
static NOTE_RE: Lazy<Regex> = Lazy::new(|| compile(r"^\{[^{}\n]*\}"));
static NOTE_FIELDS_RE: Lazy<Regex> = Lazy::new(|| {
    compile(concat!(
        r"^\{\s*class\s*:\s*(?:'(?P<class>[^']*)'|None)\s*,",
        r"\s*octave\s*:\s*(?:(?P<octave>-?\d+)|None)\s*,",
        r"\s*dur\s*:\s*(?:(?P<dur>\d+(?:\.\d+)?)|None)",
        r"(?:\s*,\s*dots\s*:\s*(?P<dots>\d+))?\s*\}$"
    ))
});
static FIXED_RE: Lazy<Regex> = Lazy::new(|| compile(r"^[ \t]+FIXED\b"));

/// Parse a pattern description into notes, parameters and membership declarations
pub fn parse_query(text: &str) -> Result<ParsedQuery> {
    let mut parser = Parser::new(text);
    parser.run()?;
    let query = parser.finish();

    debug!(
        notes = query.pattern.len(),
        mode = ?query.parameters.mode(),
        functions = query.functions.len(),
        memberships = query.memberships.len(),
        "Parsed pattern description"
    );
    Ok(query)
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
    query: ParsedQuery,
    seen_tolerant: bool,
    seen_alpha: bool,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            query: ParsedQuery::default(),
            seen_tolerant: false,
            seen_alpha: false,
        }
    }

    fn finish(self) -> ParsedQuery {
        self.query
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Remainder of the current line, used as the error fragment
    fn fragment(&self) -> &'a str {
        let rest = self.rest();
        rest.split('\n').next().unwrap_or(rest).trim_end()
    }

    fn skip_blank(&mut self) {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("//") {
                let line_len = trimmed.find('\n').unwrap_or(trimmed.len());
                self.pos += line_len;
            } else {
                break;
            }
        }
    }

    fn run(&mut self) -> Result<()> {
        loop {
            self.skip_blank();
            if self.rest().is_empty() {
                return Ok(());
            }
            self.directive()?;
        }
    }

    fn directive(&mut self) -> Result<()> {
        let rest = self.rest();
        let fragment = self.fragment();

        if let Some(caps) = NOTE_RE.captures(rest) {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let note = parse_note(whole)?;
            self.pos += whole.len();
            self.push_note(note);
            return Ok(());
        }
        if let Some(caps) = TOLERANT_RE.captures(rest) {
            if self.seen_tolerant {
                return Err(Error::parse(fragment, "TOLERANT declared twice"));
            }
            self.seen_tolerant = true;
            self.tolerances(fragment, &caps[1])?;
            return self.consume(&caps);
        }
        if let Some(caps) = ALPHA_RE.captures(rest) {
            if self.seen_alpha {
                return Err(Error::parse(fragment, "ALPHA declared twice"));
            }
            self.seen_alpha = true;
            let alpha = number(fragment, &caps[1])?;
            if !(0.0..=1.0).contains(&alpha) {
                return Err(Error::parse(fragment, "alpha must lie in [0, 1]"));
            }
            self.query.parameters.alpha = alpha;
            return self.consume(&caps);
        }
        if let Some(caps) = TRANSPOSITION_RE.captures(rest) {
            self.query.parameters.allow_transposition = true;
            return self.consume(&caps);
        }
        if let Some(caps) = CONTOUR_RE.captures(rest) {
            self.query.parameters.contour_match = true;
            return self.consume(&caps);
        }
        if let Some(caps) = COLLECTIONS_RE.captures(rest) {
            if self.query.parameters.collections.is_some() {
                return Err(Error::parse(fragment, "COLLECTIONS declared twice"));
            }
            let names: Vec<String> = COLLECTION_NAME_RE
                .captures_iter(&caps[1])
                .map(|c| c[1].to_string())
                .collect();
            if names.iter().any(|n| n.trim().is_empty()) {
                return Err(Error::parse(fragment, "collection names must not be empty"));
            }
            self.query.parameters.collections = Some(names);
            return self.consume(&caps);
        }
        if rest.starts_with("COLLECTIONS") {
            return Err(Error::parse(fragment, "expected one or more quoted collection names"));
        }
        if let Some(caps) = DEFINE_RE.captures(rest) {
            self.define(fragment, &caps)?;
            return self.consume(&caps);
        }
        if rest.starts_with("DEFINE") {
            return Err(Error::parse(
                fragment,
                "expected DEFINE<shape> <name> AS (<points>)",
            ));
        }
        if let Some(caps) = MEMBERSHIP_RE.captures(rest) {
            let attribute = match &caps[1] {
                "interval" => StepAttribute::Interval,
                _ => StepAttribute::DurationRatio,
            };
            let step = caps[2]
                .parse::<usize>()
                .map_err(|e| Error::parse(fragment, format!("invalid step index: {}", e)))?;
            self.query.memberships.push(MembershipRef {
                attribute,
                step,
                function: caps[3].to_string(),
            });
            return self.consume(&caps);
        }
        if rest.starts_with("FIXED") {
            return Err(Error::parse(fragment, "FIXED must directly follow a note"));
        }

        Err(Error::parse(fragment, "unrecognized token"))
    }

    fn consume(&mut self, caps: &Captures<'_>) -> Result<()> {
        self.pos += caps.get(0).map_or(0, |m| m.len());
        Ok(())
    }

    fn push_note(&mut self, mut note: NoteSpec) {
        if let Some(m) = FIXED_RE.find(self.rest()) {
            note.fixed = true;
            self.pos += m.end();
        }
        self.query.pattern.notes.push(note);
    }

    fn tolerances(&mut self, fragment: &str, list: &str) -> Result<()> {
        let params: &mut FuzzyParameters = &mut self.query.parameters;
        let mut seen: Vec<&str> = Vec::with_capacity(3);
        for item in list.split(',') {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| Error::parse(fragment, "expected key=value"))?;
            let key = key.trim();
            if seen.contains(&key) {
                return Err(Error::parse(fragment, format!("tolerance `{}` given twice", key)));
            }
            seen.push(key);
            let value = number(fragment, value.trim())?;
            match key {
                "pitch" => {
                    if value < 0.0 {
                        return Err(Error::parse(fragment, "pitch tolerance must be non-negative"));
                    }
                    params.pitch_distance = value;
                }
                "duration" => {
                    if value < 1.0 {
                        return Err(Error::parse(fragment, "duration factor must be at least 1"));
                    }
                    params.duration_factor = value;
                }
                "gap" => {
                    if value < 0.0 {
                        return Err(Error::parse(fragment, "duration gap must be non-negative"));
                    }
                    params.duration_gap = value;
                }
                other => {
                    return Err(Error::parse(
                        fragment,
                        format!("unknown tolerance `{}`", other),
                    ))
                }
            }
        }
        Ok(())
    }

    fn define(&mut self, fragment: &str, caps: &Captures<'_>) -> Result<()> {
        let shape = Shape::from_keyword(&caps[1]).ok_or_else(|| {
            Error::parse(
                fragment,
                format!("unknown membership function shape `{}`", &caps[1]),
            )
        })?;
        let name = caps[2].to_string();
        if self.query.functions.contains_key(&name) {
            return Err(Error::parse(
                fragment,
                format!("membership function `{}` declared twice", name),
            ));
        }
        let points = caps[3]
            .split(',')
            .map(|p| number(fragment, p.trim()))
            .collect::<Result<Vec<f64>>>()?;
        let function = MembershipFunction::from_points(shape, &points).ok_or_else(|| {
            Error::parse(
                fragment,
                format!(
                    "{} expects {} non-decreasing points",
                    shape.keyword(),
                    shape.arity()
                ),
            )
        })?;
        self.query.functions.insert(name, function);
        Ok(())
    }
}

fn number(fragment: &str, text: &str) -> Result<f64> {
    let value = text
        .parse::<f64>()
        .map_err(|e| Error::parse(fragment, format!("invalid number `{}`: {}", text, e)))?;
    if !value.is_finite() {
        return Err(Error::parse(fragment, format!("invalid number `{}`", text)));
    }
    Ok(value)
}

fn parse_note(token: &str) -> Result<NoteSpec> {
    let caps = NOTE_FIELDS_RE.captures(token).ok_or_else(|| {
        Error::parse(
            token,
            "expected {class:'<pitch>'|None, octave:<int>|None, dur:<number>|None}",
        )
    })?;

    let pitch = match caps.name("class") {
        Some(class) => Some(PitchClass::parse(class.as_str()).ok_or_else(|| {
            Error::parse(token, format!("invalid pitch class `{}`", class.as_str()))
        })?),
        None => None,
    };
    let octave = match caps.name("octave") {
        Some(octave) => Some(
            octave
                .as_str()
                .parse::<i32>()
                .map_err(|e| Error::parse(token, format!("invalid octave: {}", e)))?,
        ),
        None => None,
    };
    let duration = match caps.name("dur") {
        Some(dur) => {
            let denominator = number(token, dur.as_str())?;
            if denominator <= 0.0 {
                return Err(Error::parse(token, "duration must be positive"));
            }
            Some(1.0 / denominator)
        }
        None => None,
    };
    let dots = match caps.name("dots") {
        Some(dots) => dots
            .as_str()
            .parse::<u8>()
            .map_err(|e| Error::parse(token, format!("invalid dot count: {}", e)))?,
        None => 0,
    };

    Ok(NoteSpec {
        pitch,
        octave,
        duration,
        dots,
        fixed: false,
    })
}

/// Render a parsed query back to canonical pattern-description text
///
/// `parse_query(&describe(q))` yields `q` again for durations whose
/// denominators are exactly representable.
pub fn describe(query: &ParsedQuery) -> String {
    let params = &query.parameters;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "TOLERANT pitch={}, duration={}, gap={}",
        literal::number(params.pitch_distance),
        literal::number(params.duration_factor),
        literal::number(params.duration_gap)
    );
    let _ = writeln!(out, "ALPHA {}", literal::number(params.alpha));
    if params.allow_transposition {
        out.push_str("ALLOW_TRANSPOSITION\n");
    }
    if params.contour_match {
        out.push_str("ALLOW_CONTOUR\n");
    }
    if let Some(collections) = &params.collections {
        let names: Vec<String> = collections.iter().map(|c| format!("\"{}\"", c)).collect();
        let _ = writeln!(out, "COLLECTIONS {}", names.join(" "));
    }
    for (name, function) in &query.functions {
        let points: Vec<String> = function.points().into_iter().map(literal::number).collect();
        let _ = writeln!(
            out,
            "DEFINE{} {} AS ({})",
            function.shape().keyword(),
            name,
            points.join(", ")
        );
    }
    for membership in &query.memberships {
        let _ = writeln!(
            out,
            "{}_{} IS {}",
            membership.attribute.keyword(),
            membership.step,
            membership.function
        );
    }
    for note in &query.pattern.notes {
        let class = note
            .pitch
            .map_or_else(|| "None".to_string(), |p| format!("'{}'", p));
        let octave = note
            .octave
            .map_or_else(|| "None".to_string(), |o| o.to_string());
        let duration = note
            .duration
            .map_or_else(|| "None".to_string(), |d| literal::number(1.0 / d));
        let dots = if note.dots > 0 {
            format!(", dots:{}", note.dots)
        } else {
            String::new()
        };
        let fixed = if note.fixed { " FIXED" } else { "" };
        let _ = writeln!(
            out,
            "{{class:{}, octave:{}, dur:{}{}}}{}",
            class, octave, duration, dots, fixed
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::MatchMode;
    use crate::pitch::Spelling;

    fn parse_err(text: &str) -> (String, String) {
        match parse_query(text) {
            Err(Error::Parse { fragment, reason }) => (fragment, reason),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_when_omitted() {
        let query = parse_query("{class:'c', octave:4, dur:4}").unwrap();
        assert_eq!(query.parameters, FuzzyParameters::default());
        assert_eq!(query.pattern.len(), 1);
        let note = &query.pattern.notes[0];
        assert_eq!(note.pitch, Some(PitchClass::Note(Spelling::parse("c").unwrap())));
        assert_eq!(note.octave, Some(4));
        assert_eq!(note.duration, Some(0.25));
        assert!(!note.fixed);
    }

    #[test]
    fn test_full_description() {
        let text = r#"
            TOLERANT pitch=1.0, duration=1.5, gap=0.25
            ALPHA 0.6
            ALLOW_TRANSPOSITION
            COLLECTIONS "bretagne" "vendee"
            DEFINETRAP stepUp AS (0.5, 1.0, 1.0, 1.5)
            DEFINEASC longer AS (1.0, 2.0)
            interval_0 IS stepUp
            ratio_1 IS longer
            {class:'c', octave:4, dur:4}
            {class:'d#', octave:None, dur:8, dots:1} FIXED
            {class:None, octave:5, dur:None}
        "#;
        let query = parse_query(text).unwrap();
        let params = &query.parameters;
        assert_eq!(params.pitch_distance, 1.0);
        assert_eq!(params.duration_factor, 1.5);
        assert_eq!(params.duration_gap, 0.25);
        assert_eq!(params.alpha, 0.6);
        assert_eq!(params.mode(), MatchMode::Transposition);
        assert_eq!(
            params.collections,
            Some(vec!["bretagne".to_string(), "vendee".to_string()])
        );
        assert_eq!(query.functions.len(), 2);
        assert_eq!(query.memberships.len(), 2);
        assert_eq!(query.memberships[1].attribute, StepAttribute::DurationRatio);
        assert_eq!(query.memberships[1].step, 1);

        let notes = &query.pattern.notes;
        assert_eq!(notes.len(), 3);
        assert!(!notes[0].fixed);
        assert!(notes[1].fixed);
        assert_eq!(notes[1].dots, 1);
        assert_eq!(notes[1].octave, None);
        assert_eq!(notes[2].pitch, None);
        assert_eq!(notes[2].duration, None);
    }

    #[test]
    fn test_partial_tolerances_and_comments() {
        let query = parse_query(
            "// only a gap\nTOLERANT gap=0.5\n{class:'r', octave:None, dur:2} // rest",
        )
        .unwrap();
        assert_eq!(query.parameters.duration_gap, 0.5);
        assert_eq!(query.parameters.pitch_distance, 0.0);
        assert_eq!(query.pattern.notes[0].pitch, Some(PitchClass::Rest));
    }

    #[test]
    fn test_contour_marker() {
        let query = parse_query("ALLOW_CONTOUR {class:'c', octave:4, dur:None}").unwrap();
        assert_eq!(query.parameters.mode(), MatchMode::Contour);
    }

    #[test]
    fn test_rejects_unknown_token() {
        let (fragment, reason) = parse_err("{class:'c', octave:4, dur:4}\nFUZZY please");
        assert_eq!(fragment, "FUZZY please");
        assert_eq!(reason, "unrecognized token");
    }

    #[test]
    fn test_rejects_malformed_note() {
        let (fragment, _) = parse_err("{class:'c', octave:four, dur:4}");
        assert_eq!(fragment, "{class:'c', octave:four, dur:4}");
        parse_err("{class:'h', octave:4, dur:4}");
        parse_err("{class:'c', octave:4, dur:0}");
    }

    #[test]
    fn test_rejects_invalid_tolerances() {
        parse_err("TOLERANT pitch=-1.0");
        parse_err("TOLERANT duration=0.5");
        parse_err("TOLERANT gap=-0.1");
        parse_err("TOLERANT speed=2");
        parse_err("ALPHA 1.5");
        parse_err("TOLERANT pitch=1\nTOLERANT gap=1");
    }

    #[test]
    fn test_rejects_repeated_tolerance_key() {
        let (fragment, reason) = parse_err("TOLERANT pitch=1, pitch=2\n{class:'c', octave:4, dur:4}");
        assert_eq!(fragment, "TOLERANT pitch=1, pitch=2");
        assert!(reason.contains("pitch"), "{}", reason);
        parse_err("TOLERANT gap=0.5, duration=2, gap = 1");
    }

    #[test]
    fn test_rejects_bad_membership_declarations() {
        let (_, reason) = parse_err("DEFINEBELL x AS (1, 2)");
        assert!(reason.contains("unknown membership function shape"));
        parse_err("DEFINETRAP x AS (1, 2)");
        parse_err("DEFINEASC x AS (2, 1)");
        parse_err("DEFINEASC x AS (1, 2)\nDEFINEDESC x AS (1, 2)");
        parse_err("DEFINETRAP x (1, 2, 3, 4)");
    }

    #[test]
    fn test_rejects_bad_collections_and_fixed() {
        parse_err("COLLECTIONS bretagne");
        parse_err("COLLECTIONS \"\"");
        parse_err("FIXED {class:'c', octave:4, dur:4}");
    }

    #[test]
    fn test_describe_round_trip() {
        let text = r#"
            TOLERANT pitch=0.5, duration=2.0, gap=0.125
            ALPHA 0.25
            ALLOW_CONTOUR
            COLLECTIONS "a" "b"
            DEFINEDESC down AS (-1.0, -0.5)
            interval_0 IS down
            {class:'eb', octave:4, dur:4} FIXED
            {class:'r', octave:None, dur:8, dots:2}
        "#;
        let query = parse_query(text).unwrap();
        let again = parse_query(&describe(&query)).unwrap();
        assert_eq!(query, again);
    }
}
