//! Pitch classes, spellings and the pitch neighborhood calculator
//!
//! Pitches are spelled as a letter plus an accidental, the way they are
//! stored on `Fact` nodes (`class` holds the letter, `accid` / `accid_ges`
//! hold the note-level and clef-level accidental codes `s`, `f`, `n`).
//!
//! Absolute positions count semitones from C0, so the octave boundary sits
//! at C: `b3` is one semitone below `c4`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of semitone classes in an octave
pub const SEMITONES_PER_OCTAVE: i32 = 12;

/// Diatonic note letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Letter {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl Letter {
    /// Semitone offset of the natural letter above C
    pub fn semitone(self) -> i32 {
        match self {
            Letter::C => 0,
            Letter::D => 2,
            Letter::E => 4,
            Letter::F => 5,
            Letter::G => 7,
            Letter::A => 9,
            Letter::B => 11,
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'c' => Some(Letter::C),
            'd' => Some(Letter::D),
            'e' => Some(Letter::E),
            'f' => Some(Letter::F),
            'g' => Some(Letter::G),
            'a' => Some(Letter::A),
            'b' => Some(Letter::B),
            _ => None,
        }
    }

    /// Lowercase name as stored in the graph's `class` property
    pub fn as_str(self) -> &'static str {
        match self {
            Letter::C => "c",
            Letter::D => "d",
            Letter::E => "e",
            Letter::F => "f",
            Letter::G => "g",
            Letter::A => "a",
            Letter::B => "b",
        }
    }
}

/// Accidental attached to a letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accidental {
    #[default]
    Natural,
    Sharp,
    Flat,
    DoubleSharp,
    DoubleFlat,
}

impl Accidental {
    pub const ALL: [Accidental; 5] = [
        Accidental::Natural,
        Accidental::Sharp,
        Accidental::Flat,
        Accidental::DoubleSharp,
        Accidental::DoubleFlat,
    ];

    pub fn offset(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp => 1,
            Accidental::Flat => -1,
            Accidental::DoubleSharp => 2,
            Accidental::DoubleFlat => -2,
        }
    }

    /// Accidental code used by `accid` / `accid_ges` in the graph
    pub fn graph_code(self) -> &'static str {
        match self {
            Accidental::Natural => "n",
            Accidental::Sharp => "s",
            Accidental::Flat => "f",
            Accidental::DoubleSharp => "x",
            Accidental::DoubleFlat => "ff",
        }
    }

    /// Parse a graph accidental code; a missing code means natural
    ///
    /// Courtesy forms (`ns`, `nf`) and the `ss` spelling of a double sharp
    /// are accepted. Microtonal codes return `None`.
    pub fn from_graph_code(code: Option<&str>) -> Option<Self> {
        match code.map(|c| c.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("n") => Some(Accidental::Natural),
            Some("s") | Some("#") | Some("ns") => Some(Accidental::Sharp),
            Some("f") | Some("b") | Some("nf") => Some(Accidental::Flat),
            Some("x") | Some("ss") | Some("##") | Some("sx") => Some(Accidental::DoubleSharp),
            Some("ff") | Some("bb") => Some(Accidental::DoubleFlat),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Accidental::Natural => "",
            Accidental::Sharp => "#",
            Accidental::Flat => "b",
            Accidental::DoubleSharp => "##",
            Accidental::DoubleFlat => "bb",
        }
    }
}

/// A spelled pitch class (letter + accidental)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spelling {
    pub letter: Letter,
    pub accidental: Accidental,
}

/// The 12 semitone classes in their sharp spelling, starting at C
pub const SHARP_CYCLE: [Spelling; 12] = [
    Spelling::natural(Letter::C),
    Spelling::sharp(Letter::C),
    Spelling::natural(Letter::D),
    Spelling::sharp(Letter::D),
    Spelling::natural(Letter::E),
    Spelling::natural(Letter::F),
    Spelling::sharp(Letter::F),
    Spelling::natural(Letter::G),
    Spelling::sharp(Letter::G),
    Spelling::natural(Letter::A),
    Spelling::sharp(Letter::A),
    Spelling::natural(Letter::B),
];

impl Spelling {
    pub const fn new(letter: Letter, accidental: Accidental) -> Self {
        Self { letter, accidental }
    }

    pub const fn natural(letter: Letter) -> Self {
        Self::new(letter, Accidental::Natural)
    }

    pub const fn sharp(letter: Letter) -> Self {
        Self::new(letter, Accidental::Sharp)
    }

    /// Semitone offset above C before wrapping (`cb` is -1, `b#` is 12)
    pub fn raw_semitone(self) -> i32 {
        self.letter.semitone() + self.accidental.offset()
    }

    /// Semitone class index in `0..12`
    pub fn semitone(self) -> i32 {
        self.raw_semitone().rem_euclid(SEMITONES_PER_OCTAVE)
    }

    /// Canonical sharp spelling of the same semitone class
    pub fn to_sharp(self) -> Self {
        SHARP_CYCLE[self.semitone() as usize]
    }

    /// Parse a user spelling such as `c`, `C#`, `cs`, `db`, `ef`, `f##`, `bbb`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let mut chars = text.chars();
        let letter = Letter::from_char(chars.next()?)?;
        let accidental = match chars.as_str().to_ascii_lowercase().as_str() {
            "" => Accidental::Natural,
            "#" | "s" => Accidental::Sharp,
            "b" | "f" => Accidental::Flat,
            "##" | "ss" | "x" => Accidental::DoubleSharp,
            "bb" | "ff" => Accidental::DoubleFlat,
            _ => return None,
        };
        Some(Self::new(letter, accidental))
    }

    /// Every spelling of the absolute pitch `semitone` (counted from C0),
    /// each with the octave it is written in
    ///
    /// `b#3` and `c4` sound the same, so both are returned for C4 with their
    /// own octave numbers.
    pub fn enharmonics(semitone: i32) -> Vec<(Spelling, i32)> {
        const LETTERS: [Letter; 7] = [
            Letter::C,
            Letter::D,
            Letter::E,
            Letter::F,
            Letter::G,
            Letter::A,
            Letter::B,
        ];
        let mut spellings = Vec::with_capacity(3);
        for accidental in Accidental::ALL {
            for letter in LETTERS {
                let spelling = Spelling::new(letter, accidental);
                let written = semitone - spelling.raw_semitone();
                if written.rem_euclid(SEMITONES_PER_OCTAVE) == 0 {
                    spellings.push((spelling, written.div_euclid(SEMITONES_PER_OCTAVE)));
                }
            }
        }
        spellings
    }
}

impl fmt::Display for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter.as_str(), self.accidental.suffix())
    }
}

/// Pitch class of a note specification or matched note: a spelled pitch or a rest
///
/// Serialized as its display string (`c#`, `eb`, `r`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PitchClass {
    Note(Spelling),
    Rest,
}

impl PitchClass {
    /// Graph `class` value used for rests
    pub const REST_CODE: &'static str = "r";

    pub fn parse(text: &str) -> Option<Self> {
        if text.trim().eq_ignore_ascii_case(Self::REST_CODE) {
            return Some(PitchClass::Rest);
        }
        Spelling::parse(text).map(PitchClass::Note)
    }

    /// Rebuild a pitch class from the graph's `class` letter and effective accidental
    pub fn from_graph(class: &str, accid: Option<&str>) -> Option<Self> {
        if class.trim().eq_ignore_ascii_case(Self::REST_CODE) {
            return Some(PitchClass::Rest);
        }
        let mut chars = class.trim().chars();
        let letter = Letter::from_char(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        let accidental = Accidental::from_graph_code(accid)?;
        Some(PitchClass::Note(Spelling::new(letter, accidental)))
    }

    pub fn spelling(self) -> Option<Spelling> {
        match self {
            PitchClass::Note(spelling) => Some(spelling),
            PitchClass::Rest => None,
        }
    }

    pub fn is_rest(self) -> bool {
        matches!(self, PitchClass::Rest)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchClass::Note(spelling) => spelling.fmt(f),
            PitchClass::Rest => f.write_str(Self::REST_CODE),
        }
    }
}

impl From<PitchClass> for String {
    fn from(class: PitchClass) -> Self {
        class.to_string()
    }
}

impl TryFrom<String> for PitchClass {
    type Error = String;

    fn try_from(text: String) -> std::result::Result<Self, Self::Error> {
        PitchClass::parse(&text).ok_or_else(|| format!("invalid pitch class: {}", text))
    }
}

/// Semitones above C0
pub fn absolute_semitone(spelling: Spelling, octave: i32) -> i32 {
    octave * SEMITONES_PER_OCTAVE + spelling.raw_semitone()
}

/// Distance in tones between two absolute pitches
pub fn absolute_tone_distance(a: Spelling, a_octave: i32, b: Spelling, b_octave: i32) -> f64 {
    f64::from((absolute_semitone(b, b_octave) - absolute_semitone(a, a_octave)).abs()) / 2.0
}

/// Shortest distance in tones between two semitone classes, ignoring octaves
pub fn class_tone_distance(a: Spelling, b: Spelling) -> f64 {
    let d = (b.semitone() - a.semitone()).rem_euclid(SEMITONES_PER_OCTAVE);
    f64::from(d.min(SEMITONES_PER_OCTAVE - d)) / 2.0
}

/// Enumerate the pitches within `distance_in_tones` of a center pitch
///
/// The center is canonicalized to its sharp spelling. Every semitone offset
/// in `-floor(2d)..=floor(2d)` is visited, wrapping the class around the
/// 12-entry cycle and carrying the wrap into the octave. The result is
/// symmetric around the center and ascending by absolute position;
/// a distance of 0 yields the center alone.
pub fn nearby_pitches(center: Spelling, octave: i32, distance_in_tones: f64) -> Vec<(Spelling, i32)> {
    let raw = center.raw_semitone();
    let index = raw.rem_euclid(SEMITONES_PER_OCTAVE);
    let octave = octave + raw.div_euclid(SEMITONES_PER_OCTAVE);
    let max_semitone_dist = (2.0 * distance_in_tones.max(0.0)).floor() as i32;

    (index - max_semitone_dist..=index + max_semitone_dist)
        .map(|semitone| {
            let class = SHARP_CYCLE[semitone.rem_euclid(SEMITONES_PER_OCTAVE) as usize];
            (class, octave + semitone.div_euclid(SEMITONES_PER_OCTAVE))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp(text: &str) -> Spelling {
        Spelling::parse(text).unwrap()
    }

    #[test]
    fn test_parse_spellings() {
        assert_eq!(sp("c"), Spelling::natural(Letter::C));
        assert_eq!(sp("C#"), Spelling::sharp(Letter::C));
        assert_eq!(sp("cs"), Spelling::sharp(Letter::C));
        assert_eq!(sp("db"), Spelling::new(Letter::D, Accidental::Flat));
        assert_eq!(sp("ef"), Spelling::new(Letter::E, Accidental::Flat));
        assert_eq!(sp("b"), Spelling::natural(Letter::B));
        assert_eq!(sp("bb"), Spelling::new(Letter::B, Accidental::Flat));
        assert_eq!(sp("f##"), Spelling::new(Letter::F, Accidental::DoubleSharp));
        assert_eq!(sp("bbb"), Spelling::new(Letter::B, Accidental::DoubleFlat));
        assert!(Spelling::parse("h").is_none());
        assert!(Spelling::parse("c###").is_none());
        assert!(Spelling::parse("").is_none());
    }

    #[test]
    fn test_rest_parsing() {
        assert_eq!(PitchClass::parse("r"), Some(PitchClass::Rest));
        assert_eq!(PitchClass::parse("R"), Some(PitchClass::Rest));
        assert_eq!(PitchClass::from_graph("r", None), Some(PitchClass::Rest));
    }

    #[test]
    fn test_sharp_canonicalization() {
        assert_eq!(sp("db").to_sharp(), sp("c#"));
        assert_eq!(sp("gb").to_sharp(), sp("f#"));
        assert_eq!(sp("cb").to_sharp(), sp("b"));
        assert_eq!(sp("e#").to_sharp(), sp("f"));
    }

    #[test]
    fn test_from_graph_uses_accidental_code() {
        assert_eq!(
            PitchClass::from_graph("c", Some("s")),
            Some(PitchClass::Note(sp("c#")))
        );
        assert_eq!(
            PitchClass::from_graph("e", Some("f")),
            Some(PitchClass::Note(sp("eb")))
        );
        assert_eq!(PitchClass::from_graph("g", None), Some(PitchClass::Note(sp("g"))));
        assert_eq!(PitchClass::from_graph("g", Some("q")), None);
    }

    #[test]
    fn test_from_graph_double_accidentals() {
        for code in ["x", "ss"] {
            let pitch = PitchClass::from_graph("f", Some(code)).unwrap();
            assert_eq!(pitch.spelling().unwrap().to_sharp(), sp("g"));
        }
        let pitch = PitchClass::from_graph("b", Some("ff")).unwrap();
        assert_eq!(pitch.to_string(), "bbb");
        assert_eq!(PitchClass::parse(&pitch.to_string()), Some(pitch));
        assert_eq!(PitchClass::from_graph("d", Some("su")), None);
    }

    #[test]
    fn test_enharmonics() {
        let c4 = absolute_semitone(sp("c"), 4);
        assert_eq!(
            Spelling::enharmonics(c4),
            vec![(sp("c"), 4), (sp("b#"), 3), (sp("dbb"), 4)]
        );
        let eb4 = absolute_semitone(sp("eb"), 4);
        assert_eq!(
            Spelling::enharmonics(eb4),
            vec![(sp("d#"), 4), (sp("eb"), 4), (sp("fbb"), 4)]
        );
        let b3 = absolute_semitone(sp("b"), 3);
        assert!(Spelling::enharmonics(b3).contains(&(sp("cb"), 4)));
        for semitone in 0..SEMITONES_PER_OCTAVE {
            for (spelling, octave) in Spelling::enharmonics(48 + semitone) {
                assert_eq!(absolute_semitone(spelling, octave), 48 + semitone);
            }
        }
    }

    #[test]
    fn test_octave_boundary_at_c() {
        assert_eq!(absolute_semitone(sp("b"), 3) + 1, absolute_semitone(sp("c"), 4));
        assert_eq!(absolute_semitone(sp("cb"), 4), absolute_semitone(sp("b"), 3));
    }

    #[test]
    fn test_tone_distances() {
        assert_eq!(absolute_tone_distance(sp("c"), 4, sp("d"), 4), 1.0);
        assert_eq!(absolute_tone_distance(sp("c"), 4, sp("c"), 5), 6.0);
        assert_eq!(class_tone_distance(sp("c"), sp("b")), 0.5);
        assert_eq!(class_tone_distance(sp("c"), sp("f#")), 3.0);
    }

    #[test]
    fn test_nearby_zero_distance_is_center() {
        for class in SHARP_CYCLE {
            for octave in 0..9 {
                assert_eq!(nearby_pitches(class, octave, 0.0), vec![(class, octave)]);
            }
        }
    }

    #[test]
    fn test_nearby_count_and_symmetry() {
        for half_steps in 0..8 {
            let d = f64::from(half_steps) / 2.0;
            for class in SHARP_CYCLE {
                let result = nearby_pitches(class, 4, d);
                assert_eq!(result.len(), (4.0 * d) as usize + 1, "d = {}", d);

                let center = absolute_semitone(class, 4);
                let offsets: Vec<i32> = result
                    .iter()
                    .map(|(s, o)| absolute_semitone(*s, *o) - center)
                    .collect();
                let mut mirrored: Vec<i32> = offsets.iter().map(|o| -o).collect();
                mirrored.reverse();
                assert_eq!(offsets, mirrored);
                assert!(offsets.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_nearby_one_tone_wraps_octave() {
        let result = nearby_pitches(sp("c"), 4, 1.0);
        assert_eq!(
            result,
            vec![
                (sp("a#"), 3),
                (sp("b"), 3),
                (sp("c"), 4),
                (sp("c#"), 4),
                (sp("d"), 4),
            ]
        );
    }

    #[test]
    fn test_nearby_flat_center_uses_sharp_spelling() {
        let result = nearby_pitches(sp("eb"), 5, 0.5);
        assert_eq!(result, vec![(sp("d"), 5), (sp("d#"), 5), (sp("e"), 5)]);
    }
}
