//! Membership functions for graded sets over numeric attributes
//!
//! Three shapes can be declared in a pattern description:
//! - `DEFINEASC name AS (a, b)`: 0 up to `a`, rising linearly to 1 at `b`, 1 after
//! - `DEFINEDESC name AS (a, b)`: 1 up to `a`, falling linearly to 0 at `b`, 0 after
//! - `DEFINETRAP name AS (a, b, c, d)`: 0 outside `[a, d]`, 1 on `[b, c]`,
//!   linear on the two flanks
//!
//! The compiler only uses the **support** (the interval outside of which the
//! grade is zero) as a hard pre-filter. `grade` is exposed for callers that
//! want the full graded value.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape keyword following `DEFINE` in the pattern description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Ascending,
    Descending,
    Trapezoid,
}

impl Shape {
    /// Parse the shape suffix of a `DEFINE<shape>` keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "ASC" => Some(Shape::Ascending),
            "DESC" => Some(Shape::Descending),
            "TRAP" => Some(Shape::Trapezoid),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Shape::Ascending => "ASC",
            Shape::Descending => "DESC",
            Shape::Trapezoid => "TRAP",
        }
    }

    /// Number of control points the shape takes
    pub fn arity(&self) -> usize {
        match self {
            Shape::Ascending | Shape::Descending => 2,
            Shape::Trapezoid => 4,
        }
    }
}

/// A graded set over an interval or a duration ratio
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MembershipFunction {
    Ascending { a: f64, b: f64 },
    Descending { a: f64, b: f64 },
    Trapezoid { a: f64, b: f64, c: f64, d: f64 },
}

impl MembershipFunction {
    /// Build a function from a shape and its control points
    ///
    /// Returns `None` when the number of points does not match the shape or
    /// the points are not non-decreasing.
    pub fn from_points(shape: Shape, points: &[f64]) -> Option<Self> {
        if points.len() != shape.arity() || points.iter().any(|p| !p.is_finite()) {
            return None;
        }
        if points.windows(2).any(|w| w[0] > w[1]) {
            return None;
        }
        Some(match shape {
            Shape::Ascending => MembershipFunction::Ascending {
                a: points[0],
                b: points[1],
            },
            Shape::Descending => MembershipFunction::Descending {
                a: points[0],
                b: points[1],
            },
            Shape::Trapezoid => MembershipFunction::Trapezoid {
                a: points[0],
                b: points[1],
                c: points[2],
                d: points[3],
            },
        })
    }

    pub fn shape(&self) -> Shape {
        match self {
            MembershipFunction::Ascending { .. } => Shape::Ascending,
            MembershipFunction::Descending { .. } => Shape::Descending,
            MembershipFunction::Trapezoid { .. } => Shape::Trapezoid,
        }
    }

    pub fn points(&self) -> Vec<f64> {
        match *self {
            MembershipFunction::Ascending { a, b } | MembershipFunction::Descending { a, b } => {
                vec![a, b]
            }
            MembershipFunction::Trapezoid { a, b, c, d } => vec![a, b, c, d],
        }
    }

    /// Interval outside of which the grade is zero
    ///
    /// Ascending functions are unbounded above, descending ones below.
    pub fn support(&self) -> Support {
        match *self {
            MembershipFunction::Ascending { a, .. } => Support {
                min: Some(a),
                max: None,
            },
            MembershipFunction::Descending { b, .. } => Support {
                min: None,
                max: Some(b),
            },
            MembershipFunction::Trapezoid { a, d, .. } => Support {
                min: Some(a),
                max: Some(d),
            },
        }
    }

    /// Membership grade of `x`, in `[0, 1]`
    pub fn grade(&self, x: f64) -> f64 {
        let value = match *self {
            MembershipFunction::Ascending { a, b } => rising(x, a, b),
            MembershipFunction::Descending { a, b } => 1.0 - rising(x, a, b),
            MembershipFunction::Trapezoid { a, b, c, d } => {
                if x < b {
                    rising(x, a, b)
                } else if x <= c {
                    1.0
                } else {
                    1.0 - rising(x, c, d)
                }
            }
        };
        value.clamp(0.0, 1.0)
    }
}

/// Linear ramp from 0 at `lo` to 1 at `hi`; a vertical step when `lo == hi`
fn rising(x: f64, lo: f64, hi: f64) -> f64 {
    if x < lo {
        0.0
    } else if x >= hi {
        1.0
    } else {
        (x - lo) / (hi - lo)
    }
}

/// Closed support interval, possibly unbounded on one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Support {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Support {
    pub fn contains(&self, x: f64) -> bool {
        self.min.map_or(true, |min| x >= min) && self.max.map_or(true, |max| x <= max)
    }
}

impl fmt::Display for MembershipFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let points: Vec<String> = self.points().iter().map(|p| format!("{:?}", p)).collect();
        write!(f, "{}({})", self.shape().keyword(), points.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trap() -> MembershipFunction {
        MembershipFunction::from_points(Shape::Trapezoid, &[1.0, 1.5, 2.0, 2.5]).unwrap()
    }

    #[test]
    fn test_from_points_checks_arity_and_order() {
        assert!(MembershipFunction::from_points(Shape::Trapezoid, &[1.0, 2.0]).is_none());
        assert!(MembershipFunction::from_points(Shape::Ascending, &[1.0, 2.0, 3.0]).is_none());
        assert!(MembershipFunction::from_points(Shape::Descending, &[2.0, 1.0]).is_none());
        assert!(MembershipFunction::from_points(Shape::Ascending, &[0.0, 0.0]).is_some());
    }

    #[test]
    fn test_shape_keywords() {
        assert_eq!(Shape::from_keyword("trap"), Some(Shape::Trapezoid));
        assert_eq!(Shape::from_keyword("ASC"), Some(Shape::Ascending));
        assert_eq!(Shape::from_keyword("DESC"), Some(Shape::Descending));
        assert_eq!(Shape::from_keyword("BELL"), None);
    }

    #[test]
    fn test_supports() {
        assert_eq!(
            trap().support(),
            Support {
                min: Some(1.0),
                max: Some(2.5)
            }
        );
        let asc = MembershipFunction::from_points(Shape::Ascending, &[0.5, 1.0]).unwrap();
        assert_eq!(asc.support().max, None);
        assert_eq!(asc.support().min, Some(0.5));
        let desc = MembershipFunction::from_points(Shape::Descending, &[-1.0, -0.5]).unwrap();
        assert_eq!(desc.support().min, None);
        assert_eq!(desc.support().max, Some(-0.5));
    }

    #[test]
    fn test_trapezoid_grades() {
        let f = trap();
        assert_eq!(f.grade(0.5), 0.0);
        assert_eq!(f.grade(1.0), 0.0);
        assert!((f.grade(1.25) - 0.5).abs() < 1e-9);
        assert_eq!(f.grade(1.75), 1.0);
        assert!((f.grade(2.25) - 0.5).abs() < 1e-9);
        assert_eq!(f.grade(3.0), 0.0);
    }

    #[test]
    fn test_ramp_grades() {
        let asc = MembershipFunction::from_points(Shape::Ascending, &[0.0, 2.0]).unwrap();
        assert_eq!(asc.grade(-1.0), 0.0);
        assert!((asc.grade(1.0) - 0.5).abs() < 1e-9);
        assert_eq!(asc.grade(5.0), 1.0);

        let desc = MembershipFunction::from_points(Shape::Descending, &[0.0, 2.0]).unwrap();
        assert_eq!(desc.grade(-1.0), 1.0);
        assert!((desc.grade(1.5) - 0.25).abs() < 1e-9);
        assert_eq!(desc.grade(2.0), 0.0);
    }

    #[test]
    fn test_grade_is_zero_outside_support() {
        let functions = [
            trap(),
            MembershipFunction::from_points(Shape::Ascending, &[0.5, 1.0]).unwrap(),
            MembershipFunction::from_points(Shape::Descending, &[-1.0, -0.5]).unwrap(),
        ];
        for f in functions {
            let support = f.support();
            for i in -40..=40 {
                let x = f64::from(i) / 8.0;
                if !support.contains(x) {
                    assert_eq!(f.grade(x), 0.0, "{} at {}", f, x);
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(trap().to_string(), "TRAP(1.0, 1.5, 2.0, 2.5)");
    }
}
