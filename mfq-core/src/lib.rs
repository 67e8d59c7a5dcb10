//! # MFQ Core Library
//!
//! Fuzzy melodic queries over a property graph of symbolic music:
//! - Pattern-description parsing (notes, tolerances, mode markers,
//!   membership functions)
//! - Pitch neighborhoods, intervals and duration ratios
//! - Compilation into graph pattern-matching query text
//! - Graded ranking of result rows with Yager's "almost all" aggregation
//! - Configuration loading, reports and the execution boundary

pub mod columns;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod intervals;
pub mod membership;
pub mod pattern;
pub mod perf;
pub mod pitch;
pub mod ranking;
pub mod report;

pub use compiler::{compile, CompiledQuery};
pub use config::{CompileOptions, DurationBounds, MfqConfig, RankOptions};
pub use error::{CompileError, Error, Result};
pub use executor::{search, QueryExecutor, ReplayExecutor, SearchResult};
pub use extract::{describe, parse_query};
pub use pattern::{FuzzyParameters, MatchMode, NoteSpec, ParsedQuery, QueryPattern};
pub use ranking::{rank, RankedNote, RankedSequence, Row};
