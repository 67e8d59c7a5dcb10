//! Query compiler: `ParsedQuery` → graph pattern-matching query
//!
//! One pipeline serves the three matching modes. Clause groups are emitted in
//! a fixed order:
//!
//! 1. structural `MATCH` (direct `NEXT` edges, or bounded variable-length
//!    paths when a duration gap is allowed)
//! 2. optional `WITH` binding the summed interval of each path
//! 3. `WHERE` conjunction of per-position, sequencing and membership conditions
//! 4. optional collection filter
//! 5. `RETURN` projection following the positional column contract in
//!    [`crate::columns`]
//!
//! Compilation validates the query first and emits nothing on failure.

mod clauses;
pub mod literal;

use crate::config::CompileOptions;
use crate::error::{CompileError, Result};
use crate::pattern::{MatchMode, ParsedQuery};
use clauses::ClauseBuilder;
use serde::Serialize;
use std::fmt;
use tracing::debug;

/// A compiled query, kept as separate clause groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub mode: MatchMode,
    /// Number of pattern positions
    pub positions: usize,
    /// Whether `interval_<i>` columns are projected
    pub intervals: bool,
    pub structural: String,
    pub binding: Option<String>,
    pub filter: Option<String>,
    pub collection: Option<String>,
    pub projection: String,
    /// Projected column names, in `RETURN` order
    pub columns: Vec<String>,
}

impl CompiledQuery {
    /// Clause groups in emission order, skipping absent ones
    pub fn clause_groups(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.structural.as_str())
            .chain(self.binding.as_deref())
            .chain(self.filter.as_deref())
            .chain(self.collection.as_deref())
            .chain(std::iter::once(self.projection.as_str()))
    }

    pub fn to_text(&self) -> String {
        self.clause_groups().collect::<Vec<_>>().join("\n")
    }
}

impl fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Check that a parsed query can be compiled and ranked
///
/// Rejects empty patterns, references to undeclared membership functions and
/// references to steps the pattern does not have.
pub fn validate(query: &ParsedQuery) -> std::result::Result<(), CompileError> {
    if query.pattern.is_empty() {
        return Err(CompileError::EmptyPattern);
    }
    let steps = query.pattern.steps();
    for membership in &query.memberships {
        if !query.functions.contains_key(&membership.function) {
            return Err(CompileError::UndeclaredFunction(membership.function.clone()));
        }
        if membership.step >= steps {
            return Err(CompileError::PositionOutOfRange {
                step: membership.step,
                steps,
            });
        }
    }
    Ok(())
}

/// Compile a parsed query into clause groups
pub fn compile(query: &ParsedQuery, options: &CompileOptions) -> Result<CompiledQuery> {
    validate(query)?;

    let builder = ClauseBuilder::new(query, options);
    let structural = builder.structural();
    let binding = builder.binding();
    let filter = builder.filter();
    let collection = builder.collection();
    let (projection, columns) = builder.projection();

    debug!(
        mode = ?builder.mode(),
        positions = query.pattern.len(),
        gapped = query.parameters.duration_gap > 0.0,
        max_hops = builder.max_hops(),
        intervals = builder.uses_intervals(),
        bound = binding.is_some(),
        filtered = filter.is_some(),
        collections = collection.is_some(),
        "Compiled query"
    );

    Ok(CompiledQuery {
        mode: builder.mode(),
        positions: query.pattern.len(),
        intervals: builder.uses_intervals(),
        structural,
        binding,
        filter,
        collection,
        projection,
        columns,
    })
}
