//! Execution boundary and the end-to-end search
//!
//! The core never talks to a graph store itself. A [`QueryExecutor`] runs the
//! compiled text and hands back every row at once; [`search`] calls it
//! exactly once per request.

use crate::compiler::{compile, CompiledQuery};
use crate::config::MfqConfig;
use crate::error::Result;
use crate::pattern::ParsedQuery;
use crate::perf::PerfLog;
use crate::ranking::{rank, RankedSequence, Row};
use std::path::Path;
use tracing::info;

/// Runs compiled query text against a property-graph store
pub trait QueryExecutor {
    /// Execute `query` and return the fully materialized result rows
    fn execute(&mut self, query: &str) -> Result<Vec<Row>>;
}

/// Serves a pre-materialized row set, recording every query it receives
#[derive(Debug, Clone, Default)]
pub struct ReplayExecutor {
    rows: Vec<Row>,
    received: Vec<String>,
}

impl ReplayExecutor {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            received: Vec::new(),
        }
    }

    /// Rows from a JSON array of objects
    pub fn from_json(json: &str) -> Result<Self> {
        let rows: Vec<Row> = serde_json::from_str(json)?;
        Ok(Self::new(rows))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Query texts received so far, in order
    pub fn received(&self) -> &[String] {
        &self.received
    }
}

impl QueryExecutor for ReplayExecutor {
    fn execute(&mut self, query: &str) -> Result<Vec<Row>> {
        self.received.push(query.to_string());
        Ok(self.rows.clone())
    }
}

/// Outcome of one search
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub compiled: CompiledQuery,
    /// Rows returned by the executor before the alpha-cut
    pub rows: usize,
    pub sequences: Vec<RankedSequence>,
}

/// Compile, execute once, then rank
pub fn search(
    query: &ParsedQuery,
    executor: &mut dyn QueryExecutor,
    config: &MfqConfig,
    perf: &mut PerfLog,
) -> Result<SearchResult> {
    let compiled = {
        let _span = perf.span("compile");
        compile(query, &config.compile_options())?
    };
    let rows = {
        let _span = perf.span("execute");
        executor.execute(&compiled.to_text())?
    };
    let sequences = {
        let _span = perf.span("rank");
        rank(&rows, query, &config.rank_options())?
    };

    info!(
        mode = ?compiled.mode,
        rows = rows.len(),
        retained = sequences.len(),
        "Search complete"
    );
    Ok(SearchResult {
        compiled,
        rows: rows.len(),
        sequences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::extract::parse_query;

    const ROWS: &str = r#"[
        {"pitch_0": "c", "accid_0": null, "octave_0": 4, "duration_0": 0.25,
         "start_0": 0.0, "end_0": 0.25, "id_0": "a",
         "source": "tune.mei", "start": 0.0, "end": 0.25}
    ]"#;

    #[test]
    fn test_search_executes_once() {
        let query = parse_query("{class:'c', octave:4, dur:4}").unwrap();
        let mut executor = ReplayExecutor::from_json(ROWS).unwrap();
        let mut perf = PerfLog::new();

        let result = search(&query, &mut executor, &MfqConfig::default(), &mut perf).unwrap();

        assert_eq!(executor.received().len(), 1);
        assert_eq!(executor.received()[0], result.compiled.to_text());
        assert_eq!(result.rows, 1);
        assert_eq!(result.sequences.len(), 1);
        let spans: Vec<&str> = perf.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(spans, vec!["compile", "execute", "rank"]);
    }

    #[test]
    fn test_compile_failure_skips_execution() {
        let query = parse_query("ALPHA 0.2").unwrap();
        let mut executor = ReplayExecutor::from_json(ROWS).unwrap();
        let mut perf = PerfLog::new();
        let err = search(&query, &mut executor, &MfqConfig::default(), &mut perf).unwrap_err();
        assert!(matches!(err, Error::Compile(_)));
        assert!(executor.received().is_empty());
    }

    #[test]
    fn test_rejects_non_array_rows() {
        assert!(matches!(
            ReplayExecutor::from_json(r#"{"source": "x"}"#),
            Err(Error::Json(_))
        ));
    }
}
