//! Code aggregation
//!
//! Walks code records in document order. Python bodies are collected into one
//! payload; the first SQL block is executed on the spot and ends the walk.

use crate::markdown::{CodeRecord, Language};
use crate::query::{QueryExecutor, QueryResult};
use mdrun_foundation::Result;
use mdrun_task::AggregatedPayload;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a document boils down to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregate {
    /// Python payload for the container
    Script(AggregatedPayload),
    /// Rows of the first SQL block
    Query(QueryResult),
}

pub struct CodeAggregator<'a> {
    executor: &'a dyn QueryExecutor,
}

impl<'a> CodeAggregator<'a> {
    pub fn new(executor: &'a dyn QueryExecutor) -> Self {
        Self { executor }
    }

    /// Records after the first SQL block are never pulled from `records`
    pub fn aggregate<I>(&self, records: I) -> Result<Aggregate>
    where
        I: IntoIterator<Item = CodeRecord>,
    {
        let mut payload = AggregatedPayload::new();

        for record in records {
            match record.language {
                Language::Interpreter => payload.push(record.body),
                Language::Declarative => {
                    debug!(chars = record.body.len(), "SQL block, running query");
                    return self.executor.execute(&record.body).map(Aggregate::Query);
                }
                Language::Other(tag) => {
                    debug!(language = %tag, "Skipping code block");
                }
            }
        }

        debug!(blocks = payload.block_count(), "Python payload ready");
        Ok(Aggregate::Script(payload))
    }
}
