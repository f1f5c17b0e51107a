//! # mdrun-core
//!
//! Core runtime for mdrun:
//! - Markdown: 코드 블록 추출 (pulldown-cmark)
//! - Aggregate: Python 블록 병합, SQL 블록 단락 실행
//! - Query: 임베디드 SQLite 실행기
//! - Runner: 문서 단위 실행 (쿼리 또는 컨테이너 파이프라인)

pub mod aggregate;
pub mod markdown;
pub mod query;
pub mod runner;

// ============================================================================
// Markdown
// ============================================================================
pub use markdown::{iterate_code_chunks, CodeChunks, CodeRecord, Language};

// ============================================================================
// Aggregation / Query
// ============================================================================
pub use aggregate::{Aggregate, CodeAggregator};
pub use query::{QueryExecutor, QueryResult, SqliteExecutor};

// ============================================================================
// Runner
// ============================================================================
pub use runner::{CodeRunner, RunOutcome};

// Re-exports from Layer2-task
pub use mdrun_task::{
    AggregatedPayload, ContainerEngine, ContainerReport, DockerEngine, EventSink, Health,
    LogEntry, LogSource, RunError, RunEvent, RunState,
};
