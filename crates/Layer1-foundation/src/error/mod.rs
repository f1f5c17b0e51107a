//! Error types for mdrun
//!
//! 컨테이너 오케스트레이션 외의 공통 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// mdrun 공통 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 입력 관련
    // ========================================================================
    #[error("Parse error: {0}")]
    Parse(String),

    // ========================================================================
    // 쿼리 실행 관련
    // ========================================================================
    #[error("Query error: {0}")]
    Query(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_error_converts() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: Error = conn.execute("SELEC 1", []).unwrap_err().into();
        assert!(matches!(err, Error::Sqlite(_)));
        assert!(err.to_string().starts_with("SQLite error:"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::Query("no SQL statement".into()).to_string(),
            "Query error: no SQL statement"
        );
        assert_eq!(
            Error::Config("bad".into()).to_string(),
            "Configuration error: bad"
        );
    }
}
