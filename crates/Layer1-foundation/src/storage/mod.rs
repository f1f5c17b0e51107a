//! Storage module for mdrun
//!
//! - `json`: JSON - 설정 파일 저장/로드 (글로벌 + 프로젝트)

mod json;

// JSON Storage (설정)
pub use json::JsonStore;
