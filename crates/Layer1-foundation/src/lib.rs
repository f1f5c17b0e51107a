//! # mdrun-foundation
//!
//! Foundation layer for mdrun:
//! - Error: 공통 에러 타입 (Config, Parse, Query, IO ...)
//! - Config: 실행 설정 (RunnerConfig, 글로벌 + 프로젝트 병합)
//! - Storage: JsonStore (설정 파일 저장/로드)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    ContainerLayer, ContainerSettings, EmbedMode, RunnerConfig, RunnerConfigLayer, TimeoutLayer,
    TimeoutSettings, DEFAULT_BUILD_DIR, DEFAULT_CONTAINER_NAME, DEFAULT_IMAGE_TAG,
    DEFAULT_PYTHON_VERSION, RUNNER_CONFIG_FILE,
};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::JsonStore;
