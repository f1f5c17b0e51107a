//! Config - 실행 설정 관리
//!
//! - `runner.rs` - RunnerConfig (런타임 버전, 식별자, 타임아웃)

mod runner;

pub use runner::{
    ContainerLayer, ContainerSettings, EmbedMode, RunnerConfig, RunnerConfigLayer, TimeoutLayer,
    TimeoutSettings, DEFAULT_BUILD_DIR, DEFAULT_CONTAINER_NAME, DEFAULT_IMAGE_TAG,
    DEFAULT_PYTHON_VERSION, RUNNER_CONFIG_FILE,
};
