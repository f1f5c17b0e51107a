//! Runner Config - 실행 설정
//!
//! 런타임 버전, 이미지 태그, 컨테이너 이름, 타임아웃 등
//! 글로벌 설정 위에 프로젝트 설정을 병합한다.

use crate::storage::JsonStore;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 설정 파일명
pub const RUNNER_CONFIG_FILE: &str = "config.json";

/// 기본 Python 버전
pub const DEFAULT_PYTHON_VERSION: &str = "3.12.2";

/// 기본 이미지 태그
pub const DEFAULT_IMAGE_TAG: &str = "python-script";

/// 기본 컨테이너 이름
pub const DEFAULT_CONTAINER_NAME: &str = "python-script-container";

/// 기본 빌드 디렉토리 (현재 디렉토리 기준)
pub const DEFAULT_BUILD_DIR: &str = ".mdrun/build";

// ============================================================================
// Runner Config (통합)
// ============================================================================

/// mdrun 실행 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Python 런타임 버전 (`python:<version>-slim`)
    #[serde(default = "default_python_version")]
    pub python_version: String,

    /// 이미지/컨테이너 식별자
    #[serde(default)]
    pub container: ContainerSettings,

    /// 타임아웃
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python_version: default_python_version(),
            container: ContainerSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(layer) = global.load_optional::<RunnerConfigLayer>(RUNNER_CONFIG_FILE)? {
                config.merge(layer);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(layer) = project.load_optional::<RunnerConfigLayer>(RUNNER_CONFIG_FILE)? {
                config.merge(layer);
            }
        }

        tracing::debug!(?config, "Loaded runner config");
        Ok(config)
    }

    /// 지정한 저장소에서만 로드 (없으면 기본값)
    pub fn load_from(store: &JsonStore) -> Result<Self> {
        let mut config = Self::new();
        if let Some(layer) = store.load_optional::<RunnerConfigLayer>(RUNNER_CONFIG_FILE)? {
            config.merge(layer);
        }
        Ok(config)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 설정 레이어 병합 - 레이어에 적힌 값은 기본값과 같아도 덮어쓴다
    pub fn merge(&mut self, layer: RunnerConfigLayer) {
        if let Some(version) = layer.python_version {
            self.python_version = version;
        }
        if let Some(container) = layer.container {
            self.container.merge(container);
        }
        if let Some(timeouts) = layer.timeouts {
            self.timeouts.merge(timeouts);
        }
    }

    /// 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.python_version.trim().is_empty() {
            return Err(Error::Config("pythonVersion must not be empty".to_string()));
        }
        if self.container.image_tag.trim().is_empty() {
            return Err(Error::Config("container.imageTag must not be empty".to_string()));
        }
        if self.container.container_name.trim().is_empty() {
            return Err(Error::Config(
                "container.containerName must not be empty".to_string(),
            ));
        }
        if self.timeouts.poll_interval_ms == 0 {
            return Err(Error::Config(
                "timeouts.pollIntervalMs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn python_version(mut self, version: impl Into<String>) -> Self {
        self.python_version = version.into();
        self
    }

    pub fn image_tag(mut self, tag: impl Into<String>) -> Self {
        self.container.image_tag = tag.into();
        self
    }

    pub fn container_name(mut self, name: impl Into<String>) -> Self {
        self.container.container_name = name.into();
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.container.build_dir = dir.into();
        self
    }

    pub fn embed(mut self, embed: EmbedMode) -> Self {
        self.container.embed = embed;
        self
    }
}

// ============================================================================
// Config Layer (파일 하나의 내용)
// ============================================================================

/// 설정 파일 하나 - 적힌 값만 Some
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfigLayer {
    #[serde(default)]
    pub python_version: Option<String>,

    #[serde(default)]
    pub container: Option<ContainerLayer>,

    #[serde(default)]
    pub timeouts: Option<TimeoutLayer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLayer {
    #[serde(default)]
    pub image_tag: Option<String>,
    #[serde(default)]
    pub container_name: Option<String>,
    #[serde(default)]
    pub build_dir: Option<PathBuf>,
    #[serde(default)]
    pub embed: Option<EmbedMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutLayer {
    #[serde(default)]
    pub build_secs: Option<u64>,
    #[serde(default)]
    pub engine_secs: Option<u64>,
    #[serde(default)]
    pub startup_secs: Option<u64>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
}

// ============================================================================
// Container Settings
// ============================================================================

/// 페이로드를 이미지에 넣는 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EmbedMode {
    /// `RUN printf '%s\n' "<payload>" > script.py` 한 줄로 삽입
    Inline,
    /// 빌드 컨텍스트에 `script.py` 파일을 쓰고 COPY
    #[default]
    ContextFile,
}

/// 이미지/컨테이너 식별자 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSettings {
    /// 빌드 이미지 태그
    #[serde(default = "default_image_tag")]
    pub image_tag: String,

    /// 컨테이너 논리 이름 (동시에 하나만 존재)
    #[serde(default = "default_container_name")]
    pub container_name: String,

    /// Dockerfile 생성 디렉토리 (빌드 컨텍스트)
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// 페이로드 삽입 방식
    #[serde(default)]
    pub embed: EmbedMode,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            image_tag: default_image_tag(),
            container_name: default_container_name(),
            build_dir: default_build_dir(),
            embed: EmbedMode::default(),
        }
    }
}

impl ContainerSettings {
    fn merge(&mut self, layer: ContainerLayer) {
        if let Some(tag) = layer.image_tag {
            self.image_tag = tag;
        }
        if let Some(name) = layer.container_name {
            self.container_name = name;
        }
        if let Some(dir) = layer.build_dir {
            self.build_dir = dir;
        }
        if let Some(embed) = layer.embed {
            self.embed = embed;
        }
    }
}

// ============================================================================
// Timeout Settings
// ============================================================================

/// 엔진 호출 데드라인
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutSettings {
    /// 이미지 빌드 전체 제한 (초)
    #[serde(default = "default_build_secs")]
    pub build_secs: u64,

    /// 컨테이너 API 호출 하나당 제한 (초)
    #[serde(default = "default_engine_secs")]
    pub engine_secs: u64,

    /// 컨테이너가 running 상태가 될 때까지 대기 (초)
    #[serde(default = "default_startup_secs")]
    pub startup_secs: u64,

    /// 상태 폴링 간격 (밀리초)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            build_secs: default_build_secs(),
            engine_secs: default_engine_secs(),
            startup_secs: default_startup_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TimeoutSettings {
    fn merge(&mut self, layer: TimeoutLayer) {
        if let Some(secs) = layer.build_secs {
            self.build_secs = secs;
        }
        if let Some(secs) = layer.engine_secs {
            self.engine_secs = secs;
        }
        if let Some(secs) = layer.startup_secs {
            self.startup_secs = secs;
        }
        if let Some(ms) = layer.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
    }

    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_secs)
    }

    pub fn engine(&self) -> Duration {
        Duration::from_secs(self.engine_secs)
    }

    pub fn startup(&self) -> Duration {
        Duration::from_secs(self.startup_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_python_version() -> String {
    DEFAULT_PYTHON_VERSION.to_string()
}

fn default_image_tag() -> String {
    DEFAULT_IMAGE_TAG.to_string()
}

fn default_container_name() -> String {
    DEFAULT_CONTAINER_NAME.to_string()
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_DIR)
}

fn default_build_secs() -> u64 {
    600
}

fn default_engine_secs() -> u64 {
    60
}

fn default_startup_secs() -> u64 {
    30
}

fn default_poll_interval_ms() -> u64 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.python_version, "3.12.2");
        assert_eq!(config.container.image_tag, "python-script");
        assert_eq!(config.container.container_name, "python-script-container");
        assert_eq!(config.container.embed, EmbedMode::ContextFile);
        assert_eq!(config.timeouts.poll_interval(), Duration::from_millis(500));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "container": { "imageTag": "custom" } }"#).unwrap();
        assert_eq!(config.container.image_tag, "custom");
        assert_eq!(config.container.container_name, DEFAULT_CONTAINER_NAME);
        assert_eq!(config.python_version, DEFAULT_PYTHON_VERSION);
        assert_eq!(config.timeouts.build_secs, 600);
    }

    #[test]
    fn test_embed_mode_serde() {
        let config: RunnerConfig =
            serde_json::from_str(r#"{ "container": { "embed": "inline" } }"#).unwrap();
        assert_eq!(config.container.embed, EmbedMode::Inline);
    }

    fn layer(json: &str) -> RunnerConfigLayer {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_merge_project_over_global() {
        let mut config = RunnerConfig::default();
        config.merge(layer(
            r#"{ "pythonVersion": "3.11.0", "container": { "imageTag": "global-tag" } }"#,
        ));
        config.merge(layer(r#"{ "container": { "imageTag": "project-tag" } }"#));

        // project overrides what it sets, global keeps the rest
        assert_eq!(config.container.image_tag, "project-tag");
        assert_eq!(config.python_version, "3.11.0");
    }

    #[test]
    fn test_merge_restores_default_values() {
        let mut config = RunnerConfig::default();
        config.merge(layer(
            r#"{ "pythonVersion": "3.11.0", "container": { "embed": "inline" }, "timeouts": { "startupSecs": 5 } }"#,
        ));
        config.merge(layer(
            r#"{ "pythonVersion": "3.12.2", "container": { "embed": "contextFile" }, "timeouts": { "startupSecs": 30 } }"#,
        ));

        assert_eq!(config.python_version, DEFAULT_PYTHON_VERSION);
        assert_eq!(config.container.embed, EmbedMode::ContextFile);
        assert_eq!(config.timeouts.startup_secs, 30);
    }

    #[test]
    fn test_empty_layer_changes_nothing() {
        let mut config = RunnerConfig::default().image_tag("kept");
        config.merge(layer("{}"));
        assert_eq!(config.container.image_tag, "kept");
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        let config = RunnerConfig::default().container_name("  ");
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = RunnerConfig::default();
        config.timeouts.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save(
                RUNNER_CONFIG_FILE,
                &RunnerConfig::default().container_name("other-container"),
            )
            .unwrap();

        let config = RunnerConfig::load_from(&store).unwrap();
        assert_eq!(config.container.container_name, "other-container");
        assert_eq!(config.container.image_tag, DEFAULT_IMAGE_TAG);
    }
}
