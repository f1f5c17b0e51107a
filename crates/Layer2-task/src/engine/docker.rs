//! Docker engine - bollard client over the local socket

use super::{ContainerEngine, ContainerInfo, ContainerStatus, ImageInfo};
use crate::error::EngineError;
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::BuildImageOptions;
use bollard::models::{ContainerState, ContainerStateStatusEnum};
use bollard::Docker;
use futures::StreamExt;
use std::path::Path;
use tracing::{debug, info};

/// Container engine backed by the Docker (or Podman) API
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using the local defaults (`DOCKER_HOST` or the unix socket)
    pub fn connect() -> Result<Self, EngineError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    async fn inspect(&self, name_or_id: &str) -> Result<Option<ContainerInfo>, EngineError> {
        match self
            .docker
            .inspect_container(name_or_id, None::<InspectContainerOptions>)
            .await
        {
            Ok(response) => {
                let name = response
                    .name
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| name_or_id.to_string());
                Ok(Some(ContainerInfo {
                    id: response.id.unwrap_or_default(),
                    name,
                    status: status_from_state(response.state.as_ref()),
                }))
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| EngineError::Unavailable(e.to_string()))
    }

    async fn build_image(
        &self,
        context_dir: &Path,
        dockerfile: &str,
        tag: &str,
        on_log: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> Result<ImageInfo, EngineError> {
        let context = pack_context(context_dir)?;
        debug!(bytes = context.len(), dir = %context_dir.display(), "Packed build context");

        let options = BuildImageOptions {
            dockerfile: dockerfile.to_string(),
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };

        let mut stream = Box::pin(self.docker.build_image(options, None, Some(context.into())));
        let mut image_id = None;

        while let Some(item) = stream.next().await {
            let info = match item {
                Ok(info) => info,
                Err(bollard::errors::Error::DockerStreamError { error }) => {
                    return Err(EngineError::BuildFailed(error))
                }
                Err(e) => return Err(e.into()),
            };

            if let Some(error) = info.error {
                return Err(EngineError::BuildFailed(error));
            }
            if let Some(line) = info.stream {
                for part in line.lines() {
                    let part = part.trim_end();
                    if !part.is_empty() {
                        on_log(part);
                    }
                }
            }
            if let Some(id) = info.aux.and_then(|aux| aux.id) {
                image_id = Some(id);
            }
        }

        // Older engines do not send the aux record; ask for the tag instead
        let id = match image_id {
            Some(id) => id,
            None => self
                .docker
                .inspect_image(tag)
                .await?
                .id
                .ok_or_else(|| EngineError::NotFound(format!("image {}", tag)))?,
        };

        info!(image = %id, tag, "Built image");
        Ok(ImageInfo {
            id,
            tag: tag.to_string(),
        })
    }

    async fn find_container(&self, name: &str) -> Result<Option<ContainerInfo>, EngineError> {
        self.inspect(name).await
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .remove_container(id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }

    async fn run_container(
        &self,
        image_id: &str,
        name: &str,
    ) -> Result<ContainerInfo, EngineError> {
        let options = CreateContainerOptions {
            name: name.to_string(),
            ..Default::default()
        };
        let config = Config {
            image: Some(image_id.to_string()),
            ..Default::default()
        };

        let response = self.docker.create_container(Some(options), config).await?;
        self.docker
            .start_container(&response.id, None::<StartContainerOptions<String>>)
            .await?;

        let status = self.container_status(&response.id).await?;
        Ok(ContainerInfo {
            id: response.id,
            name: name.to_string(),
            status,
        })
    }

    async fn container_status(&self, id: &str) -> Result<ContainerStatus, EngineError> {
        self.inspect(id)
            .await?
            .map(|info| info.status)
            .ok_or_else(|| EngineError::NotFound(format!("container {}", id)))
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn container_logs(&self, id: &str) -> Result<Vec<u8>, EngineError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut stream = Box::pin(self.docker.logs(id, Some(options)));
        let mut output = Vec::new();
        while let Some(chunk) = stream.next().await {
            output.extend_from_slice(&chunk?.into_bytes());
        }
        Ok(output)
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}

/// Tar the build directory so it can be sent as the build context
pub(crate) fn pack_context(dir: &Path) -> Result<Vec<u8>, EngineError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.append_dir_all(".", dir)?;
    Ok(builder.into_inner()?)
}

fn status_from_state(state: Option<&ContainerState>) -> ContainerStatus {
    let Some(state) = state else {
        return ContainerStatus::Unknown("unknown".to_string());
    };

    match state.status {
        Some(ContainerStateStatusEnum::CREATED) => ContainerStatus::Created,
        Some(ContainerStateStatusEnum::RUNNING) => ContainerStatus::Running,
        Some(ContainerStateStatusEnum::PAUSED) => ContainerStatus::Paused,
        Some(ContainerStateStatusEnum::RESTARTING) => ContainerStatus::Restarting,
        Some(ContainerStateStatusEnum::REMOVING) => ContainerStatus::Removing,
        Some(ContainerStateStatusEnum::EXITED) => {
            ContainerStatus::Exited(state.exit_code.unwrap_or(-1))
        }
        Some(ContainerStateStatusEnum::DEAD) => ContainerStatus::Dead,
        _ if state.running == Some(true) => ContainerStatus::Running,
        _ => ContainerStatus::Unknown("unknown".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_state() {
        let state = ContainerState {
            status: Some(ContainerStateStatusEnum::EXITED),
            exit_code: Some(3),
            ..Default::default()
        };
        assert_eq!(status_from_state(Some(&state)), ContainerStatus::Exited(3));

        let state = ContainerState {
            status: Some(ContainerStateStatusEnum::RUNNING),
            ..Default::default()
        };
        assert_eq!(status_from_state(Some(&state)), ContainerStatus::Running);

        assert!(matches!(
            status_from_state(None),
            ContainerStatus::Unknown(_)
        ));
    }

    #[test]
    fn test_pack_context_contains_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").unwrap();
        std::fs::write(dir.path().join("script.py"), "print(1)\n").unwrap();

        let bytes = pack_context(dir.path()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();

        assert!(names.iter().any(|n| n.ends_with("Dockerfile")));
        assert!(names.iter().any(|n| n.ends_with("script.py")));
    }
}
