//! # mdrun-task
//!
//! Container build and execution for mdrun.
//! Turns an aggregated Python payload into a running, observable container.
//!
//! ## Features
//!
//! - Build spec (Dockerfile) generation
//! - Image build with streamed build output
//! - Reconciliation of the single container bound to a logical name
//! - Health check with bounded startup wait
//! - Run state machine and event stream

pub mod buildspec;
pub mod engine;
pub mod error;
pub mod health;
pub mod image;
pub mod log;
pub mod payload;
pub mod pipeline;
pub mod reconcile;
pub mod state;

// Engine boundary
pub use engine::{ContainerEngine, ContainerInfo, ContainerStatus, DockerEngine, ImageInfo};
#[cfg(any(test, feature = "test-util"))]
pub use engine::{EngineCall, LaunchBehavior, MemoryEngine};

// Pipeline stages
pub use buildspec::{BuildSpec, BuildSpecGenerator, DOCKERFILE_NAME, SCRIPT_NAME};
pub use health::{ContainerHealthCheck, Health};
pub use image::ImageBuilder;
pub use payload::AggregatedPayload;
pub use pipeline::{ContainerPipeline, ContainerReport};
pub use reconcile::{ContainerHandle, ContainerReconciler};

// Errors, state and events
pub use error::{EngineError, ReconcileStage, RunError};
pub use log::{EventSink, LogEntry, LogSource, RunEvent};
pub use state::RunState;
