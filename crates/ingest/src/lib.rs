#![doc = include_str!("../README.md")]
//! # 아키텍처
//!
//! ```text
//! log file ──> IngestPipeline (read loop)
//!                  │
//!                  ├── CompiledDirective::match_line ── miss ──> ErrorSink
//!                  │
//!                  ▼ hit
//!              DocumentBuilder ──> IdentityAssigner
//!                  │
//!                  ▼
//!              BulkDispatcher ──> batcher ──> workers ──> BulkBackend
//!                                                 │
//!                                                 ▼
//!                                             RunStatus
//! ```

pub mod bulk;
pub mod config;
pub mod directive;
pub mod document;
pub mod error;
pub mod error_sink;
pub mod identity;
pub mod pipeline;
pub mod status;

pub use bulk::{
    BulkBackend, BulkDispatcher, DeliveryError, DeliveryObserver, DispatchStats, DrainReport,
    ElasticsearchBackend, EncodedItem, RetryPolicy,
};
pub use config::{DispatcherConfig, PipelineConfig, PipelineConfigBuilder};
pub use directive::{CompiledDirective, DirectiveDefinition, DirectiveLoader, DirectiveMatch};
pub use document::DocumentBuilder;
pub use error::IngestError;
pub use error_sink::ErrorSink;
pub use identity::IdentityAssigner;
pub use pipeline::{IngestPipeline, IngestPipelineBuilder, PipelineState};
pub use status::RunStatus;
