//! Leadflow Core
//!
//! The service layer that sits between a front-end and the persistence API.
//!
//! # Architecture
//!
//! ```text
//! SessionContext ──> Pipeline ──> ScopedCache ──> ProspectApi
//!                       │              ↑              │
//!                       │              └── ingest <───┘
//!                       ├──> leadflow_scope   (what the user may see)
//!                       ├──> leadflow_metrics (funnel, FYC, leaderboards)
//!                       └──> leadflow_workflow (edits, validation, guards)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use leadflow_core::prelude::*;
//!
//! let pipeline = Pipeline::new(api, Arc::new(SessionContext::signed_in(user)), PipelineConfig::default());
//! let summary = pipeline.dashboard().await;
//! let mut editor = pipeline.open_editor(&id).await?;
//! editor.record_outcome(Outcome::Kiv, vec![])?;
//! pipeline.save(&mut editor).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod session;
pub mod snapshot;

pub use api::{created_id, ProspectApi};
pub use config::PipelineConfig;
pub use error::{IngestError, PipelineError, TransportError};
pub use ingest::{ProspectRecord, Timestamp};
pub use pipeline::Pipeline;
pub use session::{SessionChange, SessionContext};
pub use snapshot::{ScopedReport, Snapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a pipeline
    pub use crate::{
        Pipeline, PipelineConfig, PipelineError, ProspectApi, SessionChange, SessionContext,
        TransportError,
    };
    pub use leadflow_model::prelude::*;
    pub use leadflow_workflow::prelude::*;
}
