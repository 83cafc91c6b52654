//! Request orchestration for the Warden gateway.
//!
//! The [`Orchestrator`] owns every piece of process-scoped state a request
//! needs (allowlist, validator, governor, audit logger, artifact store,
//! database handle) and exposes the two query handlers plus the safe schema
//! description. Databases plug in through [`ReadOnlyDatabase`].

pub mod adapter;
pub mod error;
pub mod orchestrator;
pub mod result;

pub use adapter::{ColumnInfo, ReadOnlyDatabase};
pub use error::RuntimeError;
pub use orchestrator::{Orchestrator, Outcome, describe};
pub use result::{
    ArtifactOutcome, ColumnDescription, DeliverySlip, QueryRows, SLIP_NOTE, TableDescription,
};
