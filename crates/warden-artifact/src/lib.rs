//! # warden-artifact
//!
//! Uploaded CSV/Parquet artifacts and the per-request DuckDB store they are
//! queried through.
//!
//! - [`ArtifactStore`] resolves file ids inside the artifact directory and
//!   writes delivery slips back into it
//! - [`ArtifactEngine`] loads one artifact as the table `artifact` and runs a
//!   single query against it

pub mod engine;
pub mod error;
pub mod store;

pub use engine::{ArtifactEngine, ArtifactQuery, ArtifactRows};
pub use error::ArtifactError;
pub use store::{ArtifactFile, ArtifactFormat, ArtifactStore};
