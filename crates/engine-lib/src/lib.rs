//! Resource sizing recommendation engine
//!
//! This crate provides the core functionality for:
//! - Modelling interval-aggregated container metrics
//! - Duration-based sub-category policies (short/medium/long term)
//! - Recommendation engines that turn a metric series into CPU/memory
//!   requests and limits annotated with notifications
//! - Observability helpers used by the service layer

pub mod engine;
pub mod error;
pub mod models;
pub mod observability;
pub mod policy;
pub mod recommendation;

pub use engine::{
    build_engine, CapacityBasedEngine, DurationBasedEngine, EngineConfig, EngineKind,
    RecommendationCategory, RecommendationEngine, RecommendationSet,
};
pub use error::{EngineError, PolicyError};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use policy::{DurationPolicy, SubCategory};
pub use recommendation::*;
