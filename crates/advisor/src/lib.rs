//! HTTP adapter around the recommendation engine

pub mod api;
pub mod config;
