//! DomainPulse dashboard core.
//!
//! Turns the monitoring backend's raw check results into per-window chart
//! series and keeps a long-lived dashboard view in sync with the backend.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod fetch;
pub mod refresh;
pub mod view;
pub mod web;

#[cfg(test)]
mod testing;
