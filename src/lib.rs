//! # Gauge Monitor Library
//!
//! Stream MAX17205 fuel-gauge registers from a remote machine, keep the
//! history on disk and chart it live.
//!
//! This library provides the register protocol, the shared time-series store
//! and the sampling and rendering tasks driven by the `gauge-monitor` binary.

pub mod config;
pub mod error;
pub mod gauge;
pub mod monitor;
pub mod remote;
pub mod render;
pub mod sampler;
pub mod store;
