// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS Pulse Generator
//!
//! This crate lays out hierarchical pulse schedules in time and renders them
//! into per-channel I/Q waveforms for arbitrary waveform generators.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ScheduleRequest               │
//! ├─────────────────────────────────────────┤
//! │   Validation (channels, shapes, opts)    │
//! ├──────────────┬─────────────┬────────────┤
//! │   Measure    │   Arrange   │   Render   │
//! │ (durations)  │  (offsets)  │  (queue)   │
//! ├──────────────┴─────────────┴────────────┤
//! │        PhaseTrackingTransform            │
//! ├────────────────┬────────────────────────┤
//! │ Shape sampling │  Pooled I/Q buffers    │
//! └────────────────┴────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`schedule`]: Element tree and the layout passes
//! - [`carrier`]: Carrier instructions and phase tracking
//! - [`request`]: End-to-end waveform generation
//! - [`buffer`]: Pooled I/Q sample buffers
//! - [`filter`]: Output predistortion filters
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod buffer;
pub mod carrier;
pub mod channel;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod request;
pub mod schedule;
pub mod shape;
pub mod validation;

pub use buffer::{ComplexBufferPool, PooledComplexArray};
pub use channel::{ChannelId, ChannelInfo, Crosstalk, IqCalibration};
pub use config::{Config, ScheduleOptions};
pub use error::{Error, Result};
pub use request::ScheduleRequest;

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
