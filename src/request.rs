// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schedule requests and the waveform generation pipeline.
//!
//! A [`ScheduleRequest`] bundles the root element, the channel
//! configuration, an optional crosstalk matrix and the layout/render options. [`ScheduleRequest::generate_waveforms`]
//! runs validation, measure, arrange and render, and returns one pooled I/Q
//! buffer per configured channel.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qubit_os_pulsegen::channel::ChannelInfo;
//! use qubit_os_pulsegen::request::ScheduleRequest;
//! use qubit_os_pulsegen::schedule::{Element, Play, StackSchedule};
//! use qubit_os_pulsegen::shape::ShapeInfo;
//!
//! let x90 = Play::new("xy0".into(), Some(Arc::new(ShapeInfo::hann())), 40e-9, 0.5)?;
//! let root = Element::from_variant(StackSchedule::new(vec![
//!     Arc::new(Element::from_variant(x90.clone())),
//!     Arc::new(Element::from_variant(x90)),
//! ]));
//! let request = ScheduleRequest::new(
//!     vec![ChannelInfo::new("xy0", 100e6, 2e9)],
//!     Arc::new(root),
//! );
//! let waveforms = request.generate_waveforms()?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::{ComplexBufferPool, PooledComplexArray};
use crate::carrier::{InstructionQueue, PhaseTrackingTransform};
use crate::channel::{ChannelId, ChannelInfo, Crosstalk};
use crate::config::ScheduleOptions;
use crate::error::Result;
use crate::schedule::{self, ElementRef};
use crate::validation;

/// Everything needed to render one schedule.
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    channels: Vec<ChannelInfo>,
    schedule: ElementRef,
    crosstalk: Option<Crosstalk>,
    options: ScheduleOptions,
    pool: Option<Arc<ComplexBufferPool>>,
}

impl ScheduleRequest {
    /// Create a request with default options on the shared buffer pool.
    pub fn new(channels: Vec<ChannelInfo>, schedule: ElementRef) -> Self {
        Self {
            channels,
            schedule,
            crosstalk: None,
            options: ScheduleOptions::default(),
            pool: None,
        }
    }

    pub fn with_options(mut self, options: ScheduleOptions) -> Self {
        self.options = options;
        self
    }

    /// Leak pulses between channels through `crosstalk`.
    pub fn with_crosstalk(mut self, crosstalk: Crosstalk) -> Self {
        self.crosstalk = Some(crosstalk);
        self
    }

    /// Render into `pool` instead of the shared pool.
    pub fn with_pool(mut self, pool: Arc<ComplexBufferPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn channels(&self) -> &[ChannelInfo] {
        &self.channels
    }

    pub fn schedule(&self) -> &ElementRef {
        &self.schedule
    }

    pub fn crosstalk(&self) -> Option<&Crosstalk> {
        self.crosstalk.as_ref()
    }

    pub fn options(&self) -> &ScheduleOptions {
        &self.options
    }

    /// Run the full pipeline and return the waveform of every channel.
    ///
    /// The caller owns the returned buffers; dropping them returns the
    /// memory to the pool.
    ///
    /// # Errors
    ///
    /// - Validation errors for bad options, channels, crosstalk matrices,
    ///   unknown channel references or malformed shapes (nothing is rendered)
    /// - [`LayoutError::Overflow`](crate::error::LayoutError::Overflow) when
    ///   an element overflows and oversizing is disallowed
    pub fn generate_waveforms(&self) -> Result<HashMap<ChannelId, PooledComplexArray>> {
        let options = &self.options;
        validation::validate_request(
            &self.schedule,
            &self.channels,
            self.crosstalk.as_ref(),
            options,
        )?;

        let measured = schedule::measure(Arc::clone(&self.schedule), f64::INFINITY, options)?;
        let total_duration = measured.duration();
        debug!(total_duration, "Measure pass complete");

        let arranged = schedule::arrange(&measured, 0.0, total_duration, options)?;
        debug!(
            inner_duration = arranged.inner_duration(),
            "Arrange pass complete"
        );

        let mut queue = InstructionQueue::new();
        schedule::render(&arranged, 0.0, &mut queue)?;
        debug!(instructions = queue.len(), "Render pass collected instructions");

        let pool = self.pool.clone().unwrap_or_else(ComplexBufferPool::shared);
        let mut transform =
            PhaseTrackingTransform::new(&self.channels, total_duration, options, pool);
        if let Some(crosstalk) = &self.crosstalk {
            transform = transform.with_crosstalk(crosstalk)?;
        }
        queue.replay(&mut transform, options.time_tolerance)?;
        let (cached, hits) = transform.envelope_cache_stats();
        debug!(cached, hits, "Render pass complete");

        let waveforms = transform.into_waveforms()?;
        debug!(channels = waveforms.len(), "Waveforms generated");
        Ok(waveforms)
    }
}
