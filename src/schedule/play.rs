// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pulse-emitting leaf element.

use std::sync::Arc;

use crate::carrier::{CarrierSink, PulseInstruction};
use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;
use crate::shape::ShapeInfo;

use super::{ensure_finite, ensure_non_negative, Layout, Measurement, RenderContext};

/// Play a shaped pulse on one channel.
///
/// The shape is sampled over `width`; a `plateau` splits it in the middle
/// with a flat top. A pulse without a shape is rectangular over
/// `width + plateau`. A flexible pulse measures as `width` alone and its
/// plateau absorbs whatever span its parent allots, shorter or longer than
/// the configured one.
#[derive(Debug, Clone, PartialEq)]
pub struct Play {
    channels: [ChannelId; 1],
    shape: Option<Arc<ShapeInfo>>,
    width: f64,
    plateau: f64,
    amplitude: f64,
    drag_coef: f64,
    frequency: f64,
    phase: f64,
    flexible: bool,
}

impl Play {
    /// Create a pulse.
    ///
    /// # Errors
    ///
    /// `width` must be finite and non-negative and `amplitude` finite.
    pub fn new(
        channel: ChannelId,
        shape: Option<Arc<ShapeInfo>>,
        width: f64,
        amplitude: f64,
    ) -> Result<Self> {
        ensure_non_negative("width", width)?;
        ensure_finite("amplitude", amplitude)?;
        Ok(Self {
            channels: [channel],
            shape,
            width,
            plateau: 0.0,
            amplitude,
            drag_coef: 0.0,
            frequency: 0.0,
            phase: 0.0,
            flexible: false,
        })
    }

    pub fn with_plateau(mut self, plateau: f64) -> Result<Self> {
        ensure_non_negative("plateau", plateau)?;
        self.plateau = plateau;
        Ok(self)
    }

    pub fn with_drag_coef(mut self, drag_coef: f64) -> Result<Self> {
        ensure_finite("drag_coef", drag_coef)?;
        self.drag_coef = drag_coef;
        Ok(self)
    }

    /// Detune the pulse from the channel carrier (Hz).
    pub fn with_frequency(mut self, frequency: f64) -> Result<Self> {
        ensure_finite("frequency", frequency)?;
        self.frequency = frequency;
        Ok(self)
    }

    /// Phase offset in radians.
    pub fn with_phase(mut self, phase: f64) -> Result<Self> {
        ensure_finite("phase", phase)?;
        self.phase = phase;
        Ok(self)
    }

    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.flexible = flexible;
        self
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channels[0]
    }

    pub fn shape(&self) -> Option<&Arc<ShapeInfo>> {
        self.shape.as_ref()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn plateau(&self) -> f64 {
        self.plateau
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn drag_coef(&self) -> f64 {
        self.drag_coef
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn flexible(&self) -> bool {
        self.flexible
    }

    fn instruction(&self, duration: f64) -> PulseInstruction {
        let plateau = if self.flexible {
            (duration - self.width).max(0.0)
        } else {
            self.plateau
        };
        PulseInstruction {
            shape: self.shape.clone(),
            width: self.width,
            plateau,
            amplitude: self.amplitude,
            drag_coef: self.drag_coef,
            frequency: self.frequency,
            phase: self.phase,
        }
    }
}

impl Layout for Play {
    fn measure(&self, _max_duration: f64, _options: &ScheduleOptions) -> Result<Measurement> {
        if self.flexible {
            Ok(Measurement::leaf(self.width))
        } else {
            Ok(Measurement::leaf(self.width + self.plateau))
        }
    }

    fn render(&self, context: &RenderContext<'_>, sink: &mut dyn CarrierSink) -> Result<()> {
        sink.play(self.channel(), &self.instruction(context.duration), context.time)
    }

    fn channels(&self) -> &[ChannelId] {
        &self.channels
    }
}
