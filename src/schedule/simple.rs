// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Zero-duration carrier operations and barriers.

use crate::carrier::CarrierSink;
use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;

use super::{merge_channels, Layout, Measurement, RenderContext};

macro_rules! carrier_op {
    ($(#[$doc:meta])* $name:ident, $field:ident, $sink_fn:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name {
            channels: [ChannelId; 1],
            $field: f64,
        }

        impl $name {
            pub fn new(channel: ChannelId, $field: f64) -> Self {
                Self {
                    channels: [channel],
                    $field,
                }
            }

            pub fn channel(&self) -> &ChannelId {
                &self.channels[0]
            }

            pub fn $field(&self) -> f64 {
                self.$field
            }
        }

        impl Layout for $name {
            fn measure(&self, _max_duration: f64, _options: &ScheduleOptions) -> Result<Measurement> {
                Ok(Measurement::leaf(0.0))
            }

            fn render(&self, context: &RenderContext<'_>, sink: &mut dyn CarrierSink) -> Result<()> {
                sink.$sink_fn(self.channel(), self.$field, context.time)
            }

            fn channels(&self) -> &[ChannelId] {
                &self.channels
            }
        }
    };
}

carrier_op!(
    /// Jump the carrier phase to an absolute value (radians).
    SetPhase,
    phase,
    set_phase
);

carrier_op!(
    /// Advance the carrier phase by a delta (radians).
    ShiftPhase,
    phase,
    shift_phase
);

carrier_op!(
    /// Change the carrier frequency (Hz), keeping the phase continuous.
    SetFrequency,
    frequency,
    set_frequency
);

carrier_op!(
    /// Offset the carrier frequency by a delta (Hz).
    ShiftFrequency,
    frequency,
    shift_frequency
);

/// Exchange the carrier phases of two channels.
///
/// Each channel keeps its own frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapPhase {
    channels: [ChannelId; 2],
}

impl SwapPhase {
    pub fn new(first: ChannelId, second: ChannelId) -> Self {
        Self {
            channels: [first, second],
        }
    }

    pub fn first(&self) -> &ChannelId {
        &self.channels[0]
    }

    pub fn second(&self) -> &ChannelId {
        &self.channels[1]
    }
}

impl Layout for SwapPhase {
    fn measure(&self, _max_duration: f64, _options: &ScheduleOptions) -> Result<Measurement> {
        Ok(Measurement::leaf(0.0))
    }

    fn render(&self, context: &RenderContext<'_>, sink: &mut dyn CarrierSink) -> Result<()> {
        sink.swap_phase(self.first(), self.second(), context.time)
    }

    fn channels(&self) -> &[ChannelId] {
        &self.channels
    }
}

/// A no-op that occupies the listed channels.
///
/// With an explicit duration it acts as a spacer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Barrier {
    channels: Vec<ChannelId>,
}

impl Barrier {
    pub fn new(channels: Vec<ChannelId>) -> Self {
        let channels = merge_channels([channels.as_slice()]);
        Self { channels }
    }
}

impl Layout for Barrier {
    fn measure(&self, _max_duration: f64, _options: &ScheduleOptions) -> Result<Measurement> {
        Ok(Measurement::leaf(0.0))
    }

    fn render(&self, _context: &RenderContext<'_>, _sink: &mut dyn CarrierSink) -> Result<()> {
        Ok(())
    }

    fn channels(&self) -> &[ChannelId] {
        &self.channels
    }
}
