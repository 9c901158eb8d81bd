// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sequential composite with surplus-time distribution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;

use super::{
    measure, merge_channels, place, ArrangeContext, Arrangement, ElementRef, Layout, Measurement,
};

/// How a stack distributes time beyond what its children need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrangeOption {
    /// All surplus after the last child.
    #[default]
    PackStart,
    /// All surplus before the first child.
    PackEnd,
    /// Surplus split evenly before the first and after the last child.
    Center,
    /// Surplus split evenly into the gaps between children.
    Justify,
    /// Every child slot scaled so the children fill the span.
    Stretch,
}

/// Children laid out one after another along time.
#[derive(Debug, Clone, Default)]
pub struct StackSchedule {
    children: Vec<ElementRef>,
    channels: Vec<ChannelId>,
    arrange_option: ArrangeOption,
}

impl StackSchedule {
    pub fn new(children: Vec<ElementRef>) -> Self {
        let channels = merge_channels(children.iter().map(|c| c.channels()));
        Self {
            children,
            channels,
            arrange_option: ArrangeOption::default(),
        }
    }

    pub fn with_arrange_option(mut self, arrange_option: ArrangeOption) -> Self {
        self.arrange_option = arrange_option;
        self
    }

    pub fn arrange_option(&self) -> ArrangeOption {
        self.arrange_option
    }
}

/// Slot layout along the stack: leading offset, inter-child gap and slot
/// scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Distribution {
    lead: f64,
    gap: f64,
    scale: f64,
}

impl Distribution {
    fn new(option: ArrangeOption, final_duration: f64, natural_sum: f64, count: usize) -> Self {
        let surplus = (final_duration - natural_sum).max(0.0);
        let packed = |lead: f64| Self {
            lead,
            gap: 0.0,
            scale: 1.0,
        };
        match option {
            ArrangeOption::PackStart => packed(0.0),
            ArrangeOption::PackEnd => packed(surplus),
            ArrangeOption::Center => packed(surplus / 2.0),
            ArrangeOption::Justify if count > 1 => Self {
                lead: 0.0,
                gap: surplus / (count - 1) as f64,
                scale: 1.0,
            },
            ArrangeOption::Stretch if natural_sum > 0.0 => Self {
                lead: 0.0,
                gap: 0.0,
                scale: (natural_sum + surplus) / natural_sum,
            },
            ArrangeOption::Justify | ArrangeOption::Stretch => packed(0.0),
        }
    }
}

impl Layout for StackSchedule {
    fn measure(&self, max_duration: f64, options: &ScheduleOptions) -> Result<Measurement> {
        let mut remaining = max_duration;
        let mut natural = 0.0;
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let measured = measure(Arc::clone(child), remaining, options)?;
            natural += measured.duration();
            remaining = (remaining - measured.duration()).max(0.0);
            children.push(measured);
        }
        Ok(Measurement { natural, children })
    }

    fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
        let measured = context.measured.children();
        let natural_sum: f64 = measured.iter().map(|c| c.duration()).sum();
        let dist = Distribution::new(
            self.arrange_option,
            context.final_duration,
            natural_sum,
            measured.len(),
        );

        let mut cursor = dist.lead;
        let mut children = Vec::with_capacity(measured.len());
        for child in measured {
            let slot = child.duration() * dist.scale;
            children.push(place(child, cursor, slot, context.options)?);
            cursor += slot + dist.gap;
        }
        Ok(Arrangement {
            duration: context.final_duration,
            children,
        })
    }

    fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    fn children(&self) -> Vec<&ElementRef> {
        self.children.iter().collect()
    }
}
