// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Overlay composite: children share the same time origin.

use std::sync::Arc;

use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;

use super::{
    measure, merge_channels, place, ArrangeContext, Arrangement, ElementRef, Layout, Measurement,
};

/// Children overlaid on a common span.
///
/// The natural duration is that of the longest child. Each child is placed
/// inside the full span by its own alignment and rendered in insertion
/// order.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    children: Vec<ElementRef>,
    channels: Vec<ChannelId>,
}

impl Schedule {
    pub fn new(children: Vec<ElementRef>) -> Self {
        let channels = merge_channels(children.iter().map(|c| c.channels()));
        Self { children, channels }
    }

    pub fn push(&mut self, child: ElementRef) {
        let merged = merge_channels([self.channels.as_slice(), child.channels()]);
        self.channels = merged;
        self.children.push(child);
    }
}

impl Layout for Schedule {
    fn measure(&self, max_duration: f64, options: &ScheduleOptions) -> Result<Measurement> {
        let children = self
            .children
            .iter()
            .map(|child| measure(Arc::clone(child), max_duration, options))
            .collect::<Result<Vec<_>>>()?;
        let natural = children.iter().map(|c| c.duration()).fold(0.0, f64::max);
        Ok(Measurement { natural, children })
    }

    fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
        let span = context.final_duration;
        let children = context
            .measured
            .children()
            .iter()
            .map(|child| place(child, 0.0, span, context.options))
            .collect::<Result<Vec<_>>>()?;
        Ok(Arrangement {
            duration: span,
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
