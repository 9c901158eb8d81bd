// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composite with children at explicit offsets.

use std::sync::Arc;

use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;

use super::{
    arrange, ensure_finite, measure, merge_channels, ArrangeContext, Arrangement, ElementRef,
    Layout, Measurement,
};

/// A child of [`Absolute`] and its offset from the composite start.
#[derive(Debug, Clone)]
pub struct AbsoluteEntry {
    time: f64,
    element: ElementRef,
}

impl AbsoluteEntry {
    /// Place `element` at the composite start.
    pub fn new(element: ElementRef) -> Self {
        Self { time: 0.0, element }
    }

    /// Move the entry to `time` seconds after the composite start.
    pub fn at(mut self, time: f64) -> Result<Self> {
        ensure_finite("time", time)?;
        self.time = time;
        Ok(self)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }
}

/// Children placed at fixed offsets, each with its measured duration.
#[derive(Debug, Clone, Default)]
pub struct Absolute {
    entries: Vec<AbsoluteEntry>,
    channels: Vec<ChannelId>,
}

impl Absolute {
    pub fn new(entries: Vec<AbsoluteEntry>) -> Self {
        let channels = merge_channels(entries.iter().map(|e| e.element.channels()));
        Self { entries, channels }
    }

    pub fn entries(&self) -> &[AbsoluteEntry] {
        &self.entries
    }
}

impl Layout for Absolute {
    fn measure(&self, _max_duration: f64, options: &ScheduleOptions) -> Result<Measurement> {
        let mut natural: f64 = 0.0;
        let mut children = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let measured = measure(Arc::clone(&entry.element), f64::INFINITY, options)?;
            natural = natural.max(entry.time + measured.duration());
            children.push(measured);
        }
        Ok(Measurement { natural, children })
    }

    fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
        let children = self
            .entries
            .iter()
            .zip(context.measured.children())
            .map(|(entry, child)| arrange(child, entry.time, child.duration(), context.options))
            .collect::<Result<Vec<_>>>()?;
        Ok(Arrangement {
            duration: context.final_duration,
            children,
        })
    }

    fn channels(&self) -> &[ChannelId] {
        &self.channels
    }

    fn children(&self) -> Vec<&ElementRef> {
        self.entries.iter().map(|e| &e.element).collect()
    }
}
