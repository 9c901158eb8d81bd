// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Repetition of a single child.

use std::sync::Arc;

use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::Result;

use super::{
    arrange, ensure_finite, measure, ArrangeContext, Arrangement, ElementRef, Layout, Measurement,
};

/// A child played `count` times back to back, `spacing` seconds apart.
///
/// The child is measured once and arranged at every repetition.
#[derive(Debug, Clone)]
pub struct Repeat {
    child: ElementRef,
    count: usize,
    spacing: f64,
}

impl Repeat {
    pub fn new(child: ElementRef, count: usize) -> Self {
        Self {
            child,
            count,
            spacing: 0.0,
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> Result<Self> {
        ensure_finite("spacing", spacing)?;
        self.spacing = spacing;
        Ok(self)
    }

    pub fn child(&self) -> &ElementRef {
        &self.child
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    fn total(&self, child_duration: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        (n * child_duration + (n - 1.0) * self.spacing).max(0.0)
    }
}

impl Layout for Repeat {
    fn measure(&self, max_duration: f64, options: &ScheduleOptions) -> Result<Measurement> {
        if self.count == 0 {
            return Ok(Measurement::leaf(0.0));
        }
        let n = self.count as f64;
        let bound = ((max_duration - (n - 1.0) * self.spacing) / n).max(0.0);
        let measured = measure(Arc::clone(&self.child), bound, options)?;
        Ok(Measurement {
            natural: self.total(measured.duration()),
            children: vec![measured],
        })
    }

    fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
        let mut children = Vec::with_capacity(self.count);
        if let Some(child) = context.measured.children().first() {
            let step = child.duration() + self.spacing;
            for k in 0..self.count {
                let time = k as f64 * step;
                children.push(arrange(child, time, child.duration(), context.options)?);
            }
        }
        Ok(Arrangement {
            duration: context.final_duration,
            children,
        })
    }

    fn channels(&self) -> &[ChannelId] {
        self.child.channels()
    }

    fn children(&self) -> Vec<&ElementRef> {
        vec![&self.child]
    }
}
