// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for schedule tests.

use std::sync::Arc;

use crate::buffer::ComplexBufferPool;
use crate::channel::ChannelInfo;
use crate::schedule::{Barrier, Element, ElementCommon, ElementRef, Play};
use crate::shape::ShapeInfo;

/// A channel with unit sample rate and no carrier, so sample `i` sits at
/// `t = i` and pulses render as bare envelopes.
pub fn channel(name: &str) -> ChannelInfo {
    ChannelInfo::new(name, 0.0, 1.0)
}

/// A unit-amplitude triangle pulse of `width` on `channel`.
pub fn pulse_on(channel: &str, width: f64) -> ElementRef {
    let play = Play::new(
        channel.into(),
        Some(Arc::new(ShapeInfo::triangle())),
        width,
        1.0,
    )
    .expect("valid pulse");
    Arc::new(Element::from_variant(play))
}

/// A channel-less barrier pinned to `duration`.
pub fn spacer(duration: f64) -> ElementRef {
    let common = ElementCommon::builder()
        .duration(Some(duration))
        .build()
        .expect("valid duration");
    Arc::new(Element::new(common, Barrier::default()))
}

/// A small standalone pool so tests do not share buffers.
pub fn local_pool() -> Arc<ComplexBufferPool> {
    ComplexBufferPool::new(8)
}
