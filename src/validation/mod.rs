// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for schedule requests.
//!
//! Everything here runs before the render pass so that malformed requests
//! fail without side effects.

use std::collections::HashSet;

use crate::channel::{ChannelInfo, Crosstalk};
use crate::config::ScheduleOptions;
use crate::error::{Result, ValidationError};
use crate::schedule::{Element, ElementVariant};

/// Validate a request's options, channel configuration, crosstalk matrix
/// and element tree.
pub fn validate_request(
    root: &Element,
    channels: &[ChannelInfo],
    crosstalk: Option<&Crosstalk>,
    options: &ScheduleOptions,
) -> Result<()> {
    options.validate()?;
    validate_channels(channels)?;
    if let Some(crosstalk) = crosstalk {
        validate_crosstalk(crosstalk, channels)?;
    }
    validate_tree(root, channels)
}

/// Validate channel configuration.
pub fn validate_channels(channels: &[ChannelInfo]) -> Result<()> {
    let mut seen = HashSet::with_capacity(channels.len());
    for channel in channels {
        channel.validate()?;
        if !seen.insert(&channel.name) {
            return Err(ValidationError::Field {
                field: "channels".into(),
                message: format!("duplicate channel '{}'", channel.name),
            }
            .into());
        }
    }
    Ok(())
}

/// Validate a crosstalk matrix against the configured channels.
pub fn validate_crosstalk(crosstalk: &Crosstalk, channels: &[ChannelInfo]) -> Result<()> {
    crosstalk.validate()?;
    if let Some(missing) = crosstalk
        .channels
        .iter()
        .find(|id| !channels.iter().any(|c| &c.name == *id))
    {
        return Err(ValidationError::UnknownChannel {
            channel: missing.to_string(),
            element: "Crosstalk".into(),
        }
        .into());
    }
    Ok(())
}

/// Validate that every leaf references a configured channel and every pulse
/// shape can be sampled.
pub fn validate_tree(root: &Element, channels: &[ChannelInfo]) -> Result<()> {
    let known: HashSet<&str> = channels.iter().map(|c| c.name.as_str()).collect();
    let mut pending = vec![root];
    while let Some(element) = pending.pop() {
        let children = element.children();
        if children.is_empty() {
            if let Some(missing) = element
                .channels()
                .iter()
                .find(|id| !known.contains(id.as_str()))
            {
                return Err(ValidationError::UnknownChannel {
                    channel: missing.to_string(),
                    element: element.kind().into(),
                }
                .into());
            }
        }
        if let ElementVariant::Play(play) = element.variant() {
            if let Some(shape) = play.shape() {
                shape.sampler()?;
            }
        }
        pending.extend(children.into_iter().rev().map(|c| c.as_ref()));
    }
    Ok(())
}
