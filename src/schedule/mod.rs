// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Schedule element tree and the three-pass layout protocol.
//!
//! A schedule is a tree of [`Element`]s. Turning it into waveforms takes
//! three passes:
//!
//! 1. [`measure`]: bottom-up, each element reports the duration it needs
//!    given an upper bound.
//! 2. [`arrange`]: top-down, each element receives its final span and places
//!    its children inside it.
//! 3. [`render`]: depth-first, leaves write carrier mutations and pulses
//!    into a [`CarrierSink`] at their absolute times.
//!
//! Every element carries the shared layout properties in [`ElementCommon`]:
//! margins, alignment within the slot its parent allots, explicit/min/max
//! duration and visibility.
//!
//! Element kinds form a closed set ([`ElementVariant`]); each implements the
//! passes through the crate-private `Layout` trait.

mod absolute;
mod grid;
mod overlay;
mod play;
mod repeat;
mod simple;
mod stack;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::carrier::CarrierSink;
use crate::channel::ChannelId;
use crate::config::ScheduleOptions;
use crate::error::{LayoutError, Result, ValidationError};

pub use absolute::{Absolute, AbsoluteEntry};
pub use grid::{Grid, GridEntry, GridLength};
pub use overlay::Schedule;
pub use play::Play;
pub use repeat::Repeat;
pub use simple::{Barrier, SetFrequency, SetPhase, ShiftFrequency, ShiftPhase, SwapPhase};
pub use stack::{ArrangeOption, StackSchedule};

/// Shared handle to an element.
pub type ElementRef = Arc<Element>;

/// How an element positions itself inside a slot larger than it needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Flush with the end of the slot.
    #[default]
    End,
    /// Flush with the start of the slot.
    Start,
    /// Centered in the slot.
    Center,
    /// Fill the whole slot.
    Stretch,
}

/// A node of the schedule tree.
#[derive(Debug, Clone)]
pub struct Element {
    common: ElementCommon,
    variant: ElementVariant,
}

impl Element {
    pub fn new(common: ElementCommon, variant: impl Into<ElementVariant>) -> Self {
        Self {
            common,
            variant: variant.into(),
        }
    }

    /// Wrap a variant with default layout properties.
    pub fn from_variant(variant: impl Into<ElementVariant>) -> Self {
        Self::new(ElementCommon::default(), variant)
    }

    pub fn common(&self) -> &ElementCommon {
        &self.common
    }

    pub fn variant(&self) -> &ElementVariant {
        &self.variant
    }

    /// Channels this element and its descendants touch.
    pub fn channels(&self) -> &[ChannelId] {
        self.variant.channels()
    }

    /// Direct children.
    pub fn children(&self) -> Vec<&ElementRef> {
        self.variant.children()
    }

    /// Name of the element kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        self.variant.kind()
    }
}

/// Layout properties shared by every element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCommon {
    margin: (f64, f64),
    alignment: Alignment,
    visible: bool,
    duration: Option<f64>,
    min_duration: f64,
    max_duration: f64,
}

impl Default for ElementCommon {
    fn default() -> Self {
        Self {
            margin: (0.0, 0.0),
            alignment: Alignment::End,
            visible: true,
            duration: None,
            min_duration: 0.0,
            max_duration: f64::INFINITY,
        }
    }
}

impl ElementCommon {
    /// Start a validated builder.
    pub fn builder() -> ElementCommonBuilder {
        ElementCommonBuilder::default()
    }

    /// Padding before and after the element (s).
    pub fn margin(&self) -> (f64, f64) {
        self.margin
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Invisible elements take part in layout but emit nothing.
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn min_duration(&self) -> f64 {
        self.min_duration
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    fn total_margin(&self) -> f64 {
        self.margin.0 + self.margin.1
    }

    /// Effective `(min, max)` bounds of the inner duration.
    ///
    /// An explicit duration pins both bounds, itself clamped to the
    /// configured min/max.
    fn bounds(&self) -> (f64, f64) {
        let clamp = |v: f64| clamp_duration(v, self.min_duration, self.max_duration);
        match self.duration {
            Some(d) => (clamp(d), clamp(d)),
            None => (self.min_duration, clamp(f64::INFINITY)),
        }
    }
}

/// Builder for [`ElementCommon`] that validates on [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct ElementCommonBuilder(ElementCommon);

impl ElementCommonBuilder {
    pub fn margin(mut self, pre: f64, post: f64) -> Self {
        self.0.margin = (pre, post);
        self
    }

    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.0.alignment = alignment;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.0.visible = visible;
        self
    }

    pub fn duration(mut self, duration: Option<f64>) -> Self {
        self.0.duration = duration;
        self
    }

    pub fn min_duration(mut self, min_duration: f64) -> Self {
        self.0.min_duration = min_duration;
        self
    }

    pub fn max_duration(mut self, max_duration: f64) -> Self {
        self.0.max_duration = max_duration;
        self
    }

    /// Check that margins and durations are usable.
    pub fn validate(&self) -> Result<()> {
        let c = &self.0;
        if !c.margin.0.is_finite() || !c.margin.1.is_finite() {
            return Err(field_error(
                "margin",
                format!("must be finite, got {:?}", c.margin),
            ));
        }
        if let Some(d) = c.duration {
            if !d.is_finite() || d < 0.0 {
                return Err(field_error(
                    "duration",
                    format!("must be finite and non-negative, got {}", d),
                ));
            }
        }
        if !c.min_duration.is_finite() || c.min_duration < 0.0 {
            return Err(field_error(
                "min_duration",
                format!("must be finite and non-negative, got {}", c.min_duration),
            ));
        }
        if c.max_duration.is_nan() || c.max_duration < 0.0 {
            return Err(field_error(
                "max_duration",
                format!("must be non-negative, got {}", c.max_duration),
            ));
        }
        if c.min_duration > c.max_duration {
            return Err(field_error(
                "min_duration",
                format!(
                    "{} exceeds max_duration {}",
                    c.min_duration, c.max_duration
                ),
            ));
        }
        Ok(())
    }

    pub fn build(self) -> Result<ElementCommon> {
        self.validate()?;
        Ok(self.0)
    }
}

/// Result of the measure pass for one element.
#[derive(Debug, Clone)]
pub struct MeasuredElement {
    element: ElementRef,
    /// Content duration plus margins, before min/max clamping.
    unclipped_duration: f64,
    /// Clamped duration plus margins; what the parent lays out.
    duration: f64,
    children: Vec<MeasuredElement>,
}

impl MeasuredElement {
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    /// Duration the element occupies in its parent, margins included.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Duration the content needs, ignoring min/max limits.
    pub fn unclipped_duration(&self) -> f64 {
        self.unclipped_duration
    }

    /// Measured children, in element order.
    pub fn children(&self) -> &[MeasuredElement] {
        &self.children
    }
}

/// Result of the arrange pass for one element.
#[derive(Debug, Clone)]
pub struct ArrangedElement {
    element: ElementRef,
    /// Start of the content, relative to the parent's content start.
    inner_time: f64,
    /// Duration of the content, margins excluded.
    inner_duration: f64,
    children: Vec<ArrangedElement>,
}

impl ArrangedElement {
    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    pub fn inner_time(&self) -> f64 {
        self.inner_time
    }

    pub fn inner_duration(&self) -> f64 {
        self.inner_duration
    }

    pub fn children(&self) -> &[ArrangedElement] {
        &self.children
    }
}

/// Natural content duration and measured children of one element.
struct Measurement {
    natural: f64,
    children: Vec<MeasuredElement>,
}

impl Measurement {
    fn leaf(natural: f64) -> Self {
        Self {
            natural,
            children: Vec::new(),
        }
    }
}

/// Final content duration and arranged children of one element.
struct Arrangement {
    duration: f64,
    children: Vec<ArrangedElement>,
}

impl Arrangement {
    fn leaf(duration: f64) -> Self {
        Self {
            duration,
            children: Vec::new(),
        }
    }
}

struct ArrangeContext<'a> {
    /// Content duration allotted to the element.
    final_duration: f64,
    options: &'a ScheduleOptions,
    measured: &'a MeasuredElement,
}

struct RenderContext<'a> {
    /// Absolute start of the element's content.
    time: f64,
    /// Arranged content duration.
    duration: f64,
    arranged: &'a ArrangedElement,
}

/// Per-kind implementation of the three passes.
trait Layout {
    /// Natural content duration given an upper bound.
    fn measure(&self, max_duration: f64, options: &ScheduleOptions) -> Result<Measurement>;

    /// Place children inside `context.final_duration`.
    fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
        Ok(Arrangement::leaf(context.final_duration))
    }

    /// Emit this element's instructions.
    fn render(&self, context: &RenderContext<'_>, sink: &mut dyn CarrierSink) -> Result<()> {
        for child in context.arranged.children() {
            render(child, context.time, sink)?;
        }
        Ok(())
    }

    fn channels(&self) -> &[ChannelId];

    fn children(&self) -> Vec<&ElementRef> {
        Vec::new()
    }
}

macro_rules! element_variants {
    ($($variant:ident),* $(,)?) => {
        /// The closed set of element kinds.
        #[derive(Debug, Clone)]
        pub enum ElementVariant {
            $($variant($variant),)*
        }

        $(
        impl From<$variant> for ElementVariant {
            fn from(v: $variant) -> Self {
                Self::$variant(v)
            }
        }
        )*

        impl ElementVariant {
            /// Name of the variant.
            pub fn kind(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($variant),)*
                }
            }
        }

        impl Layout for ElementVariant {
            fn measure(&self, max_duration: f64, options: &ScheduleOptions) -> Result<Measurement> {
                match self {
                    $(Self::$variant(v) => v.measure(max_duration, options),)*
                }
            }

            fn arrange(&self, context: &ArrangeContext<'_>) -> Result<Arrangement> {
                match self {
                    $(Self::$variant(v) => v.arrange(context),)*
                }
            }

            fn render(&self, context: &RenderContext<'_>, sink: &mut dyn CarrierSink) -> Result<()> {
                match self {
                    $(Self::$variant(v) => v.render(context, sink),)*
                }
            }

            fn channels(&self) -> &[ChannelId] {
                match self {
                    $(Self::$variant(v) => v.channels(),)*
                }
            }

            fn children(&self) -> Vec<&ElementRef> {
                match self {
                    $(Self::$variant(v) => v.children(),)*
                }
            }
        }
    };
}

element_variants!(
    Play,
    SetPhase,
    ShiftPhase,
    SetFrequency,
    ShiftFrequency,
    SwapPhase,
    Barrier,
    Schedule,
    StackSchedule,
    Grid,
    Absolute,
    Repeat,
);

/// Measure `element` under the upper bound `max_duration` (margins included).
///
/// # Errors
///
/// [`LayoutError::Overflow`] if the element needs more than `max_duration`
/// (beyond `time_tolerance`) and oversizing is disallowed.
pub fn measure(
    element: ElementRef,
    max_duration: f64,
    options: &ScheduleOptions,
) -> Result<MeasuredElement> {
    let common = &element.common;
    let total_margin = common.total_margin();
    let (min_duration, max_inner) = common.bounds();
    let bound = (max_duration - total_margin).min(max_inner).max(0.0);

    let Measurement { natural, children } = element.variant.measure(bound, options)?;
    let unclipped_duration = (natural + total_margin).max(0.0);
    let duration = (clamp_duration(natural, min_duration, max_inner) + total_margin).max(0.0);

    if duration > max_duration + options.time_tolerance {
        check_oversize(element.kind(), max_duration, duration, options)?;
    }

    Ok(MeasuredElement {
        element,
        unclipped_duration,
        duration,
        children,
    })
}

/// Arrange a measured element in the span `[time, time + duration)`,
/// relative to its parent's content start.
///
/// # Errors
///
/// [`LayoutError::Overflow`] if the span, or the element's own explicit or
/// maximum duration, is shorter than its content and oversizing is
/// disallowed.
pub fn arrange(
    measured: &MeasuredElement,
    time: f64,
    duration: f64,
    options: &ScheduleOptions,
) -> Result<ArrangedElement> {
    let element = &measured.element;
    let common = &element.common;
    let tolerance = options.time_tolerance;

    if duration < measured.duration - tolerance {
        check_oversize(element.kind(), duration, measured.duration, options)?;
    }

    let total_margin = common.total_margin();
    let (min_duration, max_inner) = common.bounds();
    let inner_duration = clamp_duration((duration - total_margin).max(0.0), min_duration, max_inner);
    let required = measured.unclipped_duration;
    if inner_duration + total_margin < required - tolerance {
        check_oversize(element.kind(), inner_duration + total_margin, required, options)?;
    }

    let Arrangement {
        duration: inner_duration,
        children,
    } = element.variant.arrange(&ArrangeContext {
        final_duration: inner_duration,
        options,
        measured,
    })?;

    Ok(ArrangedElement {
        element: Arc::clone(element),
        inner_time: time + common.margin.0,
        inner_duration,
        children,
    })
}

/// Render an arranged element whose parent content starts at `time`.
///
/// Invisible elements and their descendants emit nothing.
pub fn render(arranged: &ArrangedElement, time: f64, sink: &mut dyn CarrierSink) -> Result<()> {
    let element = &arranged.element;
    if !element.common.visible {
        return Ok(());
    }
    element.variant.render(
        &RenderContext {
            time: time + arranged.inner_time,
            duration: arranged.inner_duration,
            arranged,
        },
        sink,
    )
}

/// Arrange `child` inside the slot `[time, time + span)` according to its
/// alignment.
fn place(
    child: &MeasuredElement,
    time: f64,
    span: f64,
    options: &ScheduleOptions,
) -> Result<ArrangedElement> {
    let needed = child.duration;
    if span < needed - options.time_tolerance {
        check_oversize(child.element.kind(), span, needed, options)?;
    }
    let surplus = (span - needed).max(0.0);
    match child.element.common.alignment {
        Alignment::Start => arrange(child, time, needed, options),
        Alignment::End => arrange(child, time + surplus, needed, options),
        Alignment::Center => arrange(child, time + surplus / 2.0, needed, options),
        Alignment::Stretch => arrange(child, time, span.max(needed), options),
    }
}

/// Fail with an overflow, or warn and continue when oversizing is allowed.
fn check_oversize(
    element: &str,
    available: f64,
    required: f64,
    options: &ScheduleOptions,
) -> Result<()> {
    if options.allow_oversize {
        warn!(element, available, required, "Element overhangs its slot");
        return Ok(());
    }
    Err(LayoutError::Overflow {
        element: element.into(),
        available,
        required,
    }
    .into())
}

/// Union of channel lists, deduplicated in first-appearance order.
fn merge_channels<'a, I>(lists: I) -> Vec<ChannelId>
where
    I: IntoIterator<Item = &'a [ChannelId]>,
{
    let mut merged: Vec<ChannelId> = Vec::new();
    for id in lists.into_iter().flatten() {
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }
    merged
}

fn clamp_duration(duration: f64, min_duration: f64, max_duration: f64) -> f64 {
    duration.min(max_duration).max(min_duration)
}

fn field_error(field: &str, message: impl Into<String>) -> crate::Error {
    ValidationError::Field {
        field: field.into(),
        message: message.into(),
    }
    .into()
}

/// Require `value` to be finite.
fn ensure_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(field_error(field, format!("must be finite, got {}", value)))
    }
}

/// Require `value` to be finite and non-negative.
fn ensure_non_negative(field: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(field_error(
            field,
            format!("must be finite and non-negative, got {}", value),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::{Instruction, InstructionQueue};
    use crate::error::Error;
    use approx::assert_relative_eq;

    fn opts() -> ScheduleOptions {
        ScheduleOptions::default()
    }

    fn spacer(duration: f64, alignment: Alignment) -> ElementRef {
        let common = ElementCommon::builder()
            .duration(Some(duration))
            .alignment(alignment)
            .build()
            .unwrap();
        Arc::new(Element::new(common, Barrier::new(vec![])))
    }

    fn set_phase(channel: &str, phase: f64) -> ElementRef {
        Arc::new(Element::from_variant(SetPhase::new(channel.into(), phase)))
    }

    // =========================================================================
    // ElementCommonBuilder
    // =========================================================================

    #[test]
    fn test_builder_defaults() {
        let common = ElementCommon::builder().build().unwrap();
        assert_eq!(common, ElementCommon::default());
        assert_eq!(common.alignment(), Alignment::End);
        assert!(common.visible());
        assert_eq!(common.max_duration(), f64::INFINITY);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(ElementCommon::builder().margin(f64::NAN, 0.0).build().is_err());
        assert!(ElementCommon::builder().duration(Some(-1.0)).build().is_err());
        assert!(ElementCommon::builder().min_duration(f64::INFINITY).build().is_err());
        assert!(ElementCommon::builder().max_duration(-1.0).build().is_err());
        let err = ElementCommon::builder()
            .min_duration(5.0)
            .max_duration(2.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("min_duration"));
    }

    #[test]
    fn test_bounds_with_explicit_duration() {
        let common = ElementCommon::builder()
            .duration(Some(10.0))
            .max_duration(4.0)
            .build()
            .unwrap();
        assert_eq!(common.bounds(), (4.0, 4.0));
    }

    // =========================================================================
    // Measure
    // =========================================================================

    #[test]
    fn test_measure_instant_is_zero() {
        let m = measure(set_phase("xy0", 1.0), f64::INFINITY, &opts()).unwrap();
        assert_eq!(m.duration(), 0.0);
    }

    #[test]
    fn test_measure_includes_margin_and_min_duration() {
        let common = ElementCommon::builder()
            .margin(1.0, 2.0)
            .min_duration(5.0)
            .build()
            .unwrap();
        let el = Arc::new(Element::new(common, Barrier::new(vec![])));
        let m = measure(el, f64::INFINITY, &opts()).unwrap();
        assert_eq!(m.duration(), 8.0);
        assert_eq!(m.unclipped_duration(), 3.0);
    }

    #[test]
    fn test_measure_overflow() {
        let err = measure(spacer(5.0, Alignment::End), 4.0, &opts()).unwrap_err();
        match err {
            Error::Layout(LayoutError::Overflow {
                element,
                available,
                required,
            }) => {
                assert_eq!(element, "Barrier");
                assert_eq!(available, 4.0);
                assert_eq!(required, 5.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_measure_within_tolerance_is_not_overflow() {
        let m = measure(spacer(5.0 + 1e-13, Alignment::End), 5.0, &opts()).unwrap();
        assert_relative_eq!(m.duration(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_measure_oversize_allowed() {
        let options = ScheduleOptions {
            allow_oversize: true,
            ..opts()
        };
        let m = measure(spacer(5.0, Alignment::End), 4.0, &options).unwrap();
        assert_eq!(m.duration(), 5.0);
    }

    // =========================================================================
    // Arrange
    // =========================================================================

    #[test]
    fn test_arrange_applies_margin() {
        let common = ElementCommon::builder()
            .margin(1.0, 2.0)
            .duration(Some(3.0))
            .build()
            .unwrap();
        let el = Arc::new(Element::new(common, Barrier::new(vec![])));
        let m = measure(el, f64::INFINITY, &opts()).unwrap();
        let a = arrange(&m, 10.0, 6.0, &opts()).unwrap();
        assert_eq!(a.inner_time(), 11.0);
        assert_eq!(a.inner_duration(), 3.0);
    }

    #[test]
    fn test_arrange_short_span_overflows() {
        let m = measure(spacer(5.0, Alignment::End), f64::INFINITY, &opts()).unwrap();
        let err = arrange(&m, 0.0, 3.0, &opts()).unwrap_err();
        assert!(matches!(err, Error::Layout(LayoutError::Overflow { .. })));
    }

    #[test]
    fn test_explicit_duration_shorter_than_content_overflows() {
        let common = ElementCommon::builder().duration(Some(2.0)).build().unwrap();
        let inner = vec![spacer(5.0, Alignment::End)];
        let el = Arc::new(Element::new(common, Schedule::new(inner)));
        // The child is measured against the 2 s explicit duration
        let err = measure(Arc::clone(&el), f64::INFINITY, &opts()).unwrap_err();
        assert!(matches!(err, Error::Layout(LayoutError::Overflow { .. })));

        // With oversizing allowed the content is clipped and arrange warns
        let options = ScheduleOptions {
            allow_oversize: true,
            ..opts()
        };
        let m = measure(el, f64::INFINITY, &options).unwrap();
        assert_eq!(m.duration(), 2.0);
        assert_eq!(m.unclipped_duration(), 5.0);
        let a = arrange(&m, 0.0, 2.0, &options).unwrap();
        assert_eq!(a.inner_duration(), 2.0);
    }

    #[test]
    fn test_place_alignments() {
        let options = opts();
        for (alignment, time) in [
            (Alignment::Start, 0.0),
            (Alignment::End, 8.0),
            (Alignment::Center, 4.0),
            (Alignment::Stretch, 0.0),
        ] {
            let m = measure(spacer(2.0, alignment), f64::INFINITY, &options).unwrap();
            let a = place(&m, 0.0, 10.0, &options).unwrap();
            assert_eq!(a.inner_time(), time, "{alignment:?}");
            // The explicit duration stays pinned even when stretched
            assert_eq!(a.inner_duration(), 2.0, "{alignment:?}");
        }
    }

    #[test]
    fn test_place_stretch_fills_unpinned_element() {
        let common = ElementCommon::builder()
            .alignment(Alignment::Stretch)
            .build()
            .unwrap();
        let el = Arc::new(Element::new(common, Barrier::new(vec![])));
        let m = measure(el, f64::INFINITY, &opts()).unwrap();
        let a = place(&m, 1.0, 10.0, &opts()).unwrap();
        assert_eq!(a.inner_time(), 1.0);
        assert_eq!(a.inner_duration(), 10.0);
    }

    // =========================================================================
    // Render
    // =========================================================================

    #[test]
    fn test_invisible_elements_are_not_rendered() {
        let common = ElementCommon::builder().visible(false).build().unwrap();
        let hidden = Arc::new(Element::new(common, SetPhase::new("xy0".into(), 1.0)));
        let root = Arc::new(Element::from_variant(Schedule::new(vec![
            hidden,
            set_phase("xy0", 2.0),
        ])));
        let m = measure(root, f64::INFINITY, &opts()).unwrap();
        let a = arrange(&m, 0.0, m.duration(), &opts()).unwrap();
        let mut queue = InstructionQueue::new();
        render(&a, 0.0, &mut queue).unwrap();
        let items: Vec<_> = queue.iter().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].instruction, Instruction::SetPhase(2.0));
    }

    #[test]
    fn test_merge_channels_dedups_in_order() {
        let a = [ChannelId::new("b"), ChannelId::new("a")];
        let b = [ChannelId::new("a"), ChannelId::new("c")];
        let merged = merge_channels([&a[..], &b[..]]);
        assert_eq!(
            merged,
            vec![ChannelId::new("b"), ChannelId::new("a"), ChannelId::new("c")]
        );
    }

    #[test]
    fn test_element_kind_names() {
        assert_eq!(set_phase("xy0", 0.0).kind(), "SetPhase");
        assert_eq!(spacer(1.0, Alignment::End).kind(), "Barrier");
    }
}
