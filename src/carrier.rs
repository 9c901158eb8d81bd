// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Phase-continuous carrier tracking and waveform synthesis.
//!
//! Every channel carries a reference triple `(φ₀, f, t₀)`. The carrier phase
//! at time `t` is
//!
//! ```text
//! phase(t) = φ₀ + 2π·f·(t − t₀)
//! ```
//!
//! Frequency changes re-anchor the triple at the change time so the phase is
//! continuous there; only [`CarrierSink::set_phase`] and
//! [`CarrierSink::swap_phase`] introduce a jump. Pulses are mixed with the
//! carrier and accumulated into the channel's pooled I/Q buffer, and into
//! the buffers of any channel they leak into through a [`Crosstalk`] matrix.
//!
//! Schedule elements write into a [`CarrierSink`]. The render pass collects
//! instructions into an [`InstructionQueue`], orders them by time, then
//! replays them into a [`PhaseTrackingTransform`].
//!
//! # References
//!
//! - Motzoi et al. (2009), PRL 103, 110501: DRAG correction.
//! - McKay et al. (2017), PRA 96, 022330: virtual Z gates as carrier
//!   phase updates.

use std::collections::{HashMap, VecDeque};
use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use num_complex::Complex64;
use tracing::{debug, trace};

use crate::buffer::{ComplexBufferPool, PooledComplexArray};
use crate::channel::{ChannelId, ChannelInfo, Crosstalk};
use crate::config::ScheduleOptions;
use crate::error::{RenderError, Result, ValidationError};
use crate::filter;
use crate::shape::{Shape, ShapeInfo};

/// Envelopes kept per render pass before the oldest is evicted.
pub const ENVELOPE_CACHE_CAPACITY: usize = 1024;

/// Receiver of carrier mutations and pulses during the render pass.
///
/// Calls for one channel must arrive in non-decreasing time order.
pub trait CarrierSink {
    /// Jump the carrier phase to `phase` (radians) at `time`.
    fn set_phase(&mut self, channel: &ChannelId, phase: f64, time: f64) -> Result<()>;

    /// Advance the carrier phase by `delta` (radians) at `time`.
    fn shift_phase(&mut self, channel: &ChannelId, delta: f64, time: f64) -> Result<()>;

    /// Change the carrier frequency (Hz) at `time`, keeping the phase continuous.
    fn set_frequency(&mut self, channel: &ChannelId, frequency: f64, time: f64) -> Result<()>;

    /// Offset the carrier frequency by `delta` (Hz) at `time`.
    fn shift_frequency(&mut self, channel: &ChannelId, delta: f64, time: f64) -> Result<()>;

    /// Exchange the carrier phases of two channels at `time`.
    ///
    /// Frequencies stay with their channels.
    fn swap_phase(&mut self, first: &ChannelId, second: &ChannelId, time: f64) -> Result<()>;

    /// Mix `pulse` starting at `time` into the channel output.
    fn play(&mut self, channel: &ChannelId, pulse: &PulseInstruction, time: f64) -> Result<()>;
}

/// A pulse ready to be mixed with a carrier.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseInstruction {
    /// Envelope shape. `None` is a rectangular pulse.
    pub shape: Option<Arc<ShapeInfo>>,
    /// Time over which the shape is sampled (s).
    pub width: f64,
    /// Flat top inserted at the middle of the shape (s).
    pub plateau: f64,
    /// Peak amplitude.
    pub amplitude: f64,
    /// DRAG coefficient (s).
    pub drag_coef: f64,
    /// Detuning from the channel carrier (Hz).
    pub frequency: f64,
    /// Phase offset (radians).
    pub phase: f64,
}

impl PulseInstruction {
    /// A pulse with no plateau, DRAG, detuning or phase offset.
    pub fn new(shape: Option<Arc<ShapeInfo>>, width: f64, amplitude: f64) -> Self {
        Self {
            shape,
            width,
            plateau: 0.0,
            amplitude,
            drag_coef: 0.0,
            frequency: 0.0,
            phase: 0.0,
        }
    }

    /// Total pulse duration.
    pub fn duration(&self) -> f64 {
        self.width + self.plateau
    }

    /// Envelope value `rel` seconds after the pulse start.
    fn envelope_at(&self, shape: &Shape, rel: f64) -> f64 {
        if self.width <= 0.0 {
            return 1.0;
        }
        let half = self.width / 2.0;
        if rel < half {
            shape.sample_at(rel / self.width - 0.5).re
        } else if rel < half + self.plateau {
            1.0
        } else {
            shape.sample_at((rel - self.plateau) / self.width - 0.5).re
        }
    }
}

/// A single carrier operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    SetPhase(f64),
    ShiftPhase(f64),
    SetFrequency(f64),
    ShiftFrequency(f64),
    /// Swap phases with the named channel.
    SwapPhase(ChannelId),
    Play(PulseInstruction),
}

/// An instruction bound to a channel and an absolute time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedInstruction {
    pub time: f64,
    pub channel: ChannelId,
    pub instruction: Instruction,
}

impl TimedInstruction {
    /// Forward this instruction to `sink`.
    pub fn apply(&self, sink: &mut dyn CarrierSink) -> Result<()> {
        let (ch, t) = (&self.channel, self.time);
        match &self.instruction {
            Instruction::SetPhase(v) => sink.set_phase(ch, *v, t),
            Instruction::ShiftPhase(v) => sink.shift_phase(ch, *v, t),
            Instruction::SetFrequency(v) => sink.set_frequency(ch, *v, t),
            Instruction::ShiftFrequency(v) => sink.shift_frequency(ch, *v, t),
            Instruction::SwapPhase(other) => sink.swap_phase(ch, other, t),
            Instruction::Play(p) => sink.play(ch, p, t),
        }
    }
}

/// A sink that records instructions in emission order.
#[derive(Debug, Default)]
pub struct InstructionQueue {
    items: Vec<TimedInstruction>,
}

impl InstructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recorded instructions in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &TimedInstruction> {
        self.items.iter()
    }

    fn push(&mut self, channel: &ChannelId, time: f64, instruction: Instruction) -> Result<()> {
        self.items.push(TimedInstruction {
            time,
            channel: channel.clone(),
            instruction,
        });
        Ok(())
    }

    /// Order instructions by time.
    ///
    /// Instructions whose times lie within `time_tolerance` of the first
    /// instruction of their cluster keep emission order, so float round-off
    /// never reorders non-commuting operations.
    pub fn into_sorted(self, time_tolerance: f64) -> Vec<TimedInstruction> {
        let mut items: Vec<(usize, TimedInstruction)> =
            self.items.into_iter().enumerate().collect();
        items.sort_by(|a, b| a.1.time.total_cmp(&b.1.time));

        let mut start = 0;
        while start < items.len() {
            let anchor = items[start].1.time;
            let mut end = start + 1;
            while end < items.len() && items[end].1.time - anchor <= time_tolerance {
                end += 1;
            }
            items[start..end].sort_by_key(|(seq, _)| *seq);
            start = end;
        }

        items.into_iter().map(|(_, item)| item).collect()
    }

    /// Replay the queue into `sink` in time order.
    pub fn replay(self, sink: &mut dyn CarrierSink, time_tolerance: f64) -> Result<()> {
        for item in self.into_sorted(time_tolerance) {
            trace!(
                channel = %item.channel,
                time = item.time,
                instruction = ?item.instruction,
                "Applying instruction"
            );
            item.apply(sink)?;
        }
        Ok(())
    }
}

impl CarrierSink for InstructionQueue {
    fn set_phase(&mut self, channel: &ChannelId, phase: f64, time: f64) -> Result<()> {
        self.push(channel, time, Instruction::SetPhase(phase))
    }

    fn shift_phase(&mut self, channel: &ChannelId, delta: f64, time: f64) -> Result<()> {
        self.push(channel, time, Instruction::ShiftPhase(delta))
    }

    fn set_frequency(&mut self, channel: &ChannelId, frequency: f64, time: f64) -> Result<()> {
        self.push(channel, time, Instruction::SetFrequency(frequency))
    }

    fn shift_frequency(&mut self, channel: &ChannelId, delta: f64, time: f64) -> Result<()> {
        self.push(channel, time, Instruction::ShiftFrequency(delta))
    }

    fn swap_phase(&mut self, first: &ChannelId, second: &ChannelId, time: f64) -> Result<()> {
        self.push(first, time, Instruction::SwapPhase(second.clone()))
    }

    fn play(&mut self, channel: &ChannelId, pulse: &PulseInstruction, time: f64) -> Result<()> {
        self.push(channel, time, Instruction::Play(pulse.clone()))
    }
}

/// Reference triple of one channel carrier.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Carrier {
    /// Reference phase φ₀ (radians).
    phase: f64,
    /// Carrier frequency f (Hz).
    frequency: f64,
    /// Reference time t₀ (s).
    ref_time: f64,
}

impl Carrier {
    fn phase_at(&self, time: f64) -> f64 {
        self.phase + TAU * self.frequency * (time - self.ref_time)
    }

    fn rebase(&mut self, phase: f64, frequency: f64, time: f64) {
        self.phase = phase;
        self.frequency = frequency;
        self.ref_time = time;
    }
}

#[derive(Debug)]
struct ChannelState {
    info: ChannelInfo,
    carrier: Carrier,
    /// Time of the latest operation on this channel.
    last_time: f64,
    waveform: PooledComplexArray,
}

/// Shape identity by allocation, so the key keeps the shape alive.
#[derive(Debug, Clone)]
struct ShapeKey(Arc<ShapeInfo>);

impl PartialEq for ShapeKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ShapeKey {}

impl Hash for ShapeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

/// Everything a sampled envelope depends on. Floats are keyed by bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EnvelopeKey {
    shape: ShapeKey,
    width: u64,
    plateau: u64,
    /// Offset of the first sample from the pulse start (s).
    offset: u64,
    sample_rate: u64,
    len: usize,
}

/// Bounded first-in first-out store of sampled envelopes.
#[derive(Debug)]
struct EnvelopeCache {
    entries: HashMap<EnvelopeKey, Arc<[f64]>>,
    order: VecDeque<EnvelopeKey>,
    capacity: usize,
    hits: usize,
}

impl EnvelopeCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            hits: 0,
        }
    }

    fn get_or_try_insert<F>(&mut self, key: EnvelopeKey, build: F) -> Result<Arc<[f64]>>
    where
        F: FnOnce() -> Result<Vec<f64>>,
    {
        if let Some(samples) = self.entries.get(&key) {
            self.hits += 1;
            return Ok(Arc::clone(samples));
        }
        let samples: Arc<[f64]> = build()?.into();
        if self.capacity == 0 {
            return Ok(samples);
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, Arc::clone(&samples));
        Ok(samples)
    }
}

/// Per-channel carrier state and output waveforms for one render pass.
#[derive(Debug)]
pub struct PhaseTrackingTransform {
    channels: HashMap<ChannelId, ChannelState>,
    /// Non-zero crosstalk couplings by source channel.
    routes: HashMap<ChannelId, Vec<(ChannelId, f64)>>,
    envelopes: EnvelopeCache,
    options: ScheduleOptions,
}

impl PhaseTrackingTransform {
    /// Set up carriers at their base frequency with zero phase, and acquire a
    /// cleared waveform for each channel sized to `total_duration`.
    pub fn new(
        channels: &[ChannelInfo],
        total_duration: f64,
        options: &ScheduleOptions,
        pool: Arc<ComplexBufferPool>,
    ) -> Self {
        let channels = channels
            .iter()
            .map(|info| {
                let len = info.sample_count(total_duration, options.time_tolerance);
                let state = ChannelState {
                    info: info.clone(),
                    carrier: Carrier {
                        phase: 0.0,
                        frequency: info.base_freq,
                        ref_time: 0.0,
                    },
                    last_time: f64::NEG_INFINITY,
                    waveform: pool.acquire(len, true),
                };
                (info.name.clone(), state)
            })
            .collect();
        Self {
            channels,
            routes: HashMap::new(),
            envelopes: EnvelopeCache::new(ENVELOPE_CACHE_CAPACITY),
            options: options.clone(),
        }
    }

    /// Route pulses through a crosstalk matrix.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownChannel`] if the matrix names a channel this
    /// transform does not render.
    pub fn with_crosstalk(mut self, crosstalk: &Crosstalk) -> Result<Self> {
        crosstalk.validate()?;
        for source in &crosstalk.channels {
            if !self.channels.contains_key(source) {
                return Err(unknown_channel(source, "Crosstalk"));
            }
            let couplings = crosstalk.couplings(source).unwrap_or_default();
            self.routes.insert(source.clone(), couplings);
        }
        debug!(channels = crosstalk.channels.len(), "Crosstalk routing enabled");
        Ok(self)
    }

    fn state(&self, channel: &ChannelId) -> Result<&ChannelState> {
        self.channels
            .get(channel)
            .ok_or_else(|| unknown_channel(channel, "Instruction"))
    }

    /// Look up a channel and record an operation at `time`.
    fn advance(&mut self, channel: &ChannelId, time: f64) -> Result<&mut ChannelState> {
        let tolerance = self.options.time_tolerance;
        let state = self
            .channels
            .get_mut(channel)
            .ok_or_else(|| unknown_channel(channel, "Instruction"))?;
        if time < state.last_time - tolerance {
            return Err(RenderError::OutOfOrderMutation {
                channel: channel.to_string(),
                time,
                last_time: state.last_time,
            }
            .into());
        }
        state.last_time = state.last_time.max(time);
        Ok(state)
    }

    /// Carrier phase of `channel` at `time` (radians).
    pub fn phase_at(&self, channel: &ChannelId, time: f64) -> Result<f64> {
        Ok(self.state(channel)?.carrier.phase_at(time))
    }

    /// Current carrier frequency of `channel` (Hz).
    pub fn frequency(&self, channel: &ChannelId) -> Result<f64> {
        Ok(self.state(channel)?.carrier.frequency)
    }

    /// Waveform rendered so far on `channel`.
    pub fn waveform(&self, channel: &ChannelId) -> Result<&PooledComplexArray> {
        Ok(&self.state(channel)?.waveform)
    }

    /// Number of cached envelopes and the number of lookups they served.
    pub fn envelope_cache_stats(&self) -> (usize, usize) {
        (self.envelopes.entries.len(), self.envelopes.hits)
    }

    /// Finish the pass and hand over the waveforms.
    ///
    /// Each channel's I and Q samples go through its IIR chain, then its FIR
    /// taps, then its mixer correction.
    pub fn into_waveforms(self) -> Result<HashMap<ChannelId, PooledComplexArray>> {
        let mut out = HashMap::with_capacity(self.channels.len());
        for (name, mut state) in self.channels {
            let info = &state.info;
            let mut view = state.waveform.view_mut()?;
            if !info.iir.is_empty() || !info.fir.is_empty() {
                let (i, q) = view.parts();
                for samples in [i, q] {
                    filter::apply_iir(samples, &info.iir);
                    filter::apply_fir(samples, &info.fir);
                }
            }
            if let Some(calibration) = &info.iq_calibration {
                calibration.apply(view);
            }
            out.insert(name, state.waveform);
        }
        Ok(out)
    }
}

impl CarrierSink for PhaseTrackingTransform {
    fn set_phase(&mut self, channel: &ChannelId, phase: f64, time: f64) -> Result<()> {
        let carrier = &mut self.advance(channel, time)?.carrier;
        let frequency = carrier.frequency;
        carrier.rebase(phase, frequency, time);
        Ok(())
    }

    fn shift_phase(&mut self, channel: &ChannelId, delta: f64, time: f64) -> Result<()> {
        let carrier = &mut self.advance(channel, time)?.carrier;
        let (phase, frequency) = (carrier.phase_at(time) + delta, carrier.frequency);
        carrier.rebase(phase, frequency, time);
        Ok(())
    }

    fn set_frequency(&mut self, channel: &ChannelId, frequency: f64, time: f64) -> Result<()> {
        let carrier = &mut self.advance(channel, time)?.carrier;
        let phase = carrier.phase_at(time);
        carrier.rebase(phase, frequency, time);
        Ok(())
    }

    fn shift_frequency(&mut self, channel: &ChannelId, delta: f64, time: f64) -> Result<()> {
        let frequency = self.state(channel)?.carrier.frequency + delta;
        self.set_frequency(channel, frequency, time)
    }

    fn swap_phase(&mut self, first: &ChannelId, second: &ChannelId, time: f64) -> Result<()> {
        let first_phase = self.advance(first, time)?.carrier.phase_at(time);
        let carrier = &mut self.advance(second, time)?.carrier;
        let second_phase = carrier.phase_at(time);
        let frequency = carrier.frequency;
        carrier.rebase(first_phase, frequency, time);

        let carrier = &mut self.advance(first, time)?.carrier;
        let frequency = carrier.frequency;
        carrier.rebase(second_phase, frequency, time);
        Ok(())
    }

    fn play(&mut self, channel: &ChannelId, pulse: &PulseInstruction, time: f64) -> Result<()> {
        let carrier = self.advance(channel, time)?.carrier;
        if pulse.amplitude.abs() <= self.options.amp_tolerance {
            trace!(channel = %channel, time, "Dropping negligible pulse");
            return Ok(());
        }
        let Self {
            channels,
            routes,
            envelopes,
            options,
        } = self;
        let mix = MixContext {
            carrier,
            pulse,
            time,
            options: &*options,
        };
        match routes.get(channel) {
            Some(couplings) => {
                for (target, coefficient) in couplings {
                    let state = channels
                        .get_mut(target)
                        .ok_or_else(|| unknown_channel(target, "Crosstalk"))?;
                    mix.mix_into(state, *coefficient, envelopes)?;
                }
                Ok(())
            }
            None => {
                let state = channels
                    .get_mut(channel)
                    .ok_or_else(|| unknown_channel(channel, "Instruction"))?;
                mix.mix_into(state, 1.0, envelopes)
            }
        }
    }
}

fn unknown_channel(channel: &ChannelId, element: &str) -> crate::Error {
    ValidationError::UnknownChannel {
        channel: channel.to_string(),
        element: element.into(),
    }
    .into()
}

/// One pulse with the carrier of the channel it was played on.
struct MixContext<'a> {
    carrier: Carrier,
    pulse: &'a PulseInstruction,
    time: f64,
    options: &'a ScheduleOptions,
}

impl MixContext<'_> {
    /// Accumulate `scale` times the pulse into the waveform of `state`.
    ///
    /// Sample `i` sits at schedule time `i / sample_rate − delay` on the
    /// target's grid. The pulse covers the samples whose times fall in
    /// `[time, time + duration)`.
    fn mix_into(
        &self,
        state: &mut ChannelState,
        scale: f64,
        envelopes: &mut EnvelopeCache,
    ) -> Result<()> {
        let pulse = self.pulse;
        let time = self.time;
        let sample_rate = state.info.sample_rate;
        let delay = state.info.delay;
        let tolerance = self.options.time_tolerance;
        let len = state.waveform.len();

        let index_at = |t: f64| ((t + delay - tolerance) * sample_rate).ceil().max(0.0) as usize;
        let i_start = index_at(time);
        let i_full_end = index_at(time + pulse.duration());
        let i_end = i_full_end.min(len);
        if i_start >= i_end {
            return Ok(());
        }
        let n = i_end - i_start;
        let dt = 1.0 / sample_rate;
        let t_first = i_start as f64 * dt - delay;
        let offset = t_first - time;

        let phase0 = self.carrier.phase_at(t_first) + pulse.phase + TAU * pulse.frequency * offset;
        let dphase = TAU * (self.carrier.frequency + pulse.frequency) * dt;
        let step = if (dphase * n as f64).abs() < self.options.phase_tolerance {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::from_polar(1.0, dphase)
        };
        let mut rotor = Complex64::from_polar(pulse.amplitude * scale, phase0);
        let mut out = state.waveform.slice_mut(i_start, n)?;

        let Some(shape) = &pulse.shape else {
            for k in 0..n {
                out.add_at(k, rotor)?;
                rotor *= step;
            }
            return Ok(());
        };

        let key = EnvelopeKey {
            shape: ShapeKey(Arc::clone(shape)),
            width: pulse.width.to_bits(),
            plateau: pulse.plateau.to_bits(),
            offset: offset.to_bits(),
            sample_rate: sample_rate.to_bits(),
            len: i_full_end - i_start,
        };
        let envelope = envelopes.get_or_try_insert(key, || {
            let sampler = shape.sampler()?;
            Ok((0..i_full_end - i_start)
                .map(|k| pulse.envelope_at(sampler, offset + k as f64 * dt))
                .collect())
        })?;

        let drag = Complex64::i() * pulse.drag_coef * sample_rate;
        for k in 0..n {
            let left = if k > 0 { envelope[k - 1] } else { 0.0 };
            let right = envelope.get(k + 1).copied().unwrap_or(0.0);
            let slope = (right - left) / 2.0;
            out.add_at(k, rotor * (Complex64::new(envelope[k], 0.0) + drag * slope))?;
            rotor *= step;
        }
        Ok(())
    }
}
