// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Channel identifiers and per-channel output configuration.
//!
//! A [`ChannelInfo`] describes one output of the control hardware: its
//! carrier frequency at the start of the schedule, its sample grid, optional
//! predistortion filters, and an optional I/Q mixer correction applied to
//! the finished waveform. A [`Crosstalk`] matrix describes how pulses on one
//! channel leak into others.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::buffer::ComplexViewMut;
use crate::error::{Result, ValidationError};
use crate::filter::Biquad;

/// Name of an output channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Create a channel identifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The channel name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ChannelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for ChannelId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Linear I/Q mixer correction.
///
/// Each output sample becomes `matrix · [i, q] + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqCalibration {
    /// Row-major 2×2 correction matrix.
    pub matrix: [[f64; 2]; 2],
    /// DC offset added after the matrix.
    #[serde(default)]
    pub offset: [f64; 2],
}

impl Default for IqCalibration {
    fn default() -> Self {
        Self {
            matrix: [[1.0, 0.0], [0.0, 1.0]],
            offset: [0.0, 0.0],
        }
    }
}

impl IqCalibration {
    /// Build a correction from amplitude imbalance, quadrature skew
    /// (radians) and DC offsets.
    pub fn from_imbalance(ratio: f64, skew: f64, offset_i: f64, offset_q: f64) -> Self {
        Self {
            matrix: [[1.0, -skew.tan()], [0.0, ratio / skew.cos()]],
            offset: [offset_i, offset_q],
        }
    }

    /// Apply the correction in place.
    pub fn apply(&self, mut view: ComplexViewMut<'_>) {
        let [[a, b], [c, d]] = self.matrix;
        let [oi, oq] = self.offset;
        let (i, q) = view.parts();
        for (x, y) in i.iter_mut().zip(q.iter_mut()) {
            let (xi, yq) = (*x, *y);
            *x = a * xi + b * yq + oi;
            *y = c * xi + d * yq + oq;
        }
    }
}

/// Output configuration for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    /// Channel name, referenced by schedule elements.
    pub name: ChannelId,
    /// Carrier frequency at time zero (Hz).
    #[serde(default)]
    pub base_freq: f64,
    /// Samples per second.
    pub sample_rate: f64,
    /// Output delay (s). Sample `i` lands at schedule time `i / sample_rate - delay`.
    #[serde(default)]
    pub delay: f64,
    /// Fixed waveform length in samples. `None` covers the whole schedule.
    #[serde(default)]
    pub length: Option<usize>,
    /// IIR predistortion sections, applied in order.
    #[serde(default)]
    pub iir: Vec<Biquad>,
    /// FIR predistortion taps, applied after the IIR chain.
    #[serde(default)]
    pub fir: Vec<f64>,
    /// Mixer correction applied after rendering and filtering.
    #[serde(default)]
    pub iq_calibration: Option<IqCalibration>,
}

impl ChannelInfo {
    /// Create a channel with the given carrier and sample rate.
    pub fn new(name: impl Into<ChannelId>, base_freq: f64, sample_rate: f64) -> Self {
        Self {
            name: name.into(),
            base_freq,
            sample_rate,
            delay: 0.0,
            length: None,
            iir: Vec::new(),
            fir: Vec::new(),
            iq_calibration: None,
        }
    }

    /// Set the output delay.
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Fix the waveform length.
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Attach an IIR predistortion chain.
    pub fn with_iir(mut self, chain: Vec<Biquad>) -> Self {
        self.iir = chain;
        self
    }

    /// Attach FIR predistortion taps.
    pub fn with_fir(mut self, taps: Vec<f64>) -> Self {
        self.fir = taps;
        self
    }

    /// Attach a mixer correction.
    pub fn with_iq_calibration(mut self, calibration: IqCalibration) -> Self {
        self.iq_calibration = Some(calibration);
        self
    }

    /// Number of output samples for a schedule of `total_duration` seconds.
    ///
    /// Without a fixed length the waveform spans the delay and the whole
    /// schedule, including the closing instant.
    pub fn sample_count(&self, total_duration: f64, time_tolerance: f64) -> usize {
        match self.length {
            Some(n) => n,
            None => {
                let span = (total_duration + self.delay - time_tolerance).max(0.0);
                (span * self.sample_rate).ceil() as usize + 1
            }
        }
    }

    /// Check field invariants.
    pub fn validate(&self) -> Result<()> {
        if self.name.as_str().is_empty() {
            return Err(field_error("name", "must not be empty"));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(field_error(
                "sample_rate",
                format!("must be finite and positive, got {}", self.sample_rate),
            ));
        }
        if !self.base_freq.is_finite() {
            return Err(field_error(
                "base_freq",
                format!("must be finite, got {}", self.base_freq),
            ));
        }
        if !self.delay.is_finite() {
            return Err(field_error(
                "delay",
                format!("must be finite, got {}", self.delay),
            ));
        }
        if !self.iir.iter().all(Biquad::is_finite) {
            return Err(field_error("iir", "coefficients must be finite"));
        }
        if !self.fir.iter().all(|v| v.is_finite()) {
            return Err(field_error("fir", "taps must be finite"));
        }
        if let Some(cal) = &self.iq_calibration {
            let finite = cal.matrix.iter().flatten().all(|v| v.is_finite())
                && cal.offset.iter().all(|v| v.is_finite());
            if !finite {
                return Err(field_error("iq_calibration", "must be finite"));
            }
        }
        Ok(())
    }
}

/// Linear leakage between channels.
///
/// Output channel `channels[i]` receives `Σ_j matrix[i][j] · pulses_j`. A
/// leaked pulse keeps the carrier of the channel it was played on and is
/// sampled on the grid of the channel it leaks into. Channels missing from
/// `channels` pass through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crosstalk {
    pub channels: Vec<ChannelId>,
    /// Row-major coupling matrix; rows are outputs, columns are sources.
    pub matrix: Vec<Vec<f64>>,
}

impl Crosstalk {
    /// Create a validated coupling matrix.
    ///
    /// # Errors
    ///
    /// See [`Crosstalk::validate`].
    pub fn new(channels: Vec<ChannelId>, matrix: Vec<Vec<f64>>) -> Result<Self> {
        let crosstalk = Self { channels, matrix };
        crosstalk.validate()?;
        Ok(crosstalk)
    }

    /// Check that the matrix is square over distinct channels and finite.
    pub fn validate(&self) -> Result<()> {
        let n = self.channels.len();
        for (index, id) in self.channels.iter().enumerate() {
            if self.channels[..index].contains(id) {
                return Err(field_error(
                    "crosstalk.channels",
                    format!("channel '{}' is listed twice", id),
                ));
            }
        }
        if self.matrix.len() != n || self.matrix.iter().any(|row| row.len() != n) {
            return Err(field_error(
                "crosstalk.matrix",
                format!("must be {}x{} to match the channel list", n, n),
            ));
        }
        if !self.matrix.iter().flatten().all(|v| v.is_finite()) {
            return Err(field_error("crosstalk.matrix", "must be finite"));
        }
        Ok(())
    }

    /// Non-zero couplings out of `source`, as `(output, coefficient)` pairs.
    ///
    /// `None` when `source` is not part of the matrix.
    pub fn couplings(&self, source: &ChannelId) -> Option<Vec<(ChannelId, f64)>> {
        let column = self.channels.iter().position(|id| id == source)?;
        Some(
            self.channels
                .iter()
                .zip(&self.matrix)
                .filter_map(|(output, row)| {
                    let coefficient = row[column];
                    (coefficient != 0.0).then(|| (output.clone(), coefficient))
                })
                .collect(),
        )
    }
}

fn field_error(field: &str, message: impl Into<String>) -> crate::Error {
    ValidationError::Field {
        field: field.into(),
        message: message.into(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ComplexBufferPool;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn test_channel_id_display_and_borrow() {
        let id = ChannelId::new("xy0");
        assert_eq!(id.to_string(), "xy0");
        let map: std::collections::HashMap<ChannelId, u32> = [(id.clone(), 1)].into();
        assert_eq!(map.get("xy0"), Some(&1));
    }

    #[test]
    fn test_validate_ok() {
        let ch = ChannelInfo::new("xy0", 5e9, 2e9).with_delay(1e-9);
        assert!(ch.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sample_rate() {
        let ch = ChannelInfo::new("xy0", 0.0, 0.0);
        let msg = ch.validate().unwrap_err().to_string();
        assert!(msg.contains("sample_rate"));

        let ch = ChannelInfo::new("xy0", 0.0, f64::INFINITY);
        assert!(ch.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_name() {
        assert!(ChannelInfo::new("", 0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_nan_calibration() {
        let mut cal = IqCalibration::default();
        cal.offset[1] = f64::NAN;
        let ch = ChannelInfo::new("xy0", 0.0, 1.0).with_iq_calibration(cal);
        assert!(ch.validate().is_err());
    }

    #[test]
    fn test_sample_count_includes_closing_instant() {
        let ch = ChannelInfo::new("xy0", 0.0, 1.0);
        assert_eq!(ch.sample_count(100.0, 1e-12), 101);
        assert_eq!(ch.sample_count(0.0, 1e-12), 1);

        let ch = ch.with_delay(2.0);
        assert_eq!(ch.sample_count(100.0, 1e-12), 103);
    }

    #[test]
    fn test_sample_count_fixed_length() {
        let ch = ChannelInfo::new("xy0", 0.0, 1.0).with_length(16);
        assert_eq!(ch.sample_count(100.0, 1e-12), 16);
    }

    #[test]
    fn test_iq_calibration_apply() {
        let pool = ComplexBufferPool::new(4);
        let mut arr = pool.acquire(2, true);
        {
            let mut view = arr.view_mut().unwrap();
            view.fill(Complex64::new(1.0, 2.0));
        }
        let cal = IqCalibration {
            matrix: [[2.0, 0.0], [1.0, 1.0]],
            offset: [0.5, -0.5],
        };
        cal.apply(arr.view_mut().unwrap());
        let v = arr.get(1).unwrap();
        assert_relative_eq!(v.re, 2.5, epsilon = 1e-12);
        assert_relative_eq!(v.im, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_iq_calibration_identity_from_imbalance() {
        let cal = IqCalibration::from_imbalance(1.0, 0.0, 0.0, 0.0);
        assert_eq!(cal, IqCalibration::default());
    }

    #[test]
    fn test_channel_info_yaml_defaults() {
        let ch: ChannelInfo = serde_yaml::from_str("name: xy0\nsample_rate: 1.0e9\n").unwrap();
        assert_eq!(ch.name, ChannelId::new("xy0"));
        assert_eq!(ch.base_freq, 0.0);
        assert_eq!(ch.length, None);
        assert!(ch.iq_calibration.is_none());
        assert!(ch.iir.is_empty());
        assert!(ch.fir.is_empty());
    }

    #[test]
    fn test_channel_info_yaml_filters() {
        let yaml = "name: z0\nsample_rate: 1.0e9\niir:\n  - {b0: 0.5, a1: -0.5}\nfir: [0.9, 0.1]\n";
        let ch: ChannelInfo = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(ch.iir, vec![Biquad::new(0.5, 0.0, 0.0, -0.5, 0.0)]);
        assert_eq!(ch.fir, vec![0.9, 0.1]);
    }

    #[test]
    fn test_validate_rejects_non_finite_filters() {
        let ch = ChannelInfo::new("z0", 0.0, 1.0).with_fir(vec![1.0, f64::NAN]);
        assert!(ch.validate().unwrap_err().to_string().contains("fir"));

        let section = Biquad::new(1.0, 0.0, 0.0, f64::INFINITY, 0.0);
        let ch = ChannelInfo::new("z0", 0.0, 1.0).with_iir(vec![section]);
        assert!(ch.validate().unwrap_err().to_string().contains("iir"));
    }

    // =========================================================================
    // Crosstalk
    // =========================================================================

    #[test]
    fn test_crosstalk_couplings_read_columns() {
        let crosstalk = Crosstalk::new(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 0.0], vec![0.1, 1.0]],
        )
        .unwrap();
        assert_eq!(
            crosstalk.couplings(&"a".into()),
            Some(vec![(ChannelId::from("a"), 1.0), (ChannelId::from("b"), 0.1)])
        );
        assert_eq!(
            crosstalk.couplings(&"b".into()),
            Some(vec![(ChannelId::from("b"), 1.0)])
        );
        assert_eq!(crosstalk.couplings(&"c".into()), None);
    }

    #[test]
    fn test_crosstalk_rejects_bad_shapes() {
        let ids = || vec![ChannelId::from("a"), ChannelId::from("b")];
        assert!(Crosstalk::new(ids(), vec![vec![1.0, 0.0]]).is_err());
        assert!(Crosstalk::new(ids(), vec![vec![1.0], vec![0.0, 1.0]]).is_err());
        assert!(Crosstalk::new(ids(), vec![vec![1.0, f64::NAN], vec![0.0, 1.0]]).is_err());
        let dup = vec![ChannelId::from("a"), ChannelId::from("a")];
        assert!(Crosstalk::new(dup, vec![vec![1.0, 0.0], vec![0.0, 1.0]]).is_err());
    }
}
