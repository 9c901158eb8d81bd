// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Output predistortion filters.
//!
//! Control lines distort the waveforms that travel through them. A channel
//! can carry a chain of second-order IIR sections and a set of FIR taps;
//! both run over the finished I and Q samples independently, IIR first,
//! before any mixer correction.

use serde::{Deserialize, Serialize};

/// One second-order IIR section, normalized so that `a0 = 1`.
///
/// Direct Form I:
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Biquad {
    pub b0: f64,
    #[serde(default)]
    pub b1: f64,
    #[serde(default)]
    pub b2: f64,
    #[serde(default)]
    pub a1: f64,
    #[serde(default)]
    pub a2: f64,
}

impl Default for Biquad {
    fn default() -> Self {
        Self::passthrough()
    }
}

impl Biquad {
    pub fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self { b0, b1, b2, a1, a2 }
    }

    /// Section with `y[n] = x[n]`.
    pub fn passthrough() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 0.0)
    }

    /// Build from unnormalized coefficients, dividing through by `a0`.
    pub fn from_coefficients(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let a0_inv = 1.0 / a0;
        Self::new(b0 * a0_inv, b1 * a0_inv, b2 * a0_inv, a1 * a0_inv, a2 * a0_inv)
    }

    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Run the section over `samples` in place, starting from rest.
    pub fn process(&self, samples: &mut [f64]) {
        let mut state = BiquadState::default();
        for sample in samples.iter_mut() {
            *sample = state.step(self, *sample);
        }
    }
}

/// Delay lines of one running section.
#[derive(Debug, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    #[inline]
    fn step(&mut self, c: &Biquad, input: f64) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;
        output
    }
}

/// Run a cascade of sections over `samples` in place.
pub fn apply_iir(samples: &mut [f64], chain: &[Biquad]) {
    for section in chain {
        section.process(samples);
    }
}

/// Convolve `samples` with `taps` in place, truncated to the input length.
///
/// `y[n] = Σ taps[k] · x[n - k]`, with `x` zero before the first sample.
/// An empty tap list leaves the samples untouched.
pub fn apply_fir(samples: &mut [f64], taps: &[f64]) {
    if taps.is_empty() {
        return;
    }
    // Walking backwards, x[n - k] for k >= 1 has not been overwritten yet.
    for n in (0..samples.len()).rev() {
        let mut acc = 0.0;
        for (k, tap) in taps.iter().enumerate().take(n + 1) {
            acc += tap * samples[n - k];
        }
        samples[n] = acc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_passthrough_leaves_samples() {
        let mut x = [1.0, -2.0, 3.0];
        apply_iir(&mut x, &[Biquad::passthrough()]);
        assert_eq!(x, [1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_one_pole_step_response() {
        // y[n] = 0.5 x[n] + 0.5 y[n-1]
        let section = Biquad::new(0.5, 0.0, 0.0, -0.5, 0.0);
        let mut x = [1.0; 4];
        apply_iir(&mut x, &[section]);
        let expected = [0.5, 0.75, 0.875, 0.9375];
        for (got, want) in x.iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_chain_runs_sections_in_order() {
        let delay = Biquad::new(0.0, 1.0, 0.0, 0.0, 0.0);
        let gain = Biquad::new(2.0, 0.0, 0.0, 0.0, 0.0);
        let mut x = [1.0, 0.0, 0.0, 0.0];
        apply_iir(&mut x, &[delay, delay, gain]);
        assert_eq!(x, [0.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn test_from_coefficients_normalizes() {
        let section = Biquad::from_coefficients(2.0, 4.0, 6.0, 2.0, -1.0, 0.5);
        assert_eq!(section, Biquad::new(1.0, 2.0, 3.0, -0.5, 0.25));
    }

    #[test]
    fn test_fir_moving_average() {
        let mut x = [1.0, 2.0, 3.0];
        apply_fir(&mut x, &[0.5, 0.5]);
        assert_eq!(x, [0.5, 1.5, 2.5]);
    }

    #[test]
    fn test_fir_impulse_reproduces_taps() {
        let taps = [0.9, 0.2, -0.1];
        let mut x = [1.0, 0.0, 0.0, 0.0, 0.0];
        apply_fir(&mut x, &taps);
        assert_eq!(x, [0.9, 0.2, -0.1, 0.0, 0.0]);
    }

    #[test]
    fn test_fir_empty_taps_is_noop() {
        let mut x = [1.0, 2.0];
        apply_fir(&mut x, &[]);
        assert_eq!(x, [1.0, 2.0]);
    }

    #[test]
    fn test_biquad_yaml_defaults() {
        let section: Biquad = serde_yaml::from_str("b0: 0.5\na1: -0.5\n").unwrap();
        assert_eq!(section, Biquad::new(0.5, 0.0, 0.0, -0.5, 0.0));
    }
}
