// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pulse envelope shapes.
//!
//! A [`Shape`] maps normalized time `x ∈ [-0.5, 0.5]` to a complex envelope
//! value; outside that range every shape is zero. [`ShapeInfo`] is the
//! serializable description a request carries. It builds its sampler on
//! first use and keeps it for its own lifetime, so a description shared by
//! many pulses (via `Arc<ShapeInfo>`) is only ever built once.
//!
//! # References
//!
//! - Motzoi et al. (2009), PRL 103, 110501: Hann/cosine envelopes are the
//!   usual DRAG base shape for transmon single-qubit gates.
//! - Burden & Faires, "Numerical Analysis", §3.5: natural cubic splines.

use std::f64::consts::TAU;
use std::sync::OnceLock;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Serializable shape variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    /// Raised cosine, `0.5 (1 + cos 2πx)`.
    Hann,
    /// Linear taper, `1 - 2|x|`.
    Triangle,
    /// Natural cubic spline through `(x, y)` control points.
    Interpolated { x: Vec<f64>, y: Vec<f64> },
}

/// A shape description with a memoized sampler.
///
/// The description is immutable; the sampler is derived from it once.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "ShapeKind", into = "ShapeKind")]
pub struct ShapeInfo {
    kind: ShapeKind,
    sampler: OnceLock<Shape>,
}

impl ShapeInfo {
    /// Hann (raised cosine) shape.
    pub fn hann() -> Self {
        ShapeKind::Hann.into()
    }

    /// Triangle shape.
    pub fn triangle() -> Self {
        ShapeKind::Triangle.into()
    }

    /// Interpolated shape from control points.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the arrays differ in length, hold fewer than two
    /// points, contain non-finite values, or `x` is not strictly increasing.
    pub fn interpolated(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        CubicSpline::check_points(&x, &y)?;
        Ok(ShapeKind::Interpolated { x, y }.into())
    }

    /// The description this shape was built from.
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// Get the sampler, building it on first use.
    ///
    /// Descriptions that bypassed [`ShapeInfo::interpolated`] (for example
    /// deserialized ones) are validated here.
    pub fn sampler(&self) -> Result<&Shape> {
        if let Some(shape) = self.sampler.get() {
            return Ok(shape);
        }
        let shape = match &self.kind {
            ShapeKind::Hann => Shape::Hann,
            ShapeKind::Triangle => Shape::Triangle,
            ShapeKind::Interpolated { x, y } => Shape::Interpolated(CubicSpline::new(x, y)?),
        };
        Ok(self.sampler.get_or_init(|| shape))
    }
}

impl Clone for ShapeInfo {
    fn clone(&self) -> Self {
        self.kind.clone().into()
    }
}

impl PartialEq for ShapeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl From<ShapeKind> for ShapeInfo {
    fn from(kind: ShapeKind) -> Self {
        Self {
            kind,
            sampler: OnceLock::new(),
        }
    }
}

impl From<ShapeInfo> for ShapeKind {
    fn from(info: ShapeInfo) -> Self {
        info.kind
    }
}

/// A concrete envelope sampler.
#[derive(Debug, Clone)]
pub enum Shape {
    Hann,
    Triangle,
    Interpolated(CubicSpline),
}

impl Shape {
    /// Envelope value at normalized time `x`. Zero for `|x| > 0.5`.
    pub fn sample_at(&self, x: f64) -> Complex64 {
        if !(-0.5..=0.5).contains(&x) {
            return Complex64::new(0.0, 0.0);
        }
        let re = match self {
            Shape::Hann => 0.5 * (1.0 + (TAU * x).cos()),
            Shape::Triangle => 1.0 - 2.0 * x.abs(),
            Shape::Interpolated(spline) => spline.eval(x),
        };
        Complex64::new(re, 0.0)
    }
}

/// Natural cubic spline (zero second derivative at both ends).
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivatives at the knots.
    m: Vec<f64>,
}

impl CubicSpline {
    /// Build a spline through the given control points.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        Self::check_points(x, y)?;
        let m = natural_second_derivatives(x, y);
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    fn check_points(x: &[f64], y: &[f64]) -> Result<()> {
        if x.len() != y.len() {
            return Err(ValidationError::InvalidShape(format!(
                "x and y lengths differ ({} vs {})",
                x.len(),
                y.len()
            ))
            .into());
        }
        if x.len() < 2 {
            return Err(ValidationError::InvalidShape(format!(
                "at least 2 control points required, got {}",
                x.len()
            ))
            .into());
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(
                ValidationError::InvalidShape("control points must be finite".into()).into(),
            );
        }
        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ValidationError::InvalidShape(format!(
                "x must be strictly increasing, x[{}]={} >= x[{}]={}",
                i,
                x[i],
                i + 1,
                x[i + 1]
            ))
            .into());
        }
        Ok(())
    }

    /// Evaluate the spline. Zero outside the control range.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        if t < self.x[0] || t > self.x[n - 1] {
            return 0.0;
        }
        // Segment index i such that x[i] <= t <= x[i + 1].
        let i = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;
        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let a = x1 - t;
        let b = t - x0;
        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Solve the tridiagonal system for natural spline second derivatives
/// (Thomas algorithm).
fn natural_second_derivatives(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = x[i] - x[i - 1];
        let h1 = x[i + 1] - x[i];
        let rhs = 6.0 * ((y[i + 1] - y[i]) / h1 - (y[i] - y[i - 1]) / h0);
        let denom = 2.0 * (h0 + h1) - h0 * c_prime[i - 1];
        c_prime[i] = h1 / denom;
        d_prime[i] = (rhs - h0 * d_prime[i - 1]) / denom;
    }
    for i in (1..n - 1).rev() {
        m[i] = d_prime[i] - c_prime[i] * m[i + 1];
    }
    m
}
