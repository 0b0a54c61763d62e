//! Time-varying control parameters.
//!
//! Every synthesis control (fidelity, grain duration, panning depth, grain
//! envelope, ...) is a [`ControlParameter`] that resolves to exactly `n`
//! values, one per target segment or one per sample of a grain window.
//!
//! In JSON a control is written as a number (constant), a window name
//! (`"hann"`), a list of numbers (breakpoints at indices 0, 1, 2, ...) or a
//! list of `[x, y]` pairs with strictly ascending `x`.

mod window;


pub use window::WindowKind;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A breakpoint of a piecewise-linear control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    /// Position; only the relative spacing of positions matters.
    pub x: f64,
    /// Value at `x`.
    pub y: f64,
}

/// A control value that varies over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawControl", into = "RawControl")]
pub enum ControlParameter {
    /// The same value everywhere.
    Constant(f64),
    /// Linear interpolation between breakpoints, stretched to the output length.
    Piecewise(Vec<Breakpoint>),
    /// A window function rendered at the output length.
    NamedWindow(WindowKind),
}

impl ControlParameter {
    /// Creates a constant control.
    pub fn constant(value: f64) -> Self {
        ControlParameter::Constant(value)
    }

    /// Creates a piecewise control from values at positions 0, 1, 2, ...
    pub fn from_values(values: &[f64]) -> CoreResult<Self> {
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &y)| Breakpoint { x: i as f64, y })
            .collect();
        let control = ControlParameter::Piecewise(points);
        control.validate()?;
        Ok(control)
    }

    /// Creates a piecewise control from `(x, y)` pairs.
    pub fn from_points(points: &[(f64, f64)]) -> CoreResult<Self> {
        let points = points.iter().map(|&(x, y)| Breakpoint { x, y }).collect();
        let control = ControlParameter::Piecewise(points);
        control.validate()?;
        Ok(control)
    }

    /// Creates a window-shaped control.
    pub fn window(kind: WindowKind) -> Self {
        ControlParameter::NamedWindow(kind)
    }

    /// Checks that the control can be resolved.
    pub fn validate(&self) -> CoreResult<()> {
        match self {
            ControlParameter::Constant(value) if !value.is_finite() => Err(CoreError::config(
                "control",
                format!("constant value {} is not finite", value),
            )),
            ControlParameter::Piecewise(points) => {
                if points.is_empty() {
                    return Err(CoreError::config("control", "piecewise control has no points"));
                }
                if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                    return Err(CoreError::config(
                        "control",
                        "piecewise control contains non-finite values",
                    ));
                }
                if points.windows(2).any(|w| w[1].x <= w[0].x) {
                    return Err(CoreError::config(
                        "control",
                        "breakpoint positions must be in strictly ascending order",
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Resolves the control to exactly `n` values.
    pub fn resolve(&self, n: usize) -> CoreResult<Vec<f64>> {
        self.validate()?;
        Ok(match self {
            ControlParameter::Constant(value) => vec![*value; n],
            ControlParameter::Piecewise(points) => interpolate(points, n),
            ControlParameter::NamedWindow(kind) => kind.render(n),
        })
    }

    /// Resolves the control and clamps every value to `[min, max]`.
    pub fn resolve_clamped(&self, n: usize, min: f64, max: f64) -> CoreResult<Vec<f64>> {
        let mut values = self.resolve(n)?;
        for v in values.iter_mut() {
            *v = v.clamp(min, max);
        }
        Ok(values)
    }
}

impl Default for ControlParameter {
    fn default() -> Self {
        ControlParameter::Constant(0.0)
    }
}

impl From<f64> for ControlParameter {
    fn from(value: f64) -> Self {
        ControlParameter::Constant(value)
    }
}

impl From<WindowKind> for ControlParameter {
    fn from(kind: WindowKind) -> Self {
        ControlParameter::NamedWindow(kind)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
///
/// A single value is `start`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

fn interpolate(points: &[Breakpoint], n: usize) -> Vec<f64> {
    let first = points[0];
    let last = points[points.len() - 1];
    if points.len() == 1 {
        return vec![first.y; n];
    }

    let mut segment = 0;
    linspace(first.x, last.x, n)
        .into_iter()
        .map(|x| {
            while segment + 2 < points.len() && x > points[segment + 1].x {
                segment += 1;
            }
            let a = points[segment];
            let b = points[segment + 1];
            let t = ((x - a.x) / (b.x - a.x)).clamp(0.0, 1.0);
            a.y + (b.y - a.y) * t
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawControl {
    Constant(f64),
    Named(String),
    Points(Vec<RawPoint>),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Value(f64),
    Pair([f64; 2]),
}

impl TryFrom<RawControl> for ControlParameter {
    type Error = CoreError;

    fn try_from(raw: RawControl) -> Result<Self, Self::Error> {
        match raw {
            RawControl::Constant(value) => Ok(ControlParameter::Constant(value)),
            RawControl::Named(name) => Ok(ControlParameter::NamedWindow(name.parse()?)),
            RawControl::Points(points) => {
                let all_values = points.iter().all(|p| matches!(p, RawPoint::Value(_)));
                let all_pairs = points.iter().all(|p| matches!(p, RawPoint::Pair(_)));
                if !all_values && !all_pairs {
                    return Err(CoreError::config(
                        "control",
                        "mix of plain values and [x, y] pairs",
                    ));
                }
                let breakpoints = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| match *p {
                        RawPoint::Value(y) => Breakpoint { x: i as f64, y },
                        RawPoint::Pair([x, y]) => Breakpoint { x, y },
                    })
                    .collect();
                let control = ControlParameter::Piecewise(breakpoints);
                control.validate()?;
                Ok(control)
            }
        }
    }
}

impl From<ControlParameter> for RawControl {
    fn from(control: ControlParameter) -> Self {
        match control {
            ControlParameter::Constant(value) => RawControl::Constant(value),
            ControlParameter::NamedWindow(kind) => RawControl::Named(kind.as_str().to_string()),
            ControlParameter::Piecewise(points) => RawControl::Points(
                points
                    .into_iter()
                    .map(|p| RawPoint::Pair([p.x, p.y]))
                    .collect(),
            ),
        }
    }
}
