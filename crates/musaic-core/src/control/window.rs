//! Named amplitude windows.
//!
//! Windows are rendered in their periodic (DFT-even) form: a symmetric
//! window of `len + 1` points with the last point dropped. A one-point window
//! is always `[1.0]`.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Window function usable as a grain envelope or control shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// Rectangular window.
    Boxcar,
    /// Triangular window without zero end points.
    Triang,
    /// Triangular window with zero end points.
    Bartlett,
    /// Hann (raised cosine) window.
    Hann,
    /// Hamming window.
    Hamming,
    /// Classic three-term Blackman window.
    Blackman,
    /// Four-term Blackman-Harris window.
    BlackmanHarris,
    /// Nuttall's four-term window.
    Nuttall,
    /// Flat top window.
    Flattop,
    /// Half-sine window.
    Cosine,
    /// Bohman window.
    Bohman,
    /// Modified Bartlett-Hann window.
    BartHann,
    /// Tapered cosine window with half of its length tapered.
    Tukey,
    /// Sinc window.
    Lanczos,
}

const ALL: [(WindowKind, &str); 14] = [
    (WindowKind::Boxcar, "boxcar"),
    (WindowKind::Triang, "triang"),
    (WindowKind::Bartlett, "bartlett"),
    (WindowKind::Hann, "hann"),
    (WindowKind::Hamming, "hamming"),
    (WindowKind::Blackman, "blackman"),
    (WindowKind::BlackmanHarris, "blackmanharris"),
    (WindowKind::Nuttall, "nuttall"),
    (WindowKind::Flattop, "flattop"),
    (WindowKind::Cosine, "cosine"),
    (WindowKind::Bohman, "bohman"),
    (WindowKind::BartHann, "barthann"),
    (WindowKind::Tukey, "tukey"),
    (WindowKind::Lanczos, "lanczos"),
];

const TUKEY_ALPHA: f64 = 0.5;

impl WindowKind {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        ALL.iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, name)| *name)
            .unwrap_or("boxcar")
    }

    /// Every supported window name.
    pub fn names() -> impl Iterator<Item = &'static str> {
        ALL.iter().map(|(_, name)| *name)
    }

    /// Renders the periodic window of `len` points.
    pub fn render(&self, len: usize) -> Vec<f64> {
        match len {
            0 => Vec::new(),
            1 => vec![1.0],
            _ => {
                let symmetric = len + 1;
                (0..len).map(|i| self.symmetric_point(i, symmetric)).collect()
            }
        }
    }

    /// Value at index `i` of the symmetric window of `m >= 2` points.
    fn symmetric_point(&self, i: usize, m: usize) -> f64 {
        let n = i as f64;
        let last = (m - 1) as f64;
        match self {
            WindowKind::Boxcar => 1.0,
            WindowKind::Triang => {
                let half = (m + m % 2) as f64 / 2.0;
                1.0 - ((n - last / 2.0) / half).abs()
            }
            WindowKind::Bartlett => 1.0 - (2.0 * n / last - 1.0).abs(),
            WindowKind::Hann => general_cosine(n, last, &[0.5, 0.5]),
            WindowKind::Hamming => general_cosine(n, last, &[0.54, 0.46]),
            WindowKind::Blackman => general_cosine(n, last, &[0.42, 0.50, 0.08]),
            WindowKind::BlackmanHarris => {
                general_cosine(n, last, &[0.35875, 0.48829, 0.14128, 0.01168])
            }
            WindowKind::Nuttall => {
                general_cosine(n, last, &[0.3635819, 0.4891775, 0.1365995, 0.0106411])
            }
            WindowKind::Flattop => general_cosine(
                n,
                last,
                &[
                    0.21557895,
                    0.41663158,
                    0.277263158,
                    0.083578947,
                    0.006947368,
                ],
            ),
            WindowKind::Cosine => (PI * (n + 0.5) / m as f64).sin(),
            WindowKind::Bohman => {
                let x = (2.0 * n / last - 1.0).abs();
                ((1.0 - x) * (PI * x).cos() + (PI * x).sin() / PI).max(0.0)
            }
            WindowKind::BartHann => {
                let x = (n / last - 0.5).abs();
                0.62 - 0.48 * x + 0.38 * (2.0 * PI * x).cos()
            }
            WindowKind::Tukey => {
                let edge = TUKEY_ALPHA * last / 2.0;
                if n < edge {
                    0.5 * (1.0 + (PI * (n / edge - 1.0)).cos())
                } else if n > last - edge {
                    0.5 * (1.0 + (PI * ((n - last) / edge + 1.0)).cos())
                } else {
                    1.0
                }
            }
            WindowKind::Lanczos => sinc(2.0 * n / last - 1.0),
        }
    }
}

// sum of alternating-sign cosine terms
fn general_cosine(n: f64, last: f64, coefficients: &[f64]) -> f64 {
    coefficients
        .iter()
        .enumerate()
        .map(|(k, a)| {
            let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
            sign * a * (2.0 * PI * k as f64 * n / last).cos()
        })
        .sum()
}

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

impl FromStr for WindowKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['_', '-'], "");
        let wanted = match wanted.as_str() {
            "hanning" => "hann".to_string(),
            "rectangular" | "rect" => "boxcar".to_string(),
            "triangle" => "triang".to_string(),
            _ => wanted,
        };
        ALL.iter()
            .find(|(_, name)| *name == wanted)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| {
                CoreError::config(
                    "window",
                    format!(
                        "unknown window '{}' (expected one of: {})",
                        s,
                        WindowKind::names().collect::<Vec<_>>().join(", ")
                    ),
                )
            })
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
