//! Robust noise estimates over a cube.

use std::str::FromStr;

use super::model::Cube;
use crate::error::StepError;

/// For a normal distribution, σ ≈ 1.4826 × MAD.
pub const MAD_TO_SIGMA: f64 = 1.482_602_218_505_602;

/// Statistic used to turn the noise sample into an rms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RmsMode {
    /// Population standard deviation.
    Std,
    /// Median absolute deviation about the median, scaled to σ.
    #[default]
    Mad,
    /// Root-mean-square about zero.
    Negative,
}

impl FromStr for RmsMode {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "std" => Ok(RmsMode::Std),
            "mad" => Ok(RmsMode::Mad),
            "negative" => Ok(RmsMode::Negative),
            other => Err(StepError::InvalidRmsMode(other.to_string())),
        }
    }
}

/// Which voxels contribute to the noise sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluxRange {
    #[default]
    All,
    /// Only positive voxels, mirrored about zero.
    Positive,
    /// Only negative voxels, mirrored about zero. Insensitive to real
    /// (positive) emission.
    Negative,
}

impl FromStr for FluxRange {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(FluxRange::All),
            "positive" => Ok(FluxRange::Positive),
            "negative" => Ok(FluxRange::Negative),
            other => Err(StepError::InvalidFluxRange(other.to_string())),
        }
    }
}

/// Estimate the noise level of `cube`. Non-finite voxels are ignored.
pub fn estimate_rms(cube: &Cube, mode: RmsMode, range: FluxRange) -> Result<f64, StepError> {
    let mut sample = noise_sample(cube.values(), range);
    if sample.is_empty() {
        return Err(StepError::EmptyNoiseSample);
    }
    let rms = match mode {
        RmsMode::Std => std_dev(&sample),
        RmsMode::Mad => {
            let median = median_mut(&mut sample);
            for v in sample.iter_mut() {
                *v = (*v - median).abs();
            }
            median_mut(&mut sample) * MAD_TO_SIGMA
        }
        RmsMode::Negative => {
            let sum_sq: f64 = sample.iter().map(|v| v * v).sum();
            (sum_sq / sample.len() as f64).sqrt()
        }
    };
    Ok(rms)
}

fn noise_sample(values: &[f64], range: FluxRange) -> Vec<f64> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    match range {
        FluxRange::All => finite.collect(),
        FluxRange::Positive => finite.filter(|&v| v > 0.0).flat_map(|v| [v, -v]).collect(),
        FluxRange::Negative => finite.filter(|&v| v < 0.0).flat_map(|v| [v, -v]).collect(),
    }
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

/// Median via quickselect; reorders `data`. `data` must be non-empty.
fn median_mut(data: &mut [f64]) -> f64 {
    debug_assert!(!data.is_empty());
    let len = data.len();
    let mid = len / 2;
    let (left, upper, _) = data.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if len % 2 == 1 {
        upper
    } else {
        let lower = left.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) * 0.5
    }
}
