//! Threshold mask filter: marks voxels beyond a clip level in a [`Mask`].

use std::str::FromStr;

use log::info;
use rayon::prelude::*;

use super::model::{Cube, Mask};
use super::noise::{estimate_rms, FluxRange, RmsMode};
use crate::error::StepError;
use crate::options::ModuleOptions;

// ---------------------------------------------------------------------------
// Threshold settings
// ---------------------------------------------------------------------------

/// How the `threshold` parameter is turned into a clip level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMethod {
    /// Clip level = threshold × estimated noise.
    Relative,
    /// Clip level = threshold.
    Absolute,
}

impl FromStr for ClipMethod {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relative" => Ok(ClipMethod::Relative),
            "absolute" => Ok(ClipMethod::Absolute),
            other => Err(StepError::InvalidClipMethod(other.to_string())),
        }
    }
}

/// Parameters of the threshold filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSettings {
    pub clip_method: ClipMethod,
    pub threshold: f64,
    pub rms_mode: RmsMode,
    pub flux_range: FluxRange,
}

impl ThresholdSettings {
    /// Read the settings from the `threshold` module.
    ///
    /// `threshold` and `clipMethod` are required; `rmsMode` defaults to
    /// `mad` and `fluxRange` to `all`. The noise options are only read for
    /// relative clipping, so an absolute run ignores modes it never uses.
    pub fn from_options(options: &ModuleOptions) -> Result<Self, StepError> {
        let clip_method: ClipMethod = options.require_str("clipMethod")?.parse()?;
        let threshold = options.require_f64("threshold")?;
        let (rms_mode, flux_range) = match clip_method {
            ClipMethod::Relative => (
                options.str_or("rmsMode", "mad")?.parse()?,
                options.str_or("fluxRange", "all")?.parse()?,
            ),
            ClipMethod::Absolute => (RmsMode::default(), FluxRange::default()),
        };
        Ok(Self {
            clip_method,
            threshold,
            rms_mode,
            flux_range,
        })
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Clip level for `cube` under `settings`.
pub fn clip_level(cube: &Cube, settings: &ThresholdSettings) -> Result<f64, StepError> {
    match settings.clip_method {
        ClipMethod::Absolute => Ok(settings.threshold),
        ClipMethod::Relative => {
            let rms = estimate_rms(cube, settings.rms_mode, settings.flux_range)?;
            info!("Estimated rms = {rms}");
            Ok(settings.threshold * rms)
        }
    }
}

/// Run the threshold finder on `cube`, OR-ing detections into `mask`.
///
/// Voxels `>= clip` get [`Mask::POSITIVE`], voxels `<= -clip` get
/// [`Mask::NEGATIVE`]. Existing mask bits are never cleared, so repeated
/// runs are idempotent.
///
/// Non-finite voxels are replaced for the comparison (NaN → 0, ±∞ → ±`f64::MAX`)
/// and only the NaNs are put back afterwards: infinities stay replaced.
///
/// Returns the clip level that was used.
pub fn threshold_filter(
    mask: &mut Mask,
    cube: &mut Cube,
    settings: &ThresholdSettings,
) -> Result<f64, StepError> {
    if mask.shape() != cube.shape() {
        return Err(StepError::ShapeMismatch {
            expected: cube.shape(),
            actual: mask.shape(),
        });
    }

    let clip = clip_level(cube, settings)?;
    info!("Using clip threshold: {clip}");

    let nan_positions: Vec<usize> = cube
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_nan())
        .map(|(i, _)| i)
        .collect();
    replace_non_finite(cube.values_mut());

    mask.bits_mut()
        .par_iter_mut()
        .zip(cube.values().par_iter())
        .for_each(|(bits, &v)| {
            if v >= clip {
                *bits |= Mask::POSITIVE;
            }
            if v <= -clip {
                *bits |= Mask::NEGATIVE;
            }
        });

    let values = cube.values_mut();
    for &i in &nan_positions {
        values[i] = f64::NAN;
    }

    Ok(clip)
}

/// Same as [`threshold_filter`] with the settings given as raw option values.
/// `rms_mode` is only parsed for relative clipping.
pub fn apply(
    mask: &mut Mask,
    cube: &mut Cube,
    clip_method: &str,
    threshold: f64,
    rms_mode: &str,
) -> Result<f64, StepError> {
    let clip_method: ClipMethod = clip_method.parse()?;
    let rms_mode = match clip_method {
        ClipMethod::Relative => rms_mode.parse()?,
        ClipMethod::Absolute => RmsMode::default(),
    };
    let settings = ThresholdSettings {
        clip_method,
        threshold,
        rms_mode,
        flux_range: FluxRange::All,
    };
    threshold_filter(mask, cube, &settings)
}

fn replace_non_finite(values: &mut [f64]) {
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = 0.0;
        } else if *v == f64::INFINITY {
            *v = f64::MAX;
        } else if *v == f64::NEG_INFINITY {
            *v = f64::MIN;
        }
    }
}
