//! Blanking of user-listed regions before source finding.

use log::info;

use super::model::Cube;
use crate::error::StepError;
use crate::options::OptionValue;

/// A box of voxels to blank, as half-open ranges per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: (i64, i64),
    pub y: (i64, i64),
    pub z: (i64, i64),
}

impl Region {
    /// Parse `[x1, x2, y1, y2, z1, z2]`.
    pub fn from_option(index: usize, value: &OptionValue) -> Result<Self, StepError> {
        let invalid = |reason: &str| StepError::InvalidRegion {
            index,
            reason: reason.to_string(),
        };
        let items = value
            .as_sequence()
            .ok_or_else(|| invalid("expected [x1, x2, y1, y2, z1, z2]"))?;
        if items.len() != 6 {
            return Err(invalid(&format!("expected 6 bounds, got {}", items.len())));
        }
        let mut bounds = [0i64; 6];
        for (slot, item) in bounds.iter_mut().zip(items) {
            *slot = item
                .as_i64()
                .ok_or_else(|| invalid(&format!("bound {item} is not an integer")))?;
        }
        Ok(Self {
            x: (bounds[0], bounds[1]),
            y: (bounds[2], bounds[3]),
            z: (bounds[4], bounds[5]),
        })
    }
}

/// Parse every region of a `flag.regions` value.
pub fn regions_from_options(value: &[OptionValue]) -> Result<Vec<Region>, StepError> {
    value
        .iter()
        .enumerate()
        .map(|(i, v)| Region::from_option(i, v))
        .collect()
}

fn clamp_range((start, end): (i64, i64), len: usize) -> std::ops::Range<usize> {
    let clamp = |v: i64| v.clamp(0, len as i64) as usize;
    let (start, end) = (clamp(start), clamp(end));
    start..end.max(start)
}

/// Set every voxel inside `regions` to NaN. Bounds outside the cube are
/// clamped. Returns the number of voxels blanked.
pub fn flag_regions(cube: &mut Cube, regions: &[Region]) -> usize {
    let shape = cube.shape();
    let values = cube.values_mut();
    let mut flagged = 0;
    for region in regions {
        for z in clamp_range(region.z, shape.nz) {
            for y in clamp_range(region.y, shape.ny) {
                let row = (z * shape.ny + y) * shape.nx;
                for x in clamp_range(region.x, shape.nx) {
                    let v = &mut values[row + x];
                    if !v.is_nan() {
                        *v = f64::NAN;
                        flagged += 1;
                    }
                }
            }
        }
    }
    info!("Flagged {flagged} voxels in {} regions", regions.len());
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Shape;
    use crate::options::literal::parse_literal;

    #[test]
    fn test_parse_regions() {
        let value = parse_literal("[[0, 2, 0, 1, 1, 2], [5, 6, 0, 1, 0, 1]]").unwrap();
        let regions = regions_from_options(value.as_sequence().unwrap()).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].x, (0, 2));
        assert_eq!(regions[0].z, (1, 2));
    }

    #[test]
    fn test_bad_regions() {
        for bad in ["[[0, 1, 0, 1]]", "[[0, 1, 0, 1, 0, 1.5]]", "[3]"] {
            let value = parse_literal(bad).unwrap();
            assert!(
                matches!(
                    regions_from_options(value.as_sequence().unwrap()),
                    Err(StepError::InvalidRegion { index: 0, .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_flag_blanks_box() {
        let shape = Shape::new(3, 2, 2);
        let mut cube = Cube::filled(shape, 1.0);
        let region = Region {
            x: (1, 3),
            y: (0, 1),
            z: (1, 2),
        };
        assert_eq!(flag_regions(&mut cube, &[region]), 2);
        assert!(cube.get(1, 0, 1).is_nan());
        assert!(cube.get(2, 0, 1).is_nan());
        assert_eq!(cube.get(0, 0, 1), 1.0);
        assert_eq!(cube.get(1, 1, 1), 1.0);
        assert_eq!(cube.get(1, 0, 0), 1.0);
        assert_eq!(cube.nan_count(), 2);
    }

    #[test]
    fn test_flag_clamps_and_ignores_empty() {
        let shape = Shape::new(2, 2, 1);
        let mut cube = Cube::filled(shape, 1.0);
        let outside = Region {
            x: (-5, 100),
            y: (1, 100),
            z: (0, 1),
        };
        let inverted = Region {
            x: (2, 0),
            y: (0, 2),
            z: (0, 1),
        };
        assert_eq!(flag_regions(&mut cube, &[outside, inverted]), 2);
        assert_eq!(cube.nan_count(), 2);
    }
}
