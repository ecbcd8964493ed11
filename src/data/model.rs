//! Dense cube and mask volumes and their shape.

use std::fmt;

use crate::error::StepError;

// ---------------------------------------------------------------------------
// Shape – cube dimensions
// ---------------------------------------------------------------------------

/// Dimensions of a cube: two spatial axes and one spectral axis.
/// Data is stored with `x` varying fastest, then `y`, then `z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
}

impl Shape {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Number of voxels.
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Number of voxels, or `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.nx.checked_mul(self.ny)?.checked_mul(self.nz)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of voxel `(x, y, z)`.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.nx && y < self.ny && z < self.nz);
        (z * self.ny + y) * self.nx + x
    }

    /// Inverse of [`Shape::index`].
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.nx;
        let y = (index / self.nx) % self.ny;
        let z = index / (self.nx * self.ny);
        (x, y, z)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}×{}", self.nx, self.ny, self.nz)
    }
}

// ---------------------------------------------------------------------------
// Cube – the data being searched
// ---------------------------------------------------------------------------

/// A 3-D data cube. May contain NaN (blanked) and infinite voxels.
#[derive(Debug, Clone, PartialEq)]
pub struct Cube {
    shape: Shape,
    data: Vec<f64>,
}

impl Cube {
    pub fn from_vec(shape: Shape, data: Vec<f64>) -> Result<Self, StepError> {
        if shape.checked_len() != Some(data.len()) {
            return Err(StepError::LengthMismatch {
                shape,
                len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// A cube with every voxel set to `value`.
    pub fn filled(shape: Shape, value: f64) -> Self {
        Self {
            shape,
            data: vec![value; shape.len()],
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> f64 {
        self.data[self.shape.index(x, y, z)]
    }

    pub fn set(&mut self, x: usize, y: usize, z: usize, value: f64) {
        let idx = self.shape.index(x, y, z);
        self.data[idx] = value;
    }

    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

// ---------------------------------------------------------------------------
// Mask – per-voxel detection bits
// ---------------------------------------------------------------------------

/// Detection mask congruent to a [`Cube`].
///
/// Each element is a bit-field. Stages only ever OR bits in, so masks from
/// several detection stages compose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    shape: Shape,
    bits: Vec<u8>,
}

impl Mask {
    /// Bit 0: positive detection.
    pub const POSITIVE: u8 = 0x01;
    /// Bit 1: negative detection.
    pub const NEGATIVE: u8 = 0x02;

    /// A mask with no bits set.
    pub fn empty(shape: Shape) -> Self {
        Self {
            shape,
            bits: vec![0; shape.len()],
        }
    }

    pub fn from_vec(shape: Shape, bits: Vec<u8>) -> Result<Self, StepError> {
        if shape.checked_len() != Some(bits.len()) {
            return Err(StepError::LengthMismatch {
                shape,
                len: bits.len(),
            });
        }
        Ok(Self { shape, bits })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub fn bits_mut(&mut self) -> &mut [u8] {
        &mut self.bits
    }

    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        self.bits[self.shape.index(x, y, z)]
    }

    /// Number of elements with every bit of `flag` set.
    pub fn count(&self, flag: u8) -> usize {
        self.bits.iter().filter(|&&b| b & flag == flag).count()
    }

    /// OR the bits of `other` into `self`.
    pub fn merge(&mut self, other: &Mask) -> Result<(), StepError> {
        if other.shape != self.shape {
            return Err(StepError::ShapeMismatch {
                expected: self.shape,
                actual: other.shape,
            });
        }
        for (dst, src) in self.bits.iter_mut().zip(&other.bits) {
            *dst |= *src;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_roundtrip() {
        let shape = Shape::new(4, 3, 2);
        assert_eq!(shape.len(), 24);
        assert_eq!(shape.index(0, 0, 0), 0);
        assert_eq!(shape.index(1, 0, 0), 1);
        assert_eq!(shape.index(0, 1, 0), 4);
        assert_eq!(shape.index(0, 0, 1), 12);
        for i in 0..shape.len() {
            let (x, y, z) = shape.coords(i);
            assert_eq!(shape.index(x, y, z), i);
        }
    }

    #[test]
    fn test_cube_length_checked() {
        assert!(Cube::from_vec(Shape::new(2, 2, 1), vec![0.0; 3]).is_err());
        let cube = Cube::from_vec(Shape::new(2, 2, 1), vec![0.0, f64::NAN, 1.0, 2.0]).unwrap();
        assert_eq!(cube.nan_count(), 1);
        assert_eq!(cube.get(0, 1, 0), 1.0);
    }

    #[test]
    fn test_oversized_shape_rejected() {
        let huge = Shape::new(1 << 32, 1 << 32, 1 << 1);
        assert_eq!(huge.checked_len(), None);
        assert_eq!(Shape::new(4, 3, 2).checked_len(), Some(24));
        assert!(matches!(
            Cube::from_vec(huge, Vec::new()),
            Err(StepError::LengthMismatch { len: 0, .. })
        ));
        assert!(Mask::from_vec(huge, Vec::new()).is_err());
    }

    #[test]
    fn test_mask_merge_is_or() {
        let shape = Shape::new(3, 1, 1);
        let mut a = Mask::from_vec(shape, vec![Mask::POSITIVE, 0, 0x04]).unwrap();
        let b = Mask::from_vec(shape, vec![Mask::NEGATIVE, Mask::POSITIVE, 0]).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.bits(), &[0x03, 0x01, 0x04]);
        assert_eq!(a.count(Mask::POSITIVE), 2);
        assert!(a.merge(&Mask::empty(Shape::new(1, 1, 1))).is_err());
    }
}
