use super::array::Voxel;
use crate::core::BitPix;
use crate::fits::header::HeaderStore;
use crate::fits::{FitsError, Result};

/// Voxel storage in the file's native element type.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

/// A computation generic over the element type, run by [`VoxelData::visit`].
pub trait VoxelVisitor {
    type Output;

    fn visit<T: Voxel>(self, data: &[T]) -> Self::Output;
}

impl VoxelData {
    /// The only place element types are matched for reductions.
    pub fn visit<V: VoxelVisitor>(&self, visitor: V) -> V::Output {
        match self {
            Self::U8(v) => visitor.visit(v),
            Self::I16(v) => visitor.visit(v),
            Self::I32(v) => visitor.visit(v),
            Self::I64(v) => visitor.visit(v),
            Self::F32(v) => visitor.visit(v),
            Self::F64(v) => visitor.visit(v),
        }
    }

    pub fn bitpix(&self) -> BitPix {
        struct Kind;
        impl VoxelVisitor for Kind {
            type Output = BitPix;
            fn visit<T: Voxel>(self, _: &[T]) -> BitPix {
                T::BITPIX
            }
        }
        self.visit(Kind)
    }

    pub fn len(&self) -> usize {
        struct Len;
        impl VoxelVisitor for Len {
            type Output = usize;
            fn visit<T: Voxel>(self, data: &[T]) -> usize {
                data.len()
            }
        }
        self.visit(Len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_slice<T: Voxel>(&self) -> Option<&[T]> {
        T::slice(self)
    }
}

impl<T: Voxel> From<Vec<T>> for VoxelData {
    fn from(data: Vec<T>) -> Self {
        T::wrap(data)
    }
}

/// `BSCALE`/`BZERO`/`BLANK` from the header. Raw values stay unscaled in the
/// buffer; consumers apply `physical = bzero + bscale * raw`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaling {
    pub bscale: f64,
    pub bzero: f64,
    pub blank: Option<i64>,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            bscale: 1.0,
            bzero: 0.0,
            blank: None,
        }
    }
}

impl Scaling {
    /// `BLANK` only applies to integer data.
    pub fn from_header(header: &HeaderStore, bitpix: BitPix) -> Self {
        Self {
            bscale: header.float_or("BSCALE", 1.0),
            bzero: header.float_or("BZERO", 0.0),
            blank: if bitpix.is_float() {
                None
            } else {
                header.get_int("BLANK")
            },
        }
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.bscale == 1.0 && self.bzero == 0.0
    }

    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        if self.is_identity() {
            raw
        } else {
            self.bzero + self.bscale * raw
        }
    }

    /// Physical value, or `None` for blank and NaN samples.
    #[inline]
    pub fn physical<T: Voxel>(&self, value: T) -> Option<f64> {
        if self.blank.is_some() && value.as_i64() == self.blank {
            return None;
        }
        let raw = value.to_f64();
        if raw.is_nan() {
            return None;
        }
        Some(self.apply(raw))
    }
}

/// Typed voxel array with its per-axis extents, fastest axis first.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelBuffer {
    data: VoxelData,
    extents: Vec<usize>,
    components: usize,
    scaling: Scaling,
}

impl VoxelBuffer {
    pub fn new(data: VoxelData, extents: Vec<usize>, components: usize, scaling: Scaling) -> Result<Self> {
        if extents.is_empty() || extents.len() > 3 {
            return Err(FitsError::InvalidDimensions(format!(
                "expected 1 to 3 axes, got {}",
                extents.len()
            )));
        }
        if components == 0 {
            return Err(FitsError::UnsupportedComponents(0));
        }
        let expected = extents
            .iter()
            .try_fold(components, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| FitsError::InvalidDimensions(format!("extents {extents:?} overflow")))?;
        if expected != data.len() {
            return Err(FitsError::InvalidDimensions(format!(
                "extents {:?} x {} components need {} elements, buffer holds {}",
                extents,
                components,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            extents,
            components,
            scaling,
        })
    }

    /// Stand-in volume used when no real data is available: a single voxel
    /// with four components.
    pub fn placeholder() -> Self {
        Self {
            data: VoxelData::F64(vec![0.0, 125.0, 0.0, 0.0]),
            extents: vec![1, 1, 1],
            components: 4,
            scaling: Scaling::default(),
        }
    }

    #[inline]
    pub fn data(&self) -> &VoxelData {
        &self.data
    }

    #[inline]
    pub fn bitpix(&self) -> BitPix {
        self.data.bitpix()
    }

    #[inline]
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    #[inline]
    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }

    pub fn voxel_count(&self) -> usize {
        self.extents.iter().product()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice<T: Voxel>(&self) -> Option<&[T]> {
        self.data.as_slice()
    }

    pub fn visit<V: VoxelVisitor>(&self, visitor: V) -> V::Output {
        self.data.visit(visitor)
    }
}
