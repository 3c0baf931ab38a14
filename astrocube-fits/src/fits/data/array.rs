use std::fmt::Debug;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use super::buffer::VoxelData;
use crate::core::{BitPix, ByteOrder};
use crate::fits::{FitsError, Result};

/// One of the closed set of FITS element types.
///
/// Every type-dependent step (decoding, reductions) goes through this trait,
/// so adding an element type means one impl plus one [`VoxelData`] variant.
pub trait Voxel: Copy + Default + PartialOrd + Debug + Send + Sync + 'static {
    const BITPIX: BitPix;

    /// `bytes.len()` must equal `out.len()` times the element size.
    fn decode_into(bytes: &[u8], byte_order: ByteOrder, out: &mut [Self]);

    fn to_f64(self) -> f64;

    /// Integer value for `BLANK` comparison; `None` for floating types.
    fn as_i64(self) -> Option<i64>;

    fn wrap(data: Vec<Self>) -> VoxelData;

    fn slice(data: &VoxelData) -> Option<&[Self]>;

    fn decode(bytes: &[u8], byte_order: ByteOrder) -> Result<Vec<Self>> {
        let size = Self::BITPIX.bytes_per_pixel();
        if bytes.len() % size != 0 {
            return Err(FitsError::InvalidFormat(format!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                Self::BITPIX.type_name()
            )));
        }
        let mut out = vec![Self::default(); bytes.len() / size];
        Self::decode_into(bytes, byte_order, &mut out);
        Ok(out)
    }
}

impl Voxel for u8 {
    const BITPIX: BitPix = BitPix::U8;

    fn decode_into(bytes: &[u8], _byte_order: ByteOrder, out: &mut [Self]) {
        out.copy_from_slice(bytes);
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn as_i64(self) -> Option<i64> {
        Some(self as i64)
    }

    fn wrap(data: Vec<Self>) -> VoxelData {
        VoxelData::U8(data)
    }

    fn slice(data: &VoxelData) -> Option<&[Self]> {
        match data {
            VoxelData::U8(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_voxel {
    (@impl $ty:ty, $bitpix:ident, $variant:ident, $read_into:ident, $as_i64:expr) => {
        impl Voxel for $ty {
            const BITPIX: BitPix = BitPix::$bitpix;

            fn decode_into(bytes: &[u8], byte_order: ByteOrder, out: &mut [Self]) {
                match byte_order {
                    ByteOrder::BigEndian => BigEndian::$read_into(bytes, out),
                    ByteOrder::LittleEndian => LittleEndian::$read_into(bytes, out),
                }
            }

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn as_i64(self) -> Option<i64> {
                ($as_i64)(self)
            }

            fn wrap(data: Vec<Self>) -> VoxelData {
                VoxelData::$variant(data)
            }

            fn slice(data: &VoxelData) -> Option<&[Self]> {
                match data {
                    VoxelData::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
    ($ty:ty, $bitpix:ident, $variant:ident, $read_into:ident, int) => {
        impl_voxel!(@impl $ty, $bitpix, $variant, $read_into, |v: $ty| Some(v as i64));
    };
    ($ty:ty, $bitpix:ident, $variant:ident, $read_into:ident, float) => {
        impl_voxel!(@impl $ty, $bitpix, $variant, $read_into, |_: $ty| None);
    };
}

impl_voxel!(i16, I16, I16, read_i16_into, int);
impl_voxel!(i32, I32, I32, read_i32_into, int);
impl_voxel!(i64, I64, I64, read_i64_into, int);
impl_voxel!(f32, F32, F32, read_f32_into, float);
impl_voxel!(f64, F64, F64, read_f64_into, float);

fn decode_typed<T: Voxel>(bytes: &[u8], byte_order: ByteOrder) -> Result<VoxelData> {
    Ok(T::wrap(T::decode(bytes, byte_order)?))
}

/// Decodes a raw segment into the element type named by `bitpix`.
pub fn decode_segment(bitpix: BitPix, bytes: &[u8], byte_order: ByteOrder) -> Result<VoxelData> {
    match bitpix {
        BitPix::U8 => decode_typed::<u8>(bytes, byte_order),
        BitPix::I16 => decode_typed::<i16>(bytes, byte_order),
        BitPix::I32 => decode_typed::<i32>(bytes, byte_order),
        BitPix::I64 => decode_typed::<i64>(bytes, byte_order),
        BitPix::F32 => decode_typed::<f32>(bytes, byte_order),
        BitPix::F64 => decode_typed::<f64>(bytes, byte_order),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_i16_big_endian() {
        let bytes = [0x00, 0x01, 0xFF, 0xFE, 0x7F, 0xFF];
        let values = i16::decode(&bytes, ByteOrder::BigEndian).unwrap();
        assert_eq!(values, vec![1, -2, i16::MAX]);
    }

    #[test]
    fn decode_i16_little_endian() {
        let bytes = [0x01, 0x00, 0xFE, 0xFF];
        let values = i16::decode(&bytes, ByteOrder::LittleEndian).unwrap();
        assert_eq!(values, vec![1, -2]);
    }

    #[test]
    fn decode_f32_big_endian() {
        let mut bytes = Vec::new();
        for v in [1.5f32, -0.25, f32::NAN] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
        let values = f32::decode(&bytes, ByteOrder::BigEndian).unwrap();
        assert_eq!(values[0], 1.5);
        assert_eq!(values[1], -0.25);
        assert!(values[2].is_nan());
    }

    #[test]
    fn decode_f64_and_i64() {
        let bytes = 2.5f64.to_be_bytes();
        assert_eq!(f64::decode(&bytes, ByteOrder::BigEndian).unwrap(), vec![2.5]);
        let bytes = (-7i64).to_be_bytes();
        assert_eq!(i64::decode(&bytes, ByteOrder::BigEndian).unwrap(), vec![-7]);
    }

    #[test]
    fn decode_rejects_partial_elements() {
        let result = i32::decode(&[0, 0, 1], ByteOrder::BigEndian);
        assert!(matches!(result, Err(FitsError::InvalidFormat(_))));
    }

    #[test]
    fn blank_comparison_only_for_integers() {
        assert_eq!((-32768i16).as_i64(), Some(-32768));
        assert_eq!(200u8.as_i64(), Some(200));
        assert_eq!(1.0f32.as_i64(), None);
        assert_eq!(1.0f64.as_i64(), None);
    }

    #[test]
    fn decode_segment_dispatches_on_bitpix() {
        let bytes = [0u8, 1, 0, 2, 0, 3, 0, 4];
        let data = decode_segment(BitPix::I16, &bytes, ByteOrder::BigEndian).unwrap();
        assert_eq!(data.bitpix(), BitPix::I16);
        assert_eq!(data.as_slice::<i16>(), Some(&[1i16, 2, 3, 4][..]));

        let data = decode_segment(BitPix::U8, &bytes, ByteOrder::BigEndian).unwrap();
        assert_eq!(data.len(), 8);
        assert_eq!(data.as_slice::<i16>(), None);
    }
}
