use std::ops::Range;

use crate::fits::data::{Scaling, Voxel, VoxelVisitor};

/// Smallest and largest physical value, and how many samples contributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Single pass min/max over every sample, skipping blanks and NaNs.
pub struct RangeReducer<'a> {
    pub scaling: &'a Scaling,
}

impl VoxelVisitor for RangeReducer<'_> {
    type Output = Option<ValueRange>;

    fn visit<T: Voxel>(self, data: &[T]) -> Option<ValueRange> {
        let mut values = data.iter().filter_map(|&v| self.scaling.physical(v));
        let first = values.next()?;
        let mut range = ValueRange {
            min: first,
            max: first,
            count: 1,
        };
        for v in values {
            if v < range.min {
                range.min = v;
            }
            if v > range.max {
                range.max = v;
            }
            range.count += 1;
        }
        Some(range)
    }
}

/// Mean and population standard deviation of one band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandMoments {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// Two-pass moments over `data[range]`: the mean first, then the spread
/// around that mean.
pub struct BandReducer<'a> {
    pub scaling: &'a Scaling,
    pub range: Range<usize>,
}

impl VoxelVisitor for BandReducer<'_> {
    type Output = Option<BandMoments>;

    fn visit<T: Voxel>(self, data: &[T]) -> Option<BandMoments> {
        let band = data.get(self.range)?;
        let scaling = self.scaling;

        let (sum, count) = band
            .iter()
            .filter_map(|&v| scaling.physical(v))
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        if count == 0 {
            return None;
        }
        let mean = sum / count as f64;

        let squares: f64 = band
            .iter()
            .filter_map(|&v| scaling.physical(v))
            .map(|v| (v - mean) * (v - mean))
            .sum();

        Some(BandMoments {
            count,
            mean,
            std_dev: libm::sqrt(squares / count as f64),
        })
    }
}
