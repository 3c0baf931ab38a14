use std::ops::Range;

use crate::fits::{FitsError, Result};

/// Half-open index ranges per axis, fastest axis first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extent {
    ranges: Vec<Range<usize>>,
}

/// A contiguous stretch of the data segment, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub offset: usize,
    pub len: usize,
}

impl Extent {
    pub fn new(ranges: Vec<Range<usize>>) -> Self {
        Self { ranges }
    }

    /// The whole volume.
    pub fn full(extents: &[usize]) -> Self {
        Self {
            ranges: extents.iter().map(|&n| 0..n).collect(),
        }
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn shape(&self) -> Vec<usize> {
        self.ranges.iter().map(|r| r.len()).collect()
    }

    pub fn element_count(&self) -> usize {
        self.ranges.iter().map(|r| r.len()).product()
    }

    pub fn validate(&self, extents: &[usize]) -> Result<()> {
        if self.ranges.len() != extents.len() {
            return Err(FitsError::InvalidExtent(format!(
                "extent has {} axes, volume has {}",
                self.ranges.len(),
                extents.len()
            )));
        }
        for (axis, (range, &n)) in self.ranges.iter().zip(extents).enumerate() {
            if range.start >= range.end || range.end > n {
                return Err(FitsError::InvalidExtent(format!(
                    "axis {} range {}..{} outside 0..{}",
                    axis + 1,
                    range.start,
                    range.end,
                    n
                )));
            }
        }
        Ok(())
    }

    /// Contiguous runs covering the extent in storage order, adjacent runs
    /// merged. Call [`Extent::validate`] first.
    pub fn runs(&self, extents: &[usize]) -> Vec<Run> {
        if self.element_count() == 0 {
            return Vec::new();
        }
        let Some((fastest, outer)) = self.ranges.split_first() else {
            return Vec::new();
        };

        let mut strides = Vec::with_capacity(extents.len());
        let mut stride = 1;
        for &n in extents {
            strides.push(stride);
            stride *= n;
        }

        let row_len = fastest.len();
        let mut runs: Vec<Run> = Vec::new();
        let mut index: Vec<usize> = outer.iter().map(|r| r.start).collect();

        loop {
            let offset = fastest.start
                + index
                    .iter()
                    .zip(&strides[1..])
                    .map(|(i, s)| i * s)
                    .sum::<usize>();

            match runs.last_mut() {
                Some(last) if last.offset + last.len == offset => last.len += row_len,
                _ => runs.push(Run {
                    offset,
                    len: row_len,
                }),
            }

            // odometer over the outer axes
            let mut axis = 0;
            loop {
                if axis == index.len() {
                    return runs;
                }
                index[axis] += 1;
                if index[axis] < outer[axis].end {
                    break;
                }
                index[axis] = outer[axis].start;
                axis += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_extent_is_one_run() {
        let extents = [4, 3, 2];
        let extent = Extent::full(&extents);
        extent.validate(&extents).unwrap();
        assert_eq!(extent.shape(), vec![4, 3, 2]);
        assert_eq!(extent.runs(&extents), vec![Run { offset: 0, len: 24 }]);
    }

    #[test]
    fn row_subset_gives_strided_runs() {
        let extents = [4, 3, 2];
        let extent = Extent::new(vec![1..3, 0..3, 1..2]);
        extent.validate(&extents).unwrap();
        assert_eq!(extent.element_count(), 6);
        assert_eq!(
            extent.runs(&extents),
            vec![
                Run { offset: 13, len: 2 },
                Run { offset: 17, len: 2 },
                Run { offset: 21, len: 2 },
            ]
        );
    }

    #[test]
    fn full_rows_merge_into_planes() {
        let extents = [4, 3, 5];
        let extent = Extent::new(vec![0..4, 0..3, 2..4]);
        assert_eq!(extent.runs(&extents), vec![Run { offset: 24, len: 24 }]);
    }

    #[test]
    fn one_dimensional_extent() {
        let extents = [10];
        let extent = Extent::new(vec![3..7]);
        extent.validate(&extents).unwrap();
        assert_eq!(extent.runs(&extents), vec![Run { offset: 3, len: 4 }]);
    }

    #[test]
    fn zero_length_axis_has_no_runs() {
        let extents = [4, 0, 8];
        let extent = Extent::full(&extents);
        assert_eq!(extent.element_count(), 0);
        assert!(extent.runs(&extents).is_empty());
    }

    #[test]
    fn validate_rejects_bad_ranges() {
        let extents = [4, 4];
        assert!(Extent::new(vec![0..4]).validate(&extents).is_err());
        assert!(Extent::new(vec![0..5, 0..4]).validate(&extents).is_err());
        assert!(Extent::new(vec![2..2, 0..4]).validate(&extents).is_err());
        let err = Extent::new(vec![0..4, 3..9]).validate(&extents).unwrap_err();
        assert!(err.to_string().contains("axis 2"));
    }
}
