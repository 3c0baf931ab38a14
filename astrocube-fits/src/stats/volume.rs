use std::ops::Range;

use tracing::debug;

use super::reduce::{BandMoments, BandReducer, RangeReducer, ValueRange};
use crate::fits::data::VoxelBuffer;
use crate::fits::header::HeaderStore;
use crate::fits::{FitsError, Result};

pub const DATAMIN_KEY: &str = "DATAMIN";
pub const DATAMAX_KEY: &str = "DATAMAX";
pub const RMS_KEY: &str = "RMS";
pub const NOISE_MEAN_KEY: &str = "NOISEMEAN";

/// Planes needed along the slowest axis for the two noise bands.
pub const MIN_NOISE_PLANES: usize = 4;

/// Summary values the display layer derives its defaults from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeStatistics {
    pub min: f64,
    pub max: f64,
    /// Average standard deviation of the two boundary bands.
    pub noise: f64,
    /// Average mean of the two boundary bands.
    pub noise_mean: f64,
}

impl VolumeStatistics {
    pub fn compute(buffer: &VoxelBuffer) -> Result<Self> {
        let range = value_range(buffer)?;
        let (noise, noise_mean) = noise_estimate(buffer)?;
        let stats = Self {
            min: range.min,
            max: range.max,
            noise,
            noise_mean,
        };
        debug!(
            min = stats.min,
            max = stats.max,
            noise = stats.noise,
            noise_mean = stats.noise_mean,
            "volume statistics"
        );
        Ok(stats)
    }

    pub fn write_attributes(&self, attributes: &mut HeaderStore) {
        attributes.insert(DATAMIN_KEY, self.min.to_string());
        attributes.insert(DATAMAX_KEY, self.max.to_string());
        attributes.insert(RMS_KEY, self.noise.to_string());
        attributes.insert(NOISE_MEAN_KEY, self.noise_mean.to_string());
    }
}

/// Min and max over every element, all components included.
pub fn value_range(buffer: &VoxelBuffer) -> Result<ValueRange> {
    if buffer.is_empty() {
        return Err(FitsError::DegenerateVolume(format!(
            "extents {:?} hold no elements",
            buffer.extents()
        )));
    }
    buffer
        .visit(RangeReducer {
            scaling: buffer.scaling(),
        })
        .ok_or_else(|| FitsError::DegenerateVolume("every sample is blank or NaN".to_string()))
}

/// Element ranges of the two noise bands along the slowest axis.
///
/// With plane size `P` and `n` planes the bands are `[2P, 4P)` and
/// `[(n-4)P, (n-2)P)`: two planes each, two planes in from either end.
pub fn noise_bands(extents: &[usize]) -> Result<[Range<usize>; 2]> {
    let Some((&planes, faster)) = extents.split_last() else {
        return Err(FitsError::DegenerateVolume("volume has no axes".to_string()));
    };
    if planes < MIN_NOISE_PLANES {
        return Err(FitsError::DegenerateVolume(format!(
            "noise estimate needs {} planes along axis {}, found {}",
            MIN_NOISE_PLANES,
            extents.len(),
            planes
        )));
    }
    let plane: usize = faster.iter().product();
    if plane == 0 {
        return Err(FitsError::DegenerateVolume(format!(
            "extents {extents:?} hold no elements"
        )));
    }
    Ok([
        2 * plane..4 * plane,
        (planes - 4) * plane..(planes - 2) * plane,
    ])
}

/// `(noise, mean)` from the two boundary bands.
pub fn noise_estimate(buffer: &VoxelBuffer) -> Result<(f64, f64)> {
    if buffer.components() != 1 {
        return Err(FitsError::UnsupportedComponents(buffer.components()));
    }
    let [first, second] = noise_bands(buffer.extents())?;
    let first = band_moments(buffer, first)?;
    let second = band_moments(buffer, second)?;
    Ok((
        (first.std_dev + second.std_dev) / 2.0,
        (first.mean + second.mean) / 2.0,
    ))
}

fn band_moments(buffer: &VoxelBuffer, range: Range<usize>) -> Result<BandMoments> {
    let label = format!("{}..{}", range.start, range.end);
    buffer
        .visit(BandReducer {
            scaling: buffer.scaling(),
            range,
        })
        .ok_or_else(|| {
            FitsError::DegenerateVolume(format!("noise band {label} has no valid samples"))
        })
}
