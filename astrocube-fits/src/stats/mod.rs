//! Range and boundary-band noise statistics over a loaded volume.

pub mod reduce;
pub mod volume;

pub use reduce::{BandMoments, BandReducer, RangeReducer, ValueRange};
pub use volume::{
    noise_bands, noise_estimate, value_range, VolumeStatistics, DATAMAX_KEY, DATAMIN_KEY,
    MIN_NOISE_PLANES, NOISE_MEAN_KEY, RMS_KEY,
};
