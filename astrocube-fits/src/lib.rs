//! Reader for FITS image cubes.
//!
//! Decodes the primary header (with legacy GIPSY repairs), derives the WCS
//! and its RAS display transform, loads the typed voxel array and computes
//! range and noise statistics over it.

pub mod config;
pub mod core;
pub mod fits;
pub mod stats;

pub use astrocube_wcs::{Affine4, OriginMode, WcsStatus};
pub use config::ReaderConfig;
pub use self::core::{BitPix, ByteOrder};
pub use fits::io::{can_read, file_extensions};
pub use fits::{
    CubeFile, CubeReader, DataLayout, Extent, FitsError, HeaderStatus, HeaderStore, LegacyFix,
    Result, Scaling, Voxel, VoxelBuffer, VoxelData, VoxelVisitor, WcsInfo,
};
pub use stats::VolumeStatistics;
