pub mod data;
pub mod errors;
pub mod header;
pub mod io;
pub mod wcs;

pub use data::{Extent, Scaling, Voxel, VoxelBuffer, VoxelData, VoxelVisitor};
pub use errors::{FitsError, Result};
pub use header::{HeaderStatus, HeaderStore, LegacyFix};
pub use io::{CubeFile, CubeReader, DataLayout};
pub use wcs::WcsInfo;
