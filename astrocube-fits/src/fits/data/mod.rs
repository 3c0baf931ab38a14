pub mod array;
pub mod buffer;
pub mod extent;

pub use array::{decode_segment, Voxel};
pub use buffer::{Scaling, VoxelBuffer, VoxelData, VoxelVisitor};
pub use extent::{Extent, Run};
