//! World coordinate systems for astronomical image cubes.
//!
//! [`WcsBuilder`] turns FITS keywords (through any [`KeywordProvider`]) into an
//! immutable [`WcsDescriptor`]. Building never fails: degraded keyword sets
//! are reported through [`WcsStatus`] instead. [`RasTransform`] derives the
//! 4×4 voxel-to-display affine used to place a cube in RAS space.

pub mod builder;
pub mod descriptor;
pub mod error;
pub mod header;
pub mod linear;
pub mod ras;

pub use builder::WcsBuilder;
pub use descriptor::{AxisDescriptor, WcsDescriptor, WcsStatus};
pub use error::{WcsError, WcsResult};
pub use header::{KeywordMap, KeywordProvider};
pub use linear::LinearTransform;
pub use ras::{Affine4, OriginMode, RasTransform};
