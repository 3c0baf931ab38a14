pub mod reader;

pub use reader::{can_read, file_extensions, CubeFile, CubeReader, DataLayout};
