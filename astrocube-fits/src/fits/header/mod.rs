pub mod parser;
pub mod repair;
pub mod store;

pub use parser::{
    decode, decode_from, DecodedHeader, HeaderCard, HeaderStatus, BLOCK_SIZE, RECORD_SIZE,
};
pub use repair::{repair_legacy_header, LegacyFix, RepairOutcome};
pub use store::HeaderStore;
