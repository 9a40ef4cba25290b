//! Load profiles: the common currency between device models and schedules.

pub mod commodity;
pub mod compression;
pub mod load_profile;

pub use commodity::{Commodity, CommodityMap};
pub use compression::{CompressionType, LoadProfileCompression};
pub use load_profile::LoadProfile;
