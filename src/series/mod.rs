// Series module - grouping of measurements for 3-D exploration
//
// - bucket: material text -> MaterialBucket (listed material, other, unknown)
// - axis: AxisKind / AxisSelection and the normalized -> SNV fallback
// - store: SeriesStore, the flat (bucket, identity) index with render handles

pub mod axis;
pub mod bucket;
pub mod store;

pub use axis::{AxisKind, AxisSelection};
pub use bucket::{BucketToggles, MaterialBucket, MaterialGroups};
pub use store::{Coordinate, RefreshReport, RenderHandle, SeriesEntry, SeriesKey, SeriesStore};
