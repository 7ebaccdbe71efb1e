pub mod arc;
pub mod builder;
pub mod centroid;
pub mod error;
pub mod result;
pub mod width;

pub use arc::{Point, create_arc, path_length};
pub use builder::{ArcBuilder, ArcStyle};
pub use centroid::{AliasTable, CentroidEntry, CentroidSource, CentroidTable, resolve_centroid};
pub use error::GeoError;
pub use result::{ArcDescriptor, ArcSet, CentroidFailure};
pub use width::{WidthProfile, WidthSegment};
