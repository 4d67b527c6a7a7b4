//! Track format conversions
//!
//! GPX text is converted to GeoJSON, and GeoJSON to an unquantized TopoJSON
//! topology. Both conversions are pure; caching is the pipeline's business.

pub mod geojson;
pub mod gpx;
pub mod topology;

pub use geojson::{Feature, FeatureCollection, Geometry, Position};
pub use gpx::to_geojson;
pub use topology::{topology, ArcIndex, TopoGeometry, Topology};
