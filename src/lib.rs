#![doc = "C-oriented schematization of polygonal subdivisions"]
pub mod boundary;
pub mod classify;
pub mod config;
pub mod configuration;
pub mod error;
pub mod geometry;
pub mod io;
pub mod orientation;
pub mod staircase;
pub mod subdivision;

#[doc(inline)]
pub use config::{Config, Directions};

#[doc(inline)]
pub use error::{Result, SchematizeError};

#[doc(inline)]
pub use orientation::{DirectionSet, Sector};

#[doc(inline)]
pub use classify::{EdgeClass, OrientationClass};

#[doc(inline)]
pub use subdivision::{Phase, SchematicDcel, Subdivision};

#[doc(inline)]
pub use io::geojson::{read_geojson, write_geojson, FeatureCollection};

pub use geograph;
