//! Data shared between the exporter and anything that reads its output:
//! the scene snapshot handed over by the host, the transform conversion into the
//! archive convention and the BOXF container layout.

mod asset;
pub mod archive;
pub mod transform;

pub use asset::*;
