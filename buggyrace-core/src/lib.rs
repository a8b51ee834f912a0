//! # buggyrace-core
//!
//! Foundation layer for race replays: the immutable race definition, the
//! closed track geometry buggies travel along, and the per-buggy motion model
//! that turns a discrete distance delta into a continuous interpolation.
//!
//! ### Key Submodules:
//! - `race`: race definition, starting buggies and per-step events
//! - `track`: `TrackGeometry` trait and the polyline implementation
//! - `motion`: unwrapped buggy distances, motion plans, lap arithmetic
//! - `clock`: race-time labels (`MM:SS/LAPn`)
//! - `source`: async race sources (file-backed and in-memory)

pub mod clock;
pub mod error;
pub mod motion;
pub mod race;
pub mod source;
pub mod track;

pub mod prelude {
    pub use crate::clock::*;
    pub use crate::error::*;
    pub use crate::motion::*;
    pub use crate::race::*;
    pub use crate::source::*;
    pub use crate::track::*;
}

pub use error::LoadError;
