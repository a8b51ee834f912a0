//! # buggyrace-engine
//!
//! Replays a computed race as a paced animation. The [`ReplayEngine`] owns
//! all replay state, moves every buggy of a step concurrently, joins on the
//! whole step before judging the leader, and pushes everything a renderer or
//! log needs onto a single output stream.

pub mod engine;

pub use engine::{
    output, PlaybackSpeed, PlaybackState, ReplayEngine, ReplayError, ReplayHandle, ReplayOutput,
};
