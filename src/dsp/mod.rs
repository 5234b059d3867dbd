//! DSP: the player's signal chain in pure Rust.
//!
//! Nodes mirror the WebAudio ones the browser player is built from (gain,
//! biquad, convolver, analyser) so the same parameter mappings drive both a
//! WASM host and native rendering.

pub mod analyser;
pub mod convolver;
pub mod filter;
pub mod graph;
pub mod impulse;
pub mod param;
pub mod reverb;
