//! Parallel Ed25519 vanity-address search for Solana.
//!
//! A Base58 prefix is compiled once into a set of inclusive 32-byte ranges so
//! that candidate testing in the hot loop is a plain byte comparison instead
//! of a per-key Base58 encode. CPU workers walk the scalar space from random
//! starting points; an optional OpenCL worker searches batches of 2^24
//! candidates per kernel launch.

pub mod error;
pub mod estimate;
pub mod gpu;
pub mod keys;
pub mod matcher;
pub mod worker;

pub use error::Error;
pub use estimate::{estimate_confidence, ConfidenceEstimates};
pub use gpu::{GpuOptions, GpuSearcher};
pub use matcher::{Matcher, PubkeyRange};
pub use worker::{Found, SearchContext};
