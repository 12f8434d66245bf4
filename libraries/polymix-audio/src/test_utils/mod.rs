//! Test utilities for audio testing
//!
//! Signal generation and analysis tools for verifying the decode,
//! resample, and mix paths.

pub mod analysis;
pub mod signals;

pub use analysis::*;
pub use signals::*;
