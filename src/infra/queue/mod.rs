//! Queue backends.

pub mod delayed;

pub use delayed::DelayedSet;
