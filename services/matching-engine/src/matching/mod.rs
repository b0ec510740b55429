//! Matching rules
//!
//! Crossing detection for the continuous matching loop.

pub mod crossing;
