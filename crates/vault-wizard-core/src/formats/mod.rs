//! # Formats Module
//!
//! Binary snapshot format for wizard sessions. File I/O lives in the app
//! layer.

mod persistence;

pub use persistence::*;
