//! # Per-SoC Clock Tables
//!
//! Static hardware descriptions, one module per supported chip. A table
//! module exports its register offsets, id constants and a `registry()`
//! constructor; everything else in the crate is SoC-agnostic.

pub mod t31;
