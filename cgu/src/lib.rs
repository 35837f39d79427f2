//! # XBurst CGU
//!
//! Clock-generation-unit tree driver for the Ingenic T31 (XBurst) SoC
//! family. The CGU derives every peripheral clock from two crystals
//! through PLLs, muxes, dividers and gates; this crate models that tree
//! and speaks the register protocols that reconfigure it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  soc::t31      static ClockDesc table (ids, names, geometry)    │
//! │     │                                                           │
//! │     ▼                                                           │
//! │  registry      validate: duplicate ids, dangling parents,       │
//! │     │          cycles                                           │
//! │     ▼                                                           │
//! │  tree          live nodes, cached rates, refcounts, one lock    │
//! │     │ ops::*   per-kind register protocols (pll/div/bus/...)    │
//! │     │ propagate  precomputed dependent closures                 │
//! │     ▼                                                           │
//! │  io            RegisterIo: Mmio on hardware, RamRegisters in    │
//! │                tests and dry runs                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let registry = xburst_cgu::soc::t31::registry()?;
//! let io = unsafe { xburst_cgu::io::Mmio::new(cpm_base as *mut u32) };
//! let tree = xburst_cgu::ClockTree::build(registry, io)?;
//!
//! let uart = tree.lookup("gate_uart0").unwrap();
//! tree.enable(uart)?;
//! ```
//!
//! The tree is owned by the embedder and handed to consumers by
//! reference; one internal lock serializes all operations, so shared use
//! from several drivers is fine. Rate changes propagate to every
//! dependent clock before the call returns, and hardware-protocol
//! failures (busy-wait timeouts, undefined field encodings, off-table
//! rates) come back as typed errors instead of being logged and ignored.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

extern crate alloc;

pub mod dump;
pub mod error;
pub mod io;
pub mod ops;
mod propagate;
pub mod registry;
pub mod soc;
pub mod tree;

pub use dump::{render, ClockIter, ClockSummary};
pub use error::{BuildError, ClockError, ClockResult, RateError, StateError};
pub use io::{Mmio, RamRegisters, RegisterDump, RegisterIo};
pub use registry::{ClockDesc, ClockFlags, ClockId, ClockKind, Registry};
pub use tree::ClockTree;
