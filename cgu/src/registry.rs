//! # Clock Node Registry
//!
//! Static, per-SoC description of every clock node. A registry is pure
//! data: descriptor rows carrying a kind tag and the kind-specific register
//! geometry, plus the parent wiring between ids. No hardware is touched
//! here; [`crate::tree::ClockTree::build`] turns a validated registry into
//! live nodes.
//!
//! Construction is two-phase: rows are collected first, then every parent
//! reference is resolved by id lookup, so declaration order does not
//! matter. Validation rejects duplicate ids, dangling parents and cycles.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::error::BuildError;

/// Maximum number of selectable parents per node.
pub const MAX_PARENTS: usize = 4;

// ============================================================================
// Clock Id
// ============================================================================

/// Stable numeric identifier of a clock node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockId(u16);

impl ClockId {
    /// Create an id from its raw value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    pub const fn raw(self) -> u16 {
        self.0
    }
}

// ============================================================================
// Flags
// ============================================================================

bitflags! {
    /// Per-node behavior flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClockFlags: u32 {
        /// Never hardware-disabled, and enabled once during tree build.
        const CRITICAL = 1 << 0;
    }
}

bitflags! {
    /// Gate polarity flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GateFlags: u32 {
        /// Writing 1 to the gate bit stops the clock (the common CLKGR
        /// polarity); without this flag, 1 means running.
        const SET_TO_DISABLE = 1 << 0;
    }
}

// ============================================================================
// Kind Descriptors
// ============================================================================

/// PLL register geometry and rate table.
///
/// Rate is `parent * m / (n * od1 * od0)` where the od fields decode
/// through [`PllDesc::od_encoding`].
#[derive(Debug, Clone, Copy)]
pub struct PllDesc {
    /// Control register offset.
    pub reg: u32,
    /// Multiplier field position.
    pub m_shift: u8,
    /// Multiplier field width.
    pub m_width: u8,
    /// Pre-divider field position.
    pub n_shift: u8,
    /// Pre-divider field width.
    pub n_width: u8,
    /// First output-divider field position.
    pub od1_shift: u8,
    /// First output-divider field width.
    pub od1_width: u8,
    /// Second output-divider field position.
    pub od0_shift: u8,
    /// Second output-divider field width.
    pub od0_width: u8,
    /// Enable bit within the control register.
    pub enable_bit: u8,
    /// Lock/stable status bit within the control register.
    pub stable_bit: u8,
    /// Output-divider decode table, indexed by field value; an entry of 0
    /// marks an undefined encoding.
    pub od_encoding: &'static [u32],
    /// Discrete rate table searched by `set_rate`.
    pub rate_table: &'static [PllRate],
}

/// One entry of a PLL rate table. `od1`/`od0` hold field encodings, not
/// divider values.
#[derive(Debug, Clone, Copy)]
pub struct PllRate {
    /// Output rate in Hz.
    pub rate: u64,
    /// Multiplier field value.
    pub m: u32,
    /// Pre-divider field value.
    pub n: u32,
    /// First output-divider field encoding.
    pub od1: u32,
    /// Second output-divider field encoding.
    pub od0: u32,
}

/// Parent-select mux geometry.
#[derive(Debug, Clone, Copy)]
pub struct MuxDesc {
    /// Select register offset.
    pub reg: u32,
    /// Select field position.
    pub shift: u8,
    /// Select field width.
    pub width: u8,
}

/// One row of an explicit divider table (field value -> divisor).
#[derive(Debug, Clone, Copy)]
pub struct DivEntry {
    /// Field value as programmed into the register.
    pub value: u32,
    /// Resulting divisor.
    pub div: u32,
}

/// Integer divider geometry.
///
/// Without a table the field encodes `divisor - 1`. When `ce_bit` is
/// present, rate changes run the change-enable/busy handshake; `stop_bit`
/// additionally gives the divider an enable/disable protocol.
#[derive(Debug, Clone, Copy)]
pub struct DivDesc {
    /// Divider register offset.
    pub reg: u32,
    /// Divider field position.
    pub shift: u8,
    /// Divider field width.
    pub width: u8,
    /// Change-enable bit, if the divider has a handshake.
    pub ce_bit: Option<u8>,
    /// Busy bit polled during the handshake (same register).
    pub busy_bit: Option<u8>,
    /// Clock-stop bit, if the divider can be stopped.
    pub stop_bit: Option<u8>,
    /// Explicit value->divisor table overriding the `val + 1` encoding.
    pub table: Option<&'static [DivEntry]>,
}

/// Bus divider field-programming mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDivMode {
    /// Program only the first field.
    Single,
    /// Program both fields with the same divisor.
    Dual,
    /// Program the second field with half the divisor (one physical line
    /// feeding two derived rates at a 2:1 ratio).
    DualHalf,
}

/// Bus divider geometry: one or two divider fields in a config register
/// plus a busy bit in a separate status register.
#[derive(Debug, Clone, Copy)]
pub struct BusDivDesc {
    /// Config register offset.
    pub reg: u32,
    /// First divider field position.
    pub shift1: u8,
    /// First divider field width.
    pub width1: u8,
    /// Second divider field position.
    pub shift2: u8,
    /// Second divider field width.
    pub width2: u8,
    /// Change-enable bit within the config register.
    pub ce_bit: u8,
    /// Status register offset holding the busy bit.
    pub busy_reg: u32,
    /// Busy bit within the status register.
    pub busy_bit: u8,
    /// Field-programming mode.
    pub mode: BusDivMode,
}

/// Fractional divider geometry. Rate is `parent * m / n`.
#[derive(Debug, Clone, Copy)]
pub struct FracDesc {
    /// Divider register offset.
    pub reg: u32,
    /// Numerator field position.
    pub m_shift: u8,
    /// Numerator field width.
    pub m_width: u8,
    /// Denominator field position.
    pub n_shift: u8,
    /// Denominator field width.
    pub n_width: u8,
}

/// Single-bit clock gate.
#[derive(Debug, Clone, Copy)]
pub struct GateDesc {
    /// Gate register offset.
    pub reg: u32,
    /// Gate bit.
    pub bit: u8,
    /// Polarity.
    pub flags: GateFlags,
}

/// Kind tag plus kind-specific hardware description.
#[derive(Debug, Clone, Copy)]
pub enum ClockKind {
    /// Immutable leaf source.
    Fixed {
        /// Rate in Hz.
        rate: u64,
    },
    /// Phase-locked loop.
    Pll(PllDesc),
    /// Parent selector.
    Mux(MuxDesc),
    /// Integer divider.
    Div(DivDesc),
    /// Bus divider with handshake.
    BusDiv(BusDivDesc),
    /// Fractional m/n divider.
    FracDiv(FracDesc),
    /// Clock gate.
    Gate(GateDesc),
}

// ============================================================================
// Descriptor Rows
// ============================================================================

/// One registry row: id, name, kind and parent wiring.
#[derive(Debug, Clone, Copy)]
pub struct ClockDesc {
    /// Stable id.
    pub id: ClockId,
    /// Lookup name.
    pub name: &'static str,
    /// Kind tag and hardware description.
    pub kind: ClockKind,
    /// Parent slots. Non-mux kinds use slot 0; unset mux slots are fixed
    /// at build and can never be selected.
    pub parents: [Option<ClockId>; MAX_PARENTS],
    /// Behavior flags.
    pub flags: ClockFlags,
}

const NO_PARENTS: [Option<ClockId>; MAX_PARENTS] = [None, None, None, None];

/// Parent array with only slot 0 set.
pub const fn one_parent(parent: ClockId) -> [Option<ClockId>; MAX_PARENTS] {
    [Some(parent), None, None, None]
}

impl ClockDesc {
    /// Fixed-rate source row.
    pub const fn fixed(id: ClockId, name: &'static str, rate: u64) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::Fixed { rate },
            parents: NO_PARENTS,
            flags: ClockFlags::empty(),
        }
    }

    /// PLL row.
    pub const fn pll(id: ClockId, name: &'static str, parent: ClockId, desc: PllDesc) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::Pll(desc),
            parents: one_parent(parent),
            flags: ClockFlags::empty(),
        }
    }

    /// Mux row.
    pub const fn mux(
        id: ClockId,
        name: &'static str,
        parents: [Option<ClockId>; MAX_PARENTS],
        desc: MuxDesc,
    ) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::Mux(desc),
            parents,
            flags: ClockFlags::empty(),
        }
    }

    /// Integer divider row.
    pub const fn div(id: ClockId, name: &'static str, parent: ClockId, desc: DivDesc) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::Div(desc),
            parents: one_parent(parent),
            flags: ClockFlags::empty(),
        }
    }

    /// Bus divider row.
    pub const fn bus_div(
        id: ClockId,
        name: &'static str,
        parent: ClockId,
        desc: BusDivDesc,
    ) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::BusDiv(desc),
            parents: one_parent(parent),
            flags: ClockFlags::empty(),
        }
    }

    /// Fractional divider row.
    pub const fn frac_div(id: ClockId, name: &'static str, parent: ClockId, desc: FracDesc) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::FracDiv(desc),
            parents: one_parent(parent),
            flags: ClockFlags::empty(),
        }
    }

    /// Gate row.
    pub const fn gate(id: ClockId, name: &'static str, parent: ClockId, desc: GateDesc) -> Self {
        Self {
            id,
            name,
            kind: ClockKind::Gate(desc),
            parents: one_parent(parent),
            flags: ClockFlags::empty(),
        }
    }

    /// Replace the flag word.
    pub const fn with_flags(mut self, flags: ClockFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Kind tag name, for diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self.kind {
            ClockKind::Fixed { .. } => "fixed",
            ClockKind::Pll(_) => "pll",
            ClockKind::Mux(_) => "mux",
            ClockKind::Div(_) => "div",
            ClockKind::BusDiv(_) => "bus_div",
            ClockKind::FracDiv(_) => "frac_div",
            ClockKind::Gate(_) => "gate",
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A validated set of clock descriptors.
///
/// Rows keep their declaration order; ids map to rows through an index so
/// the id space does not have to be dense.
#[derive(Debug)]
pub struct Registry {
    descs: Vec<ClockDesc>,
    slot_of: BTreeMap<u16, usize>,
}

impl Registry {
    /// Validate a descriptor table.
    pub fn new(descs: &[ClockDesc]) -> Result<Self, BuildError> {
        let mut slot_of = BTreeMap::new();
        for (slot, desc) in descs.iter().enumerate() {
            if slot_of.insert(desc.id.raw(), slot).is_some() {
                return Err(BuildError::DuplicateId(desc.id));
            }
        }

        for desc in descs {
            for parent in desc.parents.iter().flatten() {
                if !slot_of.contains_key(&parent.raw()) {
                    return Err(BuildError::DanglingParent(*parent));
                }
            }
        }

        let registry = Self {
            descs: descs.to_vec(),
            slot_of,
        };
        registry.check_acyclic()?;
        Ok(registry)
    }

    /// Reject any cycle in the parent graph (iterative three-color DFS).
    fn check_acyclic(&self) -> Result<(), BuildError> {
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;

        let mut color = alloc::vec![WHITE; self.descs.len()];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for start in 0..self.descs.len() {
            if color[start] != WHITE {
                continue;
            }
            color[start] = GREY;
            stack.push((start, 0));

            while let Some(&(slot, edge)) = stack.last() {
                if edge >= MAX_PARENTS {
                    color[slot] = BLACK;
                    stack.pop();
                    continue;
                }
                stack.last_mut().unwrap().1 += 1;

                if let Some(parent) = self.descs[slot].parents[edge] {
                    let pslot = self.slot_of[&parent.raw()];
                    match color[pslot] {
                        GREY => return Err(BuildError::CycleDetected(parent)),
                        WHITE => {
                            color[pslot] = GREY;
                            stack.push((pslot, 0));
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    /// True if the registry holds no rows.
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Row position of an id.
    pub fn slot(&self, id: ClockId) -> Option<usize> {
        self.slot_of.get(&id.raw()).copied()
    }

    /// Descriptor by id.
    pub fn get(&self, id: ClockId) -> Option<&ClockDesc> {
        self.slot(id).map(|slot| &self.descs[slot])
    }

    /// Descriptor by row position.
    pub fn desc_at(&self, slot: usize) -> &ClockDesc {
        &self.descs[slot]
    }

    /// Id whose descriptor carries `name`.
    pub fn find(&self, name: &str) -> Option<ClockId> {
        self.descs.iter().find(|d| d.name == name).map(|d| d.id)
    }

    /// Rows in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ClockDesc> {
        self.descs.iter()
    }

    /// Every register offset the table touches, deduplicated and sorted.
    /// This is the snapshot list for suspend/resume.
    pub fn register_offsets(&self) -> Vec<u32> {
        let mut offsets: Vec<u32> = Vec::new();
        for desc in &self.descs {
            match &desc.kind {
                ClockKind::Fixed { .. } => {}
                ClockKind::Pll(d) => offsets.push(d.reg),
                ClockKind::Mux(d) => offsets.push(d.reg),
                ClockKind::Div(d) => offsets.push(d.reg),
                ClockKind::BusDiv(d) => {
                    offsets.push(d.reg);
                    offsets.push(d.busy_reg);
                }
                ClockKind::FracDiv(d) => offsets.push(d.reg),
                ClockKind::Gate(d) => offsets.push(d.reg),
            }
        }
        offsets.sort_unstable();
        offsets.dedup();
        offsets
    }
}

// ============================================================================
// Tests
// ============================================================================
