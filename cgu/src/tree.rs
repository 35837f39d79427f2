//! # Clock Tree
//!
//! Live clock nodes wired from a validated [`Registry`], owned by whoever
//! embeds the tree (there is no module-level singleton). One
//! [`spin::Mutex`] serializes every operation and is held across each
//! node's full register-write + busy-wait protocol, so no caller ever
//! observes a half-programmed divider. Clock changes are rare and cheap,
//! so reads share the same lock.
//!
//! Rates are cached per node as `Result` values: a node whose register
//! fields decode to something undefined reports [`RateError::InvalidEncoding`]
//! from `get_rate` instead of a made-up frequency. After any mutation the
//! cached rates of the changed node and all of its transitive dependents
//! are recomputed before the call returns. Hardware cannot be rolled back
//! once written, so a busy-wait timeout recomputes the cache from what the
//! registers actually hold and then surfaces the error (best-effort
//! consistency); failures detected before the first write leave both
//! hardware and cache untouched.

use alloc::vec::Vec;

use spin::Mutex;

use crate::error::{ClockResult, RateError, StateError};
use crate::io::{RegisterDump, RegisterIo};
use crate::ops::{bus, div, frac, gate, mux, pll};
use crate::propagate::DependencyMap;
use crate::registry::{ClockDesc, ClockFlags, ClockId, ClockKind, Registry, MAX_PARENTS};

/// One live clock node.
#[derive(Debug)]
pub(crate) struct Node {
    /// Registry row of the active parent, if any.
    pub(crate) parent_slot: Option<usize>,
    /// Cached effective rate, or why it cannot be decoded.
    pub(crate) cached: Result<u64, RateError>,
    /// Consumer refcount; hardware toggles only on the 0<->1 edges.
    pub(crate) enable_count: u32,
}

/// Mutable tree state guarded by the tree lock.
#[derive(Debug)]
pub(crate) struct TreeState<R> {
    pub(crate) io: R,
    pub(crate) nodes: Vec<Node>,
}

/// The clock tree.
#[derive(Debug)]
pub struct ClockTree<R: RegisterIo> {
    pub(crate) registry: Registry,
    deps: DependencyMap,
    pub(crate) state: Mutex<TreeState<R>>,
}

impl<R: RegisterIo> ClockTree<R> {
    /// Build the tree: wire parents, read back mux selects, compute every
    /// initial rate and enable the critical nodes.
    pub fn build(registry: Registry, io: R) -> ClockResult<Self> {
        let deps = DependencyMap::new(&registry);

        let mut state = TreeState {
            io,
            nodes: Vec::with_capacity(registry.len()),
        };
        for desc in registry.iter() {
            let parent_slot = match &desc.kind {
                ClockKind::Mux(m) => {
                    let index = mux::read_index(&state.io, m);
                    desc.parents
                        .get(index)
                        .copied()
                        .flatten()
                        .and_then(|id| registry.slot(id))
                }
                _ => desc.parents[0].and_then(|id| registry.slot(id)),
            };
            state.nodes.push(Node {
                parent_slot,
                cached: Ok(0),
                enable_count: 0,
            });
        }

        let tree = Self {
            registry,
            deps,
            state: Mutex::new(state),
        };

        {
            let mut guard = tree.state.lock();
            let state = &mut *guard;
            for &slot in tree.deps.topological_order() {
                state.nodes[slot].cached = tree.recalc_slot(state, slot);
            }

            // Critical nodes take their one reference now and are driven
            // on; refcounting never touches their hardware again.
            for slot in 0..tree.registry.len() {
                if tree.desc_at(slot).flags.contains(ClockFlags::CRITICAL) {
                    tree.hw_set_enabled(state, slot, true)?;
                    state.nodes[slot].enable_count = 1;
                }
            }
        }

        log::debug!("clock tree: {} nodes wired", tree.registry.len());

        Ok(tree)
    }

    /// Id carrying `name`.
    pub fn lookup(&self, name: &str) -> Option<ClockId> {
        self.registry.find(name)
    }

    /// Name of `id`.
    pub fn name(&self, id: ClockId) -> Option<&'static str> {
        self.registry.get(id).map(|d| d.name)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn slot_of(&self, id: ClockId) -> Result<usize, StateError> {
        self.registry.slot(id).ok_or(StateError::UnknownClock(id))
    }

    fn desc_at(&self, slot: usize) -> &ClockDesc {
        self.registry.desc_at(slot)
    }

    // ========================================================================
    // Rate Queries
    // ========================================================================

    /// Effective rate of `id`.
    ///
    /// The rate is reported whether or not the node is gated; the upstream
    /// oscillator keeps running either way.
    pub fn get_rate(&self, id: ClockId) -> ClockResult<u64> {
        let slot = self.slot_of(id)?;
        let state = self.state.lock();
        Ok(state.nodes[slot].cached?)
    }

    /// Rate `set_rate(id, requested)` would achieve, without touching
    /// hardware. Kinds with no programmable rate report their current rate.
    pub fn round_rate(&self, id: ClockId, requested: u64) -> ClockResult<u64> {
        let slot = self.slot_of(id)?;
        let state = self.state.lock();
        let parent_rate = self.parent_rate(&state, slot);
        match &self.desc_at(slot).kind {
            ClockKind::Fixed { .. } | ClockKind::Mux(_) | ClockKind::Gate(_) => {
                Ok(state.nodes[slot].cached?)
            }
            ClockKind::Pll(d) => Ok(pll::round_rate(d, requested)?),
            ClockKind::Div(d) => Ok(div::round_rate(d, parent_rate?, requested)?),
            ClockKind::BusDiv(d) => Ok(bus::round_rate(d, parent_rate?, requested)?),
            ClockKind::FracDiv(d) => Ok(frac::round_rate(d, parent_rate?, requested)?),
        }
    }

    /// Program `id` to `requested`; returns the achieved rate, which may
    /// differ from the request by integer rounding.
    pub fn set_rate(&self, id: ClockId, requested: u64) -> ClockResult<u64> {
        let slot = self.slot_of(id)?;
        let desc = self.desc_at(slot);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let result = match &desc.kind {
            ClockKind::Fixed { .. } | ClockKind::Mux(_) | ClockKind::Gate(_) => {
                return Err(StateError::ReadOnly.into());
            }
            ClockKind::Pll(d) => pll::apply_rate(&mut state.io, d, desc.name, requested),
            ClockKind::Div(d) => {
                let parent_rate = self.parent_rate(state, slot)?;
                div::apply_rate(&mut state.io, d, desc.name, parent_rate, requested)
            }
            ClockKind::BusDiv(d) => {
                let parent_rate = self.parent_rate(state, slot)?;
                bus::apply_rate(&mut state.io, d, desc.name, parent_rate, requested)
            }
            ClockKind::FracDiv(d) => {
                let parent_rate = self.parent_rate(state, slot)?;
                frac::apply_rate(&mut state.io, d, parent_rate, requested)
            }
        };

        match result {
            Ok(achieved) => {
                self.refresh(state, slot);
                Ok(achieved)
            }
            // The divider field was already written when the handshake
            // timed out: bring the cache in line with hardware, then fail.
            Err(RateError::HardwareTimeout) => {
                self.refresh(state, slot);
                Err(RateError::HardwareTimeout.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Parent Management
    // ========================================================================

    /// Active parent of `id`. A mux whose select field points at an unset
    /// slot reports `None`.
    pub fn get_parent(&self, id: ClockId) -> ClockResult<Option<ClockId>> {
        let slot = self.slot_of(id)?;
        let state = self.state.lock();
        Ok(state.nodes[slot]
            .parent_slot
            .map(|p| self.desc_at(p).id))
    }

    /// Select parent slot `parent_index` on mux `id`.
    pub fn set_parent(&self, id: ClockId, parent_index: usize) -> ClockResult<()> {
        let slot = self.slot_of(id)?;
        let desc = self.desc_at(slot);
        let ClockKind::Mux(m) = &desc.kind else {
            return Err(StateError::NotAMux.into());
        };
        if parent_index >= MAX_PARENTS {
            return Err(RateError::InvalidEncoding.into());
        }
        let Some(parent_id) = desc.parents[parent_index] else {
            return Err(RateError::InvalidEncoding.into());
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        mux::write_index(&mut state.io, m, parent_index);
        state.nodes[slot].parent_slot = self.registry.slot(parent_id);
        self.refresh(state, slot);
        Ok(())
    }

    // ========================================================================
    // Enable / Disable
    // ========================================================================

    /// Take a reference on `id`; powers the hardware up on the 0 -> 1 edge.
    pub fn enable(&self, id: ClockId) -> ClockResult<()> {
        let slot = self.slot_of(id)?;
        let desc = self.desc_at(slot);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.nodes[slot].enable_count == 0 && !desc.flags.contains(ClockFlags::CRITICAL) {
            self.hw_set_enabled(state, slot, true)?;
        }
        state.nodes[slot].enable_count += 1;
        Ok(())
    }

    /// Drop a reference on `id`; powers the hardware down on the 1 -> 0
    /// edge unless the node is critical. Dropping a reference that was
    /// never taken is a programming error.
    pub fn disable(&self, id: ClockId) -> ClockResult<()> {
        let slot = self.slot_of(id)?;
        let desc = self.desc_at(slot);
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if state.nodes[slot].enable_count == 0 {
            return Err(StateError::NotEnabled.into());
        }
        state.nodes[slot].enable_count -= 1;
        if state.nodes[slot].enable_count == 0 && !desc.flags.contains(ClockFlags::CRITICAL) {
            self.hw_set_enabled(state, slot, false)?;
        }
        Ok(())
    }

    /// True while `id` holds references, or is critical.
    pub fn is_enabled(&self, id: ClockId) -> ClockResult<bool> {
        let slot = self.slot_of(id)?;
        let critical = self.desc_at(slot).flags.contains(ClockFlags::CRITICAL);
        let state = self.state.lock();
        Ok(critical || state.nodes[slot].enable_count > 0)
    }

    /// Current reference count of `id`.
    pub fn enable_count(&self, id: ClockId) -> ClockResult<u32> {
        let slot = self.slot_of(id)?;
        let state = self.state.lock();
        Ok(state.nodes[slot].enable_count)
    }

    fn hw_set_enabled(
        &self,
        state: &mut TreeState<R>,
        slot: usize,
        enable: bool,
    ) -> Result<(), RateError> {
        let desc = self.desc_at(slot);
        match &desc.kind {
            ClockKind::Gate(d) => {
                gate::set_enabled(&mut state.io, d, enable);
                Ok(())
            }
            ClockKind::Pll(d) => pll::set_enabled(&mut state.io, d, desc.name, enable),
            ClockKind::Div(d) if div::has_enable_protocol(d) => {
                div::set_enabled(&mut state.io, d, desc.name, enable)
            }
            // No enable hardware: refcount bookkeeping only.
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Rate Propagation
    // ========================================================================

    /// Cached rate of `slot`'s active parent.
    fn parent_rate(&self, state: &TreeState<R>, slot: usize) -> Result<u64, RateError> {
        match state.nodes[slot].parent_slot {
            Some(parent) => state.nodes[parent].cached,
            // Only a mux parked on an unset slot has no parent here; its
            // rate is undefined rather than guessed.
            None => Err(RateError::InvalidEncoding),
        }
    }

    /// Recompute one node's rate from hardware and its parent's cache.
    fn recalc_slot(&self, state: &TreeState<R>, slot: usize) -> Result<u64, RateError> {
        match &self.desc_at(slot).kind {
            ClockKind::Fixed { rate } => Ok(*rate),
            ClockKind::Mux(_) | ClockKind::Gate(_) => self.parent_rate(state, slot),
            ClockKind::Pll(d) => pll::recalc(&state.io, d, self.parent_rate(state, slot)?),
            ClockKind::Div(d) => div::recalc(&state.io, d, self.parent_rate(state, slot)?),
            ClockKind::BusDiv(d) => Ok(bus::recalc(&state.io, d, self.parent_rate(state, slot)?)),
            ClockKind::FracDiv(d) => Ok(frac::recalc(&state.io, d, self.parent_rate(state, slot)?)),
        }
    }

    /// Recompute `slot` and every transitive dependent, parents first.
    fn refresh(&self, state: &mut TreeState<R>, slot: usize) {
        state.nodes[slot].cached = self.recalc_slot(state, slot);
        for &dep in self.deps.dependents_of(slot) {
            state.nodes[dep].cached = self.recalc_slot(state, dep);
        }
    }

    // ========================================================================
    // Register Snapshot
    // ========================================================================

    /// Snapshot every register the table touches (suspend support).
    pub fn save_registers(&self) -> Vec<RegisterDump> {
        let state = self.state.lock();
        self.registry
            .register_offsets()
            .into_iter()
            .map(|offset| RegisterDump {
                offset,
                value: state.io.read(offset),
            })
            .collect()
    }

    /// Write a snapshot back and resynchronize every cached rate and mux
    /// parent from hardware (resume support).
    pub fn restore_registers(&self, dump: &[RegisterDump]) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        for entry in dump {
            state.io.write(entry.offset, entry.value);
        }
        for (slot, desc) in self.registry.iter().enumerate() {
            if let ClockKind::Mux(m) = &desc.kind {
                let index = mux::read_index(&state.io, m);
                state.nodes[slot].parent_slot = desc
                    .parents
                    .get(index)
                    .copied()
                    .flatten()
                    .and_then(|id| self.registry.slot(id));
            }
        }
        for &slot in self.deps.topological_order() {
            state.nodes[slot].cached = self.recalc_slot(state, slot);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BuildError, ClockError};
    use crate::io::RamRegisters;
    use crate::registry::{
        BusDivDesc, BusDivMode, DivDesc, GateDesc, GateFlags, MuxDesc, PllDesc, PllRate,
    };

    const OD_ENCODING: &[u32] = &[0, 1, 2, 3, 4, 0, 6, 8];

    const PLL_RATES: &[PllRate] = &[PllRate {
        rate: 1_200_000_000,
        m: 100,
        n: 1,
        od1: 2,
        od0: 1,
    }];

    const APLL: PllDesc = PllDesc {
        reg: 0x10,
        m_shift: 20,
        m_width: 12,
        n_shift: 14,
        n_width: 6,
        od1_shift: 11,
        od1_width: 3,
        od0_shift: 8,
        od0_width: 3,
        enable_bit: 0,
        stable_bit: 3,
        od_encoding: OD_ENCODING,
        rate_table: PLL_RATES,
    };

    fn id(raw: u16) -> ClockId {
        ClockId::new(raw)
    }

    /// ext(0) -> apll(1) -> div_cpu(2), per the end-to-end scenario.
    fn scenario_registry() -> Registry {
        Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            ClockDesc::pll(id(1), "apll", id(0), APLL),
            ClockDesc::div(
                id(2),
                "div_cpu",
                id(1),
                DivDesc {
                    reg: 0x00,
                    shift: 0,
                    width: 4,
                    ce_bit: None,
                    busy_bit: None,
                    stop_bit: None,
                    table: None,
                },
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_end_to_end_scenario() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let apll = tree.lookup("apll").unwrap();
        let cpu = tree.lookup("div_cpu").unwrap();

        assert_eq!(tree.set_rate(apll, 1_200_000_000).unwrap(), 1_200_000_000);
        assert_eq!(tree.get_rate(apll).unwrap(), 1_200_000_000);

        assert_eq!(tree.set_rate(cpu, 300_000_000).unwrap(), 300_000_000);
        assert_eq!(tree.get_rate(cpu).unwrap(), 300_000_000);

        assert_eq!(
            tree.disable(cpu).unwrap_err(),
            ClockError::State(StateError::NotEnabled)
        );
    }

    #[test]
    fn test_set_rate_propagates_downstream() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let apll = tree.lookup("apll").unwrap();
        let cpu = tree.lookup("div_cpu").unwrap();

        tree.set_rate(apll, 1_200_000_000).unwrap();
        tree.set_rate(cpu, 300_000_000).unwrap();

        // Reprogramming the PLL must show up downstream without a refresh
        // call: divisor 4 still set, so cpu follows to rate/4.
        // (Only one table entry here, so reprogram the same rate and check
        // the divider math from the refreshed cache.)
        assert_eq!(tree.get_rate(cpu).unwrap(), tree.get_rate(apll).unwrap() / 4);
    }

    #[test]
    fn test_set_rate_on_fixed_is_read_only() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let ext = tree.lookup("ext").unwrap();
        assert_eq!(
            tree.set_rate(ext, 1).unwrap_err(),
            ClockError::State(StateError::ReadOnly)
        );
        assert_eq!(tree.get_rate(ext).unwrap(), 24_000_000);
    }

    #[test]
    fn test_unsupported_pll_rate_keeps_cache() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let apll = tree.lookup("apll").unwrap();
        tree.set_rate(apll, 1_200_000_000).unwrap();
        assert_eq!(
            tree.set_rate(apll, 999).unwrap_err(),
            ClockError::Rate(RateError::UnsupportedRate)
        );
        assert_eq!(tree.get_rate(apll).unwrap(), 1_200_000_000);
    }

    #[test]
    fn test_enable_disable_idempotence() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let cpu = tree.lookup("div_cpu").unwrap();

        assert!(!tree.is_enabled(cpu).unwrap());
        tree.enable(cpu).unwrap();
        tree.enable(cpu).unwrap();
        assert_eq!(tree.enable_count(cpu).unwrap(), 2);
        tree.disable(cpu).unwrap();
        assert!(tree.is_enabled(cpu).unwrap());
        tree.disable(cpu).unwrap();
        assert!(!tree.is_enabled(cpu).unwrap());
        assert_eq!(tree.enable_count(cpu).unwrap(), 0);
    }

    #[test]
    fn test_pll_enable_refcount_drives_hardware_once() {
        let mut regs = RamRegisters::new();
        regs.set_bit(0x10, 3); // lock asserted
        let tree = ClockTree::build(scenario_registry(), regs).unwrap();
        let apll = tree.lookup("apll").unwrap();

        tree.enable(apll).unwrap();
        tree.enable(apll).unwrap();
        // Enable bit set by the first reference.
        assert!(tree.state.lock().io.test_bit(0x10, 0));
        tree.disable(apll).unwrap();
        assert!(tree.state.lock().io.test_bit(0x10, 0));
        tree.disable(apll).unwrap();
        assert!(!tree.state.lock().io.test_bit(0x10, 0));
    }

    fn mux_chain_registry() -> Registry {
        // ext(0), osc(1), mux(2) -> div(3) -> gate(4)
        Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            ClockDesc::fixed(id(1), "osc", 48_000_000),
            ClockDesc::mux(
                id(2),
                "mux",
                [Some(id(0)), Some(id(1)), None, None],
                MuxDesc {
                    reg: 0x20,
                    shift: 30,
                    width: 2,
                },
            ),
            ClockDesc::div(
                id(3),
                "div",
                id(2),
                DivDesc {
                    reg: 0x24,
                    shift: 0,
                    width: 4,
                    ce_bit: None,
                    busy_bit: None,
                    stop_bit: None,
                    table: None,
                },
            ),
            ClockDesc::gate(
                id(4),
                "gate",
                id(3),
                GateDesc {
                    reg: 0x30,
                    bit: 0,
                    flags: GateFlags::SET_TO_DISABLE,
                },
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_mux_switch_propagates_to_descendants() {
        let tree = ClockTree::build(mux_chain_registry(), RamRegisters::new()).unwrap();
        let mux = tree.lookup("mux").unwrap();
        let div = tree.lookup("div").unwrap();
        let gate = tree.lookup("gate").unwrap();

        assert_eq!(tree.get_parent(mux).unwrap(), Some(id(0)));
        assert_eq!(tree.get_rate(div).unwrap(), 24_000_000);
        assert_eq!(tree.get_rate(gate).unwrap(), 24_000_000);

        tree.set_parent(mux, 1).unwrap();
        assert_eq!(tree.get_parent(mux).unwrap(), Some(id(1)));
        assert_eq!(tree.get_rate(mux).unwrap(), 48_000_000);
        assert_eq!(tree.get_rate(div).unwrap(), 48_000_000);
        assert_eq!(tree.get_rate(gate).unwrap(), 48_000_000);
    }

    #[test]
    fn test_set_parent_rejects_non_mux_and_unset_slots() {
        let tree = ClockTree::build(mux_chain_registry(), RamRegisters::new()).unwrap();
        let div = tree.lookup("div").unwrap();
        let mux = tree.lookup("mux").unwrap();

        assert_eq!(
            tree.set_parent(div, 0).unwrap_err(),
            ClockError::State(StateError::NotAMux)
        );
        assert_eq!(
            tree.set_parent(mux, 2).unwrap_err(),
            ClockError::Rate(RateError::InvalidEncoding)
        );
        assert_eq!(
            tree.set_parent(mux, 9).unwrap_err(),
            ClockError::Rate(RateError::InvalidEncoding)
        );
    }

    #[test]
    fn test_mux_parked_on_unset_slot() {
        let mut regs = RamRegisters::new();
        regs.write_field(0x20, 30, 2, 3); // select an unset slot
        let tree = ClockTree::build(mux_chain_registry(), regs).unwrap();
        let mux = tree.lookup("mux").unwrap();
        let div = tree.lookup("div").unwrap();

        assert_eq!(tree.get_parent(mux).unwrap(), None);
        assert_eq!(
            tree.get_rate(mux).unwrap_err(),
            ClockError::Rate(RateError::InvalidEncoding)
        );
        // The undecodable rate poisons descendants rather than lying.
        assert_eq!(
            tree.get_rate(div).unwrap_err(),
            ClockError::Rate(RateError::InvalidEncoding)
        );
        // Switching to a real parent recovers the whole chain.
        tree.set_parent(mux, 0).unwrap();
        assert_eq!(tree.get_rate(div).unwrap(), 24_000_000);
    }

    #[test]
    fn test_gate_reports_parent_rate_while_disabled() {
        let tree = ClockTree::build(mux_chain_registry(), RamRegisters::new()).unwrap();
        let gate = tree.lookup("gate").unwrap();
        assert!(!tree.is_enabled(gate).unwrap());
        assert_eq!(tree.get_rate(gate).unwrap(), 24_000_000);
    }

    #[test]
    fn test_critical_gate_enabled_at_build_and_never_disabled() {
        let registry = Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            ClockDesc::gate(
                id(1),
                "gate_ddr",
                id(0),
                GateDesc {
                    reg: 0x30,
                    bit: 31,
                    flags: GateFlags::SET_TO_DISABLE,
                },
            )
            .with_flags(ClockFlags::CRITICAL),
        ])
        .unwrap();
        let mut regs = RamRegisters::new();
        regs.set_bit(0x30, 31); // gated off at reset
        let tree = ClockTree::build(registry, regs).unwrap();
        let ddr = tree.lookup("gate_ddr").unwrap();

        // Build took the one reference and drove the gate on.
        assert_eq!(tree.enable_count(ddr).unwrap(), 1);
        assert!(tree.is_enabled(ddr).unwrap());
        assert!(!tree.state.lock().io.test_bit(0x30, 31));

        tree.disable(ddr).unwrap();
        assert_eq!(tree.enable_count(ddr).unwrap(), 0);
        // Refcount dropped to zero, but the hardware stays on and the
        // node still reports enabled.
        assert!(tree.is_enabled(ddr).unwrap());
        assert!(!tree.state.lock().io.test_bit(0x30, 31));
        assert_eq!(
            tree.disable(ddr).unwrap_err(),
            ClockError::State(StateError::NotEnabled)
        );
    }

    #[test]
    fn test_bus_divider_timeout_keeps_cache_consistent_with_hardware() {
        let registry = Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 1_000_000_000),
            ClockDesc::bus_div(
                id(1),
                "div_cpu",
                id(0),
                BusDivDesc {
                    reg: 0x00,
                    shift1: 0,
                    width1: 4,
                    shift2: 4,
                    width2: 4,
                    ce_bit: 22,
                    busy_reg: 0xec,
                    busy_bit: 0,
                    mode: BusDivMode::Single,
                },
            ),
        ])
        .unwrap();
        let mut regs = RamRegisters::new();
        regs.set_bit(0xec, 0); // busy stuck
        let tree = ClockTree::build(registry, regs).unwrap();
        let cpu = tree.lookup("div_cpu").unwrap();

        assert_eq!(
            tree.set_rate(cpu, 250_000_000).unwrap_err(),
            ClockError::Rate(RateError::HardwareTimeout)
        );
        // The field write landed before the handshake failed; the cache
        // reflects what the hardware now holds.
        assert_eq!(tree.get_rate(cpu).unwrap(), 250_000_000);
    }

    #[test]
    fn test_rate_cache_matches_from_scratch_recompute() {
        let tree = ClockTree::build(mux_chain_registry(), RamRegisters::new()).unwrap();
        let mux = tree.lookup("mux").unwrap();
        let div = tree.lookup("div").unwrap();

        tree.set_parent(mux, 1).unwrap();
        tree.set_rate(div, 6_000_000).unwrap();

        // From-scratch recompute: walk the parent chain manually.
        let state = tree.state.lock();
        let field = state.io.read_field(0x24, 0, 4) as u64;
        drop(state);
        let expected = 48_000_000 / (field + 1);
        assert_eq!(tree.get_rate(div).unwrap(), expected);
    }

    #[test]
    fn test_round_rate_does_not_write() {
        let tree = ClockTree::build(mux_chain_registry(), RamRegisters::new()).unwrap();
        let div = tree.lookup("div").unwrap();
        assert_eq!(tree.round_rate(div, 7_000_000).unwrap(), 24_000_000 / 3);
        // Still at divisor 1.
        assert_eq!(tree.get_rate(div).unwrap(), 24_000_000);
    }

    #[test]
    fn test_unknown_id_rejected() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let bogus = id(99);
        assert_eq!(
            tree.get_rate(bogus).unwrap_err(),
            ClockError::State(StateError::UnknownClock(bogus))
        );
    }

    #[test]
    fn test_save_restore_round_trip() {
        let tree = ClockTree::build(scenario_registry(), RamRegisters::new()).unwrap();
        let apll = tree.lookup("apll").unwrap();
        let cpu = tree.lookup("div_cpu").unwrap();
        tree.set_rate(apll, 1_200_000_000).unwrap();
        tree.set_rate(cpu, 300_000_000).unwrap();

        let snapshot = tree.save_registers();

        // Clobber the hardware, as a lost power domain would.
        {
            let mut guard = tree.state.lock();
            let state = &mut *guard;
            state.io.write(0x00, 0);
            state.io.write(0x10, 0);
        }
        tree.restore_registers(&snapshot);
        assert_eq!(tree.get_rate(apll).unwrap(), 1_200_000_000);
        assert_eq!(tree.get_rate(cpu).unwrap(), 300_000_000);
    }

    #[test]
    fn test_registry_errors_reach_build_callers() {
        let err = Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            ClockDesc::fixed(id(0), "ext2", 24_000_000),
        ])
        .unwrap_err();
        assert_eq!(err, BuildError::DuplicateId(id(0)));
    }
}
