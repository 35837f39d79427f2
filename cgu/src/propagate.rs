//! # Rate Propagation Engine
//!
//! When a node's own rate changes (`set_rate`, `set_parent`, PLL
//! reprogramming), every transitive descendant must have its cached rate
//! recomputed before the mutation is considered complete. Rescanning the
//! whole registry on every mutation would be O(N) per node touched, so the
//! dependent closure of every node is computed once at tree build from a
//! reverse-adjacency walk and kept for the tree's lifetime.
//!
//! Closures are stored in ascending topological order, so a single forward
//! pass over a closure always sees parent rates that are already current.
//! A mux contributes edges from *all* of its candidate parents: switching
//! parents changes which edge is live, never the closure itself.

use alloc::vec::Vec;

use crate::registry::Registry;

/// Precomputed dependency structure over registry row positions.
#[derive(Debug)]
pub(crate) struct DependencyMap {
    /// All slots in ascending topological order (parents first).
    order: Vec<usize>,
    /// Transitive descendants of each slot, topologically ordered,
    /// excluding the slot itself.
    closures: Vec<Vec<usize>>,
}

impl DependencyMap {
    /// Build the map for a validated (acyclic) registry.
    pub(crate) fn new(registry: &Registry) -> Self {
        let len = registry.len();

        let mut children: Vec<Vec<usize>> = alloc::vec![Vec::new(); len];
        let mut in_degree = alloc::vec![0usize; len];
        for (slot, desc) in registry.iter().enumerate() {
            for parent in desc.parents.iter().flatten() {
                let pslot = registry
                    .slot(*parent)
                    .expect("registry validated parent ids");
                children[pslot].push(slot);
                in_degree[slot] += 1;
            }
        }

        // Kahn's algorithm; the registry is already known acyclic.
        let mut order = Vec::with_capacity(len);
        let mut ready: Vec<usize> = (0..len).filter(|&s| in_degree[s] == 0).collect();
        while let Some(slot) = ready.pop() {
            order.push(slot);
            for &child in &children[slot] {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    ready.push(child);
                }
            }
        }
        debug_assert_eq!(order.len(), len);

        let mut topo_pos = alloc::vec![0usize; len];
        for (pos, &slot) in order.iter().enumerate() {
            topo_pos[slot] = pos;
        }

        // Per-slot descendant closure via DFS over the child lists.
        let mut closures: Vec<Vec<usize>> = Vec::with_capacity(len);
        for start in 0..len {
            let mut seen = alloc::vec![false; len];
            let mut stack: Vec<usize> = children[start].clone();
            let mut closure = Vec::new();
            while let Some(slot) = stack.pop() {
                if seen[slot] {
                    continue;
                }
                seen[slot] = true;
                closure.push(slot);
                stack.extend_from_slice(&children[slot]);
            }
            closure.sort_unstable_by_key(|&slot| topo_pos[slot]);
            closures.push(closure);
        }

        Self { order, closures }
    }

    /// All slots, parents before children.
    pub(crate) fn topological_order(&self) -> &[usize] {
        &self.order
    }

    /// Transitive descendants of `slot` in recompute order.
    pub(crate) fn dependents_of(&self, slot: usize) -> &[usize] {
        &self.closures[slot]
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ClockDesc, ClockId, GateDesc, GateFlags, MuxDesc};

    fn id(raw: u16) -> ClockId {
        ClockId::new(raw)
    }

    fn gate(raw: u16, name: &'static str, parent: u16) -> ClockDesc {
        ClockDesc::gate(
            id(raw),
            name,
            id(parent),
            GateDesc {
                reg: 0x30,
                bit: raw as u8,
                flags: GateFlags::SET_TO_DISABLE,
            },
        )
    }

    fn chain_registry() -> Registry {
        // 0 -> 1 -> 2, 0 -> 3
        Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            gate(1, "a", 0),
            gate(2, "b", 1),
            gate(3, "c", 0),
        ])
        .unwrap()
    }

    #[test]
    fn test_topological_order_parents_first() {
        let map = DependencyMap::new(&chain_registry());
        let order = map.topological_order();
        let pos = |slot: usize| order.iter().position(|&s| s == slot).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
        assert!(pos(0) < pos(3));
    }

    #[test]
    fn test_closure_is_transitive_and_ordered() {
        let map = DependencyMap::new(&chain_registry());
        let mut closure = map.dependents_of(0).to_vec();
        closure.sort_unstable();
        assert_eq!(closure, &[1, 2, 3]);
        // Recompute order: 1 (parent of 2) must come before 2.
        let deps = map.dependents_of(0);
        let pos = |slot: usize| deps.iter().position(|&s| s == slot).unwrap();
        assert!(pos(1) < pos(2));
        assert_eq!(map.dependents_of(1), &[2]);
        assert!(map.dependents_of(2).is_empty());
    }

    #[test]
    fn test_mux_contributes_all_candidate_edges() {
        // mux(3) can select 1 or 2; both must count it as a dependent.
        let registry = Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            gate(1, "a", 0),
            gate(2, "b", 0),
            ClockDesc::mux(
                id(3),
                "mux",
                [Some(id(1)), Some(id(2)), None, None],
                MuxDesc {
                    reg: 0x00,
                    shift: 30,
                    width: 2,
                },
            ),
        ])
        .unwrap();
        let map = DependencyMap::new(&registry);
        assert_eq!(map.dependents_of(1), &[3]);
        assert_eq!(map.dependents_of(2), &[3]);
    }

    #[test]
    fn test_diamond_counted_once() {
        // 0 feeds 1 and 2, both feed mux 3; closure of 0 lists 3 once.
        let registry = Registry::new(&[
            ClockDesc::fixed(id(0), "ext", 24_000_000),
            gate(1, "a", 0),
            gate(2, "b", 0),
            ClockDesc::mux(
                id(3),
                "mux",
                [Some(id(1)), Some(id(2)), None, None],
                MuxDesc {
                    reg: 0x00,
                    shift: 30,
                    width: 2,
                },
            ),
        ])
        .unwrap();
        let map = DependencyMap::new(&registry);
        let mut closure = map.dependents_of(0).to_vec();
        closure.sort_unstable();
        assert_eq!(closure, &[1, 2, 3]);
    }
}
