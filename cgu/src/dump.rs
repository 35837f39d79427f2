//! # Introspection
//!
//! Read-only views over the live tree: a per-node [`ClockSummary`], a
//! `for_each` visitor, a lazy restartable iterator in registration order,
//! and a text-table renderer matching the diagnostic listing the original
//! firmware exposed through its proc file.

use core::fmt;

use crate::error::ClockResult;
use crate::io::RegisterIo;
use crate::registry::{ClockFlags, ClockId};
use crate::tree::ClockTree;

/// Snapshot of one node's user-visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSummary {
    /// Node id.
    pub id: ClockId,
    /// Node name.
    pub name: &'static str,
    /// Effective rate in Hz; 0 when the rate cannot be decoded.
    pub rate: u64,
    /// Enabled state (refcount > 0, or critical).
    pub enabled: bool,
    /// Consumer refcount.
    pub enable_count: u32,
    /// Active parent's name, if any.
    pub parent: Option<&'static str>,
}

impl<R: RegisterIo> ClockTree<R> {
    /// Summary of one node.
    pub fn summary(&self, id: ClockId) -> ClockResult<ClockSummary> {
        let slot = self
            .registry
            .slot(id)
            .ok_or(crate::error::StateError::UnknownClock(id))?;
        let desc = self.registry.desc_at(slot);
        let state = self.state.lock();
        let node = &state.nodes[slot];
        Ok(ClockSummary {
            id,
            name: desc.name,
            rate: node.cached.unwrap_or(0),
            enabled: node.enable_count > 0 || desc.flags.contains(ClockFlags::CRITICAL),
            enable_count: node.enable_count,
            parent: node.parent_slot.map(|p| self.registry.desc_at(p).name),
        })
    }

    /// Visit every node in registration order.
    pub fn for_each(&self, mut f: impl FnMut(&ClockSummary)) {
        for desc in self.registry.iter() {
            if let Ok(summary) = self.summary(desc.id) {
                f(&summary);
            }
        }
    }

    /// Lazy iterator over node summaries in registration order.
    ///
    /// Each step takes the tree lock briefly; the iterator itself holds no
    /// lock, so it can be dropped and restarted at any point.
    pub fn iter(&self) -> ClockIter<'_, R> {
        ClockIter { tree: self, next: 0 }
    }
}

/// Iterator returned by [`ClockTree::iter`].
#[derive(Debug)]
pub struct ClockIter<'a, R: RegisterIo> {
    tree: &'a ClockTree<R>,
    next: usize,
}

impl<R: RegisterIo> Iterator for ClockIter<'_, R> {
    type Item = ClockSummary;

    fn next(&mut self) -> Option<ClockSummary> {
        while self.next < self.tree.registry.len() {
            let id = self.tree.registry.desc_at(self.next).id;
            self.next += 1;
            if let Ok(summary) = self.tree.summary(id) {
                return Some(summary);
            }
        }
        None
    }
}

/// Render the diagnostic clock table.
///
/// Output format follows the original listing:
/// ` ID  NAME              FRE          sta     count   parent`.
pub fn render<R: RegisterIo>(tree: &ClockTree<R>, out: &mut impl fmt::Write) -> fmt::Result {
    writeln!(out, " ID  NAME              FRE          sta     count   parent")?;
    for summary in tree.iter() {
        let khz = summary.rate / 1000;
        writeln!(
            out,
            "{:3} {:<15} {:4}.{:03}MHz {:>7}able   {} {:>10}",
            summary.id.raw(),
            summary.name,
            khz / 1000,
            khz % 1000,
            if summary.enabled { "en" } else { "dis" },
            summary.enable_count,
            summary.parent.unwrap_or("root"),
        )?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
