//! # Error Types
//!
//! Failure taxonomy for the clock tree, split by phase: construction
//! ([`BuildError`]), rate protocols ([`RateError`]) and tree state
//! ([`StateError`]). [`ClockError`] is the umbrella type every fallible
//! tree operation returns.

use core::fmt;

use crate::registry::ClockId;

/// Result type alias for clock tree operations.
pub type ClockResult<T> = Result<T, ClockError>;

// ============================================================================
// Build Errors
// ============================================================================

/// Errors detected while validating a registry or building the tree.
///
/// All of these are fatal to subsystem bring-up; there is no partial tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// Two descriptors declare the same id.
    DuplicateId(ClockId),
    /// A descriptor references a parent id that was never declared.
    DanglingParent(ClockId),
    /// The parent graph contains a cycle through this id.
    CycleDetected(ClockId),
    /// The register window could not be mapped.
    IoMapFailed,
}

impl BuildError {
    /// Human-readable description.
    pub const fn message(self) -> &'static str {
        match self {
            Self::DuplicateId(_) => "duplicate clock id",
            Self::DanglingParent(_) => "parent id never declared",
            Self::CycleDetected(_) => "cycle in parent graph",
            Self::IoMapFailed => "failed to map register window",
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateId(id) | Self::DanglingParent(id) | Self::CycleDetected(id) => {
                write!(f, "{} (clock {})", self.message(), id.raw())
            }
            Self::IoMapFailed => f.write_str(self.message()),
        }
    }
}

// ============================================================================
// Rate Errors
// ============================================================================

/// Errors from the rate decode/encode hardware protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateError {
    /// No rate-table entry or divider setting achieves the requested rate.
    UnsupportedRate,
    /// A hardware field decodes to an undefined value.
    InvalidEncoding,
    /// A busy/stable poll exceeded its iteration bound.
    HardwareTimeout,
}

impl RateError {
    /// Human-readable description.
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnsupportedRate => "requested rate not achievable",
            Self::InvalidEncoding => "register field decodes to an undefined value",
            Self::HardwareTimeout => "busy-wait exceeded its bound",
        }
    }
}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ============================================================================
// State Errors
// ============================================================================

/// Errors from misuse of the tree API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// `disable` called on a node whose refcount is already 0.
    NotEnabled,
    /// `set_parent` called on a node that is not a mux.
    NotAMux,
    /// `set_rate` called on a node whose rate is not programmable.
    ReadOnly,
    /// The id does not name a node in this tree.
    UnknownClock(ClockId),
}

impl StateError {
    /// Human-readable description.
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotEnabled => "clock is not enabled",
            Self::NotAMux => "clock has no selectable parent",
            Self::ReadOnly => "clock rate is not programmable",
            Self::UnknownClock(_) => "unknown clock id",
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownClock(id) => write!(f, "{} ({})", self.message(), id.raw()),
            _ => f.write_str(self.message()),
        }
    }
}

// ============================================================================
// Umbrella Error
// ============================================================================

/// Any clock tree failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// Construction-time failure.
    Build(BuildError),
    /// Rate protocol failure.
    Rate(RateError),
    /// API misuse.
    State(StateError),
}

impl From<BuildError> for ClockError {
    fn from(e: BuildError) -> Self {
        Self::Build(e)
    }
}

impl From<RateError> for ClockError {
    fn from(e: RateError) -> Self {
        Self::Rate(e)
    }
}

impl From<StateError> for ClockError {
    fn from(e: StateError) -> Self {
        Self::State(e)
    }
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build(e) => e.fmt(f),
            Self::Rate(e) => e.fmt(f),
            Self::State(e) => e.fmt(f),
        }
    }
}

// Note: std::error::Error is not available in no_std context.

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_id() {
        let err = ClockError::from(BuildError::DanglingParent(ClockId::new(7)));
        let text = alloc::format!("{err}");
        assert!(text.contains("parent id never declared"));
        assert!(text.contains('7'));
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(
            ClockError::from(RateError::HardwareTimeout),
            ClockError::Rate(RateError::HardwareTimeout)
        );
        assert_eq!(
            ClockError::from(StateError::NotAMux),
            ClockError::State(StateError::NotAMux)
        );
    }
}
