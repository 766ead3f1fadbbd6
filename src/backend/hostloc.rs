//! Host locations and their allocation state.

use crate::ir::InstRef;

pub const GPR_COUNT: usize = 16;
pub const XMM_COUNT: usize = 16;
pub const SPILL_COUNT: usize = 64;
pub const HOST_LOC_COUNT: usize = GPR_COUNT + XMM_COUNT + SPILL_COUNT;

/// A host general-purpose register, vector register, or stack spill slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostLoc {
    Gpr(u8),
    Xmm(u8),
    Spill(u8),
}

impl HostLoc {
    #[must_use]
    pub fn is_gpr(self) -> bool {
        matches!(self, HostLoc::Gpr(_))
    }

    #[must_use]
    pub fn is_xmm(self) -> bool {
        matches!(self, HostLoc::Xmm(_))
    }

    #[must_use]
    pub fn is_spill(self) -> bool {
        matches!(self, HostLoc::Spill(_))
    }

    #[must_use]
    pub fn is_register(self) -> bool {
        !self.is_spill()
    }

    #[must_use]
    pub fn same_class(a: HostLoc, b: HostLoc) -> bool {
        matches!(
            (a, b),
            (HostLoc::Gpr(_), HostLoc::Gpr(_))
                | (HostLoc::Xmm(_), HostLoc::Xmm(_))
                | (HostLoc::Spill(_), HostLoc::Spill(_))
        )
    }

    /// Position in the flat location table.
    #[must_use]
    pub(crate) fn index(self) -> usize {
        match self {
            HostLoc::Gpr(n) => {
                debug_assert!((n as usize) < GPR_COUNT);
                n as usize
            }
            HostLoc::Xmm(n) => {
                debug_assert!((n as usize) < XMM_COUNT);
                GPR_COUNT + n as usize
            }
            HostLoc::Spill(n) => {
                debug_assert!((n as usize) < SPILL_COUNT);
                GPR_COUNT + XMM_COUNT + n as usize
            }
        }
    }

    #[must_use]
    pub(crate) fn from_index(index: usize) -> HostLoc {
        debug_assert!(index < HOST_LOC_COUNT);
        if index < GPR_COUNT {
            HostLoc::Gpr(index as u8)
        } else if index < GPR_COUNT + XMM_COUNT {
            HostLoc::Xmm((index - GPR_COUNT) as u8)
        } else {
            HostLoc::Spill((index - GPR_COUNT - XMM_COUNT) as u8)
        }
    }
}

/// Allocation state of one host location.
///
/// `Empty` holds nothing. `Idle` holds live values not involved in the
/// operation currently being assembled. `Use` is locked because the current
/// operation reads it; `Scratch` is locked because the current operation
/// writes it (values may be defined into it before the scope ends). Locks
/// are released at every operation boundary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LocInfo {
    #[default]
    Empty,
    Idle(Vec<InstRef>),
    Use(Vec<InstRef>),
    Scratch(Vec<InstRef>),
}

impl LocInfo {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, LocInfo::Empty)
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, LocInfo::Idle(_))
    }

    #[must_use]
    pub fn is_use(&self) -> bool {
        matches!(self, LocInfo::Use(_))
    }

    #[must_use]
    pub fn is_scratch(&self) -> bool {
        matches!(self, LocInfo::Scratch(_))
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        matches!(self, LocInfo::Use(_) | LocInfo::Scratch(_))
    }

    /// Holds at least one bound value.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        !self.values().is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[InstRef] {
        match self {
            LocInfo::Empty => &[],
            LocInfo::Idle(values) | LocInfo::Use(values) | LocInfo::Scratch(values) => values,
        }
    }

    #[must_use]
    pub fn contains_value(&self, inst: InstRef) -> bool {
        self.values().contains(&inst)
    }

    /// Bind a value. Locked locations keep their lock.
    pub fn add_value(&mut self, inst: InstRef) {
        match self {
            LocInfo::Empty => *self = LocInfo::Idle(vec![inst]),
            LocInfo::Idle(values) | LocInfo::Use(values) | LocInfo::Scratch(values) => {
                values.push(inst)
            }
        }
    }

    /// Lock for the operation being assembled: an empty location becomes
    /// Scratch (it will be written), an occupied one becomes Use (it is
    /// read). Re-locking a Use location is legal (one value read twice in a
    /// single operation).
    pub fn lock(&mut self) {
        *self = match std::mem::take(self) {
            LocInfo::Empty => LocInfo::Scratch(Vec::new()),
            LocInfo::Idle(values) | LocInfo::Use(values) => LocInfo::Use(values),
            LocInfo::Scratch(_) => panic!("cannot lock a scratch location twice"),
        };
    }

    /// Release the lock and drop values with no remaining uses. `is_dead`
    /// reports whether a bound value's use count has reached zero.
    pub fn end_of_alloc_scope(&mut self, is_dead: impl Fn(InstRef) -> bool) {
        let mut values = match std::mem::take(self) {
            LocInfo::Empty => Vec::new(),
            LocInfo::Idle(values) | LocInfo::Use(values) | LocInfo::Scratch(values) => values,
        };
        values.retain(|&inst| !is_dead(inst));
        *self = if values.is_empty() {
            LocInfo::Empty
        } else {
            LocInfo::Idle(values)
        };
    }
}
