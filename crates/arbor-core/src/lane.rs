//! Priority lanes
//!
//! A lane is a single bit in an ordered priority space: the lower the bit, the
//! more urgent the work. Sets of lanes are merged by union and retired by
//! subtraction. The `SYNC` lane must be flushed before any other work is
//! observed.

use bitflags::bitflags;

use crate::scheduler::PriorityLevel;

bitflags! {
    /// A set of priority lanes. A single-bit value is a lane.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Lanes: u32 {
        /// Discrete user input; rendered synchronously in a microtask
        const SYNC = 0b0_0001;
        /// Continuous input (drag, scroll)
        const INPUT_CONTINUOUS = 0b0_0010;
        /// Ordinary updates
        const DEFAULT = 0b0_0100;
        /// Non-urgent transitions
        const TRANSITION = 0b0_1000;
        /// Offscreen/idle work
        const IDLE = 0b1_0000;
    }
}

/// A single lane. Alias kept for readability at call sites that expect one bit.
pub type Lane = Lanes;

/// The empty lane set.
pub const NO_LANES: Lanes = Lanes::empty();

impl Lanes {
    /// The highest-priority lane in the set (its lowest set bit), or empty.
    pub fn highest_priority(self) -> Lane {
        let bits = self.bits();
        Lanes::from_bits_retain(bits & bits.wrapping_neg())
    }

    /// Union of two lane sets.
    pub fn merge(self, other: Lanes) -> Lanes {
        self | other
    }

    /// `self` with `subset` removed.
    pub fn remove_lanes(self, subset: Lanes) -> Lanes {
        self & !subset
    }

    /// Whether every lane in `subset` is present in `self`.
    pub fn is_subset_of(self, superset: Lanes) -> bool {
        superset.contains(self)
    }

    /// Host task priority used when this lane set is scheduled as a task.
    pub fn to_scheduler_priority(self) -> PriorityLevel {
        let lane = self.highest_priority();
        if lane == Lanes::SYNC {
            PriorityLevel::Immediate
        } else if lane == Lanes::INPUT_CONTINUOUS {
            PriorityLevel::UserBlocking
        } else if lane == Lanes::DEFAULT || lane == Lanes::TRANSITION {
            PriorityLevel::Normal
        } else {
            PriorityLevel::Idle
        }
    }

    /// Parse a lane name as used by configuration and the CLI.
    pub fn parse_name(name: &str) -> Option<Lane> {
        match name {
            "sync" => Some(Lanes::SYNC),
            "input_continuous" | "input-continuous" => Some(Lanes::INPUT_CONTINUOUS),
            "default" => Some(Lanes::DEFAULT),
            "transition" => Some(Lanes::TRANSITION),
            "idle" => Some(Lanes::IDLE),
            _ => None,
        }
    }
}
