//! Floor request queue.
//!
//! Ordered, duplicate-free, at most one entry per floor.  The planner pushes
//! requests and pops the head once it has been serviced; readers take
//! consistent copies through [`SharedFloorQueue::snapshot`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use heapless::Vec;

/// Number of served floors.
pub const FLOOR_COUNT: usize = 3;

/// A served floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Floor {
    Floor1 = 1,
    Floor2 = 2,
    Floor3 = 3,
}

impl Floor {
    pub const ALL: [Self; FLOOR_COUNT] = [Self::Floor1, Self::Floor2, Self::Floor3];

    /// The floor that can be served en route between the other two.
    pub const MIDDLE: Self = Self::Floor2;

    /// 1-based floor number.
    pub const fn number(self) -> u8 {
        self as u8
    }

    pub const fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Floor1),
            2 => Some(Self::Floor2),
            3 => Some(Self::Floor3),
            _ => None,
        }
    }

    /// 0-based index into per-floor tables.
    pub const fn index(self) -> usize {
        self as usize - 1
    }
}

impl core::fmt::Display for Floor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "floor {}", self.number())
    }
}

/// Where a push ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Head,
    Tail,
    /// Already pending; the queue is unchanged.
    Duplicate,
}

/// Fixed-capacity request queue.  Holding one slot per floor and
/// rejecting duplicates means a push can never overflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloorRequestQueue {
    floors: Vec<Floor, FLOOR_COUNT>,
}

impl FloorRequestQueue {
    pub const fn new() -> Self {
        Self { floors: Vec::new() }
    }

    pub fn contains(&self, floor: Floor) -> bool {
        self.floors.contains(&floor)
    }

    pub fn push_back(&mut self, floor: Floor) -> Insertion {
        if self.contains(floor) {
            return Insertion::Duplicate;
        }
        let _ = self.floors.push(floor);
        Insertion::Tail
    }

    pub fn push_front(&mut self, floor: Floor) -> Insertion {
        if self.contains(floor) {
            return Insertion::Duplicate;
        }
        let _ = self.floors.insert(0, floor);
        Insertion::Head
    }

    pub fn peek(&self) -> Option<Floor> {
        self.floors.first().copied()
    }

    pub fn pop(&mut self) -> Option<Floor> {
        if self.floors.is_empty() {
            return None;
        }
        Some(self.floors.remove(0))
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    pub fn as_slice(&self) -> &[Floor] {
        &self.floors
    }
}

/// Mutex-guarded queue shared between the planner and observers.
#[derive(Debug, Default)]
pub struct SharedFloorQueue {
    inner: Mutex<FloorRequestQueue>,
}

impl SharedFloorQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, FloorRequestQueue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> FloorRequestQueue {
        self.lock().clone()
    }
}
