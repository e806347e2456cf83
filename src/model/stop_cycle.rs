use std::sync::{Mutex, MutexGuard};

use anyhow::{Error, anyhow, ensure};

use super::stop::{Stop, StopGroup};

/// Which stop of the list is currently selected
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Cursor {
    pub index: usize,
    pub reversed: bool,
}

/// The configured stops and the one the user is currently looking at
#[derive(Debug)]
pub struct StopCycle {
    groups: Vec<StopGroup>,
    cursor: Cursor,
}

impl StopCycle {
    pub fn new(groups: Vec<StopGroup>) -> Result<Self, Error> {
        ensure!(!groups.is_empty(), "at least one stop is required");

        Ok(StopCycle {
            groups,
            cursor: Cursor {
                index: 0,
                reversed: false,
            },
        })
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn current(&self) -> &Stop {
        self.groups[self.cursor.index].stop(self.cursor.reversed)
    }

    /// The stop a cursor pointed at, even if the user has moved on since
    pub fn stop_at_mut(&mut self, cursor: Cursor) -> Option<&mut Stop> {
        self.groups
            .get_mut(cursor.index)
            .map(|g| g.stop_mut(cursor.reversed))
    }

    pub fn next_station(&mut self) {
        self.cursor.index = (self.cursor.index + 1) % self.groups.len();
        self.cursor.reversed = false;
    }

    pub fn previous_station(&mut self) {
        self.cursor.index = match self.cursor.index {
            0 => self.groups.len() - 1,
            i => i - 1,
        };
        self.cursor.reversed = false;
    }

    /// Returns false if the current station has no second direction
    pub fn toggle_direction(&mut self) -> bool {
        if !self.groups[self.cursor.index].is_pair() {
            return false;
        }

        self.cursor.reversed = !self.cursor.reversed;
        true
    }
}

/// Locks the stop list shared by the poller and the button listener
pub fn lock_cycle(cycle: &Mutex<StopCycle>) -> Result<MutexGuard<'_, StopCycle>, Error> {
    cycle.lock().map_err(|_| anyhow!("stop list lock poisoned"))
}
