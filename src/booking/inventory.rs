//! Inventory ledger: the only mutation path for room-type inventory.
//!
//! Holds are tracked per room type and per calendar day, so bookings with
//! disjoint stay ranges never contend for the same rooms. `decrement` is
//! all-or-nothing across the stay range; `increment` releases a prior hold
//! and saturates at zero. Callers are expected to invoke both from inside a
//! single atomic region together with the booking write they belong to.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

use super::domain::{RoomTypeId, StayRange};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("only {available} room(s) left on {day}, requested {requested}")]
    Insufficient {
        day: NaiveDate,
        requested: u32,
        available: u32,
    },
}

#[derive(Debug, Default)]
pub struct InventoryLedger {
    holds: HashMap<RoomTypeId, BTreeMap<NaiveDate, u32>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms currently held for `room_type` on `day`.
    pub fn held(&self, room_type: RoomTypeId, day: NaiveDate) -> u32 {
        self.holds
            .get(&room_type)
            .and_then(|days| days.get(&day))
            .copied()
            .unwrap_or(0)
    }

    /// Take `amount` rooms for every night of `stay`, verifying first that no
    /// night would exceed `capacity`. Either every night is held or none is.
    pub fn decrement(
        &mut self,
        room_type: RoomTypeId,
        stay: StayRange,
        amount: u32,
        capacity: u32,
    ) -> Result<(), InventoryError> {
        for day in stay.days() {
            let held = self.held(room_type, day);
            if held + amount > capacity {
                return Err(InventoryError::Insufficient {
                    day,
                    requested: amount,
                    available: capacity.saturating_sub(held),
                });
            }
        }

        let days = self.holds.entry(room_type).or_default();
        for day in stay.days() {
            *days.entry(day).or_insert(0) += amount;
        }
        Ok(())
    }

    /// Give back `amount` rooms for every night of `stay`. Releasing more than
    /// is held clamps at zero rather than underflowing; a hold is restored at
    /// most once because the caller guards the transition that triggers it.
    pub fn increment(&mut self, room_type: RoomTypeId, stay: StayRange, amount: u32) {
        let Some(days) = self.holds.get_mut(&room_type) else {
            return;
        };
        for day in stay.days() {
            if let Some(held) = days.get_mut(&day) {
                *held = held.saturating_sub(amount);
                if *held == 0 {
                    days.remove(&day);
                }
            }
        }
        if days.is_empty() {
            self.holds.remove(&room_type);
        }
    }
}
