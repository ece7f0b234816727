use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(PropertyId);
entity_id!(RoomTypeId);
entity_id!(BookingId);
entity_id!(AccountId);
entity_id!(PriceOverrideId);

/// Role attached to the authenticated principal by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Tenant,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Tenant => "tenant",
        }
    }
}

/// Authenticated actor for every state-machine call. The engine trusts this
/// input; producing it is the identity collaborator's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub account: AccountId,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Manual,
    Gateway,
}

/// Lifecycle states of a booking. The current state is always the most recent
/// entry of the booking's status history, never a mutable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    WaitingForPayment,
    WaitingForConfirmation,
    Confirmed,
    Canceled,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::WaitingForPayment => "waiting_for_payment",
            Self::WaitingForConfirmation => "waiting_for_confirmation",
            Self::Confirmed => "confirmed",
            Self::Canceled => "canceled",
        }
    }

    /// Whether a booking in this state still counts against room inventory.
    /// Canceled bookings never consume rooms, for any day.
    pub const fn holds_inventory(self) -> bool {
        !matches!(self, Self::Canceled)
    }

    /// Initial state chosen at creation time from the payment method.
    pub const fn initial(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Manual => Self::WaitingForPayment,
            PaymentMethod::Gateway => Self::WaitingForConfirmation,
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One append-only entry in a booking's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: BookingStatus,
    pub at: DateTime<Utc>,
}

impl StatusEntry {
    pub fn now(status: BookingStatus) -> Self {
        Self {
            status,
            at: Utc::now(),
        }
    }
}

/// Half-open stay interval: check-in inclusive, check-out exclusive.
/// A two-night stay from the 10th checks out on the 12th and occupies the
/// nights of the 10th and the 11th.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self {
            check_in,
            check_out,
        }
    }

    /// A window of `days` nights starting at `start`.
    pub fn window(start: NaiveDate, days: u32) -> Self {
        Self {
            check_in: start,
            check_out: start + Duration::days(i64::from(days)),
        }
    }

    /// A single calendar day, e.g. for a one-day flexible price entry.
    pub fn single_day(day: NaiveDate) -> Self {
        Self::window(day, 1)
    }

    pub fn is_well_formed(&self) -> bool {
        self.check_in < self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// `check_in <= day < check_out`.
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.check_in <= day && day < self.check_out
    }

    /// Two ranges overlap iff their day-sets intersect.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.check_out;
        let mut day = self.check_in;
        std::iter::from_fn(move || {
            if day < end {
                let current = day;
                day += Duration::days(1);
                Some(current)
            } else {
                None
            }
        })
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}
