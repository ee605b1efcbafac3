//! Names of the registry's document collections.

/// Active inventory.
pub const NUMBERS: &str = "numbers";
/// Completed sales.
pub const SALES: &str = "sales";
/// Pre-booked numbers.
pub const PREBOOKINGS: &str = "prebookings";
/// Dealer purchase register.
pub const DEALER_PURCHASES: &str = "dealerPurchases";
/// Archive of deleted numbers.
pub const DELETED_NUMBERS: &str = "deletedNumbers";
/// Reminder tasks.
pub const REMINDERS: &str = "reminders";
/// Global audit feed.
pub const ACTIVITIES: &str = "activities";
/// Vendor payments.
pub const PAYMENTS: &str = "payments";
/// User profiles.
pub const USERS: &str = "users";

/// Every collection the registry mirrors, in refresh order.
pub const ALL: &[&str] = &[
    NUMBERS,
    SALES,
    PREBOOKINGS,
    DEALER_PURCHASES,
    DELETED_NUMBERS,
    REMINDERS,
    ACTIVITIES,
    PAYMENTS,
    USERS,
];
