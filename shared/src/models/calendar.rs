//! Calendar rules shared by feature derivation and clients

/// Season category 1-4 for a month 1-12.
///
/// Computed as `((month % 12) + 3) / 3` with integer division. The scaler was
/// fit on exactly these values, so the formula must not change.
pub fn season_for_month(month: u32) -> u32 {
    ((month % 12) + 3) / 3
}

/// Whether an hour of day counts as daytime (06:00 through 18:00 inclusive)
pub fn is_daytime_hour(hour: u32) -> bool {
    (6..=18).contains(&hour)
}
