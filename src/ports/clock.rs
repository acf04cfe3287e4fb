use chrono::NaiveDateTime;

/// Source of wall-clock time in the configured zone.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Zone name reported in statistics.
    fn zone_name(&self) -> String;
}
