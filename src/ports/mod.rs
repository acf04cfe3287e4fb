pub mod backup;
pub mod clock;

pub use backup::BackupStore;
pub use clock::Clock;
