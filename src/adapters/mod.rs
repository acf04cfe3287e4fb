pub mod backup;
pub mod clock;
pub mod hyper_server;

pub use backup::FsBackupStore;
pub use clock::SystemClock;
pub use hyper_server::{serve, HyperTestAdapter};
