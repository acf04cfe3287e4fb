mod adapter;
mod server;

pub use adapter::HyperTestAdapter;
pub use server::serve;
