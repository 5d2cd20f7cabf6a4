//! Background workers driving archival
//!
//! Both workers run detached and stop when their `CancellationToken` fires.
//! The sweeper is the backstop; the expiry listener reacts to cache
//! notifications for lower latency. Both call the same transfer routine.

mod expiry_listener;
mod sweeper;

pub use expiry_listener::ExpiryListener;
pub use sweeper::ExpirySweeper;
