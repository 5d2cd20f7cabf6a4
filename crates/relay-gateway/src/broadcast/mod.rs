//! Message fan-out
//!
//! Resolves who should receive a staged message and pushes it to their live
//! connections.

mod fanout;

pub use fanout::{DeliveryReport, FanOutDispatcher};
