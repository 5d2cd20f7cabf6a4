//! Wire protocol
//!
//! Clients send one kind of frame, a message to deliver; the server only ever
//! answers with envelopes.

mod frames;

pub use frames::{decode_send_request, encode_envelope, FrameError};
