//! Save state infrastructure.
//!
//! Components that can snapshot their internal state into a binary
//! buffer implement [`StateComponent`]. The encoding is the simple
//! little-endian field sequence produced by the cursor helpers of
//! the commons crate.

use dotmatrix_common::error::Error;

/// Format hint for the state serialization, reserved for future
/// alternative encodings.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum StateFormat {
    Full,
}

pub trait StateComponent {
    fn state(&self, format: Option<StateFormat>) -> Result<Vec<u8>, Error>;
    fn set_state(&mut self, data: &[u8], format: Option<StateFormat>) -> Result<(), Error>;
}
