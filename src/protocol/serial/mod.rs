pub mod gnss;

/// Byte oriented message parser
pub trait Receiver {
    type Error;

    /// `Ok(true)` once a complete message is available. On error the
    /// parser is back to idle.
    fn receive_byte(&mut self, byte: u8) -> Result<bool, Self::Error>;
    fn reset(&mut self);
}
