use crate::debugger::error::ProtocolError;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// Point-in-time copy of target memory.
///
/// A block is handed out zero-filled and its contents are replaced as a whole
/// when the emulator answers the corresponding `read-memory` command.
/// Clones share the same contents.
#[derive(Clone)]
pub struct MemoryBlock {
    start: u64,
    length: usize,
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBlock {
    pub fn new(start: u64, length: usize) -> Self {
        Self {
            start,
            length,
            bytes: Arc::new(Mutex::new(vec![0; length])),
        }
    }

    /// Return start address of the block.
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Return length of the block in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Return a copy of block contents.
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.lock().unwrap().clone()
    }

    /// Replace block contents with bytes from a `read-memory` reply.
    /// Contents are left untouched if reply is malformed.
    pub(crate) fn replace_from_reply(&self, reply: &[String]) -> Result<(), ProtocolError> {
        if reply.len() != self.length {
            return Err(ProtocolError::MemoryLength {
                expected: self.length,
                actual: reply.len(),
            });
        }

        let new_bytes = reply
            .iter()
            .map(|token| parse_byte(token))
            .collect::<Result<Vec<_>, _>>()?;
        *self.bytes.lock().unwrap() = new_bytes;
        Ok(())
    }
}

impl Debug for MemoryBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("start", &format_args!("{:#x}", self.start))
            .field("length", &self.length)
            .finish()
    }
}

fn parse_byte(token: &str) -> Result<u8, ProtocolError> {
    if token.is_empty() || token.len() > 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ProtocolError::InvalidByte(token.to_string()));
    }
    u8::from_str_radix(token, 16).map_err(|_| ProtocolError::InvalidByte(token.to_string()))
}
