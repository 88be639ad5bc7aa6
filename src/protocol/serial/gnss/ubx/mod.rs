pub mod cfg;
pub mod message;
pub mod nav;
pub mod nav_pos_pvt;

use heapless::Vec;

use super::Error;
use crate::protocol::serial::Receiver;

use message::{Checksum, Frame, MAX_PAYLOAD_SIZE, UBX_HEADER0, UBX_HEADER1};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum State {
    WaitHeader0,
    WaitHeader1,
    WaitClass,
    WaitId,
    WaitLength0,
    WaitLength1(u8),
    Payload(usize),
    WaitChecksumA,
    WaitChecksumB(u8),
}

pub struct UBX {
    state: State,
    class: u8,
    id: u8,
    checksum: Checksum,
    payload: Vec<u8, MAX_PAYLOAD_SIZE>,
    complete: bool,
}

impl UBX {
    pub fn new() -> Self {
        Self {
            state: State::WaitHeader0,
            class: 0,
            id: 0,
            checksum: Checksum::default(),
            payload: Vec::new(),
            complete: false,
        }
    }

    /// Last validated frame, until the next one begins
    pub fn frame(&self) -> Option<Frame<'_>> {
        if !self.complete {
            return None;
        }
        Some(Frame { class: self.class, id: self.id, payload: &self.payload })
    }

    fn payload_state(&self, length: usize) -> State {
        match length {
            0 => State::WaitChecksumA,
            _ => State::Payload(length),
        }
    }
}

impl Default for UBX {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver for UBX {
    type Error = Error;

    fn receive_byte(&mut self, byte: u8) -> Result<bool, Error> {
        self.state = match (self.state, byte) {
            (State::WaitHeader0, UBX_HEADER0) => {
                self.complete = false;
                State::WaitHeader1
            }
            (State::WaitHeader0, _) => return Err(Error::Unsynchronized(byte)),
            (State::WaitHeader1, UBX_HEADER1) => {
                self.checksum = Checksum::default();
                self.payload.clear();
                State::WaitClass
            }
            (State::WaitHeader1, UBX_HEADER0) => State::WaitHeader1,
            (State::WaitHeader1, _) => {
                self.state = State::WaitHeader0;
                return Err(Error::Unsynchronized(byte));
            }
            (State::WaitClass, class) => {
                self.checksum.update(class);
                self.class = class;
                State::WaitId
            }
            (State::WaitId, id) => {
                self.checksum.update(id);
                self.id = id;
                State::WaitLength0
            }
            (State::WaitLength0, value) => {
                self.checksum.update(value);
                State::WaitLength1(value)
            }
            (State::WaitLength1(low), value) => {
                self.checksum.update(value);
                let length = u16::from_le_bytes([low, value]) as usize;
                if length > MAX_PAYLOAD_SIZE {
                    self.state = State::WaitHeader0;
                    return Err(Error::Overflow(length));
                }
                self.payload_state(length)
            }
            (State::Payload(remain), value) => {
                self.checksum.update(value);
                self.payload.push(value).ok();
                match remain {
                    1 => State::WaitChecksumA,
                    _ => State::Payload(remain - 1),
                }
            }
            (State::WaitChecksumA, value) => State::WaitChecksumB(value),
            (State::WaitChecksumB(a), b) => {
                self.state = State::WaitHeader0;
                let actual = Checksum(a, b);
                if actual != self.checksum {
                    let expected = self.checksum.value();
                    return Err(Error::Checksum { expected, actual: actual.value() });
                }
                self.complete = true;
                return Ok(true);
            }
        };
        Ok(false)
    }

    fn reset(&mut self) {
        self.state = State::WaitHeader0;
        self.complete = false;
    }
}

mod test {
    #[cfg(test)]
    fn feed(ubx: &mut super::UBX, bytes: &[u8]) -> std::vec::Vec<Result<bool, super::Error>> {
        use crate::protocol::serial::Receiver;

        bytes.iter().map(|&b| ubx.receive_byte(b)).collect()
    }

    #[test]
    fn test_message() {
        use hex_literal::hex;

        use super::{message::MessageType, UBX};

        let message = hex!(
            "B5 62 01 07 5C 00
             00 00 00 00 E0 07 0A 15 16 0D 0A 04 01 00 00 00
             01 00 00 00 03 0C E0 0B 86 BE 2F FF AD 1F 21 04
             E0 F2 09 00 A0 56 09 00 01 00 00 00 01 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00
             D6 73"
        );
        let mut ubx = UBX::new();
        let results = feed(&mut ubx, &message[..64]);
        assert!(results.iter().all(|r| *r == Ok(false)));
        assert_eq!(ubx.frame(), None);
        let results = feed(&mut ubx, &message[64..]);
        assert_eq!(results.last(), Some(&Ok(true)));
        let frame = ubx.frame().unwrap();
        assert_eq!(frame.message_type(), Some(MessageType::NavPosPvt));
        assert_eq!(frame.payload.len(), 92);
    }

    #[test]
    fn test_checksum_mismatch() {
        use hex_literal::hex;

        use super::{Error, UBX};

        let mut ubx = UBX::new();
        let results = feed(&mut ubx, &hex!("B5 62 06 00 00 00 06 19"));
        let expected = Error::Checksum { expected: 0x0618, actual: 0x0619 };
        assert_eq!(results.last(), Some(&Err(expected)));
        assert_eq!(ubx.frame(), None);
    }

    #[test]
    fn test_resynchronize() {
        use hex_literal::hex;

        use super::{Error, UBX};

        let mut ubx = UBX::new();
        let results = feed(&mut ubx, &hex!("B5 B5 24"));
        assert_eq!(results, [Ok(false), Ok(false), Err(Error::Unsynchronized(0x24))]);
        let results = feed(&mut ubx, &hex!("B5 62 06 00 00 00 06 18"));
        assert_eq!(results.last(), Some(&Ok(true)));
        assert_eq!(ubx.frame().map(|f| f.payload.len()), Some(0));
    }

    #[test]
    fn test_overflow() {
        use hex_literal::hex;

        use super::{Error, State, UBX};

        let mut ubx = UBX::new();
        let results = feed(&mut ubx, &hex!("B5 62 01 07 01 02"));
        assert_eq!(results.last(), Some(&Err(Error::Overflow(0x201))));
        assert_eq!(ubx.state, State::WaitHeader0);
    }
}
