pub mod sentence;

use core::str::{from_utf8, Split};

use heapless::Vec;

use super::Error;
use crate::protocol::serial::Receiver;

/// Characters between `$` and `*`
pub const MAX_SENTENCE_SIZE: usize = 96;

#[derive(Copy, Clone, Debug, PartialEq)]
enum State {
    Idle,
    Body,
    ChecksumHigh,
    ChecksumLow(u8),
    Terminator(u8),
}

fn hex_digit(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

/// Bytes that can never be part of a sentence, possibly the start of the next message
fn interrupts(byte: u8) -> bool {
    byte == b'$' || !(is_terminator(byte) || (0x20..0x7F).contains(&byte))
}

pub struct Sentence<'a> {
    pub talker: &'a str,
    pub kind: &'a str,
    fields: &'a str,
}

impl<'a> Sentence<'a> {
    pub(crate) fn parse(body: &'a str) -> Option<Self> {
        let (address, fields) = body.split_once(',').unwrap_or((body, ""));
        if address.len() < 3 || !address.is_ascii() {
            return None;
        }
        let (talker, kind) =
            if address.starts_with('P') { address.split_at(1) } else { address.split_at(2) };
        Some(Self { talker, kind, fields })
    }

    /// Fields after the address
    pub fn fields(&self) -> Split<'a, char> {
        self.fields.split(',')
    }

    pub fn field(&self, index: usize) -> &'a str {
        self.fields().nth(index).unwrap_or("")
    }
}

pub struct NMEA {
    state: State,
    checksum: u8,
    body: Vec<u8, MAX_SENTENCE_SIZE>,
    complete: bool,
}

impl NMEA {
    pub fn new() -> Self {
        Self { state: State::Idle, checksum: 0, body: Vec::new(), complete: false }
    }

    /// Last validated sentence, until the next one begins
    pub fn sentence(&self) -> Option<Sentence<'_>> {
        if !self.complete {
            return None;
        }
        Sentence::parse(from_utf8(&self.body).ok()?)
    }

    fn abandon(&mut self, byte: u8) -> Error {
        self.state = State::Idle;
        if interrupts(byte) {
            Error::Interrupted(byte)
        } else {
            Error::Malformed
        }
    }
}

impl Default for NMEA {
    fn default() -> Self {
        Self::new()
    }
}

impl Receiver for NMEA {
    type Error = Error;

    fn receive_byte(&mut self, byte: u8) -> Result<bool, Error> {
        self.state = match (self.state, byte) {
            (State::Idle, b'$') => {
                self.complete = false;
                self.checksum = 0;
                self.body.clear();
                State::Body
            }
            (State::Idle, _) => return Err(Error::Unsynchronized(byte)),
            (State::Body, b'*') => State::ChecksumHigh,
            (State::Body, _) if is_terminator(byte) => {
                self.state = State::Idle;
                return Err(Error::Malformed);
            }
            (State::Body, _) if interrupts(byte) => return Err(self.abandon(byte)),
            (State::Body, _) => {
                if self.body.push(byte).is_err() {
                    self.state = State::Idle;
                    return Err(Error::Overflow(MAX_SENTENCE_SIZE));
                }
                self.checksum ^= byte;
                State::Body
            }
            (State::ChecksumHigh, _) => match hex_digit(byte) {
                Some(high) => State::ChecksumLow(high),
                None => return Err(self.abandon(byte)),
            },
            (State::ChecksumLow(high), _) => match hex_digit(byte) {
                Some(low) => State::Terminator(high << 4 | low),
                None => return Err(self.abandon(byte)),
            },
            (State::Terminator(actual), _) if is_terminator(byte) => {
                self.state = State::Idle;
                if actual != self.checksum {
                    let expected = self.checksum as u16;
                    return Err(Error::Checksum { expected, actual: actual as u16 });
                }
                self.complete = true;
                return Ok(true);
            }
            (State::Terminator(_), _) => return Err(self.abandon(byte)),
        };
        Ok(false)
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.complete = false;
    }
}

mod test {
    #[cfg(test)]
    fn feed(nmea: &mut super::NMEA, bytes: &[u8]) -> Option<Result<bool, super::Error>> {
        use crate::protocol::serial::Receiver;

        let mut last = None;
        for &byte in bytes.iter() {
            let result = nmea.receive_byte(byte);
            if result != Ok(false) {
                return Some(result);
            }
            last = Some(result);
        }
        last
    }

    #[test]
    fn test_sentence() {
        use super::NMEA;

        let mut nmea = NMEA::new();
        let line = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
        assert_eq!(feed(&mut nmea, line), Some(Ok(true)));
        let sentence = nmea.sentence().unwrap();
        assert_eq!(sentence.talker, "GP");
        assert_eq!(sentence.kind, "GGA");
        assert_eq!(sentence.field(1), "4807.038");
        assert_eq!(sentence.field(13), "");
        assert_eq!(sentence.fields().count(), 14);
    }

    #[test]
    fn test_lower_case_checksum() {
        use super::NMEA;

        let mut nmea = NMEA::new();
        let line = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6a\n";
        assert_eq!(feed(&mut nmea, line), Some(Ok(true)));
        assert_eq!(nmea.sentence().map(|s| s.kind), Some("RMC"));
    }

    #[test]
    fn test_flipped_bit() {
        use super::{Error, NMEA};

        let mut nmea = NMEA::new();
        // '4' of the latitude flipped to '5'
        let line = b"$GPGGA,123519,5807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
        let expected = Error::Checksum { expected: 0x46, actual: 0x47 };
        assert_eq!(feed(&mut nmea, line), Some(Err(expected)));
        assert!(nmea.sentence().is_none());
    }

    #[test]
    fn test_missing_checksum() {
        use super::{Error, NMEA};

        let mut nmea = NMEA::new();
        assert_eq!(feed(&mut nmea, b"$GPGLL,4807.038,N\r\n"), Some(Err(Error::Malformed)));
        assert_eq!(feed(&mut nmea, b"$GPGLL,4807.038,N*4G"), Some(Err(Error::Malformed)));
    }

    #[test]
    fn test_interrupted() {
        use super::{Error, State, NMEA};

        let mut nmea = NMEA::new();
        assert_eq!(feed(&mut nmea, b"$GPGGA,1235$"), Some(Err(Error::Interrupted(b'$'))));
        assert_eq!(nmea.state, State::Idle);
        assert_eq!(feed(&mut nmea, b"$GPGGA,12\xB5"), Some(Err(Error::Interrupted(0xB5))));
    }

    #[test]
    fn test_overflow() {
        use super::{Error, NMEA, MAX_SENTENCE_SIZE};

        let mut nmea = NMEA::new();
        let mut line = std::vec::Vec::from(&b"$GPTXT,"[..]);
        line.resize(MAX_SENTENCE_SIZE + 8, b'A');
        assert_eq!(feed(&mut nmea, &line), Some(Err(Error::Overflow(MAX_SENTENCE_SIZE))));
    }

    #[test]
    fn test_proprietary_address() {
        use super::NMEA;

        let mut nmea = NMEA::new();
        let mut line = std::string::String::from("$PUBX,00");
        let checksum = "PUBX,00".bytes().fold(0u8, |a, b| a ^ b);
        line.push_str(&std::format!("*{:02X}\r\n", checksum));
        assert_eq!(feed(&mut nmea, line.as_bytes()), Some(Ok(true)));
        let sentence = nmea.sentence().unwrap();
        assert_eq!((sentence.talker, sentence.kind), ("P", "UBX"));
    }
}
