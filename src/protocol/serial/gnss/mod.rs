pub mod interpreter;
pub mod nmea;
pub mod out;
pub mod ubx;

use core::fmt;

use crate::{config::GNSSConfig, protocol::serial::Receiver};

use interpreter::{Acknowledgement, Interpreter, Outcome};
use out::NavigationSolution;
use ubx::message::UBX_HEADER0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Byte cannot start or continue a frame header
    Unsynchronized(u8),
    /// Byte cannot be part of a sentence
    Interrupted(u8),
    Checksum { expected: u16, actual: u16 },
    Overflow(usize),
    Malformed,
}

impl Error {
    /// Byte rejected by the parser, which may begin the next message
    pub fn unconsumed(self) -> Option<u8> {
        match self {
            Self::Unsynchronized(byte) | Self::Interrupted(byte) => Some(byte),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unsynchronized(byte) => write!(f, "Unsynchronized at 0x{:02X}", byte),
            Self::Interrupted(byte) => write!(f, "Interrupted by 0x{:02X}", byte),
            Self::Checksum { expected, actual } => {
                write!(f, "Checksum mismatch, expected 0x{:04X} actual 0x{:04X}", expected, actual)
            }
            Self::Overflow(size) => write!(f, "Overflow at {} bytes", size),
            Self::Malformed => write!(f, "Malformed"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Statistics {
    pub sentences: u32,
    pub frames: u32,
    pub noise: u32,
    pub interrupted: u32,
    pub checksum: u32,
    pub overflow: u32,
    pub malformed: u32,
    pub unknown: u32,
    pub commits: u32,
    pub timeouts: u32,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Claim {
    Idle,
    Sentence,
    Frame,
}

/// Routes each byte to the parser owning the message in progress
pub struct GNSSReceiver {
    claim: Claim,
    nmea: nmea::NMEA,
    ubx: ubx::UBX,
    interpreter: Interpreter,
    statistics: Statistics,
    acknowledgement: Option<Acknowledgement>,
}

impl GNSSReceiver {
    pub fn new(config: &GNSSConfig) -> Self {
        Self {
            claim: Claim::Idle,
            nmea: nmea::NMEA::new(),
            ubx: ubx::UBX::new(),
            interpreter: Interpreter::new(config.commit, config.closing_sentence.as_str()),
            statistics: Statistics::default(),
            acknowledgement: None,
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn take_acknowledgement(&mut self) -> Option<Acknowledgement> {
        self.acknowledgement.take()
    }

    pub fn in_progress(&self) -> bool {
        self.claim != Claim::Idle
    }

    /// Drops the message in progress together with the staged epoch
    pub fn reset(&mut self) {
        self.claim = Claim::Idle;
        self.nmea.reset();
        self.ubx.reset();
        self.interpreter.reset();
    }

    /// Drops the message in progress, staged epoch is kept
    pub fn timeout(&mut self) {
        self.claim = Claim::Idle;
        self.nmea.reset();
        self.ubx.reset();
        self.statistics.timeouts += 1;
    }

    fn count(&mut self, error: Error) {
        let statistics = &mut self.statistics;
        match error {
            Error::Unsynchronized(_) => statistics.noise += 1,
            Error::Interrupted(_) => statistics.interrupted += 1,
            Error::Checksum { .. } => statistics.checksum += 1,
            Error::Overflow(_) => statistics.overflow += 1,
            Error::Malformed => statistics.malformed += 1,
        }
        match error {
            Error::Checksum { .. } | Error::Overflow(_) => warn!("GNSS message dropped: {}", error),
            _ => debug!("GNSS message dropped: {}", error),
        }
    }

    fn interpret(&mut self, claim: Claim) -> Option<NavigationSolution> {
        let outcome = match claim {
            Claim::Sentence => {
                self.statistics.sentences += 1;
                match self.nmea.sentence() {
                    Some(sentence) => self.interpreter.apply_sentence(&sentence),
                    None => Outcome::Malformed,
                }
            }
            _ => {
                self.statistics.frames += 1;
                match self.ubx.frame() {
                    Some(frame) => self.interpreter.apply_frame(&frame),
                    None => Outcome::Malformed,
                }
            }
        };
        match outcome {
            Outcome::Unknown => self.statistics.unknown += 1,
            Outcome::Malformed => self.statistics.malformed += 1,
            Outcome::Staged => (),
            Outcome::Committed(solution) => {
                self.statistics.commits += 1;
                return Some(solution);
            }
            Outcome::Acknowledged(ack) => self.acknowledgement = Some(ack),
        }
        None
    }

    /// Returns the solution committed by this byte, if any
    pub fn receive_byte(&mut self, mut byte: u8) -> Option<NavigationSolution> {
        loop {
            let result = match self.claim {
                Claim::Idle => {
                    self.claim = match byte {
                        UBX_HEADER0 => Claim::Frame,
                        b'$' => Claim::Sentence,
                        b'\r' | b'\n' => return None,
                        _ => {
                            self.statistics.noise += 1;
                            return None;
                        }
                    };
                    continue;
                }
                Claim::Sentence => self.nmea.receive_byte(byte),
                Claim::Frame => self.ubx.receive_byte(byte),
            };
            let claim = self.claim;
            match result {
                Ok(false) => return None,
                Ok(true) => {
                    self.claim = Claim::Idle;
                    return self.interpret(claim);
                }
                Err(error) => {
                    self.claim = Claim::Idle;
                    self.count(error);
                    // Only a byte arriving after the claim is handed back
                    byte = error.unconsumed()?;
                }
            }
        }
    }
}

mod test {
    #[cfg(test)]
    use super::{GNSSReceiver, NavigationSolution};

    #[cfg(test)]
    fn receive(receiver: &mut GNSSReceiver, bytes: &[u8]) -> std::vec::Vec<NavigationSolution> {
        bytes.iter().filter_map(|&byte| receiver.receive_byte(byte)).collect()
    }

    #[cfg(test)]
    const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    #[cfg(test)]
    const VTG: &[u8] = b"$GPVTG,089.0,T,,,15.2,N,,,A*12\r\n";

    #[test]
    fn test_noise_before_sentence() {
        use crate::config::GNSSConfig;

        let mut receiver = GNSSReceiver::new(&GNSSConfig::default());
        let mut bytes = std::vec::Vec::from(&b"\x00\x13garbage"[..]);
        bytes.extend_from_slice(GGA);
        let solutions = receive(&mut receiver, &bytes);
        assert_eq!(solutions.len(), 1);
        assert_eq!(receiver.statistics().noise, 9);
        assert_eq!(receiver.statistics().sentences, 1);
    }

    #[test]
    fn test_interrupted_sentence_resumes() {
        use crate::config::GNSSConfig;

        let mut receiver = GNSSReceiver::new(&GNSSConfig::default());
        let mut bytes = std::vec::Vec::from(&b"$GPGGA,1235"[..]);
        bytes.extend_from_slice(GGA);
        let solutions = receive(&mut receiver, &bytes);
        assert_eq!(solutions.len(), 1);
        assert_eq!(receiver.statistics().interrupted, 1);
        assert!(!receiver.in_progress());
    }

    #[test]
    fn test_sentence_after_stray_sync() {
        use crate::config::GNSSConfig;

        let mut receiver = GNSSReceiver::new(&GNSSConfig::default());
        let mut bytes = std::vec::Vec::from(&[0xB5u8][..]);
        bytes.extend_from_slice(GGA);
        assert_eq!(receive(&mut receiver, &bytes).len(), 1);
        assert_eq!(receiver.statistics().noise, 1);
    }

    #[test]
    fn test_mixed_protocols() {
        use hex_literal::hex;

        use crate::config::GNSSConfig;

        let mut receiver = GNSSReceiver::new(&GNSSConfig::default());
        let mut bytes = std::vec::Vec::new();
        bytes.extend_from_slice(&hex!("B5 62 05 01 02 00 06 8A 98 C1"));
        bytes.extend_from_slice(GGA);
        bytes.extend_from_slice(&hex!("B5 62 0A 04 00 00 0E 34"));
        bytes.extend_from_slice(VTG);
        let solutions = receive(&mut receiver, &bytes);
        assert_eq!(solutions.len(), 2);
        assert_eq!(solutions[1].heading, 89.0);
        let statistics = receiver.statistics();
        assert_eq!((statistics.frames, statistics.sentences), (2, 2));
        assert_eq!(statistics.unknown, 1);
        let ack = receiver.take_acknowledgement().unwrap();
        assert_eq!((ack.class, ack.id, ack.accepted), (0x06, 0x8A, true));
    }
}
