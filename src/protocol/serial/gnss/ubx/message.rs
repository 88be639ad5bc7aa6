pub const UBX_HEADER0: u8 = 0xB5;
pub const UBX_HEADER1: u8 = 0x62;
pub const MAX_PAYLOAD_SIZE: usize = 512;

pub const CLASS_NAV: u8 = 0x01;
pub const CLASS_ACK: u8 = 0x05;
pub const CLASS_CFG: u8 = 0x06;

pub const ID_NAV_DOP: u8 = 0x04;
pub const ID_NAV_PVT: u8 = 0x07;
pub const ID_NAV_TIMEUTC: u8 = 0x21;
pub const ID_NAV_EOE: u8 = 0x61;
pub const ID_ACK_NAK: u8 = 0x00;
pub const ID_ACK_ACK: u8 = 0x01;
pub const ID_CFG_VALSET: u8 = 0x8A;

/// 8-bit Fletcher over class, id, length and payload
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Checksum(pub u8, pub u8);

impl Checksum {
    pub fn update(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(byte);
        self.1 = self.1.wrapping_add(self.0);
    }

    pub fn digest(bytes: &[u8]) -> Self {
        let mut checksum = Self::default();
        bytes.iter().for_each(|&byte| checksum.update(byte));
        checksum
    }

    pub fn value(self) -> u16 {
        u16::from_be_bytes([self.0, self.1])
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageType {
    NavDop,
    NavPosPvt,
    NavTimeUTC,
    NavEndOfEpoch,
    AckAck,
    AckNak,
}

impl MessageType {
    pub fn try_from(class: u8, id: u8) -> Option<Self> {
        match (class, id) {
            (CLASS_NAV, ID_NAV_DOP) => Some(Self::NavDop),
            (CLASS_NAV, ID_NAV_PVT) => Some(Self::NavPosPvt),
            (CLASS_NAV, ID_NAV_TIMEUTC) => Some(Self::NavTimeUTC),
            (CLASS_NAV, ID_NAV_EOE) => Some(Self::NavEndOfEpoch),
            (CLASS_ACK, ID_ACK_ACK) => Some(Self::AckAck),
            (CLASS_ACK, ID_ACK_NAK) => Some(Self::AckNak),
            _ => None,
        }
    }
}

/// A checksum validated frame
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    pub class: u8,
    pub id: u8,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::try_from(self.class, self.id)
    }
}

/// Appends a complete frame to `buffer`, fails if it does not fit
pub fn encode<const N: usize>(
    class: u8,
    id: u8,
    payload: &[u8],
    buffer: &mut heapless::Vec<u8, N>,
) -> Result<(), ()> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(());
    }
    let start = buffer.len();
    let length = (payload.len() as u16).to_le_bytes();
    buffer.extend_from_slice(&[UBX_HEADER0, UBX_HEADER1, class, id, length[0], length[1]])?;
    buffer.extend_from_slice(payload)?;
    let checksum = Checksum::digest(&buffer[start + 2..]);
    buffer.extend_from_slice(&[checksum.0, checksum.1])
}

mod test {
    #[test]
    fn test_checksum() {
        use super::Checksum;

        // CFG-PRT poll
        let checksum = Checksum::digest(&[0x06, 0x00, 0x00, 0x00]);
        assert_eq!(checksum, Checksum(0x06, 0x18));
        assert_eq!(checksum.value(), 0x0618);
    }

    #[test]
    fn test_encode() {
        use hex_literal::hex;

        use super::{encode, CLASS_CFG, ID_CFG_VALSET};

        let mut buffer: heapless::Vec<u8, 16> = heapless::Vec::new();
        encode(CLASS_CFG, 0x00, &[], &mut buffer).unwrap();
        assert_eq!(&buffer[..], &hex!("B5 62 06 00 00 00 06 18"));

        let mut buffer: heapless::Vec<u8, 8> = heapless::Vec::new();
        assert_eq!(encode(CLASS_CFG, ID_CFG_VALSET, &[0u8; 4], &mut buffer), Err(()));
    }
}
