use bytemuck::{Pod, Zeroable};

fn u32_at(payload: &[u8], offset: usize) -> u32 {
    let bytes = &payload[offset..offset + 4];
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

const CENTISECONDS_PER_DAY: i64 = 24 * 3600 * 100;

/// UTC time of day in centiseconds, nanosecond fraction rounded
pub fn centiseconds_of_day(hour: u8, minute: u8, second: u8, nano: i32) -> u32 {
    let seconds = hour as i64 * 3600 + minute as i64 * 60 + second as i64;
    let fraction = (nano as i64 + 5_000_000).div_euclid(10_000_000);
    (seconds * 100 + fraction).rem_euclid(CENTISECONDS_PER_DAY) as u32
}

fn u16_at(payload: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([payload[offset], payload[offset + 1]])
}

/// UBX-NAV-DOP, DOP values in unit 0.01
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NavDilutionOfPrecision {
    pub itow: u32,
    pub geometric: u16,
    pub position: u16,
    pub time: u16,
    pub vertical: u16,
    pub horizontal: u16,
}

impl NavDilutionOfPrecision {
    pub const SIZE: usize = 18;

    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() != Self::SIZE {
            return None;
        }
        Some(Self {
            itow: u32_at(payload, 0),
            geometric: u16_at(payload, 4),
            position: u16_at(payload, 6),
            time: u16_at(payload, 8),
            vertical: u16_at(payload, 10),
            horizontal: u16_at(payload, 12),
        })
    }

    pub fn pdop(&self) -> f32 {
        self.position as f32 * 0.01
    }
}

/// UBX-NAV-EOE, last message of a navigation epoch
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NavEndOfEpoch {
    pub itow: u32,
}

impl NavEndOfEpoch {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload.len() {
            4 => Some(Self { itow: u32_at(payload, 0) }),
            _ => None,
        }
    }
}

/// UBX-NAV-TIMEUTC
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct NavTimeUTC {
    pub itow: u32,
    pub time_accuracy_estimate: u32, // ns
    pub nano: i32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub valid: u8,
}

impl NavTimeUTC {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(payload).ok()
    }

    pub fn itow(&self) -> u32 {
        u32::from_le(self.itow)
    }

    pub fn valid_utc(&self) -> bool {
        self.valid & (1 << 2) > 0
    }

    pub fn date(&self) -> (u16, u8, u8) {
        (u16::from_le(self.year), self.month, self.day)
    }

    pub fn time(&self) -> (u8, u8, u8) {
        (self.hour, self.minute, self.second)
    }

    pub fn time_of_day(&self) -> Option<u32> {
        if !self.valid_utc() {
            return None;
        }
        let nano = i32::from_le(self.nano);
        Some(centiseconds_of_day(self.hour, self.minute, self.second, nano))
    }
}

/// UBX-ACK-ACK and UBX-ACK-NAK payload
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Acknowledge {
    pub class: u8,
    pub id: u8,
}

impl Acknowledge {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            &[class, id] => Some(Self { class, id }),
            _ => None,
        }
    }
}

mod test {
    #[test]
    fn test_nav_dop() {
        use hex_literal::hex;

        use super::NavDilutionOfPrecision;

        let payload = hex!("E8 03 00 00 A0 00 8C 00 64 00 78 00 50 00 46 00 3C 00");
        let dop = NavDilutionOfPrecision::parse(&payload).unwrap();
        assert_eq!(dop.itow, 1000);
        assert_eq!(dop.position, 140);
        assert!((dop.pdop() - 1.4).abs() < 1e-6);
        assert_eq!(NavDilutionOfPrecision::parse(&payload[..16]), None);
    }

    #[test]
    fn test_centiseconds_of_day() {
        use super::centiseconds_of_day;

        assert_eq!(centiseconds_of_day(12, 35, 19, 0), 4531900);
        assert_eq!(centiseconds_of_day(12, 35, 19, -1000), 4531900);
        assert_eq!(centiseconds_of_day(12, 35, 19, 199_999_000), 4531920);
        assert_eq!(centiseconds_of_day(0, 0, 0, -6_000_000), 8639999);
    }

    #[test]
    fn test_nav_time_utc() {
        use hex_literal::hex;

        use super::NavTimeUTC;

        assert_eq!(core::mem::size_of::<NavTimeUTC>(), 20);
        let payload = hex!("E8 03 00 00 00 00 00 00 00 00 00 00 EA 07 0A 0E 0C 22 38 07");
        let utc = NavTimeUTC::parse(&payload).unwrap();
        assert_eq!(utc.itow(), 1000);
        assert_eq!(utc.date(), (2026, 10, 14));
        assert_eq!(utc.time(), (12, 34, 56));
        assert_eq!(utc.time_of_day(), Some(4529600));
        assert_eq!(utc.valid_utc(), true);
    }
}
