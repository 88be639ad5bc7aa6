use bytemuck::{Pod, Zeroable};

use super::nav::centiseconds_of_day;
use crate::protocol::serial::gnss::out::FixStatus;

#[derive(Debug, Copy, Clone, PartialEq)]
#[repr(u8)]
pub enum FixType {
    NoFix = 0,
    DeadReckoningOnly = 1,
    TwoDemension = 2,
    ThreeDemension = 3,
    GNSSPlusDeadReckoningCombined = 4,
    TimeOnlyFix = 5,
}

impl From<FixType> for FixStatus {
    fn from(fix_type: FixType) -> Self {
        match fix_type {
            FixType::DeadReckoningOnly => Self::DeadReckoning,
            FixType::TwoDemension => Self::Fix2D,
            FixType::ThreeDemension | FixType::GNSSPlusDeadReckoningCombined => Self::Fix3D,
            FixType::NoFix | FixType::TimeOnlyFix => Self::NoFix,
        }
    }
}

/// Payload of UBX-NAV-PVT, all fields little endian
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct NavPositionVelocityTime {
    pub itow: u32, // ms

    pub year: u16,
    pub month: u8,
    pub day: u8,

    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub valid: u8,

    pub time_accuracy_estimate: u32, // ns
    pub nano: i32,                   // -1e9 .. 1e9

    pub fix_type: u8,
    pub flags1: u8,
    pub flags2: u8,
    pub num_satellites: u8,

    pub longitude: i32,           // 1e-7 degree
    pub latitude: i32,            // 1e-7 degree
    pub height: i32,              // height above ellipsoid, unit mm
    pub height_above_msl: i32,    // unit mm
    pub horizental_accuracy: u32, // unit mm
    pub vertical_accuracy: u32,   // unit mm
    pub velocity_north: i32,      // unit mm/s
    pub velocity_east: i32,       // unit mm/s
    pub velocity_down: i32,       // unit mm/s
    pub ground_speed: i32,        // unit mm/s
    pub heading_of_motion: i32,   // 1e-5 unit degree
    pub speed_accuracy: u32,      // unit mm/s
    pub heading_accuracy: u32,    // 1e-5 unit degree

    pub position_dop: u16, // unit 0.01
    pub flags3: u16,
    pub _reserved: [u8; 4],
    pub heading_of_vehicle: i32,   // 1e-5 degree
    pub magnetic_declination: i16, // 1e-2 degree
    pub magnetic_accuracy: u16,    // 1e-2 degree
}

impl NavPositionVelocityTime {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        bytemuck::try_pod_read_unaligned(payload).ok()
    }

    pub fn itow(&self) -> u32 {
        u32::from_le(self.itow)
    }

    pub fn valid_date(&self) -> bool {
        self.valid & (1 << 0) > 0
    }

    pub fn valid_time(&self) -> bool {
        self.valid & (1 << 1) > 0
    }

    pub fn gnss_fix_ok(&self) -> bool {
        self.flags1 & (1 << 0) > 0
    }

    pub fn invalid_lon_lat_height_msl(&self) -> bool {
        u16::from_le(self.flags3) & (1 << 0) > 0
    }

    pub fn fix_type(&self) -> Option<FixType> {
        match self.fix_type {
            0 => Some(FixType::NoFix),
            1 => Some(FixType::DeadReckoningOnly),
            2 => Some(FixType::TwoDemension),
            3 => Some(FixType::ThreeDemension),
            4 => Some(FixType::GNSSPlusDeadReckoningCombined),
            5 => Some(FixType::TimeOnlyFix),
            _ => None,
        }
    }

    /// Fix status taking `gnssFixOK` into account
    pub fn fix_status(&self) -> FixStatus {
        match (self.fix_type(), self.gnss_fix_ok()) {
            (Some(fix_type), true) => fix_type.into(),
            _ => FixStatus::NoFix,
        }
    }

    pub fn date(&self) -> (u16, u8, u8) {
        (u16::from_le(self.year), self.month, self.day)
    }

    pub fn time(&self) -> (u8, u8, u8) {
        (self.hour, self.minute, self.second)
    }

    /// UTC time of day in centiseconds, shared epoch key with NMEA
    pub fn time_of_day(&self) -> Option<u32> {
        if !self.valid_time() {
            return None;
        }
        let nano = i32::from_le(self.nano);
        Some(centiseconds_of_day(self.hour, self.minute, self.second, nano))
    }

    pub fn latitude(&self) -> f64 {
        i32::from_le(self.latitude) as f64 * 1e-7
    }

    pub fn longitude(&self) -> f64 {
        i32::from_le(self.longitude) as f64 * 1e-7
    }

    /// Meter above mean sea level
    pub fn altitude(&self) -> f32 {
        i32::from_le(self.height_above_msl) as f32 / 1000.0
    }

    /// Meter per second
    pub fn ground_speed(&self) -> f32 {
        i32::from_le(self.ground_speed) as f32 / 1000.0
    }

    /// Heading of motion in degree within [0, 360)
    pub fn heading(&self) -> f32 {
        let heading = i32::from_le(self.heading_of_motion).rem_euclid(360_00000);
        heading as f32 * 1e-5
    }

    pub fn pdop(&self) -> f32 {
        u16::from_le(self.position_dop) as f32 * 0.01
    }
}

mod test {
    #[test]
    fn test_ubx_nav_pos_pvt() {
        use hex_literal::hex;

        use super::{FixType, NavPositionVelocityTime};
        use crate::protocol::serial::gnss::out::FixStatus;

        assert_eq!(core::mem::size_of::<NavPositionVelocityTime>(), 92);

        let payload = hex!(
            "00 00 00 00 E0 07 0A 15 16 0D 0A 04 01 00 00 00
             01 00 00 00 03 0C E0 0B 86 BE 2F FF AD 1F 21 04
             E0 F2 09 00 A0 56 09 00 01 00 00 00 01 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00
             00 00 00 00 00 00 00 00 00 00 00 00"
        );
        let pvt = NavPositionVelocityTime::parse(&payload).unwrap();
        assert_eq!(pvt.date(), (2016, 10, 21));
        assert_eq!(pvt.time(), (22, 13, 10));
        assert_eq!(pvt.time_of_day(), None);
        assert_eq!(pvt.fix_type(), Some(FixType::ThreeDemension));
        assert_eq!(pvt.gnss_fix_ok(), false);
        assert_eq!(pvt.fix_status(), FixStatus::NoFix);
        assert!((pvt.longitude() - -1.364825).abs() < 1e-9);
        assert!((pvt.latitude() - 6.9279661).abs() < 1e-9);
        assert!((pvt.altitude() - 612.0).abs() < 1e-3);

        assert_eq!(NavPositionVelocityTime::parse(&payload[..91]), None);
    }

    #[test]
    fn test_heading_normalized() {
        use super::NavPositionVelocityTime;

        let mut pvt = NavPositionVelocityTime::default();
        pvt.heading_of_motion = (-90_00000i32).to_le();
        assert!((pvt.heading() - 270.0).abs() < 1e-3);
        pvt.heading_of_motion = (360_00000i32).to_le();
        assert_eq!(pvt.heading(), 0.0);
    }
}
