use crate::config::Commit;

use super::{
    nmea::{
        sentence::{Date, TimeOfDay, GGA, GSA, RMC, VTG, ZDA},
        Sentence,
    },
    out::{FixStatus, NavigationSolution},
    ubx::{
        message::{Frame, MessageType},
        nav::{Acknowledge, NavDilutionOfPrecision, NavEndOfEpoch, NavTimeUTC},
        nav_pos_pvt::NavPositionVelocityTime,
    },
};

/// Fields collected from the messages of one epoch
#[derive(Copy, Clone, Debug, Default)]
struct Staging {
    time_of_week: Option<u32>, // ms
    time_of_day: Option<u32>,  // centisecond
    time: Option<(u8, u8, u8)>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f32>,
    ground_speed: Option<f32>,
    heading: Option<f32>,
    quality: Option<FixStatus>,
    mode: Option<FixStatus>,
    satellites: Option<u8>,
    satellites_used: u8,
    pdop: Option<f32>,
    anchored: bool,
}

impl Staging {
    fn position(&mut self, latitude: Option<f64>, longitude: Option<f64>) {
        if latitude.is_some() {
            self.latitude = latitude;
        }
        if longitude.is_some() {
            self.longitude = longitude;
        }
    }

    fn velocity(&mut self, ground_speed: Option<f32>, heading: Option<f32>) {
        if ground_speed.is_some() {
            self.ground_speed = ground_speed;
        }
        if heading.is_some() {
            self.heading = heading;
        }
    }

    fn fix(&self) -> FixStatus {
        let mut fix = self.quality.unwrap_or_default();
        if let (FixStatus::Fix2D | FixStatus::Fix3D, Some(mode)) = (fix, self.mode) {
            fix = fix.min(mode);
        }
        if fix != FixStatus::NoFix && (self.latitude.is_none() || self.longitude.is_none()) {
            return FixStatus::NoFix;
        }
        if fix == FixStatus::Fix3D && self.altitude.is_none() {
            return FixStatus::Fix2D;
        }
        fix
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Acknowledgement {
    pub class: u8,
    pub id: u8,
    pub accepted: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Outcome {
    Unknown,
    Malformed,
    Staged,
    Committed(NavigationSolution),
    Acknowledged(Acknowledgement),
}

pub struct Interpreter {
    commit: Commit,
    closing_sentence: [u8; 3],
    date: Option<Date>,
    staging: Staging,
}

impl Interpreter {
    pub fn new(commit: Commit, closing_sentence: &str) -> Self {
        let mut closing = [0u8; 3];
        let bytes = closing_sentence.as_bytes();
        let size = bytes.len().min(closing.len());
        closing[..size].copy_from_slice(&bytes[..size]);
        Self { commit, closing_sentence: closing, date: None, staging: Staging::default() }
    }

    pub fn reset(&mut self) {
        self.staging = Staging::default();
    }

    /// Either key differing from the staged one starts a new epoch
    fn enter(&mut self, time_of_week: Option<u32>, time_of_day: Option<u32>) {
        let differs = |staged: Option<u32>, key: Option<u32>| match (staged, key) {
            (Some(staged), Some(key)) => staged != key,
            _ => false,
        };
        let staging = &self.staging;
        if differs(staging.time_of_week, time_of_week) || differs(staging.time_of_day, time_of_day)
        {
            trace!("Epoch {:?} {:?} dropped", staging.time_of_week, staging.time_of_day);
            self.staging = Staging::default();
        }
        if time_of_week.is_some() {
            self.staging.time_of_week = time_of_week;
        }
        if time_of_day.is_some() {
            self.staging.time_of_day = time_of_day;
        }
    }

    fn enter_time_of_day(&mut self, time: Option<TimeOfDay>) {
        self.enter(None, time.map(|t| t.key()));
        if let Some(t) = time {
            self.staging.time = Some((t.hour, t.minute, t.second));
        }
    }

    fn solution(&self) -> NavigationSolution {
        let staging = &self.staging;
        let date = self.date.unwrap_or(Date { year: 0, month: 0, day: 0 });
        let (hour, minute, second) = staging.time.unwrap_or_default();
        let satellites = match (staging.satellites, staging.satellites_used) {
            (Some(satellites), _) => satellites,
            (None, used) => used,
        };
        NavigationSolution {
            year: date.year,
            month: date.month,
            day: date.day,
            hour,
            minute,
            second,
            latitude: staging.latitude.unwrap_or_default(),
            longitude: staging.longitude.unwrap_or_default(),
            altitude: staging.altitude.unwrap_or_default(),
            ground_speed: staging.ground_speed.unwrap_or_default(),
            heading: staging.heading.unwrap_or_default(),
            fix: staging.fix(),
            satellites,
            pdop: staging.pdop.unwrap_or_default(),
            fresh: true,
        }
    }

    fn applied(&self) -> Outcome {
        match (self.commit, self.staging.anchored) {
            (Commit::Position, true) => Outcome::Committed(self.solution()),
            _ => Outcome::Staged,
        }
    }

    fn end_of_epoch(&self) -> Outcome {
        match (self.commit, self.staging.anchored) {
            (Commit::EndOfEpoch, true) => Outcome::Committed(self.solution()),
            _ => Outcome::Staged,
        }
    }

    fn apply_gga(&mut self, gga: &GGA) {
        self.enter_time_of_day(gga.time);
        let staging = &mut self.staging;
        staging.anchored = true;
        if gga.satellites.is_some() {
            staging.satellites = gga.satellites;
        }
        let quality = match gga.quality {
            Some(0) | Some(7) | Some(8) => FixStatus::NoFix,
            Some(6) => FixStatus::DeadReckoning,
            Some(_) => FixStatus::Fix3D,
            None => return,
        };
        staging.quality = Some(quality);
        if quality == FixStatus::NoFix {
            return;
        }
        staging.position(gga.latitude, gga.longitude);
        if gga.altitude.is_some() {
            staging.altitude = gga.altitude;
        }
    }

    fn apply_rmc(&mut self, rmc: &RMC) {
        self.enter_time_of_day(rmc.time);
        if rmc.date.is_some() {
            self.date = rmc.date;
        }
        let staging = &mut self.staging;
        staging.anchored = true;
        if !rmc.valid {
            staging.quality.get_or_insert(FixStatus::NoFix);
            return;
        }
        let quality =
            if rmc.dead_reckoning() { FixStatus::DeadReckoning } else { FixStatus::Fix3D };
        staging.quality.get_or_insert(quality);
        staging.position(rmc.latitude, rmc.longitude);
        staging.velocity(rmc.ground_speed, rmc.course);
    }

    pub fn apply_sentence(&mut self, sentence: &Sentence) -> Outcome {
        match sentence.kind {
            "GGA" => self.apply_gga(&GGA::decode(sentence)),
            "RMC" => self.apply_rmc(&RMC::decode(sentence)),
            "VTG" => {
                let vtg = VTG::decode(sentence);
                if vtg.valid {
                    self.staging.velocity(vtg.ground_speed, vtg.course);
                }
            }
            "GSA" => {
                let gsa = GSA::decode(sentence);
                let mode = match gsa.mode {
                    Some(2) => Some(FixStatus::Fix2D),
                    Some(3) => Some(FixStatus::Fix3D),
                    Some(_) => Some(FixStatus::NoFix),
                    None => None,
                };
                let staging = &mut self.staging;
                // One GSA per constellation, best mode wins
                staging.mode = staging.mode.max(mode);
                staging.satellites_used = staging.satellites_used.saturating_add(gsa.satellites);
                if gsa.pdop.is_some() {
                    staging.pdop = gsa.pdop;
                }
            }
            "ZDA" => {
                let zda = ZDA::decode(sentence);
                self.enter_time_of_day(zda.time);
                if zda.date.is_some() {
                    self.date = zda.date;
                }
            }
            kind if kind.as_bytes() == self.closing_sentence => return self.end_of_epoch(),
            _ => return Outcome::Unknown,
        }
        if sentence.kind.as_bytes() == self.closing_sentence {
            return self.end_of_epoch();
        }
        self.applied()
    }

    fn apply_pvt(&mut self, pvt: &NavPositionVelocityTime) {
        self.enter(Some(pvt.itow()), pvt.time_of_day());
        if pvt.valid_date() {
            let (year, month, day) = pvt.date();
            self.date = Some(Date { year, month, day });
        }
        let staging = &mut self.staging;
        if pvt.valid_time() {
            staging.time = Some(pvt.time());
        }
        staging.anchored = true;
        let fix = pvt.fix_status();
        staging.quality = Some(fix);
        staging.satellites = Some(pvt.num_satellites);
        staging.pdop = Some(pvt.pdop());
        if fix == FixStatus::NoFix || pvt.invalid_lon_lat_height_msl() {
            return;
        }
        staging.latitude = Some(pvt.latitude());
        staging.longitude = Some(pvt.longitude());
        staging.altitude = Some(pvt.altitude());
        staging.ground_speed = Some(pvt.ground_speed());
        staging.heading = Some(pvt.heading());
    }

    pub fn apply_frame(&mut self, frame: &Frame) -> Outcome {
        let message_type = match frame.message_type() {
            Some(message_type) => message_type,
            None => return Outcome::Unknown,
        };
        let payload = frame.payload;
        match message_type {
            MessageType::NavPosPvt => match NavPositionVelocityTime::parse(payload) {
                Some(pvt) => self.apply_pvt(&pvt),
                None => return Outcome::Malformed,
            },
            MessageType::NavDop => match NavDilutionOfPrecision::parse(payload) {
                Some(dop) => {
                    self.enter(Some(dop.itow), None);
                    self.staging.pdop = Some(dop.pdop());
                }
                None => return Outcome::Malformed,
            },
            MessageType::NavTimeUTC => match NavTimeUTC::parse(payload) {
                Some(utc) => {
                    self.enter(Some(utc.itow()), utc.time_of_day());
                    if utc.valid_utc() {
                        let (year, month, day) = utc.date();
                        self.date = Some(Date { year, month, day });
                        self.staging.time = Some(utc.time());
                    }
                }
                None => return Outcome::Malformed,
            },
            MessageType::NavEndOfEpoch => {
                let eoe = match NavEndOfEpoch::parse(payload) {
                    Some(eoe) => eoe,
                    None => return Outcome::Malformed,
                };
                if self.staging.time_of_week != Some(eoe.itow) {
                    return Outcome::Staged;
                }
                return self.end_of_epoch();
            }
            MessageType::AckAck | MessageType::AckNak => {
                let ack = match Acknowledge::parse(payload) {
                    Some(ack) => ack,
                    None => return Outcome::Malformed,
                };
                let accepted = message_type == MessageType::AckAck;
                let ack = Acknowledgement { class: ack.class, id: ack.id, accepted };
                return Outcome::Acknowledged(ack);
            }
        }
        self.applied()
    }
}

mod test {
    #[cfg(test)]
    use super::{Interpreter, Outcome};
    #[cfg(test)]
    use crate::protocol::serial::gnss::{nmea::Sentence, out::NavigationSolution};

    #[cfg(test)]
    fn apply(interpreter: &mut Interpreter, body: &str) -> Outcome {
        interpreter.apply_sentence(&Sentence::parse(body).unwrap())
    }

    #[cfg(test)]
    fn pvt_payload(itow: u32, (hour, minute, second): (u8, u8, u8)) -> [u8; 92] {
        let mut pvt = [0u8; 92];
        pvt[..4].copy_from_slice(&itow.to_le_bytes());
        pvt[8..11].copy_from_slice(&[hour, minute, second]);
        pvt[11] = 0x03; // valid date and time
        pvt[20] = 3; // 3D
        pvt[21] = 0x01; // gnssFixOK
        pvt[23] = 12;
        pvt[24..28].copy_from_slice(&115166666i32.to_le_bytes());
        pvt[28..32].copy_from_slice(&481173000i32.to_le_bytes());
        pvt[36..40].copy_from_slice(&545400i32.to_le_bytes());
        pvt[60..64].copy_from_slice(&5000i32.to_le_bytes());
        pvt[64..68].copy_from_slice(&270_00000i32.to_le_bytes());
        pvt[76..78].copy_from_slice(&150u16.to_le_bytes());
        pvt
    }

    #[cfg(test)]
    fn committed(outcome: Outcome) -> NavigationSolution {
        match outcome {
            Outcome::Committed(solution) => solution,
            outcome => panic!("Expect committed, got {:?}", outcome),
        }
    }

    #[test]
    fn test_position_then_velocity() {
        use crate::{config::Commit, protocol::serial::gnss::out::FixStatus};

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        let gga = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        let solution = committed(apply(&mut interpreter, gga));
        assert_eq!(solution.fix, FixStatus::Fix3D);
        assert_eq!(solution.ground_speed, 0.0);
        let solution = committed(apply(&mut interpreter, "GPVTG,089.0,T,,,15.2,N,,,A"));
        assert_eq!(solution.fix, FixStatus::Fix3D);
        assert_eq!(solution.heading, 89.0);
        assert!((solution.latitude - 48.1173).abs() < 1e-9);
        assert_eq!((solution.hour, solution.minute, solution.second), (12, 35, 19));
        assert_eq!(solution.satellites, 8);
    }

    #[test]
    fn test_velocity_alone_not_committed() {
        use crate::config::Commit;

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        assert_eq!(apply(&mut interpreter, "GPVTG,089.0,T,,,15.2,N,,,A"), Outcome::Staged);
        assert_eq!(apply(&mut interpreter, "GPTXT,01,01,02,ANTSTATUS=OK"), Outcome::Unknown);
    }

    #[test]
    fn test_new_epoch_drops_staging() {
        use crate::config::Commit;

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        apply(&mut interpreter, "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
        let gga = "GPGGA,123520,4807.040,N,01131.002,E,1,08,0.9,545.6,M,46.9,M,,";
        let solution = committed(apply(&mut interpreter, gga));
        assert_eq!(solution.ground_speed, 0.0);
        assert_eq!(solution.second, 20);
        assert_eq!((solution.year, solution.month, solution.day), (2094, 3, 23));
    }

    #[test]
    fn test_gsa_downgrades() {
        use crate::{config::Commit, protocol::serial::gnss::out::FixStatus};

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        apply(&mut interpreter, "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,");
        let gsa = "GPGSA,A,2,04,05,,09,12,,,24,,,,,2.5,1.3,2.1";
        let solution = committed(apply(&mut interpreter, gsa));
        assert_eq!(solution.fix, FixStatus::Fix2D);
        assert_eq!(solution.pdop, 2.5);
    }

    #[test]
    fn test_dead_reckoning_and_partial_decode() {
        use crate::{config::Commit, protocol::serial::gnss::out::FixStatus};

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        let gga = "GPGGA,123519,4807.038,N,01131.000,E,6,08,0.9,545.4,M,46.9,M,,";
        assert_eq!(committed(apply(&mut interpreter, gga)).fix, FixStatus::DeadReckoning);

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        let gga = "GPGGA,123519,48x7.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        let solution = committed(apply(&mut interpreter, gga));
        assert_eq!(solution.fix, FixStatus::NoFix);
        assert_eq!(solution.satellites, 8);
        assert!((solution.longitude - 11.516666666666667).abs() < 1e-9);
        assert_eq!(solution.altitude, 545.4);
    }

    #[test]
    fn test_gga_bad_quality_keeps_satellites() {
        use crate::{config::Commit, protocol::serial::gnss::out::FixStatus};

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        let gga = "GPGGA,123519,4807.038,N,01131.000,E,x,08,0.9,545.4,M,46.9,M,,";
        let solution = committed(apply(&mut interpreter, gga));
        assert_eq!(solution.fix, FixStatus::NoFix);
        assert_eq!(solution.satellites, 8);
    }

    #[test]
    fn test_end_of_epoch_closing_sentence() {
        use crate::{config::Commit, protocol::serial::gnss::out::FixStatus};

        let mut interpreter = Interpreter::new(Commit::EndOfEpoch, "GLL");
        let rmc = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
        assert_eq!(apply(&mut interpreter, rmc), Outcome::Staged);
        let gga = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        assert_eq!(apply(&mut interpreter, gga), Outcome::Staged);
        let gll = "GPGLL,4807.038,N,01131.000,E,123519,A,A";
        let solution = committed(apply(&mut interpreter, gll));
        assert_eq!(solution.fix, FixStatus::Fix3D);
        assert!((solution.ground_speed - 11.523546).abs() < 1e-4);
        assert_eq!(solution.altitude, 545.4);
    }

    #[test]
    fn test_ubx_end_of_epoch() {
        use hex_literal::hex;

        use crate::{
            config::Commit,
            protocol::serial::gnss::{out::FixStatus, ubx::message::Frame},
        };

        let mut interpreter = Interpreter::new(Commit::EndOfEpoch, "GLL");
        let pvt = pvt_payload(1000, (12, 35, 19));
        let frame = Frame { class: 0x01, id: 0x07, payload: &pvt };
        assert_eq!(interpreter.apply_frame(&frame), Outcome::Staged);

        let eoe = hex!("D0 07 00 00");
        let frame = Frame { class: 0x01, id: 0x61, payload: &eoe };
        assert_eq!(interpreter.apply_frame(&frame), Outcome::Staged);

        let eoe = hex!("E8 03 00 00");
        let frame = Frame { class: 0x01, id: 0x61, payload: &eoe };
        let solution = committed(interpreter.apply_frame(&frame));
        assert_eq!(solution.fix, FixStatus::Fix3D);
        assert_eq!(solution.satellites, 12);
        assert!((solution.latitude - 48.1173).abs() < 1e-7);
        assert!((solution.pdop - 1.5).abs() < 1e-6);

        let frame = Frame { class: 0x01, id: 0x07, payload: &pvt[..80] };
        assert_eq!(interpreter.apply_frame(&frame), Outcome::Malformed);
    }

    #[test]
    fn test_both_protocols_share_epoch() {
        use crate::{
            config::Commit,
            protocol::serial::gnss::{out::FixStatus, ubx::message::Frame},
        };

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        let pvt = pvt_payload(2000, (12, 35, 19));
        let frame = Frame { class: 0x01, id: 0x07, payload: &pvt };
        let solution = committed(interpreter.apply_frame(&frame));
        assert!((solution.ground_speed - 5.0).abs() < 1e-6);

        let gga = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        let solution = committed(apply(&mut interpreter, gga));
        assert_eq!(solution.fix, FixStatus::Fix3D);
        assert_eq!(solution.satellites, 8);
        assert!((solution.ground_speed - 5.0).abs() < 1e-6);
        assert!((solution.heading - 270.0).abs() < 1e-3);
        assert!((solution.pdop - 1.5).abs() < 1e-6);

        let gga = "GPGGA,123520,4807.040,N,01131.002,E,1,08,0.9,545.6,M,46.9,M,,";
        let solution = committed(apply(&mut interpreter, gga));
        assert_eq!((solution.ground_speed, solution.pdop), (0.0, 0.0));

        let pvt = pvt_payload(3000, (12, 35, 20));
        let frame = Frame { class: 0x01, id: 0x07, payload: &pvt };
        let solution = committed(interpreter.apply_frame(&frame));
        assert_eq!(solution.satellites, 12);
        assert_eq!(solution.altitude, 545.4);
    }

    #[test]
    fn test_acknowledge() {
        use super::Acknowledgement;
        use crate::{config::Commit, protocol::serial::gnss::ubx::message::Frame};

        let mut interpreter = Interpreter::new(Commit::Position, "GLL");
        let frame = Frame { class: 0x05, id: 0x00, payload: &[0x06, 0x8A] };
        let expected = Acknowledgement { class: 0x06, id: 0x8A, accepted: false };
        assert_eq!(interpreter.apply_frame(&frame), Outcome::Acknowledged(expected));
        let frame = Frame { class: 0x0A, id: 0x04, payload: &[] };
        assert_eq!(interpreter.apply_frame(&frame), Outcome::Unknown);
    }
}
