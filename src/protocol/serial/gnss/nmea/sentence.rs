use super::Sentence;

const KNOT: f32 = 0.514444; // m/s
const KILOMETER_PER_HOUR: f32 = 1.0 / 3.6; // m/s

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub centisecond: u8,
}

impl TimeOfDay {
    /// Centiseconds since midnight
    pub fn key(&self) -> u32 {
        let seconds = self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32;
        seconds * 100 + self.centisecond as u32
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

fn digits(field: &str) -> Option<u32> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

fn two_digits(field: &str, at: usize) -> Option<u8> {
    field.get(at..at + 2).and_then(digits).map(|v| v as u8)
}

/// `hhmmss` with optional fraction
pub fn parse_time(field: &str) -> Option<TimeOfDay> {
    let (integer, fraction) = field.split_once('.').unwrap_or((field, ""));
    if integer.len() != 6 {
        return None;
    }
    let hour = two_digits(integer, 0)?;
    let minute = two_digits(integer, 2)?;
    let second = two_digits(integer, 4)?;
    if hour > 23 || minute > 59 || second > 60 {
        return None;
    }
    let centisecond = match fraction.len() {
        0 => 0,
        1 => digits(fraction)? as u8 * 10,
        _ => two_digits(fraction, 0)?,
    };
    Some(TimeOfDay { hour, minute, second, centisecond })
}

/// `ddmmyy`
pub fn parse_date(field: &str) -> Option<Date> {
    if field.len() != 6 {
        return None;
    }
    let (day, month, year) = (two_digits(field, 0)?, two_digits(field, 2)?, two_digits(field, 4)?);
    if day == 0 || day > 31 || month == 0 || month > 12 {
        return None;
    }
    Some(Date { year: 2000 + year as u16, month, day })
}

/// `ddmm.mmmm` or `dddmm.mmmm` followed by hemisphere, in degree
pub fn parse_coordinate(value: &str, hemisphere: &str, degree_digits: usize) -> Option<f64> {
    let integer = value.split('.').next()?;
    if integer.len() != degree_digits + 2 {
        return None;
    }
    let degrees = digits(&value[..degree_digits])? as f64;
    let minutes: f64 = value[degree_digits..].parse().ok()?;
    if !(0.0..60.0).contains(&minutes) {
        return None;
    }
    let degrees = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(degrees),
        "S" | "W" => Some(-degrees),
        _ => None,
    }
}

fn parse_f32(field: &str) -> Option<f32> {
    if field.is_empty() {
        return None;
    }
    field.parse().ok()
}

fn first_char(field: &str) -> Option<u8> {
    field.bytes().next()
}

/// Global positioning system fix data
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct GGA {
    pub time: Option<TimeOfDay>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub quality: Option<u8>,
    pub satellites: Option<u8>,
    pub altitude: Option<f32>,
}

impl GGA {
    pub fn decode(sentence: &Sentence) -> Self {
        let field = |index| sentence.field(index);
        Self {
            time: parse_time(field(0)),
            latitude: parse_coordinate(field(1), field(2), 2),
            longitude: parse_coordinate(field(3), field(4), 3),
            quality: digits(field(5)).map(|v| v as u8),
            satellites: digits(field(6)).map(|v| v.min(u8::MAX as u32) as u8),
            altitude: parse_f32(field(8)),
        }
    }
}

/// Recommended minimum specific GNSS data
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RMC {
    pub time: Option<TimeOfDay>,
    pub valid: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ground_speed: Option<f32>, // m/s
    pub course: Option<f32>,       // degree
    pub date: Option<Date>,
    pub mode: Option<u8>,
}

impl RMC {
    pub fn decode(sentence: &Sentence) -> Self {
        let field = |index| sentence.field(index);
        let mode = first_char(field(11));
        Self {
            time: parse_time(field(0)),
            valid: field(1) == "A" && mode != Some(b'N'),
            latitude: parse_coordinate(field(2), field(3), 2),
            longitude: parse_coordinate(field(4), field(5), 3),
            ground_speed: parse_f32(field(6)).map(|knots| knots * KNOT),
            course: parse_f32(field(7)),
            date: parse_date(field(8)),
            mode,
        }
    }

    pub fn dead_reckoning(&self) -> bool {
        self.mode == Some(b'E')
    }
}

/// Course over ground and ground speed
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct VTG {
    pub course: Option<f32>,
    pub ground_speed: Option<f32>, // m/s
    pub valid: bool,
}

impl VTG {
    pub fn decode(sentence: &Sentence) -> Self {
        let field = |index| sentence.field(index);
        let knots = parse_f32(field(4)).map(|knots| knots * KNOT);
        let speed = knots.or_else(|| parse_f32(field(6)).map(|kmh| kmh * KILOMETER_PER_HOUR));
        Self { course: parse_f32(field(0)), ground_speed: speed, valid: field(8) != "N" }
    }
}

/// DOP and active satellites
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct GSA {
    pub mode: Option<u8>,
    pub satellites: u8,
    pub pdop: Option<f32>,
}

impl GSA {
    pub fn decode(sentence: &Sentence) -> Self {
        let satellites = sentence.fields().skip(2).take(12).filter(|f| !f.is_empty()).count();
        Self {
            mode: digits(sentence.field(1)).filter(|m| (1..=3).contains(m)).map(|m| m as u8),
            satellites: satellites as u8,
            pdop: parse_f32(sentence.field(14)),
        }
    }
}

/// Time and date
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ZDA {
    pub time: Option<TimeOfDay>,
    pub date: Option<Date>,
}

impl ZDA {
    pub fn decode(sentence: &Sentence) -> Self {
        let field = |index| sentence.field(index);
        let day = digits(field(1)).filter(|d| (1..=31).contains(d));
        let month = digits(field(2)).filter(|m| (1..=12).contains(m));
        let year = digits(field(3)).filter(|_| field(3).len() == 4);
        let date = match (year, month, day) {
            (Some(year), Some(month), Some(day)) => {
                Some(Date { year: year as u16, month: month as u8, day: day as u8 })
            }
            _ => None,
        };
        Self { time: parse_time(field(0)), date }
    }
}

mod test {
    #[cfg(test)]
    fn sentence(body: &str) -> super::Sentence<'_> {
        super::Sentence::parse(body).unwrap()
    }

    #[test]
    fn test_parse_coordinate() {
        use super::parse_coordinate;

        let latitude = parse_coordinate("4807.038", "N", 2).unwrap();
        assert!((latitude - 48.1173).abs() < 1e-9);
        let longitude = parse_coordinate("01131.000", "W", 3).unwrap();
        assert!((longitude - -11.516666666666667).abs() < 1e-9);
        assert_eq!(parse_coordinate("4807.038", "", 2), None);
        assert_eq!(parse_coordinate("48x7.038", "N", 2), None);
        assert_eq!(parse_coordinate("4867.038", "N", 2), None);
        assert_eq!(parse_coordinate("", "N", 2), None);
    }

    #[test]
    fn test_parse_time() {
        use super::{parse_date, parse_time, Date, TimeOfDay};

        let expected = TimeOfDay { hour: 12, minute: 35, second: 19, centisecond: 50 };
        assert_eq!(parse_time("123519.50"), Some(expected));
        assert_eq!(parse_time("123519").map(|t| t.key()), Some(4531900));
        assert_eq!(parse_time("1235"), None);
        assert_eq!(parse_time("253519"), None);
        assert_eq!(parse_date("230394"), Some(Date { year: 2094, month: 3, day: 23 }));
        assert_eq!(parse_date("231394"), None);
    }

    #[test]
    fn test_gga() {
        use super::GGA;

        let body = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        let gga = GGA::decode(&sentence(body));
        assert_eq!(gga.quality, Some(1));
        assert_eq!(gga.satellites, Some(8));
        assert_eq!(gga.altitude, Some(545.4));
        assert!((gga.longitude.unwrap() - 11.516666666666667).abs() < 1e-9);

        let body = "GPGGA,123519,48x7.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        let gga = GGA::decode(&sentence(body));
        assert_eq!(gga.latitude, None);
        assert!(gga.longitude.is_some());
        assert_eq!(gga.altitude, Some(545.4));
    }

    #[test]
    fn test_rmc() {
        use super::RMC;

        let body = "GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
        let rmc = RMC::decode(&sentence(body));
        assert_eq!(rmc.valid, true);
        assert!((rmc.ground_speed.unwrap() - 11.523546).abs() < 1e-4);
        assert_eq!(rmc.course, Some(84.4));
        assert_eq!(rmc.dead_reckoning(), false);

        let rmc = RMC::decode(&sentence("GPRMC,123519,V,,,,,,,230394,,,N"));
        assert_eq!(rmc.valid, false);
        assert_eq!(rmc.latitude, None);
    }

    #[test]
    fn test_vtg() {
        use super::VTG;

        let vtg = VTG::decode(&sentence("GPVTG,089.0,T,,,15.2,N,,,A"));
        assert_eq!(vtg.course, Some(89.0));
        assert!((vtg.ground_speed.unwrap() - 7.8195488).abs() < 1e-4);
        let vtg = VTG::decode(&sentence("GPVTG,089.0,T,,M,,N,36.0,K,A"));
        assert!((vtg.ground_speed.unwrap() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_gsa_zda() {
        use super::{Date, GSA, ZDA};

        let gsa = GSA::decode(&sentence("GPGSA,A,3,04,05,,09,12,,,24,,,,,2.5,1.3,2.1"));
        assert_eq!(gsa.mode, Some(3));
        assert_eq!(gsa.satellites, 5);
        assert_eq!(gsa.pdop, Some(2.5));

        let zda = ZDA::decode(&sentence("GPZDA,123519.00,23,03,1994,00,00"));
        assert_eq!(zda.date, Some(Date { year: 1994, month: 3, day: 23 }));
        assert_eq!(zda.time.map(|t| t.hour), Some(12));
    }
}
