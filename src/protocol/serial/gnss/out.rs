use chrono::naive::{NaiveDate, NaiveDateTime};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum FixStatus {
    #[serde(rename = "no-fix")]
    NoFix = 0,
    #[serde(rename = "2D")]
    Fix2D = 1,
    #[serde(rename = "3D")]
    Fix3D = 2,
    #[serde(rename = "dead-reckoning")]
    DeadReckoning = 3,
}

impl Default for FixStatus {
    fn default() -> Self {
        Self::NoFix
    }
}

impl FixStatus {
    /// Dead reckoning is an estimate, not a fix
    pub fn is_fix(self) -> bool {
        matches!(self, Self::Fix2D | Self::Fix3D)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NavigationSolution {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,

    pub latitude: f64,  // degree
    pub longitude: f64, // degree
    pub altitude: f32,  // meter above MSL

    pub ground_speed: f32, // m/s
    pub heading: f32,      // degree, [0, 360)

    pub fix: FixStatus,
    pub satellites: u8,
    pub pdop: f32,

    pub fresh: bool,
}

impl NavigationSolution {
    pub const EMPTY: Self = Self {
        year: 0,
        month: 0,
        day: 0,
        hour: 0,
        minute: 0,
        second: 0,
        latitude: 0.0,
        longitude: 0.0,
        altitude: 0.0,
        ground_speed: 0.0,
        heading: 0.0,
        fix: FixStatus::NoFix,
        satellites: 0,
        pdop: 0.0,
        fresh: false,
    };

    pub fn has_fix(&self) -> bool {
        self.fix.is_fix()
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())?;
        date.and_hms_opt(self.hour.into(), self.minute.into(), self.second.into())
    }
}

mod test {
    #[test]
    fn test_fix_status_order() {
        use super::FixStatus;

        assert!(FixStatus::NoFix < FixStatus::Fix2D);
        assert!(FixStatus::Fix2D < FixStatus::Fix3D);
        assert!(FixStatus::Fix3D < FixStatus::DeadReckoning);
        assert_eq!(FixStatus::DeadReckoning.is_fix(), false);
        assert_eq!(FixStatus::Fix2D.is_fix(), true);
    }

    #[test]
    fn test_datetime() {
        use chrono::naive::NaiveDate;

        use super::NavigationSolution;

        let mut solution = NavigationSolution::EMPTY;
        assert_eq!(solution.datetime(), None);
        solution.year = 1994;
        solution.month = 3;
        solution.day = 23;
        solution.hour = 12;
        solution.minute = 35;
        solution.second = 19;
        let expected = NaiveDate::from_ymd_opt(1994, 3, 23).and_then(|d| d.and_hms_opt(12, 35, 19));
        assert_eq!(solution.datetime(), expected);
    }

    #[test]
    fn test_serialize_navigation_solution() {
        use serde_json::json;

        use super::{FixStatus, NavigationSolution};

        let solution = NavigationSolution {
            latitude: 48.5,
            longitude: -11.25,
            altitude: 545.5,
            fix: FixStatus::Fix3D,
            satellites: 8,
            ..NavigationSolution::EMPTY
        };
        let expected = json!({
            "year": 0,
            "month": 0,
            "day": 0,
            "hour": 0,
            "minute": 0,
            "second": 0,
            "latitude": 48.5,
            "longitude": -11.25,
            "altitude": 545.5,
            "ground-speed": 0.0,
            "heading": 0.0,
            "fix": "3D",
            "satellites": 8,
            "pdop": 0.0,
            "fresh": false,
        });
        assert_eq!(expected, serde_json::to_value(&solution).unwrap());
    }
}
