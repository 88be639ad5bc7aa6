use core::{str::FromStr, time::Duration};

use heapless::String;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GNSSProtocol {
    UBX,
    NMEA,
    #[serde(rename = "UBX+NMEA")]
    Both,
}

impl FromStr for GNSSProtocol {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, ()> {
        match string {
            "UBX" => Ok(Self::UBX),
            "NMEA" => Ok(Self::NMEA),
            "UBX+NMEA" => Ok(Self::Both),
            _ => Err(()),
        }
    }
}

impl GNSSProtocol {
    pub fn ubx(self) -> bool {
        self != Self::NMEA
    }

    pub fn nmea(self) -> bool {
        self != Self::UBX
    }
}

/// When the staged epoch is published
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Commit {
    /// After every message once a position bearing one arrived
    Position,
    /// On NAV-EOE or the closing sentence of the epoch
    EndOfEpoch,
}

impl Default for Commit {
    fn default() -> Self {
        Self::Position
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("closing sentence must be three upper-case letters")]
    ClosingSentence,
    #[error("measurement period must not be zero")]
    MeasurementPeriod,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[serde(default)]
pub struct GNSSConfig {
    pub baudrate: u32,
    pub protocol: GNSSProtocol,
    pub commit: Commit,
    pub closing_sentence: String<8>,
    pub measurement_period: u16, // ms
    pub idle_timeout: u16,       // ms, zero to disable
    pub configure_receiver: bool,
}

impl Default for GNSSConfig {
    fn default() -> Self {
        let mut closing_sentence = String::new();
        closing_sentence.push_str("GLL").ok();
        Self {
            baudrate: 115200,
            protocol: GNSSProtocol::Both,
            commit: Commit::default(),
            closing_sentence,
            measurement_period: 200,
            idle_timeout: 0,
            configure_receiver: true,
        }
    }
}

impl GNSSConfig {
    pub fn validate(&self) -> Result<(), Error> {
        let sentence = self.closing_sentence.as_bytes();
        if sentence.len() != 3 || !sentence.iter().all(u8::is_ascii_uppercase) {
            return Err(Error::ClosingSentence);
        }
        if self.measurement_period == 0 {
            return Err(Error::MeasurementPeriod);
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.idle_timeout {
            0 => None,
            millis => Some(Duration::from_millis(millis as u64)),
        }
    }
}

mod test {
    #[test]
    fn test_deserialize_gnss_config() {
        use super::{Commit, GNSSConfig, GNSSProtocol};

        let config: GNSSConfig = serde_json::from_str(
            r#"{"protocol": "NMEA", "commit": "end-of-epoch", "closing-sentence": "VTG",
                "idle-timeout": 500}"#,
        )
        .unwrap();
        assert_eq!(config.protocol, GNSSProtocol::NMEA);
        assert_eq!(config.commit, Commit::EndOfEpoch);
        assert_eq!(config.closing_sentence.as_str(), "VTG");
        assert_eq!(config.baudrate, 115200);
        assert_eq!(config.idle_timeout(), Some(core::time::Duration::from_millis(500)));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate() {
        use super::{Error, GNSSConfig};

        let mut config = GNSSConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.idle_timeout(), None);
        config.closing_sentence.clear();
        config.closing_sentence.push_str("gll").ok();
        assert_eq!(config.validate(), Err(Error::ClosingSentence));
        config = GNSSConfig { measurement_period: 0, ..Default::default() };
        assert_eq!(config.validate(), Err(Error::MeasurementPeriod));
    }

    #[test]
    fn test_protocol_from_str() {
        use super::GNSSProtocol;

        assert_eq!("UBX+NMEA".parse::<GNSSProtocol>(), Ok(GNSSProtocol::Both));
        assert_eq!("NMEA".parse::<GNSSProtocol>().map(|p| p.ubx()), Ok(false));
        assert_eq!("GPS".parse::<GNSSProtocol>(), Err(()));
    }
}
