use core::{fmt::Debug, time::Duration};

use hal::serial::Transport;

use crate::{
    config::{gnss::Error as ConfigError, Commit, GNSSConfig},
    datastore::NavigationStore,
    protocol::serial::gnss::{
        interpreter::Acknowledgement,
        out::NavigationSolution,
        ubx::{
            cfg::{self, CfgItem, ValSet, LAYER_BBR, LAYER_RAM},
            message::{CLASS_CFG, ID_CFG_VALSET},
        },
        GNSSReceiver, Statistics,
    },
    sys::jiffies,
};

#[derive(Debug, thiserror::Error)]
pub enum InitError<E: Debug> {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("open serial failed: {0:?}")]
    Open(E),
    #[error("receiver configuration does not fit into one frame")]
    Encode,
    #[error("send receiver configuration failed: {0:?}")]
    Transmit(E),
}

/// State of the receiver configuration sent during init
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Configuration {
    Unsent,
    Pending,
    Acknowledged,
    Rejected,
}

fn receiver_configuration(config: &GNSSConfig) -> Result<ValSet, CfgItem> {
    let mut valset = ValSet::new(LAYER_RAM | LAYER_BBR);
    let (ubx, nmea) = (config.protocol.ubx(), config.protocol.nmea());
    let end_of_epoch = config.commit == Commit::EndOfEpoch;
    valset.set(cfg::CFG_UART1OUTPROT_UBX, ubx)?.set(cfg::CFG_UART1OUTPROT_NMEA, nmea)?;
    if ubx {
        valset.set(cfg::CFG_MSGOUT_UBX_NAV_PVT_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_UBX_NAV_DOP_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_UBX_NAV_EOE_UART1, end_of_epoch as u8)?;
    }
    if nmea {
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_GGA_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_RMC_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_VTG_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_GSA_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_GSV_UART1, 0u8)?;
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_GLL_UART1, 1u8)?;
        valset.set(cfg::CFG_MSGOUT_NMEA_ID_ZDA_UART1, 0u8)?;
    }
    valset.set(cfg::CFG_RATE_MEAS, config.measurement_period)?;
    Ok(valset)
}

/// Drives the receiver pipeline from a byte transport into the navigation store
pub struct GNSS<'a, T> {
    config: GNSSConfig,
    transport: T,
    receiver: GNSSReceiver,
    store: &'a NavigationStore,
    initialized: bool,
    configuration: Configuration,
    last_received: Duration,
}

impl<'a, T: Transport> GNSS<'a, T> {
    pub fn new(config: GNSSConfig, transport: T, store: &'a NavigationStore) -> Self {
        let receiver = GNSSReceiver::new(&config);
        Self {
            config,
            transport,
            receiver,
            store,
            initialized: false,
            configuration: Configuration::Unsent,
            last_received: Duration::default(),
        }
    }

    fn try_init(&mut self) -> Result<(), InitError<T::Error>> {
        self.config.validate()?;
        self.transport.open(self.config.baudrate).map_err(InitError::Open)?;
        self.receiver.reset();
        if self.config.configure_receiver {
            let valset = receiver_configuration(&self.config).map_err(|_| InitError::Encode)?;
            let frame = valset.encode().map_err(|_| InitError::Encode)?;
            self.transport.transmit(&frame).map_err(InitError::Transmit)?;
            self.configuration = Configuration::Pending;
            debug!("GNSS configuration sent with {} items", valset.items().len());
        }
        Ok(())
    }

    /// Opens the transport and configures the receiver, nothing is
    /// processed until this succeeds
    pub fn init(&mut self) -> Result<(), InitError<T::Error>> {
        self.initialized = false;
        if let Err(e) = self.try_init() {
            error!("GNSS init failed: {}", e);
            return Err(e);
        }
        self.initialized = true;
        self.last_received = jiffies::get();
        let (baudrate, protocol) = (self.config.baudrate, self.config.protocol);
        info!("GNSS initialized at {} baud, protocol {:?}", baudrate, protocol);
        Ok(())
    }

    fn acknowledge(&mut self, ack: Acknowledgement) {
        if (ack.class, ack.id) != (CLASS_CFG, ID_CFG_VALSET) {
            return;
        }
        if self.configuration != Configuration::Pending {
            return;
        }
        self.configuration = if ack.accepted {
            info!("GNSS configuration acknowledged");
            Configuration::Acknowledged
        } else {
            warn!("GNSS configuration rejected");
            Configuration::Rejected
        };
    }

    /// Drains available bytes, returns number of solutions committed
    pub fn process(&mut self) -> usize {
        if !self.initialized {
            return 0;
        }
        let mut commits = 0;
        let mut received = false;
        while let Some(byte) = self.transport.try_receive_byte() {
            received = true;
            if let Some(solution) = self.receiver.receive_byte(byte) {
                self.store.update(solution);
                commits += 1;
            }
        }
        let now = jiffies::get();
        if received {
            self.last_received = now;
        } else if let Some(timeout) = self.config.idle_timeout() {
            if self.receiver.in_progress() && now.saturating_sub(self.last_received) > timeout {
                warn!("GNSS message timeout");
                self.receiver.timeout();
            }
        }
        if let Some(ack) = self.receiver.take_acknowledgement() {
            self.acknowledge(ack);
        }
        commits
    }

    /// Latest solution, clears its freshness
    pub fn get_nav_data(&self) -> NavigationSolution {
        self.store.get_and_clear()
    }

    pub fn has_fix(&self) -> bool {
        self.store.has_fix()
    }

    pub fn statistics(&self) -> &Statistics {
        self.receiver.statistics()
    }

    pub fn configuration(&self) -> Configuration {
        self.configuration
    }
}

mod test {
    #[cfg(test)]
    use std::{collections::VecDeque, vec::Vec};

    #[cfg(test)]
    use hal::serial::{ByteSource, Transport};

    #[cfg(test)]
    #[derive(Default)]
    struct MockTransport {
        rx: VecDeque<u8>,
        tx: Vec<u8>,
        opened: Option<u32>,
        unavailable: bool,
    }

    #[cfg(test)]
    impl ByteSource for MockTransport {
        fn try_receive_byte(&mut self) -> Option<u8> {
            self.rx.pop_front()
        }
    }

    #[cfg(test)]
    impl Transport for MockTransport {
        type Error = ();

        fn open(&mut self, baudrate: u32) -> Result<(), ()> {
            if self.unavailable {
                return Err(());
            }
            self.opened = Some(baudrate);
            Ok(())
        }

        fn transmit(&mut self, bytes: &[u8]) -> Result<(), ()> {
            self.tx.extend_from_slice(bytes);
            Ok(())
        }
    }

    #[cfg(test)]
    const GGA: &[u8] = b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
    #[cfg(test)]
    const VTG: &[u8] = b"$GPVTG,089.0,T,,,15.2,N,,,A*12\r\n";
    #[cfg(test)]
    const RMC: &[u8] = b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n";

    #[cfg(test)]
    fn pvt_frame() -> Vec<u8> {
        use crate::protocol::serial::gnss::ubx::message::encode;

        let mut pvt = [0u8; 92];
        pvt[..4].copy_from_slice(&2000u32.to_le_bytes());
        pvt[4..6].copy_from_slice(&2026u16.to_le_bytes());
        pvt[6] = 10;
        pvt[7] = 14;
        pvt[11] = 0x03;
        pvt[20] = 3;
        pvt[21] = 0x01;
        pvt[23] = 14;
        pvt[24..28].copy_from_slice(&115166666i32.to_le_bytes());
        pvt[28..32].copy_from_slice(&481173000i32.to_le_bytes());
        pvt[36..40].copy_from_slice(&545400i32.to_le_bytes());
        pvt[60..64].copy_from_slice(&5000i32.to_le_bytes());
        pvt[64..68].copy_from_slice(&(-90_00000i32).to_le_bytes());
        let mut frame: heapless::Vec<u8, 128> = heapless::Vec::new();
        encode(0x01, 0x07, &pvt, &mut frame).unwrap();
        frame.iter().cloned().collect()
    }

    #[cfg(test)]
    fn gnss<'a>(
        store: &'a crate::datastore::NavigationStore,
        config: crate::config::GNSSConfig,
    ) -> super::GNSS<'a, MockTransport> {
        let mut gnss = super::GNSS::new(config, MockTransport::default(), store);
        gnss.init().unwrap();
        gnss
    }

    #[test]
    fn test_init_failure() {
        use super::{InitError, GNSS};
        use crate::{config::GNSSConfig, datastore::NavigationStore};

        let store = NavigationStore::new();
        let transport = MockTransport { unavailable: true, ..Default::default() };
        let mut gnss = GNSS::new(GNSSConfig::default(), transport, &store);
        assert!(matches!(gnss.init(), Err(InitError::Open(()))));
        gnss.transport.rx.extend(GGA.iter());
        assert_eq!(gnss.process(), 0);
        assert_eq!(gnss.transport.rx.len(), GGA.len());

        let config = GNSSConfig { measurement_period: 0, ..Default::default() };
        let mut gnss = GNSS::new(config, MockTransport::default(), &store);
        assert!(matches!(gnss.init(), Err(InitError::Config(_))));
        assert_eq!(gnss.transport.opened, None);
    }

    #[test]
    fn test_init_configures_receiver() {
        use hex_literal::hex;

        use super::Configuration;
        use crate::{config::GNSSConfig, datastore::NavigationStore};

        let store = NavigationStore::new();
        let mut gnss = gnss(&store, GNSSConfig::default());
        assert_eq!(gnss.transport.opened, Some(115200));
        assert_eq!(&gnss.transport.tx[..4], &hex!("B5 62 06 8A"));
        // 12 one byte items and the two byte measurement rate
        assert_eq!(gnss.transport.tx.len(), 8 + 4 + 12 * 5 + 6);
        assert_eq!(gnss.configuration(), Configuration::Pending);

        gnss.transport.rx.extend(hex!("B5 62 05 01 02 00 06 8A 98 C1").iter());
        assert_eq!(gnss.process(), 0);
        assert_eq!(gnss.configuration(), Configuration::Acknowledged);

        let config = GNSSConfig { configure_receiver: false, ..Default::default() };
        let gnss = super::test::gnss(&store, config);
        assert!(gnss.transport.tx.is_empty());
        assert_eq!(gnss.configuration(), Configuration::Unsent);
    }

    #[test]
    fn test_position_and_velocity() {
        use crate::{
            config::GNSSConfig, datastore::NavigationStore,
            protocol::serial::gnss::out::FixStatus,
        };

        let store = NavigationStore::new();
        let mut gnss = gnss(&store, GNSSConfig::default());
        gnss.transport.rx.extend(GGA.iter().chain(VTG.iter()));
        assert_eq!(gnss.process(), 2);
        let solution = gnss.get_nav_data();
        assert_eq!(solution.fresh, true);
        assert!(solution.fix >= FixStatus::Fix2D);
        assert!((solution.latitude - 48.1173).abs() < 1e-9);
        assert!((solution.longitude - 11.516666666666667).abs() < 1e-9);
        assert!((solution.ground_speed - 7.8195488).abs() < 1e-4);
        assert_eq!(solution.heading, 89.0);
        assert!(gnss.has_fix());
        assert_eq!(gnss.get_nav_data().fresh, false);
    }

    #[test]
    fn test_chunking_independence() {
        use crate::{
            config::GNSSConfig, datastore::NavigationStore,
            protocol::serial::gnss::{out::FixStatus, GNSSReceiver},
        };

        let mut stream = Vec::from(&b"\x00\xFFnoise"[..]);
        stream.extend_from_slice(GGA);
        stream.extend_from_slice(&pvt_frame());
        stream.extend_from_slice(VTG);
        stream.extend_from_slice(&[0xB5, 0x62, 0x01]);
        stream.extend_from_slice(RMC);

        let mut sequences = Vec::new();
        for chunk_size in [1, 3, 7, 64, stream.len()] {
            let mut receiver = GNSSReceiver::new(&GNSSConfig::default());
            let mut solutions = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                solutions.extend(chunk.iter().filter_map(|&byte| receiver.receive_byte(byte)));
            }

            let store = NavigationStore::new();
            let mut gnss = gnss(&store, GNSSConfig::default());
            let mut commits = 0;
            for chunk in stream.chunks(chunk_size) {
                gnss.transport.rx.extend(chunk.iter());
                commits += gnss.process();
            }
            assert_eq!(commits, solutions.len());
            assert_eq!(Some(gnss.get_nav_data()), solutions.last().copied());
            assert_eq!(gnss.statistics(), receiver.statistics());
            sequences.push((solutions, *receiver.statistics()));
        }

        let solutions = &sequences[0].0;
        let fixes: Vec<FixStatus> = solutions.iter().map(|s| s.fix).collect();
        assert_eq!(fixes, [FixStatus::Fix3D; 3]);
        assert_eq!(solutions[0].second, 19);
        assert!((solutions[1].heading - 270.0).abs() < 1e-3);
        assert_eq!(solutions[2].heading, 89.0);
        for sequence in sequences.iter().skip(1) {
            assert_eq!(sequence, &sequences[0]);
        }
    }

    #[test]
    fn test_partial_frame_waits() {
        use crate::{
            config::GNSSConfig, datastore::NavigationStore,
            protocol::serial::gnss::out::FixStatus,
        };

        let store = NavigationStore::new();
        let mut gnss = gnss(&store, GNSSConfig::default());
        let frame = pvt_frame();
        gnss.transport.rx.extend(frame[..50].iter());
        assert_eq!(gnss.process(), 0);
        assert_eq!(store.updates(), 0);
        gnss.transport.rx.extend(frame[50..].iter());
        assert_eq!(gnss.process(), 1);
        let solution = gnss.get_nav_data();
        assert_eq!(solution.fix, FixStatus::Fix3D);
        assert_eq!((solution.year, solution.month, solution.day), (2026, 10, 14));
        assert!((solution.heading - 270.0).abs() < 1e-3);
        assert!((solution.ground_speed - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_flipped_bit_rejected() {
        use crate::{config::GNSSConfig, datastore::NavigationStore};

        let store = NavigationStore::new();
        let mut gnss = gnss(&store, GNSSConfig::default());
        let mut sentence = Vec::from(GGA);
        sentence[20] ^= 0x01;
        gnss.transport.rx.extend(sentence.iter());
        assert_eq!(gnss.process(), 0);
        assert_eq!(store.updates(), 0);
        assert_eq!(gnss.statistics().checksum, 1);

        let mut frame = pvt_frame();
        frame[40] ^= 0x80;
        gnss.transport.rx.extend(frame.iter());
        assert_eq!(gnss.process(), 0);
        assert_eq!(gnss.statistics().checksum, 2);
        assert_eq!(gnss.get_nav_data().fresh, false);
    }

    #[test]
    fn test_dead_reckoning_has_no_fix() {
        use crate::{
            config::GNSSConfig, datastore::NavigationStore,
            protocol::serial::gnss::out::FixStatus,
        };

        let store = NavigationStore::new();
        let mut gnss = gnss(&store, GNSSConfig::default());
        let sentence = b"$GPGGA,123519,4807.038,N,01131.000,E,6,08,0.9,545.4,M,46.9,M,,*40\r\n";
        gnss.transport.rx.extend(sentence.iter());
        assert_eq!(gnss.process(), 1);
        assert_eq!(gnss.has_fix(), false);
        assert_eq!(gnss.get_nav_data().fix, FixStatus::DeadReckoning);
    }

    #[test]
    #[serial_test::serial]
    fn test_idle_timeout() {
        use core::time::Duration;

        use crate::{config::GNSSConfig, datastore::NavigationStore, sys::jiffies};

        jiffies::set(Duration::from_secs(10));
        let store = NavigationStore::new();
        let config = GNSSConfig { idle_timeout: 100, ..Default::default() };
        let mut gnss = gnss(&store, config);
        gnss.transport.rx.extend(GGA[..30].iter());
        assert_eq!(gnss.process(), 0);
        jiffies::advance(Duration::from_millis(50));
        assert_eq!(gnss.process(), 0);
        assert_eq!(gnss.statistics().timeouts, 0);
        jiffies::advance(Duration::from_millis(100));
        assert_eq!(gnss.process(), 0);
        assert_eq!(gnss.statistics().timeouts, 1);

        gnss.transport.rx.extend(GGA[30..].iter());
        assert_eq!(gnss.process(), 0);
        assert_eq!(store.updates(), 0);
        gnss.transport.rx.extend(GGA.iter());
        assert_eq!(gnss.process(), 1);
    }
}
