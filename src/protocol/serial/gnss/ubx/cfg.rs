use heapless::Vec;

use super::message::{encode, CLASS_CFG, ID_CFG_VALSET, MAX_PAYLOAD_SIZE};

pub const LAYER_RAM: u8 = 1 << 0;
pub const LAYER_BBR: u8 = 1 << 1;

pub const CFG_UART1OUTPROT_UBX: u32 = 0x1074_0001;
pub const CFG_UART1OUTPROT_NMEA: u32 = 0x1074_0002;
pub const CFG_RATE_MEAS: u32 = 0x3021_0001;

pub const CFG_MSGOUT_UBX_NAV_PVT_UART1: u32 = 0x2091_0007;
pub const CFG_MSGOUT_UBX_NAV_DOP_UART1: u32 = 0x2091_0039;
pub const CFG_MSGOUT_UBX_NAV_EOE_UART1: u32 = 0x2091_0160;

pub const CFG_MSGOUT_NMEA_ID_GGA_UART1: u32 = 0x2091_00bb;
pub const CFG_MSGOUT_NMEA_ID_GLL_UART1: u32 = 0x2091_00ca;
pub const CFG_MSGOUT_NMEA_ID_GSA_UART1: u32 = 0x2091_00c0;
pub const CFG_MSGOUT_NMEA_ID_GSV_UART1: u32 = 0x2091_00c5;
pub const CFG_MSGOUT_NMEA_ID_RMC_UART1: u32 = 0x2091_00ac;
pub const CFG_MSGOUT_NMEA_ID_VTG_UART1: u32 = 0x2091_00b1;
pub const CFG_MSGOUT_NMEA_ID_ZDA_UART1: u32 = 0x2091_00d9;

const MAX_ITEMS: usize = 16;
pub const MAX_VALSET_SIZE: usize = 8 + 4 + MAX_ITEMS * 12;

/// A configuration key and its value, value size is encoded in the key
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CfgItem {
    pub key: u32,
    pub value: u64,
}

impl CfgItem {
    pub fn new<V: Into<u64>>(key: u32, value: V) -> Self {
        Self { key, value: value.into() }
    }

    /// Value size in bytes, `None` for reserved size codes
    pub fn value_size(&self) -> Option<usize> {
        match (self.key >> 28) & 0x7 {
            1 | 2 => Some(1),
            3 => Some(2),
            4 => Some(4),
            5 => Some(8),
            _ => None,
        }
    }
}

/// UBX-CFG-VALSET
pub struct ValSet {
    layers: u8,
    items: Vec<CfgItem, MAX_ITEMS>,
}

impl ValSet {
    pub fn new(layers: u8) -> Self {
        Self { layers, items: Vec::new() }
    }

    pub fn set<V: Into<u64>>(&mut self, key: u32, value: V) -> Result<&mut Self, CfgItem> {
        self.items.push(CfgItem::new(key, value))?;
        Ok(self)
    }

    pub fn items(&self) -> &[CfgItem] {
        &self.items
    }

    pub fn encode(&self) -> Result<Vec<u8, MAX_VALSET_SIZE>, ()> {
        let mut payload: Vec<u8, { 4 + MAX_ITEMS * 12 }> = Vec::new();
        payload.extend_from_slice(&[0, self.layers, 0, 0])?;
        for item in self.items.iter() {
            let size = item.value_size().ok_or(())?;
            payload.extend_from_slice(&item.key.to_le_bytes())?;
            payload.extend_from_slice(&item.value.to_le_bytes()[..size])?;
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(());
        }
        let mut frame = Vec::new();
        encode(CLASS_CFG, ID_CFG_VALSET, &payload, &mut frame)?;
        Ok(frame)
    }
}

mod test {
    #[test]
    fn test_value_size() {
        use super::{CfgItem, CFG_MSGOUT_UBX_NAV_PVT_UART1, CFG_RATE_MEAS, CFG_UART1OUTPROT_UBX};

        assert_eq!(CfgItem::new(CFG_UART1OUTPROT_UBX, true).value_size(), Some(1));
        assert_eq!(CfgItem::new(CFG_MSGOUT_UBX_NAV_PVT_UART1, 1u8).value_size(), Some(1));
        assert_eq!(CfgItem::new(CFG_RATE_MEAS, 200u16).value_size(), Some(2));
        assert_eq!(CfgItem::new(0x0000_0001, 0u8).value_size(), None);
    }

    #[test]
    fn test_encode_valset() {
        use hex_literal::hex;

        use super::{ValSet, CFG_RATE_MEAS, CFG_UART1OUTPROT_UBX, LAYER_BBR, LAYER_RAM};

        let mut valset = ValSet::new(LAYER_RAM | LAYER_BBR);
        valset.set(CFG_UART1OUTPROT_UBX, true).unwrap().set(CFG_RATE_MEAS, 200u16).unwrap();
        let frame = valset.encode().unwrap();
        let expected = hex!(
            "B5 62 06 8A 0F 00
             00 03 00 00
             01 00 74 10 01
             01 00 21 30 C8 00
             42 9F"
        );
        assert_eq!(&frame[..], &expected[..]);
    }
}
