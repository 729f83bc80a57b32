//! Read-only view of the LoRaWAN / radio stack
//!
//! The stack itself lives outside this crate; `STATUS` only needs its getters.

use crate::{VERSION, config};

/// Network operating mode as reported by the radio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// LoRa point-to-point
    P2p,
    /// Managed LoRaWAN network
    LoRaWan,
    /// Raw FSK radio
    Fsk,
}

impl NetworkMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::P2p),
            1 => Some(Self::LoRaWan),
            2 => Some(Self::Fsk),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::P2p => "P2P",
            Self::LoRaWan => "LoRaWAN",
            Self::Fsk => "FSK",
        }
    }
}

/// Region names, indexed by the stack's region code
pub const REGIONS: [&str; 13] = [
    "EU433", "CN470", "RU864", "IN865", "EU868", "US915", "AU915", "KR920", "AS923", "AS923-2",
    "AS923-3", "AS923-4", "LA915",
];

pub const UNKNOWN_REGION: &str = "Unknown";

/// Region name for a code, `Unknown` outside the table
pub fn region_name(code: u8) -> &'static str {
    REGIONS.get(usize::from(code)).copied().unwrap_or(UNKNOWN_REGION)
}

/// Getters the status dump needs from the radio stack
pub trait RadioInfo {
    fn hardware_model(&self) -> &str;
    fn firmware_version(&self) -> &str;

    /// Raw mode code, see [`NetworkMode::from_code`]
    fn network_mode(&self) -> u8;
    fn network_joined(&self) -> bool;
    /// Raw region code, see [`REGIONS`]
    fn region(&self) -> u8;
    /// `true` for OTAA, `false` for ABP
    fn otaa_join(&self) -> bool;

    fn dev_eui(&self) -> [u8; 8];
    fn app_eui(&self) -> [u8; 8];
    fn app_key(&self) -> [u8; 16];
    fn apps_key(&self) -> [u8; 16];
    fn nwks_key(&self) -> [u8; 16];
    fn dev_addr(&self) -> [u8; 4];

    fn p2p_frequency(&self) -> u32;
    fn p2p_spreading_factor(&self) -> u8;
    fn p2p_bandwidth(&self) -> u32;
    fn p2p_coding_rate(&self) -> u8;
    fn p2p_preamble_length(&self) -> u16;
    fn p2p_tx_power(&self) -> u8;

    fn fsk_bitrate(&self) -> u32;
    fn fsk_deviation(&self) -> u32;
}

/// Radio parameters held in RAM, seeded from the build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadioSettings {
    pub hardware_model: &'static str,
    pub firmware_version: &'static str,
    pub network_mode: u8,
    pub joined: bool,
    pub region: u8,
    pub otaa: bool,
    pub dev_eui: [u8; 8],
    pub app_eui: [u8; 8],
    pub app_key: [u8; 16],
    pub apps_key: [u8; 16],
    pub nwks_key: [u8; 16],
    pub dev_addr: [u8; 4],
    pub p2p_frequency: u32,
    pub p2p_spreading_factor: u8,
    pub p2p_bandwidth: u32,
    pub p2p_coding_rate: u8,
    pub p2p_preamble_length: u16,
    pub p2p_tx_power: u8,
    pub fsk_bitrate: u32,
    pub fsk_deviation: u32,
}

impl RadioSettings {
    /// Settings from `config::lorawan`, not joined yet
    pub const fn from_build_config() -> Self {
        use config::lorawan;

        Self {
            hardware_model: config::HW_MODEL,
            firmware_version: VERSION,
            network_mode: lorawan::NETWORK_MODE,
            joined: false,
            region: lorawan::REGION,
            otaa: lorawan::JOIN_OTAA,
            dev_eui: lorawan::DEV_EUI,
            app_eui: lorawan::APP_EUI,
            app_key: lorawan::APP_KEY,
            apps_key: lorawan::APPS_KEY,
            nwks_key: lorawan::NWKS_KEY,
            dev_addr: lorawan::DEV_ADDR,
            p2p_frequency: lorawan::P2P_FREQUENCY_HZ,
            p2p_spreading_factor: lorawan::P2P_SPREADING_FACTOR,
            p2p_bandwidth: lorawan::P2P_BANDWIDTH_KHZ,
            p2p_coding_rate: lorawan::P2P_CODING_RATE,
            p2p_preamble_length: lorawan::P2P_PREAMBLE_LENGTH,
            p2p_tx_power: lorawan::P2P_TX_POWER,
            fsk_bitrate: lorawan::FSK_BITRATE,
            fsk_deviation: lorawan::FSK_DEVIATION_HZ,
        }
    }
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self::from_build_config()
    }
}

impl RadioInfo for RadioSettings {
    fn hardware_model(&self) -> &str {
        self.hardware_model
    }

    fn firmware_version(&self) -> &str {
        self.firmware_version
    }

    fn network_mode(&self) -> u8 {
        self.network_mode
    }

    fn network_joined(&self) -> bool {
        self.joined
    }

    fn region(&self) -> u8 {
        self.region
    }

    fn otaa_join(&self) -> bool {
        self.otaa
    }

    fn dev_eui(&self) -> [u8; 8] {
        self.dev_eui
    }

    fn app_eui(&self) -> [u8; 8] {
        self.app_eui
    }

    fn app_key(&self) -> [u8; 16] {
        self.app_key
    }

    fn apps_key(&self) -> [u8; 16] {
        self.apps_key
    }

    fn nwks_key(&self) -> [u8; 16] {
        self.nwks_key
    }

    fn dev_addr(&self) -> [u8; 4] {
        self.dev_addr
    }

    fn p2p_frequency(&self) -> u32 {
        self.p2p_frequency
    }

    fn p2p_spreading_factor(&self) -> u8 {
        self.p2p_spreading_factor
    }

    fn p2p_bandwidth(&self) -> u32 {
        self.p2p_bandwidth
    }

    fn p2p_coding_rate(&self) -> u8 {
        self.p2p_coding_rate
    }

    fn p2p_preamble_length(&self) -> u16 {
        self.p2p_preamble_length
    }

    fn p2p_tx_power(&self) -> u8 {
        self.p2p_tx_power
    }

    fn fsk_bitrate(&self) -> u32 {
        self.fsk_bitrate
    }

    fn fsk_deviation(&self) -> u32 {
        self.fsk_deviation
    }
}
