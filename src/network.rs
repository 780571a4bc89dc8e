//! WiFi status and control screens, plus the [Radio] interface they talk to

use crate::{
    config::Credentials,
    display::{FontSize, Frame, SCREEN_HEIGHT, SCREEN_WIDTH},
};
use log::{info, warn};
use std::{fmt::Display, net::Ipv4Addr};

/// Connection state reported by the radio
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WifiStatus {
    Connected,
    Disconnected,
    ConnectionLost,
    NoSsidAvailable,
    Idle,
    /// Anything else, with the radio's raw status code
    Other(i32),
}

impl WifiStatus {
    /// Stand-in when the radio couldn't be asked at all
    pub const UNKNOWN: Self = Self::Other(-1);

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// Status labels as shown on the network screen
impl Display for WifiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "Csatlakozva!"),
            Self::Disconnected => write!(f, "Lecsatlakozva!"),
            Self::ConnectionLost | Self::NoSsidAvailable => {
                write!(f, "Nem található!")
            }
            Self::Idle => write!(f, "Tétlen!"),
            Self::Other(code) => write!(f, "Hiba! ({code})"),
        }
    }
}

/// Details of the active connection
#[derive(Clone, Debug, PartialEq)]
pub struct WifiInfo {
    pub ssid: String,
    pub ip: Ipv4Addr,
    pub prefix_len: u8,
    /// Received signal strength, in dBm
    pub rssi: i32,
    pub channel: u32,
}

/// The WiFi hardware. Connect and disconnect only *start* the operation;
/// the outcome shows up in later [Radio::status] calls.
pub trait Radio {
    fn status(&mut self) -> anyhow::Result<WifiStatus>;

    /// Details of the current connection. Only meaningful while connected.
    fn info(&mut self) -> anyhow::Result<WifiInfo>;

    fn connect(&mut self, credentials: &Credentials) -> anyhow::Result<()>;

    fn disconnect(&mut self) -> anyhow::Result<()>;
}

/// Y position of the line above the footer caption
const FOOTER_LINE_Y: i32 = SCREEN_HEIGHT - 11;

/// Separator line and caption at the bottom of both network screens
fn footer(frame: &mut Frame, caption: &str) {
    frame
        .hline((0, FOOTER_LINE_Y), SCREEN_WIDTH as u32 - 1)
        .text(caption, (32, 63), FontSize::Small);
}

/// Build the read-only network status screen. Details are shown only when
/// `info` is present.
pub fn network_info_frame(
    status: WifiStatus,
    info: Option<&WifiInfo>,
) -> Frame {
    let mut frame = Frame::new();
    frame.text(format!("Hálózat: {status}"), (0, 10), FontSize::Small);
    if let Some(info) = info {
        frame
            .text(format!("SSID: {}", info.ssid), (0, 20), FontSize::Small)
            .text(
                format!("IP: {}/{}", info.ip, info.prefix_len),
                (0, 30),
                FontSize::Small,
            )
            .text(
                format!("Jelszint: {} dBm", info.rssi),
                (0, 40),
                FontSize::Small,
            )
            .text(
                format!("Csatorna: {}", info.channel),
                (0, 50),
                FontSize::Small,
            );
    }
    footer(&mut frame, "WiFi információk");
    frame
}

/// Ask the radio for its status. A failed query is logged and reported as
/// [WifiStatus::UNKNOWN], so the screens keep working (and the reconnect
/// control stays reachable) while the radio misbehaves.
pub fn read_status(radio: &mut impl Radio) -> WifiStatus {
    radio.status().unwrap_or_else(|err| {
        warn!("Error reading WiFi status: {err:#}");
        WifiStatus::UNKNOWN
    })
}

/// Query the radio and build the network status screen
pub fn show_network_info(radio: &mut impl Radio) -> Frame {
    let status = read_status(radio);
    let info = if status.is_connected() {
        match radio.info() {
            Ok(info) => Some(info),
            Err(err) => {
                warn!("Error reading connection details: {err:#}");
                None
            }
        }
    } else {
        None
    };
    network_info_frame(status, info.as_ref())
}

/// Build the WiFi control screen, hinting at what the OK button will do
pub fn network_settings_frame(status: WifiStatus) -> Frame {
    let hint = if status.is_connected() {
        "Lecsatlakozás: [OK] 1 mp."
    } else {
        "Újracsatlakozás: [OK] 1 mp."
    };
    let mut frame = Frame::new();
    frame.text(hint, (0, 10), FontSize::Small);
    footer(&mut frame, "WiFi beállítások");
    frame
}

/// Disconnect if `status` says we're connected, otherwise start a reconnect.
/// Doesn't wait for the radio to finish either one.
pub fn toggle_connection(
    radio: &mut impl Radio,
    status: WifiStatus,
    credentials: &Credentials,
) -> anyhow::Result<()> {
    if status.is_connected() {
        info!("Disconnecting from WiFi");
        radio.disconnect()
    } else {
        info!("Reconnecting to WiFi network {:?}", credentials.ssid);
        radio.connect(credentials)
    }
}
