//! [Radio] implementation for Linux hosts running NetworkManager

use crate::{
    config::Credentials,
    network::{Radio, WifiInfo, WifiStatus},
};
use anyhow::{anyhow, bail, Context};
use log::{debug, info, warn};
use std::{
    io::Write,
    net::Ipv4Addr,
    process::{Child, Command, Stdio},
    time::{Duration, Instant},
};

/// Drives one wireless interface through `nmcli`, reading link details from
/// `iw`
pub struct NmcliRadio {
    interface: String,
    /// Connect/disconnect commands that may still be running. We never wait
    /// on them, but they have to be reaped eventually.
    pending: Vec<Child>,
    /// Last status we read, and when. The settings screen asks for status
    /// every loop iteration, which is far too often to fork nmcli.
    status: Option<(WifiStatus, Instant)>,
}

impl NmcliRadio {
    const STATUS_TTL: Duration = Duration::from_millis(500);

    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            pending: Vec::new(),
            status: None,
        }
    }

    /// Run a command to completion and return its stdout
    fn run(&self, program: &str, args: &[&str]) -> anyhow::Result<String> {
        debug!("Running {program} {args:?}");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Error running {program}"))?;
        if !output.status.success() {
            bail!(
                "{program} exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Start an nmcli command without waiting for it. `input` is written to
    /// its stdin, which keeps secrets out of the process list.
    fn spawn(
        &mut self,
        args: &[&str],
        input: Option<&str>,
    ) -> anyhow::Result<()> {
        self.reap();
        // Whatever we're about to do will change the status
        self.status = None;
        let mut child = Command::new("nmcli")
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Error starting nmcli")?;
        // Take the pipe out so it's closed once written, otherwise nmcli
        // would wait for more input
        let stdin = child.stdin.take();
        self.pending.push(child);
        if let (Some(input), Some(mut stdin)) = (input, stdin) {
            writeln!(stdin, "{input}").context("Error writing to nmcli")?;
        }
        Ok(())
    }

    /// Collect any finished background commands
    fn reap(&mut self) {
        self.pending.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                if status.success() {
                    info!("nmcli (pid {}) finished", child.id());
                } else {
                    warn!("nmcli (pid {}) failed with {status}", child.id());
                }
                false
            }
            Ok(None) => true,
            Err(err) => {
                warn!("Error checking on nmcli (pid {}): {err}", child.id());
                false
            }
        });
    }
}

impl Radio for NmcliRadio {
    fn status(&mut self) -> anyhow::Result<WifiStatus> {
        self.reap();
        if let Some((status, read_at)) = self.status {
            if read_at.elapsed() < Self::STATUS_TTL {
                return Ok(status);
            }
        }
        let interface = self.interface.as_str();
        let status = self
            .run("nmcli", &["-g", "GENERAL.STATE", "device", "show", interface])
            .and_then(|output| parse_device_state(&output))
            .unwrap_or_else(|err| {
                // Cached like any other answer, so a broken interface doesn't
                // fork nmcli on every loop iteration
                warn!("Error reading status of {interface}: {err:#}");
                WifiStatus::UNKNOWN
            });
        self.status = Some((status, Instant::now()));
        Ok(status)
    }

    fn info(&mut self) -> anyhow::Result<WifiInfo> {
        let addresses = self.run(
            "nmcli",
            &["-g", "IP4.ADDRESS", "device", "show", self.interface.as_str()],
        )?;
        let (ip, prefix_len) = parse_address(&addresses)?;
        let link = self.run("iw", &["dev", self.interface.as_str(), "link"])?;
        let link = parse_link(&link)?;
        Ok(WifiInfo {
            ssid: link.ssid,
            ip,
            prefix_len,
            rssi: link.signal,
            channel: channel(link.frequency),
        })
    }

    fn connect(&mut self, credentials: &Credentials) -> anyhow::Result<()> {
        let interface = self.interface.clone();
        self.spawn(
            &connect_args(&credentials.ssid, &interface),
            Some(credentials.password.as_str()),
        )
    }

    fn disconnect(&mut self) -> anyhow::Result<()> {
        let interface = self.interface.clone();
        self.spawn(&["device", "disconnect", interface.as_str()], None)
    }
}

/// nmcli arguments for joining `ssid`. `--ask` makes nmcli read the password
/// from stdin, so it never shows up in argv.
fn connect_args<'a>(ssid: &'a str, interface: &'a str) -> [&'a str; 7] {
    ["--ask", "device", "wifi", "connect", ssid, "ifname", interface]
}

/// Map NetworkManager's `GENERAL.STATE` output, e.g. `100 (connected)`.
/// https://networkmanager.dev/docs/api/latest/nm-dbus-types.html#NMDeviceState
fn parse_device_state(output: &str) -> anyhow::Result<WifiStatus> {
    let output = output.trim();
    let code: i32 = output
        .split_whitespace()
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| anyhow!("Unrecognized device state {output:?}"))?;
    let status = match code {
        100 => WifiStatus::Connected,
        30 => WifiStatus::Disconnected,
        110 | 120 => WifiStatus::ConnectionLost,
        20 => WifiStatus::NoSsidAvailable,
        40..=90 => WifiStatus::Idle,
        _ => WifiStatus::Other(code),
    };
    Ok(status)
}

/// Parse the first address from `IP4.ADDRESS`, e.g. `192.168.1.5/24`.
/// Multiple addresses are separated by ` | `.
fn parse_address(output: &str) -> anyhow::Result<(Ipv4Addr, u8)> {
    let first = output.split('|').next().unwrap_or_default().trim();
    let (ip, prefix) = first
        .split_once('/')
        .ok_or_else(|| anyhow!("No IPv4 address in {output:?}"))?;
    let ip = ip.parse().with_context(|| format!("Invalid IP {ip:?}"))?;
    let prefix = prefix
        .parse()
        .with_context(|| format!("Invalid prefix length {prefix:?}"))?;
    Ok((ip, prefix))
}

#[derive(Debug, PartialEq)]
struct Link {
    ssid: String,
    /// dBm
    signal: i32,
    /// MHz
    frequency: u32,
}

/// Parse `iw dev <iface> link` output
fn parse_link(output: &str) -> anyhow::Result<Link> {
    let mut ssid = None;
    let mut signal = None;
    let mut frequency = None;
    for line in output.lines().map(str::trim) {
        if let Some(value) = line.strip_prefix("SSID: ") {
            ssid = Some(value.to_owned());
        } else if let Some(value) = line.strip_prefix("signal: ") {
            signal = value
                .split_whitespace()
                .next()
                .and_then(|dbm| dbm.parse().ok());
        } else if let Some(value) = line.strip_prefix("freq: ") {
            // Newer iw versions print a decimal, e.g. 2437.0
            frequency = value.parse::<f64>().ok().map(|mhz| mhz.round() as u32);
        }
    }
    match (ssid, signal, frequency) {
        (Some(ssid), Some(signal), Some(frequency)) => Ok(Link {
            ssid,
            signal,
            frequency,
        }),
        _ => bail!("Incomplete link info: {output:?}"),
    }
}

/// WiFi channel number for a center frequency in MHz, or 0 if unknown
fn channel(frequency: u32) -> u32 {
    match frequency {
        2484 => 14,
        2412..=2472 => (frequency - 2407) / 5,
        5000..=5900 => (frequency - 5000) / 5,
        5955..=7115 => (frequency - 5950) / 5,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_state() {
        let parse = |s| parse_device_state(s).unwrap();
        assert_eq!(parse("100 (connected)\n"), WifiStatus::Connected);
        assert_eq!(parse("30 (disconnected)"), WifiStatus::Disconnected);
        assert_eq!(parse("120 (failed)"), WifiStatus::ConnectionLost);
        assert_eq!(parse("20 (unavailable)"), WifiStatus::NoSsidAvailable);
        assert_eq!(
            parse("70 (connecting (getting IP configuration))"),
            WifiStatus::Idle
        );
        assert_eq!(parse("10 (unmanaged)"), WifiStatus::Other(10));
        assert!(parse_device_state("").is_err());
    }

    #[test]
    fn test_address() {
        assert_eq!(
            parse_address("192.168.1.5/24\n").unwrap(),
            (Ipv4Addr::new(192, 168, 1, 5), 24)
        );
        assert_eq!(
            parse_address("10.0.0.2/8 | 192.168.1.5/24").unwrap(),
            (Ipv4Addr::new(10, 0, 0, 2), 8)
        );
        assert!(parse_address("\n").is_err());
    }

    #[test]
    fn test_link() {
        let output = "Connected to aa:bb:cc:dd:ee:ff (on wlan0)
	SSID: otthon
	freq: 2437.0
	RX: 1234 bytes (10 packets)
	signal: -61 dBm
	tx bitrate: 72.2 MBit/s
";
        assert_eq!(
            parse_link(output).unwrap(),
            Link {
                ssid: "otthon".into(),
                signal: -61,
                frequency: 2437,
            }
        );
        assert!(parse_link("Not connected.").is_err());
    }

    #[test]
    fn test_connect_args() {
        let credentials = Credentials {
            ssid: "otthon".into(),
            password: "titok123".into(),
        };
        let args = connect_args(&credentials.ssid, "wlan0");
        assert_eq!(
            args,
            ["--ask", "device", "wifi", "connect", "otthon", "ifname", "wlan0"]
        );
        assert!(!args.contains(&credentials.password.as_str()));
    }

    #[test]
    fn test_status_query_failure_cached() {
        // Whether or not nmcli is installed, this interface doesn't exist
        let mut radio = NmcliRadio::new("wbx-missing0");
        assert_eq!(radio.status().unwrap(), WifiStatus::UNKNOWN);
        assert!(matches!(radio.status, Some((WifiStatus::UNKNOWN, _))));
        assert_eq!(radio.status().unwrap(), WifiStatus::UNKNOWN);
    }

    #[test]
    fn test_channel() {
        assert_eq!(channel(2412), 1);
        assert_eq!(channel(2437), 6);
        assert_eq!(channel(2484), 14);
        assert_eq!(channel(5180), 36);
        assert_eq!(channel(900), 0);
    }
}
