//! Live status collection.
//!
//! A [`StatusSnapshot`] is gathered fresh for every report. Each section is
//! independent and falls back to placeholder text when its commands fail.

use crate::probe::field::{first_of, grep_tail, mentions_any, verbatim, FieldProbe};
use crate::probe::hardware::{HardwareProfile, AI_USB_KEYWORDS};
use crate::probe::host::Host;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sysinfo::System;

/// Placeholder for any scalar that could not be determined.
pub const NOT_AVAILABLE: &str = "N/A";

/// Supply rails reported by `vcgencmd measure_volts`.
pub const VOLTAGE_RAILS: &[&str] = &["core", "sdram_c", "sdram_i", "sdram_p"];

const UPTIME_PROBES: &[FieldProbe] = &[FieldProbe::command("uptime", &["-p"], verbatim)];
const LOAD_PROBES: &[FieldProbe] = &[FieldProbe::command("uptime", &[], parse_load_average)];
const MEMORY_PROBES: &[FieldProbe] = &[FieldProbe::command("free", &[], parse_memory_usage)];
const TEMPERATURE_PROBES: &[FieldProbe] = &[
    FieldProbe::command("vcgencmd", &["measure_temp"], value_after_equals),
    FieldProbe::file("/sys/class/thermal/thermal_zone0/temp", parse_millidegrees),
];
const ROOT_USAGE_PROBES: &[FieldProbe] =
    &[FieldProbe::command("df", &["-h", "/"], parse_root_usage)];

/// Everything that changes between two reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub system: SystemStatus,
    pub power: PowerStatus,
    pub network: NetworkStatus,
    pub storage: StorageStatus,
    /// Present only when the hardware profile flags an accelerator
    pub accelerator: Option<AcceleratorStatus>,
    pub logs: LogExcerpts,
}

impl StatusSnapshot {
    /// Collect every section concurrently.
    pub async fn collect(host: &dyn Host, profile: &HardwareProfile) -> Self {
        let (system, power, network, storage, accelerator, logs) = tokio::join!(
            SystemStatus::collect(host),
            PowerStatus::collect(host),
            NetworkStatus::collect(host, profile),
            StorageStatus::collect(host),
            async {
                if profile.has_ai_hat {
                    Some(AcceleratorStatus::collect(host).await)
                } else {
                    None
                }
            },
            LogExcerpts::collect(host),
        );

        Self {
            system,
            power,
            network,
            storage,
            accelerator,
            logs,
        }
    }
}

/// General health figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub hostname: String,
    pub kernel: String,
    /// Human readable uptime (`uptime -p`)
    pub uptime: String,
    /// 1, 5 and 15 minute load averages as printed by `uptime`
    pub load: String,
    /// e.g. "23.4% of 7.9GB"
    pub memory_usage: String,
    /// e.g. "48.3'C"
    pub temperature: String,
}

impl SystemStatus {
    pub async fn collect(host: &dyn Host) -> Self {
        let (uptime, load, memory_usage, temperature) = tokio::join!(
            first_of(host, UPTIME_PROBES, NOT_AVAILABLE),
            first_of(host, LOAD_PROBES, NOT_AVAILABLE),
            first_of(host, MEMORY_PROBES, NOT_AVAILABLE),
            first_of(host, TEMPERATURE_PROBES, NOT_AVAILABLE),
        );

        Self {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            kernel: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
            uptime,
            load,
            memory_usage,
            temperature,
        }
    }
}

/// Supply and throttling state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerStatus {
    /// Raw `vcgencmd get_throttled` output, e.g. "throttled=0x50000"
    pub throttled: String,
    pub has_issues: bool,
    /// Voltage per rail, "N/A" when unreadable
    pub voltages: BTreeMap<String, String>,
    /// Last power related kernel messages
    pub recent_events: Vec<String>,
}

impl PowerStatus {
    pub async fn collect(host: &dyn Host) -> Self {
        let throttled = host.run("vcgencmd", &["get_throttled"]).await;
        let throttled = throttled.text();
        let has_issues = !throttled.is_empty() && throttled != "throttled=0x0";

        let readings = join_all(VOLTAGE_RAILS.iter().map(|rail| async move {
            let output = host.run("vcgencmd", &["measure_volts", *rail]).await;
            let volts = value_after_equals(output.text()).unwrap_or_else(|| NOT_AVAILABLE.to_string());
            (rail.to_string(), volts)
        }))
        .await;

        let dmesg = host.run("dmesg", &[]).await;
        let recent_events = grep_tail(
            &dmesg.stdout,
            &["under-voltage", "voltage", "power", "pmic"],
            5,
        );

        Self {
            throttled: if throttled.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                throttled.to_string()
            },
            has_issues,
            voltages: readings.into_iter().collect(),
            recent_events,
        }
    }

    /// Decoded throttling flags, empty when nothing is or was wrong.
    pub fn throttle_flags(&self) -> Vec<&'static str> {
        let Some(mask) = parse_throttled_mask(&self.throttled) else {
            return Vec::new();
        };
        THROTTLE_BITS
            .iter()
            .filter(|(bit, _)| mask & (1u32 << *bit) != 0)
            .map(|(_, label)| *label)
            .collect()
    }
}

/// Firmware throttling bits and their meaning.
const THROTTLE_BITS: &[(u32, &str)] = &[
    (0, "Under-voltage detected"),
    (1, "ARM frequency capped"),
    (2, "Currently throttled"),
    (3, "Soft temperature limit active"),
    (16, "Under-voltage has occurred"),
    (17, "ARM frequency capping has occurred"),
    (18, "Throttling has occurred"),
    (19, "Soft temperature limit has occurred"),
];

/// `throttled=0x50005` → `0x50005`.
pub fn parse_throttled_mask(raw: &str) -> Option<u32> {
    let hex = raw.trim().strip_prefix("throttled=0x")?;
    u32::from_str_radix(hex, 16).ok()
}

/// Wired link state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthernetStatus {
    pub status: String,
    pub ip: Option<String>,
}

/// Wireless link state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatus {
    pub status: String,
    pub ssid: Option<String>,
    pub signal: Option<String>,
}

/// Link states, reachability checks and raw interface listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub ethernet: Option<EthernetStatus>,
    pub wifi: Option<WifiStatus>,
    pub gateway_reachable: bool,
    pub internet_reachable: bool,
    pub dns_working: bool,
    pub interfaces: String,
    pub routes: String,
    pub stats: String,
}

impl NetworkStatus {
    pub async fn collect(host: &dyn Host, profile: &HardwareProfile) -> Self {
        let (ethernet, wifi, gateway_reachable, internet_reachable, dns_working) = tokio::join!(
            async {
                if profile.has_ethernet {
                    Some(collect_ethernet(host).await)
                } else {
                    None
                }
            },
            async {
                if profile.has_wifi {
                    Some(collect_wifi(host).await)
                } else {
                    None
                }
            },
            async {
                let routes = host.run("ip", &["route"]).await;
                match default_gateway(&routes.stdout) {
                    Some(gateway) => ping(host, &gateway).await,
                    None => false,
                }
            },
            ping(host, "8.8.8.8"),
            async { host.run("nslookup", &["google.com"]).await.success() },
        );

        let (interfaces, routes, net_dev) = tokio::join!(
            host.run("ip", &["addr", "show"]),
            host.run("ip", &["route", "show"]),
            host.read_file("/proc/net/dev"),
        );
        let stats = net_dev
            .map(|dev| {
                dev.lines()
                    .filter(|line| line.contains("eth0") || line.contains("wlan0"))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        Self {
            ethernet,
            wifi,
            gateway_reachable,
            internet_reachable,
            dns_working,
            interfaces: or_not_available(interfaces.text()),
            routes: or_not_available(routes.text()),
            stats: or_not_available(&stats),
        }
    }
}

async fn collect_ethernet(host: &dyn Host) -> EthernetStatus {
    let link = host.run("ip", &["link", "show", "eth0"]).await;
    if !link.stdout.contains("state UP") {
        return EthernetStatus {
            status: "Disconnected".to_string(),
            ip: None,
        };
    }
    let addr = host.run("ip", &["addr", "show", "eth0"]).await;
    EthernetStatus {
        status: "Connected".to_string(),
        ip: Some(parse_inet_address(&addr.stdout).unwrap_or_else(|| "No IP".to_string())),
    }
}

async fn collect_wifi(host: &dyn Host) -> WifiStatus {
    let info = host.run("iwconfig", &["wlan0"]).await;
    let connected = info.stdout.contains("ESSID") && !info.stdout.contains("Not-Associated");
    if !connected {
        return WifiStatus {
            status: "Disconnected".to_string(),
            ssid: None,
            signal: None,
        };
    }
    WifiStatus {
        status: "Connected".to_string(),
        ssid: parse_essid(&info.stdout),
        signal: parse_signal_level(&info.stdout),
    }
}

async fn ping(host: &dyn Host, target: &str) -> bool {
    host.run("ping", &["-c", "2", "-W", "3", target])
        .await
        .success()
}

/// Disk, block device and USB listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStatus {
    /// e.g. "12G used of 58G"
    pub root_usage: String,
    pub disk_usage: String,
    pub block_devices: String,
    pub usb_devices: String,
    pub mounts: String,
}

impl StorageStatus {
    pub async fn collect(host: &dyn Host) -> Self {
        let (root_usage, disk_usage, block_devices, usb_devices, mounts) = tokio::join!(
            first_of(host, ROOT_USAGE_PROBES, "Storage info unavailable"),
            host.run("df", &["-h"]),
            host.run("lsblk", &[]),
            host.run("lsusb", &[]),
            host.run("mount", &[]),
        );
        let mounts = mounts
            .stdout
            .lines()
            .filter(|line| !["tmpfs", "proc", "sys"].iter().any(|fs| line.contains(fs)))
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            root_usage,
            disk_usage: or_not_available(disk_usage.text()),
            block_devices: or_not_available(block_devices.text()),
            usb_devices: or_not_available(usb_devices.text()),
            mounts: or_not_available(&mounts),
        }
    }
}

/// Accelerator-specific diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceleratorStatus {
    pub usb_neural: String,
    pub i2c_devices: String,
    pub gpio_info: String,
    pub power_draw: String,
}

impl Default for AcceleratorStatus {
    fn default() -> Self {
        Self {
            usb_neural: "No USB neural devices found".to_string(),
            i2c_devices: "No I2C devices found".to_string(),
            gpio_info: "GPIO info not available".to_string(),
            power_draw: "Power monitoring not available".to_string(),
        }
    }
}

impl AcceleratorStatus {
    pub async fn collect(host: &dyn Host) -> Self {
        let (usb, i2c_devices, pinout, power_draw) = tokio::join!(
            host.run("lsusb", &[]),
            collect_i2c_buses(host),
            host.run("pinout", &[]),
            collect_power_draw(host),
        );

        let usb_neural = usb
            .stdout
            .lines()
            .filter(|line| mentions_any(line, AI_USB_KEYWORDS))
            .collect::<Vec<_>>()
            .join("\n");
        let gpio_info = pinout.text().lines().take(20).collect::<Vec<_>>().join("\n");

        let defaults = Self::default();
        Self {
            usb_neural: or_placeholder(&usb_neural, &defaults.usb_neural),
            i2c_devices: i2c_devices.unwrap_or(defaults.i2c_devices),
            gpio_info: or_placeholder(&gpio_info, &defaults.gpio_info),
            power_draw: power_draw.unwrap_or(defaults.power_draw),
        }
    }
}

async fn collect_i2c_buses(host: &dyn Host) -> Option<String> {
    let buses: Vec<String> = host
        .list_dir("/dev")
        .await
        .into_iter()
        .filter_map(|name| name.strip_prefix("i2c-").map(str::to_string))
        .collect();

    let dumps = join_all(buses.iter().map(|bus| async move {
        let output = host.run("i2cdetect", &["-y", bus.as_str()]).await;
        let text = output.text();
        (!text.is_empty()).then(|| format!("Bus {bus}:\n{text}"))
    }))
    .await;

    let dumps: Vec<String> = dumps.into_iter().flatten().collect();
    (!dumps.is_empty()).then(|| dumps.join("\n"))
}

async fn collect_power_draw(host: &dyn Host) -> Option<String> {
    for entry in host.list_dir("/sys/class/hwmon").await {
        if !entry.starts_with("hwmon") {
            continue;
        }
        let path = format!("/sys/class/hwmon/{entry}/power1_input");
        let Some(raw) = host.read_file(&path).await else {
            continue;
        };
        if let Ok(microwatts) = raw.trim().parse::<u64>() {
            return Some(format!("{:.2}W", microwatts as f64 / 1_000_000.0));
        }
    }
    None
}

/// Kernel log excerpts, shown collapsed in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogExcerpts {
    pub critical_events: String,
    pub network_events: String,
    pub power_events: String,
}

impl LogExcerpts {
    pub async fn collect(host: &dyn Host) -> Self {
        let dmesg = host.run("dmesg", &[]).await;
        let excerpt = |keywords: &[&str], placeholder: &str| {
            or_placeholder(&grep_tail(&dmesg.stdout, keywords, 10).join("\n"), placeholder)
        };

        Self {
            critical_events: excerpt(
                &["error", "fail", "warn", "critical", "panic"],
                "No critical events found",
            ),
            network_events: excerpt(
                &["network", "wifi", "eth", "usb"],
                "No network events found",
            ),
            power_events: excerpt(
                &["power", "thermal", "voltage", "temperature"],
                "No power/thermal events found",
            ),
        }
    }
}

fn or_placeholder(text: &str, placeholder: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        placeholder.to_string()
    } else {
        text.to_string()
    }
}

fn or_not_available(text: &str) -> String {
    or_placeholder(text, NOT_AVAILABLE)
}

/// `temp=48.3'C` → `48.3'C`, `volt=0.8600V` → `0.8600V`.
pub fn value_after_equals(raw: &str) -> Option<String> {
    raw.trim()
        .split_once('=')
        .map(|(_, value)| value.trim().to_string())
}

/// Thermal zone millidegrees → `48.3'C`.
pub fn parse_millidegrees(raw: &str) -> Option<String> {
    let millidegrees: i64 = raw.trim().parse().ok()?;
    Some(format!("{:.1}'C", millidegrees as f64 / 1000.0))
}

/// Text after `load average:` in `uptime` output.
pub fn parse_load_average(raw: &str) -> Option<String> {
    raw.split_once("load average:")
        .map(|(_, load)| load.trim().to_string())
}

/// `free` output → `"23.4% of 7.9GB"`.
pub fn parse_memory_usage(raw: &str) -> Option<String> {
    let mem_line = raw.lines().nth(1)?;
    let mut fields = mem_line.split_whitespace().skip(1);
    let total: f64 = fields.next()?.parse().ok()?;
    let used: f64 = fields.next()?.parse().ok()?;
    if total <= 0.0 {
        return None;
    }
    Some(format!(
        "{:.1}% of {:.1}GB",
        used * 100.0 / total,
        total / 1024.0 / 1024.0
    ))
}

/// `df -h /` output → `"12G used of 58G"`.
pub fn parse_root_usage(raw: &str) -> Option<String> {
    let fields: Vec<&str> = raw.lines().nth(1)?.split_whitespace().collect();
    let size = fields.get(1)?;
    let used = fields.get(2)?;
    Some(format!("{used} used of {size}"))
}

/// Gateway address from `ip route` (`default via 192.168.1.1 dev eth0`).
pub fn default_gateway(routes: &str) -> Option<String> {
    routes
        .lines()
        .find(|line| line.contains("default"))
        .and_then(|line| line.split_whitespace().nth(2))
        .map(str::to_string)
}

/// First IPv4 address from `ip addr show` output.
pub fn parse_inet_address(addr: &str) -> Option<String> {
    addr.lines()
        .map(str::trim)
        .find(|line| line.starts_with("inet "))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|cidr| cidr.split('/').next())
        .map(str::to_string)
}

/// `ESSID:"HomeNet"` from `iwconfig` output.
pub fn parse_essid(iwconfig: &str) -> Option<String> {
    let (_, rest) = iwconfig.split_once("ESSID:\"")?;
    rest.split('"').next().map(str::to_string)
}

/// `Signal level=-52 dBm` → `-52`.
pub fn parse_signal_level(iwconfig: &str) -> Option<String> {
    let (_, rest) = iwconfig.split_once("Signal level=")?;
    rest.split_whitespace().next().map(str::to_string)
}
