//! Hardware detection.

use crate::probe::field::{any_evidence, first_of, Evidence, FieldProbe};
use crate::probe::host::Host;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// USB descriptor keywords that suggest a neural accelerator.
pub const AI_USB_KEYWORDS: &[&str] = &["coral", "neural", "tpu", "edge"];

const MODEL_PROBES: &[FieldProbe] = &[FieldProbe::file("/proc/cpuinfo", parse_model)];
const REVISION_PROBES: &[FieldProbe] = &[FieldProbe::file("/proc/cpuinfo", parse_revision)];
const MEMORY_PROBES: &[FieldProbe] = &[FieldProbe::file("/proc/meminfo", parse_mem_total)];

const WIFI_EVIDENCE: &[Evidence] = &[Evidence::CommandMentions {
    program: "ip",
    args: &["link", "show"],
    keywords: &["wlan"],
}];

const ETHERNET_EVIDENCE: &[Evidence] = &[Evidence::CommandMentions {
    program: "ip",
    args: &["link", "show"],
    keywords: &["eth"],
}];

const AI_ACCELERATOR_EVIDENCE: &[Evidence] = &[
    Evidence::CommandMentions {
        program: "lsusb",
        args: &[],
        keywords: AI_USB_KEYWORDS,
    },
    Evidence::DirHasEntry {
        dir: "/dev",
        prefix: "i2c-",
    },
];

const COOLING_EVIDENCE: &[Evidence] = &[
    Evidence::DirEntryFileMentions {
        dir: "/sys/class/thermal",
        prefix: "cooling_device",
        file: "type",
        keyword: "fan",
    },
    Evidence::CommandPrints {
        program: "systemctl",
        args: &["is-active", "fancontrol"],
        expected: "active",
    },
    Evidence::CommandHasOutput {
        program: "pgrep",
        args: &["-f", "gpio.*fan"],
    },
];

/// Static description of the board, detected once per process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Board model (e.g., "Raspberry Pi 5 Model B Rev 1.0")
    pub model: String,
    /// Board revision code
    pub revision: String,
    /// Installed memory, rounded to whole gigabytes
    pub memory: String,
    pub has_wifi: bool,
    pub has_ethernet: bool,
    /// An AI accelerator (AI HAT, Coral, ...) appears to be attached
    pub has_ai_hat: bool,
    /// Some form of active cooling appears to be present
    pub has_cooling: bool,
}

impl Default for HardwareProfile {
    fn default() -> Self {
        Self {
            model: "Unknown".to_string(),
            revision: "Unknown".to_string(),
            memory: "0 GB".to_string(),
            has_wifi: false,
            has_ethernet: false,
            has_ai_hat: false,
            has_cooling: false,
        }
    }
}

impl HardwareProfile {
    /// Probe the host. Never fails; undetectable facts keep their defaults.
    pub async fn detect(host: &dyn Host) -> Self {
        let (model, revision, memory) = tokio::join!(
            first_of(host, MODEL_PROBES, "Unknown"),
            first_of(host, REVISION_PROBES, "Unknown"),
            first_of(host, MEMORY_PROBES, "0 GB"),
        );
        let (has_wifi, has_ethernet, has_ai_hat, has_cooling) = tokio::join!(
            any_evidence(host, WIFI_EVIDENCE),
            any_evidence(host, ETHERNET_EVIDENCE),
            any_evidence(host, AI_ACCELERATOR_EVIDENCE),
            any_evidence(host, COOLING_EVIDENCE),
        );

        let profile = Self {
            model,
            revision,
            memory,
            has_wifi,
            has_ethernet,
            has_ai_hat,
            has_cooling,
        };
        debug!(?profile, "hardware detected");
        profile
    }

    /// Whether this is a Raspberry Pi 5.
    pub fn is_pi5(&self) -> bool {
        self.model.contains("Pi 5")
    }
}

fn cpuinfo_value(cpuinfo: &str, key: &str) -> Option<String> {
    let mut found = None;
    for line in cpuinfo.lines() {
        if line.contains(key) {
            if let Some((_, value)) = line.split_once(':') {
                found = Some(value.trim().to_string());
            }
        }
    }
    found
}

/// `Model : Raspberry Pi 5 Model B Rev 1.0` from `/proc/cpuinfo`.
pub fn parse_model(cpuinfo: &str) -> Option<String> {
    cpuinfo_value(cpuinfo, "Model")
}

/// `Revision : d04170` from `/proc/cpuinfo`.
pub fn parse_revision(cpuinfo: &str) -> Option<String> {
    cpuinfo_value(cpuinfo, "Revision")
}

/// `MemTotal: 8245444 kB` formatted as whole gigabytes.
pub fn parse_mem_total(meminfo: &str) -> Option<String> {
    let line = meminfo.lines().find(|l| l.starts_with("MemTotal"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(format!("{:.0} GB", kb / 1024.0 / 1024.0))
}
