//! Pi-hole configuration report.
//!
//! Reads the Pi-hole configuration directory, the gravity database and the
//! dnsmasq drop-ins, and renders them as a Markdown [`Report`]. Nothing here
//! fails: any section whose source is missing prints a placeholder.

use crate::probe::Host;
use crate::report::{Report, ReportFormat};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Body of a section with nothing to show.
pub const NO_DATA: &str = "_No data found_";

const GRAVITY_DB: &str = "gravity.db";
const GRAVITY_COUNT_QUERY: &str = "SELECT COUNT(*) FROM gravity;";
const ADLIST_QUERY: &str = "SELECT address FROM adlist WHERE enabled = 1;";
const DOMAINLIST_QUERY: &str = "SELECT type, COUNT(*) FROM domainlist GROUP BY type;";

/// Locations of the Pi-hole installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiholeConfig {
    /// Pi-hole configuration directory
    pub config_dir: PathBuf,
    /// dnsmasq drop-in directory
    pub dnsmasq_dir: PathBuf,
    /// Lease files tried after `<config_dir>/dhcp.leases`
    pub lease_files: Vec<PathBuf>,
}

impl Default for PiholeConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from("/etc/pihole"),
            dnsmasq_dir: PathBuf::from("/etc/dnsmasq.d"),
            lease_files: vec![PathBuf::from("/var/lib/misc/dnsmasq.leases")],
        }
    }
}

impl PiholeConfig {
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn with_dnsmasq_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dnsmasq_dir = dir.into();
        self
    }

    pub fn with_lease_files(mut self, files: Vec<PathBuf>) -> Self {
        self.lease_files = files;
        self
    }

    fn config_file(&self, name: &str) -> String {
        path_str(&self.config_dir.join(name))
    }

    /// Lease files in lookup order.
    fn lease_candidates(&self) -> Vec<String> {
        std::iter::once(self.config_file("dhcp.leases"))
            .chain(self.lease_files.iter().map(|p| path_str(p)))
            .collect()
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// One DHCP lease from a dnsmasq lease file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Expiry as a Unix timestamp, 0 for infinite
    pub expires: i64,
    pub mac: String,
    pub ip: String,
    pub hostname: String,
}

/// Renders the Pi-hole configuration report.
pub struct PiholeReporter {
    host: Arc<dyn Host>,
    config: PiholeConfig,
}

impl PiholeReporter {
    pub fn new(host: Arc<dyn Host>, config: PiholeConfig) -> Self {
        Self { host, config }
    }

    /// Render the full Markdown report.
    pub async fn render(&self, generated_at: DateTime<Local>) -> Report {
        let setup_vars = self
            .read(&self.config.config_file("setupVars.conf"))
            .await
            .map(|text| parse_key_values(&text))
            .unwrap_or_default();
        let has_gravity = self
            .host
            .list_dir(&path_str(&self.config.config_dir))
            .await
            .iter()
            .any(|entry| entry == GRAVITY_DB);
        debug!(has_gravity, settings = setup_vars.len(), "rendering Pi-hole report");

        let sections = [
            ("Status", self.command_block("status").await),
            ("Version", self.command_block("-v").await),
            ("Core Settings", core_settings(&setup_vars)),
            ("Upstream DNS Servers", upstream_servers(&setup_vars)),
            ("FTL Settings", self.ftl_settings().await),
            ("Gravity", self.gravity(has_gravity).await),
            ("Adlists", self.adlists(has_gravity).await),
            ("Domain Lists", self.domain_lists(has_gravity).await),
            ("Local DNS Records", self.local_dns().await),
            ("CNAME Records", self.cname_records().await),
            ("DHCP", self.dhcp(&setup_vars).await),
        ];

        let mut body = String::new();
        let _ = writeln!(body, "# Pi-hole Configuration Report\n");
        let _ = writeln!(
            body,
            "_Generated: {}_\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        for (title, content) in sections {
            let _ = writeln!(body, "## {}\n", title);
            let _ = writeln!(body, "{}\n", content.as_deref().unwrap_or(NO_DATA));
        }

        Report {
            format: ReportFormat::Markdown,
            body,
            generated_at,
        }
    }

    /// Non-empty file contents.
    async fn read(&self, path: &str) -> Option<String> {
        self.host
            .read_file(path)
            .await
            .filter(|text| !text.trim().is_empty())
    }

    async fn command_block(&self, arg: &str) -> Option<String> {
        let output = self.host.run("pihole", &[arg]).await;
        let text = output.text();
        (output.ran() && !text.is_empty()).then(|| code_block(text))
    }

    /// Output of a successful query against the gravity database.
    async fn query(&self, has_gravity: bool, sql: &str) -> Option<String> {
        if !has_gravity {
            return None;
        }
        let db = self.config.config_file(GRAVITY_DB);
        let output = self.host.run("sqlite3", &[db.as_str(), sql]).await;
        let text = output.text();
        (output.success() && !text.is_empty()).then(|| text.to_string())
    }

    async fn ftl_settings(&self) -> Option<String> {
        let text = self.read(&self.config.config_file("pihole-FTL.conf")).await?;
        non_empty(key_value_table(&parse_key_values(&text)))
    }

    async fn gravity(&self, has_gravity: bool) -> Option<String> {
        let count = self.query(has_gravity, GRAVITY_COUNT_QUERY).await?;
        Some(format!("**Domains on gravity list:** {}", count))
    }

    async fn adlists(&self, has_gravity: bool) -> Option<String> {
        let addresses = match self.query(has_gravity, ADLIST_QUERY).await {
            Some(text) => text,
            None => self.read(&self.config.config_file("adlists.list")).await?,
        };
        non_empty(bullet_list(content_lines(&addresses)))
    }

    async fn domain_lists(&self, has_gravity: bool) -> Option<String> {
        let text = self.query(has_gravity, DOMAINLIST_QUERY).await?;
        let rows: Vec<Vec<String>> = parse_domain_counts(&text)
            .into_iter()
            .map(|(kind, count)| vec![kind.to_string(), count.to_string()])
            .collect();
        non_empty(table(&["List", "Entries"], &rows))
    }

    async fn local_dns(&self) -> Option<String> {
        let text = self.read(&self.config.config_file("custom.list")).await?;
        let rows: Vec<Vec<String>> = content_lines(&text)
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let ip = fields.next()?;
                let name = fields.next()?;
                Some(vec![name.to_string(), ip.to_string()])
            })
            .collect();
        non_empty(table(&["Domain", "IP"], &rows))
    }

    async fn cname_records(&self) -> Option<String> {
        let path = path_str(&self.config.dnsmasq_dir.join("05-pihole-custom-cname.conf"));
        let text = self.read(&path).await?;
        let rows: Vec<Vec<String>> = content_lines(&text)
            .filter_map(|line| {
                let (alias, target) = line.strip_prefix("cname=")?.split_once(',')?;
                Some(vec![alias.trim().to_string(), target.trim().to_string()])
            })
            .collect();
        non_empty(table(&["Domain", "Target"], &rows))
    }

    async fn dhcp(&self, setup_vars: &[(String, String)]) -> Option<String> {
        let settings: Vec<(String, String)> = setup_vars
            .iter()
            .filter(|(key, _)| key.starts_with("DHCP_"))
            .cloned()
            .collect();

        let mut leases = Vec::new();
        for candidate in self.config.lease_candidates() {
            if let Some(text) = self.read(&candidate).await {
                debug!(file = %candidate, "using lease file");
                leases = text.lines().filter_map(parse_lease).collect();
                break;
            }
        }

        if settings.is_empty() && leases.is_empty() {
            return None;
        }

        let mut out = key_value_table(&settings);
        if out.is_empty() {
            out.push_str(NO_DATA);
        }
        out.push_str("\n\n### Leases\n\n");
        if leases.is_empty() {
            out.push_str(NO_DATA);
        } else {
            out.push_str(&lease_table(&leases));
        }
        Some(out)
    }
}

fn core_settings(setup_vars: &[(String, String)]) -> Option<String> {
    let rows: Vec<(String, String)> = setup_vars
        .iter()
        .map(|(key, value)| (key.clone(), mask_secret(key, value)))
        .collect();
    non_empty(key_value_table(&rows))
}

fn upstream_servers(setup_vars: &[(String, String)]) -> Option<String> {
    let servers = setup_vars
        .iter()
        .filter(|(key, value)| key.starts_with("PIHOLE_DNS_") && !value.is_empty())
        .map(|(_, value)| value.as_str());
    non_empty(bullet_list(servers))
}

/// `KEY=VALUE` lines, skipping blanks and `#` comments.
pub fn parse_key_values(text: &str) -> Vec<(String, String)> {
    content_lines(text)
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Replace the value of credential keys.
pub fn mask_secret(key: &str, value: &str) -> String {
    let upper = key.to_ascii_uppercase();
    if !value.is_empty() && (upper.contains("PASSWORD") || upper.contains("TOKEN")) {
        "********".to_string()
    } else {
        value.to_string()
    }
}

/// `sqlite3` rows of `type|count` mapped to list names.
pub fn parse_domain_counts(text: &str) -> Vec<(&'static str, u64)> {
    text.lines()
        .filter_map(|line| {
            let (kind, count) = line.trim().split_once('|')?;
            let name = match kind.trim() {
                "0" => "Exact allow",
                "1" => "Exact deny",
                "2" => "Regex allow",
                "3" => "Regex deny",
                _ => return None,
            };
            Some((name, count.trim().parse().ok()?))
        })
        .collect()
}

/// One dnsmasq lease line: `expiry mac ip hostname client-id`.
pub fn parse_lease(line: &str) -> Option<Lease> {
    let mut fields = line.split_whitespace();
    let expires = fields.next()?.parse().ok()?;
    let mac = fields.next()?.to_string();
    let ip = fields.next()?.to_string();
    let hostname = fields.next().unwrap_or("*").to_string();
    Some(Lease {
        expires,
        mac,
        ip,
        hostname,
    })
}

fn lease_table(leases: &[Lease]) -> String {
    let rows: Vec<Vec<String>> = leases
        .iter()
        .map(|lease| {
            let expires = if lease.expires == 0 {
                "never".to_string()
            } else {
                DateTime::from_timestamp(lease.expires, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| lease.expires.to_string())
            };
            vec![
                lease.ip.clone(),
                lease.mac.clone(),
                lease.hostname.clone(),
                expires,
            ]
        })
        .collect();
    table(&["IP", "MAC", "Hostname", "Expires"], &rows)
}

fn content_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

fn code_block(text: &str) -> String {
    format!("```\n{}\n```", text)
}

fn bullet_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn key_value_table(pairs: &[(String, String)]) -> String {
    let rows: Vec<Vec<String>> = pairs
        .iter()
        .map(|(key, value)| vec![key.clone(), value.clone()])
        .collect();
    table(&["Setting", "Value"], &rows)
}

/// Markdown table, empty when there are no rows.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut out = format!("| {} |\n", headers.join(" | "));
    let _ = writeln!(out, "|{}", "---|".repeat(headers.len()));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|cell| escape_cell(cell)).collect();
        let _ = writeln!(out, "| {} |", cells.join(" | "));
    }
    out.truncate(out.trim_end().len());
    out
}

fn escape_cell(cell: &str) -> String {
    if cell.is_empty() {
        return "-".to_string();
    }
    cell.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{CommandOutput, ScriptedHost};
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn config() -> PiholeConfig {
        PiholeConfig::default().with_lease_files(vec![])
    }

    #[test]
    fn test_parse_key_values_skips_comments() {
        let pairs = parse_key_values("# comment\n\nPIHOLE_INTERFACE=eth0\nBLOCKING_ENABLED = true\n");
        assert_eq!(
            pairs,
            vec![
                ("PIHOLE_INTERFACE".to_string(), "eth0".to_string()),
                ("BLOCKING_ENABLED".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("WEBPASSWORD", "abc123"), "********");
        assert_eq!(mask_secret("WEBPASSWORD", ""), "");
        assert_eq!(mask_secret("PIHOLE_DNS_1", "1.1.1.1"), "1.1.1.1");
    }

    #[test]
    fn test_parse_domain_counts() {
        assert_eq!(
            parse_domain_counts("0|4\n3|2\n9|1\n"),
            vec![("Exact allow", 4), ("Regex deny", 2)]
        );
    }

    #[test]
    fn test_parse_lease() {
        let lease = parse_lease("1717228800 aa:bb:cc:dd:ee:ff 192.168.1.20 laptop 01:aa").unwrap();
        assert_eq!(lease.ip, "192.168.1.20");
        assert_eq!(lease.hostname, "laptop");
        assert!(parse_lease("garbage").is_none());
    }

    #[test]
    fn test_table_escapes_pipes() {
        let out = table(&["A", "B"], &[vec!["x|y".to_string(), String::new()]]);
        assert_eq!(out, "| A | B |\n|---|---|\n| x\\|y | - |");
    }

    #[tokio::test]
    async fn test_missing_installation_renders_placeholders() {
        let reporter = PiholeReporter::new(Arc::new(ScriptedHost::new()), config());
        let report = reporter.render(now()).await;

        assert_eq!(report.format, ReportFormat::Markdown);
        assert_eq!(report.body.matches(NO_DATA).count(), 11);
        assert!(report.body.starts_with("# Pi-hole Configuration Report"));
        assert!(report.body.contains("_Generated: 2025-06-01 08:00:00_"));
    }

    #[tokio::test]
    async fn test_populated_installation() {
        let host = ScriptedHost::new()
            .with_command("pihole status", "[✓] FTL is listening on port 53")
            .with_output("pihole -v", CommandOutput::failed(1, ""))
            .with_file(
                "/etc/pihole/setupVars.conf",
                "WEBPASSWORD=deadbeef\nPIHOLE_DNS_1=1.1.1.1\nPIHOLE_DNS_2=9.9.9.9\nDHCP_ACTIVE=true\n",
            )
            .with_file("/etc/pihole/custom.list", "192.168.1.5 nas.lan\n")
            .with_file(
                "/etc/dnsmasq.d/05-pihole-custom-cname.conf",
                "cname=files.lan,nas.lan\n",
            )
            .with_file(
                "/etc/pihole/dhcp.leases",
                "0 aa:bb:cc:dd:ee:ff 192.168.1.20 laptop *\n",
            )
            .with_dir("/etc/pihole", &["gravity.db", "setupVars.conf"])
            .with_command(
                &format!("sqlite3 /etc/pihole/gravity.db {}", GRAVITY_COUNT_QUERY),
                "123456",
            )
            .with_output(
                &format!("sqlite3 /etc/pihole/gravity.db {}", ADLIST_QUERY),
                CommandOutput::failed(1, ""),
            )
            .with_file(
                "/etc/pihole/adlists.list",
                "# default\nhttps://example.org/hosts\n",
            )
            .with_command(
                &format!("sqlite3 /etc/pihole/gravity.db {}", DOMAINLIST_QUERY),
                "1|3\n",
            );

        let report = PiholeReporter::new(Arc::new(host), config()).render(now()).await;
        let body = &report.body;

        assert!(body.contains("FTL is listening"));
        assert!(body.contains("| WEBPASSWORD | ******** |"));
        assert!(!body.contains("deadbeef"));
        assert!(body.contains("- 1.1.1.1\n- 9.9.9.9"));
        assert!(body.contains("**Domains on gravity list:** 123456"));
        assert!(body.contains("- https://example.org/hosts"));
        assert!(body.contains("| Exact deny | 3 |"));
        assert!(body.contains("| nas.lan | 192.168.1.5 |"));
        assert!(body.contains("| files.lan | nas.lan |"));
        assert!(body.contains("| DHCP_ACTIVE | true |"));
        assert!(body.contains("| 192.168.1.20 | aa:bb:cc:dd:ee:ff | laptop | never |"));
        // Version (failed command) and FTL settings (missing file)
        assert_eq!(body.matches(NO_DATA).count(), 2);
    }
}
