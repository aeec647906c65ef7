//! Self-contained HTML rendering of a diagnostics report.

use crate::probe::status::{AcceleratorStatus, NetworkStatus, PowerStatus};
use crate::probe::{HardwareProfile, StatusSnapshot};
use crate::report::recommendations::recommendations;
use crate::report::status_class::{StatusClass, Thresholds};
use chrono::{DateTime, Local};
use std::fmt::Write;
use tracing::error;

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the full report document.
///
/// The output depends only on the arguments, so two renders of the same
/// snapshot differ only in the footer timestamp.
pub fn render_html(
    profile: &HardwareProfile,
    snapshot: &StatusSnapshot,
    thresholds: &Thresholds,
    generated_at: DateTime<Local>,
) -> String {
    let mut html = String::with_capacity(32 * 1024);
    if write_document(&mut html, profile, snapshot, thresholds, generated_at).is_err() {
        error!("failed to format the diagnostics report");
    }
    html
}

fn write_document(
    html: &mut String,
    profile: &HardwareProfile,
    snapshot: &StatusSnapshot,
    thresholds: &Thresholds,
    generated_at: DateTime<Local>,
) -> std::fmt::Result {
    html.push_str(DOCUMENT_HEAD);

    write_hardware_overview(html, profile, snapshot, thresholds)?;
    write_system_status(html, snapshot, thresholds)?;
    write_power_supply(html, &snapshot.power)?;
    if profile.has_ai_hat {
        let fallback = AcceleratorStatus::default();
        let accelerator = snapshot.accelerator.as_ref().unwrap_or(&fallback);
        write_accelerator(html, accelerator)?;
    }
    write_network(html, &snapshot.network)?;
    write_storage(html, snapshot)?;
    write_logs(html, snapshot)?;
    write_recommendations(html, profile)?;
    write!(
        html,
        r#"
            <div class="timestamp">
                Report generated: {}<br>
                Auto-refresh available via refresh button
            </div>
        </div>
    </div>
</body>
</html>
"#,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )
}

fn write_hardware_overview(
    html: &mut String,
    profile: &HardwareProfile,
    snapshot: &StatusSnapshot,
    thresholds: &Thresholds,
) -> std::fmt::Result {
    write!(
        html,
        r#"
            <div class="hardware-overview">
                <div class="hw-card success">
                    <h3>🖥️ System</h3>
                    <div class="card-title">{}</div>
                    <div>Memory: {}</div>
                    <div class="card-note">Rev: {}</div>
                </div>"#,
        escape_html(&profile.model),
        escape_html(&profile.memory),
        escape_html(&profile.revision),
    )?;

    if let Some(ethernet) = snapshot.network.ethernet.as_ref().filter(|_| profile.has_ethernet) {
        let class = link_class(&ethernet.status);
        write!(
            html,
            r#"
                <div class="hw-card {class}">
                    <h3>🔌 Ethernet</h3>
                    <div class="card-title">{}</div>"#,
            escape_html(&ethernet.status),
        )?;
        if let Some(ip) = ethernet.ip.as_deref().filter(|ip| *ip != "No IP") {
            write!(html, "\n                    <div>IP: {}</div>", escape_html(ip))?;
        }
        html.push_str("\n                </div>");
    }

    if let Some(wifi) = snapshot.network.wifi.as_ref().filter(|_| profile.has_wifi) {
        let class = link_class(&wifi.status);
        write!(
            html,
            r#"
                <div class="hw-card {class}">
                    <h3>📶 WiFi</h3>
                    <div class="card-title">{}</div>"#,
            escape_html(&wifi.status),
        )?;
        if let Some(ssid) = &wifi.ssid {
            write!(html, "\n                    <div>SSID: {}</div>", escape_html(ssid))?;
        }
        if let Some(signal) = &wifi.signal {
            write!(html, "\n                    <div>Signal: {}</div>", escape_html(signal))?;
        }
        html.push_str("\n                </div>");
    }

    if profile.has_ai_hat {
        html.push_str(
            r#"
                <div class="hw-card available">
                    <h3>🤖 AI HAT</h3>
                    <div class="card-title">Detected</div>
                    <div class="card-note">Neural Processing Unit</div>
                </div>"#,
        );
    }

    if profile.has_cooling {
        let temperature = &snapshot.system.temperature;
        write!(
            html,
            r#"
                <div class="hw-card {}">
                    <h3>🌪️ Cooling</h3>
                    <div class="card-title">Active</div>
                    <div>Temp: {}</div>
                </div>"#,
            thresholds.classify_text(temperature).css_class(),
            escape_html(temperature),
        )?;
    }

    write!(
        html,
        r#"
                <div class="hw-card available">
                    <h3>💾 Storage</h3>
                    <div class="card-note">{}</div>
                </div>
            </div>"#,
        escape_html(&snapshot.storage.root_usage),
    )
}

fn link_class(status: &str) -> &'static str {
    if status == "Connected" {
        "success"
    } else {
        "warning"
    }
}

fn write_metric(html: &mut String, class: &str, label: &str, value: &str) -> std::fmt::Result {
    write!(
        html,
        r#"
                        <div class="metric {class}">
                            <div class="label">{}</div>
                            <div class="value">{}</div>
                        </div>"#,
        escape_html(label),
        escape_html(value),
    )
}

fn section_open(html: &mut String, title: &str) {
    html.push_str("\n            <div class=\"section\">\n                <div class=\"section-header\">");
    html.push_str(title);
    html.push_str("</div>\n                <div class=\"section-content\">");
}

fn section_close(html: &mut String) {
    html.push_str("\n                </div>\n            </div>");
}

fn write_pre_blocks(html: &mut String, blocks: &[(&str, &str)]) -> std::fmt::Result {
    html.push_str("\n                    <pre>");
    for (i, (title, body)) in blocks.iter().enumerate() {
        if i > 0 {
            html.push_str("\n\n");
        }
        write!(html, "=== {} ===\n{}", escape_html(title), escape_html(body))?;
    }
    html.push_str("</pre>");
    Ok(())
}

fn write_system_status(
    html: &mut String,
    snapshot: &StatusSnapshot,
    thresholds: &Thresholds,
) -> std::fmt::Result {
    let system = &snapshot.system;
    section_open(html, "📊 System Status");
    html.push_str("\n                    <div class=\"metric-grid\">");
    write_metric(html, "", "Hostname", &system.hostname)?;
    write_metric(html, "", "Uptime", &system.uptime)?;
    write_metric(html, "", "Load Average", &system.load)?;
    write_metric(html, "", "Memory Usage", &system.memory_usage)?;
    let temperature_class = match thresholds.classify_text(&system.temperature) {
        StatusClass::Nominal => "",
        class => class.css_class(),
    };
    write_metric(html, temperature_class, "Temperature", &system.temperature)?;
    html.push_str("\n                    </div>");
    section_close(html);
    Ok(())
}

fn write_power_supply(html: &mut String, power: &PowerStatus) -> std::fmt::Result {
    section_open(html, "⚡ Power Supply Analysis");
    if power.has_issues {
        html.push_str("\n                    <div class=\"status-error\">❌ Power/thermal throttling detected!</div>");
    } else {
        html.push_str("\n                    <div class=\"status-good\">✅ No power issues detected</div>");
    }

    html.push_str("\n                    <div class=\"metric-grid\">");
    for (rail, voltage) in &power.voltages {
        write_metric(html, "", &format!("{rail} voltage"), voltage)?;
    }
    html.push_str("\n                    </div>");

    let mut details = format!("Throttling Status: {}", power.throttled);
    for flag in power.throttle_flags() {
        let _ = write!(details, "\n  - {flag}");
    }
    if power.recent_events.is_empty() {
        details.push_str("\nNo recent power events");
    } else {
        for event in &power.recent_events {
            details.push('\n');
            details.push_str(event);
        }
    }
    write!(html, "\n                    <pre>{}</pre>", escape_html(&details))?;
    section_close(html);
    Ok(())
}

fn write_accelerator(html: &mut String, accelerator: &AcceleratorStatus) -> std::fmt::Result {
    section_open(html, "🤖 AI HAT Diagnostics");
    write_pre_blocks(
        html,
        &[
            ("AI/Neural Processing Devices", accelerator.usb_neural.as_str()),
            ("I2C Devices", accelerator.i2c_devices.as_str()),
            ("GPIO Usage", accelerator.gpio_info.as_str()),
            ("Power Consumption Estimate", accelerator.power_draw.as_str()),
        ],
    )?;
    section_close(html);
    Ok(())
}

fn write_check(html: &mut String, label: &str, ok: bool, good: &str, bad: &str) -> std::fmt::Result {
    let (class, value_class, text) = if ok {
        ("success", "status-good", format!("✅ {good}"))
    } else {
        ("error", "status-error", format!("❌ {bad}"))
    };
    write!(
        html,
        r#"
                        <div class="metric {class}">
                            <div class="label">{label}</div>
                            <div class="value {value_class}">{text}</div>
                        </div>"#,
    )
}

fn write_network(html: &mut String, network: &NetworkStatus) -> std::fmt::Result {
    section_open(html, "🌐 Network Diagnostics");
    html.push_str("\n                    <div class=\"metric-grid\">");
    write_check(html, "Gateway", network.gateway_reachable, "Reachable", "Unreachable")?;
    write_check(html, "Internet", network.internet_reachable, "Connected", "No Connection")?;
    write_check(html, "DNS", network.dns_working, "Working", "Failed")?;
    html.push_str("\n                    </div>");
    write_pre_blocks(
        html,
        &[
            ("Network Interfaces", network.interfaces.as_str()),
            ("Routing Table", network.routes.as_str()),
            ("Network Statistics", network.stats.as_str()),
        ],
    )?;
    section_close(html);
    Ok(())
}

fn write_storage(html: &mut String, snapshot: &StatusSnapshot) -> std::fmt::Result {
    let storage = &snapshot.storage;
    section_open(html, "💾 Storage &amp; USB");
    write_pre_blocks(
        html,
        &[
            ("Disk Usage", storage.disk_usage.as_str()),
            ("External Storage", storage.block_devices.as_str()),
            ("USB Devices", storage.usb_devices.as_str()),
            ("Mount Points", storage.mounts.as_str()),
        ],
    )?;
    section_close(html);
    Ok(())
}

fn write_logs(html: &mut String, snapshot: &StatusSnapshot) -> std::fmt::Result {
    let logs = &snapshot.logs;
    html.push_str(
        r#"
            <div class="section">
                <div class="section-header collapsible" onclick="toggleSection('logs')">📋 System Logs (Click to toggle)</div>
                <div class="section-content" id="logs" style="display: none;">"#,
    );
    write_pre_blocks(
        html,
        &[
            ("Recent Critical Events", logs.critical_events.as_str()),
            ("Network Events", logs.network_events.as_str()),
            ("Power/Thermal Events", logs.power_events.as_str()),
        ],
    )?;
    section_close(html);
    Ok(())
}

fn write_recommendations(html: &mut String, profile: &HardwareProfile) -> std::fmt::Result {
    section_open(html, "💡 Recommendations");
    html.push_str(
        r#"
                    <div class="advice">
                        <h4>Hardware-Specific Recommendations:</h4>
                        <ul>"#,
    );
    let advice = recommendations(profile);
    if advice.is_empty() {
        html.push_str("\n                            <li>No hardware-specific recommendations</li>");
    }
    for item in advice {
        write!(
            html,
            "\n                            <li><strong>{}:</strong> {}</li>",
            escape_html(item.title),
            escape_html(item.detail),
        )?;
    }
    html.push_str("\n                        </ul>\n                    </div>");
    section_close(html);
    Ok(())
}

const DOCUMENT_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Raspberry Pi Diagnostics Report</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            line-height: 1.6;
            background: linear-gradient(135deg, #1e3c72, #2a5298);
            color: #333;
            min-height: 100vh;
            padding: 20px;
        }
        .container {
            max-width: 1400px;
            margin: 0 auto;
            background: white;
            border-radius: 15px;
            box-shadow: 0 20px 40px rgba(0,0,0,0.1);
            overflow: hidden;
        }
        .header {
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            padding: 30px;
            text-align: center;
        }
        .header h1 { font-size: 2.5em; margin-bottom: 10px; }
        .header .subtitle { font-size: 1.2em; opacity: 0.9; }
        .content { padding: 30px; }
        .hardware-overview {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(250px, 1fr));
            gap: 20px;
            margin-bottom: 30px;
        }
        .hw-card {
            background: linear-gradient(135deg, #f093fb 0%, #f5576c 100%);
            color: white;
            padding: 20px;
            border-radius: 10px;
            text-align: center;
            box-shadow: 0 5px 15px rgba(0,0,0,0.1);
        }
        .hw-card.available { background: linear-gradient(135deg, #4facfe 0%, #00f2fe 100%); }
        .hw-card.warning { background: linear-gradient(135deg, #fa709a 0%, #fee140 100%); }
        .hw-card.error { background: linear-gradient(135deg, #ff6b6b 0%, #ee5a24 100%); }
        .hw-card.success { background: linear-gradient(135deg, #56ab2f 0%, #a8e6cf 100%); }
        .hw-card .card-title { font-size: 1.1em; margin: 10px 0; }
        .hw-card .card-note { font-size: 0.9em; opacity: 0.8; }
        .section {
            background: #f8f9fa;
            margin: 20px 0;
            border-radius: 10px;
            overflow: hidden;
            box-shadow: 0 3px 10px rgba(0,0,0,0.1);
        }
        .section-header {
            background: linear-gradient(135deg, #36d1dc 0%, #5b86e5 100%);
            color: white;
            padding: 15px 20px;
            font-weight: bold;
            font-size: 1.1em;
        }
        .section-content { padding: 20px; }
        pre {
            background: #2c3e50;
            color: #ecf0f1;
            padding: 15px;
            border-radius: 5px;
            font-family: 'Consolas', 'Monaco', 'Courier New', monospace;
            overflow-x: auto;
            font-size: 0.9em;
            white-space: pre-wrap;
        }
        .status-good { color: #27ae60; font-weight: bold; }
        .status-warning { color: #f39c12; font-weight: bold; }
        .status-error { color: #e74c3c; font-weight: bold; }
        .metric-grid {
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 15px;
            margin: 15px 0;
        }
        .metric {
            background: white;
            padding: 15px;
            border-radius: 8px;
            border-left: 4px solid #3498db;
        }
        .metric.warning { border-left-color: #f39c12; }
        .metric.error { border-left-color: #e74c3c; }
        .metric.success { border-left-color: #27ae60; }
        .metric .label { font-size: 0.9em; color: #7f8c8d; }
        .metric .value { font-size: 1.3em; font-weight: bold; margin-top: 5px; }
        .advice {
            background: #e8f4f8;
            padding: 15px;
            border-radius: 8px;
            border-left: 4px solid #3498db;
        }
        .refresh-btn {
            position: fixed;
            top: 20px;
            right: 20px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            border: none;
            padding: 12px 20px;
            border-radius: 25px;
            cursor: pointer;
            font-weight: bold;
            box-shadow: 0 5px 15px rgba(0,0,0,0.2);
            transition: transform 0.2s;
        }
        .refresh-btn:hover { transform: translateY(-2px); }
        .timestamp { text-align: center; color: #7f8c8d; margin-top: 30px; }
        .collapsible { cursor: pointer; user-select: none; }
        .collapsible:hover { opacity: 0.8; }
        @media (max-width: 768px) {
            .container { margin: 10px; border-radius: 10px; }
            .header { padding: 20px; }
            .header h1 { font-size: 2em; }
            .content { padding: 20px; }
        }
    </style>
    <script>
        function refreshPage() { window.location.href = '/refresh'; }
        function toggleSection(id) {
            const content = document.getElementById(id);
            content.style.display = content.style.display === 'none' ? 'block' : 'none';
        }
    </script>
</head>
<body>
    <button class="refresh-btn" onclick="refreshPage()">🔄 Refresh</button>
    <div class="container">
        <div class="header">
            <h1>🥧 Raspberry Pi Diagnostics</h1>
            <div class="subtitle">Comprehensive Hardware &amp; Network Analysis</div>
        </div>
        <div class="content">"#;
