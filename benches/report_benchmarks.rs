use chrono::Local;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pi_diagnostics::{
    pihole::PiholeConfig, report::html::render_html, HardwareProfile, PiholeReporter,
    ScriptedHost, StatusSnapshot, Thresholds,
};
use std::sync::Arc;

fn scripted_pi5() -> ScriptedHost {
    ScriptedHost::new()
        .with_file(
            "/proc/cpuinfo",
            "Revision\t: d04170\nModel\t\t: Raspberry Pi 5 Model B Rev 1.0\n",
        )
        .with_file("/proc/meminfo", "MemTotal:        8245120 kB\n")
        .with_command("ip link show", "2: eth0: state UP\n3: wlan0: state UP\n")
        .with_command("lsusb", "Bus 001 Device 002: ID 1a6e:089a Coral Edge TPU")
        .with_command("vcgencmd measure_temp", "temp=61.8'C")
        .with_command("vcgencmd get_throttled", "throttled=0x0")
        .with_command("dmesg", &"[ 12.0] usb 1-1: new device <Coral> & friends\n".repeat(200))
}

/// Benchmark hardware detection plus status collection against a scripted host
fn bench_collection(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let host = scripted_pi5();

    c.bench_function("detect_and_collect", |b| {
        b.to_async(&rt).iter(|| async {
            let profile = HardwareProfile::detect(&host).await;
            StatusSnapshot::collect(&host, &profile).await
        })
    });
}

/// Benchmark HTML rendering of a collected snapshot
fn bench_render(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let host = scripted_pi5();
    let (profile, snapshot) = rt.block_on(async {
        let profile = HardwareProfile::detect(&host).await;
        let snapshot = StatusSnapshot::collect(&host, &profile).await;
        (profile, snapshot)
    });
    let thresholds = Thresholds::default();

    c.bench_function("render_html", |b| {
        b.iter(|| render_html(&profile, &snapshot, &thresholds, Local::now()))
    });

    c.bench_function("status_json_serialization", |b| {
        b.iter(|| serde_json::to_string(&snapshot).expect("Should serialize"))
    });
}

/// Benchmark the Pi-hole report with growing local DNS lists
fn bench_pihole_report(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");

    for records in [10, 100, 1000].iter() {
        let custom_list: String = (0..*records)
            .map(|i| format!("10.0.{}.{} host{}.lan\n", i / 256, i % 256, i))
            .collect();
        let host = ScriptedHost::new().with_file("/etc/pihole/custom.list", &custom_list);
        let reporter = PiholeReporter::new(
            Arc::new(host),
            PiholeConfig::default().with_lease_files(vec![]),
        );

        c.bench_with_input(
            BenchmarkId::new("pihole_report", records),
            records,
            |b, _| b.to_async(&rt).iter(|| reporter.render(Local::now())),
        );
    }
}

criterion_group!(benches, bench_collection, bench_render, bench_pihole_report);
criterion_main!(benches);
