#![no_main]
use amtron_exporter::dashboard::Dashboard;
use amtron_exporter::parsers::Readings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(document) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Any JSON shape must decode to readings, falling back where needed
    let dashboard = Dashboard::new(document);
    let _ = dashboard.session_expired();
    let _ = Readings::from_dashboard(&dashboard);
});
