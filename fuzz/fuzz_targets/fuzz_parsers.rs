#![no_main]
use amtron_exporter::parsers;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    // Display strings from the charger are arbitrary text; none of these may panic
    let _ = parsers::decode_temperature(raw);
    let _ = parsers::decode_amperage(raw);
    let _ = parsers::decode_phase_currents(raw);
    let _ = parsers::decode_phase_voltages(raw);
    let _ = parsers::decode_frequency(raw);
    let _ = parsers::decode_type2_status(raw);
    let _ = parsers::decode_error_state(raw);
    let _ = parsers::decode_cycle_count(raw);
});
