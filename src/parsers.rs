//! Decoders for the charger's human-readable telemetry strings
//!
//! The dashboard renders every reading as display text with embedded units,
//! e.g. `"16.0 A"` or `"( 5.00 | 4.98 | 5.01 ) [A]"`. Each reading has one
//! decoder and one sentinel. A reading that cannot be located or decoded is
//! replaced by its sentinel and logged; it never affects the other readings.
//!
//! | Reading | Sentinel |
//! |---|---|
//! | `env_temperature` | -99.0 |
//! | `offered_amperage` | -99.0 |
//! | `charging_amperage{phase}` | -99.0 per phase |
//! | `ocpp_voltage{phase}` | -1.0 per phase |
//! | `ocpp_frequency` | -1.0 |
//! | `type2_status` | -1.0 |
//! | `error_state` | -99 (field or its value absent only) |
//! | `load_contactor_cycles` | -99 |
//! | `type2_plug_cycles` | -99 |

use crate::dashboard::{Dashboard, ExtractError, FieldPath};
use crate::logging::{StructuredLogger, get_logger};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

pub const TEMPERATURE_SENTINEL: f64 = -99.0;
pub const OFFERED_AMPERAGE_SENTINEL: f64 = -99.0;
pub const CHARGING_AMPERAGE_SENTINEL: f64 = -99.0;
pub const VOLTAGE_SENTINEL: f64 = -1.0;
pub const FREQUENCY_SENTINEL: f64 = -1.0;
pub const TYPE2_STATUS_SENTINEL: f64 = -1.0;
pub const ERROR_STATE_SENTINEL: i64 = -99;
pub const CYCLES_SENTINEL: i64 = -99;

/// `ErrorsList_custom` value reported by a healthy charger
pub const NO_ERRORS: &str = "No errors";

const SYSTEM_STATUS: &str = "system_status";
const EMANAGER_STATUS: &str = "emanager_status";
const FIRST_METER_TABLE: &str = "FirstMeterTable_meter";

pub const ENV_TEMPERATURE_PATH: FieldPath = FieldPath::sub_item(
    EMANAGER_STATUS,
    "EnergyManagerTable_energyman",
    "StateMon_energyman",
);
pub const OFFERED_AMPERAGE_PATH: FieldPath =
    FieldPath::field(SYSTEM_STATUS, "SignaledCurrentLimit_vehicleif");
pub const CHARGING_AMPERAGE_PATH: FieldPath =
    FieldPath::field(SYSTEM_STATUS, "OcppMeterCurrent_meter");
pub const OCPP_VOLTAGE_PATH: FieldPath =
    FieldPath::sub_item(EMANAGER_STATUS, FIRST_METER_TABLE, "OcppMeterVoltage_meter");
pub const OCPP_FREQUENCY_PATH: FieldPath =
    FieldPath::sub_item(EMANAGER_STATUS, FIRST_METER_TABLE, "OcppMeterFrequency_meter");
pub const TYPE2_STATUS_PATH: FieldPath =
    FieldPath::field(SYSTEM_STATUS, "Type2StateConnector1_vehicleif");
pub const ERROR_STATE_PATH: FieldPath = FieldPath::field(SYSTEM_STATUS, "ErrorsList_custom");
pub const LOAD_CONTACTOR_CYCLES_PATH: FieldPath =
    FieldPath::field(SYSTEM_STATUS, "Type2NumberContactorCyclesRO_vehicleif");
pub const TYPE2_PLUG_CYCLES_PATH: FieldPath =
    FieldPath::field(SYSTEM_STATUS, "Type2PlugCounterRO_vehicleif");

// Patterns are anchored at both ends; `.` does not cross line breaks.
// They are literals covered by the tests below, so building them cannot fail.
#[allow(clippy::expect_used)]
static TEMPERATURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*(?P<value>[+-]\d+\.\d+)\sC.*$").expect("temperature pattern is valid")
});
#[allow(clippy::expect_used)]
static AMPERAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>\d+\.?\d*)\sA$").expect("amperage pattern is valid"));
#[allow(clippy::expect_used)]
static PHASE_CURRENTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\(\s(?P<l1>\d+\.\d+)\s\|\s(?P<l2>\d+\.\d+)\s\|\s(?P<l3>\d+\.\d+)\s\)\s\[A\]$",
    )
    .expect("phase current pattern is valid")
});
#[allow(clippy::expect_used)]
static PHASE_VOLTAGES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(\s(?P<l1>\d+)\s\|\s(?P<l2>\d+)\s\|\s(?P<l3>\d+)\s\)\s\[V\]$")
        .expect("phase voltage pattern is valid")
});
#[allow(clippy::expect_used)]
static FREQUENCY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>\d+\.\d+)\sHz$").expect("frequency pattern is valid"));
#[allow(clippy::expect_used)]
static TYPE2_STATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\((?P<code>\w)\).*$").expect("type 2 state pattern is valid"));
#[allow(clippy::expect_used)]
static CYCLES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<value>\d+)/.*$").expect("cycle counter pattern is valid"));

/// Supply phase label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    L1,
    L2,
    L3,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::L1, Phase::L2, Phase::L3];

    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::L1 => "L1",
            Phase::L2 => "L2",
            Phase::L3 => "L3",
        }
    }
}

/// One value per supply phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseValues {
    pub l1: f64,
    pub l2: f64,
    pub l3: f64,
}

impl PhaseValues {
    pub const fn splat(value: f64) -> Self {
        Self {
            l1: value,
            l2: value,
            l3: value,
        }
    }

    pub const fn get(&self, phase: Phase) -> f64 {
        match phase {
            Phase::L1 => self.l1,
            Phase::L2 => self.l2,
            Phase::L3 => self.l3,
        }
    }
}

/// Why one reading fell back to its sentinel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error(transparent)]
    Missing(#[from] ExtractError),

    #[error("'{raw}' does not match the expected format")]
    Pattern { raw: String },
}

pub type ParseResult<T> = std::result::Result<T, ParseFailure>;

fn pattern_failure(raw: &str) -> ParseFailure {
    ParseFailure::Pattern {
        raw: raw.to_string(),
    }
}

/// Signed decimal before a `C` unit anywhere in free text: `"(+23.5 C) ok"` -> 23.5
pub fn decode_temperature(raw: &str) -> Option<f64> {
    TEMPERATURE_RE
        .captures(raw)
        .and_then(|c| c["value"].parse().ok())
}

/// Decimal with an `A` unit: `"16.0 A"` -> 16.0
pub fn decode_amperage(raw: &str) -> Option<f64> {
    AMPERAGE_RE
        .captures(raw)
        .and_then(|c| c["value"].parse().ok())
}

/// Three decimals: `"( 5.00 | 4.98 | 5.01 ) [A]"`
pub fn decode_phase_currents(raw: &str) -> Option<PhaseValues> {
    decode_triplet(&PHASE_CURRENTS_RE, raw)
}

/// Three integers: `"( 230 | 231 | 229 ) [V]"`
pub fn decode_phase_voltages(raw: &str) -> Option<PhaseValues> {
    decode_triplet(&PHASE_VOLTAGES_RE, raw)
}

fn decode_triplet(re: &Regex, raw: &str) -> Option<PhaseValues> {
    let caps = re.captures(raw)?;
    Some(PhaseValues {
        l1: caps["l1"].parse().ok()?,
        l2: caps["l2"].parse().ok()?,
        l3: caps["l3"].parse().ok()?,
    })
}

/// Decimal with a `Hz` unit: `"50.01 Hz"` -> 50.01
pub fn decode_frequency(raw: &str) -> Option<f64> {
    FREQUENCY_RE
        .captures(raw)
        .and_then(|c| c["value"].parse().ok())
}

/// IEC 61851 state letter in parentheses: `"(C)connected"` -> 3.0
pub fn decode_type2_status(raw: &str) -> Option<f64> {
    let caps = TYPE2_STATE_RE.captures(raw)?;
    match &caps["code"] {
        "A" => Some(1.0),
        "B" => Some(2.0),
        "C" => Some(3.0),
        "D" => Some(4.0),
        "E" => Some(5.0),
        "F" => Some(6.0),
        _ => None,
    }
}

/// `"No errors"` -> 0, anything else -> 1
pub fn decode_error_state(raw: &str) -> i64 {
    i64::from(raw != NO_ERRORS)
}

/// Like [`decode_error_state`] for a node of any JSON type: only the exact
/// string `"No errors"` means no error
pub fn decode_error_state_value(node: &Value) -> i64 {
    node.as_str().map_or(1, decode_error_state)
}

/// Leading counter before a `/`: `"1234/50000"` -> 1234
pub fn decode_cycle_count(raw: &str) -> Option<i64> {
    CYCLES_RE
        .captures(raw)
        .and_then(|c| c["value"].parse().ok())
}

/// Locates and decodes individual readings from one dashboard document
pub struct DashboardParser<'a> {
    dashboard: &'a Dashboard,
}

impl<'a> DashboardParser<'a> {
    pub fn new(dashboard: &'a Dashboard) -> Self {
        Self { dashboard }
    }

    fn decode<T>(&self, path: &FieldPath, decoder: impl FnOnce(&str) -> Option<T>) -> ParseResult<T> {
        let raw = self.dashboard.find(path)?;
        decoder(raw).ok_or_else(|| pattern_failure(raw))
    }

    pub fn env_temperature(&self) -> ParseResult<f64> {
        self.decode(&ENV_TEMPERATURE_PATH, decode_temperature)
    }

    pub fn offered_amperage(&self) -> ParseResult<f64> {
        self.decode(&OFFERED_AMPERAGE_PATH, decode_amperage)
    }

    pub fn charging_amperage(&self) -> ParseResult<PhaseValues> {
        self.decode(&CHARGING_AMPERAGE_PATH, decode_phase_currents)
    }

    pub fn ocpp_voltage(&self) -> ParseResult<PhaseValues> {
        self.decode(&OCPP_VOLTAGE_PATH, decode_phase_voltages)
    }

    pub fn ocpp_frequency(&self) -> ParseResult<f64> {
        self.decode(&OCPP_FREQUENCY_PATH, decode_frequency)
    }

    pub fn type2_status(&self) -> ParseResult<f64> {
        self.decode(&TYPE2_STATUS_PATH, decode_type2_status)
    }

    /// Any present value decodes; the sentinel is left for a missing field
    pub fn error_state(&self) -> ParseResult<i64> {
        let node = self.dashboard.locate(&ERROR_STATE_PATH)?;
        Ok(decode_error_state_value(node))
    }

    pub fn load_contactor_cycles(&self) -> ParseResult<i64> {
        self.decode(&LOAD_CONTACTOR_CYCLES_PATH, decode_cycle_count)
    }

    pub fn type2_plug_cycles(&self) -> ParseResult<i64> {
        self.decode(&TYPE2_PLUG_CYCLES_PATH, decode_cycle_count)
    }
}

/// Complete set of readings from one poll cycle, sentinels already applied
#[derive(Debug, Clone, PartialEq)]
pub struct Readings {
    pub env_temperature: f64,
    pub offered_amperage: f64,
    pub charging_amperage: PhaseValues,
    pub error_state: i64,
    pub type2_status: f64,
    pub load_contactor_cycles: i64,
    pub type2_plug_cycles: i64,
    pub ocpp_voltage: PhaseValues,
    pub ocpp_frequency: f64,
    /// Names of readings that fell back to their sentinel this cycle
    pub fallbacks: Vec<&'static str>,
}

impl Readings {
    /// Decode all readings; never fails
    pub fn from_dashboard(dashboard: &Dashboard) -> Self {
        let parser = DashboardParser::new(dashboard);
        let mut fallback = Fallback::new();

        Self {
            env_temperature: fallback.or(
                "env_temperature",
                parser.env_temperature(),
                TEMPERATURE_SENTINEL,
            ),
            offered_amperage: fallback.or(
                "offered_amperage",
                parser.offered_amperage(),
                OFFERED_AMPERAGE_SENTINEL,
            ),
            charging_amperage: fallback.or(
                "charging_amperage",
                parser.charging_amperage(),
                PhaseValues::splat(CHARGING_AMPERAGE_SENTINEL),
            ),
            error_state: fallback.or("error_state", parser.error_state(), ERROR_STATE_SENTINEL),
            type2_status: fallback.or(
                "type2_status",
                parser.type2_status(),
                TYPE2_STATUS_SENTINEL,
            ),
            load_contactor_cycles: fallback.or(
                "load_contactor_cycles",
                parser.load_contactor_cycles(),
                CYCLES_SENTINEL,
            ),
            type2_plug_cycles: fallback.or(
                "type2_plug_cycles",
                parser.type2_plug_cycles(),
                CYCLES_SENTINEL,
            ),
            ocpp_voltage: fallback.or(
                "ocpp_voltage",
                parser.ocpp_voltage(),
                PhaseValues::splat(VOLTAGE_SENTINEL),
            ),
            ocpp_frequency: fallback.or(
                "ocpp_frequency",
                parser.ocpp_frequency(),
                FREQUENCY_SENTINEL,
            ),
            fallbacks: fallback.names,
        }
    }

    /// Every reading decoded from real data
    pub fn is_complete(&self) -> bool {
        self.fallbacks.is_empty()
    }
}

struct Fallback {
    logger: StructuredLogger,
    names: Vec<&'static str>,
}

impl Fallback {
    fn new() -> Self {
        Self {
            logger: get_logger("parser"),
            names: Vec::new(),
        }
    }

    fn or<T: std::fmt::Debug>(&mut self, name: &'static str, result: ParseResult<T>, sentinel: T) -> T {
        match result {
            Ok(value) => {
                self.logger.trace(&format!("{} = {:?}", name, value));
                value
            }
            Err(failure) => {
                self.logger.warn(&format!(
                    "Unable to parse {}: {}; publishing sentinel {:?}",
                    name, failure, sentinel
                ));
                self.names.push(name);
                sentinel
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn temperature_keeps_sign_and_ignores_surrounding_text() {
        assert_eq!(decode_temperature("(+23.5 C) ..."), Some(23.5));
        assert_eq!(decode_temperature("Temp: -4.5 C, fan off"), Some(-4.5));
        assert_eq!(decode_temperature("23.5 C"), None);
        assert_eq!(decode_temperature("(+23.5 F)"), None);
        assert_eq!(decode_temperature("(+23 C)"), None);
    }

    #[test]
    fn amperage_requires_unit_suffix() {
        assert_eq!(decode_amperage("16.0 A"), Some(16.0));
        assert_eq!(decode_amperage("6 A"), Some(6.0));
        assert_eq!(decode_amperage("16.0 V"), None);
        assert_eq!(decode_amperage("16.0 A max"), None);
        assert_eq!(decode_amperage("16.0A"), None);
    }

    #[test]
    fn phase_currents_decode_per_phase() {
        assert_eq!(
            decode_phase_currents("( 5.00 | 4.98 | 5.01 ) [A]"),
            Some(PhaseValues {
                l1: 5.0,
                l2: 4.98,
                l3: 5.01
            })
        );
        assert_eq!(decode_phase_currents("( 5.00 | 4.98 ) [A]"), None);
        assert_eq!(decode_phase_currents("( 5.00 | 4.98 | 5.01 ) [V]"), None);
        assert_eq!(decode_phase_currents("( 5 | 4 | 5 ) [A]"), None);
    }

    #[test]
    fn phase_voltages_are_integers() {
        assert_eq!(
            decode_phase_voltages("( 230 | 231 | 229 ) [V]"),
            Some(PhaseValues {
                l1: 230.0,
                l2: 231.0,
                l3: 229.0
            })
        );
        assert_eq!(decode_phase_voltages("( 230.1 | 231 | 229 ) [V]"), None);
        assert_eq!(decode_phase_voltages("( 230 | 231 | 229 ) [A]"), None);
    }

    #[test]
    fn frequency_is_numeric() {
        assert_eq!(decode_frequency("50.01 Hz"), Some(50.01));
        assert_eq!(decode_frequency("50 Hz"), None);
        assert_eq!(decode_frequency("50.01 kHz"), None);
    }

    #[test]
    fn type2_status_maps_all_states() {
        let expected = [("A", 1.0), ("B", 2.0), ("C", 3.0), ("D", 4.0), ("E", 5.0), ("F", 6.0)];
        for (code, value) in expected {
            assert_eq!(
                decode_type2_status(&format!("({})vehicle", code)),
                Some(value),
                "state {}",
                code
            );
        }
        assert_eq!(decode_type2_status("(C)connected"), Some(3.0));
        assert_eq!(decode_type2_status("(G)unknown"), None);
        assert_eq!(decode_type2_status("(c)lowercase"), None);
        assert_eq!(decode_type2_status("(CC)"), None);
        assert_eq!(decode_type2_status("C"), None);
    }

    #[test]
    fn error_state_is_exact_match() {
        assert_eq!(decode_error_state("No errors"), 0);
        assert_eq!(decode_error_state("no errors"), 1);
        assert_eq!(decode_error_state("No errors "), 1);
        assert_eq!(decode_error_state("F0012 RCD tripped"), 1);
    }

    #[test]
    fn error_state_of_non_string_value_is_an_error() {
        assert_eq!(decode_error_state_value(&json!("No errors")), 0);
        assert_eq!(decode_error_state_value(&json!(["F0012 RCD tripped"])), 1);
        assert_eq!(decode_error_state_value(&json!(null)), 1);
        assert_eq!(decode_error_state_value(&json!({"unexpected": "shape"})), 1);

        let doc = Dashboard::new(json!({"groups": [
            {"key": "system_status", "fields": [
                {"key": "ErrorsList_custom", "value": ["F0012 RCD tripped"]}
            ]}
        ]}));
        assert_eq!(DashboardParser::new(&doc).error_state(), Ok(1));
        assert!(Readings::from_dashboard(&doc).fallbacks.iter().all(|n| *n != "error_state"));
    }

    #[test]
    fn cycle_counts_take_leading_integer() {
        assert_eq!(decode_cycle_count("1234/50000"), Some(1234));
        assert_eq!(decode_cycle_count("0/"), Some(0));
        assert_eq!(decode_cycle_count("1234"), None);
        assert_eq!(decode_cycle_count("x1234/50000"), None);
    }

    #[test]
    fn empty_document_yields_all_sentinels() {
        let readings = Readings::from_dashboard(&Dashboard::new(json!({})));
        assert_eq!(readings.env_temperature, TEMPERATURE_SENTINEL);
        assert_eq!(readings.offered_amperage, OFFERED_AMPERAGE_SENTINEL);
        assert_eq!(
            readings.charging_amperage,
            PhaseValues::splat(CHARGING_AMPERAGE_SENTINEL)
        );
        assert_eq!(readings.ocpp_voltage, PhaseValues::splat(VOLTAGE_SENTINEL));
        assert_eq!(readings.ocpp_frequency, FREQUENCY_SENTINEL);
        assert_eq!(readings.type2_status, TYPE2_STATUS_SENTINEL);
        assert_eq!(readings.error_state, ERROR_STATE_SENTINEL);
        assert_eq!(readings.load_contactor_cycles, CYCLES_SENTINEL);
        assert_eq!(readings.type2_plug_cycles, CYCLES_SENTINEL);
        assert_eq!(readings.fallbacks.len(), 9);
    }

    #[test]
    fn one_bad_field_does_not_affect_others() {
        let doc = Dashboard::new(json!({"groups": [
            {"key": "system_status", "fields": [
                {"key": "SignaledCurrentLimit_vehicleif", "value": "sixteen amps"},
                {"key": "Type2PlugCounterRO_vehicleif", "value": "77/10000"},
                {"key": "ErrorsList_custom"}
            ]}
        ]}));
        let readings = Readings::from_dashboard(&doc);
        assert_eq!(readings.offered_amperage, OFFERED_AMPERAGE_SENTINEL);
        assert_eq!(readings.type2_plug_cycles, 77);
        assert_eq!(readings.error_state, ERROR_STATE_SENTINEL);
        assert!(readings.fallbacks.contains(&"offered_amperage"));
        assert!(!readings.fallbacks.contains(&"type2_plug_cycles"));
    }

    #[test]
    fn parser_reports_failure_kind() {
        let doc = Dashboard::new(json!({"groups": [
            {"key": "system_status", "fields": [
                {"key": "SignaledCurrentLimit_vehicleif", "value": "16.0 V"}
            ]}
        ]}));
        let parser = DashboardParser::new(&doc);
        assert_eq!(
            parser.offered_amperage(),
            Err(ParseFailure::Pattern {
                raw: "16.0 V".to_string()
            })
        );
        assert!(matches!(
            parser.type2_status(),
            Err(ParseFailure::Missing(ExtractError::NotFound { .. }))
        ));
    }
}
