//! Prometheus gauges republishing the charger readings
//!
//! Each gauge is an independent atomic; a publish replaces values one at a
//! time, so a scrape racing a publish can mix readings from two cycles.

use crate::error::Result;
use crate::parsers::{Phase, PhaseValues, Readings};
use prometheus::{Encoder, Gauge, GaugeVec, IntGauge, Opts, Registry, TextEncoder};

const PHASE_LABEL: &str = "phase";

/// Gauge set for one charger, owned by its own registry
pub struct ChargerMetrics {
    registry: Registry,
    env_temperature: Gauge,
    offered_amperage: Gauge,
    charging_amperage: GaugeVec,
    error_state: IntGauge,
    type2_status: Gauge,
    load_contactor_cycles: IntGauge,
    type2_plug_cycles: IntGauge,
    ocpp_voltage: GaugeVec,
    ocpp_frequency: Gauge,
}

impl ChargerMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let env_temperature = Gauge::new("env_temperature", "Environment Temperature")?;
        let offered_amperage = Gauge::new(
            "offered_amperage",
            "Offered amperage to the vehicle (as indicated by PWM)",
        )?;
        let charging_amperage = GaugeVec::new(
            Opts::new("charging_amperage", "Amperage of all phases while charging"),
            &[PHASE_LABEL],
        )?;
        let error_state = IntGauge::new(
            "error_state",
            "Whether the charger indicates an error or not",
        )?;
        let type2_status = Gauge::new("type2_status", "Type 2 Connector Status")?;
        let load_contactor_cycles = IntGauge::new(
            "load_contactor_cycles",
            "Number of type 2 load contactor cycles",
        )?;
        let type2_plug_cycles =
            IntGauge::new("type2_plug_cycles", "Number of type 2 plug cycles")?;
        let ocpp_voltage = GaugeVec::new(Opts::new("ocpp_voltage", "OCPP Voltage"), &[PHASE_LABEL])?;
        let ocpp_frequency = Gauge::new("ocpp_frequency", "OCPP Frequency")?;

        registry.register(Box::new(env_temperature.clone()))?;
        registry.register(Box::new(offered_amperage.clone()))?;
        registry.register(Box::new(charging_amperage.clone()))?;
        registry.register(Box::new(error_state.clone()))?;
        registry.register(Box::new(type2_status.clone()))?;
        registry.register(Box::new(load_contactor_cycles.clone()))?;
        registry.register(Box::new(type2_plug_cycles.clone()))?;
        registry.register(Box::new(ocpp_voltage.clone()))?;
        registry.register(Box::new(ocpp_frequency.clone()))?;

        Ok(Self {
            registry,
            env_temperature,
            offered_amperage,
            charging_amperage,
            error_state,
            type2_status,
            load_contactor_cycles,
            type2_plug_cycles,
            ocpp_voltage,
            ocpp_frequency,
        })
    }

    /// Replace every gauge with the values from one cycle
    pub fn publish(&self, readings: &Readings) {
        self.env_temperature.set(readings.env_temperature);
        self.offered_amperage.set(readings.offered_amperage);
        self.type2_status.set(readings.type2_status);
        self.error_state.set(readings.error_state);
        self.load_contactor_cycles
            .set(readings.load_contactor_cycles);
        self.type2_plug_cycles.set(readings.type2_plug_cycles);
        self.ocpp_frequency.set(readings.ocpp_frequency);

        set_phases(&self.charging_amperage, &readings.charging_amperage);
        set_phases(&self.ocpp_voltage, &readings.ocpp_voltage);
    }

    /// Prometheus text exposition of all gauges
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::AmtronError::metrics(e.to_string()))
    }

    /// Read back a published value; `None` until the gauge has a sample
    pub fn sample(&self, name: &str, phase: Option<Phase>) -> Option<f64> {
        let family = self
            .registry
            .gather()
            .into_iter()
            .find(|f| f.get_name() == name)?;

        family
            .get_metric()
            .iter()
            .find(|m| {
                let label = m
                    .get_label()
                    .iter()
                    .find(|l| l.get_name() == PHASE_LABEL)
                    .map(|l| l.get_value().to_string());
                label.as_deref() == phase.map(Phase::as_str)
            })
            .map(|m| m.get_gauge().get_value())
    }
}

fn set_phases(gauge: &GaugeVec, values: &PhaseValues) {
    for phase in Phase::ALL {
        gauge
            .with_label_values(&[phase.as_str()])
            .set(values.get(phase));
    }
}
