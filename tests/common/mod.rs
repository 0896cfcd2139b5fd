#![allow(dead_code)]

use amtron_exporter::error::{AmtronError, Result};
use amtron_exporter::transport::{DASHBOARD_PATH, HttpReply, LOGIN_PATH, Transport};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One request seen by the scripted transport
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub session_id: Option<String>,
    pub body: Option<Value>,
}

/// In-memory charger: replies are queued per endpoint and consumed in order
#[derive(Default)]
pub struct ScriptedTransport {
    tokens: Mutex<VecDeque<Result<HttpReply>>>,
    logins: Mutex<VecDeque<Result<HttpReply>>>,
    dashboards: Mutex<VecDeque<Result<HttpReply>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(self, reply: HttpReply) -> Self {
        self.tokens.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn login(self, reply: HttpReply) -> Self {
        self.logins.lock().unwrap().push_back(Ok(reply));
        self
    }

    pub fn dashboard(self, reply: HttpReply) -> Self {
        self.dashboards.lock().unwrap().push_back(Ok(reply));
        self
    }

    /// Dashboard request that fails before any HTTP status is seen
    pub fn dashboard_failure(self, err: AmtronError) -> Self {
        self.dashboards.lock().unwrap().push_back(Err(err));
        self
    }

    /// Token + accepted login handing out `session_id`
    pub fn accepts_login(self, token: &str, session_id: &str) -> Self {
        self.token(HttpReply::ok(json!({ "token": token })))
            .login(login_reply(true, false, false, session_id))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    fn next(queue: &Mutex<VecDeque<Result<HttpReply>>>, path: &str) -> Result<HttpReply> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AmtronError::network(format!("no scripted reply for {}", path))))
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, path: &str, session_id: Option<&str>) -> Result<HttpReply> {
        self.calls.lock().unwrap().push(Call {
            method: "GET",
            path: path.to_string(),
            session_id: session_id.map(str::to_string),
            body: None,
        });
        match path {
            LOGIN_PATH => Self::next(&self.tokens, path),
            DASHBOARD_PATH => Self::next(&self.dashboards, path),
            _ => Ok(HttpReply::status(404)),
        }
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<HttpReply> {
        self.calls.lock().unwrap().push(Call {
            method: "POST",
            path: path.to_string(),
            session_id: None,
            body: Some(body.clone()),
        });
        match path {
            LOGIN_PATH => Self::next(&self.logins, path),
            _ => Ok(HttpReply::status(404)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://charger.test:80{}", path)
    }
}

pub fn login_reply(
    logged_in: bool,
    change_default_pw: bool,
    set_master_rfid: bool,
    session_id: &str,
) -> HttpReply {
    HttpReply::ok(json!({
        "logged_in": logged_in,
        "change_default_pw": change_default_pw,
        "set_master_rfid": set_master_rfid,
        "session": { "id": session_id }
    }))
}

pub fn expired_dashboard() -> HttpReply {
    HttpReply::ok(json!({ "logged_in": false }))
}

/// Dashboard with all nine readings well-formed
pub fn full_dashboard() -> Value {
    dashboard_with_errors("No errors")
}

pub fn dashboard_with_errors(errors: &str) -> Value {
    json!({
        "groups": [
            {"key": "system_status", "fields": [
                {"key": "SignaledCurrentLimit_vehicleif", "value": "16.0 A"},
                {"key": "OcppMeterCurrent_meter", "value": "( 5.00 | 4.98 | 5.01 ) [A]"},
                {"key": "Type2StateConnector1_vehicleif", "value": "(C)connected"},
                {"key": "ErrorsList_custom", "value": errors},
                {"key": "Type2NumberContactorCyclesRO_vehicleif", "value": "1234/50000"},
                {"key": "Type2PlugCounterRO_vehicleif", "value": "567/10000"}
            ]},
            {"key": "emanager_status", "fields": [
                {"key": "EnergyManagerTable_energyman", "value": {"items": [
                    {"key": "StateMon_energyman", "c1": "State", "c2": "Running (+23.5 C) ok"}
                ]}},
                {"key": "FirstMeterTable_meter", "value": {"items": [
                    {"key": "OcppMeterVoltage_meter", "c2": "( 230 | 231 | 229 ) [V]"},
                    {"key": "OcppMeterFrequency_meter", "c2": "50.01 Hz"}
                ]}}
            ]}
        ]
    })
}
