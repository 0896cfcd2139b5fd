//! Web interface session management
//!
//! The charger uses a challenge login: `GET /json/login` hands out a one-time
//! token, the client answers with `sha256(password || token)` and receives a
//! session id that must accompany every dashboard request. The device ends
//! sessions on its own; that is only visible as `logged_in:false` in a later
//! dashboard response, which the poll loop reports through [`SessionManager::mark_expired`].

use crate::config::DeviceConfig;
use crate::error::{AmtronError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::transport::{LOGIN_PATH, Transport};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Validity of the held session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No login attempted yet
    NeverEstablished,
    /// Token accepted at login and not yet reported expired
    Valid(String),
    /// The device reported the session as logged out
    Expired,
    /// The last login attempt failed; no token held
    Cleared,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: String,
}

/// Body of `POST /json/login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub change_default_pw: bool,
    #[serde(default)]
    pub set_master_rfid: bool,
    #[serde(default)]
    pub session: Option<SessionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub id: String,
}

impl LoginResponse {
    /// Session id if the device is fully usable, otherwise the reason it is not.
    ///
    /// A pending default-password change or master RFID setup blocks scraping
    /// even when `logged_in` is true.
    pub fn into_session_id(self) -> Result<String> {
        if self.change_default_pw || self.set_master_rfid {
            return Err(AmtronError::DeviceNotReady {
                change_default_pw: self.change_default_pw,
                set_master_rfid: self.set_master_rfid,
            });
        }
        if !self.logged_in {
            return Err(AmtronError::AuthRejected);
        }
        match self.session {
            Some(SessionInfo { id }) if !id.is_empty() => Ok(id),
            _ => Err(AmtronError::protocol(
                "login succeeded but no session id was returned",
            )),
        }
    }
}

/// Hex-encoded SHA-256 over the password bytes followed by the token bytes
pub fn password_hash(password: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Owns the single session token used by the poll loop
pub struct SessionManager {
    username: String,
    password: String,
    state: SessionState,
    logins: u64,
    logger: StructuredLogger,
}

impl SessionManager {
    pub fn new(device: &DeviceConfig) -> Self {
        let context =
            LogContext::new("session").with_device(&format!("{}:{}", device.ip, device.port));
        Self {
            username: device.username.clone(),
            password: device.password.clone(),
            state: SessionState::NeverEstablished,
            logins: 0,
            logger: get_logger_with_context(context),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Currently held token, if any
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Valid(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Number of successful logins since start
    pub fn login_count(&self) -> u64 {
        self.logins
    }

    /// Return the held token, logging in first if none is held
    pub async fn ensure_session<T>(&mut self, transport: &T) -> Result<String>
    where
        T: Transport + ?Sized,
    {
        if let Some(id) = self.token() {
            return Ok(id.to_string());
        }
        self.login(transport).await
    }

    /// Perform the challenge login; clears the token on any failure
    pub async fn login<T>(&mut self, transport: &T) -> Result<String>
    where
        T: Transport + ?Sized,
    {
        match self.try_login(transport).await {
            Ok(id) => {
                self.logins += 1;
                self.state = SessionState::Valid(id.clone());
                self.logger.info("Logged in to charger web interface");
                Ok(id)
            }
            Err(e) => {
                self.state = SessionState::Cleared;
                Err(e)
            }
        }
    }

    /// Forget the held token after the device reported it logged out
    pub fn mark_expired(&mut self) {
        if self.token().is_some() {
            self.logger.info("Charger reported session as logged out");
        }
        self.state = SessionState::Expired;
    }

    async fn try_login<T>(&self, transport: &T) -> Result<String>
    where
        T: Transport + ?Sized,
    {
        let reply = transport.get_json(LOGIN_PATH, None).await?;
        if !reply.is_ok() {
            return Err(AmtronError::http_status(
                reply.status,
                transport.url(LOGIN_PATH),
            ));
        }
        let token: TokenResponse = serde_json::from_value(reply.body)
            .map_err(|e| AmtronError::protocol(format!("login token response: {}", e)))?;
        self.logger.debug("Received login token");

        let request = LoginRequest {
            username: &self.username,
            password: password_hash(&self.password, &token.token),
        };
        let reply = transport
            .post_json(LOGIN_PATH, &serde_json::to_value(&request)?)
            .await?;
        if !reply.is_ok() {
            return Err(AmtronError::http_status(
                reply.status,
                transport.url(LOGIN_PATH),
            ));
        }
        let response: LoginResponse = serde_json::from_value(reply.body)
            .map_err(|e| AmtronError::protocol(format!("login response: {}", e)))?;
        response.into_session_id()
    }
}
