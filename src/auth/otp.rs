//! One-time-code login: pick a role, mail a 6-digit code, check it.

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::core::constants::login::{OTP_DIGITS, OTP_MAX, OTP_MIN};
use crate::error::{LockError, LockResult};
use crate::session::Session;

/// Six decimal digits, never starting with zero.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn generate() -> Self {
        let n = rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX);
        Self(n.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Input shorter than a full code never matches.
    pub fn matches(&self, input: &str) -> bool {
        let input = input.trim();
        input.len() >= OTP_DIGITS && input == self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

#[cfg(test)]
impl From<&str> for OtpCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Delivers codes. The SMTP transport lives outside this crate.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp(&self, email: &str, code: &OtpCode) -> LockResult<()>;
}

/// Writes the code to the log instead of sending mail. For local use.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, email: &str, code: &OtpCode) -> LockResult<()> {
        info!(email, code = code.as_str(), "OTP issued");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Proprietor,
    /// Identified by the signatory's email.
    Signatory(String),
}

impl Role {
    /// `"proprietor"`, anything else is taken as a signatory email.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            v if v.eq_ignore_ascii_case("proprietor") => Role::Proprietor,
            v => Role::Signatory(v.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginStep {
    Email,
    AwaitingOtp { email: String },
}

/// Two-step login. Holds at most one outstanding code.
#[derive(Debug, Clone)]
pub struct LoginFlow {
    proprietor_email: String,
    signatories: Vec<Signatory>,
    pending: Option<(String, OtpCode)>,
}

impl LoginFlow {
    pub fn new(proprietor_email: impl Into<String>) -> Self {
        Self { proprietor_email: proprietor_email.into(), signatories: Vec::new(), pending: None }
    }

    pub fn with_signatories(mut self, signatories: Vec<Signatory>) -> Self {
        self.signatories = signatories;
        self
    }

    pub fn signatories(&self) -> &[Signatory] {
        &self.signatories
    }

    pub fn step(&self) -> LoginStep {
        match &self.pending {
            Some((email, _)) => LoginStep::AwaitingOtp { email: email.clone() },
            None => LoginStep::Email,
        }
    }

    /// Email prefilled for `role`: the proprietor's, or the registered
    /// signatory's.
    pub fn resolve_email(&self, role: &Role) -> LockResult<String> {
        match role {
            Role::Proprietor => Ok(self.proprietor_email.clone()),
            Role::Signatory(email) => self
                .signatories
                .iter()
                .find(|s| s.email.eq_ignore_ascii_case(email))
                .map(|s| s.email.clone())
                .ok_or_else(|| LockError::UnknownSignatory(email.clone())),
        }
    }

    /// Validate `email` for `role`, then generate and mail a code. The
    /// proprietor role only accepts the proprietor's email. On any failure
    /// the flow stays on the email step.
    pub async fn request_otp(&mut self, role: &Role, email: &str, mailer: &dyn Mailer) -> LockResult<String> {
        self.pending = None;
        let email = email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(LockError::InvalidEmail(email));
        }
        match role {
            Role::Proprietor if !email.eq_ignore_ascii_case(&self.proprietor_email) => {
                return Err(LockError::ProprietorEmailMismatch { expected: self.proprietor_email.clone() });
            }
            Role::Proprietor => {}
            Role::Signatory(_) => {
                self.resolve_email(role)?;
            }
        }

        let code = OtpCode::generate();
        if let Err(e) = mailer.send_otp(&email, &code).await {
            warn!(email = %email, error = %e, "OTP delivery failed");
            return Err(e);
        }
        info!(email = %email, "OTP sent");
        self.pending = Some((email.clone(), code));
        Ok(email)
    }

    /// Check `input`. A match records the login on `session` and returns the
    /// flow to the email step; a miss keeps the code outstanding.
    pub fn verify(&mut self, input: &str, today: NaiveDate, session: &mut Session) -> LockResult<bool> {
        let (email, code) = self.pending.as_ref().ok_or(LockError::NoPendingOtp)?;
        if !code.matches(input) {
            warn!(email = %email, "incorrect OTP");
            return Ok(false);
        }
        session.record_login(email.clone(), today);
        self.pending = None;
        Ok(true)
    }

    /// Abandon the outstanding code.
    pub fn back(&mut self) {
        self.pending = None;
    }
}

/// `local@label.label[...]`, no whitespace, no empty domain labels.
static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").ok());

fn is_valid_email(email: &str) -> bool {
    EMAIL.as_ref().is_some_and(|re| re.is_match(email))
}
