//! Validation of provisioning form parameters.
//!
//! Two shapes are accepted: an email plus an OAuth `authorization_code`, or
//! an email plus IMAP/SMTP host and credentials.

use crate::error::{ProvisioningError, ProvisioningResult};
use crate::provider::{Credentials, ImapSmtpSettings};
use std::collections::HashMap;

/// Longest accepted email address.
pub const MAX_EMAIL_LEN: usize = 254;

const DEFAULT_IMAP_PORT: u16 = 993;
const DEFAULT_SMTP_PORT: u16 = 587;

/// Who is being provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email_address: String,
}

impl Identity {
    pub fn new(email_address: &str) -> ProvisioningResult<Self> {
        let email_address = email_address.trim();
        if email_address.is_empty() {
            return Err(ProvisioningError::Validation(
                "Missing required parameter 'email'".to_string(),
            ));
        }
        if email_address.len() > MAX_EMAIL_LEN {
            return Err(ProvisioningError::Validation(format!(
                "Email address longer than {} characters",
                MAX_EMAIL_LEN
            )));
        }
        match email_address.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(Self {
                email_address: email_address.to_string(),
            }),
            _ => Err(ProvisioningError::Validation(format!(
                "Invalid email address '{}'",
                email_address
            ))),
        }
    }
}

/// A validated provisioning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub identity: Identity,
    pub credentials: Credentials,
}

impl ProvisionRequest {
    /// Parse form or query parameters.
    pub fn from_params(params: &HashMap<String, String>) -> ProvisioningResult<Self> {
        let identity = Identity::new(params.get("email").map(String::as_str).unwrap_or(""))?;

        let credentials = if let Some(code) = non_empty(params, "authorization_code") {
            Credentials::OAuthCode {
                code: code.to_string(),
            }
        } else if non_empty(params, "imap_host").is_some() {
            Credentials::Password(imap_settings(params)?)
        } else {
            return Err(ProvisioningError::Validation(
                "Provide either authorization_code or imap_host".to_string(),
            ));
        };

        Ok(Self {
            identity,
            credentials,
        })
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required(params: &HashMap<String, String>, key: &str) -> ProvisioningResult<String> {
    non_empty(params, key)
        .map(str::to_string)
        .ok_or_else(|| ProvisioningError::Validation(format!("Missing required parameter '{}'", key)))
}

fn port(params: &HashMap<String, String>, key: &str, default: u16) -> ProvisioningResult<u16> {
    match non_empty(params, key) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(ProvisioningError::Validation(format!(
                "Invalid {} '{}'",
                key, raw
            ))),
        },
    }
}

fn imap_settings(params: &HashMap<String, String>) -> ProvisioningResult<ImapSmtpSettings> {
    let imap_username = required(params, "imap_username")?;
    let imap_password = required(params, "imap_password")?;

    // SMTP credentials default to the IMAP ones.
    let smtp_username = non_empty(params, "smtp_username")
        .map(str::to_string)
        .unwrap_or_else(|| imap_username.clone());
    let smtp_password = non_empty(params, "smtp_password")
        .map(str::to_string)
        .unwrap_or_else(|| imap_password.clone());

    let ssl_required = match non_empty(params, "ssl_required") {
        None => true,
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                return Err(ProvisioningError::Validation(format!(
                    "Invalid ssl_required '{}'",
                    raw
                )))
            }
        },
    };

    Ok(ImapSmtpSettings {
        imap_host: required(params, "imap_host")?,
        imap_port: port(params, "imap_port", DEFAULT_IMAP_PORT)?,
        imap_username,
        imap_password,
        smtp_host: required(params, "smtp_host")?,
        smtp_port: port(params, "smtp_port", DEFAULT_SMTP_PORT)?,
        smtp_username,
        smtp_password,
        ssl_required,
    })
}
