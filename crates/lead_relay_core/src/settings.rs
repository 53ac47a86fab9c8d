use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const IMPLICIT_TLS_PORT: u16 = 465;

pub const SMTP_HOST: &str = "SMTP_HOST";
pub const SMTP_PORT: &str = "SMTP_PORT";
pub const SMTP_USER: &str = "SMTP_USER";
pub const SMTP_PASS: &str = "SMTP_PASS";
pub const SMTP_FROM: &str = "SMTP_FROM";
pub const SMTP_TO: &str = "SMTP_TO";
pub const ADMIN_EMAIL: &str = "ADMIN_EMAIL";
pub const SMTP_SECURE: &str = "SMTP_SECURE";

/// Raw SMTP settings as found in the deployment environment. Any value may be missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub admin_email: Option<String>,
    pub secure: Option<String>,
}

impl SmtpSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| non_blank(lookup(key));
        Self {
            host: read(SMTP_HOST),
            port: read(SMTP_PORT),
            user: read(SMTP_USER),
            pass: read(SMTP_PASS),
            from: read(SMTP_FROM),
            to: read(SMTP_TO),
            admin_email: read(ADMIN_EMAIL),
            secure: read(SMTP_SECURE),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn resolve(&self) -> Result<SmtpConfig, ConfigError> {
        let port = match self.port.as_deref() {
            None => Some(DEFAULT_SMTP_PORT),
            Some(raw) => raw.trim().parse::<u16>().ok(),
        };
        let host = non_blank(self.host.clone());
        let user = non_blank(self.user.clone());
        let pass = non_blank(self.pass.clone());
        let from = non_blank(self.from.clone()).or_else(|| user.clone());
        let to = non_blank(self.to.clone())
            .or_else(|| non_blank(self.admin_email.clone()))
            .or_else(|| user.clone());

        match (host, port, user, pass, from, to) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from), Some(to)) => {
                let secure = self.secure.as_deref() == Some("true") || port == IMPLICIT_TLS_PORT;
                Ok(SmtpConfig {
                    host,
                    port,
                    user,
                    pass,
                    from,
                    to,
                    secure,
                })
            }
            (host, port, user, pass, from, to) => {
                let mut missing = Vec::new();
                if host.is_none() {
                    missing.push(SMTP_HOST);
                }
                if port.is_none() {
                    missing.push(SMTP_PORT);
                }
                if user.is_none() {
                    missing.push(SMTP_USER);
                }
                if pass.is_none() {
                    missing.push(SMTP_PASS);
                }
                if from.is_none() {
                    missing.push(SMTP_FROM);
                }
                if to.is_none() {
                    missing.push(SMTP_TO);
                }
                Err(ConfigError::new(missing))
            }
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("admin_email", &self.admin_email)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Fully resolved SMTP configuration. Immutable for the lifetime of a deployment.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
    pub secure: bool,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("secure", &self.secure)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
