use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use url::Url;

/// Main configuration for a Quayside deployment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Gateway settings carry a shared secret, so they never round-trip
    /// through serialized config files. Populate via the builder or env.
    #[serde(skip)]
    pub vnpay: VnpayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

/// Settings for the VNPay redirect gateway.
///
/// The shared secret signs every outbound redirect and verifies every
/// inbound callback; it is stored as a [`SecretString`] so it cannot leak
/// through debug output or logs.
#[derive(Debug, Clone)]
pub struct VnpayConfig {
    /// Merchant code issued by the gateway (`vnp_TmnCode`).
    pub tmn_code: String,
    /// Shared HMAC secret issued by the gateway.
    pub secret: SecretString,
    /// Gateway payment page the customer is redirected to.
    pub pay_url: String,
    /// Callback URL registered with the gateway (`vnp_ReturnUrl`).
    pub return_url: String,
    /// Page the end user lands on after a successful settlement.
    pub success_redirect: String,
    /// Page the end user lands on after a failed settlement.
    pub failure_redirect: String,
    /// Locale passed to the payment page.
    pub locale: String,
    /// ISO currency code for amounts.
    pub currency: String,
    /// Minutes until an issued payment link expires.
    pub expire_minutes: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            vnpay: VnpayConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

impl Default for VnpayConfig {
    fn default() -> Self {
        Self {
            tmn_code: String::new(),
            secret: SecretString::from(String::new()),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
            return_url: "http://localhost:8000/payments/vnpay/return".to_string(),
            success_redirect: "http://localhost:8000/payments/result/success".to_string(),
            failure_redirect: "http://localhost:8000/payments/result/failure".to_string(),
            locale: "vn".to_string(),
            currency: "VND".to_string(),
            expire_minutes: 15,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Read an environment variable with the QUAYSIDE_ prefix.
fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("QUAYSIDE_{name}")).ok()
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_vnpay(mut self, vnpay: VnpayConfig) -> Self {
        self.config.vnpay = vnpay;
        self
    }

    pub fn with_merchant(
        mut self,
        tmn_code: impl Into<String>,
        secret: impl Into<SecretString>,
    ) -> Self {
        self.config.vnpay.tmn_code = tmn_code.into();
        self.config.vnpay.secret = secret.into();
        self
    }

    /// Load configuration from environment variables with QUAYSIDE_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(host) = env_var("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = env_var("PORT") {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(level) = env_var("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        if let Some(tmn_code) = env_var("VNPAY_TMN_CODE") {
            self.config.vnpay.tmn_code = tmn_code;
        }
        if let Some(secret) = env_var("VNPAY_SECRET") {
            self.config.vnpay.secret = secret.into();
        }
        if let Some(pay_url) = env_var("VNPAY_PAY_URL") {
            self.config.vnpay.pay_url = pay_url;
        }
        if let Some(return_url) = env_var("VNPAY_RETURN_URL") {
            self.config.vnpay.return_url = return_url;
        }
        if let Some(url) = env_var("VNPAY_SUCCESS_REDIRECT") {
            self.config.vnpay.success_redirect = url;
        }
        if let Some(url) = env_var("VNPAY_FAILURE_REDIRECT") {
            self.config.vnpay.failure_redirect = url;
        }
        if let Some(locale) = env_var("VNPAY_LOCALE") {
            self.config.vnpay.locale = locale;
        }
        if let Some(currency) = env_var("VNPAY_CURRENCY") {
            self.config.vnpay.currency = currency;
        }
        if let Some(minutes) = env_var("VNPAY_EXPIRE_MINUTES") {
            if let Ok(m) = minutes.parse() {
                self.config.vnpay.expire_minutes = m;
            }
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration is invalid:
    /// - Invalid server address (host:port)
    /// - Invalid log level
    /// - Malformed gateway URLs or a non-positive link expiry
    pub fn build(self) -> crate::error::Result<Config> {
        self.config.server.addr().map_err(|e| {
            crate::error::QuaysideError::bad_request(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(crate::error::QuaysideError::bad_request(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        for (name, value) in [
            ("pay_url", &self.config.vnpay.pay_url),
            ("return_url", &self.config.vnpay.return_url),
            ("success_redirect", &self.config.vnpay.success_redirect),
            ("failure_redirect", &self.config.vnpay.failure_redirect),
        ] {
            Url::parse(value).map_err(|e| {
                crate::error::QuaysideError::bad_request(format!(
                    "Invalid gateway {} '{}': {}",
                    name, value, e
                ))
            })?;
        }

        if self.config.vnpay.expire_minutes <= 0 {
            return Err(crate::error::QuaysideError::bad_request(
                "Payment link expiry must be greater than 0 minutes",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
