//! Builder for [`SocketHandler`](crate::socket_handler::SocketHandler).
//!
//! Collects the address, channel and credential plus optional timeout and
//! TLS tuning, validates them, and opens the connection. The same settings
//! can be read from a section of an INI file.

use std::{path::Path, time::Duration};

use ini::{Ini, Properties};

use crate::socket_handler::{
    DEFAULT_PATH, Endpoint, HandshakePolicy, SocketHandler, SocketHandlerConfig,
    SocketHandlerError, TlsOptions,
};

/// Section read by [`SocketHandlerBuilder::from_ini_file`] when none is given.
pub const DEFAULT_INI_SECTION: &str = "socket_handler";

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(SocketHandlerError::Configuration(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`SocketHandler`] instances.
#[derive(Clone, Debug, Default)]
pub struct SocketHandlerBuilder {
    address: String,
    channel: i64,
    token: String,
    path: Option<String>,
    secure: Option<bool>,
    poll_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    handshake_attempts: Option<u32>,
    handshake_poll_ms: Option<u64>,
    tls_domain: Option<String>,
    insecure_skip_verify: bool,
}

impl SocketHandlerBuilder {
    /// Start a builder shipping to `channel` at `address` with `token`.
    pub fn new(address: impl Into<String>, channel: i64, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            channel,
            token: token.into(),
            ..Self::default()
        }
    }

    option_setter!(
        /// Override the request path the channel id is appended to.
        with_path,
        path,
        String
    );
    option_setter!(
        /// Force TLS on or off regardless of the address scheme.
        with_secure,
        secure,
        bool
    );
    option_setter!(
        /// Readiness poll timeout in milliseconds.
        with_poll_timeout_ms,
        poll_timeout_ms,
        u64
    );
    option_setter!(
        /// TCP connect timeout in milliseconds.
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        /// Maximum number of TLS handshake attempts.
        with_handshake_attempts,
        handshake_attempts,
        u32
    );
    option_setter!(
        /// Readiness wait between handshake attempts in milliseconds.
        with_handshake_poll_ms,
        handshake_poll_ms,
        u64
    );
    option_setter!(
        /// Domain presented during the TLS handshake.
        with_tls_domain,
        tls_domain,
        String
    );

    /// Skip TLS certificate and hostname validation.
    pub fn with_insecure_skip_verify(mut self, insecure: bool) -> Self {
        self.insecure_skip_verify = insecure;
        self
    }

    /// Validate the settings and produce a runtime configuration.
    pub fn build_config(&self) -> Result<SocketHandlerConfig, SocketHandlerError> {
        let endpoint = Endpoint::parse(
            &self.address,
            self.channel,
            &self.token,
            self.path.as_deref().unwrap_or(DEFAULT_PATH),
            self.secure,
        )?;
        let mut config = SocketHandlerConfig::new(endpoint);
        if let Some(ms) = self.poll_timeout_ms {
            config.poll_timeout = Duration::from_millis(ensure_positive!(ms, "poll_timeout_ms")?);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout =
                Duration::from_millis(ensure_positive!(ms, "connect_timeout_ms")?);
        }
        if let Some(attempts) = self.handshake_attempts {
            config.handshake = HandshakePolicy {
                max_attempts: ensure_positive!(attempts, "handshake_attempts")?,
                ..config.handshake
            };
        }
        if let Some(ms) = self.handshake_poll_ms {
            config.handshake.poll_interval =
                Duration::from_millis(ensure_positive!(ms, "handshake_poll_ms")?);
        }
        config.tls = TlsOptions {
            domain: self.tls_domain.clone(),
            insecure_skip_verify: self.insecure_skip_verify,
        };
        Ok(config)
    }

    /// Validate the settings and connect.
    pub fn build(&self) -> Result<SocketHandler, SocketHandlerError> {
        SocketHandler::connect(self.build_config()?)
    }

    /// Read builder settings from `section` of an INI file.
    pub fn from_ini_file(
        path: impl AsRef<Path>,
        section: Option<&str>,
    ) -> Result<Self, SocketHandlerError> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|err| {
            SocketHandlerError::Configuration(format!("{} is invalid: {err}", path.display()))
        })?;
        Self::from_ini(&ini, section.unwrap_or(DEFAULT_INI_SECTION))
    }

    /// Read builder settings from `section` of INI text.
    pub fn from_ini_str(text: &str, section: Option<&str>) -> Result<Self, SocketHandlerError> {
        let ini = Ini::load_from_str(text)
            .map_err(|err| SocketHandlerError::Configuration(format!("invalid INI: {err}")))?;
        Self::from_ini(&ini, section.unwrap_or(DEFAULT_INI_SECTION))
    }

    fn from_ini(ini: &Ini, section: &str) -> Result<Self, SocketHandlerError> {
        let props = ini.section(Some(section)).ok_or_else(|| {
            SocketHandlerError::Configuration(format!("missing section [{section}]"))
        })?;
        let mut builder = Self::new(
            required(props, section, "address")?,
            parse_value(props, "channel")?.ok_or_else(|| missing(section, "channel"))?,
            required(props, section, "token")?,
        );
        builder.path = props.get("path").map(str::to_owned);
        builder.secure = parse_flag(props, "secure")?;
        builder.poll_timeout_ms = parse_value(props, "poll_timeout_ms")?;
        builder.connect_timeout_ms = parse_value(props, "connect_timeout_ms")?;
        builder.handshake_attempts = parse_value(props, "handshake_attempts")?;
        builder.handshake_poll_ms = parse_value(props, "handshake_poll_ms")?;
        builder.tls_domain = props.get("tls_domain").map(str::to_owned);
        builder.insecure_skip_verify = parse_flag(props, "insecure_skip_verify")?.unwrap_or(false);
        Ok(builder)
    }
}

fn missing(section: &str, key: &str) -> SocketHandlerError {
    SocketHandlerError::Configuration(format!("[{section}] is missing `{key}`"))
}

fn required(props: &Properties, section: &str, key: &str) -> Result<String, SocketHandlerError> {
    props
        .get(key)
        .map(str::to_owned)
        .ok_or_else(|| missing(section, key))
}

fn parse_value<T: std::str::FromStr>(
    props: &Properties,
    key: &str,
) -> Result<Option<T>, SocketHandlerError> {
    props
        .get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                SocketHandlerError::Configuration(format!("`{key}` has invalid value `{raw}`"))
            })
        })
        .transpose()
}

fn parse_flag(props: &Properties, key: &str) -> Result<Option<bool>, SocketHandlerError> {
    props
        .get(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(SocketHandlerError::Configuration(format!(
                "`{key}` has invalid value `{raw}`"
            ))),
        })
        .transpose()
}
