//! Connection target and HTTP request framing.

use super::error::SocketHandlerError;

/// Default request path the channel id is appended to.
pub const DEFAULT_PATH: &str = "/channel";

const USER_AGENT: &str = concat!("logjar/", env!("CARGO_PKG_VERSION"));

/// Immutable description of where and how records are shipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    secure: bool,
    token: String,
    path: String,
    channel: i64,
}

impl Endpoint {
    /// Build an endpoint from explicit parts.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        secure: bool,
        token: impl Into<String>,
        path: impl Into<String>,
        channel: i64,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
            token: token.into(),
            path: path.into(),
            channel,
        }
    }

    /// Parse `scheme://host[:port]` into an endpoint.
    ///
    /// `https` selects port 443 and TLS, `http` or no scheme selects port 80
    /// without TLS. `secure` overrides the TLS flag but never the port. Any
    /// path component of `address` is ignored in favour of `path`. Control
    /// characters in the host, token or path are rejected since all three
    /// are written verbatim into the request head.
    pub fn parse(
        address: &str,
        channel: i64,
        token: &str,
        path: &str,
        secure: Option<bool>,
    ) -> Result<Self, SocketHandlerError> {
        let address = address.trim();
        let (scheme, rest) = match address.split_once("://") {
            Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
            None => (String::from("http"), address),
        };
        let scheme_secure = match scheme.as_str() {
            "https" => true,
            "http" => false,
            other => {
                return Err(SocketHandlerError::config(format!(
                    "unsupported scheme `{other}` in address `{address}`"
                )));
            }
        };
        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let (host, port) = split_authority(authority)?;
        if host.is_empty() {
            return Err(SocketHandlerError::config(format!(
                "address `{address}` has no host"
            )));
        }
        reject_control_chars("host", &host)?;
        reject_control_chars("token", token)?;
        reject_control_chars("path", path)?;
        let port = port.unwrap_or(if scheme_secure { 443 } else { 80 });
        Ok(Self::new(
            host,
            port,
            secure.unwrap_or(scheme_secure),
            token,
            path,
            channel,
        ))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn channel(&self) -> i64 {
        self.channel
    }

    /// Request target: the path without trailing slashes, then the channel.
    pub fn request_target(&self) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), self.channel)
    }

    /// Value of the `Host` header.
    fn host_header(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }

    /// Render the request head for a body of `content_length` bytes.
    pub fn request_headers(&self, content_length: usize) -> String {
        format!(
            "POST {target} HTTP/1.1\r\n\
             Host: {host}\r\n\
             User-Agent: {USER_AGENT}\r\n\
             Authorization: Bearer {token}\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: {content_length}\r\n\
             Connection: close\r\n\
             \r\n",
            target = self.request_target(),
            host = self.host_header(),
            token = self.token,
        )
    }
}

fn reject_control_chars(field: &str, value: &str) -> Result<(), SocketHandlerError> {
    match value.chars().find(|c| c.is_control()) {
        Some(c) => Err(SocketHandlerError::config(format!(
            "{field} contains control character {c:?}"
        ))),
        None => Ok(()),
    }
}

fn split_authority(authority: &str) -> Result<(String, Option<u16>), SocketHandlerError> {
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    let (host, port) = if let Some(rest) = authority.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(|| {
            SocketHandlerError::config(format!("unterminated IPv6 literal in `{authority}`"))
        })?;
        let port = match after {
            "" => None,
            other => Some(other.strip_prefix(':').ok_or_else(|| {
                SocketHandlerError::config(format!("unexpected `{other}` after IPv6 literal"))
            })?),
        };
        (host, port)
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };
    let port = port
        .map(|raw| {
            raw.parse::<u16>()
                .map_err(|_| SocketHandlerError::config(format!("invalid port `{raw}`")))
        })
        .transpose()?;
    Ok((host.to_owned(), port))
}
