//! Share recipients

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::{Result, SplitShareError};

/// Network address of one share recipient
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    host: String,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from host and port
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the host is empty
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if host.trim().is_empty() {
            return Err(SplitShareError::invalid("Endpoint host must not be empty"));
        }
        Ok(Self { host, port })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolves the endpoint to socket addresses
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the host does not resolve to any address
    pub fn resolve(&self) -> Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| SplitShareError::invalid(format!("Cannot resolve {self}: {e}")))?
            .collect();
        if addrs.is_empty() {
            return Err(SplitShareError::invalid(format!("{self} resolved to no address")));
        }
        Ok(addrs)
    }

    fn same_recipient(&self, other: &Self) -> bool {
        self.port == other.port && self.host.eq_ignore_ascii_case(&other.host)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self {
            host: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = SplitShareError;

    /// Parses `host:port` or `[v6-host]:port`
    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| SplitShareError::invalid(format!("'{s}' is not host:port")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| SplitShareError::invalid(format!("'{port}' is not a valid port")))?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        Self::new(host, port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// The two distinct recipients of a split
///
/// Enforces that share A and share B go to different recipients; sending
/// both shares to one party would hand it the original value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPair {
    a: Endpoint,
    b: Endpoint,
}

impl EndpointPair {
    /// Creates a validated endpoint pair
    ///
    /// # Errors
    /// Returns `InvalidArgument` if both endpoints name the same recipient
    ///
    /// # Examples
    ///
    /// ```rust
    /// use splitshare::domain::{Endpoint, EndpointPair};
    ///
    /// let a: Endpoint = "172.17.0.4:12345".parse().unwrap();
    /// let b: Endpoint = "172.17.0.5:12345".parse().unwrap();
    /// assert!(EndpointPair::new(a.clone(), b).is_ok());
    ///
    /// // The same recipient twice defeats the split
    /// assert!(EndpointPair::new(a.clone(), a).is_err());
    /// ```
    pub fn new(a: Endpoint, b: Endpoint) -> Result<Self> {
        if a.same_recipient(&b) {
            return Err(SplitShareError::invalid(format!(
                "Share A and share B must go to different endpoints (both {a})"
            )));
        }
        Ok(Self { a, b })
    }

    #[must_use]
    pub fn a(&self) -> &Endpoint {
        &self.a
    }

    #[must_use]
    pub fn b(&self) -> &Endpoint {
        &self.b
    }
}
