//! Port publishing specifications.
//!
//! A specification has the form `[ip:][hostPort:]containerPort[/proto]`.
//! Either port may be a `start-end` range, IPv6 host addresses are written in
//! brackets, and the protocol defaults to `tcp`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::net::IpAddr;

use bollard::models::PortBinding;

use crate::error::ReferenceError;

/// Transport protocol of a published port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Protocol {
    /// TCP, the default.
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

impl Protocol {
    fn parse(spec: &str, value: &str) -> Result<Self, ReferenceError> {
        match value.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            "sctp" => Ok(Self::Sctp),
            _ => Err(invalid(spec, format!("unsupported protocol '{value}'"))),
        }
    }

    /// Lowercase protocol name as used in engine port keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Sctp => "sctp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host side of one published port.
///
/// A binding with neither field set publishes the port on an address and
/// port of the engine's choosing.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct HostBinding {
    /// Host address to bind, if restricted.
    pub host_ip: Option<String>,
    /// Host port or `start-end` range, if fixed.
    pub host_port: Option<String>,
}

/// Exposed container ports and their host bindings.
///
/// Ports are keyed as `port/proto`, for example `8080/tcp`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMappings {
    exposed: BTreeSet<String>,
    bindings: BTreeMap<String, Vec<HostBinding>>,
}

impl PortMappings {
    /// Parse a list of port specifications.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceError::InvalidPortSpec` for the first specification
    /// that cannot be parsed.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self, ReferenceError> {
        let mut mappings = Self::default();
        for spec in specs {
            for (key, binding) in parse_spec(spec.as_ref())? {
                mappings.exposed.insert(key.clone());
                mappings.bindings.entry(key).or_default().push(binding);
            }
        }
        Ok(mappings)
    }

    /// Return whether no ports were specified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exposed.is_empty()
    }

    /// Iterate over exposed `port/proto` keys in sorted order.
    pub fn exposed(&self) -> impl Iterator<Item = &str> {
        self.exposed.iter().map(String::as_str)
    }

    /// Return the host bindings for each exposed port.
    #[must_use]
    pub const fn bindings(&self) -> &BTreeMap<String, Vec<HostBinding>> {
        &self.bindings
    }

    /// Convert the bindings into the engine's host-config port map.
    #[must_use]
    pub fn to_port_map(&self) -> HashMap<String, Option<Vec<PortBinding>>> {
        self.bindings
            .iter()
            .map(|(key, bindings)| {
                let engine_bindings = bindings
                    .iter()
                    .map(|binding| PortBinding {
                        host_ip: binding.host_ip.clone(),
                        host_port: binding.host_port.clone(),
                    })
                    .collect();
                (key.clone(), Some(engine_bindings))
            })
            .collect()
    }
}

type PortRange = (u16, u16);

fn parse_spec(spec: &str) -> Result<Vec<(String, HostBinding)>, ReferenceError> {
    let trimmed = spec.trim();
    if trimmed.is_empty() {
        return Err(invalid(spec, "empty port specification"));
    }

    let (addressing, protocol) = match trimmed.rsplit_once('/') {
        Some((rest, proto)) => (rest, Protocol::parse(spec, proto)?),
        None => (trimmed, Protocol::default()),
    };

    let (ip_field, host_field, container_field) = split_fields(spec, addressing)?;
    let host_ip = parse_host_ip(spec, ip_field)?;
    let container = parse_range(spec, container_field, "container")?;
    let host = match host_field {
        Some(value) if !value.is_empty() => Some(parse_range(spec, value, "host")?),
        _ => None,
    };

    expand(spec, protocol, host_ip.as_deref(), container, host)
}

/// Split `[ip:][hostPort:]containerPort` into its three fields.
fn split_fields<'a>(
    spec: &str,
    addressing: &'a str,
) -> Result<(Option<&'a str>, Option<&'a str>, &'a str), ReferenceError> {
    if let Some(bracketed) = addressing.strip_prefix('[') {
        let (ip, rest) = bracketed
            .split_once("]:")
            .ok_or_else(|| invalid(spec, "unterminated IPv6 address"))?;
        let (host, container) = rest
            .split_once(':')
            .ok_or_else(|| invalid(spec, "a host address needs a host port field"))?;
        return Ok((Some(ip), Some(host), container));
    }

    let fields: Vec<&str> = addressing.split(':').collect();
    match fields.as_slice() {
        [container] => Ok((None, None, container)),
        [host, container] => Ok((None, Some(host), container)),
        [ip, host, container] => Ok((Some(ip), Some(host), container)),
        _ => Err(invalid(spec, "too many ':' separators")),
    }
}

fn parse_host_ip(spec: &str, host_ip: Option<&str>) -> Result<Option<String>, ReferenceError> {
    match host_ip {
        None | Some("") => Ok(None),
        Some(ip) => ip
            .parse::<IpAddr>()
            .map(|_| Some(String::from(ip)))
            .map_err(|_| invalid(spec, format!("invalid host address '{ip}'"))),
    }
}

fn parse_range(spec: &str, value: &str, side: &str) -> Result<PortRange, ReferenceError> {
    let (start, end) = match value.split_once('-') {
        Some((low, high)) => (parse_port(spec, low, side)?, parse_port(spec, high, side)?),
        None => {
            let port = parse_port(spec, value, side)?;
            (port, port)
        }
    };

    if start > end {
        return Err(invalid(spec, format!("{side} port range '{value}' is reversed")));
    }
    Ok((start, end))
}

fn parse_port(spec: &str, value: &str, side: &str) -> Result<u16, ReferenceError> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(invalid(spec, format!("invalid {side} port '{value}'"))),
    }
}

fn expand(
    spec: &str,
    protocol: Protocol,
    host_ip: Option<&str>,
    container: PortRange,
    host: Option<PortRange>,
) -> Result<Vec<(String, HostBinding)>, ReferenceError> {
    let key = |port: u16| format!("{port}/{protocol}");
    let binding = |host_port: Option<String>| HostBinding {
        host_ip: host_ip.map(String::from),
        host_port,
    };

    let (container_start, container_end) = container;
    let Some((host_start, host_end)) = host else {
        return Ok((container_start..=container_end)
            .map(|port| (key(port), binding(None)))
            .collect());
    };

    let container_span = container_end - container_start;
    let host_span = host_end - host_start;

    if container_span == host_span {
        return Ok((container_start..=container_end)
            .zip(host_start..=host_end)
            .map(|(port, host_port)| (key(port), binding(Some(host_port.to_string()))))
            .collect());
    }

    if container_span == 0 {
        let range = format!("{host_start}-{host_end}");
        return Ok(vec![(key(container_start), binding(Some(range)))]);
    }

    Err(invalid(
        spec,
        "host and container port ranges must be the same size",
    ))
}

fn invalid(spec: &str, reason: impl Into<String>) -> ReferenceError {
    ReferenceError::InvalidPortSpec {
        spec: String::from(spec),
        reason: reason.into(),
    }
}
