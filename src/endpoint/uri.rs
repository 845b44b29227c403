//! Permissive parser for endpoint override URIs.
//!
//! Accepts `scheme://host[:port][/...]`. The scan is a single pass over the
//! bytes of the input. Once the scheme is known, the first `:` inside the host
//! starts the port segment, which runs to the next `/` or the end of input.
//! A port that ran to the end of the string would reject `http://host:9000/`,
//! so a trailing path is allowed after the port.
//!
//! A single `/` after the scheme is accepted; the host then starts at the
//! byte that follows it.
//!
//! IPv6 literals are not special-cased: `https://[::1]:8443/` is split at the
//! first `:` inside the brackets, so the port segment becomes `:1]:8443` and the
//! parse fails.

use super::Endpoint;
use crate::error::EndpointError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Scheme,
    HostStart,
    Host,
    Port,
}

/// Parse an override URI into an [`Endpoint`].
///
/// The endpoint keeps the input verbatim as its `uri`. Without an explicit
/// port the default is 80 for `http` and 443 for anything else. A string with
/// no `/` at all is taken to be a bare host with an empty scheme.
pub fn parse_endpoint_uri(uri: &str) -> Result<Endpoint, EndpointError> {
    let bytes = uri.as_bytes();
    let mut state = ParseState::Scheme;
    let mut scheme = "";
    let mut host_start = 0;
    let mut host_end = bytes.len();
    let mut port_range: Option<(usize, usize)> = None;

    for (i, &b) in bytes.iter().enumerate() {
        match state {
            ParseState::Scheme => {
                if b == b'/' {
                    scheme = uri[..i].trim_end_matches(':');
                    host_start = i + 1;
                    state = ParseState::HostStart;
                }
            }
            ParseState::HostStart | ParseState::Host => {
                if state == ParseState::HostStart {
                    state = ParseState::Host;
                    if b == b'/' {
                        host_start = i + 1;
                        continue;
                    }
                    host_start = i;
                }
                if b == b':' && !scheme.is_empty() {
                    host_end = i;
                    port_range = Some((i + 1, bytes.len()));
                    state = ParseState::Port;
                } else if b == b'/' {
                    host_end = i;
                    break;
                }
            }
            ParseState::Port => {
                if b == b'/' {
                    if let Some((start, _)) = port_range {
                        port_range = Some((start, i));
                    }
                    break;
                }
            }
        }
    }

    let host = if state == ParseState::Scheme {
        uri
    } else {
        &uri[host_start.min(host_end)..host_end]
    };

    let port = match port_range {
        Some((start, end)) => {
            let segment = &uri[start..end];
            segment
                .parse::<u16>()
                .map_err(|_| EndpointError::UriParse {
                    uri: uri.to_string(),
                    port: segment.to_string(),
                })?
        }
        None if scheme == "http" => 80,
        None => 443,
    };

    Ok(Endpoint {
        uri: uri.to_string(),
        host: host.to_string(),
        scheme: scheme.to_string(),
        port,
    })
}
