//! Canonical request construction for SigV4.

use crate::types::Header;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;

/// Unreserved characters per RFC 3986 stay unencoded.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Headers that never take part in the signature.
const UNSIGNED_HEADERS: &[&str] = &[
    "authorization",
    "connection",
    "expect",
    "transfer-encoding",
    "user-agent",
    "x-amzn-trace-id",
];

/// URI-encode a value with the SigV4 unreserved set.
pub fn uri_encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// True if the header is part of the canonical request.
pub fn is_signable_header(name: &str) -> bool {
    !UNSIGNED_HEADERS
        .iter()
        .any(|skipped| name.eq_ignore_ascii_case(skipped))
}

/// Remove `.` and `..` segments and collapse empty segments.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut normalized = format!("/{}", segments.join("/"));
    if path.ends_with('/') && normalized.len() > 1 {
        normalized.push('/');
    }
    normalized
}

/// Build the canonical URI.
///
/// The request path is expected to be encoded once already. With
/// `double_encode` every segment is encoded a second time.
pub fn canonical_uri(path: &str, normalize: bool, double_encode: bool) -> String {
    let path = if path.is_empty() { "/" } else { path };
    let path = if normalize {
        normalize_path(path)
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    if double_encode {
        path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
    } else {
        path
    }
}

/// Split a query string into decoded key/value pairs.
///
/// A leading `?` is ignored.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Build the canonical query string: encoded pairs sorted by key then value.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercased, whitespace-folded signable headers, keyed and sorted by name.
///
/// Repeated headers are joined with commas in their original order.
pub fn canonical_header_map(headers: &[Header]) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for header in headers.iter().filter(|h| is_signable_header(&h.name)) {
        let value = header.value.split_whitespace().collect::<Vec<_>>().join(" ");
        map.entry(header.name.to_lowercase()).or_default().push(value);
    }
    map
}

/// The `;`-separated list of signed header names.
pub fn signed_headers(map: &BTreeMap<String, Vec<String>>) -> String {
    map.keys().cloned().collect::<Vec<_>>().join(";")
}

/// Assemble the canonical request.
///
/// ```text
/// Method\nCanonicalURI\nCanonicalQuery\nCanonicalHeaders\nSignedHeaders\nPayloadHash
/// ```
pub fn canonical_request(
    method: &str,
    uri: &str,
    query: &str,
    headers: &BTreeMap<String, Vec<String>>,
    payload_hash: &str,
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect();

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        uri,
        query,
        canonical_headers,
        signed_headers(headers),
        payload_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("foo"), "foo");
        assert_eq!(uri_encode("foo bar"), "foo%20bar");
        assert_eq!(uri_encode("a=b/c"), "a%3Db%2Fc");
        assert_eq!(uri_encode("-_.~"), "-_.~");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
        assert_eq!(normalize_path("//a//b/"), "/a/b/");
        assert_eq!(normalize_path("/.."), "/");
    }

    #[test]
    fn test_canonical_uri() {
        assert_eq!(canonical_uri("", true, false), "/");
        assert_eq!(canonical_uri("/foo/bar", true, false), "/foo/bar");
        assert_eq!(canonical_uri("foo/./bar", false, false), "/foo/./bar");
        assert_eq!(canonical_uri("/a%20b", true, true), "/a%2520b");
        assert_eq!(canonical_uri("/a%20b", true, false), "/a%20b");
    }

    #[test]
    fn test_canonical_query() {
        assert_eq!(canonical_query(&parse_query("")), "");
        assert_eq!(canonical_query(&parse_query("?b=2&a=1")), "a=1&b=2");
        assert_eq!(canonical_query(&parse_query("a=2&a=1")), "a=1&a=2");
        assert_eq!(canonical_query(&parse_query("?key=a%20b&flag")), "flag=&key=a%20b");
    }

    #[test]
    fn test_canonical_headers_skip_user_agent() {
        let headers = vec![
            Header::new("Host", "example.amazonaws.com"),
            Header::new("User-Agent", "aws-http/0.1.0"),
            Header::new("X-Amz-Date", "20150830T123600Z"),
            Header::new("X-Custom", "  a   b  "),
            Header::new("x-custom", "c"),
        ];

        let map = canonical_header_map(&headers);
        assert_eq!(signed_headers(&map), "host;x-amz-date;x-custom");
        assert_eq!(map["x-custom"], vec!["a b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_canonical_request_layout() {
        let headers = vec![
            Header::new("Host", "example.amazonaws.com"),
            Header::new("X-Amz-Date", "20150830T123600Z"),
        ];
        let map = canonical_header_map(&headers);
        let request = canonical_request(
            "get",
            "/",
            "Param1=value1&Param2=value2",
            &map,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        );

        assert_eq!(
            request,
            "GET\n/\nParam1=value1&Param2=value2\nhost:example.amazonaws.com\nx-amz-date:20150830T123600Z\n\nhost;x-amz-date\ne3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
