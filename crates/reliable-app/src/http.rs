//! A minimal HTTP/1.0-shaped request/response format — just enough to
//! exercise the transport underneath, not a conforming HTTP stack. No
//! chunked transfer, no persistent connections, no header folding.

use std::collections::HashMap;
use std::fmt;

/// A parsed request line plus headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed request: {}", self.0)
    }
}

impl std::error::Error for ParseError {}

impl Request {
    /// Parse a raw datagram payload into a request. The body is whatever
    /// text follows the first blank line, joined back with `\r\n` — this
    /// mirrors the reference parser rather than trusting `Content-Length`
    /// to delimit the body, since a single datagram already carries the
    /// whole message.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(data)
            .map_err(|e| ParseError(format!("invalid utf-8: {e}")))?;
        let lines: Vec<&str> = text.split("\r\n").collect();

        let request_line = lines
            .first()
            .ok_or_else(|| ParseError("empty request".into()))?;
        let mut parts = request_line.split(' ');
        let method = parts
            .next()
            .ok_or_else(|| ParseError("missing method".into()))?
            .to_string();
        let path = parts
            .next()
            .ok_or_else(|| ParseError("missing path".into()))?
            .to_string();

        let mut headers = HashMap::new();
        let mut body = String::new();
        for (i, line) in lines.iter().enumerate().skip(1) {
            if let Some((key, value)) = line.split_once(": ") {
                headers.insert(key.to_string(), value.to_string());
            } else if line.is_empty() {
                body = lines[i + 1..].join("\r\n");
                break;
            }
        }

        Ok(Request {
            method,
            path,
            headers,
            body,
        })
    }

    /// Render a request for transmission. `Content-Length` is always the
    /// byte length of `body`.
    pub fn encode(method: &str, path: &str, body: &str) -> Vec<u8> {
        format!(
            "{method} {path} HTTP/1.0\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        )
        .into_bytes()
    }
}

/// Render a status line, a fixed pair of headers, and the body.
pub fn render_response(status: &str, body: &str) -> Vec<u8> {
    let lines = [
        format!("HTTP/1.0 {status}"),
        "Content-Type: text/plain".to_string(),
        format!("Content-Length: {}", body.len()),
        String::new(),
        body.to_string(),
    ];
    lines.join("\r\n").into_bytes()
}

/// The application's entire routing table: `GET /` greets, `POST /` echoes
/// the body back, everything else is 404.
pub fn route(request: &Request) -> Vec<u8> {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => render_response("200 OK", "Hello, World!"),
        ("POST", "/") => render_response("200 OK", &format!("Received: {}", request.body)),
        _ => render_response("404 Not Found", "Not Found"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_root() {
        let req = Request::parse(b"GET / HTTP/1.0\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/");
        assert_eq!(req.body, "");
    }

    #[test]
    fn parses_post_with_body() {
        let req =
            Request::parse(b"POST / HTTP/1.0\r\nContent-Length: 12\r\n\r\nHello Server").unwrap();
        assert_eq!(req.method, "POST");
        assert_eq!(req.body, "Hello Server");
        assert_eq!(req.headers.get("Content-Length").map(String::as_str), Some("12"));
    }

    #[test]
    fn routes_get_root_to_hello_world() {
        let req = Request::parse(b"GET / HTTP/1.0\r\nContent-Length: 0\r\n\r\n").unwrap();
        let resp = route(&req);
        assert_eq!(
            resp,
            b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\nHello, World!"
        );
    }

    #[test]
    fn routes_post_root_to_echo() {
        let req =
            Request::parse(b"POST / HTTP/1.0\r\nContent-Length: 12\r\n\r\nHello Server").unwrap();
        let resp = route(&req);
        let text = String::from_utf8(resp).unwrap();
        assert!(text.contains("HTTP/1.0 200 OK"));
        assert!(text.contains("Content-Type: text/plain"));
        assert!(text.contains("Content-Length: 22"));
        assert!(text.contains("Received: Hello Server"));
    }

    #[test]
    fn routes_unknown_path_to_404() {
        let req = Request::parse(b"GET /invalid HTTP/1.0\r\nContent-Length: 0\r\n\r\n").unwrap();
        let resp = route(&req);
        assert_eq!(
            resp,
            b"HTTP/1.0 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\nNot Found"
        );
    }

    #[test]
    fn encode_request_matches_literal_scenario_1() {
        let wire = Request::encode("GET", "/", "");
        assert_eq!(wire, b"GET / HTTP/1.0\r\nContent-Length: 0\r\n\r\n");
    }
}
