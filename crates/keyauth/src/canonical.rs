//! Canonical signed context.
//!
//! The signed message is a JSON object holding exactly four string fields in a
//! fixed order:
//!
//! ```text
//! {"api_key":"…","timestamp":"…","request_method":"…","request_uri":"…"}
//! ```
//!
//! The encoding matches the legacy JSON encoder byte for byte so that
//! signatures produced by existing clients keep verifying:
//!
//! - no insignificant whitespace
//! - `/` is escaped as `\/`
//! - non-ASCII characters are written as `\uXXXX` UTF-16 escapes (lowercase hex)
//! - quotes, backslashes and control characters use standard JSON escapes

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

/// The four request attributes covered by a signature.
///
/// Field declaration order is the wire order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureContext {
    /// The presented API key, verbatim.
    pub api_key: String,
    /// The presented timestamp, verbatim.
    pub timestamp: String,
    /// Server-observed HTTP method.
    pub request_method: String,
    /// Server-observed path and query.
    pub request_uri: String,
}

impl SignatureContext {
    /// Create a context from its four fields.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        timestamp: impl Into<String>,
        request_method: impl Into<String>,
        request_uri: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            timestamp: timestamp.into(),
            request_method: request_method.into(),
            request_uri: request_uri.into(),
        }
    }

    /// Build a context from presented credentials and the request as observed
    /// by the server.
    ///
    /// The method and URI always come from `parts`, never from client-supplied
    /// headers.
    #[must_use]
    pub fn from_request(api_key: &str, timestamp: &str, parts: &http::request::Parts) -> Self {
        Self::new(
            api_key,
            timestamp,
            parts.method.as_str(),
            request_uri(&parts.uri),
        )
    }

    /// Serialize the context into its canonical string form.
    ///
    /// # Examples
    ///
    /// ```
    /// use keyauth::canonical::SignatureContext;
    ///
    /// let ctx = SignatureContext::new("JRKAA::ABCDEFGHIJKL", "1610000000", "GET", "/posts?page=2");
    /// assert_eq!(
    ///     ctx.canonical_string(),
    ///     r#"{"api_key":"JRKAA::ABCDEFGHIJKL","timestamp":"1610000000","request_method":"GET","request_uri":"\/posts?page=2"}"#
    /// );
    /// ```
    #[must_use]
    pub fn canonical_string(&self) -> String {
        let mut ser = serde_json::Serializer::with_formatter(Vec::new(), LegacyJsonFormatter);
        self.serialize(&mut ser)
            .expect("serializing four strings into memory cannot fail");
        String::from_utf8(ser.into_inner()).expect("canonical encoding only emits ASCII")
    }
}

/// The path and query of a request URI, as sent on the request line.
#[must_use]
pub fn request_uri(uri: &http::Uri) -> &str {
    uri.path_and_query().map_or("/", http::uri::PathAndQuery::as_str)
}

/// Compact JSON formatter that escapes `/` and every non-ASCII character.
#[derive(Debug, Clone, Copy, Default)]
struct LegacyJsonFormatter;

impl Formatter for LegacyJsonFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        let mut bytes = [0u8; 4];
        for ch in fragment.chars() {
            if ch == '/' {
                writer.write_all(b"\\/")?;
            } else if ch.is_ascii() {
                writer.write_all(ch.encode_utf8(&mut bytes).as_bytes())?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(uri: &str) -> SignatureContext {
        SignatureContext::new("JRKAA::ABCDEFGHIJKL", "1610000000", "GET", uri)
    }

    #[test]
    fn test_should_serialize_fields_in_wire_order() {
        let canonical = ctx("/wp-json/wp/v2/posts").canonical_string();
        assert_eq!(
            canonical,
            r#"{"api_key":"JRKAA::ABCDEFGHIJKL","timestamp":"1610000000","request_method":"GET","request_uri":"\/wp-json\/wp\/v2\/posts"}"#
        );
    }

    #[test]
    fn test_should_escape_non_ascii_as_utf16() {
        assert!(
            ctx("/caf\u{e9}")
                .canonical_string()
                .contains(r#""request_uri":"\/caf\u00e9""#)
        );
        // Characters outside the BMP become a surrogate pair.
        assert!(
            ctx("/\u{1f600}")
                .canonical_string()
                .contains(r#""request_uri":"\/\ud83d\ude00""#)
        );
    }

    #[test]
    fn test_should_escape_quotes_and_backslashes() {
        let canonical = ctx(r#"/a"b\c"#).canonical_string();
        assert!(canonical.contains(r#""request_uri":"\/a\"b\\c""#));
    }

    #[test]
    fn test_should_use_server_observed_method_and_uri() {
        let (parts, ()) = http::Request::builder()
            .method("DELETE")
            .uri("http://example.com/wp-json/wp/v2/posts/7?force=true")
            .body(())
            .unwrap()
            .into_parts();

        let context = SignatureContext::from_request("key", "ts", &parts);
        assert_eq!(context.request_method, "DELETE");
        assert_eq!(context.request_uri, "/wp-json/wp/v2/posts/7?force=true");
    }

    #[test]
    fn test_should_default_request_uri_to_root() {
        // Authority-form targets (CONNECT) carry no path.
        let uri: http::Uri = "example.com:443".parse().unwrap();
        assert_eq!(request_uri(&uri), "/");
    }
}
