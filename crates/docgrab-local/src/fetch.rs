//! Blocking HTTP transport with bounded retries, and page decoding.
//!
//! One client serves both the catalog page and the file downloads. Retries
//! cover transport failures and the usual rate-limit/server-error statuses;
//! everything else surfaces immediately.

use docgrab_core::{Error, Result};
use encoding_rs::Encoding;
use std::time::Duration;

/// Browser-like UA: some catalog hosts refuse obviously scripted clients.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
    max_retries: u32,
    backoff_base: Duration,
}

impl HttpClient {
    pub fn new(
        verify_tls: bool,
        max_retries: u32,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the backoff base; tests use a few milliseconds.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// GET with retries. Performs at most `1 + max_retries` requests; the
    /// delay doubles per attempt (base, 2x base, 4x base, ...). Returns an
    /// error for any final non-2xx status.
    pub fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "*/*")
                .send();
            let retryable = match &result {
                Ok(resp) => RETRY_STATUSES.contains(&resp.status().as_u16()),
                Err(_) => true,
            };
            if retryable && attempt < self.max_retries {
                attempt += 1;
                let delay = self.backoff_base.saturating_mul(1u32 << (attempt - 1).min(6));
                log::debug!("retrying {url} in {delay:?} (attempt {attempt})");
                std::thread::sleep(delay);
                continue;
            }
            let resp = result.map_err(|e| Error::Fetch(format!("{url}: {e}")))?;
            return resp
                .error_for_status()
                .map_err(|e| Error::Fetch(format!("{url}: {e}")));
        }
    }
}

/// Decode an HTML body into text.
///
/// Catalog hosts routinely serve legacy-encoded pages without a charset
/// declaration, so the header alone is not trusted: a BOM wins, then the
/// `Content-Type` charset parameter, then a `<meta ... charset=...>` sniff
/// over the head of the document, then UTF-8 validation, and finally
/// windows-1251 (the dominant legacy encoding for this tool's catalogs).
pub fn decode_html(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding.decode(bytes).0.into_owned();
    }
    if let Some(encoding) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding.decode(bytes).0.into_owned();
    }
    if let Some(encoding) = sniff_meta_charset(bytes) {
        return encoding.decode(bytes).0.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1251.decode(bytes).0.into_owned(),
    }
}

/// The `charset=` parameter of a Content-Type value, if present.
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })
}

/// Look for `charset=<label>` in the first 1024 bytes, which covers both
/// `<meta charset="...">` and the older `http-equiv` form.
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let lower: Vec<u8> = head.iter().map(u8::to_ascii_lowercase).collect();
    let at = lower.windows(8).position(|w| w == b"charset=")? + 8;
    let rest = &head[at..];
    let rest = rest.strip_prefix(b"\"").or_else(|| rest.strip_prefix(b"'")).unwrap_or(rest);
    let end = rest
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'-' || *b == b'_'))
        .unwrap_or(rest.len());
    Encoding::for_label(&rest[..end])
}
