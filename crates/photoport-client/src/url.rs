//! Backend endpoint construction.

use reqwest::Url;

/// Path of the endpoint that starts an import.
pub const START_PATH: &str = "start";
/// Path of the endpoint that validates a verification code.
pub const TWO_FACTOR_PATH: &str = "2fa";
/// Path of the endpoint that stops an import.
pub const STOP_PATH: &str = "stop";
/// Path of the endpoint that resumes a stopped import.
pub const RESUME_PATH: &str = "resume";
/// Path prefix of the status endpoint.
pub const STATUS_PATH: &str = "status";
/// Path prefix of the download endpoint.
pub const DOWNLOAD_PATH: &str = "download";

/// Appends path segments to the base URL, percent-encoding each segment.
///
/// Returns `None` if the base URL cannot carry a path (e.g. `mailto:`).
///
/// # Example
///
/// ```
/// use photoport_client::url::endpoint;
/// use reqwest::Url;
///
/// let base = Url::parse("https://backend.example.com/api/").unwrap();
/// let url = endpoint(&base, &["status", "abc 123"]).unwrap();
/// assert_eq!(url.as_str(), "https://backend.example.com/api/status/abc%20123");
/// ```
#[must_use]
pub fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

/// Builds `{base}/status/{session_id}`.
#[must_use]
pub fn status_url(base: &Url, session_id: &str) -> Option<Url> {
    endpoint(base, &[STATUS_PATH, session_id])
}

/// Builds `{base}/download/{session_id}/{token}`.
#[must_use]
pub fn download_url(base: &Url, session_id: &str, token: &str) -> Option<Url> {
    endpoint(base, &[DOWNLOAD_PATH, session_id, token])
}
