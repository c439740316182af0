use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("Lambda-Loader/", env!("CARGO_PKG_VERSION"));

/// Shared client for metadata, jar and checksum requests.
///
/// `timeout` bounds both connecting and the whole request.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
}
