use reqwest::header::{CONNECTION, HeaderMap, HeaderValue};
use std::time::Duration;
use url::Url;

/// Outbound client shared by one upstream service.
///
/// With multiplexing disabled every request uses a fresh HTTP/1 connection.
pub fn build_client(
    user_agent: &str,
    proxy: Option<&Url>,
    enable_multiplexing: bool,
    timeout: Duration,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut headers = HeaderMap::new();

    let mut builder = reqwest::Client::builder()
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::limited(5))
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .timeout(timeout);

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
    }

    if enable_multiplexing {
        builder = builder.http2_adaptive_window(true);
    } else {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        builder = builder
            .http1_only()
            .pool_max_idle_per_host(0)
            .pool_idle_timeout(Duration::from_secs(0));
    }

    builder.default_headers(headers).build()
}
