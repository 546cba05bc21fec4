use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const QUOTA_REMAINING_HEADER: &str = "x-ratelimit-requests-remaining";

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// What the fetcher needs back from one GET.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
    pub quota_remaining: Option<u64>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking GET seam between the fetcher and the network.
pub trait Transport {
    fn get(&self, url: &str, query: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<HttpReply>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn get(&self, url: &str, query: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<HttpReply> {
        let client = http_client()?;
        let mut req = client
            .get(url)
            .query(query)
            .header(USER_AGENT, "betsmart-terminal/0.1");
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let resp = req.send().context("request failed")?;
        let status = resp.status().as_u16();
        let quota_remaining = resp
            .headers()
            .get(QUOTA_REMAINING_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(|v| v as u64);
        let body = resp.text().context("failed reading body")?;

        Ok(HttpReply {
            status,
            body,
            quota_remaining,
        })
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, query: &[(&str, &str)], headers: &[(&str, &str)]) -> Result<HttpReply> {
        (**self).get(url, query, headers)
    }
}
