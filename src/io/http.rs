use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::ChunkSource;
use anyhow::{Result, bail};

/// Streaming HTTP download of a remote ZIP file
///
/// The body is consumed front to back as it arrives. When the connection
/// drops mid-body the remainder is requested again with a `Range` header
/// starting at the first byte not yet delivered.
pub struct HttpStreamSource {
    client: Client,
    url: String,
    response: Option<Response>,
    content_length: Option<u64>,
    received: u64,
    done: bool,
    max_retry: u32,
}

impl HttpStreamSource {
    /// Create a new HTTP stream source
    ///
    /// This sends the initial GET request and fails if the server does not
    /// answer with a success status.
    pub async fn new(url: String, max_retry: u32) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;

        let mut source = Self {
            client,
            url,
            response: None,
            content_length: None,
            received: 0,
            done: false,
            max_retry,
        };

        let response = connect(&source.client, &source.url, 0, max_retry).await?;
        source.content_length = response.content_length();
        debug!(url = %source.url, length = ?source.content_length, "download started");
        source.response = Some(response);

        Ok(source)
    }

    /// Length announced by the server for the full archive, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}

/// Open the body at `offset`, retrying transient connection failures.
async fn connect(client: &Client, url: &str, offset: u64, max_retry: u32) -> Result<Response> {
    let mut retry_count = 0;

    loop {
        let mut request = client.get(url);
        if offset > 0 {
            request = request.header("Range", format!("bytes={}-", offset));
        }

        match request.send().await {
            Ok(resp) => {
                if offset > 0 {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        bail!(
                            "Remote server did not resume the download (status {})",
                            resp.status()
                        );
                    }
                } else if !resp.status().is_success() {
                    bail!("HTTP request failed with status: {}", resp.status());
                }
                return Ok(resp);
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                retry_count += 1;
                if retry_count >= max_retry {
                    bail!("Max retries exceeded");
                }
                warn!(retry = retry_count, max = max_retry, error = %e, "connection error");
                tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[async_trait]
impl ChunkSource for HttpStreamSource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut retry_count = 0;

        loop {
            if self.done {
                return Ok(None);
            }
            if self.response.is_none() {
                let response =
                    connect(&self.client, &self.url, self.received, self.max_retry).await?;
                self.response = Some(response);
            }
            let Some(response) = self.response.as_mut() else {
                return Ok(None);
            };

            match response.chunk().await {
                Ok(Some(bytes)) => {
                    self.received += bytes.len() as u64;
                    return Ok(Some(bytes.to_vec()));
                }
                Ok(None) => {
                    self.done = true;
                    self.response = None;
                    return Ok(None);
                }
                Err(e) if e.is_timeout() || e.is_body() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        bail!("Max retries exceeded");
                    }
                    warn!(
                        retry = retry_count,
                        max = self.max_retry,
                        offset = self.received,
                        error = %e,
                        "download interrupted, resuming"
                    );
                    self.response = None;
                    tokio::time::sleep(Duration::from_millis(500 * retry_count as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn bytes_read(&self) -> u64 {
        self.received
    }
}
