//! Client for the instance metadata service (IMDSv2).

use std::time::Duration;

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
/// Session token lifetime requested from the service (6 hours).
const TOKEN_TTL_SECS: &str = "21600";

#[derive(Clone)]
pub struct MetadataClient {
    client: reqwest::Client,
    base: String,
}

impl MetadataClient {
    pub fn new(base: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(1))
            .build()?;
        Ok(Self {
            client,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches a session token, then the private IPv4 with it.
    pub async fn private_ipv4(&self) -> reqwest::Result<String> {
        let token = self
            .client
            .put(format!("{}/api/token", self.base))
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let ip = self
            .client
            .get(format!("{}/meta-data/private-ipv4", self.base))
            .header(TOKEN_HEADER, token)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        Ok(ip.trim().to_string())
    }
}
