use anyhow::{bail, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Thin client for the transactional email HTTP API. Callers treat send
/// failures as best-effort: log and move on.
#[derive(Clone)]
pub struct MailerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl MailerClient {
    pub fn new(base_url: String, api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            from,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&SendEmailRequest {
                from: &self.from,
                to,
                subject,
                html,
            })
            .send()
            .await?;

        if !resp.status().is_success() {
            bail!("email send failed with status {}", resp.status());
        }
        Ok(())
    }
}
