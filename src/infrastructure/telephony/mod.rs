//! Twilio REST integration

pub mod twiml;

use crate::config::TwilioConfig;
use crate::domain::gateway::Telephony;
use crate::domain::shared::error::{GatewayError, Result};

const API_BASE: &str = "https://api.twilio.com";

/// Carrier control client over the Twilio 2010-04-01 REST API.
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base: String,
}

impl TwilioClient {
    pub fn new(config: &TwilioConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.number.clone(),
            api_base: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn resource_url(&self, resource: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/{resource}",
            self.api_base, self.account_sid
        )
    }

    async fn post_form(
        &self,
        resource: &str,
        form: &[(&str, &str)],
    ) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(self.resource_url(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let detail = body["message"].as_str().unwrap_or("no detail");
            return Err(GatewayError::Api("twilio", format!("{status}: {detail}")));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Telephony for TwilioClient {
    async fn send_sms(&self, to: &str, body: &str) -> Result<()> {
        self.post_form(
            "Messages.json",
            &[("To", to), ("From", &self.from_number), ("Body", body)],
        )
        .await?;
        Ok(())
    }

    async fn place_call(&self, to: &str, url: &str) -> Result<String> {
        let body = self
            .post_form(
                "Calls.json",
                &[
                    ("To", to),
                    ("From", &self.from_number),
                    ("Url", url),
                    ("Method", "POST"),
                ],
            )
            .await?;
        Ok(body["sid"].as_str().unwrap_or_default().to_string())
    }

    async fn redirect_call(&self, call_sid: &str, url: &str) -> Result<()> {
        self.post_form(
            &format!("Calls/{call_sid}.json"),
            &[("Url", url), ("Method", "POST")],
        )
        .await?;
        Ok(())
    }

    async fn redirect_call_inline(&self, call_sid: &str, document: &str) -> Result<()> {
        self.post_form(&format!("Calls/{call_sid}.json"), &[("Twiml", document)])
            .await?;
        Ok(())
    }
}
