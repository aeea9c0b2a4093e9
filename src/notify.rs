use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::{CreditConfig, MailConfig};

#[derive(Debug, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound account-holder notifications.
///
/// Both sends are best-effort: callers log failures and never roll back the
/// ledger mutation that triggered them.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Balance reached zero; tells the holder how to recharge.
    async fn exhaustion(&self, recipient: &str) -> Result<(), NotifyError>;

    /// `amount` credits were applied to the holder's account.
    async fn confirmation(&self, recipient: &str, amount: i64) -> Result<(), NotifyError>;
}

/// Mail API client sending notification mail from the monitored address
pub struct MailNotifier {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    address: String,
    service_name: String,
    recharge_subject: String,
}

impl MailNotifier {
    pub fn new(mail: &MailConfig, credits: &CreditConfig, service_name: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to create HTTP client"),
            api_url: mail.api_url.clone(),
            api_token: mail.api_token.clone(),
            address: mail.address.clone(),
            service_name: service_name.to_string(),
            recharge_subject: credits.recharge_subject.clone(),
        }
    }

    fn exhaustion_body(&self) -> String {
        format!(
            "<h2>Your search credits have been exhausted</h2>\
             <p>To recharge your credits, please follow these steps:</p>\
             <ol>\
               <li>Send an email to {}</li>\
               <li>Use the subject line: \"{}\"</li>\
             </ol>\
             <p>Your credits will be automatically recharged upon receipt of your email.</p>",
            self.address, self.recharge_subject
        )
    }

    fn confirmation_body(&self, amount: i64) -> String {
        format!(
            "<h2>Your credits have been recharged!</h2>\
             <p>Your account has been credited with {} new search credits.</p>\
             <p>You can now continue searching for investors and mentors.</p>\
             <p>Thank you for using {}!</p>",
            amount, self.service_name
        )
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let url = format!("{}/send", self.api_url);
        let body = serde_json::json!({
            "from": self.address,
            "to": to,
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError(format!("mail api returned {}", status)));
        }

        debug!(to = %to, subject = %subject, "notification sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn exhaustion(&self, recipient: &str) -> Result<(), NotifyError> {
        let subject = format!("Credits Exhausted - {}", self.service_name);
        self.send(recipient, &subject, &self.exhaustion_body()).await
    }

    async fn confirmation(&self, recipient: &str, amount: i64) -> Result<(), NotifyError> {
        let subject = format!("Credits Recharged - {}", self.service_name);
        self.send(recipient, &subject, &self.confirmation_body(amount))
            .await
    }
}
