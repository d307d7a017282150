//! Transactional email for parent connections and weekly reports.
//!
//! [`Mailer`] abstracts over the delivery mechanism: [`HttpMailer`] posts to
//! a JSON email API, [`NoopMailer`] only logs (the default in development,
//! where no API key is configured).

pub mod template;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("email API returned {status}: {message}")]
  Api { status: u16, message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An outgoing email, fully rendered.
#[derive(Debug, Clone)]
pub struct Email {
  pub to:      String,
  pub subject: String,
  pub body:    String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: Email) -> Result<()>;
}

/// Sends mail via a JSON HTTP API (Resend-compatible).
#[derive(Clone)]
pub struct HttpMailer {
  http:     reqwest::Client,
  api_base: String,
  api_key:  String,
  from:     String,
}

impl HttpMailer {
  pub fn new(
    api_base: impl Into<String>,
    api_key: impl Into<String>,
    from: impl Into<String>,
  ) -> Self {
    Self {
      http: reqwest::Client::new(),
      api_base: api_base.into(),
      api_key: api_key.into(),
      from: from.into(),
    }
  }
}

#[async_trait]
impl Mailer for HttpMailer {
  async fn send(&self, email: Email) -> Result<()> {
    let response = self
      .http
      .post(format!("{}/emails", self.api_base))
      .bearer_auth(&self.api_key)
      .json(&serde_json::json!({
        "from": self.from,
        "to": [email.to],
        "subject": email.subject,
        "text": email.body,
      }))
      .send()
      .await?;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(Error::Api { status: status.as_u16(), message });
    }

    tracing::info!(to = %email.to, subject = %email.subject, "email sent");
    Ok(())
  }
}

/// Logs instead of sending. Used when no email API key is configured.
#[derive(Clone, Default)]
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
  async fn send(&self, email: Email) -> Result<()> {
    tracing::info!(
      to = %email.to,
      subject = %email.subject,
      "email delivery disabled, dropping message"
    );
    Ok(())
  }
}
