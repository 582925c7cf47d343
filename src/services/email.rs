use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::config::EmailConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Verification,
    PasswordReset,
    Welcome,
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub kind: EmailKind,
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub action_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email provider rejected message (status={status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailBody {
    sender: EmailAddress,
    to: Vec<EmailAddress>,
    subject: String,
    html_content: String,
    text_content: String,
}

/// Delivers through a transactional email relay (Brevo `/v3/smtp/email` shape).
pub struct HttpEmailSender {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = SendEmailBody {
            sender: EmailAddress {
                email: self.config.from_email.clone(),
                name: self.config.from_name.clone(),
            },
            to: vec![EmailAddress {
                email: message.to.clone(),
                name: message.to_name.clone(),
            }],
            subject: message.subject.clone(),
            html_content: message.html.clone(),
            text_content: message.text.clone(),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .header("api-key", &self.config.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(EmailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Development sender: writes the message to the log instead of delivering it.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            link = message.action_url.as_deref().unwrap_or("-"),
            "email delivery disabled; logging message"
        );
        Ok(())
    }
}

/// Builds the auth emails and hands them to the configured sender.
/// Delivery failures are logged and swallowed.
#[derive(Clone)]
pub struct Mailer {
    sender: Arc<dyn EmailSender>,
    frontend_url: String,
}

impl Mailer {
    pub fn new(sender: Arc<dyn EmailSender>, frontend_url: impl Into<String>) -> Self {
        Self {
            sender,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={}", self.frontend_url, token)
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password?token={}", self.frontend_url, token)
    }

    pub async fn send_verification(&self, to: &str, first_name: &str, token: &str) {
        let link = self.verification_link(token);
        let message = EmailMessage {
            kind: EmailKind::Verification,
            to: to.to_string(),
            to_name: Some(first_name.to_string()),
            subject: "Verify your email address".to_string(),
            text: format!(
                "Hi {first_name},\n\nConfirm your email address to finish setting up your account:\n{link}\n\nThis link expires in 24 hours."
            ),
            html: format!(
                "<p>Hi {first_name},</p><p>Confirm your email address to finish setting up your account:</p><p><a href=\"{link}\">Verify email</a></p><p>This link expires in 24 hours.</p>"
            ),
            action_url: Some(link),
        };
        self.deliver(message).await;
    }

    pub async fn send_password_reset(&self, to: &str, first_name: &str, token: &str) {
        let link = self.reset_link(token);
        let message = EmailMessage {
            kind: EmailKind::PasswordReset,
            to: to.to_string(),
            to_name: Some(first_name.to_string()),
            subject: "Reset your password".to_string(),
            text: format!(
                "Hi {first_name},\n\nUse the link below to choose a new password:\n{link}\n\nThis link expires in 15 minutes and can be used once."
            ),
            html: format!(
                "<p>Hi {first_name},</p><p>Use the link below to choose a new password:</p><p><a href=\"{link}\">Reset password</a></p><p>This link expires in 15 minutes and can be used once.</p>"
            ),
            action_url: Some(link),
        };
        self.deliver(message).await;
    }

    pub async fn send_welcome(&self, to: &str, first_name: &str) {
        let message = EmailMessage {
            kind: EmailKind::Welcome,
            to: to.to_string(),
            to_name: Some(first_name.to_string()),
            subject: "Welcome aboard".to_string(),
            text: format!("Hi {first_name},\n\nYour email is verified. You can now sign in and start creating videos."),
            html: format!("<p>Hi {first_name},</p><p>Your email is verified. You can now sign in and start creating videos.</p>"),
            action_url: Some(self.frontend_url.clone()),
        };
        self.deliver(message).await;
    }

    async fn deliver(&self, message: EmailMessage) {
        if let Err(e) = self.sender.send(&message).await {
            tracing::error!(error = %e, to = %message.to, kind = ?message.kind, "failed to send email");
        }
    }
}
