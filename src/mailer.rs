use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

const RESEND_URL: &str = "https://api.resend.com/emails";
const FROM_EMAIL: &str = "Working Hours Tracker <onboarding@resend.dev>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailKind {
    Verification,
    PasswordReset,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, kind: MailKind, to: &str, name: &str, token: &str) -> anyhow::Result<()>;
}

/// Sends transactional mail through the Resend HTTP API.
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    frontend_url: String,
}

impl ResendMailer {
    pub fn new(api_key: &str, frontend_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn verification_body(&self, name: &str, token: &str) -> (String, String) {
        let url = format!("{}/verify-email?token={}", self.frontend_url, token);
        let html = format!(
            "<p>Hello {name},</p>\
             <p>Thank you for registering with Working Hours Tracker!</p>\
             <p>Please verify your email address: <a href=\"{url}\">Verify Email Address</a></p>\
             <p>Or copy and paste this link into your browser:</p><p>{url}</p>\
             <p>This link will expire in 24 hours. If you didn't create an account, \
             please ignore this email.</p>"
        );
        ("Verify Your Email Address".to_string(), html)
    }

    fn reset_body(&self, name: &str, token: &str) -> (String, String) {
        let url = format!("{}/reset-password?token={}", self.frontend_url, token);
        let html = format!(
            "<p>Hello {name},</p>\
             <p>You requested to reset your password for Working Hours Tracker.</p>\
             <p>Click the link below to reset your password: \
             <a href=\"{url}\">Reset Password</a></p>\
             <p>Or copy and paste this link into your browser:</p><p>{url}</p>\
             <p>This link will expire in 1 hour. If you didn't request a password reset, \
             please ignore this email.</p>"
        );
        ("Reset Your Password".to_string(), html)
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, kind: MailKind, to: &str, name: &str, token: &str) -> anyhow::Result<()> {
        let (subject, html) = match kind {
            MailKind::Verification => self.verification_body(name, token),
            MailKind::PasswordReset => self.reset_body(name, token),
        };

        let resp = self
            .client
            .post(RESEND_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": FROM_EMAIL,
                "to": to,
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("resend request")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("resend returned {status}: {body}");
        }

        info!(%to, kind = ?kind, "email sent");
        Ok(())
    }
}

/// Logs instead of sending. Used in tests and in dev environments
/// without a Resend API key.
pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send(&self, kind: MailKind, to: &str, _name: &str, _token: &str) -> anyhow::Result<()> {
        info!(%to, kind = ?kind, "email dispatch skipped (no mailer configured)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_link_targets_frontend() {
        let mailer = ResendMailer::new("key", "http://localhost:3000/");
        let (subject, html) = mailer.verification_body("Alice", "tok123");
        assert_eq!(subject, "Verify Your Email Address");
        assert!(html.contains("http://localhost:3000/verify-email?token=tok123"));
        assert!(html.contains("Hello Alice"));
    }

    #[test]
    fn reset_link_targets_frontend() {
        let mailer = ResendMailer::new("key", "http://localhost:3000");
        let (subject, html) = mailer.reset_body("Bob", "tok456");
        assert_eq!(subject, "Reset Your Password");
        assert!(html.contains("http://localhost:3000/reset-password?token=tok456"));
    }

    #[tokio::test]
    async fn noop_mailer_always_succeeds() {
        let mailer = NoopMailer;
        mailer
            .send(MailKind::Verification, "a@x.com", "A", "t")
            .await
            .expect("noop send");
    }
}
