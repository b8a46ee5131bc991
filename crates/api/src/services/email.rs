//! Email sending abstraction.
//!
//! Uses Resend when an API key is configured, SMTP (lettre) otherwise.
//! This allows local development without a Resend account.

use anyhow::Result;
use async_trait::async_trait;
use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
};
use resend_rs::types::CreateEmailBaseOptions;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send a password-reset verification code.
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<()>;
}

/// Sender identity and wording shared by both transports.
#[derive(Clone)]
pub struct EmailTemplate {
    pub from: String,
    pub app_name: String,
}

impl EmailTemplate {
    fn subject(&self) -> String {
        format!("Your {} verification code", self.app_name)
    }

    fn body(&self, code: &str) -> String {
        format!(
            "Your {} password reset code is: {}\n\nThis code expires in 5 minutes. \
             If you did not request a password reset, you can ignore this email.",
            self.app_name, code
        )
    }
}

pub enum EmailSenderImpl {
    /// SMTP-based sender using lettre (for development)
    Smtp(SmtpSender),
    /// Resend API sender (for production)
    Resend(ResendSender),
}

impl EmailSenderImpl {
    /// Uses Resend if an api key is provided, otherwise falls back to SMTP.
    pub fn new(
        resend_api_key: Option<String>,
        smtp_url: Option<String>,
        template: EmailTemplate,
    ) -> Result<Self> {
        if let Some(api_key) = resend_api_key.filter(|k| !k.is_empty()) {
            Ok(Self::Resend(ResendSender::new(api_key, template)))
        } else if let Some(url) = smtp_url.filter(|u| !u.is_empty()) {
            Ok(Self::Smtp(SmtpSender::new(url, template)?))
        } else {
            anyhow::bail!("Either NEWSDESK_RESEND_API_KEY or NEWSDESK_SMTP_URL must be configured")
        }
    }
}

#[async_trait]
impl EmailSender for EmailSenderImpl {
    async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        match self {
            Self::Resend(sender) => sender.send_verification_code(to, code).await,
            Self::Smtp(sender) => sender.send_verification_code(to, code).await,
        }
    }
}

/// SMTP sender using lettre.
pub struct SmtpSender {
    transport: SmtpTransport,
    template: EmailTemplate,
}

impl SmtpSender {
    pub fn new(smtp_url: String, template: EmailTemplate) -> Result<Self> {
        let transport = SmtpTransport::from_url(&smtp_url)?.build();

        Ok(Self {
            transport,
            template,
        })
    }

    pub async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        let email = Message::builder()
            .from(self.template.from.parse::<Mailbox>()?)
            .to(Mailbox::new(None, to.parse()?))
            .subject(self.template.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(self.template.body(code))?;

        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&email)).await??;

        Ok(())
    }
}

/// Resend API sender.
pub struct ResendSender {
    client: resend_rs::Resend,
    template: EmailTemplate,
}

impl ResendSender {
    pub fn new(api_key: String, template: EmailTemplate) -> Self {
        Self {
            client: resend_rs::Resend::new(&api_key),
            template,
        }
    }

    pub async fn send_verification_code(&self, to: &str, code: &str) -> Result<()> {
        let email = CreateEmailBaseOptions::new(
            self.template.from.as_str(),
            [to],
            self.template.subject().as_str(),
        )
        .with_text(&self.template.body(code));

        self.client.emails.send(email).await?;

        Ok(())
    }
}
