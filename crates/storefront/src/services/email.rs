//! Email service for order confirmations and contact form messages.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use tsitsi_core::Email;

use crate::config::EmailConfig;
use crate::filters;
use crate::models::order::OrderWithItems;

/// HTML template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    store_name: &'a str,
    order: &'a OrderWithItems,
    order_url: &'a str,
}

/// Plain text template for the order confirmation.
#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    store_name: &'a str,
    order: &'a OrderWithItems,
    order_url: &'a str,
}

/// HTML template for a contact form message.
#[derive(Template)]
#[template(path = "email/contact_message.html")]
struct ContactMessageHtml<'a> {
    message: &'a ContactMessage,
}

/// Plain text template for a contact form message.
#[derive(Template)]
#[template(path = "email/contact_message.txt")]
struct ContactMessageText<'a> {
    message: &'a ContactMessage,
}

/// A validated contact form submission.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    inbox_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            inbox_address: config.inbox_address.clone(),
        })
    }

    /// Send the order confirmation to the address given at checkout.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        store_name: &str,
        order: &OrderWithItems,
        order_url: &str,
    ) -> Result<(), EmailError> {
        let html = OrderConfirmationHtml {
            store_name,
            order,
            order_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            store_name,
            order,
            order_url,
        }
        .render()?;

        let subject = format!(
            "{store_name}: order {} received",
            order.order.order_number
        );
        let message = self.build_message(
            order.order.shipping.email.as_str(),
            None,
            &subject,
            &text,
            &html,
        )?;
        self.send(message, &subject).await
    }

    /// Forward a contact form message to the store inbox. Replies go to the
    /// visitor.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_contact_message(&self, message: &ContactMessage) -> Result<(), EmailError> {
        let html = ContactMessageHtml { message }.render()?;
        let text = ContactMessageText { message }.render()?;

        let subject = format!("[Contact] {}", message.subject);
        let email = self.build_message(
            &self.inbox_address,
            Some((&message.name, message.email.as_str())),
            &subject,
            &text,
            &html,
        )?;
        self.send(email, &subject).await
    }

    /// Build a multipart message with both plain text and HTML versions.
    fn build_message(
        &self,
        to: &str,
        reply_to: Option<(&str, &str)>,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<Message, EmailError> {
        let mut builder = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject);

        if let Some((name, address)) = reply_to {
            let address = address
                .parse()
                .map_err(|_| EmailError::InvalidAddress(address.to_string()))?;
            builder = builder.reply_to(Mailbox::new(Some(name.to_owned()), address));
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(text_body.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(html_body.to_string()),
                ),
        )?;

        Ok(message)
    }

    async fn send(&self, message: Message, subject: &str) -> Result<(), EmailError> {
        self.mailer.send(message).await?;
        tracing::info!(subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn service() -> EmailService {
        EmailService::new(&EmailConfig {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("password"),
            from_address: "Tsitsi Store <shop@example.com>".to_string(),
            inbox_address: "inbox@example.com".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_contact_message_sets_reply_to() {
        let message = service()
            .build_message(
                "inbox@example.com",
                Some(("Rova", "rova@example.mg")),
                "[Contact] Hello",
                "text",
                "<p>html</p>",
            )
            .unwrap();
        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        let reply_to = raw
            .lines()
            .find(|line| line.starts_with("Reply-To:"))
            .unwrap();
        assert!(reply_to.contains("<rova@example.mg>"));
        assert!(raw.contains("multipart/alternative"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let err = service()
            .build_message("not an address", None, "s", "t", "h")
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }

    #[test]
    fn test_contact_templates_render_fields() {
        let message = ContactMessage {
            name: "Rova".to_string(),
            email: Email::parse("rova@example.mg").unwrap(),
            subject: "Sizes".to_string(),
            message: "Do you have the dress in M?".to_string(),
        };
        let text = ContactMessageText { message: &message }.render().unwrap();
        assert!(text.contains("rova@example.mg"));
        assert!(text.contains("Do you have the dress in M?"));
    }
}
