//! Contact form and about page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::instrument;

use tsitsi_core::Email;

use crate::content::RenderedAbout;
use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::models::flash::{self, Level};
use crate::services::email::ContactMessage;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 100;
const MAX_SUBJECT_CHARS: usize = 150;
const MAX_MESSAGE_CHARS: usize = 5000;

/// Contact form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    /// Validate into a message for the store inbox.
    fn validate(&self) -> std::result::Result<ContactMessage, Vec<String>> {
        let mut errors = Vec::new();
        let name = self.name.trim();
        let subject = self.subject.trim();
        let message = self.message.trim();

        for (value, label, max) in [
            (name, "Name", MAX_NAME_CHARS),
            (subject, "Subject", MAX_SUBJECT_CHARS),
            (message, "Message", MAX_MESSAGE_CHARS),
        ] {
            if value.is_empty() {
                errors.push(format!("{label} is required."));
            } else if value.chars().count() > max {
                errors.push(format!("{label} must be at most {max} characters."));
            }
        }

        let email = Email::parse(&self.email)
            .map_err(|e| errors.push(format!("Email: {e}.")))
            .ok();

        match email {
            Some(email) if errors.is_empty() => Ok(ContactMessage {
                name: name.to_owned(),
                email,
                subject: subject.to_owned(),
                message: message.to_owned(),
            }),
            _ => Err(errors),
        }
    }
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub ctx: PageContext,
    pub form: ContactForm,
    pub errors: Vec<String>,
}

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "about.html")]
pub struct AboutTemplate {
    pub ctx: PageContext,
    pub about: Arc<RenderedAbout>,
}

/// Display the contact form, prefilled for logged-in users.
pub async fn contact_page(ctx: PageContext) -> impl IntoResponse {
    let form = ctx.user.as_ref().map_or_else(ContactForm::default, |user| ContactForm {
        name: user.display_name().to_owned(),
        email: user.email.to_string(),
        ..ContactForm::default()
    });
    ContactTemplate {
        ctx,
        form,
        errors: Vec::new(),
    }
}

/// Send a contact message to the store inbox.
#[instrument(skip(state, ctx, session, form))]
pub async fn submit_contact(
    State(state): State<AppState>,
    ctx: PageContext,
    session: Session,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let message = match form.validate() {
        Ok(message) => message,
        Err(errors) => {
            let page = ContactTemplate { ctx, form, errors };
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
        }
    };

    let Some(email) = state.email() else {
        tracing::warn!("Contact form used but email is not configured");
        flash::push(
            &session,
            Level::Error,
            "Sorry, messages cannot be sent right now. Please try again later.",
        )
        .await;
        return Ok(Redirect::to("/contact").into_response());
    };

    match email.send_contact_message(&message).await {
        Ok(()) => {
            tracing::info!("Contact message sent");
            flash::push(
                &session,
                Level::Success,
                "Thank you! Your message has been sent.",
            )
            .await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to send contact message");
            flash::push(
                &session,
                Level::Error,
                "Sorry, your message could not be sent. Please try again later.",
            )
            .await;
        }
    }

    Ok(Redirect::to("/contact").into_response())
}

/// Display the about page.
#[instrument(skip(state, ctx))]
pub async fn about(State(state): State<AppState>, ctx: PageContext) -> Result<impl IntoResponse> {
    let about = state.content().about(state.pool()).await?;
    Ok(AboutTemplate { ctx, about })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: "Fara".to_owned(),
            email: "fara@example.mg".to_owned(),
            subject: "Delivery to Toamasina".to_owned(),
            message: "Do you ship to the coast?".to_owned(),
        }
    }

    #[test]
    fn test_valid_contact_form() {
        let message = form().validate().unwrap_or_else(|e| panic!("{e:?}"));
        assert_eq!(message.email.as_str(), "fara@example.mg");
        assert_eq!(message.subject, "Delivery to Toamasina");
    }

    #[test]
    fn test_contact_form_limits() {
        let mut long = form();
        long.name = "x".repeat(MAX_NAME_CHARS + 1);
        long.subject = "y".repeat(MAX_SUBJECT_CHARS + 1);
        let errors = long.validate().err().unwrap_or_default();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_contact_form_reports_every_problem() {
        let errors = ContactForm::default().validate().err().unwrap_or_default();
        assert_eq!(errors.len(), 4);
    }
}
