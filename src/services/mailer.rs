//! Outbound mail for meeting notifications.
//!
//! Sending is fire-and-forget: handlers render a [`MailMessage`] and hand it to
//! a background task that calls [`Mailer::send`] once. Deployments without an
//! SMTP host get [`LogMailer`], which only records what would have been sent.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::MailConfig;
use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid mail address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Message has no recipients")]
    NoRecipients,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a pooled SMTP transport. Port 465 uses implicit TLS, `starttls`
    /// upgrades a plain connection, anything else talks plain SMTP.
    pub fn from_config(config: &MailConfig, host: &str) -> Result<Self, MailError> {
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };

        let mut builder = builder.port(config.port);
        if let (Some(user), Some(password)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: parse_mailbox(&config.from)?,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder().from(self.from.clone()).subject(message.subject);
        for address in &message.to {
            builder = builder.to(parse_mailbox(address)?);
        }
        let email = builder.header(ContentType::TEXT_HTML).body(message.html)?;

        let response = self.transport.send(email).await?;
        info!(
            "Mail delivered to {} recipient(s): {}",
            message.to.len(),
            response.code()
        );
        Ok(())
    }
}

/// Mailer used when no SMTP host is configured.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::NoRecipients);
        }
        info!(
            "Mail transport disabled, dropping '{}' for {}",
            message.subject,
            message.to.join(", ")
        );
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.trim().parse::<Mailbox>().map_err(|e| MailError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Request body for `POST /notificaciones/reunion`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReunionNotificacion {
    pub reunion_id: Option<i32>,
    pub subject: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub content: Option<ReunionContenido>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReunionContenido {
    pub tema: String,
    pub fecha: String,
    pub hora: String,
    pub lugar: String,
    pub tipo: String,
    pub responsable: String,
    pub integrantes: Vec<String>,
}

impl ReunionNotificacion {
    /// Check the body and render the message to send.
    pub fn into_message(self) -> Result<MailMessage, ApiError> {
        let subject = self.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let recipients: Vec<String> = self
            .recipients
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();

        match (subject, self.content) {
            (Some(subject), Some(content)) if !recipients.is_empty() => Ok(MailMessage {
                to: recipients,
                subject,
                html: render_reunion_html(&content),
            }),
            _ => Err(ApiError::bad_request(
                "Faltan datos requeridos para enviar la notificación",
            )),
        }
    }
}

pub fn render_reunion_html(content: &ReunionContenido) -> String {
    let integrantes: String = content
        .integrantes
        .iter()
        .map(|i| format!("<li>{}</li>", escape_html(i)))
        .collect();

    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #3c4b64;">Notificación de Reunión</h2>
  <div style="padding: 15px; border: 1px solid #ddd; border-radius: 5px; margin-top: 20px;">
    <h3 style="margin-top: 0;">{tema}</h3>
    <p><strong>Fecha:</strong> {fecha}</p>
    <p><strong>Hora:</strong> {hora}</p>
    <p><strong>Lugar:</strong> {lugar}</p>
    <p><strong>Tipo:</strong> {tipo}</p>
    <p><strong>Responsable:</strong> {responsable}</p>
    <div style="margin-top: 20px;">
      <h4>Integrantes:</h4>
      <ul>{integrantes}</ul>
    </div>
    <p style="margin-top: 30px; font-size: 0.9em; color: #666;">
      Este es un mensaje automático del Sistema Bitacora modulo Gestión de Reuniones.
    </p>
  </div>
</div>"#,
        tema = escape_html(&content.tema),
        fecha = escape_html(&content.fecha),
        hora = escape_html(&content.hora),
        lugar = escape_html(&content.lugar),
        tipo = escape_html(&content.tipo),
        responsable = escape_html(&content.responsable),
        integrantes = integrantes,
    )
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> ReunionNotificacion {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn escapes_user_values() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn renders_meeting_fields() {
        let content = ReunionContenido {
            tema: "Parada <planta>".into(),
            fecha: "2025-06-10".into(),
            integrantes: vec!["jperez".into(), "mlopez".into()],
            ..Default::default()
        };
        let html = render_reunion_html(&content);
        assert!(html.contains("Parada &lt;planta&gt;"));
        assert!(html.contains("<strong>Fecha:</strong> 2025-06-10"));
        assert!(html.contains("<li>jperez</li><li>mlopez</li>"));
    }

    #[test]
    fn notification_requires_subject_recipients_and_content() {
        assert!(body(json!({ "subject": "x", "recipients": [], "content": {} })).into_message().is_err());
        assert!(body(json!({ "recipients": ["a@b.c"], "content": {} })).into_message().is_err());
        assert!(body(json!({ "subject": "x", "recipients": ["a@b.c"] })).into_message().is_err());

        let message = body(json!({
            "reunionId": 4,
            "subject": "Reunión semanal",
            "recipients": [" a@b.c ", ""],
            "content": { "tema": "Seguridad" }
        }))
        .into_message()
        .unwrap();
        assert_eq!(message.to, vec!["a@b.c"]);
        assert!(message.html.contains("Seguridad"));
    }

    #[tokio::test]
    async fn log_mailer_rejects_empty_recipients() {
        let mailer = LogMailer;
        let message = MailMessage { to: vec![], subject: "s".into(), html: String::new() };
        assert!(matches!(mailer.send(message).await, Err(MailError::NoRecipients)));
    }
}
