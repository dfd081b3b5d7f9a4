//! SMTP email notifier via `lettre` with TLS support.
//!
//! Port 465 uses implicit TLS; otherwise STARTTLS is required unless the
//! config sets `require_tls: false`.

use herald_core::Alert;
use herald_routing::schema::EmailConfig;
use lettre::{
    message::{header::ContentType, Mailbox, Mailboxes},
    transport::smtp::{authentication::Credentials, extension::ClientId},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::templating::{TemplateData, TemplateRenderer, DEFAULT_TEXT, DEFAULT_TITLE};
use crate::traits::{Notifier, NotifyContext, NotifyError};

/// Sends alert groups as emails via SMTP.
#[derive(Debug)]
pub struct EmailNotifier {
    conf: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
    renderer: TemplateRenderer,
}

fn config_err(e: impl std::fmt::Display) -> NotifyError {
    NotifyError::Config(e.to_string())
}

impl EmailNotifier {
    /// Build from an already validated config (globals inherited).
    pub fn from_config(conf: &EmailConfig) -> Result<Self, NotifyError> {
        let from: Mailbox = conf.from.parse().map_err(config_err)?;
        let to: Mailboxes = conf.to.parse().map_err(config_err)?;
        let to: Vec<Mailbox> = to.into_iter().collect();
        if to.is_empty() {
            return Err(NotifyError::Config("at least one recipient is required".to_string()));
        }

        let host = conf.smarthost.host.as_str();
        if host.is_empty() {
            return Err(NotifyError::Config("email smarthost is mandatory".to_string()));
        }
        let port: u16 = conf
            .smarthost
            .port
            .parse()
            .map_err(|_| NotifyError::Config(format!("invalid smarthost port {:?}", conf.smarthost.port)))?;

        let mut builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(config_err)?
        } else if conf.require_tls.unwrap_or(true) {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).map_err(config_err)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        }
        .port(port);

        if !conf.hello.is_empty() {
            builder = builder.hello_name(ClientId::Domain(conf.hello.clone()));
        }
        if !conf.auth_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                conf.auth_username.clone(),
                conf.auth_password.expose().to_string(),
            ));
        }

        Ok(Self {
            conf: conf.clone(),
            transport: builder.build(),
            from,
            to,
            renderer: TemplateRenderer::new(),
        })
    }

    fn build_message(&self, data: &TemplateData) -> Result<Message, NotifyError> {
        let subject_template = self
            .conf
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("subject"))
            .map(|(_, v)| v.as_str())
            .unwrap_or("");
        let subject = self.renderer.render_or(subject_template, DEFAULT_TITLE, data)?;

        let mut builder = Message::builder().from(self.from.clone()).subject(subject);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        let built = match &self.conf.html {
            Some(html) if !html.is_empty() => builder
                .header(ContentType::TEXT_HTML)
                .body(self.renderer.render(html, data)?),
            _ => {
                let text = self.conf.text.as_deref().unwrap_or("");
                builder
                    .header(ContentType::TEXT_PLAIN)
                    .body(self.renderer.render_or(text, DEFAULT_TEXT, data)?)
            }
        };
        built.map_err(|e| NotifyError::Smtp { message: e.to_string(), transient: false })
    }
}

#[async_trait::async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, ctx: &NotifyContext, alerts: &[Alert]) -> Result<(), NotifyError> {
        let data = TemplateData::new(ctx, alerts);
        let email = self.build_message(&data)?;

        self.transport.send(email).await.map_err(|e| NotifyError::Smtp {
            transient: !e.is_permanent(),
            message: e.to_string(),
        })?;

        tracing::info!(
            integration = "email",
            receiver = %ctx.receiver,
            recipients = self.to.len(),
            "notification delivered"
        );
        Ok(())
    }

    fn integration(&self) -> &str {
        "email"
    }

    fn send_resolved(&self) -> bool {
        self.conf.send_resolved
    }
}
