//! Failure notifications.
//!
//! Notifiers are best effort. A failing notifier logs and moves on; it
//! never turns into an error for the run that triggered it.

use async_trait::async_trait;

use crate::services::Notifier;

/// Reports failures to the process log only.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_failure(&self, subject: &str, body: &str) {
        log::error!("{subject}\n{body}");
    }
}

#[cfg(feature = "email")]
pub use email::EmailNotifier;

#[cfg(feature = "email")]
mod email {
    use async_trait::async_trait;
    use lettre::message::{Mailbox, Message, header};
    use lettre::transport::smtp::authentication::Credentials;
    use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

    use crate::error::{AppError, Result};
    use crate::models::NotifierConfig;
    use crate::services::Notifier;

    /// Sends failure reports over SMTP.
    pub struct EmailNotifier {
        mailer: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
        to: Mailbox,
    }

    impl EmailNotifier {
        /// Build from config; credentials come from the named env vars.
        pub fn from_config(config: &NotifierConfig) -> Result<Self> {
            let env = |name: &str| {
                std::env::var(name).map_err(|_| AppError::config(format!("{name} is not set")))
            };
            let creds = Credentials::new(env(&config.username_env)?, env(&config.password_env)?);

            let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| AppError::config(format!("invalid SMTP host: {e}")))?
                .credentials(creds)
                .build();

            let from = config
                .from
                .parse()
                .map_err(|e| AppError::config(format!("invalid notifier.from: {e}")))?;
            let to = config
                .to
                .parse()
                .map_err(|e| AppError::config(format!("invalid notifier.to: {e}")))?;

            Ok(Self { mailer, from, to })
        }

        async fn send(&self, subject: &str, body: &str) -> std::result::Result<(), String> {
            let msg = Message::builder()
                .from(self.from.clone())
                .to(self.to.clone())
                .subject(subject)
                .header(header::ContentType::TEXT_PLAIN)
                .body(body.to_string())
                .map_err(|e| format!("build email: {e}"))?;

            self.mailer
                .send(msg)
                .await
                .map(|_| ())
                .map_err(|e| format!("send email: {e}"))
        }
    }

    #[async_trait]
    impl Notifier for EmailNotifier {
        async fn notify_failure(&self, subject: &str, body: &str) {
            log::error!("{subject}\n{body}");
            if let Err(e) = self.send(subject, body).await {
                log::warn!("Failure notification not delivered: {e}");
            }
        }
    }
}
