use crate::{
    api,
    api::email::{EmailSender, LogEmailSender, SmtpEmailSender},
    cli::commands::smtp::SenderKind,
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::sync::Arc;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub frontend_base_url: String,
    pub reset_ticket_ttl_seconds: i64,
    pub email_outbox_poll_seconds: u64,
    pub email_outbox_batch_size: usize,
    pub email_outbox_max_attempts: u32,
    pub email_outbox_backoff_base_seconds: u64,
    pub email_outbox_backoff_max_seconds: u64,
    pub email_sender: SenderKind,
    pub smtp_relay: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<SecretString>,
    pub email_from: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the email sender cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = api::handlers::auth::AuthConfig::new(
        args.frontend_base_url,
        SecretString::from(args.access_token_secret),
        SecretString::from(args.refresh_token_secret),
    )
    .with_access_token_ttl_seconds(args.access_token_ttl_seconds)
    .with_refresh_token_ttl_seconds(args.refresh_token_ttl_seconds)
    .with_reset_ticket_ttl_seconds(args.reset_ticket_ttl_seconds);

    let email_config = api::email::EmailWorkerConfig::new()
        .with_poll_interval_seconds(args.email_outbox_poll_seconds)
        .with_batch_size(args.email_outbox_batch_size)
        .with_max_attempts(args.email_outbox_max_attempts)
        .with_backoff_base_seconds(args.email_outbox_backoff_base_seconds)
        .with_backoff_max_seconds(args.email_outbox_backoff_max_seconds);

    let sender: Arc<dyn EmailSender> = match args.email_sender {
        SenderKind::Log => Arc::new(LogEmailSender),
        SenderKind::Smtp => {
            let relay = args
                .smtp_relay
                .as_deref()
                .ok_or_else(|| anyhow!("SMTP relay is required"))?;
            Arc::new(
                SmtpEmailSender::new(
                    relay,
                    args.smtp_username.clone(),
                    args.smtp_password.clone(),
                    &args.email_from,
                )
                .context("Failed to build SMTP transport")?,
            )
        }
    };

    api::new(args.port, args.dsn, auth_config, email_config, sender).await
}
