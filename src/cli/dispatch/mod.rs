//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, smtp};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let smtp_opts = smtp::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        access_token_secret: auth_opts.access_token_secret,
        refresh_token_secret: auth_opts.refresh_token_secret,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        refresh_token_ttl_seconds: auth_opts.refresh_token_ttl_seconds,
        frontend_base_url: auth_opts.frontend_base_url,
        reset_ticket_ttl_seconds: auth_opts.reset_ticket_ttl_seconds,
        email_outbox_poll_seconds: auth_opts.outbox.poll_seconds,
        email_outbox_batch_size: auth_opts.outbox.batch_size,
        email_outbox_max_attempts: auth_opts.outbox.max_attempts,
        email_outbox_backoff_base_seconds: auth_opts.outbox.backoff_base_seconds,
        email_outbox_backoff_max_seconds: auth_opts.outbox.backoff_max_seconds,
        email_sender: smtp_opts.sender,
        smtp_relay: smtp_opts.relay,
        smtp_username: smtp_opts.username,
        smtp_password: smtp_opts.password,
        email_from: smtp_opts.from,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::smtp::SenderKind;

    fn base_env() -> Vec<(&'static str, Option<&'static str>)> {
        vec![
            ("SESIO_DSN", Some("postgres://localhost:5432/sesio")),
            ("SESIO_ACCESS_TOKEN_SECRET", Some("access-secret")),
            ("SESIO_REFRESH_TOKEN_SECRET", Some("refresh-secret")),
            ("SESIO_EMAIL_SENDER", None),
            ("SESIO_SMTP_RELAY", None),
            ("SESIO_SMTP_USERNAME", None),
            ("SESIO_SMTP_PASSWORD", None),
        ]
    }

    #[test]
    fn server_action_from_env() {
        temp_env::with_vars(base_env(), || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec!["sesio"]);
            let action = handler(&matches);
            assert!(action.is_ok());
            if let Ok(Action::Server(args)) = action {
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://localhost:5432/sesio");
                assert_eq!(args.access_token_ttl_seconds, 900);
                assert_eq!(args.refresh_token_ttl_seconds, 864_000);
                assert_eq!(args.reset_ticket_ttl_seconds, 600);
                assert!(matches!(args.email_sender, SenderKind::Log));
            }
        });
    }

    #[test]
    fn identical_secrets_rejected() {
        let mut env = base_env();
        env[1] = ("SESIO_ACCESS_TOKEN_SECRET", Some("same-secret"));
        env[2] = ("SESIO_REFRESH_TOKEN_SECRET", Some("same-secret"));
        temp_env::with_vars(env, || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec!["sesio"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("must differ"));
            }
        });
    }

    #[test]
    fn smtp_sender_requires_relay() {
        let mut env = base_env();
        env[3] = ("SESIO_EMAIL_SENDER", Some("smtp"));
        temp_env::with_vars(env, || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec!["sesio"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(err.to_string().contains("--smtp-relay"));
            }
        });
    }
}
