use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-sender")
                .long("email-sender")
                .help("Email delivery backend for the outbox worker")
                .env("SESIO_EMAIL_SENDER")
                .value_parser(["log", "smtp"])
                .default_value("log"),
        )
        .arg(
            Arg::new("smtp-relay")
                .long("smtp-relay")
                .help("SMTP relay hostname")
                .env("SESIO_SMTP_RELAY"),
        )
        .arg(
            Arg::new("smtp-username")
                .long("smtp-username")
                .help("SMTP username")
                .env("SESIO_SMTP_USERNAME"),
        )
        .arg(
            Arg::new("smtp-password")
                .long("smtp-password")
                .help("SMTP password")
                .env("SESIO_SMTP_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("email-from")
                .long("email-from")
                .help("From address for outbound email")
                .env("SESIO_EMAIL_FROM")
                .default_value("Sesio <no-reply@sesio.dev>"),
        )
}

#[derive(Debug)]
pub enum SenderKind {
    Log,
    Smtp,
}

#[derive(Debug)]
pub struct Options {
    pub sender: SenderKind,
    pub relay: Option<String>,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from: String,
}

impl Options {
    /// Collect SMTP options from validated CLI matches.
    ///
    /// # Errors
    /// Returns an error if the SMTP backend is selected without a relay, or
    /// credentials are half-configured.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let sender = match matches.get_one::<String>("email-sender").map(String::as_str) {
            Some("smtp") => SenderKind::Smtp,
            _ => SenderKind::Log,
        };
        let relay = matches.get_one::<String>("smtp-relay").cloned();
        let username = matches.get_one::<String>("smtp-username").cloned();
        let password = matches
            .get_one::<String>("smtp-password")
            .cloned()
            .map(SecretString::from);

        if matches!(sender, SenderKind::Smtp) && relay.is_none() {
            return Err(anyhow!(
                "missing required argument: --smtp-relay (required when --email-sender=smtp)"
            ));
        }
        if username.is_some() != password.is_some() {
            return Err(anyhow!(
                "--smtp-username and --smtp-password must be set together"
            ));
        }

        Ok(Self {
            sender,
            relay,
            username,
            password,
            from: matches
                .get_one::<String>("email-from")
                .cloned()
                .unwrap_or_else(|| "Sesio <no-reply@sesio.dev>".to_string()),
        })
    }
}
