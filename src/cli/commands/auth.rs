use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    let command = with_reset_args(command);
    with_outbox_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("access-token-secret")
                .long("access-token-secret")
                .help("Signing secret for access tokens")
                .env("SESIO_ACCESS_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("refresh-token-secret")
                .long("refresh-token-secret")
                .help("Signing secret for refresh tokens")
                .env("SESIO_REFRESH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new("access-token-ttl-seconds")
                .long("access-token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("SESIO_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("refresh-token-ttl-seconds")
                .long("refresh-token-ttl-seconds")
                .help("Refresh token TTL in seconds")
                .env("SESIO_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("864000")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_reset_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for password reset links")
                .env("SESIO_FRONTEND_BASE_URL")
                .default_value("https://sesio.dev"),
        )
        .arg(
            Arg::new("reset-ticket-ttl-seconds")
                .long("reset-ticket-ttl-seconds")
                .help("Password reset ticket TTL in seconds")
                .env("SESIO_RESET_TICKET_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_outbox_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("email-outbox-poll-seconds")
                .long("email-outbox-poll-seconds")
                .help("Email outbox poll interval in seconds")
                .env("SESIO_EMAIL_OUTBOX_POLL_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-batch-size")
                .long("email-outbox-batch-size")
                .help("Email outbox batch size per poll")
                .env("SESIO_EMAIL_OUTBOX_BATCH_SIZE")
                .default_value("10")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("email-outbox-max-attempts")
                .long("email-outbox-max-attempts")
                .help("Max attempts before marking an email as failed")
                .env("SESIO_EMAIL_OUTBOX_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("email-outbox-backoff-base-seconds")
                .long("email-outbox-backoff-base-seconds")
                .help("Base delay for email outbox retry backoff")
                .env("SESIO_EMAIL_OUTBOX_BACKOFF_BASE_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("email-outbox-backoff-max-seconds")
                .long("email-outbox-backoff-max-seconds")
                .help("Max delay for email outbox retry backoff")
                .env("SESIO_EMAIL_OUTBOX_BACKOFF_MAX_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct OutboxOptions {
    pub poll_seconds: u64,
    pub batch_size: usize,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

#[derive(Debug)]
pub struct Options {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_seconds: i64,
    pub refresh_token_ttl_seconds: i64,
    pub frontend_base_url: String,
    pub reset_ticket_ttl_seconds: i64,
    pub outbox: OutboxOptions,
}

impl Options {
    /// Collect auth options from validated CLI matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or the signing
    /// secrets are reused across token types.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let access_token_secret = matches
            .get_one::<String>("access-token-secret")
            .cloned()
            .context("missing required argument: --access-token-secret")?;
        let refresh_token_secret = matches
            .get_one::<String>("refresh-token-secret")
            .cloned()
            .context("missing required argument: --refresh-token-secret")?;

        // Access and refresh tokens must not be interchangeable.
        if access_token_secret == refresh_token_secret {
            return Err(anyhow!(
                "--access-token-secret and --refresh-token-secret must differ"
            ));
        }

        let outbox = OutboxOptions {
            poll_seconds: matches
                .get_one::<u64>("email-outbox-poll-seconds")
                .copied()
                .unwrap_or(5),
            batch_size: matches
                .get_one::<usize>("email-outbox-batch-size")
                .copied()
                .unwrap_or(10),
            max_attempts: matches
                .get_one::<u32>("email-outbox-max-attempts")
                .copied()
                .unwrap_or(5),
            backoff_base_seconds: matches
                .get_one::<u64>("email-outbox-backoff-base-seconds")
                .copied()
                .unwrap_or(5),
            backoff_max_seconds: matches
                .get_one::<u64>("email-outbox-backoff-max-seconds")
                .copied()
                .unwrap_or(300),
        };

        Ok(Self {
            access_token_secret,
            refresh_token_secret,
            access_token_ttl_seconds: matches
                .get_one::<i64>("access-token-ttl-seconds")
                .copied()
                .unwrap_or(900),
            refresh_token_ttl_seconds: matches
                .get_one::<i64>("refresh-token-ttl-seconds")
                .copied()
                .unwrap_or(864_000),
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .unwrap_or_else(|| "https://sesio.dev".to_string()),
            reset_ticket_ttl_seconds: matches
                .get_one::<i64>("reset-ticket-ttl-seconds")
                .copied()
                .unwrap_or(600),
            outbox,
        })
    }
}
