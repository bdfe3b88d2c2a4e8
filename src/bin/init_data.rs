//! Development helper for Telegram Mini-App init data.
//!
//! ```bash
//! init_data sign --user '{"id":42,"username":"alice"}' --field start_param=promo
//! init_data verify 'auth_date=...&user=...&hash=...' --max-age 0
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use twa_auth::utils::telegram_auth::{
    create_telegram_init_data, verify_init_data, FieldMap, InitDataConfig, DEFAULT_MAX_AGE_SECONDS,
};

#[derive(Parser, Debug)]
#[command(name = "init_data", version, about = "Sign and verify Telegram Mini-App init data")]
struct Cli {
    /// Bot token used as the signing secret
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true, global = true)]
    bot_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a signed init data query string
    Sign(SignArgs),

    /// Verify an init data query string and print the decoded user
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
struct SignArgs {
    /// JSON object placed in the `user` field
    #[arg(long)]
    user: String,

    /// Unix timestamp for `auth_date`, defaults to now
    #[arg(long)]
    auth_date: Option<i64>,

    /// Extra `key=value` fields, repeatable
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,
}

#[derive(Args, Debug)]
struct VerifyArgs {
    /// Raw init data query string
    init_data: String,

    /// Freshness window in seconds, zero or negative disables it
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_SECONDS, allow_negative_numbers = true)]
    max_age: i64,
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let bot_token = cli
        .bot_token
        .ok_or_else(|| anyhow!("--bot-token or TELEGRAM_BOT_TOKEN is required"))?;

    match cli.command {
        Command::Sign(args) => {
            serde_json::from_str::<serde_json::Value>(&args.user)
                .context("--user must be valid JSON")?;

            let mut fields: FieldMap = args.fields.into_iter().collect();
            fields.insert("user".to_string(), args.user);
            if let Some(auth_date) = args.auth_date {
                fields.insert("auth_date".to_string(), auth_date.to_string());
            }

            println!("{}", create_telegram_init_data(&bot_token, &fields)?);
        }
        Command::Verify(args) => {
            let config = InitDataConfig::new(bot_token).with_max_age(args.max_age);
            let validated = verify_init_data(&args.init_data, &config)?;
            println!("{}", validated.status());
            println!("{}", serde_json::to_string_pretty(&validated.user)?);
        }
    }

    Ok(())
}
