#![deny(rust_2018_idioms)]

mod cli;
mod config;

use anyhow::anyhow;
use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use deai_client::{chat, CallKind, Canister, Connection, Identity as _};
use log::trace;
use std::fmt::Display;
use std::io::Write;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    trace!("cli: {:#?}", cli);

    let config = Config::load(&cli)?;
    trace!("config: {:#?}", config);

    let mut stdout = std::io::stdout();
    run(cli.command.unwrap_or_default(), &config, &mut stdout).await
}

/// Connects to the configured canister and executes `command`.
async fn run(command: Command, config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    let identity = deai_client::identity(&config.identity)?;

    let principal = identity.sender().map_err(|err| anyhow!(err))?;
    trace!("principal: {}", principal);

    let connection = Connection::new(
        identity,
        &config.replica_url,
        config.canister_id,
        config.fetch_root_key,
    )
    .await?;

    dispatch(command, &connection, out).await
}

async fn dispatch<C>(command: Command, canister: &C, out: &mut impl Write) -> anyhow::Result<()>
where
    C: Canister,
{
    let text = match command {
        Command::Call {
            method,
            args,
            query,
            returns,
        } => {
            let kind = if query { CallKind::Query } else { CallKind::Update };
            let return_types = (!returns.is_empty()).then_some(returns.as_slice());

            let response = canister.call(&method, &args, kind, return_types).await?;
            writeln!(out, "{}", response_line(response))?;
            return Ok(());
        }
        Command::Prompt { question, session } => {
            let on_text = |text: &str| write_fragment(out, text);
            chat::prompt(canister, &question, session.into(), on_text).await?
        }
        Command::Chat { messages, session } => {
            let on_text = |text: &str| write_fragment(out, text);
            chat::chat(canister, &messages, session.into(), on_text).await?
        }
    };

    writeln!(out)?;
    writeln!(out, "{}", response_line(text))?;
    Ok(())
}

fn response_line(response: impl Display) -> String {
    format!("Odpowiedź: {}", response)
}

fn write_fragment(out: &mut impl Write, text: &str) {
    // A closed stdout must not abort generation.
    let _ = write!(out, "{}", text).and_then(|_| out.flush());
}
