use crate::cli::Cli;
use anyhow::Context;
use deai_client::{IdentitySource, Principal};
use std::path::PathBuf;

const REPLICA_URL_KEY: &str = "DEAI_REPLICA_URL";
const DEFAULT_REPLICA_URL: &str = "http://127.0.0.1:4943/";

const CANISTER_ID_KEY: &str = "DEAI_CANISTER_ID";
const DEFAULT_CANISTER_ID: &str = "bkyz2-fmaaa-aaaaa-qaaaq-cai";

const FETCH_ROOT_KEY_KEY: &str = "DEAI_FETCH_ROOT_KEY";

const PRIVATE_KEY_KEY: &str = "DEAI_PRIVATE_KEY";

const ANONYMOUS_KEY: &str = "DEAI_ANONYMOUS";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub replica_url: String,
    pub canister_id: Principal,
    pub fetch_root_key: bool,
    pub identity: IdentitySource,
}

impl Config {
    /// Command line flags take precedence over the environment.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::resolve(cli, get)
    }

    fn resolve(cli: &Cli, get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let replica_url = cli
            .replica_url
            .clone()
            .or_else(|| get(REPLICA_URL_KEY))
            .unwrap_or_else(|| DEFAULT_REPLICA_URL.to_string());

        let canister_id = cli
            .canister_id
            .clone()
            .or_else(|| get(CANISTER_ID_KEY))
            .unwrap_or_else(|| DEFAULT_CANISTER_ID.to_string());
        let canister_id = Principal::from_text(&canister_id)
            .with_context(|| format!("invalid canister id {:?}", canister_id))?;

        let fetch_root_key = cli.fetch_root_key.unwrap_or_else(|| {
            get(FETCH_ROOT_KEY_KEY)
                .map(|config_value| is_true(&config_value))
                .unwrap_or_else(|| is_local(&replica_url))
        });

        let identity = if let Some(path) = &cli.private_key {
            IdentitySource::PemFile(path.clone())
        } else if cli.anonymous {
            IdentitySource::Anonymous
        } else if let Some(path) = get(PRIVATE_KEY_KEY) {
            IdentitySource::PemFile(PathBuf::from(path))
        } else if get(ANONYMOUS_KEY).map_or(false, |config_value| is_true(&config_value)) {
            IdentitySource::Anonymous
        } else {
            IdentitySource::Ephemeral
        };

        Ok(Self {
            replica_url,
            canister_id,
            fetch_root_key,
            identity,
        })
    }
}

/// Reads `key` from the environment. Blank values count as unset.
pub fn get(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|config_value| config_value.trim().to_string())
        .filter(|config_value| !config_value.is_empty())
}

fn is_true(config_value: &str) -> bool {
    matches!(config_value, "true" | "1")
}

/// Whether `url` points at a replica on this machine.
pub fn is_local(url: &str) -> bool {
    let authority = url
        .split_once("://")
        .map_or(url, |(_, rest)| rest)
        .split(|c: char| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();

    let host = match authority.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or_default(),
        None => authority.split(':').next().unwrap_or_default(),
    };

    host == "localhost" || host == "::1" || host.starts_with("127.")
}
