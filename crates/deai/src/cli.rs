use clap::{Args, Parser, Subcommand};
use deai_client::{ChatMessage, Options, Tag, TaggedValue};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_METHOD: &str = "load_model";

#[derive(Debug, Parser)]
#[command(about, version)]
pub struct Cli {
    /// URL of the replica, e.g. http://127.0.0.1:4943/
    #[arg(long, global = true)]
    pub replica_url: Option<String>,

    /// Textual principal of the target canister
    #[arg(long, global = true)]
    pub canister_id: Option<String>,

    /// Path to a PEM encoded secp256k1 private key; a fresh key is generated when absent
    #[arg(long, global = true)]
    pub private_key: Option<PathBuf>,

    /// Call as the anonymous principal instead of a generated key
    #[arg(long, global = true, conflicts_with = "private_key")]
    pub anonymous: bool,

    /// Fetch the replica's root key before calling (needed for local replicas)
    #[arg(long, global = true)]
    pub fetch_root_key: Option<bool>,

    /// Calls `load_model` without arguments when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Eq, PartialEq, Subcommand)]
pub enum Command {
    /// Call a canister method and print the decoded reply
    Call {
        method: String,

        /// Arguments of the form <tag>:<value>, e.g. text:Where is Poland?
        #[arg(value_parser = parse_tagged_value)]
        args: Vec<TaggedValue>,

        /// Make a read-only query call instead of an update call
        #[arg(long)]
        query: bool,

        /// Expected return types; `empty` expects no values
        #[arg(long = "returns", value_parser = parse_tag)]
        returns: Vec<Tag>,
    },
    /// Ask the model a single question
    Prompt {
        question: String,

        #[command(flatten)]
        session: SessionArgs,
    },
    /// Continue a conversation given as <role>:<content> messages
    Chat {
        #[arg(required = true, value_parser = parse_chat_message)]
        messages: Vec<ChatMessage>,

        #[command(flatten)]
        session: SessionArgs,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Call {
            method: DEFAULT_METHOD.to_string(),
            args: Vec::new(),
            query: false,
            returns: Vec::new(),
        }
    }
}

#[derive(Args, Clone, Copy, Debug, Eq, PartialEq)]
pub struct SessionArgs {
    /// Layers per forward call while the prompt is consumed
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..))]
    pub start_batch: u8,

    /// Layers per forward call while tokens are generated
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..))]
    pub step_batch: u8,

    /// Maximum number of generated tokens
    #[arg(long, default_value_t = 50)]
    pub max_steps: usize,
}

impl From<SessionArgs> for Options {
    fn from(args: SessionArgs) -> Self {
        Options {
            start_batch: args.start_batch,
            step_batch: args.step_batch,
            max_steps: args.max_steps,
        }
    }
}

fn parse_tagged_value(s: &str) -> Result<TaggedValue, String> {
    TaggedValue::parse(s).map_err(|err| err.to_string())
}

fn parse_tag(s: &str) -> Result<Tag, String> {
    Tag::from_name(s).map_err(|err| err.to_string())
}

fn parse_chat_message(s: &str) -> Result<ChatMessage, String> {
    ChatMessage::from_str(s).map_err(|err| err.to_string())
}
