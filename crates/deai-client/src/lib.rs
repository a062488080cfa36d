//! Calls into inference canisters on the Internet Computer.
//!
//! [`Connection`] composes an identity and a replica transport into an agent
//! bound to one canister. Arbitrary methods can be called through
//! [`Canister::call`]; the model session protocol is driven by
//! [`chat::prompt`] and [`chat::chat`].

pub mod chat;
pub mod connection;
pub mod encoding;
pub mod error;
pub mod identity;
pub mod session;

pub use chat::{ChatMessage, Role};
pub use connection::{CallKind, Canister, Connection};
pub use encoding::{decode, encode, Tag, TaggedValue};
pub use error::{Error, Result};
pub use identity::{identity, IdentitySource};
pub use session::{Backend, Options};

pub use candid::parser::value::{IDLArgs, IDLValue};
pub use ic_agent::export::Principal;
pub use ic_agent::Identity;
