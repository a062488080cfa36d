use crate::encoding::{self, Tag, TaggedValue};
use crate::error::Result;
use async_trait::async_trait;
use candid::parser::value::IDLArgs;
use ic_agent::agent::http_transport::ReqwestHttpReplicaV2Transport;
use ic_agent::export::Principal;
use ic_agent::{Agent, Identity};
use log::{debug, trace};
use std::sync::Arc;
use strum::Display;

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum CallKind {
    #[default]
    Update,
    Query,
}

/// A canister reachable through raw Candid calls.
#[async_trait(?Send)]
pub trait Canister {
    async fn call_raw(&self, method: &str, kind: CallKind, arg: Vec<u8>) -> Result<Vec<u8>>;

    /// Encodes `args`, performs the call and decodes the reply, checking it
    /// against `return_types` when given.
    async fn call(
        &self,
        method: &str,
        args: &[TaggedValue],
        kind: CallKind,
        return_types: Option<&[Tag]>,
    ) -> Result<IDLArgs> {
        let arg = encoding::encode(args)?;
        let response = self.call_raw(method, kind, arg).await?;
        encoding::decode(&response, return_types)
    }
}

/// An agent bound to a single canister.
pub struct Connection {
    pub agent: Agent,
    pub replica_url: String,
    pub canister_id: Principal,
}

impl Connection {
    pub async fn new(
        identity: Arc<dyn Identity>,
        replica_url: &str,
        canister_id: Principal,
        fetch_root_key: bool,
    ) -> Result<Self> {
        trace!("Connection::new");
        trace!("replica_url: {}", replica_url);
        trace!("canister_id: {}", canister_id);
        trace!("fetch_root_key: {}", fetch_root_key);

        let client = reqwest::Client::builder().use_rustls_tls().build()?;
        let replica_transport =
            ReqwestHttpReplicaV2Transport::create_with_client(replica_url, client)?;

        let agent = Agent::builder()
            .with_transport(replica_transport)
            .with_arc_identity(identity)
            .build()?;

        // Local replicas are not signed by the mainnet root key.
        if fetch_root_key {
            agent.fetch_root_key().await?;
        }

        Ok(Self {
            agent,
            replica_url: replica_url.to_string(),
            canister_id,
        })
    }

    /// Performs an update call and waits for the certified reply.
    pub async fn update_raw(&self, method: &str, arg: Vec<u8>) -> Result<Vec<u8>> {
        debug!("update {}.{}", self.canister_id, method);

        let response = self
            .agent
            .update(&self.canister_id, method)
            .with_arg(arg)
            .call_and_wait()
            .await?;

        trace!("response: {} bytes", response.len());
        Ok(response)
    }

    pub async fn query_raw(&self, method: &str, arg: Vec<u8>) -> Result<Vec<u8>> {
        debug!("query {}.{}", self.canister_id, method);

        let response = self
            .agent
            .query(&self.canister_id, method)
            .with_arg(arg)
            .call()
            .await?;

        trace!("response: {} bytes", response.len());
        Ok(response)
    }
}

#[async_trait(?Send)]
impl Canister for Connection {
    async fn call_raw(&self, method: &str, kind: CallKind, arg: Vec<u8>) -> Result<Vec<u8>> {
        match kind {
            CallKind::Update => self.update_raw(method, arg).await,
            CallKind::Query => self.query_raw(method, arg).await,
        }
    }
}
