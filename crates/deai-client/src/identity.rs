use crate::error::{Error, Result};
use ic_agent::identity::{AnonymousIdentity, BasicIdentity, Secp256k1Identity};
use ic_agent::Identity;
use log::info;
use ring::rand::SystemRandom;
use ring::signature::Ed25519KeyPair;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the identity that signs calls comes from.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum IdentitySource {
    /// A secp256k1 private key in PEM format.
    PemFile(PathBuf),
    Anonymous,
    /// A fresh Ed25519 key pair, discarded when the process exits.
    #[default]
    Ephemeral,
}

pub fn identity(source: &IdentitySource) -> Result<Arc<dyn Identity>> {
    match source {
        IdentitySource::PemFile(path) => {
            info!("Using identity for private key at {}", path.display());
            let identity = Secp256k1Identity::from_pem_file(path)?;
            Ok(Arc::new(identity))
        }
        IdentitySource::Anonymous => {
            info!("Using anonymous identity");
            Ok(Arc::new(AnonymousIdentity {}))
        }
        IdentitySource::Ephemeral => {
            info!("No private key configured, generating an ephemeral identity");
            let key_pair = ephemeral_key_pair()?;
            Ok(Arc::new(BasicIdentity::from_key_pair(key_pair)))
        }
    }
}

fn ephemeral_key_pair() -> Result<Ed25519KeyPair> {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng)
        .map_err(|err| Error::KeyGeneration(err.to_string()))?;
    Ed25519KeyPair::from_pkcs8(pkcs8.as_ref())
        .map_err(|err| Error::KeyGeneration(err.to_string()))
}
