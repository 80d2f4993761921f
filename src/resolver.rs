// resolver.rs - Name-service resolver seam
// Commands only see the NameResolver trait. The bundled StaticResolver answers
// from a JSON record table loaded at start-up; a chain-backed resolver would
// implement the same trait.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serenity::prelude::TypeMapKey;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("failed to read record table: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}

/// Everything the bot can report about one name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NameRecord {
    pub owner: Option<String>,
    pub resolver: Option<String>,
    pub ttl: Option<u64>,
    /// Coin ticker or numeric coin id -> address.
    pub addr: HashMap<String, String>,
    pub text: HashMap<String, String>,
    /// Reverse-resolution name.
    pub name: Option<String>,
    pub pubkey: Option<Pubkey>,
    pub contenthash: Option<String>,
    /// ERC-165 interface id -> implementer address.
    pub interfaces: HashMap<String, String>,
    /// ABI content type (1, 2, 4, 8) -> ABI data.
    pub abi: HashMap<String, String>,
    /// DNS owner name -> record type (mnemonic or number) -> record data.
    pub dns: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Pubkey {
    pub x: String,
    pub y: String,
}

impl NameRecord {
    /// Address for a coin, matching tickers case-insensitively.
    pub fn address(&self, coin: &str) -> Option<&str> {
        find_ignore_case(&self.addr, coin)
    }

    /// Implementer of an interface id; ids compare case-insensitively.
    pub fn interface(&self, interface_id: &str) -> Option<&str> {
        find_ignore_case(&self.interfaces, interface_id)
    }

    pub fn abi(&self, content_type: u32) -> Option<&str> {
        self.abi.get(&content_type.to_string()).map(String::as_str)
    }

    /// DNS record data, keyed in the table by either the type's mnemonic or
    /// its number.
    pub fn dns_record(&self, owner: &str, record_type: &str, type_code: u16) -> Option<&str> {
        let types = self
            .dns
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(owner))
            .map(|(_, types)| types)?;
        find_ignore_case(types, record_type).or_else(|| types.get(&type_code.to_string()).map(String::as_str))
    }
}

fn find_ignore_case<'a>(map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, value)| value.as_str())
}

#[async_trait]
pub trait NameResolver: Send + Sync {
    /// `Ok(None)` means the record does not exist.
    async fn lookup(&self, name: &str) -> Result<Option<NameRecord>, ResolverError>;
}

/// TypeMap key for the process-wide resolver handle.
pub struct ResolverKey;
impl TypeMapKey for ResolverKey {
    type Value = Arc<dyn NameResolver>;
}

#[derive(Debug, Default)]
pub struct StaticResolver {
    records: HashMap<String, NameRecord>,
}

impl StaticResolver {
    pub fn from_json(json: &str) -> Result<Self, ResolverError> {
        let raw: HashMap<String, NameRecord> = serde_json::from_str(json)?;
        let records = raw
            .into_iter()
            .map(|(name, record)| (name.to_lowercase(), record))
            .collect();
        Ok(Self { records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ResolverError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl NameResolver for StaticResolver {
    async fn lookup(&self, name: &str) -> Result<Option<NameRecord>, ResolverError> {
        Ok(self.records.get(&name.to_lowercase()).cloned())
    }
}
