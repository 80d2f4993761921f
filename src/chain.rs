// chain.rs - Offline Metrix / MNS helpers
// Everything here is pure computation: digests, the MNS namehash and the
// conversion between base58 MRX addresses and their 20-byte hex form. None of
// it talks to a node.

use std::fmt;
use std::str::FromStr;

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512};
use sha3::Keccak256;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("unknown network '{0}'")]
    UnknownNetwork(String),

    #[error("unknown hash algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    #[error("invalid hex data")]
    InvalidHex,

    #[error("invalid address")]
    InvalidAddress,
}

// ============================================================================
// NETWORK
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    #[default]
    MainNet,
    TestNet,
}

impl Network {
    /// Base58 version byte of a pay-to-pubkey-hash address.
    pub fn pubkey_address_version(self) -> u8 {
        match self {
            Network::MainNet => 0x32,
            Network::TestNet => 0x6e,
        }
    }
}

impl FromStr for Network {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::MainNet),
            "testnet" | "test" => Ok(Network::TestNet),
            _ => Err(ChainError::UnknownNetwork(s.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::MainNet => write!(f, "MainNet"),
            Network::TestNet => write!(f, "TestNet"),
        }
    }
}

// ============================================================================
// HASHING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Namehash,
    Keccak256,
    Sha256,
    Sha512,
    Ripemd160,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Namehash => "namehash",
            HashAlgorithm::Keccak256 => "keccak256",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Ripemd160 => "ripemd160",
        }
    }

    /// `0x`-prefixed lowercase hex digest of `data`. Namehash treats the
    /// bytes as a dotted name.
    pub fn digest_hex(self, data: &[u8]) -> String {
        let digest = match self {
            HashAlgorithm::Namehash => namehash(&String::from_utf8_lossy(data)).to_vec(),
            HashAlgorithm::Keccak256 => Keccak256::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
            HashAlgorithm::Ripemd160 => Ripemd160::digest(data).to_vec(),
        };
        format!("0x{}", hex::encode(digest))
    }
}

impl FromStr for HashAlgorithm {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "namehash" => Ok(HashAlgorithm::Namehash),
            "keccak256" => Ok(HashAlgorithm::Keccak256),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "ripemd160" => Ok(HashAlgorithm::Ripemd160),
            _ => Err(ChainError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// How user-supplied hash input is to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputEncoding {
    #[default]
    Utf8,
    Hex,
}

impl InputEncoding {
    pub fn decode(self, data: &str) -> Result<Vec<u8>, ChainError> {
        match self {
            InputEncoding::Utf8 => Ok(data.as_bytes().to_vec()),
            InputEncoding::Hex => {
                let digits = data.strip_prefix("0x").unwrap_or(data);
                if digits.is_empty() {
                    return Err(ChainError::InvalidHex);
                }
                hex::decode(digits).map_err(|_| ChainError::InvalidHex)
            }
        }
    }
}

impl FromStr for InputEncoding {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(InputEncoding::Utf8),
            "hex" => Ok(InputEncoding::Hex),
            _ => Err(ChainError::UnknownEncoding(s.to_string())),
        }
    }
}

/// MNS/ENS namehash: fold keccak256 over the labels from the root down.
/// The empty name hashes to 32 zero bytes.
pub fn namehash(name: &str) -> [u8; 32] {
    let mut node = [0u8; 32];
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = Keccak256::digest(label.as_bytes());
        let mut hasher = Keccak256::new();
        hasher.update(node);
        hasher.update(label_hash);
        node.copy_from_slice(&hasher.finalize());
    }
    node
}

// ============================================================================
// ADDRESSES
// ============================================================================

/// Base58check MRX address -> 40 lowercase hex digits (no `0x`).
pub fn to_hex_address(network: Network, address: &str) -> Result<String, ChainError> {
    let version = network.pubkey_address_version();
    let payload = bs58::decode(address)
        .with_check(Some(version))
        .into_vec()
        .map_err(|_| ChainError::InvalidAddress)?;
    match payload.split_first() {
        Some((_, hash)) if hash.len() == 20 => Ok(hex::encode(hash)),
        _ => Err(ChainError::InvalidAddress),
    }
}

/// 20-byte hex address (with or without `0x`) -> base58check MRX address.
pub fn from_hex_address(network: Network, hex_address: &str) -> Result<String, ChainError> {
    let digits = hex_address.strip_prefix("0x").unwrap_or(hex_address);
    let hash = hex::decode(digits).map_err(|_| ChainError::InvalidAddress)?;
    if hash.len() != 20 {
        return Err(ChainError::InvalidAddress);
    }
    Ok(bs58::encode(hash)
        .with_check_version(network.pubkey_address_version())
        .into_string())
}

/// Whether `input` looks like a 20-byte hex address.
pub fn is_hex_address(input: &str) -> bool {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit())
}
