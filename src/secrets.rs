//! Secret and hashlock generation for escrow settlement
//!
//! Every order is gated by one or more 32-byte secrets. A single-fill order
//! commits to `keccak256(secret)`; a multi-fill order commits to a Merkle root
//! over index-bound leaves so each resolver fill can be unlocked by exactly one
//! secret. Secret bytes are zeroized when the set is dropped and are never
//! printed by `Debug`.

use crate::error::{SwapError, SwapResult};

use rand::RngCore;
use sha3::{Digest, Keccak256};
use std::fmt;
use zeroize::Zeroizing;

/// Length of a secret and of every commitment, in bytes
pub const SECRET_LEN: usize = 32;

/// Leading bytes of the multi-fill root overwritten with the parts count
const PARTS_MARKER_BYTES: usize = 2;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Commitment of a single secret
pub fn hash_secret(secret: &[u8; SECRET_LEN]) -> [u8; 32] {
    keccak256(secret)
}

pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Commitment gating release of the escrowed funds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashLock {
    /// `keccak256(secret)` of the sole secret
    SingleFill([u8; 32]),
    /// Merkle root over all secret leaves, top 16 bits carry `count - 1`
    MultipleFills([u8; 32]),
}

impl HashLock {
    pub fn as_bytes(&self) -> &[u8; 32] {
        match self {
            HashLock::SingleFill(hash) => hash,
            HashLock::MultipleFills(root) => root,
        }
    }

    pub fn to_hex(&self) -> String {
        to_hex(self.as_bytes())
    }

    pub fn is_multiple_fills(&self) -> bool {
        matches!(self, HashLock::MultipleFills(_))
    }
}

impl fmt::Display for HashLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One secret and its commitment
pub struct SecretEntry {
    index: usize,
    secret: Zeroizing<[u8; SECRET_LEN]>,
    hash: [u8; 32],
}

impl SecretEntry {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn hash_hex(&self) -> String {
        to_hex(&self.hash)
    }

    /// Plaintext secret, `0x`-prefixed, for disclosure to the network.
    /// The returned buffer is wiped when dropped.
    pub fn reveal(&self) -> Zeroizing<String> {
        Zeroizing::new(to_hex(&self.secret[..]))
    }
}

impl fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretEntry")
            .field("index", &self.index)
            .field("secret", &"***REDACTED***")
            .field("hash", &self.hash_hex())
            .finish()
    }
}

/// All secrets of one order attempt plus the hashlock built from them
#[derive(Debug)]
pub struct SecretSet {
    entries: Vec<SecretEntry>,
    hash_lock: HashLock,
}

impl SecretSet {
    /// Build a set from known secret values, in index order
    pub fn from_secrets(secrets: Vec<[u8; SECRET_LEN]>) -> SwapResult<Self> {
        Self::build(secrets.into_iter().map(Zeroizing::new).collect())
    }

    fn build(secrets: Vec<Zeroizing<[u8; SECRET_LEN]>>) -> SwapResult<Self> {
        validate_count(secrets.len())?;

        let entries: Vec<SecretEntry> = secrets
            .into_iter()
            .enumerate()
            .map(|(index, secret)| {
                let hash = hash_secret(&secret);
                SecretEntry {
                    index,
                    secret,
                    hash,
                }
            })
            .collect();

        let hash_lock = if entries.len() == 1 {
            HashLock::SingleFill(entries[0].hash)
        } else {
            let hashes: Vec<[u8; 32]> = entries.iter().map(|e| e.hash).collect();
            HashLock::MultipleFills(multi_fill_root(&merkle_leaves(&hashes)))
        };

        Ok(Self { entries, hash_lock })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SecretEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecretEntry> {
        self.entries.iter()
    }

    pub fn hash_lock(&self) -> &HashLock {
        &self.hash_lock
    }

    /// Per-secret commitments in index order
    pub fn secret_hashes(&self) -> Vec<[u8; 32]> {
        self.entries.iter().map(|e| e.hash).collect()
    }
}

/// Generate `count` fresh secrets from the thread-local CSPRNG
pub fn generate_secrets(count: usize) -> SwapResult<SecretSet> {
    validate_count(count)?;

    let mut rng = rand::rng();
    let secrets = (0..count)
        .map(|_| {
            let mut secret = Zeroizing::new([0u8; SECRET_LEN]);
            rng.fill_bytes(&mut secret[..]);
            secret
        })
        .collect();

    SecretSet::build(secrets)
}

fn validate_count(count: usize) -> SwapResult<()> {
    if count < 1 {
        return Err(SwapError::Configuration(
            "secrets count must be at least 1".to_string(),
        ));
    }
    if count > (u16::MAX as usize) + 1 {
        return Err(SwapError::Configuration(format!(
            "secrets count {} exceeds the hashlock parts limit",
            count
        )));
    }
    Ok(())
}

/// Leaves bind each secret hash to its fill index:
/// `keccak256(uint64(index) ++ secret_hash)`
pub fn merkle_leaves(secret_hashes: &[[u8; 32]]) -> Vec<[u8; 32]> {
    secret_hashes
        .iter()
        .enumerate()
        .map(|(index, hash)| {
            let mut packed = [0u8; 8 + 32];
            packed[..8].copy_from_slice(&(index as u64).to_be_bytes());
            packed[8..].copy_from_slice(hash);
            keccak256(&packed)
        })
        .collect()
}

/// Commutative node hash
fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    let mut packed = [0u8; 64];
    packed[..32].copy_from_slice(lo);
    packed[32..].copy_from_slice(hi);
    keccak256(&packed)
}

/// Array-backed Merkle tree over sorted leaves; node `i` has children
/// `2i + 1` and `2i + 2`, leaves fill the tail in reverse.
///
/// Only reached from `SecretSet`, whose count validation guarantees leaves.
fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    debug_assert!(!leaves.is_empty(), "merkle tree needs at least one leaf");

    let mut sorted = leaves.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let mut tree = vec![[0u8; 32]; 2 * n - 1];
    let last = tree.len() - 1;
    for (i, leaf) in sorted.into_iter().enumerate() {
        tree[last - i] = leaf;
    }
    for i in (0..tree.len() - n).rev() {
        tree[i] = hash_pair(&tree[2 * i + 1], &tree[2 * i + 2]);
    }
    tree[0]
}

fn multi_fill_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    let mut root = merkle_root(leaves);
    let parts = (leaves.len() - 1) as u16;
    root[..PARTS_MARKER_BYTES].copy_from_slice(&parts.to_be_bytes());
    root
}
