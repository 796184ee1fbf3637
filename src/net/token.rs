use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

const TOKEN_BYTES: usize = 16;
const TOKEN_HEX_LEN: usize = TOKEN_BYTES * 2;
const BEARER_PREFIX: &str = "Bearer ";

/// Opaque bearer credential identifying a player
/// Uses CSPRNG for cryptographic security
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerToken(String);

impl PlayerToken {
    /// Generate a new cryptographically secure token
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(&bytes)
    }

    /// Hex-encode raw bytes into a token
    pub fn from_bytes(bytes: &[u8; TOKEN_BYTES]) -> Self {
        let mut hex = String::with_capacity(TOKEN_HEX_LEN);
        for byte in bytes {
            hex.push_str(&format!("{byte:02x}"));
        }
        Self(hex)
    }

    /// Validate a client-supplied token: exactly 32 hex digits
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.len() != TOKEN_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self(raw.to_ascii_lowercase()))
    }

    /// Extract a token from an `Authorization` header value
    pub fn from_bearer(header: &str) -> Option<Self> {
        header.strip_prefix(BEARER_PREFIX).and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of fresh player tokens
pub trait TokenSource: Send + Sync {
    fn next_token(&mut self) -> PlayerToken;
}

/// Default source backed by the thread-local CSPRNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn next_token(&mut self) -> PlayerToken {
        PlayerToken::generate()
    }
}

/// Predictable tokens (`000...0`, `000...1`, ...) for tests and replays
#[derive(Debug, Default, Clone)]
pub struct SequentialTokenSource {
    next: u128,
}

impl SequentialTokenSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at an arbitrary counter value
    pub fn starting_at(next: u128) -> Self {
        Self { next }
    }
}

impl TokenSource for SequentialTokenSource {
    fn next_token(&mut self) -> PlayerToken {
        let token = PlayerToken::from_bytes(&self.next.to_be_bytes());
        self.next = self.next.wrapping_add(1);
        token
    }
}
