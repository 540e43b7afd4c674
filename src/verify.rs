use xxhash_rust::xxh3::xxh3_64;

/// Texts longer than this are verified by hash instead of kept verbatim.
pub const HASH_THRESHOLD: usize = 1024;

/// Expected text of a selection, checked before it is overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl Verification {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Verification::ExactMatch(expected) => text == expected,
            Verification::Hash(expected) => xxh3_64(text.as_bytes()) == *expected,
        }
    }

    /// Verification for `text`, hashed when longer than [`HASH_THRESHOLD`].
    pub fn from_text(text: &str) -> Self {
        if text.len() > HASH_THRESHOLD {
            Verification::Hash(xxh3_64(text.as_bytes()))
        } else {
            Verification::ExactMatch(text.to_string())
        }
    }

    pub fn hash(&self) -> u64 {
        match self {
            Verification::Hash(hash) => *hash,
            Verification::ExactMatch(text) => xxh3_64(text.as_bytes()),
        }
    }

    /// Hash as 16 lowercase hex digits, the form plans store.
    pub fn hex(&self) -> String {
        format!("{:016x}", self.hash())
    }

    /// Parse a hash written as hex, with or without a `0x` prefix.
    pub fn parse_hex(input: &str) -> Option<Self> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        if digits.is_empty() || digits.len() > 16 {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Verification::Hash)
    }
}
