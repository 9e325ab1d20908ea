use crate::result::Error;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;
use std::str::FromStr;

const DOMAIN: &[u8] = b"BRAID_AST_OBFUSCATION";

/// A 256-bit seed driving every pseudo-random choice of a run.
///
/// Written as `0x` followed by 64 hex digits; the prefix is optional when parsing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    inner: [u8; 32],
}

impl Seed {
    /// Generate a new random 256-bit seed
    pub fn generate() -> Self {
        let mut inner = [0u8; 32];
        rand::rng().fill_bytes(&mut inner);
        Self { inner }
    }

    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let digits = hex.strip_prefix("0x").unwrap_or(hex);
        if digits.len() != 64 {
            return Err(Error::InvalidSeedLength(digits.len()));
        }
        let mut inner = [0u8; 32];
        hex::decode_to_slice(digits, &mut inner).map_err(|_| Error::InvalidSeedHex)?;
        Ok(Self { inner })
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.inner))
    }

    /// RNG for a whole run. The same seed always yields the same tree.
    pub fn create_deterministic_rng(&self) -> StdRng {
        StdRng::from_seed(self.digest(&[]))
    }

    /// RNG for one named consumer of the seed, such as a single transform.
    ///
    /// Streams with different labels are independent: adding a transform to a run leaves the
    /// choices of the others unchanged.
    pub fn stream(&self, label: &str) -> StdRng {
        StdRng::from_seed(self.digest(label.as_bytes()))
    }

    fn digest(&self, label: &[u8]) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(DOMAIN);
        hasher.update(self.inner);
        hasher.update(label);
        hasher.finalize().into()
    }

    /// Hash identifying the seed in logs without revealing it.
    pub fn hash(&self) -> [u8; 32] {
        Sha3_256::digest(self.inner).into()
    }

    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash()))
    }
}

impl FromStr for Seed {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("hash", &self.hash_hex()).finish()
    }
}
