//! # Fingerprint Module
//!
//! The compact visual descriptors stored with every catalogue item.
//!
//! Two generations of descriptor exist and are kept apart by a tag:
//! - **dHash** - a bit string of brightness gradients (system of record)
//! - **HSV-mean** - a mean-centred vector of hue/saturation pairs (legacy)
//!
//! Converting between them is a data migration (re-extract from the photo),
//! never a reinterpretation of the stored value.

pub mod codec;

use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which descriptor a fingerprint holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FingerprintKind {
    /// Difference hash over a (size+1) x size grid
    #[serde(rename = "dhash")]
    DHash,
    /// Blurred hue/saturation vector with the mean removed
    #[serde(rename = "hsv-mean")]
    HsvMean,
}

impl FingerprintKind {
    /// Storage tag for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintKind::DHash => "dhash",
            FingerprintKind::HsvMean => "hsv-mean",
        }
    }

    /// Grid size used when the caller does not pick one
    pub fn default_size(&self) -> u32 {
        match self {
            FingerprintKind::DHash => 8,
            FingerprintKind::HsvMean => 32,
        }
    }

    /// Number of entries (bits or floats) produced for a grid size
    pub fn expected_len(&self, size: u32) -> usize {
        let cells = (size as usize) * (size as usize);
        match self {
            FingerprintKind::DHash => cells,
            FingerprintKind::HsvMean => cells * 2,
        }
    }

    /// Get a human-readable description of the descriptor
    pub fn description(&self) -> &'static str {
        match self {
            FingerprintKind::DHash => {
                "Difference Hash (dHash) - Compares brightness gradients between neighbouring pixels"
            }
            FingerprintKind::HsvMean => {
                "HSV mean (legacy) - Blurred hue and saturation with the overall tint removed"
            }
        }
    }
}

impl std::fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FingerprintKind::DHash => write!(f, "dHash"),
            FingerprintKind::HsvMean => write!(f, "HSV-mean"),
        }
    }
}

impl FromStr for FingerprintKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dhash" | "difference" => Ok(FingerprintKind::DHash),
            "hsv-mean" | "hsv" => Ok(FingerprintKind::HsvMean),
            other => Err(CodecError::UnknownKind(other.to_string())),
        }
    }
}

/// A packed dHash bit string
///
/// Bits are stored most-significant first in generation order
/// (row-major, left to right, top to bottom).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DHashBits {
    bytes: Vec<u8>,
    bit_count: u32,
}

impl DHashBits {
    /// Pack a sequence of bits forming a square grid
    ///
    /// Fails with `InvalidLength` unless the bit count is a nonzero perfect
    /// square, the only shapes the hex form can carry.
    pub fn from_bits<I>(bits: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = bool>,
    {
        let hash = Self::pack(bits);
        let count = hash.bit_count as usize;
        let side = square_side(count);
        if count == 0 || side * side != count {
            return Err(CodecError::InvalidLength { length: count });
        }
        Ok(hash)
    }

    /// Pack bits whose count the caller already knows is square
    pub(crate) fn pack<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut bytes = Vec::new();
        let mut current_byte: u8 = 0;
        let mut bit_position = 0;
        let mut bit_count = 0;

        for bit in bits {
            if bit {
                current_byte |= 1 << (7 - bit_position);
            }

            bit_position += 1;
            bit_count += 1;

            if bit_position == 8 {
                bytes.push(current_byte);
                current_byte = 0;
                bit_position = 0;
            }
        }

        if bit_position > 0 {
            bytes.push(current_byte);
        }

        Self { bytes, bit_count }
    }

    /// Build a 64-bit (8x8) hash from its integer form
    pub fn from_u64(value: u64) -> Self {
        Self {
            bytes: value.to_be_bytes().to_vec(),
            bit_count: 64,
        }
    }

    /// Build a 64-bit hash from the signed pattern a BIGINT column holds
    pub fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    /// The hash as an integer, for 64-bit hashes only
    pub fn as_u64(&self) -> Option<u64> {
        let bytes: [u8; 8] = self.bytes.as_slice().try_into().ok()?;
        (self.bit_count == 64).then(|| u64::from_be_bytes(bytes))
    }

    /// The same bits reinterpreted as a signed integer
    pub fn as_i64(&self) -> Option<i64> {
        self.as_u64().map(|v| v as i64)
    }

    /// Read one bit
    pub fn bit(&self, index: u32) -> bool {
        if index >= self.bit_count {
            return false;
        }
        let byte = self.bytes[(index / 8) as usize];
        (byte >> (7 - index % 8)) & 1 == 1
    }

    /// Iterate the bits in generation order
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_count).map(move |i| self.bit(i))
    }

    /// Total number of bits
    pub fn bit_count(&self) -> u32 {
        self.bit_count
    }

    /// Side length of the comparison grid (8 for a 64-bit hash)
    pub fn hash_size(&self) -> u32 {
        square_side(self.bit_count as usize) as u32
    }

    /// Packed bytes; the final byte is zero-padded
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Count of set bits
    pub fn count_ones(&self) -> u32 {
        self.bytes.iter().map(|b| b.count_ones()).sum()
    }
}

/// Largest `side` with `side * side <= n`
pub(crate) fn square_side(n: usize) -> usize {
    let mut side = (n as f64).sqrt() as usize;
    while side * side > n {
        side -= 1;
    }
    while (side + 1) * (side + 1) <= n {
        side += 1;
    }
    side
}

/// A visual fingerprint of either generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "StoredFingerprint", try_from = "StoredFingerprint")]
pub enum Fingerprint {
    DHash(DHashBits),
    HsvMean(Vec<f64>),
}

impl Fingerprint {
    /// The tag of this fingerprint
    pub fn kind(&self) -> FingerprintKind {
        match self {
            Fingerprint::DHash(_) => FingerprintKind::DHash,
            Fingerprint::HsvMean(_) => FingerprintKind::HsvMean,
        }
    }

    /// Number of bits (dHash) or values (HSV-mean)
    pub fn len(&self) -> usize {
        match self {
            Fingerprint::DHash(bits) => bits.bit_count() as usize,
            Fingerprint::HsvMean(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text form for storage and transfer
    pub fn encode(&self) -> String {
        codec::encode(self)
    }

    /// Parse the text form of a fingerprint of a known kind
    pub fn decode(kind: FingerprintKind, text: &str) -> Result<Self, CodecError> {
        codec::decode(kind, text)
    }
}

/// Serialized shape of a fingerprint: `{"kind": "dhash", "value": "ffff..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFingerprint {
    pub kind: FingerprintKind,
    pub value: String,
}

impl From<Fingerprint> for StoredFingerprint {
    fn from(fingerprint: Fingerprint) -> Self {
        Self {
            kind: fingerprint.kind(),
            value: fingerprint.encode(),
        }
    }
}

impl TryFrom<StoredFingerprint> for Fingerprint {
    type Error = CodecError;

    fn try_from(stored: StoredFingerprint) -> Result<Self, Self::Error> {
        Fingerprint::decode(stored.kind, &stored.value)
    }
}
