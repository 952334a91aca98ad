use serde::{Deserialize, Serialize};

/// Encrypted (input, output) pair as stored in both sinks
/// Fields are `nonce || ciphertext || tag`, base64 encoded on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Encrypted raw measurement string
    #[serde(with = "base64_bytes")]
    pub input: Vec<u8>,
    /// Encrypted JSON array of package totals
    #[serde(with = "base64_bytes")]
    pub output: Vec<u8>,
}

/// Decrypted view of a [`HistoryRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub input: String,
    pub output: Vec<u64>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
