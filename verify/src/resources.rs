//! Resources directory layout and network configuration.
//!
//! A resources directory holds everything the tool needs to replay a
//! node's chain offline:
//!
//! ```text
//! <resources>/
//!   network.json — network identifier and generation hash seed
//!   chain/       — file-backed block storage
//!   proof/       — file-backed proof storage
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use meridian_protocol::model::types::{GenerationHashSeed, Hash256, NetworkIdentifier};

/// Parsed `network.json`.
#[derive(Debug, Deserialize)]
struct RawNetworkConfiguration {
    network: u8,
    generation_hash_seed: String,
}

/// Network parameters of a resources directory.
#[derive(Debug)]
pub struct NetworkConfiguration {
    /// Network identifier byte.
    pub network: NetworkIdentifier,
    /// Generation hash seed transactions were signed against.
    pub generation_hash_seed: GenerationHashSeed,
}

/// Loads `<resources>/network.json`.
pub fn load_network_configuration(resources: &Path) -> anyhow::Result<NetworkConfiguration> {
    let path = resources.join("network.json");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let raw: RawNetworkConfiguration =
        serde_json::from_str(&contents).with_context(|| format!("cannot parse {}", path.display()))?;

    let generation_hash_seed = Hash256::from_hex(&raw.generation_hash_seed)
        .with_context(|| "generation_hash_seed is not a 32-byte hex string")?;

    Ok(NetworkConfiguration {
        network: NetworkIdentifier(raw.network),
        generation_hash_seed,
    })
}

/// Path of the block storage inside `resources`.
pub fn chain_directory(resources: &Path) -> PathBuf {
    resources.join("chain")
}

/// Path of the proof storage inside `resources`.
pub fn proof_directory(resources: &Path) -> PathBuf {
    resources.join("proof")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_well_formed_configuration() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("network.json"),
            format!(
                r#"{{ "network": 104, "generation_hash_seed": "{}" }}"#,
                hex::encode([0x57u8; 32])
            ),
        )
        .unwrap();

        let configuration = load_network_configuration(dir.path()).unwrap();

        assert_eq!(NetworkIdentifier(104), configuration.network);
        assert_eq!(Hash256([0x57; 32]), configuration.generation_hash_seed);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();

        assert!(load_network_configuration(dir.path()).is_err());
    }

    #[test]
    fn malformed_seed_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("network.json"),
            r#"{ "network": 104, "generation_hash_seed": "not-hex" }"#,
        )
        .unwrap();

        assert!(load_network_configuration(dir.path()).is_err());
    }
}
