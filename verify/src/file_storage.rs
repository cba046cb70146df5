//! File-backed block and proof storage readers.
//!
//! ## Block storage layout
//!
//! ```text
//! <chain dir>/
//!   index.dat      — chain height, u64 LE
//!   00000.dat      — batch file, blocks 1..=100
//!   00001.dat      — batch file, blocks 101..=200
//!   ...
//! ```
//!
//! Each batch file is a sequence of records. A record is the
//! serialized block (self-delimiting through its size field) followed
//! by its entity hash, its generation hash and its sub-cache merkle
//! roots (count-prefixed).
//!
//! ## Proof storage layout
//!
//! ```text
//! <proof dir>/
//!   index.dat           — latest statistics: epoch, point, height, hash
//!   proof_00000001.dat  — serialized proof for epoch 1
//!   ...
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use meridian_protocol::finalization::proof_storage::ProofStorage;
use meridian_protocol::model::block::Block;
use meridian_protocol::model::elements::BlockElement;
use meridian_protocol::model::finalization::{FinalizationProof, FinalizationStatistics};
use meridian_protocol::model::types::{
    FinalizationEpoch, FinalizationRound, Hash256, Height,
};
use meridian_protocol::model::ModelError;
use meridian_protocol::storage::{BlockStorage, StorageError};

const BLOCKS_PER_BATCH: u64 = 100;
const INDEX_FILE: &str = "index.dat";

fn corrupt(expected: usize, available: usize) -> StorageError {
    StorageError::Corrupt(ModelError::TruncatedEntity {
        expected,
        available,
    })
}

// ---------------------------------------------------------------------------
// FileBlockStorage
// ---------------------------------------------------------------------------

/// Block storage over an index file and per-batch block files.
pub struct FileBlockStorage {
    directory: PathBuf,
    chain_height: u64,
}

impl FileBlockStorage {
    /// Opens (or initializes) the storage in `directory`.
    pub fn open(directory: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(directory)?;

        let index_path = directory.join(INDEX_FILE);
        let chain_height = if index_path.exists() {
            let bytes = fs::read(&index_path)?;
            if bytes.len() != 8 {
                return Err(corrupt(8, bytes.len()));
            }
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes);
            u64::from_le_bytes(raw)
        } else {
            0
        };

        Ok(Self {
            directory: directory.to_path_buf(),
            chain_height,
        })
    }

    fn batch_path(&self, height: u64) -> PathBuf {
        let batch_index = (height - 1) / BLOCKS_PER_BATCH;
        self.directory.join(format!("{:05}.dat", batch_index))
    }

    fn write_index(&self) -> Result<(), StorageError> {
        fs::write(
            self.directory.join(INDEX_FILE),
            self.chain_height.to_le_bytes(),
        )?;
        Ok(())
    }

    fn read_record(bytes: &[u8], offset: usize) -> Result<(BlockElement, usize), StorageError> {
        let (block, block_size) = Block::deserialize(&bytes[offset..])?;
        let mut cursor = offset + block_size;

        let read_hash = |cursor: usize| -> Result<Hash256, StorageError> {
            let end = cursor + Hash256::SIZE;
            if bytes.len() < end {
                return Err(corrupt(end, bytes.len()));
            }
            let mut raw = [0u8; 32];
            raw.copy_from_slice(&bytes[cursor..end]);
            Ok(Hash256(raw))
        };

        let entity_hash = read_hash(cursor)?;
        cursor += Hash256::SIZE;
        let generation_hash = read_hash(cursor)?;
        cursor += Hash256::SIZE;

        if bytes.len() < cursor + 4 {
            return Err(corrupt(cursor + 4, bytes.len()));
        }
        let num_roots = u32::from_le_bytes([
            bytes[cursor],
            bytes[cursor + 1],
            bytes[cursor + 2],
            bytes[cursor + 3],
        ]) as usize;
        cursor += 4;

        let mut sub_cache_merkle_roots = Vec::with_capacity(num_roots);
        for _ in 0..num_roots {
            sub_cache_merkle_roots.push(read_hash(cursor)?);
            cursor += Hash256::SIZE;
        }

        // transaction annotations are recomputable and not persisted
        let mut element = BlockElement::new(block);
        element.entity_hash = entity_hash;
        element.generation_hash = generation_hash;
        element.sub_cache_merkle_roots = sub_cache_merkle_roots;
        Ok((element, cursor - offset))
    }

    fn write_record(element: &BlockElement, out: &mut Vec<u8>) {
        out.extend_from_slice(&element.block.serialize());
        out.extend_from_slice(&element.entity_hash.0);
        out.extend_from_slice(&element.generation_hash.0);
        out.extend_from_slice(&(element.sub_cache_merkle_roots.len() as u32).to_le_bytes());
        for root in &element.sub_cache_merkle_roots {
            out.extend_from_slice(&root.0);
        }
    }

    fn load_element(&self, height: Height) -> Result<BlockElement, StorageError> {
        let raw_height = height.unwrap();
        if raw_height == 0 || raw_height > self.chain_height {
            return Err(StorageError::BlockNotFound(height));
        }

        let bytes = fs::read(self.batch_path(raw_height))?;
        let target_index = ((raw_height - 1) % BLOCKS_PER_BATCH) as usize;

        let mut offset = 0usize;
        for _ in 0..target_index {
            let (_, consumed) = Self::read_record(&bytes, offset)?;
            offset += consumed;
        }

        Ok(Self::read_record(&bytes, offset)?.0)
    }
}

impl BlockStorage for FileBlockStorage {
    fn chain_height(&self) -> Height {
        Height(self.chain_height)
    }

    fn load_block(&self, height: Height) -> Result<Block, StorageError> {
        Ok(self.load_element(height)?.block)
    }

    fn load_block_element(&self, height: Height) -> Result<BlockElement, StorageError> {
        self.load_element(height)
    }

    fn load_hashes_from(
        &self,
        height: Height,
        max_hashes: usize,
    ) -> Result<Vec<Hash256>, StorageError> {
        let start = height.unwrap();
        if start == 0 || start > self.chain_height {
            return Err(StorageError::BlockNotFound(height));
        }

        let end = self.chain_height.min(start + max_hashes as u64 - 1);
        (start..=end)
            .map(|raw| Ok(self.load_element(Height(raw))?.entity_hash))
            .collect()
    }

    fn save_block(&mut self, element: BlockElement) -> Result<(), StorageError> {
        let height = element.block.header.height;
        if height.unwrap() != self.chain_height + 1 {
            return Err(StorageError::OutOfOrderSave {
                height,
                chain_height: Height(self.chain_height),
            });
        }

        let mut record = Vec::new();
        Self::write_record(&element, &mut record);

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.batch_path(height.unwrap()))?;
        file.write_all(&record)?;

        self.chain_height += 1;
        self.write_index()
    }

    fn drop_blocks_after(&mut self, height: Height) -> Result<(), StorageError> {
        let new_height = height.unwrap().min(self.chain_height);
        if new_height == self.chain_height {
            return Ok(());
        }

        // rewrite the batch containing the new tip, drop later batches
        let last_kept_batch = if new_height == 0 {
            None
        } else {
            Some((new_height - 1) / BLOCKS_PER_BATCH)
        };

        if let Some(batch_index) = last_kept_batch {
            let first_height_in_batch = batch_index * BLOCKS_PER_BATCH + 1;
            let mut kept = Vec::new();
            for raw in first_height_in_batch..=new_height {
                let element = self.load_element(Height(raw))?;
                Self::write_record(&element, &mut kept);
            }
            fs::write(self.batch_path(first_height_in_batch), kept)?;
        }

        let first_dropped_batch = last_kept_batch.map(|index| index + 1).unwrap_or(0);
        let last_batch = (self.chain_height - 1) / BLOCKS_PER_BATCH;
        for batch_index in first_dropped_batch..=last_batch {
            let path = self
                .directory
                .join(format!("{:05}.dat", batch_index));
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        self.chain_height = new_height;
        self.write_index()
    }
}

// ---------------------------------------------------------------------------
// FileProofStorage
// ---------------------------------------------------------------------------

/// Proof storage over an index file and per-epoch proof files.
pub struct FileProofStorage {
    directory: PathBuf,
}

impl FileProofStorage {
    /// Opens (or initializes) the storage in `directory`.
    pub fn open(directory: &Path) -> Result<Self, StorageError> {
        fs::create_dir_all(directory)?;
        Ok(Self {
            directory: directory.to_path_buf(),
        })
    }

    fn proof_path(&self, epoch: FinalizationEpoch) -> PathBuf {
        self.directory
            .join(format!("proof_{:08}.dat", epoch.unwrap()))
    }

    fn read_statistics(&self) -> Result<FinalizationStatistics, StorageError> {
        let index_path = self.directory.join(INDEX_FILE);
        if !index_path.exists() {
            return Ok(FinalizationStatistics::default());
        }

        let bytes = fs::read(index_path)?;
        if bytes.len() != 48 {
            return Err(corrupt(48, bytes.len()));
        }

        let epoch = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let point = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut height_raw = [0u8; 8];
        height_raw.copy_from_slice(&bytes[8..16]);
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[16..48]);

        Ok(FinalizationStatistics {
            round: FinalizationRound::new(epoch, point),
            height: Height(u64::from_le_bytes(height_raw)),
            hash: Hash256(hash),
        })
    }

    fn write_statistics(&self, statistics: &FinalizationStatistics) -> Result<(), StorageError> {
        let mut bytes = Vec::with_capacity(48);
        bytes.extend_from_slice(&statistics.round.epoch.unwrap().to_le_bytes());
        bytes.extend_from_slice(&statistics.round.point.unwrap().to_le_bytes());
        bytes.extend_from_slice(&statistics.height.unwrap().to_le_bytes());
        bytes.extend_from_slice(&statistics.hash.0);
        fs::write(self.directory.join(INDEX_FILE), bytes)?;
        Ok(())
    }
}

impl ProofStorage for FileProofStorage {
    fn statistics(&self) -> FinalizationStatistics {
        self.read_statistics().unwrap_or_else(|error| {
            tracing::warn!(%error, "failed to read proof statistics, assuming empty");
            FinalizationStatistics::default()
        })
    }

    fn load_proof_at_epoch(
        &self,
        epoch: FinalizationEpoch,
    ) -> Result<FinalizationProof, StorageError> {
        let path = self.proof_path(epoch);
        if !path.exists() {
            return Err(StorageError::ProofNotFound(format!("epoch {}", epoch)));
        }

        let bytes = fs::read(path)?;
        let (proof, _) = FinalizationProof::deserialize(&bytes)?;
        Ok(proof)
    }

    fn load_proof_at_height(&self, height: Height) -> Result<FinalizationProof, StorageError> {
        let statistics = self.read_statistics()?;
        for raw_epoch in (1..=statistics.round.epoch.unwrap()).rev() {
            let Ok(proof) = self.load_proof_at_epoch(FinalizationEpoch(raw_epoch)) else {
                continue;
            };
            if proof.height == height {
                return Ok(proof);
            }
        }

        Err(StorageError::ProofNotFound(format!("height {}", height)))
    }

    fn save_proof(&mut self, proof: &FinalizationProof) -> Result<(), StorageError> {
        fs::write(self.proof_path(proof.round.epoch), proof.serialize())?;
        self.write_statistics(&FinalizationStatistics {
            round: proof.round,
            height: proof.height,
            hash: proof.hash,
        })
    }
}
