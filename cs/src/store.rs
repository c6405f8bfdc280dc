//! Core ContextStore implementation

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::chunk::Chunk;
use crate::similarity::{cosine_similarity, term_vector};

/// Unique identifier for a chunk within the store
pub type ChunkId = String;

const INDEX_FILE: &str = "index.jsonl";
const CHUNKS_DIR: &str = "chunks";

/// Metadata for a single stored chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// Unique chunk ID
    pub chunk_id: ChunkId,
    /// Source document name
    pub source: String,
    /// Position of the chunk within its source
    pub chunk_index: usize,
    /// Character offset in the source
    pub char_start: usize,
    /// Character end (exclusive) in the source
    pub char_end: usize,
    /// Content hash for staleness detection
    pub content_hash: String,
    /// Creation timestamp (unix ms)
    pub created_at: i64,
}

/// A chunk returned by [`ContextStore::query`], most relevant first
#[derive(Debug, Clone, PartialEq)]
pub struct RankedChunk {
    pub chunk_id: ChunkId,
    pub source: String,
    pub text: String,
    /// Cosine similarity to the query in [0, 1]
    pub score: f32,
}

/// Statistics for the indexed corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Number of chunks
    pub chunk_count: usize,
    /// Total characters stored (overlaps counted twice)
    pub total_chars: usize,
    /// Number of distinct sources
    pub source_count: usize,
}

/// The main context store
pub struct ContextStore {
    /// Base path for storage
    base_path: PathBuf,
}

impl ContextStore {
    /// Open or create a context store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(base_path.join(CHUNKS_DIR)).context("Failed to create store directory")?;
        debug!(?base_path, "Opened context store");
        Ok(Self { base_path })
    }

    /// Path the store lives under
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    /// Remove every indexed chunk
    pub fn clear(&self) -> Result<()> {
        let chunks_path = self.base_path.join(CHUNKS_DIR);
        if chunks_path.exists() {
            fs::remove_dir_all(&chunks_path).context("Failed to remove chunk directory")?;
        }
        fs::create_dir_all(&chunks_path)?;

        let index_path = self.base_path.join(INDEX_FILE);
        if index_path.exists() {
            fs::remove_file(&index_path).context("Failed to remove index")?;
        }
        info!(path = %self.base_path.display(), "Cleared context store");
        Ok(())
    }

    /// Append chunks of `source` to the index, returning how many were stored
    pub fn index(&self, source: &str, chunks: &[Chunk]) -> Result<usize> {
        debug!(%source, chunk_count = chunks.len(), "index: called");
        let chunks_path = self.base_path.join(CHUNKS_DIR);
        let index_path = self.base_path.join(INDEX_FILE);

        let mut chunk_num = self.read_index()?.len();
        let mut index_file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .context("Failed to open index")?;

        for chunk in chunks {
            chunk_num += 1;
            let chunk_id = format!("{:04}", chunk_num);
            fs::write(chunks_path.join(format!("{}.txt", chunk_id)), &chunk.text)?;

            let meta = ChunkMeta {
                chunk_id,
                source: source.to_string(),
                chunk_index: chunk.index,
                char_start: chunk.offset,
                char_end: chunk.offset + chunk.char_len(),
                content_hash: format!("{:x}", content_hash(chunk.text.as_bytes())),
                created_at: chrono::Utc::now().timestamp_millis(),
            };

            let line = serde_json::to_string(&meta)?;
            writeln!(index_file, "{}", line)?;
        }

        info!(%source, chunk_count = chunks.len(), "Indexing complete");
        Ok(chunks.len())
    }

    /// Rank stored chunks against `text`, returning at most `top_k`
    ///
    /// Ties keep index order, so a query with no matching terms returns the
    /// first `top_k` chunks of the corpus.
    pub fn query(&self, text: &str, top_k: usize) -> Result<Vec<RankedChunk>> {
        debug!(query_len = text.len(), top_k, "query: called");
        let query_vector = term_vector(text);

        let mut ranked = Vec::new();
        for meta in self.read_index()? {
            let content = self.read_chunk_file(&meta.chunk_id)?;
            let score = cosine_similarity(&query_vector, &term_vector(&content));
            ranked.push(RankedChunk {
                chunk_id: meta.chunk_id,
                source: meta.source,
                text: content,
                score,
            });
        }

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);
        debug!(result_count = ranked.len(), "query: done");
        Ok(ranked)
    }

    /// Get the full content of a chunk
    pub fn get_chunk(&self, chunk_id: &str) -> Result<String> {
        self.read_chunk_file(chunk_id)
            .context(format!("Chunk not found: {}", chunk_id))
    }

    /// Get statistics for the indexed corpus
    pub fn stats(&self) -> Result<ContextStats> {
        let mut stats = ContextStats::default();
        let mut sources = HashSet::new();

        for meta in self.read_index()? {
            stats.chunk_count += 1;
            stats.total_chars += meta.char_end - meta.char_start;
            sources.insert(meta.source);
        }

        stats.source_count = sources.len();
        Ok(stats)
    }

    fn read_chunk_file(&self, chunk_id: &str) -> Result<String> {
        let chunk_path = self.base_path.join(CHUNKS_DIR).join(format!("{}.txt", chunk_id));
        Ok(fs::read_to_string(&chunk_path)?)
    }

    fn read_index(&self) -> Result<Vec<ChunkMeta>> {
        let index_path = self.base_path.join(INDEX_FILE);
        if !index_path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&index_path)?);
        let mut metas = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            metas.push(serde_json::from_str(&line).context("Corrupt index line")?);
        }
        Ok(metas)
    }
}

/// Simple hash for content (not cryptographic, just for change detection)
fn content_hash(data: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    hasher.finish()
}
