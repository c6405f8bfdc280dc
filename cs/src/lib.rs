//! ContextStore - chunked document store with similarity retrieval
//!
//! Splits documents into overlapping fixed-size windows, persists them on
//! disk and ranks them against free-text queries so prompt builders can pull
//! in only the most relevant parts of a large specification.
//!
//! # Architecture
//!
//! ```text
//! .contextstore/
//! ├── index.jsonl      # chunk metadata, one line per chunk
//! └── chunks/
//!     ├── 0001.txt
//!     ├── 0002.txt
//!     └── ...
//! ```
//!
//! The store holds exactly one indexed corpus at a time: [`ContextStore::clear`]
//! followed by [`ContextStore::index`] replaces whatever was there before.
//!
//! # Example
//!
//! ```ignore
//! use contextstore::{ContextStore, chunk};
//!
//! let store = ContextStore::open(".contextstore")?;
//! store.clear()?;
//! store.index("spec.txt", &chunk(&text, 800, 200)?)?;
//! let ranked = store.query("timeline and milestones", 5)?;
//! ```

mod chunk;
pub mod cli;
pub mod config;
mod similarity;
mod store;

pub use chunk::{Chunk, ChunkError, chunk};
pub use similarity::{cosine_similarity, term_vector};
pub use store::{ChunkMeta, ContextStats, ContextStore, RankedChunk};

/// Default chunk size (characters)
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// Default overlap between chunks (characters)
pub const DEFAULT_OVERLAP: usize = 200;
