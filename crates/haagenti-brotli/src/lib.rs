//! # Haagenti Brotli
//!
//! Block segmentation and metablock assembly for Brotli (RFC 7932).
//!
//! Given the command stream produced by a match finder, this crate decides
//! how literals, insert-and-copy commands and distances are split into
//! blocks, which statistical model (block type) each block uses, and which
//! histograms the entropy coder should build codes from.
//!
//! ## Features
//!
//! - **Greedy splitting**: one-pass online splitter with up to 13 literal
//!   contexts, used at lower effort levels
//! - **Coarse-to-fine splitting**: sampled seed histograms refined by
//!   dynamic programming, then clustered
//! - **Distance search**: picks the postfix bits and direct-code count that
//!   minimise distance coding cost, rewriting commands in place
//! - **Histogram clustering**: merges per-context histograms down to at
//!   most 256
//!
//! ## Quick Start
//!
//! ```rust
//! use haagenti_brotli::{
//!     build_meta_block, Command, ContextMode, EncoderParams, MetaBlockSplit, SourceWindow,
//! };
//!
//! let data = b"abracadabra, abracadabra, abracadabra!".repeat(64);
//! let mask = data.len().next_power_of_two() - 1;
//! let mut ring = data.clone();
//! ring.resize(mask + 1, 0);
//!
//! let mut params = EncoderParams::default();
//! let mut cmds = vec![
//!     Command::insert_only(38),
//!     Command::new(&params.dist, 0, data.len() - 38, 0, 38 + 15),
//! ];
//!
//! let source = SourceWindow::new(&ring, 0, mask);
//! let mut mb = MetaBlockSplit::new();
//! build_meta_block(&source, &mut params, ContextMode::Utf8, &mut cmds, &mut mb);
//!
//! assert_eq!(mb.literal_split.total_length(), 38);
//! assert_eq!(mb.command_split.total_length(), 2);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      haagenti-brotli                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  metablock.rs  distance search, both assemblers, RLE pass   │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │  splitter.rs                 │  block_split.rs              │
//! │  (greedy, per context)       │  (coarse-to-fine, arrays)    │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │  cluster.rs   histogram.rs   entropy.rs   rle.rs            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  command.rs   context.rs   params.rs                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## References
//!
//! - [RFC 7932 - Brotli Compressed Data Format](https://datatracker.ietf.org/doc/html/rfc7932)

pub mod block_split;
pub mod cluster;
pub mod command;
pub mod context;
pub mod entropy;
pub mod histogram;
pub mod metablock;
pub mod params;
pub mod rle;
pub mod splitter;

pub use block_split::{BlockSplit, SourceWindow};
pub use command::Command;
pub use context::{ContextLut, ContextMode, StaticContextMap};
pub use histogram::{Histogram, HistogramCommand, HistogramDistance, HistogramLiteral};
pub use metablock::{
    build_meta_block, build_meta_block_greedy, optimize_histograms, LiteralContexts, MetaBlockSplit,
};
pub use params::{BlockCategory, DistanceParams, EncoderParams};
pub use splitter::ContextBlockSplitter;

pub use haagenti_core::{Error, Result};
