#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::module_name_repetitions)]

//! # Synapse Core
//!
//! An agent-local associative memory engine: concepts are weighted synapses
//! reinforced on use and decayed on neglect, migrating between a hot
//! (active) store and a cold (latent) archive.
//!
//! ## Module Organization
//!
//! - [`types`]: the data model — synapse, latent, and observation records.
//! - [`store`]: the Synapse Store — weight maps, Hebbian linkage, LTP/LTD.
//! - [`tokenizer`]: content-word extraction for the weight store.
//! - [`index`]: the local inverted index, with its own word extraction.
//! - [`embedder`]: the pluggable vector-search capability.
//! - [`observer`]: append-only observation log and instinct promotion.
//! - [`distill`]: the batch pipeline that turns daily logs into weight updates.
//! - [`recall`]: the query-time pipeline, including the vector-vs-local race.
//! - [`config`]: central configuration and filesystem layout.
//! - [`lock`]: the cross-process advisory lock guarding the weight files.
//!
//! ## Quick Start
//!
//! ```no_run
//! use synapse_core::config::EnginePaths;
//! use synapse_core::store::SynapseStore;
//! use synapse_core::embedder::NullEmbedder;
//! use synapse_core::tokenizer::NullTagger;
//! use synapse_core::config::EngineConfig;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let paths = EnginePaths::new("/tmp/brain-synapse");
//! let config = EngineConfig::default();
//! let mut store = SynapseStore::load(&paths).unwrap();
//!
//! let summary = synapse_core::distill::distill(
//!     &paths,
//!     &config,
//!     &mut store,
//!     &NullTagger,
//!     &NullEmbedder,
//!     false,
//! )
//! .await;
//! println!("distilled {} logs", summary.logs_processed);
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod distill;
pub mod embedder;
pub mod error;
pub mod index;
pub mod lock;
pub mod observer;
pub mod recall;
pub mod store;
pub mod tokenizer;
pub mod types;

pub use config::{EngineConfig, EnginePaths};
pub use embedder::Embedder;
pub use error::{Error, Result};
pub use index::LocalIndex;
pub use observer::Observer;
pub use recall::{RecallOptions, RecallResponse};
pub use store::SynapseStore;
pub use tokenizer::PosTagger;
pub use types::{Latent, Synapse};
