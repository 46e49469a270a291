//! A small Rust client for a research data ingestion API.
//!
//! This crate wraps the service's four operations: upload a data file with
//! its YAML metadata, search previously uploaded records, download a file by
//! identifier, and scaffold a metadata template for users to fill out.
//!
//! ## Quick start
//! - Configure the service address via the `INGEST_API_URL` environment
//!   variable or an `.ingestapirc` file (current directory or home
//!   directory); without either the client targets `http://localhost:8001`.
//! - Upload with [`Client::upload`], find records with [`Client::search`],
//!   fetch them back with [`Client::download`].
//!
//! ```no_run
//! use ingestapi::{Client, SearchFilters};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ingestapi::IngestError> {
//!     let client = Client::from_env()?;
//!
//!     let response = client.upload(
//!         Path::new("run_042.mat"),
//!         Path::new("run_042.yaml"),
//!     )?;
//!     println!("uploaded: {response}");
//!
//!     let results = client.search(&SearchFilters::new().author("wkm2109"))?;
//!     for record in results.iter() {
//!         println!("{:?} uploaded at {:?}", record.id, record.upload_timestamp);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! For configuration details, see the crate README.

#![forbid(unsafe_code)]

mod client;
mod config;
mod download;
mod error;
mod metadata;
mod search;
mod util;

pub use client::Client;
pub use error::IngestError;
pub use metadata::{Metadata, generate_metadata_template, load_metadata};
pub use search::{FileRecord, SearchFilters, SearchResults};
