//! A small Rust client for ERDDAP tabledap servers, plus a fetcher for
//! recent discharge data from the Hakai Institute catalogue.
//!
//! This crate implements an `erddapy`-style flow: describe a tabledap query
//! (dataset, variables, constraints), download the result as CSV, then parse
//! it into typed records.
//!
//! ## Quick start
//! ```no_run
//! use erddap_discharge::{fetch_default, FetchResult};
//!
//! match fetch_default() {
//!     FetchResult::Success(s) => println!("{} rows, columns: {:?}", s.row_count, s.columns),
//!     FetchResult::Failure(f) => eprintln!("fetch failed: {}", f.error),
//! }
//! ```
//!
//! The lower-level [`Erddap`] client can query any tabledap dataset on any
//! server:
//! ```no_run
//! use anyhow::Result;
//! use erddap_discharge::{Dap, Erddap, Table};
//!
//! fn main() -> Result<()> {
//!     let erddap = Erddap::new("https://catalogue.hakai.org/erddap/")?;
//!     let dap = Dap::new("HakaiWatershedsStreamStationsProvisional")
//!         .variable("station")
//!         .variable("pls_lvl")
//!         .constraint("time>=", "2024-01-01");
//!     let csv = erddap.download_csv(&dap)?;
//!     let table = Table::from_csv(&csv, 2)?;
//!     println!("{} rows", table.row_count());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod discharge;
mod error;
mod table;
mod util;

pub use client::{Dap, Erddap};
pub use discharge::{
    DEFAULT_DATASET_ID, FetchFailure, FetchResult, FetchSuccess, HAKAI_SERVER, QueryInfo, fetch,
    fetch_default,
};
pub use table::{Record, Table, Value};
