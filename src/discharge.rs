use anyhow::Result;
use chrono::Local;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::client::{Dap, Erddap};
use crate::table::{Record, Table};

/// The Hakai Institute catalogue server all discharge queries go to.
pub const HAKAI_SERVER: &str = "https://catalogue.hakai.org/erddap/";

/// Dataset queried when the caller does not name one.
pub const DEFAULT_DATASET_ID: &str = "HakaiWatershedsStreamStationsProvisional";

/// Non-data lines ERDDAP emits before the header row of a `.csv` response.
const PREAMBLE_LINES: usize = 2;

/// Echo of the query that produced a result, for traceability.
///
/// Immutable once constructed and included verbatim in both success and
/// failure outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    pub dataset_id: String,
    /// `YYYY-MM-DD`, the local calendar date at call time.
    pub time_constraint: String,
    pub server: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSuccess {
    pub row_count: usize,
    pub columns: Vec<String>,
    pub data: Vec<Record>,
    pub query_info: QueryInfo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub error: String,
    pub query_info: QueryInfo,
}

/// Outcome of one discharge fetch. Failures are reported here, never as a
/// propagated error.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Success(FetchSuccess),
    Failure(FetchFailure),
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success(_))
    }

    /// Number of rows retrieved; 0 for a failure.
    pub fn row_count(&self) -> usize {
        match self {
            FetchResult::Success(s) => s.row_count,
            FetchResult::Failure(_) => 0,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchResult::Success(_) => None,
            FetchResult::Failure(f) => Some(&f.error),
        }
    }

    pub fn query_info(&self) -> &QueryInfo {
        match self {
            FetchResult::Success(s) => &s.query_info,
            FetchResult::Failure(f) => &f.query_info,
        }
    }
}

// Serialized as flat objects with a literal `success` boolean, matching the
// envelope shape downstream consumers expect:
//   {"success":true,"row_count":...,"columns":...,"data":...,"query_info":...}
//   {"success":false,"error":...,"query_info":...}
impl Serialize for FetchResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FetchResult::Success(s) => {
                let mut st = serializer.serialize_struct("FetchResult", 5)?;
                st.serialize_field("success", &true)?;
                st.serialize_field("row_count", &s.row_count)?;
                st.serialize_field("columns", &s.columns)?;
                st.serialize_field("data", &s.data)?;
                st.serialize_field("query_info", &s.query_info)?;
                st.end()
            }
            FetchResult::Failure(f) => {
                let mut st = serializer.serialize_struct("FetchResult", 3)?;
                st.serialize_field("success", &false)?;
                st.serialize_field("error", &f.error)?;
                st.serialize_field("query_info", &f.query_info)?;
                st.end()
            }
        }
    }
}

/// Fetches discharge rows for `dataset_id` measured today or later.
///
/// The time constraint is computed at call time, so each invocation reflects
/// the current day. One blocking network request; any failure along the
/// fetch-or-parse path is caught and stringified into the envelope.
pub fn fetch(dataset_id: &str) -> FetchResult {
    let query_info = QueryInfo {
        dataset_id: dataset_id.to_string(),
        time_constraint: today_iso(),
        server: HAKAI_SERVER.to_string(),
    };

    match fetch_table(&query_info) {
        Ok(table) => FetchResult::Success(FetchSuccess {
            row_count: table.row_count(),
            columns: table.columns.clone(),
            data: table.records(),
            query_info,
        }),
        Err(err) => FetchResult::Failure(FetchFailure {
            error: format!("{:#}", err),
            query_info,
        }),
    }
}

/// [`fetch`] with [`DEFAULT_DATASET_ID`].
pub fn fetch_default() -> FetchResult {
    fetch(DEFAULT_DATASET_ID)
}

fn fetch_table(query: &QueryInfo) -> Result<Table> {
    let erddap = Erddap::new(&query.server)?;
    let dap = Dap::new(&query.dataset_id).constraint("time>=", &query.time_constraint);
    let csv = erddap.download_csv(&dap)?;
    Table::from_csv(&csv, PREAMBLE_LINES)
}

fn today_iso() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}
