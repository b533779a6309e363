//! `results`: read back stored results, newest first.

use serde::Serialize;

use crate::core_state::CoreState;
use crate::models::ResultRecord;

#[derive(Debug, Clone, Serialize)]
pub struct StoredResultView {
    pub id: i64,
    #[serde(flatten)]
    pub record: ResultRecord,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsPage {
    pub total: i64,
    pub results: Vec<StoredResultView>,
}

pub fn list_results(state: &CoreState, limit: usize) -> Result<ResultsPage, String> {
    let total = state.result_count().map_err(|e| e.to_string())?;
    let results = state
        .recent_results(limit)
        .map_err(|e| e.to_string())?
        .into_iter()
        .map(|stored| StoredResultView {
            id: stored.rowid,
            record: stored.record,
        })
        .collect();
    Ok(ResultsPage { total, results })
}
