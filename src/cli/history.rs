use crate::error::Result;
use crate::record::HistoryEntry;
use crate::service::Service;
use serde::Serialize;

#[derive(Serialize)]
struct HistoryOutput {
    history: Vec<HistoryEntry>,
}

/// Render the decrypted history as `{"history": [...]}`
pub fn show_history(service: &Service) -> Result<String> {
    let history = service.history()?;
    Ok(serde_json::to_string_pretty(&HistoryOutput { history })?)
}
