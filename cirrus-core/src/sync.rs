//! Sync - Reconcile local state with what the remote side reports
//!
//! A Read never fails because the object is gone: the identifier is cleared
//! instead, so the orchestrator plans a recreate.

use std::path::Path;

use crate::provider::{ErrorKind, ProviderError, ProviderResult};
use crate::resource::{Attributes, State};

/// Attribute naming a file that receives a JSON snapshot of the read result
pub const OUTPUT_FILE_ATTR: &str = "result_output_file";

/// What a reconcile did to local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote object no longer exists; identifier cleared
    Removed,
    /// Remote fields were merged; `updated` lists the fields whose value changed
    Refreshed { updated: Vec<String> },
}

/// Apply a describe result to `state`.
///
/// `None` means the remote object was not found.
pub fn reconcile(state: &mut State, remote: Option<Attributes>) -> SyncOutcome {
    match remote {
        None => {
            log::warn!(
                "[WARN] {} ({}) not found on remote, removing from state",
                state.id,
                state.identifier_or_empty()
            );
            state.clear_identifier();
            SyncOutcome::Removed
        }
        Some(remote) => {
            let updated = state.merge_remote(remote);
            if !updated.is_empty() {
                log::debug!("{} refreshed fields: {}", state.id, updated.join(", "));
            }
            SyncOutcome::Refreshed { updated }
        }
    }
}

/// Write `value` as pretty-printed JSON to `path`
pub fn write_output_file(path: &Path, value: &serde_json::Value) -> ProviderResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| {
        ProviderError::new(ErrorKind::Io, format!("Failed to serialize output: {}", e))
    })?;
    std::fs::write(path, content).map_err(|e| {
        ProviderError::new(
            ErrorKind::Io,
            format!("Failed to write output file {}: {}", path.display(), e),
        )
        .with_cause(e)
    })
}
