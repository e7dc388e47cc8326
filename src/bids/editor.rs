//! Bid editing session state.
//!
//! [`BidEditor`] is the synchronous core: it owns the form draft, tracks
//! whether there are unsaved changes, and decides when an autosave may run.
//! The debounce timer that drives it lives in [`super::autosave`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{Bid, BidDraft, BidSnapshot, BidStatus};
use super::validate::validate_required;
use crate::db::Database;
use crate::error::{BidError, DatabaseError, ValidationError};
use crate::pricing::BidTotals;

pub const CONFIRM_FINISH: &str =
    "You have unsaved changes. Do you want to save this bid and finish editing?";

pub const CONFIRM_CANCEL: &str = "You have unsaved changes. Are you sure you want to cancel? \
    Your changes will be auto-saved as a draft.";

/// Asks the user a yes/no question.
pub trait Confirm: Send + Sync {
    fn confirm(&self, message: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, message: &str) -> bool {
        self(message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    /// No edits since the last successful save.
    Clean,
    /// Edits not yet saved.
    Dirty,
    /// An autosave write is in flight.
    Autosaving,
}

/// What an autosave should write, and which edit it reflects.
#[derive(Debug, Clone)]
pub struct AutosaveTicket {
    pub bid_id: Option<Uuid>,
    pub snapshot: BidSnapshot,
    revision: u64,
}

/// Outcome of Save & Finish before anything is written.
#[derive(Debug, Clone)]
pub enum FinishRequest {
    /// Write this snapshot to the bid (or create one when `bid_id` is `None`).
    Save {
        bid_id: Option<Uuid>,
        snapshot: BidSnapshot,
    },
    /// The user declined the confirmation; keep editing.
    Declined,
}

#[derive(Debug, Clone)]
pub struct BidEditor {
    draft: BidDraft,
    bid_id: Option<Uuid>,
    state: EditorState,
    /// Dirty edits made while an autosave was in flight.
    dirty_during_save: bool,
    revision: u64,
    last_autosave: Option<DateTime<Utc>>,
}

impl BidEditor {
    /// Start a brand-new bid.
    pub fn new() -> Self {
        Self::with_draft(None, BidDraft::default())
    }

    /// Edit an existing bid. The example bid opens as a fresh, unsaved draft.
    pub fn open(bid: &Bid) -> Self {
        let id = if bid.is_example { None } else { Some(bid.id) };
        Self::with_draft(id, bid.draft.clone())
    }

    fn with_draft(bid_id: Option<Uuid>, draft: BidDraft) -> Self {
        Self {
            draft,
            bid_id,
            state: EditorState::Clean,
            dirty_during_save: false,
            revision: 0,
            last_autosave: None,
        }
    }

    pub fn draft(&self) -> &BidDraft {
        &self.draft
    }

    /// Totals for the current form contents.
    pub fn totals(&self) -> BidTotals {
        self.draft.totals()
    }

    pub fn bid_id(&self) -> Option<Uuid> {
        self.bid_id
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn last_autosave(&self) -> Option<DateTime<Utc>> {
        self.last_autosave
    }

    /// Whether leaving the editor should warn about unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        match self.state {
            EditorState::Clean => false,
            EditorState::Dirty => true,
            EditorState::Autosaving => self.dirty_during_save,
        }
    }

    /// Apply a mutation to the form. Any mutation marks the editor dirty.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut BidDraft) -> R) -> R {
        let result = f(&mut self.draft);
        self.revision += 1;
        match self.state {
            EditorState::Autosaving => self.dirty_during_save = true,
            _ => self.state = EditorState::Dirty,
        }
        result
    }

    /// Claim an autosave slot.
    ///
    /// Returns `None` when there is nothing to save, a save is already in
    /// flight, or the project title is still empty. Autosaves always write
    /// the bid as a draft.
    pub fn begin_autosave(&mut self) -> Option<AutosaveTicket> {
        if self.state != EditorState::Dirty || self.draft.project_title.trim().is_empty() {
            return None;
        }

        let mut draft = self.draft.clone();
        draft.status = BidStatus::Draft;

        self.state = EditorState::Autosaving;
        self.dirty_during_save = false;
        Some(AutosaveTicket {
            bid_id: self.bid_id,
            snapshot: draft.snapshot(),
            revision: self.revision,
        })
    }

    /// Record the outcome of an autosave.
    ///
    /// On success the new bid id is kept so later saves update the same
    /// record. Failures are logged and leave the editor dirty.
    pub fn finish_autosave(&mut self, ticket: AutosaveTicket, result: Result<Bid, DatabaseError>) {
        let edited_meanwhile = self.dirty_during_save || self.revision != ticket.revision;
        self.dirty_during_save = false;

        match result {
            Ok(bid) => {
                if self.bid_id.is_none() {
                    self.bid_id = Some(bid.id);
                }
                self.last_autosave = Some(Utc::now());
                self.state = if edited_meanwhile {
                    EditorState::Dirty
                } else {
                    EditorState::Clean
                };
                tracing::info!("Autosaved draft {}", bid.id);
            }
            Err(e) => {
                tracing::warn!("Autosave failed: {}", e);
                self.state = EditorState::Dirty;
            }
        }
    }

    /// Validate and confirm Save & Finish.
    ///
    /// The snapshot carries the status chosen in the form.
    pub fn prepare_finish(&self, confirm: &dyn Confirm) -> Result<FinishRequest, ValidationError> {
        validate_required(&self.draft)?;
        if self.has_unsaved_changes() && !confirm.confirm(CONFIRM_FINISH) {
            return Ok(FinishRequest::Declined);
        }
        Ok(FinishRequest::Save {
            bid_id: self.bid_id,
            snapshot: self.draft.snapshot(),
        })
    }

    /// Mark a completed Save & Finish.
    pub fn finish_saved(&mut self, bid: &Bid) {
        self.bid_id = Some(bid.id);
        self.state = EditorState::Clean;
        self.dirty_during_save = false;
    }

    /// Whether the editor may close without saving.
    pub fn cancel(&self, confirm: &dyn Confirm) -> bool {
        !self.has_unsaved_changes() || confirm.confirm(CONFIRM_CANCEL)
    }
}

impl Default for BidEditor {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a snapshot: update when the bid exists, otherwise create.
pub async fn write_snapshot(
    db: &dyn Database,
    owner: &str,
    bid_id: Option<Uuid>,
    snapshot: &BidSnapshot,
) -> Result<Bid, DatabaseError> {
    match bid_id {
        Some(id) => db.update_bid(owner, id, snapshot).await,
        None => db.create_bid(owner, snapshot).await,
    }
}

/// Save & Finish against the store.
///
/// Returns `Ok(None)` when the user declined. A failed write leaves the
/// editor untouched so nothing is lost and the user can retry.
pub async fn save_and_finish(
    editor: &mut BidEditor,
    db: &dyn Database,
    owner: &str,
    confirm: &dyn Confirm,
) -> Result<Option<Bid>, BidError> {
    let (bid_id, snapshot) = match editor.prepare_finish(confirm)? {
        FinishRequest::Declined => return Ok(None),
        FinishRequest::Save { bid_id, snapshot } => (bid_id, snapshot),
    };

    let bid = write_snapshot(db, owner, bid_id, &snapshot).await?;
    editor.finish_saved(&bid);
    tracing::info!("Saved bid {} as {}", bid.id, bid.status());
    Ok(Some(bid))
}
