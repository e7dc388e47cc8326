//! Debounced autosave for an open bid.
//!
//! Each [`EditSession`] owns one background task. Every edit restarts the
//! quiet-period countdown; when it runs out the session autosaves the draft.
//! Writes from the session are serialized so an autosave and an explicit
//! save never race to create the same bid twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use super::editor::{BidEditor, Confirm, save_and_finish, write_snapshot};
use super::model::{Bid, BidDraft};
use crate::db::Database;
use crate::error::BidError;

struct SessionInner {
    db: Arc<dyn Database>,
    owner: String,
    editor: Mutex<BidEditor>,
    writes: Mutex<()>,
}

pub struct EditSession {
    inner: Arc<SessionInner>,
    edits: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl EditSession {
    /// Start a session and its autosave timer.
    pub fn start(
        db: Arc<dyn Database>,
        owner: impl Into<String>,
        editor: BidEditor,
        quiet_period: Duration,
    ) -> Self {
        let inner = Arc::new(SessionInner {
            db,
            owner: owner.into(),
            editor: Mutex::new(editor),
            writes: Mutex::new(()),
        });
        let (edits, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce(Arc::clone(&inner), rx, quiet_period));

        Self { inner, edits, task }
    }

    /// Apply a mutation and restart the autosave countdown.
    pub async fn edit<R>(&self, f: impl FnOnce(&mut BidDraft) -> R) -> R {
        let result = self.inner.editor.lock().await.edit(f);
        let _ = self.edits.send(());
        result
    }

    /// A copy of the current editor state.
    pub async fn editor(&self) -> BidEditor {
        self.inner.editor.lock().await.clone()
    }

    /// Autosave right away if an autosave is due.
    pub async fn autosave_now(&self) {
        autosave(&self.inner).await;
    }

    /// Save & Finish. Returns `Ok(None)` when the user declined.
    pub async fn save_and_finish(&self, confirm: &dyn Confirm) -> Result<Option<Bid>, BidError> {
        let _write = self.inner.writes.lock().await;
        let mut editor = self.inner.editor.lock().await;
        save_and_finish(&mut editor, self.inner.db.as_ref(), &self.inner.owner, confirm).await
    }

    /// Whether the session may be closed.
    pub async fn cancel(&self, confirm: &dyn Confirm) -> bool {
        self.inner.editor.lock().await.cancel(confirm)
    }

    /// Stop the autosave timer. Pending edits are not saved.
    pub fn close(self) {
        self.task.abort();
    }
}

impl Drop for EditSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce(
    inner: Arc<SessionInner>,
    mut edits: mpsc::UnboundedReceiver<()>,
    quiet_period: Duration,
) {
    while edits.recv().await.is_some() {
        loop {
            tokio::select! {
                more = edits.recv() => {
                    if more.is_none() {
                        return;
                    }
                }
                _ = tokio::time::sleep(quiet_period) => break,
            }
        }
        autosave(&inner).await;
    }
}

async fn autosave(inner: &SessionInner) {
    let _write = inner.writes.lock().await;

    let Some(ticket) = inner.editor.lock().await.begin_autosave() else {
        return;
    };

    tracing::debug!("Autosaving draft {:?}", ticket.bid_id);
    let result = write_snapshot(
        inner.db.as_ref(),
        &inner.owner,
        ticket.bid_id,
        &ticket.snapshot,
    )
    .await;

    inner.editor.lock().await.finish_autosave(ticket, result);
}
