//! Bids: the stored aggregate, the editing session, and the bid list.

pub mod autosave;
pub mod editor;
mod model;
pub mod sync;
mod validate;

pub use autosave::EditSession;
pub use editor::{AutosaveTicket, BidEditor, Confirm, EditorState, FinishRequest};
pub use model::{Bid, BidDraft, BidPatch, BidSnapshot, BidStatus, example_bid};
pub use sync::{BidList, BidListLoader};
pub use validate::{is_plausible_email, validate_required, validate_strict};
