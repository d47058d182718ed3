//! RFC 3261 §12 dialog layer: identity, route set, in-dialog request
//! construction, and the registry that owns every live dialog (spec §4.E).

pub mod dialog;
pub mod error;
pub mod manager;

pub use dialog::{extract_route_set, is_dialog_establishing, key_for_incoming_request, Dialog, DialogState};
pub use error::{Error, Result};
pub use manager::DialogManager;
