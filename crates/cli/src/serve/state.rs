//! Application state shared across request handlers.

use crate::Editor;

pub(crate) struct AppState {
    pub(crate) editor: Editor,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
}
