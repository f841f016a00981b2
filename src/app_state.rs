use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{history::QueryHistory, rag::RagContext};

#[derive(Clone)]
pub struct AppState {
    pub rag: Arc<RagContext>,
    pub history: Arc<QueryHistory>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}
