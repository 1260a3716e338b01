use std::sync::Arc;

use domains::AdminVerifier;
use services::{AdminService, CommentService, OriginResolver};

use crate::metrics::Metrics;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub comments: Arc<CommentService>,
    pub admin: Arc<AdminService>,
    pub origins: Arc<OriginResolver>,
    pub auth: Arc<dyn AdminVerifier>,
    pub metrics: Arc<Metrics>,
}
