//! Read-path business logic: comment assembly, notifications, IP region
//! enrichment, CORS origin resolution and admin operations.

pub mod admin;
pub mod comments;
pub mod cook;
pub mod cors;
pub mod enrich;
pub mod filter;
pub mod notify;

pub use admin::{AdminService, BACKGROUND_TASK_MSG};
pub use comments::{
    ApiVersion, CommentListRequest, CommentListResponse, CommentListSettings, CommentService,
};
pub use cors::OriginResolver;
pub use enrich::IpRegionEnricher;
pub use filter::{CommentAccess, FilterBuilder, ListMode, MessageCenterType};
pub use notify::NotificationService;
