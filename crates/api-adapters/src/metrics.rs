//! Prometheus metrics exposed at `GET /metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;
use services::ListMode;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ModeLabels {
    pub mode: String,
}

pub struct Metrics {
    registry: Registry,
    comment_lists: Family<ModeLabels, Counter>,
    cors_rejections: Counter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("rusty_talk");
        let comment_lists = Family::<ModeLabels, Counter>::default();
        let cors_rejections = Counter::default();
        registry.register(
            "comment_lists",
            "Comment list requests served, by list mode",
            comment_lists.clone(),
        );
        registry.register(
            "cors_rejections",
            "Requests whose Origin was not allowed",
            cors_rejections.clone(),
        );
        Self {
            registry,
            comment_lists,
            cors_rejections,
        }
    }

    pub fn comment_listed(&self, mode: ListMode) {
        self.comment_lists
            .get_or_create(&ModeLabels {
                mode: mode.as_str().to_string(),
            })
            .inc();
    }

    pub fn cors_rejected(&self) {
        self.cors_rejections.inc();
    }

    /// OpenMetrics text exposition of every registered metric.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}
