pub mod types;
pub mod config;
pub mod filter;
pub mod watermark;
pub mod traits;
pub mod parser;
pub mod fetcher;
pub mod poller;
pub mod registry;
pub mod dispatcher;
pub mod scheduler;
pub mod notifiers;

pub use types::*;
pub use config::{load_env_file, MonitorConfig, MonitorFile};
pub use filter::{passes_all, EntryField, FilterClause, FilterRule};
pub use watermark::{diff_new, WatermarkState};
pub use traits::FeedSource;
pub use parser::FeedParser;
pub use fetcher::Fetcher;
pub use poller::FeedPoller;
pub use registry::NotifierRegistry;
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use scheduler::{FeedTask, Scheduler};
