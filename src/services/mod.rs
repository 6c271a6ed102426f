pub mod autostart;
pub mod driver;
pub mod engine;
pub mod notifier;
pub mod progress;
pub mod sampler;
pub mod severity;

pub use autostart::Autostart;
pub use driver::Monitor;
pub use notifier::{DesktopNotifier, LogNotifier, NotificationSink};
pub use progress::{LogProgress, MetricsProgress};
pub use sampler::SysinfoSampler;
