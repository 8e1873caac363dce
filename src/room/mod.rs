// Room membership and fan-out

mod metrics;
mod registry;
mod session;

pub use metrics::{MetricsSnapshot, RoomMetrics};
pub use registry::{BroadcastReport, RoomRegistry};
pub use session::{DeliveryError, SessionHandle, SessionId};
