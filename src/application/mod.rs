//! Application services: change detection, the delivery protocol, and
//! privileged admin operations.

pub mod admin;
pub mod changes;
pub mod delivery;

pub use admin::{AdminError, AdminPolicy, AdminService, AllowlistPolicy, CallerId};
pub use changes::ChangeDetector;
pub use delivery::{DeliveryOutcome, DeliveryReport, DeliveryService};
