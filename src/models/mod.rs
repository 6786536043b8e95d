pub mod lifecycle;
pub mod parcel;
pub mod payment_option;
pub mod payment_proof;
pub mod profile;
pub mod quote;
pub mod shipment;
pub mod tracking_event;
pub mod tracking_event_payment;

pub use lifecycle::{LifecycleError, NewTrackingEvent, PaymentRequest, TransitionPolicy};
pub use parcel::{PackageDetails, ServiceOptions};
pub use shipment::{PackageType, ServiceType, ShipmentStatus};
pub use tracking_event::{PaymentDetails, TrackingEventRecord};
