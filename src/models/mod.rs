mod audit_event;
mod order;
mod update;

pub use audit_event::{AuditEvent, AuditEventType, NewAuditEvent};
pub use order::{CreateOrder, Metadata, Order, OrderStatus};
pub use update::{UpdateEvent, UpdateRejection, UpdateRequest, UpdateResponse};
