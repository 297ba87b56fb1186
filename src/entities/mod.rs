pub mod message;
pub mod shipment;
pub mod truck;
pub mod user;

pub use shipment::ShipmentStatus;
pub use user::UserRole;
