// Core engine
pub mod matching;
pub mod settlement;

// Lifecycle and registries
pub mod shipments;
pub mod trucks;
pub mod users;

// Reporting and back office
pub mod admin;
pub mod analytics;
pub mod messages;

// External collaborators
pub mod route_optimizer;
