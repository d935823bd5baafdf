pub mod api;
pub mod contact;
pub mod maintenance;
pub mod pacing;
pub mod queue;
pub mod single_flight;
