pub mod api;
pub mod bridge;
pub mod convergence;
pub mod poller;
pub mod tracker;
pub mod transfer;
pub mod validation;
