pub mod assignment;
pub mod health;
pub mod job;
pub mod upload;
