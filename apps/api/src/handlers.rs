pub mod authorization;
pub mod health;
pub mod members;
pub mod roles;
pub mod tags;
