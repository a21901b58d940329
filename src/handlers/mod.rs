pub mod admin;
pub mod application;
pub mod booking;
pub mod newsletter;
pub mod quiz;
