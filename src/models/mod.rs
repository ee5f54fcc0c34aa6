pub mod mirror_request;
pub mod platform;
pub mod reference;
pub mod repository;
