pub mod context;
pub mod custom_resource;
