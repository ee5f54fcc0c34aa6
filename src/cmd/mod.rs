pub mod command;
pub mod skopeo;
