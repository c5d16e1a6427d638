pub mod registration;
pub mod registry;
