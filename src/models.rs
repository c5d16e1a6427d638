pub mod attributes;
pub mod character;
pub mod equipment;
pub mod inventory;
pub mod item;
pub mod types;
