mod catalog;
mod character;

pub use catalog::CatalogService;
pub use character::CharacterService;
