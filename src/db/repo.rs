mod character;
mod character_db;
mod character_mem;
mod item;
mod item_db;
mod item_mem;

pub use character_db::CharacterRepository;
pub use character_mem::MemoryCharacterRepository;
pub use item_db::ItemRepository;
pub use item_mem::MemoryItemRepository;

pub use character::CharacterRepo;
pub use item::ItemRepo;
