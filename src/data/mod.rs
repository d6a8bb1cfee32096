pub mod game_data;
pub mod store;

pub use game_data::GameData;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
