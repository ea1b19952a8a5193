pub mod dictionary;
pub mod item;
