pub mod catalog;
pub mod color;
pub mod error;
pub mod matcher;
pub mod nbt;
pub mod palette;
pub mod preview;
pub mod schematic;
pub mod settings;

pub use error::{Error, Result};
