use std::collections::HashMap;

use arcstr::ArcStr;

use crate::error::{Error, Result};
use crate::nbt::{Compound, TagValue};

pub const AIR: &str = "minecraft:air";

/// Block identifier to palette index, assigned densely in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct Palette {
    indices: HashMap<ArcStr, i32>,
    order: Vec<ArcStr>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// A palette with `minecraft:air` already pinned at index 0.
    pub fn with_air() -> Self {
        let mut palette = Self::new();
        palette.index_of(AIR);
        palette
    }

    /// Pin `minecraft:air` at index 0. Only valid before any other identifier has been added.
    pub fn reserve_air(&mut self) -> Result<i32> {
        match self.indices.get(AIR) {
            Some(&index) => Ok(index),
            None if self.order.is_empty() => Ok(self.index_of(AIR)),
            None => Err(Error::PaletteNotEmpty {
                len: self.order.len(),
            }),
        }
    }

    pub fn index_of(&mut self, identifier: &str) -> i32 {
        if let Some(&index) = self.indices.get(identifier) {
            return index;
        }
        let index = self.order.len() as i32;
        let key = ArcStr::from(identifier);
        self.indices.insert(key.clone(), index);
        self.order.push(key);
        index
    }

    pub fn get(&self, identifier: &str) -> Option<i32> {
        self.indices.get(identifier).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in index order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.order
            .iter()
            .enumerate()
            .map(|(index, name)| (name.as_str(), index as i32))
    }

    /// The `Palette` tag: a compound keyed by identifier whose `Int` values are the indices.
    pub fn to_tag(&self) -> TagValue {
        // Identifiers are unique by construction
        let entries = self
            .iter()
            .map(|(name, index)| (name.to_owned(), TagValue::Int(index)))
            .collect();
        Compound::from_unique(entries).into()
    }
}
