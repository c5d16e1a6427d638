use crate::error::{AppResult, DomainError};
use crate::models::item::{Category, ItemDefinition};
use crate::models::types::ItemId;
use serde::{Deserialize, Serialize};

/// Identity of a stack: two instances with the same item, maker and temper share a stack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackKey {
    pub item_id: ItemId,
    pub maker: Option<String>,
    pub temper: Option<u32>,
}

/// A concrete copy of a catalog item, carrying who made it and how far it was tempered.
///
/// The definition is embedded as a snapshot so a character document can be read without the
/// catalog. Catalog entries never change, so the snapshot never goes stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInstance {
    pub item: ItemDefinition,
    #[serde(default)]
    pub maker: Option<String>,
    #[serde(default)]
    pub temper: Option<u32>,
}

impl ItemInstance {
    pub fn new(item: ItemDefinition, maker: Option<String>, temper: Option<u32>) -> Self {
        Self { item, maker, temper }
    }

    pub fn key(&self) -> StackKey {
        StackKey {
            item_id: self.item.id,
            maker: self.maker.clone(),
            temper: self.temper,
        }
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.item.category()
    }

    fn matches(&self, key: &StackKey) -> bool {
        self.item.id == key.item_id && self.maker == key.maker && self.temper == key.temper
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStack {
    pub instance: ItemInstance,
    pub count: u32,
}

/// Stack ledger of a single character, partitioned by item category.
///
/// Invariant: no stack with a zero count is ever kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    weapon: Vec<InventoryStack>,
    #[serde(default)]
    armor: Vec<InventoryStack>,
    #[serde(default)]
    generic: Vec<InventoryStack>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, category: Category) -> &Vec<InventoryStack> {
        match category {
            Category::Weapon => &self.weapon,
            Category::Armor => &self.armor,
            Category::Generic => &self.generic,
        }
    }

    fn partition_mut(&mut self, category: Category) -> &mut Vec<InventoryStack> {
        match category {
            Category::Weapon => &mut self.weapon,
            Category::Armor => &mut self.armor,
            Category::Generic => &mut self.generic,
        }
    }

    /// Adds `count` copies of the item, merging into an existing stack with the same key.
    pub fn add(&mut self, item: &ItemDefinition, count: u32, maker: Option<String>, temper: Option<u32>) -> AppResult<()> {
        self.add_instance(ItemInstance::new(item.clone(), maker, temper), count)
    }

    pub(crate) fn add_instance(&mut self, instance: ItemInstance, count: u32) -> AppResult<()> {
        ensure_positive(count)?;

        let key = instance.key();
        let stacks = self.partition_mut(instance.category());
        match stacks.iter_mut().find(|s| s.instance.matches(&key)) {
            Some(stack) => {
                stack.count = stack.count.checked_add(count).ok_or_else(|| DomainError::Validation {
                    field: "count",
                    message: "stack count overflow".to_string(),
                })?;
            }
            None => stacks.push(InventoryStack { instance, count }),
        }
        Ok(())
    }

    /// Removes `count` copies from the stack matching `(item, maker, temper)`. A stack that
    /// drops to zero is deleted; removing more than a stack holds just empties it.
    pub fn remove(&mut self, item: &ItemDefinition, count: u32, maker: Option<String>, temper: Option<u32>) -> AppResult<()> {
        let key = StackKey {
            item_id: item.id,
            maker,
            temper,
        };
        self.remove_key(item.category(), &key, count)
    }

    pub(crate) fn remove_key(&mut self, category: Category, key: &StackKey, count: u32) -> AppResult<()> {
        ensure_positive(count)?;

        let stacks = self.partition_mut(category);
        let idx = stacks
            .iter()
            .position(|s| s.instance.matches(key))
            .ok_or(DomainError::ItemNotFoundInInventory)?;

        let remaining = stacks[idx].count.saturating_sub(count);
        if remaining == 0 {
            stacks.remove(idx);
        } else {
            stacks[idx].count = remaining;
        }
        Ok(())
    }

    /// Exact-key lookup.
    pub fn get(&self, item: &ItemDefinition, maker: Option<&str>, temper: Option<u32>) -> AppResult<&InventoryStack> {
        self.partition(item.category())
            .iter()
            .find(|s| s.instance.item.id == item.id && s.instance.maker.as_deref() == maker && s.instance.temper == temper)
            .ok_or(DomainError::ItemNotFoundInInventory)
    }

    pub(crate) fn stack(&self, category: Category, key: &StackKey) -> Option<&InventoryStack> {
        self.partition(category).iter().find(|s| s.instance.matches(key))
    }

    /// All stacks of the item regardless of maker and temper. More than one result means the
    /// caller has to pick a variant.
    pub fn find_stacks(&self, item: &ItemDefinition) -> AppResult<Vec<&InventoryStack>> {
        let found: Vec<_> = self
            .partition(item.category())
            .iter()
            .filter(|s| s.instance.item.id == item.id)
            .collect();

        if found.is_empty() {
            return Err(DomainError::ItemNotFoundInInventory);
        }
        Ok(found)
    }

    /// Count held of one exact stack, zero when absent.
    pub fn count_of(&self, key: &StackKey, category: Category) -> u32 {
        self.stack(category, key).map_or(0, |s| s.count)
    }

    /// Stacks of one category ordered by item name, for listing.
    pub fn stacks(&self, category: Category) -> Vec<&InventoryStack> {
        let mut v: Vec<_> = self.partition(category).iter().collect();
        v.sort_by(|a, b| a.instance.item.name.cmp(&b.instance.item.name));
        v
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryStack> {
        self.weapon.iter().chain(self.armor.iter()).chain(self.generic.iter())
    }

    pub fn total_count(&self) -> u64 {
        self.iter().map(|s| s.count as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_count() == 0
    }

    /// Checks that no empty stacks linger and every stack sits in its own category.
    pub(crate) fn verify(&self) -> AppResult<()> {
        for category in Category::ALL {
            for stack in self.partition(*category) {
                if stack.count == 0 {
                    return Err(DomainError::InvariantViolated(format!(
                        "empty stack of item {} kept in inventory",
                        stack.instance.item.id
                    )));
                }
                if stack.instance.category() != *category {
                    return Err(DomainError::InvariantViolated(format!(
                        "item {} stored in the {category} partition",
                        stack.instance.item.id
                    )));
                }
            }
        }
        Ok(())
    }
}

fn ensure_positive(count: u32) -> AppResult<()> {
    if count == 0 {
        return Err(DomainError::Validation {
            field: "count",
            message: "count must be positive".to_string(),
        });
    }
    Ok(())
}
