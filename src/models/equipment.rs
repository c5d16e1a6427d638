use crate::error::{AppResult, DomainError};
use crate::models::attributes::Attributes;
use crate::models::inventory::{Inventory, ItemInstance, StackKey};
use crate::models::item::{ArmorSlot, Category, ItemKind};
use crate::models::types::ItemId;
use serde::{Deserialize, Serialize};

/// One of the six fixed equipment positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    RightHand,
    LeftHand,
    Helmet,
    Cuirass,
    Gauntlets,
    Boots,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 6] = [
        EquipSlot::RightHand,
        EquipSlot::LeftHand,
        EquipSlot::Helmet,
        EquipSlot::Cuirass,
        EquipSlot::Gauntlets,
        EquipSlot::Boots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EquipSlot::RightHand => "right_hand",
            EquipSlot::LeftHand => "left_hand",
            EquipSlot::Helmet => "helmet",
            EquipSlot::Cuirass => "cuirass",
            EquipSlot::Gauntlets => "gauntlets",
            EquipSlot::Boots => "boots",
        }
    }

    pub fn is_hand(&self) -> bool {
        matches!(self, EquipSlot::RightHand | EquipSlot::LeftHand)
    }
}

impl From<ArmorSlot> for EquipSlot {
    fn from(slot: ArmorSlot) -> Self {
        match slot {
            ArmorSlot::Helmet => EquipSlot::Helmet,
            ArmorSlot::Cuirass => EquipSlot::Cuirass,
            ArmorSlot::Gauntlets => EquipSlot::Gauntlets,
            ArmorSlot::Boots => EquipSlot::Boots,
        }
    }
}

impl core::str::FromStr for EquipSlot {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "right_hand" | "right" => Ok(EquipSlot::RightHand),
            "left_hand" | "left" => Ok(EquipSlot::LeftHand),
            "helmet" => Ok(EquipSlot::Helmet),
            "cuirass" => Ok(EquipSlot::Cuirass),
            "gauntlets" => Ok(EquipSlot::Gauntlets),
            "boots" => Ok(EquipSlot::Boots),
            _ => Err(DomainError::Validation {
                field: "slot",
                message: format!("unknown equipment slot '{s}'"),
            }),
        }
    }
}

impl core::fmt::Display for EquipSlot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Items currently worn or wielded by a character.
///
/// Equipment never reaches into its owner: every transition receives the owner's inventory and
/// attributes and keeps slots, stack counts and the armor rating in step. All checks that can
/// fail run before the first mutation, so a failed transition leaves all three untouched.
///
/// A two-handed weapon only ever occupies the right hand and keeps the left hand empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    right_hand: Option<ItemInstance>,
    #[serde(default)]
    left_hand: Option<ItemInstance>,
    #[serde(default)]
    helmet: Option<ItemInstance>,
    #[serde(default)]
    cuirass: Option<ItemInstance>,
    #[serde(default)]
    gauntlets: Option<ItemInstance>,
    #[serde(default)]
    boots: Option<ItemInstance>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, slot: EquipSlot) -> Option<&ItemInstance> {
        self.slot_ref(slot).as_ref()
    }

    fn slot_ref(&self, slot: EquipSlot) -> &Option<ItemInstance> {
        match slot {
            EquipSlot::RightHand => &self.right_hand,
            EquipSlot::LeftHand => &self.left_hand,
            EquipSlot::Helmet => &self.helmet,
            EquipSlot::Cuirass => &self.cuirass,
            EquipSlot::Gauntlets => &self.gauntlets,
            EquipSlot::Boots => &self.boots,
        }
    }

    fn slot_mut(&mut self, slot: EquipSlot) -> &mut Option<ItemInstance> {
        match slot {
            EquipSlot::RightHand => &mut self.right_hand,
            EquipSlot::LeftHand => &mut self.left_hand,
            EquipSlot::Helmet => &mut self.helmet,
            EquipSlot::Cuirass => &mut self.cuirass,
            EquipSlot::Gauntlets => &mut self.gauntlets,
            EquipSlot::Boots => &mut self.boots,
        }
    }

    /// Every slot with its occupant, in display order.
    pub fn iter(&self) -> impl Iterator<Item = (EquipSlot, Option<&ItemInstance>)> {
        EquipSlot::ALL.into_iter().map(move |s| (s, self.slot(s)))
    }

    /// First slot holding an instance of the given catalog item.
    pub fn find_item(&self, item_id: ItemId) -> Option<EquipSlot> {
        EquipSlot::ALL
            .into_iter()
            .find(|s| self.slot(*s).is_some_and(|i| i.item.id == item_id))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().all(|(_, i)| i.is_none())
    }

    /// Armor rating recomputed from the worn pieces.
    pub fn armor_total(&self) -> i32 {
        self.iter().filter_map(|(_, i)| i).map(|i| i.item.armor_value()).sum()
    }

    /// Equips one item out of the matching inventory stack.
    ///
    /// Weapons always go to the right hand. A two-handed weapon sends both hands back to the
    /// inventory. A one-handed weapon pushes a one-handed right-hand weapon over to the left
    /// hand (whatever was in the left hand goes back to the inventory); any other right-hand
    /// weapon goes back to the inventory. Armor replaces whatever is worn in its slot.
    pub fn equip(&mut self, inventory: &mut Inventory, attributes: &mut Attributes, instance: &ItemInstance) -> AppResult<()> {
        let category = instance.category();
        if category == Category::Generic {
            return Err(DomainError::ItemIsNotEquippable(instance.item.name.clone()));
        }

        let key = instance.key();
        if inventory.stack(category, &key).is_none() {
            return Err(DomainError::ItemNotFoundInInventory);
        }

        // The shuffle runs on copies and is committed only once every step succeeded.
        let mut slots = self.clone();
        let mut inv = inventory.clone();
        let mut attrs = attributes.clone();
        slots.place(&mut inv, &mut attrs, category, &key)?;

        *self = slots;
        *inventory = inv;
        *attributes = attrs;

        debug_assert_eq!(attributes.armor_rating(), self.armor_total());
        tracing::trace!(item = %key.item_id, "equipped");
        Ok(())
    }

    fn place(&mut self, inventory: &mut Inventory, attributes: &mut Attributes, category: Category, key: &StackKey) -> AppResult<()> {
        let incoming = inventory
            .stack(category, key)
            .map(|s| s.instance.clone())
            .ok_or(DomainError::ItemNotFoundInInventory)?;
        inventory.remove_key(category, key, 1)?;

        match incoming.item.armor().map(|a| EquipSlot::from(a.slot)) {
            None if incoming.item.is_two_handed() => {
                self.unequip_slot(EquipSlot::LeftHand, inventory, attributes)?;
                self.unequip_slot(EquipSlot::RightHand, inventory, attributes)?;
                self.right_hand = Some(incoming);
            }
            None => {
                if self.right_hand.as_ref().is_some_and(|i| !i.item.is_two_handed()) {
                    self.unequip_slot(EquipSlot::LeftHand, inventory, attributes)?;
                    self.left_hand = self.right_hand.take();
                } else {
                    self.unequip_slot(EquipSlot::RightHand, inventory, attributes)?;
                }
                self.right_hand = Some(incoming);
            }
            Some(slot) => {
                self.unequip_slot(slot, inventory, attributes)?;
                attributes.add_armor(incoming.item.armor_value());
                *self.slot_mut(slot) = Some(incoming);
            }
        }
        Ok(())
    }

    /// Puts whatever occupies the slot back into the inventory and returns it. An empty slot is
    /// left alone. When the inventory cannot take the item back, the slot keeps it.
    pub fn unequip_slot(
        &mut self,
        slot: EquipSlot,
        inventory: &mut Inventory,
        attributes: &mut Attributes,
    ) -> AppResult<Option<ItemInstance>> {
        let Some(instance) = self.slot(slot).cloned() else {
            return Ok(None);
        };

        inventory.add_instance(instance.clone(), 1)?;
        *self.slot_mut(slot) = None;
        attributes.remove_armor(instance.item.armor_value());
        Ok(Some(instance))
    }

    /// Unequips the first slot holding the given catalog item.
    pub fn unequip_item(&mut self, item_id: ItemId, inventory: &mut Inventory, attributes: &mut Attributes) -> AppResult<EquipSlot> {
        let slot = self.find_item(item_id).ok_or(DomainError::ItemNotFoundInEquipment)?;
        self.unequip_slot(slot, inventory, attributes)?;
        Ok(slot)
    }

    /// Checks slot contents against their categories and the two-hand rule.
    pub(crate) fn verify(&self) -> AppResult<()> {
        for (slot, occupant) in self.iter() {
            let Some(instance) = occupant else { continue };
            let ok = match &instance.item.kind {
                ItemKind::Weapon(_) => slot.is_hand(),
                ItemKind::Armor(a) => EquipSlot::from(a.slot) == slot,
                ItemKind::Generic => false,
            };
            if !ok {
                return Err(DomainError::InvariantViolated(format!(
                    "item {} does not belong in slot {slot}",
                    instance.item.id
                )));
            }
        }

        if self.left_hand.as_ref().is_some_and(|i| i.item.is_two_handed()) {
            return Err(DomainError::InvariantViolated("two-handed weapon in the left hand".to_string()));
        }
        if self.right_hand.as_ref().is_some_and(|i| i.item.is_two_handed()) && self.left_hand.is_some() {
            return Err(DomainError::InvariantViolated(
                "left hand occupied next to a two-handed weapon".to_string(),
            ));
        }
        Ok(())
    }
}
