use crate::config::GameConfig;
use crate::error::{AppResult, DomainError};
use crate::models::attributes::Attributes;
use crate::models::equipment::{EquipSlot, Equipment};
use crate::models::inventory::{Inventory, InventoryStack, ItemInstance};
use crate::models::item::ItemDefinition;
use crate::models::types::{CharacterId, ItemId, MemberId};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const NAME_MAX_LEN: usize = 25;
pub const DESC_MAX_LEN: usize = 1500;

static AVATAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("avatar regex"));

/// What registration collects before a character exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDraft {
    pub member_id: MemberId,
    pub name: String,
    pub race: String,
    pub sex: String,
    pub desc: String,
}

impl CharacterDraft {
    pub fn validate(&self, game: &GameConfig) -> AppResult<()> {
        validate_name(&self.name)?;
        game.race(&self.race)?;
        game.validate_sex(&self.sex)?;
        validate_desc(&self.desc)?;
        Ok(())
    }
}

pub fn validate_name(name: &str) -> AppResult<()> {
    let len = name.trim().chars().count();
    if len == 0 || len > NAME_MAX_LEN {
        return Err(DomainError::Validation {
            field: "name",
            message: format!("name must be 1 to {NAME_MAX_LEN} characters"),
        });
    }
    Ok(())
}

pub fn validate_desc(desc: &str) -> AppResult<()> {
    if desc.chars().count() > DESC_MAX_LEN {
        return Err(DomainError::Validation {
            field: "desc",
            message: format!("description must be at most {DESC_MAX_LEN} characters"),
        });
    }
    Ok(())
}

/// A member's role-play character. It exclusively owns its inventory, equipment and attributes,
/// and is stored as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub member_id: MemberId,
    pub name: String,
    pub race: String,
    pub sex: String,
    pub desc: String,
    pub lvl: u32,
    pub xp: u64,
    pub xp_factor: f64,
    #[serde(default)]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub inventory: Inventory,
    pub attributes: Attributes,
    #[serde(default)]
    pub equipment: Equipment,
}

impl Character {
    /// Creates a level 1 character with the race's base attributes and full pools.
    pub fn new(draft: CharacterDraft, game: &GameConfig) -> AppResult<Self> {
        draft.validate(game)?;
        let race = game.race(&draft.race)?;

        Ok(Self {
            id: CharacterId::new(),
            member_id: draft.member_id,
            name: draft.name.trim().to_string(),
            race: draft.race,
            sex: draft.sex,
            desc: draft.desc,
            lvl: 1,
            xp: 0,
            xp_factor: 1.0,
            avatar: None,
            created_at: Utc::now(),
            inventory: Inventory::new(),
            attributes: race.attributes(),
            equipment: Equipment::new(),
        })
    }

    pub fn set_avatar(&mut self, url: Option<String>) -> AppResult<()> {
        if let Some(u) = &url {
            if !AVATAR_RE.is_match(u) {
                return Err(DomainError::Validation {
                    field: "avatar",
                    message: format!("'{u}' is not an http(s) url"),
                });
            }
        }
        self.avatar = url;
        Ok(())
    }

    pub fn add_item(&mut self, item: &ItemDefinition, count: u32, maker: Option<String>, temper: Option<u32>) -> AppResult<()> {
        self.inventory.add(item, count, maker, temper)
    }

    pub fn remove_item(&mut self, item: &ItemDefinition, count: u32, maker: Option<String>, temper: Option<u32>) -> AppResult<()> {
        self.inventory.remove(item, count, maker, temper)
    }

    pub fn find_stacks(&self, item: &ItemDefinition) -> AppResult<Vec<&InventoryStack>> {
        self.inventory.find_stacks(item)
    }

    pub fn equip(&mut self, instance: &ItemInstance) -> AppResult<()> {
        self.equipment.equip(&mut self.inventory, &mut self.attributes, instance)
    }

    pub fn unequip_slot(&mut self, slot: EquipSlot) -> AppResult<Option<ItemInstance>> {
        self.equipment.unequip_slot(slot, &mut self.inventory, &mut self.attributes)
    }

    pub fn unequip_item(&mut self, item_id: ItemId) -> AppResult<EquipSlot> {
        self.equipment.unequip_item(item_id, &mut self.inventory, &mut self.attributes)
    }

    pub fn regenerate(&mut self, elapsed: Duration) {
        self.attributes.regenerate(elapsed);
    }

    /// Checks every cross-field invariant of the record. A failure means a bug, never bad input.
    pub fn verify(&self) -> AppResult<()> {
        self.inventory.verify()?;
        self.equipment.verify()?;

        let worn = self.equipment.armor_total();
        let rating = self.attributes.armor_rating();
        if rating < 0 || rating != worn {
            return Err(DomainError::InvariantViolated(format!(
                "armor rating {rating} does not match equipped armor {worn}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> CharacterDraft {
        CharacterDraft {
            member_id: MemberId::from("1001"),
            name: "Lydia".to_string(),
            race: "nord".to_string(),
            sex: "female".to_string(),
            desc: "Sworn to carry your burdens.".to_string(),
        }
    }

    #[test]
    fn new_character_uses_race_attributes() {
        let game = GameConfig::builtin().unwrap();
        let c = Character::new(draft(), &game).unwrap();

        assert_eq!(c.lvl, 1);
        assert_eq!(c.xp, 0);
        assert!(c.inventory.is_empty());
        assert!(c.equipment.is_empty());
        let race = game.race("nord").unwrap();
        assert_eq!(c.attributes.unarmed_damage(), race.unarmed_damage);
        c.verify().unwrap();
    }

    #[test]
    fn draft_validation() {
        let game = GameConfig::builtin().unwrap();

        let mut d = draft();
        d.name = "x".repeat(26);
        assert!(matches!(Character::new(d, &game), Err(DomainError::Validation { field: "name", .. })));

        let mut d = draft();
        d.race = "dragon".to_string();
        assert!(Character::new(d, &game).is_err());

        let mut d = draft();
        d.sex = "unknown".to_string();
        assert!(Character::new(d, &game).is_err());

        let mut d = draft();
        d.desc = "a".repeat(1501);
        assert!(matches!(Character::new(d, &game), Err(DomainError::Validation { field: "desc", .. })));
    }

    #[test]
    fn avatar_must_be_http_url() {
        let game = GameConfig::builtin().unwrap();
        let mut c = Character::new(draft(), &game).unwrap();

        c.set_avatar(Some("https://cdn.example.org/lydia.png".to_string())).unwrap();
        assert!(c.avatar.is_some());
        assert!(c.set_avatar(Some("not a url".to_string())).is_err());
        c.set_avatar(None).unwrap();
        assert!(c.avatar.is_none());
    }

    #[test]
    fn document_roundtrip_keeps_state() {
        let game = GameConfig::builtin().unwrap();
        let c = Character::new(draft(), &game).unwrap();
        let json = serde_json::to_string(&c).unwrap();
        let back: Character = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
