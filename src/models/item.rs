use crate::error::{AppResult, DomainError};
use crate::models::types::ItemId;
use serde::{Deserialize, Serialize};

/// Declares a fieldless enum whose variants map to fixed lowercase keys, as used in
/// catalog files, CLI arguments and stored documents.
macro_rules! keyed_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }
        }

        impl core::str::FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($key => Ok($name::$variant),)+
                    _ => Err(DomainError::Validation {
                        field: $field,
                        message: format!("unknown value '{s}'"),
                    }),
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

keyed_enum!(
    /// Classification that decides which inventory partition an item lives in and how it equips.
    Category, "category" {
        Generic => "generic",
        Weapon => "weapon",
        Armor => "armor",
    }
);

keyed_enum!(Rarity, "rarity" {
    Common => "common",
    Rare => "rare",
    Epic => "epic",
    Legendary => "legendary",
});

keyed_enum!(AttackType, "attack_type" {
    Melee => "melee",
    Range => "range",
});

keyed_enum!(WeaponType, "weapon_type" {
    Crossbow => "crossbow",
    Bow => "bow",
    Greatsword => "greatsword",
    Battleaxe => "battleaxe",
    Warhammer => "warhammer",
    Sword => "sword",
    WarAxe => "war_axe",
    Mace => "mace",
    Dagger => "dagger",
});

keyed_enum!(WeaponMaterial, "material" {
    Iron => "iron",
    Steel => "steel",
    Wood => "wood",
    Silver => "silver",
    Orcish => "orcish",
    Glass => "glass",
    Elven => "elven",
    Ebony => "ebony",
    Dwarven => "dwarven",
    Daedric => "daedric",
});

keyed_enum!(ArmorMaterial, "material" {
    Iron => "iron",
    Steel => "steel",
    Orcish => "orcish",
    Glass => "glass",
    Elven => "elven",
    Ebony => "ebony",
    Dwarven => "dwarven",
    Daedric => "daedric",
    Cloth => "cloth",
    Leather => "leather",
});

keyed_enum!(ArmorKind, "kind" {
    Heavy => "heavy",
    Light => "light",
    Clothing => "clothing",
});

keyed_enum!(
    /// Body slot an armor piece is worn in. Hands are reserved for weapons.
    ArmorSlot, "slot" {
        Helmet => "helmet",
        Cuirass => "cuirass",
        Gauntlets => "gauntlets",
        Boots => "boots",
    }
);

/// Upper bound for weapon damage and armor values. Four worn pieces at this value still fit the
/// armor rating.
pub const STAT_MAX: u32 = 1_000_000;

/// Number of hands a weapon needs. Stored as the plain number 1 or 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Hands {
    One,
    Two,
}

impl TryFrom<u8> for Hands {
    type Error = DomainError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Hands::One),
            2 => Ok(Hands::Two),
            _ => Err(DomainError::Validation {
                field: "hands",
                message: format!("a weapon uses 1 or 2 hands, not {v}"),
            }),
        }
    }
}

impl From<Hands> for u8 {
    fn from(h: Hands) -> u8 {
        match h {
            Hands::One => 1,
            Hands::Two => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub attack_type: AttackType,
    pub hands: Hands,
    pub weapon_type: WeaponType,
    pub material: WeaponMaterial,
    pub damage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmorStats {
    pub slot: ArmorSlot,
    pub kind: ArmorKind,
    pub material: ArmorMaterial,
    pub armor: u32,
}

/// Category-specific part of an item definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum ItemKind {
    Generic,
    Weapon(WeaponStats),
    Armor(ArmorStats),
}

impl ItemKind {
    pub fn category(&self) -> Category {
        match self {
            ItemKind::Generic => Category::Generic,
            ItemKind::Weapon(_) => Category::Weapon,
            ItemKind::Armor(_) => Category::Armor,
        }
    }

    /// Builds the category-specific fields from positional arguments.
    ///
    /// Weapons take `attack_type hands weapon_type material damage`, armor takes
    /// `slot kind material armor`, generic items take nothing.
    pub fn from_args<S: AsRef<str>>(category: Category, args: &[S]) -> AppResult<Self> {
        let expected = match category {
            Category::Generic => 0,
            Category::Weapon => 5,
            Category::Armor => 4,
        };
        if args.len() != expected {
            return Err(DomainError::Validation {
                field: "args",
                message: format!("{category} items take {expected} extra arguments, got {}", args.len()),
            });
        }

        let arg = |i: usize| args[i].as_ref();
        let kind = match category {
            Category::Generic => ItemKind::Generic,
            Category::Weapon => ItemKind::Weapon(WeaponStats {
                attack_type: arg(0).parse()?,
                hands: Hands::try_from(parse_number::<u8>(arg(1), "hands")?)?,
                weapon_type: arg(2).parse()?,
                material: arg(3).parse()?,
                damage: parse_number(arg(4), "damage")?,
            }),
            Category::Armor => ItemKind::Armor(ArmorStats {
                slot: arg(0).parse()?,
                kind: arg(1).parse()?,
                material: arg(2).parse()?,
                armor: parse_number(arg(3), "armor")?,
            }),
        };
        kind.validate()?;
        Ok(kind)
    }

    pub fn validate(&self) -> AppResult<()> {
        let (field, value) = match self {
            ItemKind::Generic => return Ok(()),
            ItemKind::Weapon(w) => ("damage", w.damage),
            ItemKind::Armor(a) => ("armor", a.armor),
        };
        if value > STAT_MAX {
            return Err(DomainError::Validation {
                field,
                message: format!("{value} exceeds the maximum of {STAT_MAX}"),
            });
        }
        Ok(())
    }
}

fn parse_number<T: core::str::FromStr>(s: &str, field: &'static str) -> AppResult<T> {
    s.trim().parse::<T>().map_err(|_| DomainError::Validation {
        field,
        message: format!("'{s}' is not a valid non-negative number"),
    })
}

/// Everything needed to create a catalog entry except its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub price: u32,
    pub rarity: Rarity,
    pub kind: ItemKind,
}

impl ItemDraft {
    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::Validation {
                field: "name",
                message: "item name must not be empty".to_string(),
            });
        }
        self.kind.validate()
    }
}

/// Immutable catalog entry. Once created it is never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    pub desc: String,
    pub price: u32,
    pub rarity: Rarity,
    pub kind: ItemKind,
}

impl ItemDefinition {
    pub fn new(id: ItemId, draft: ItemDraft) -> AppResult<Self> {
        draft.validate()?;
        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            desc: draft.desc,
            price: draft.price,
            rarity: draft.rarity,
            kind: draft.kind,
        })
    }

    #[inline]
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn weapon(&self) -> Option<&WeaponStats> {
        match &self.kind {
            ItemKind::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn armor(&self) -> Option<&ArmorStats> {
        match &self.kind {
            ItemKind::Armor(a) => Some(a),
            _ => None,
        }
    }

    /// Armor rating this item adds while worn. Zero for anything that is not armor. Values above
    /// [`STAT_MAX`] count as `STAT_MAX`.
    pub fn armor_value(&self) -> i32 {
        self.armor()
            .and_then(|a| i32::try_from(a.armor.min(STAT_MAX)).ok())
            .unwrap_or(0)
    }

    pub fn is_two_handed(&self) -> bool {
        self.weapon().is_some_and(|w| w.hands == Hands::Two)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weapon_from_positional_args() {
        let kind = ItemKind::from_args(Category::Weapon, &["melee", "2", "greatsword", "steel", "17"]).unwrap();
        assert_eq!(
            kind,
            ItemKind::Weapon(WeaponStats {
                attack_type: AttackType::Melee,
                hands: Hands::Two,
                weapon_type: WeaponType::Greatsword,
                material: WeaponMaterial::Steel,
                damage: 17,
            })
        );
        assert_eq!(kind.category(), Category::Weapon);
    }

    #[test]
    fn armor_from_positional_args() {
        let kind = ItemKind::from_args(Category::Armor, &["Helmet", "heavy", "iron", "15"]).unwrap();
        match kind {
            ItemKind::Armor(a) => {
                assert_eq!(a.slot, ArmorSlot::Helmet);
                assert_eq!(a.armor, 15);
            }
            other => panic!("expected armor, got {other:?}"),
        }
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let err = ItemKind::from_args(Category::Armor, &["helmet", "heavy"]).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "args", .. }));

        let err = ItemKind::from_args(Category::Generic, &["extra"]).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "args", .. }));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ItemKind::from_args(Category::Weapon, &["melee", "3", "sword", "iron", "5"]).is_err());
        assert!(ItemKind::from_args(Category::Weapon, &["melee", "1", "sword", "iron", "-5"]).is_err());
        assert!(ItemKind::from_args(Category::Armor, &["shield", "heavy", "iron", "5"]).is_err());
        assert!("potion".parse::<Category>().is_err());
    }

    #[test]
    fn oversized_stats_are_rejected() {
        let err = ItemKind::from_args(Category::Armor, &["helmet", "heavy", "iron", "3000000000"]).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "armor", .. }));
        let err = ItemKind::from_args(Category::Weapon, &["melee", "1", "sword", "iron", "2000000000"]).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field: "damage", .. }));
        assert!(ItemKind::from_args(Category::Armor, &["boots", "light", "leather", "1000000"]).is_ok());

        let draft = ItemDraft {
            name: "Giant Plate".to_string(),
            desc: String::new(),
            price: 0,
            rarity: Rarity::Legendary,
            kind: ItemKind::Armor(ArmorStats {
                slot: ArmorSlot::Cuirass,
                kind: ArmorKind::Heavy,
                material: ArmorMaterial::Ebony,
                armor: STAT_MAX + 1,
            }),
        };
        assert!(ItemDefinition::new(ItemId(1), draft).is_err());
    }

    #[test]
    fn document_shape_is_tagged_by_category() {
        let item = ItemDefinition::new(
            ItemId(3),
            ItemDraft {
                name: " Iron Dagger ".to_string(),
                desc: "Short and sharp".to_string(),
                price: 10,
                rarity: Rarity::Common,
                kind: ItemKind::from_args(Category::Weapon, &["melee", "1", "dagger", "iron", "4"]).unwrap(),
            },
        )
        .unwrap();
        assert_eq!(item.name, "Iron Dagger");

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"]["category"], "weapon");
        assert_eq!(json["kind"]["hands"], 1);
        assert_eq!(json["kind"]["weapon_type"], "dagger");

        let back: ItemDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn empty_name_is_rejected() {
        let draft = ItemDraft {
            name: "   ".to_string(),
            desc: String::new(),
            price: 0,
            rarity: Rarity::Rare,
            kind: ItemKind::Generic,
        };
        assert!(ItemDefinition::new(ItemId::FIRST, draft).is_err());
    }
}
