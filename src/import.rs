use crate::error::AppResult;
use crate::models::item::ItemDraft;
use serde::Deserialize;
use std::path::Path;

/// On-disk catalog: a YAML document with a list of item drafts. Ids are assigned on import.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub items: Vec<ItemDraft>,
}

impl CatalogFile {
    pub fn from_yaml_str(data: &str) -> AppResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(data)?;
        for draft in &file.items {
            draft.validate()?;
        }
        Ok(file)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let file = Self::from_yaml_str(&data)?;
        tracing::debug!(path = %path.display(), items = file.items.len(), "read item catalog");
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;
    use crate::models::item::{Category, Hands, ItemKind};

    #[test]
    fn parses_all_categories() {
        let yaml = r#"
items:
  - name: Iron Sword
    price: 25
    rarity: common
    kind:
      category: weapon
      attack_type: melee
      hands: 1
      weapon_type: sword
      material: iron
      damage: 7
  - name: Iron Helmet
    rarity: common
    kind:
      category: armor
      slot: helmet
      kind: heavy
      material: iron
      armor: 15
  - name: Sweetroll
    desc: Someone stole it once.
    rarity: common
    kind:
      category: generic
"#;
        let file = CatalogFile::from_yaml_str(yaml).unwrap();
        assert_eq!(file.items.len(), 3);
        match &file.items[0].kind {
            ItemKind::Weapon(w) => assert_eq!(w.hands, Hands::One),
            other => panic!("expected weapon, got {other:?}"),
        }
        assert_eq!(file.items[1].kind.category(), Category::Armor);
        assert_eq!(file.items[2].kind, ItemKind::Generic);
        assert_eq!(file.items[2].price, 0);
    }

    #[test]
    fn rejects_unknown_values() {
        let yaml = r#"
items:
  - name: Wooden Shield
    rarity: common
    kind:
      category: armor
      slot: shield
      kind: light
      material: wood
      armor: 5
"#;
        assert!(matches!(CatalogFile::from_yaml_str(yaml), Err(DomainError::Yaml(_))));
    }

    #[test]
    fn rejects_blank_names() {
        let yaml = r#"
items:
  - name: "  "
    rarity: rare
    kind:
      category: generic
"#;
        assert!(matches!(
            CatalogFile::from_yaml_str(yaml),
            Err(DomainError::Validation { field: "name", .. })
        ));
    }
}
