use rpgcog::config::Config;
use rpgcog::db::DbResult;
use rpgcog::db::repo::{CharacterRepo, MemoryCharacterRepository, MemoryItemRepository};
use rpgcog::models::character::Character;
use rpgcog::models::attributes::Pool;
use rpgcog::models::equipment::EquipSlot;
use rpgcog::models::item::{Category, ItemDefinition, Rarity};
use rpgcog::models::types::MemberId;
use rpgcog::state::registration::RegistrationStep;
use rpgcog::state::registry::{RegistrationReply, Repos};
use rpgcog::{DomainError, Registry};
use std::sync::Arc;
use std::time::Duration;

fn registry() -> Arc<Registry> {
    let config = Config::builtin("postgres://unused").unwrap();
    Arc::new(Registry::in_memory(Arc::new(config)))
}

async fn register(registry: &Registry, member: &MemberId) {
    assert_eq!(registry.start_registration(member).await.unwrap(), RegistrationStep::Name);
    for answer in ["Farkas", "nord", "male"] {
        assert!(matches!(
            registry.answer_registration(member, answer).await.unwrap(),
            RegistrationReply::Next(_)
        ));
    }
    match registry.answer_registration(member, "Shield-brother.").await.unwrap() {
        RegistrationReply::Created(c) => assert_eq!(c.member_id, *member),
        other => panic!("expected a character, got {other:?}"),
    }
}

async fn weapon(registry: &Registry, name: &str, hands: &str, kind: &str) -> ItemDefinition {
    registry
        .services
        .catalog
        .create_from_args(Category::Weapon, name, "", 10, Rarity::Common, &["melee", hands, kind, "iron", "5"])
        .await
        .unwrap()
}

#[tokio::test]
async fn registration_creates_exactly_one_character() {
    let registry = registry();
    let member = MemberId::from("100");

    register(&registry, &member).await;
    assert!(registry.services.character.exists(&member).await.unwrap());

    assert!(matches!(
        registry.start_registration(&member).await,
        Err(DomainError::CharacterAlreadyExists(_))
    ));
}

#[tokio::test]
async fn equipping_from_an_empty_inventory_fails() {
    let registry = registry();
    let member = MemberId::from("101");
    register(&registry, &member).await;
    let sword = weapon(&registry, "Iron Sword", "1", "sword").await;

    let err = registry.services.character.equip(&member, sword.id, None, None).await.unwrap_err();
    assert!(matches!(err, DomainError::ItemNotFoundInInventory));
}

#[tokio::test]
async fn second_one_handed_weapon_pushes_first_to_left_hand() {
    let registry = registry();
    let chars = &registry.services.character;
    let member = MemberId::from("102");
    register(&registry, &member).await;

    let iron = weapon(&registry, "Iron Sword", "1", "sword").await;
    let steel = weapon(&registry, "Steel Sword", "1", "sword").await;
    chars.add_item(&member, iron.id, 1, None, None).await.unwrap();
    chars.add_item(&member, steel.id, 1, None, None).await.unwrap();

    chars.equip(&member, iron.id, None, None).await.unwrap();
    chars.equip(&member, steel.id, None, None).await.unwrap();

    let c = chars.get(&member).await.unwrap();
    assert_eq!(c.equipment.slot(EquipSlot::RightHand).unwrap().item.id, steel.id);
    assert_eq!(c.equipment.slot(EquipSlot::LeftHand).unwrap().item.id, iron.id);
    assert!(c.inventory.is_empty());
    assert!(matches!(
        chars.find_stacks(&member, iron.id).await,
        Err(DomainError::ItemNotFoundInInventory)
    ));
}

#[tokio::test]
async fn two_handed_weapon_returns_both_hands() {
    let registry = registry();
    let chars = &registry.services.character;
    let member = MemberId::from("103");
    register(&registry, &member).await;

    let dagger = weapon(&registry, "Iron Dagger", "1", "dagger").await;
    let buckler = weapon(&registry, "Buckler", "1", "mace").await;
    let greatsword = weapon(&registry, "Greatsword", "2", "greatsword").await;
    for id in [dagger.id, buckler.id, greatsword.id] {
        chars.add_item(&member, id, 1, None, None).await.unwrap();
    }

    chars.equip(&member, buckler.id, None, None).await.unwrap();
    chars.equip(&member, dagger.id, None, None).await.unwrap();
    chars.equip(&member, greatsword.id, None, None).await.unwrap();

    let c = chars.get(&member).await.unwrap();
    assert_eq!(c.equipment.slot(EquipSlot::RightHand).unwrap().item.id, greatsword.id);
    assert!(c.equipment.slot(EquipSlot::LeftHand).is_none());
    assert_eq!(chars.find_stacks(&member, dagger.id).await.unwrap()[0].count, 1);
    assert_eq!(chars.find_stacks(&member, buckler.id).await.unwrap()[0].count, 1);
}

#[tokio::test]
async fn armor_rating_follows_worn_armor() {
    let registry = registry();
    let chars = &registry.services.character;
    let catalog = &registry.services.catalog;
    let member = MemberId::from("104");
    register(&registry, &member).await;

    let helmet = catalog
        .create_from_args(Category::Armor, "Iron Helmet", "", 60, Rarity::Common, &["helmet", "heavy", "iron", "15"])
        .await
        .unwrap();
    let better = catalog
        .create_from_args(Category::Armor, "Daedric Helmet", "", 1600, Rarity::Legendary, &["helmet", "heavy", "daedric", "23"])
        .await
        .unwrap();
    chars.add_item(&member, helmet.id, 1, Some("Eorlund".into()), Some(2)).await.unwrap();
    chars.add_item(&member, better.id, 1, None, None).await.unwrap();

    chars.equip(&member, helmet.id, Some("Eorlund".into()), Some(2)).await.unwrap();
    assert_eq!(chars.get(&member).await.unwrap().attributes.armor_rating(), 15);

    chars.equip(&member, better.id, None, None).await.unwrap();
    let c = chars.get(&member).await.unwrap();
    assert_eq!(c.attributes.armor_rating(), 23);
    let back = &chars.find_stacks(&member, helmet.id).await.unwrap()[0];
    assert_eq!(back.instance.maker.as_deref(), Some("Eorlund"));
    assert_eq!(back.instance.temper, Some(2));

    assert_eq!(chars.unequip_item(&member, better.id).await.unwrap(), EquipSlot::Helmet);
    assert_eq!(chars.get(&member).await.unwrap().attributes.armor_rating(), 0);
    assert!(matches!(
        chars.unequip_item(&member, better.id).await,
        Err(DomainError::ItemNotFoundInEquipment)
    ));
    assert!(chars.unequip_slot(&member, EquipSlot::Boots).await.unwrap().is_none());
}

#[tokio::test]
async fn generic_items_cannot_be_equipped() {
    let registry = registry();
    let chars = &registry.services.character;
    let member = MemberId::from("105");
    register(&registry, &member).await;

    let roll = registry
        .services
        .catalog
        .create_from_args(Category::Generic, "Sweetroll", "", 2, Rarity::Common, &[] as &[&str])
        .await
        .unwrap();
    chars.add_item(&member, roll.id, 3, None, None).await.unwrap();

    assert!(matches!(
        chars.equip(&member, roll.id, None, None).await,
        Err(DomainError::ItemIsNotEquippable(_))
    ));
    assert_eq!(chars.find_stacks(&member, roll.id).await.unwrap()[0].count, 3);

    chars.remove_item(&member, roll.id, 5, None, None).await.unwrap();
    assert!(chars.get(&member).await.unwrap().inventory.is_empty());
}

/// Character store that pauses between reading and writing, so overlapping mutations of one
/// character actually interleave unless something serializes them.
struct SlowCharacterRepository {
    inner: MemoryCharacterRepository,
}

#[async_trait::async_trait]
impl CharacterRepo for SlowCharacterRepository {
    async fn get(&self, member_id: &MemberId) -> DbResult<Option<Character>> {
        let found = self.inner.get(member_id).await?;
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok(found)
    }

    async fn exists(&self, member_id: &MemberId) -> DbResult<bool> {
        self.inner.exists(member_id).await
    }

    async fn insert(&self, character: &Character) -> DbResult<()> {
        self.inner.insert(character).await
    }

    async fn save(&self, character: &Character) -> DbResult<()> {
        tokio::task::yield_now().await;
        self.inner.save(character).await
    }

    async fn delete(&self, member_id: &MemberId) -> DbResult<bool> {
        self.inner.delete(member_id).await
    }

    async fn list_members(&self) -> DbResult<Vec<MemberId>> {
        self.inner.list_members().await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutations_are_serialized() {
    let config = Arc::new(Config::builtin("postgres://unused").unwrap());
    let repos = Repos {
        item: Arc::new(MemoryItemRepository::new()),
        character: Arc::new(SlowCharacterRepository {
            inner: MemoryCharacterRepository::new(),
        }),
    };
    let registry = Arc::new(Registry::with_repos(repos, config));
    let member = MemberId::from("106");
    register(&registry, &member).await;
    let sword_id = weapon(&registry, "Iron Sword", "1", "sword").await.id;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let registry = registry.clone();
        let member = member.clone();
        handles.push(tokio::spawn(async move {
            registry.services.character.add_item(&member, sword_id, 2, None, None).await
        }));
    }
    for h in handles {
        h.await.unwrap().unwrap();
    }

    let stacks = registry.services.character.find_stacks(&member, sword_id).await.unwrap();
    assert_eq!(stacks.len(), 1);
    assert_eq!(stacks[0].count, 40);
}

#[tokio::test]
async fn regeneration_refills_pools() {
    let registry = registry();
    let member = MemberId::from("107");
    register(&registry, &member).await;

    let mut c = registry.services.character.get(&member).await.unwrap();
    c.attributes.mod_pool(Pool::Stamina, -1000.0);
    registry.repos.character.save(&c).await.unwrap();

    let updated = registry.services.character.regenerate_all(Duration::from_secs(3600)).await.unwrap();
    assert_eq!(updated, 1);

    let c = registry.services.character.get(&member).await.unwrap();
    assert_eq!(c.attributes.current(Pool::Stamina), c.attributes.main().stamina.max);
}

#[tokio::test]
async fn deleted_characters_are_gone() {
    let registry = registry();
    let member = MemberId::from("108");
    register(&registry, &member).await;

    registry.services.character.delete(&member).await.unwrap();
    assert!(matches!(
        registry.services.character.get(&member).await,
        Err(DomainError::CharacterNotFound(_))
    ));
    assert!(matches!(
        registry.services.character.delete(&member).await,
        Err(DomainError::CharacterNotFound(_))
    ));
}
