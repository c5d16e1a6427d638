use crate::error::{AppResult, DomainError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const SKILL_MAX: f64 = 100.0;
pub const RESIST_LIMIT: f64 = 90.0;

/// Resource pools that drain in play and regenerate over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pool {
    Health,
    Stamina,
    Magicka,
}

impl Pool {
    pub const ALL: [Pool; 3] = [Pool::Health, Pool::Stamina, Pool::Magicka];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pool::Health => "health",
            Pool::Stamina => "stamina",
            Pool::Magicka => "magicka",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "health" => Some(Pool::Health),
            "stamina" => Some(Pool::Stamina),
            "magicka" => Some(Pool::Magicka),
            _ => None,
        }
    }
}

/// Base numbers of one pool. `regen` is the percentage of `max` restored per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStats {
    pub max: f64,
    #[serde(default)]
    pub regen: f64,
    #[serde(default)]
    pub buff: f64,
}

impl PoolStats {
    /// Upper bound of the pool including temporary bonuses.
    pub fn total(&self) -> f64 {
        self.max + self.buff
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainStats {
    pub health: PoolStats,
    pub stamina: PoolStats,
    pub magicka: PoolStats,
}

impl MainStats {
    pub fn pool(&self, pool: Pool) -> &PoolStats {
        match pool {
            Pool::Health => &self.health,
            Pool::Stamina => &self.stamina,
            Pool::Magicka => &self.magicka,
        }
    }
}

/// Numbers describing a character: current pools, their base stats, resistances, skills and the
/// armor rating derived from equipped armor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    health: f64,
    stamina: f64,
    magicka: f64,
    main: MainStats,
    #[serde(default)]
    resists: BTreeMap<String, f64>,
    #[serde(default)]
    skills: BTreeMap<String, f64>,
    #[serde(default)]
    armor_rating: i32,
    #[serde(default)]
    unarmed_damage: i32,
}

impl Attributes {
    /// Fresh attributes with every pool full.
    pub fn new(main: MainStats, resists: BTreeMap<String, f64>, skills: BTreeMap<String, f64>, unarmed_damage: i32) -> Self {
        let mut attrs = Self {
            health: 0.0,
            stamina: 0.0,
            magicka: 0.0,
            main,
            resists,
            skills,
            armor_rating: 0,
            unarmed_damage,
        };
        attrs.restore();
        attrs
    }

    pub fn current(&self, pool: Pool) -> f64 {
        match pool {
            Pool::Health => self.health,
            Pool::Stamina => self.stamina,
            Pool::Magicka => self.magicka,
        }
    }

    fn current_mut(&mut self, pool: Pool) -> &mut f64 {
        match pool {
            Pool::Health => &mut self.health,
            Pool::Stamina => &mut self.stamina,
            Pool::Magicka => &mut self.magicka,
        }
    }

    pub fn main(&self) -> &MainStats {
        &self.main
    }

    /// Maximum of a pool including buffs.
    pub fn total(&self, pool: Pool) -> f64 {
        self.main.pool(pool).total()
    }

    pub fn resists(&self) -> &BTreeMap<String, f64> {
        &self.resists
    }

    pub fn skills(&self) -> &BTreeMap<String, f64> {
        &self.skills
    }

    pub fn armor_rating(&self) -> i32 {
        self.armor_rating
    }

    pub fn unarmed_damage(&self) -> i32 {
        self.unarmed_damage
    }

    pub(crate) fn add_armor(&mut self, armor: i32) {
        self.armor_rating += armor;
    }

    pub(crate) fn remove_armor(&mut self, armor: i32) {
        self.armor_rating -= armor;
        debug_assert!(self.armor_rating >= 0, "armor rating dropped below zero");
    }

    /// Moves a pool by `delta`, keeping it within `[0, total]`.
    pub fn mod_pool(&mut self, pool: Pool, delta: f64) {
        let total = self.total(pool);
        let cur = self.current_mut(pool);
        *cur = (*cur + delta).clamp(0.0, total.max(0.0));
    }

    /// Changes any attribute by name.
    ///
    /// Pools are kept within `[0, total]`, skills within `[0, 100]` and resistances within
    /// `[-90, 90]`. `unarmed_damage` is a plain add. The armor rating is derived from equipment
    /// and cannot be changed here.
    pub fn mod_value(&mut self, attribute: &str, delta: f64) -> AppResult<()> {
        if let Some(pool) = Pool::parse(attribute) {
            self.mod_pool(pool, delta);
            return Ok(());
        }
        if attribute == "unarmed_damage" {
            self.unarmed_damage += delta.round() as i32;
            return Ok(());
        }
        if let Some(v) = self.skills.get_mut(attribute) {
            *v = (*v + delta).clamp(0.0, SKILL_MAX);
            return Ok(());
        }
        if let Some(v) = self.resists.get_mut(attribute) {
            *v = (*v + delta).clamp(-RESIST_LIMIT, RESIST_LIMIT);
            return Ok(());
        }
        Err(DomainError::AttributeNotFound(attribute.to_string()))
    }

    /// Refills every pool to its base maximum.
    pub fn restore(&mut self) {
        for pool in Pool::ALL {
            let max = self.main.pool(pool).max;
            *self.current_mut(pool) = max;
        }
    }

    /// Regenerates every pool by `max * regen * elapsed / 100`.
    pub fn regenerate(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        for pool in Pool::ALL {
            let stats = self.main.pool(pool);
            let gain = stats.max * stats.regen * secs / 100.0;
            self.mod_pool(pool, gain);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs() -> Attributes {
        let main = MainStats {
            health: PoolStats {
                max: 100.0,
                regen: 1.0,
                buff: 10.0,
            },
            stamina: PoolStats {
                max: 80.0,
                regen: 2.5,
                buff: 0.0,
            },
            magicka: PoolStats {
                max: 50.0,
                regen: 0.0,
                buff: 0.0,
            },
        };
        let resists = BTreeMap::from([("fire".to_string(), 0.0)]);
        let skills = BTreeMap::from([("one_handed".to_string(), 15.0)]);
        Attributes::new(main, resists, skills, 5)
    }

    #[test]
    fn new_attributes_start_full() {
        let a = attrs();
        assert_eq!(a.current(Pool::Health), 100.0);
        assert_eq!(a.current(Pool::Stamina), 80.0);
        assert_eq!(a.total(Pool::Health), 110.0);
        assert_eq!(a.armor_rating(), 0);
    }

    #[test]
    fn regeneration_is_proportional_and_clamped() {
        let mut a = attrs();
        a.mod_pool(Pool::Health, -60.0);
        a.mod_pool(Pool::Stamina, -80.0);
        a.mod_pool(Pool::Magicka, -10.0);

        a.regenerate(Duration::from_secs(5));
        assert!((a.current(Pool::Health) - 45.0).abs() < 1e-9);
        assert!((a.current(Pool::Stamina) - 10.0).abs() < 1e-9);
        assert_eq!(a.current(Pool::Magicka), 40.0);

        a.regenerate(Duration::from_secs(3600));
        assert_eq!(a.current(Pool::Health), 110.0);
        assert_eq!(a.current(Pool::Stamina), 80.0);
    }

    #[test]
    fn pools_never_go_negative() {
        let mut a = attrs();
        a.mod_value("health", -1000.0).unwrap();
        assert_eq!(a.current(Pool::Health), 0.0);
    }

    #[test]
    fn skills_and_resists_are_clamped() {
        let mut a = attrs();
        a.mod_value("one_handed", 500.0).unwrap();
        assert_eq!(a.skills()["one_handed"], 100.0);
        a.mod_value("one_handed", -500.0).unwrap();
        assert_eq!(a.skills()["one_handed"], 0.0);

        a.mod_value("fire", 120.0).unwrap();
        assert_eq!(a.resists()["fire"], 90.0);
        a.mod_value("fire", -500.0).unwrap();
        assert_eq!(a.resists()["fire"], -90.0);

        a.mod_value("unarmed_damage", 3.0).unwrap();
        assert_eq!(a.unarmed_damage(), 8);
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let mut a = attrs();
        assert!(matches!(
            a.mod_value("armor_rating", 5.0),
            Err(DomainError::AttributeNotFound(_))
        ));
        assert!(matches!(a.mod_value("luck", 1.0), Err(DomainError::AttributeNotFound(_))));
    }
}
