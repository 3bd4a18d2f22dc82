//! Battle resolution between an attacking army and a defended city.
//!
//! Discrete simultaneous rounds: troop waves act in a fixed movement order,
//! siege engines batter the wall, fixed defenses thin the leading waves
//! before the lines meet, and casualties apply at the end of each round.
//! The whole engine is deterministic - same armies, same result.

pub const TROOP_KINDS: usize = 12;
pub const FORT_KINDS: usize = 5;

/// Hitpoints per wall level; rams and catapults chew through this before
/// the defender loses the wall defense bonus.
pub const WALL_HITPOINTS_PER_LEVEL: i64 = 10_000;

pub const DEFAULT_MAX_ROUNDS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum TroopKind {
    Worker = 0,
    Warrior = 1,
    Scout = 2,
    Pikeman = 3,
    Swordsman = 4,
    Archer = 5,
    Transporter = 6,
    Cavalry = 7,
    Cataphract = 8,
    Ballista = 9,
    Ram = 10,
    Catapult = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum FortKind {
    Trap = 0,
    Abatis = 1,
    ArcherTower = 2,
    RollingLog = 3,
    Trebuchet = 4,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TroopStats {
    pub life: f64,
    pub attack: f64,
    pub defense: f64,
    pub speed: f64,
    pub range: f64,
}

/// Base stats per troop kind, in [`TroopKind`] order.
pub const BASE_STATS: [TroopStats; TROOP_KINDS] = [
    TroopStats { life: 100.0, attack: 5.0, defense: 50.0, speed: 180.0, range: 10.0 },
    TroopStats { life: 200.0, attack: 50.0, defense: 50.0, speed: 200.0, range: 20.0 },
    TroopStats { life: 100.0, attack: 20.0, defense: 50.0, speed: 3000.0, range: 20.0 },
    TroopStats { life: 300.0, attack: 150.0, defense: 150.0, speed: 300.0, range: 50.0 },
    TroopStats { life: 350.0, attack: 100.0, defense: 250.0, speed: 275.0, range: 30.0 },
    TroopStats { life: 250.0, attack: 120.0, defense: 50.0, speed: 250.0, range: 1200.0 },
    TroopStats { life: 700.0, attack: 10.0, defense: 60.0, speed: 150.0, range: 10.0 },
    TroopStats { life: 500.0, attack: 250.0, defense: 180.0, speed: 1000.0, range: 100.0 },
    TroopStats { life: 1000.0, attack: 350.0, defense: 350.0, speed: 750.0, range: 80.0 },
    TroopStats { life: 320.0, attack: 450.0, defense: 160.0, speed: 100.0, range: 1400.0 },
    TroopStats { life: 5000.0, attack: 250.0, defense: 160.0, speed: 120.0, range: 600.0 },
    TroopStats { life: 480.0, attack: 600.0, defense: 200.0, speed: 80.0, range: 1500.0 },
];

/// Base stats per fortification kind, in [`FortKind`] order.
pub const FORT_STATS: [TroopStats; FORT_KINDS] = [
    TroopStats { life: 0.0, attack: 0.0, defense: 0.0, speed: 0.0, range: 5000.0 },
    TroopStats { life: 0.0, attack: 0.0, defense: 0.0, speed: 0.0, range: 5000.0 },
    TroopStats { life: 2000.0, attack: 300.0, defense: 360.0, speed: 0.0, range: 1300.0 },
    TroopStats { life: 0.0, attack: 500.0, defense: 0.0, speed: 0.0, range: 1300.0 },
    TroopStats { life: 0.0, attack: 800.0, defense: 0.0, speed: 0.0, range: 5000.0 },
];

/// Order in which waves engage each round (fastest scouts and riders first,
/// slow siege engines last).
pub const MOVEMENT_ORDER: [usize; TROOP_KINDS] = [2, 7, 8, 3, 4, 1, 0, 6, 10, 5, 9, 11];

const GROUND_KINDS: [usize; 6] = [0, 1, 2, 3, 4, 5];
const MOUNTED_KINDS: [usize; 2] = [7, 8];
const RANGED_KINDS: [usize; 3] = [5, 9, 11];
const MECH_KINDS: [usize; 3] = [9, 10, 11];

/// Counter bonuses on top of the neutral 1.0 multiplier.
pub fn damage_modifier(attacker: usize, defender: usize) -> f64 {
    match (attacker, defender) {
        (3, 4) | (3, 5) => 1.8,
        (4, 6) => 1.1,
        (7, 7) | (7, 8) => 1.2,
        (8, 9) => 1.2,
        _ => 1.0,
    }
}

/// Technology levels that scale combat stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Research {
    pub military_tradition: u8,
    pub iron_working: u8,
    pub medicine: u8,
    pub compass: u8,
    pub horseback_riding: u8,
    pub archery: u8,
    pub machinery: u8,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hero {
    pub attack: u8,
    pub intel: u8,
    pub leadership: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Army {
    pub troops: [i64; TROOP_KINDS],
    pub research: Research,
    pub hero: Hero,
    pub attack_modifier: f64,
    pub defense_modifier: f64,
    pub life_modifier: f64,
}

impl Default for Army {
    fn default() -> Army {
        Army {
            troops: [0; TROOP_KINDS],
            research: Research::default(),
            hero: Hero::default(),
            attack_modifier: 1.0,
            defense_modifier: 1.0,
            life_modifier: 1.0,
        }
    }
}

impl Army {
    pub fn total_troops(&self) -> i64 {
        self.troops.iter().sum()
    }
}

/// The defending side: garrison plus fixed defenses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Defense {
    pub army: Army,
    pub fortifications: [i64; FORT_KINDS],
    pub wall_level: u32,
    pub gate_open: bool,
    pub trap_kill_power: f64,
    pub log_kill_power: f64,
    pub rock_kill_power: f64,
}

impl Default for Defense {
    fn default() -> Defense {
        Defense {
            army: Army::default(),
            fortifications: [0; FORT_KINDS],
            wall_level: 0,
            gate_open: false,
            trap_kill_power: 1.25,
            log_kill_power: 1.25,
            rock_kill_power: 1.25,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BattleOutcome {
    AttackerWins,
    DefenderWins,
    /// Neither side could finish the other inside the round cap.
    Stalemate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BattleResult {
    pub outcome: BattleOutcome,
    pub rounds: u32,
    pub attacker_remaining: [i64; TROOP_KINDS],
    pub defender_remaining: [i64; TROOP_KINDS],
    pub fortifications_remaining: [i64; FORT_KINDS],
    pub wall_hitpoints: i64,
}

/// Effective per-kind stats after research, hero and flat modifiers.
fn effective_stats(army: &Army) -> [TroopStats; TROOP_KINDS] {
    let research = &army.research;
    let hero = &army.hero;
    let mut stats = BASE_STATS;
    for (kind, stat) in stats.iter_mut().enumerate() {
        let mut attack_scale = army.attack_modifier
            * (1.0 + 0.05 * f64::from(research.iron_working))
            * (1.0 + 0.01 * f64::from(hero.attack));
        if RANGED_KINDS.contains(&kind) {
            attack_scale *= 1.0 + 0.05 * f64::from(research.archery);
        }
        if MECH_KINDS.contains(&kind) {
            attack_scale *= 1.0 + 0.05 * f64::from(research.machinery);
        }
        let defense_scale = army.defense_modifier
            * (1.0 + 0.03 * f64::from(research.military_tradition))
            * (1.0 + 0.01 * f64::from(hero.intel));
        let life_scale = army.life_modifier
            * (1.0 + 0.05 * f64::from(research.medicine))
            * (1.0 + 0.01 * f64::from(hero.leadership));

        stat.attack *= attack_scale;
        stat.defense *= defense_scale;
        stat.life *= life_scale;
        if MOUNTED_KINDS.contains(&kind) {
            stat.speed *= 1.0 + 0.05 * f64::from(research.horseback_riding);
        }
        if RANGED_KINDS.contains(&kind) {
            stat.range *= 1.0 + 0.05 * f64::from(research.compass);
        }
    }
    stats
}

/// First wave in movement order matching `filter`, by the live counts.
fn leading_wave(troops: &[i64; TROOP_KINDS], filter: impl Fn(usize) -> bool) -> Option<usize> {
    MOVEMENT_ORDER
        .into_iter()
        .find(|&kind| troops[kind] > 0 && filter(kind))
}

/// Single-use defenses spring against the leading eligible wave: one device
/// per incoming trooper, each killing `power` of them.
fn spring_devices(
    troops: &mut [i64; TROOP_KINDS],
    devices: &mut i64,
    power: f64,
    eligible: impl Fn(usize) -> bool,
) {
    while *devices > 0 {
        let Some(wave) = leading_wave(troops, &eligible) else {
            return;
        };
        let sprung = (*devices).min(troops[wave]);
        let kills = ((sprung as f64 * power) as i64).min(troops[wave]);
        troops[wave] -= kills;
        *devices -= sprung;
        if kills == 0 {
            return;
        }
    }
}

/// Raw damage translated into casualties against a defending stat line.
fn casualties(damage: f64, target: &TroopStats, mitigation: f64) -> i64 {
    if target.life <= 0.0 {
        return 0;
    }
    (damage * mitigation / target.life) as i64
}

/// Damage mitigation from the defending stat line: tougher targets shrug
/// off a larger share of incoming damage.
fn mitigation(attack: f64, defense: f64) -> f64 {
    if attack + defense <= 0.0 {
        return 0.0;
    }
    attack / (attack + defense)
}

pub fn fight(attacker: &Army, defender: &Defense) -> BattleResult {
    fight_rounds(attacker, defender, DEFAULT_MAX_ROUNDS)
}

pub fn fight_rounds(attacker: &Army, defender: &Defense, max_rounds: u32) -> BattleResult {
    let atk_stats = effective_stats(attacker);
    let def_stats = effective_stats(&defender.army);

    let mut atk = attacker.troops;
    let mut def = defender.army.troops;
    let mut forts = defender.fortifications;
    let mut wall_hp = i64::from(defender.wall_level) * WALL_HITPOINTS_PER_LEVEL;
    if defender.gate_open {
        wall_hp = 0;
    }

    // Approach attrition before the lines meet.
    spring_devices(
        &mut atk,
        &mut forts[FortKind::Trap as usize],
        defender.trap_kill_power,
        |kind| GROUND_KINDS.contains(&kind),
    );
    spring_devices(
        &mut atk,
        &mut forts[FortKind::Abatis as usize],
        defender.trap_kill_power,
        |kind| MOUNTED_KINDS.contains(&kind),
    );

    let mut rounds = 0;
    let outcome = loop {
        let defender_standing =
            def.iter().any(|&count| count > 0) || forts[FortKind::ArcherTower as usize] > 0;
        if atk.iter().all(|&count| count <= 0) {
            break BattleOutcome::DefenderWins;
        }
        if !defender_standing {
            break BattleOutcome::AttackerWins;
        }
        if rounds >= max_rounds {
            break BattleOutcome::Stalemate;
        }
        rounds += 1;

        let wall_standing = wall_hp > 0;
        let wall_bonus = if wall_standing {
            1.0 + 0.05 * f64::from(defender.wall_level)
        } else {
            1.0
        };

        let mut atk_losses = [0i64; TROOP_KINDS];
        let mut def_losses = [0i64; TROOP_KINDS];
        let mut tower_losses = 0i64;
        let mut wall_damage = 0i64;

        // Attacker waves engage in movement order.
        for kind in MOVEMENT_ORDER {
            let count = atk[kind];
            if count <= 0 {
                continue;
            }
            let stat = &atk_stats[kind];
            if wall_standing && (kind == TroopKind::Ram as usize || kind == TroopKind::Catapult as usize) {
                wall_damage += (count as f64 * stat.attack) as i64;
                continue;
            }
            let raw = count as f64 * stat.attack;
            if let Some(target) = leading_wave(&def, |_| true) {
                let target_stat = &def_stats[target];
                let damage = raw * damage_modifier(kind, target);
                let mit = mitigation(stat.attack, target_stat.defense * wall_bonus);
                def_losses[target] += casualties(damage, target_stat, mit);
            } else {
                let tower = &FORT_STATS[FortKind::ArcherTower as usize];
                let mit = mitigation(stat.attack, tower.defense * wall_bonus);
                tower_losses += casualties(raw, tower, mit);
            }
        }

        // Garrison answers in the same order.
        for kind in MOVEMENT_ORDER {
            let count = def[kind];
            if count <= 0 {
                continue;
            }
            let stat = &def_stats[kind];
            if let Some(target) = leading_wave(&atk, |_| true) {
                let target_stat = &atk_stats[target];
                let damage = count as f64 * stat.attack * damage_modifier(kind, target);
                let mit = mitigation(stat.attack, target_stat.defense);
                atk_losses[target] += casualties(damage, target_stat, mit);
            }
        }

        // Fixed defenses: towers always shoot, wall engines only while the
        // wall stands.
        let mut fort_fire = |kind: FortKind, power: f64| {
            let count = forts[kind as usize];
            if count <= 0 {
                return;
            }
            let stat = &FORT_STATS[kind as usize];
            if let Some(target) = leading_wave(&atk, |_| true) {
                let target_stat = &atk_stats[target];
                let damage = count as f64 * stat.attack * power;
                let mit = mitigation(stat.attack, target_stat.defense);
                atk_losses[target] += casualties(damage, target_stat, mit);
            }
        };
        fort_fire(FortKind::ArcherTower, 1.0);
        if wall_standing {
            fort_fire(FortKind::RollingLog, defender.log_kill_power);
            fort_fire(FortKind::Trebuchet, defender.rock_kill_power);
        }

        // Simultaneous application.
        for kind in 0..TROOP_KINDS {
            atk[kind] = (atk[kind] - atk_losses[kind]).max(0);
            def[kind] = (def[kind] - def_losses[kind]).max(0);
        }
        let towers = &mut forts[FortKind::ArcherTower as usize];
        *towers = (*towers - tower_losses).max(0);
        wall_hp = (wall_hp - wall_damage).max(0);
    };

    BattleResult {
        outcome,
        rounds,
        attacker_remaining: atk,
        defender_remaining: def,
        fortifications_remaining: forts,
        wall_hitpoints: wall_hp,
    }
}
