//! Harvest system - channeled shearing and milking sessions.
//!
//! A session is started against a fully-grown animal, claims its growth
//! meter immediately, and freezes the animal. The player then has to
//! reach the animal and stay put for the channel duration. Every exit
//! path - completion, drift, range, target death - unfreezes the animal
//! and clears the session; a frozen animal with no session would be
//! stuck forever.

use hecs::{Entity, World};

use crate::components::{AnimalState, LifeState, Position, Species, GROWTH_MAX};
use crate::events::HarvestProduct;
use crate::player::Player;

/// Player distance at which the channel starts
pub const HARVEST_REACH_DIST: f32 = 20.0;
/// Drifting past this after reaching the animal cancels the channel
pub const HARVEST_DRIFT_CANCEL_DIST: f32 = 40.0;
/// Walking this far away before reaching the animal gives up on it
pub const HARVEST_APPROACH_CANCEL_DIST: f32 = 350.0;
/// Channel time in seconds
pub const HARVEST_DURATION: f32 = 5.0;

/// Which harvest interaction is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestKind {
    Shear,
    Milk,
}

impl HarvestKind {
    pub fn product(&self) -> HarvestProduct {
        match self {
            HarvestKind::Shear => HarvestProduct::Wool,
            HarvestKind::Milk => HarvestProduct::Milk,
        }
    }
}

/// An in-flight harvest channel
#[derive(Debug, Clone)]
pub struct HarvestSession {
    pub target: Entity,
    pub kind: HarvestKind,
    pub timer: f32,
    pub reached: bool,
}

impl HarvestSession {
    fn new(target: Entity, kind: HarvestKind) -> Self {
        Self {
            target,
            kind,
            timer: 0.0,
            reached: false,
        }
    }
}

/// Terminal outcome of a harvest tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestTick {
    Complete(HarvestProduct),
    Cancelled,
}

/// Start a harvest against a fully-grown, living animal. The growth
/// meter is claimed here, not at completion.
pub fn begin_harvest<S: Species>(
    world: &mut World,
    session: &mut Option<HarvestSession>,
    target: Entity,
    kind: HarvestKind,
) -> bool {
    if session.is_some() {
        return false;
    }
    let alive = world
        .get::<&LifeState>(target)
        .map(|life| !life.is_dying())
        .unwrap_or(false);
    if !alive {
        return false;
    }
    {
        let Ok(mut species) = world.get::<&mut S>(target) else {
            return false;
        };
        if species.growth() < GROWTH_MAX {
            return false;
        }
        species.reset_growth();
    }
    if let Ok(mut state) = world.get::<&mut AnimalState>(target) {
        state.harvested = true;
    }
    *session = Some(HarvestSession::new(target, kind));
    true
}

/// Cancel the active session, if any, unfreezing its target
pub fn cancel_harvest(world: &mut World, session: &mut Option<HarvestSession>) -> bool {
    match session.take() {
        Some(s) => {
            unfreeze(world, s.target);
            true
        }
        None => false,
    }
}

fn unfreeze(world: &mut World, target: Entity) {
    if let Ok(mut state) = world.get::<&mut AnimalState>(target) {
        state.harvested = false;
    }
}

fn abort(world: &mut World, session: &mut Option<HarvestSession>, target: Entity) -> HarvestTick {
    unfreeze(world, target);
    *session = None;
    HarvestTick::Cancelled
}

/// Advance the active harvest channel by one tick
pub fn harvest_system(
    world: &mut World,
    player: &Player,
    session: &mut Option<HarvestSession>,
    dt: f32,
) -> Option<HarvestTick> {
    let (target, kind, reached) = match session.as_ref() {
        Some(s) => (s.target, s.kind, s.reached),
        None => return None,
    };

    let target_pos = match world.get::<&Position>(target) {
        Ok(pos) => pos.0,
        Err(_) => {
            *session = None;
            return Some(HarvestTick::Cancelled);
        }
    };
    let alive = world
        .get::<&LifeState>(target)
        .map(|life| !life.is_dying())
        .unwrap_or(false);
    if !alive {
        return Some(abort(world, session, target));
    }

    let dist = player.pos().distance(&target_pos);

    if !reached {
        if dist < HARVEST_REACH_DIST {
            if let Some(s) = session.as_mut() {
                s.reached = true;
            }
        } else if dist > HARVEST_APPROACH_CANCEL_DIST {
            return Some(abort(world, session, target));
        } else {
            return None;
        }
    }

    if dist > HARVEST_DRIFT_CANCEL_DIST {
        return Some(abort(world, session, target));
    }

    if let Some(s) = session.as_mut() {
        s.timer += dt;
        if s.timer >= HARVEST_DURATION {
            unfreeze(world, target);
            *session = None;
            return Some(HarvestTick::Complete(kind.product()));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Cow, Sheep};
    use crate::systems::grazing::spawn_animal;

    fn grown_sheep(world: &mut World, x: f32, y: f32) -> Entity {
        let e = spawn_animal::<Sheep>(world, x, y);
        world.get::<&mut Sheep>(e).unwrap().wool_growth = GROWTH_MAX;
        e
    }

    #[test]
    fn test_begin_requires_full_growth() {
        let mut world = World::new();
        let mut session = None;

        let sheep = spawn_animal::<Sheep>(&mut world, 0.0, 0.0);
        world.get::<&mut Sheep>(sheep).unwrap().wool_growth = 50.0;
        assert!(!begin_harvest::<Sheep>(
            &mut world,
            &mut session,
            sheep,
            HarvestKind::Shear
        ));

        world.get::<&mut Sheep>(sheep).unwrap().wool_growth = GROWTH_MAX;
        assert!(begin_harvest::<Sheep>(
            &mut world,
            &mut session,
            sheep,
            HarvestKind::Shear
        ));

        // Growth is claimed at start, and the animal is frozen
        assert_eq!(world.get::<&Sheep>(sheep).unwrap().wool_growth, 0.0);
        assert!(world.get::<&AnimalState>(sheep).unwrap().harvested);
    }

    #[test]
    fn test_shear_completes_after_channel() {
        let mut world = World::new();
        let mut session = None;
        let player = Player::default();

        let sheep = grown_sheep(&mut world, 5.0, 0.0);
        assert!(begin_harvest::<Sheep>(
            &mut world,
            &mut session,
            sheep,
            HarvestKind::Shear
        ));

        for _ in 0..4 {
            assert_eq!(harvest_system(&mut world, &player, &mut session, 1.0), None);
        }
        assert_eq!(
            harvest_system(&mut world, &player, &mut session, 1.0),
            Some(HarvestTick::Complete(HarvestProduct::Wool))
        );
        assert!(session.is_none());
        assert!(!world.get::<&AnimalState>(sheep).unwrap().harvested);
    }

    #[test]
    fn test_milking_yields_milk() {
        let mut world = World::new();
        let mut session = None;
        let player = Player::default();

        let cow = spawn_animal::<Cow>(&mut world, 0.0, 0.0);
        world.get::<&mut Cow>(cow).unwrap().milk_production = GROWTH_MAX;
        assert!(begin_harvest::<Cow>(
            &mut world,
            &mut session,
            cow,
            HarvestKind::Milk
        ));

        for _ in 0..5 {
            harvest_system(&mut world, &player, &mut session, 1.1);
        }
        assert!(session.is_none());
    }

    #[test]
    fn test_drift_cancels_and_unfreezes() {
        let mut world = World::new();
        let mut session = None;
        let mut player = Player::default();

        let sheep = grown_sheep(&mut world, 5.0, 0.0);
        begin_harvest::<Sheep>(&mut world, &mut session, sheep, HarvestKind::Shear);

        // Reach, then wander off mid-channel
        harvest_system(&mut world, &player, &mut session, 1.0);
        player.x = 100.0;
        assert_eq!(
            harvest_system(&mut world, &player, &mut session, 1.0),
            Some(HarvestTick::Cancelled)
        );
        assert!(session.is_none());
        assert!(!world.get::<&AnimalState>(sheep).unwrap().harvested);
    }

    #[test]
    fn test_walking_away_before_reaching_cancels() {
        let mut world = World::new();
        let mut session = None;
        let player = Player {
            x: 400.0,
            ..Player::default()
        };

        let sheep = grown_sheep(&mut world, 0.0, 0.0);
        begin_harvest::<Sheep>(&mut world, &mut session, sheep, HarvestKind::Shear);

        assert_eq!(
            harvest_system(&mut world, &player, &mut session, 1.0),
            Some(HarvestTick::Cancelled)
        );
        assert!(!world.get::<&AnimalState>(sheep).unwrap().harvested);
    }

    #[test]
    fn test_target_death_cancels() {
        let mut world = World::new();
        let mut session = None;
        let player = Player::default();

        let sheep = grown_sheep(&mut world, 5.0, 0.0);
        begin_harvest::<Sheep>(&mut world, &mut session, sheep, HarvestKind::Shear);
        *world.get::<&mut LifeState>(sheep).unwrap() = LifeState::Dying { stage: 0.0 };

        assert_eq!(
            harvest_system(&mut world, &player, &mut session, 1.0),
            Some(HarvestTick::Cancelled)
        );
        assert!(session.is_none());
    }

    #[test]
    fn test_cancel_op_clears_session() {
        let mut world = World::new();
        let mut session = None;

        let sheep = grown_sheep(&mut world, 0.0, 0.0);
        begin_harvest::<Sheep>(&mut world, &mut session, sheep, HarvestKind::Shear);

        assert!(cancel_harvest(&mut world, &mut session));
        assert!(session.is_none());
        assert!(!world.get::<&AnimalState>(sheep).unwrap().harvested);
        // Idempotent
        assert!(!cancel_harvest(&mut world, &mut session));
    }
}
