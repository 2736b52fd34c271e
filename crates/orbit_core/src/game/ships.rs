//! Ship and projectile systems.

use super::Game;
use crate::combat::nearest_raider;
use crate::events::GameEvent;
use crate::ids::ShipId;
use crate::projectile::Explosion;
use crate::ship::Destination;
use crate::time::Millis;

impl Game {
    pub(super) fn tick_ships(&mut self, now: Millis) {
        // Ships removed earlier in the loop are skipped by the lookup.
        for id in self.world.ship_ids() {
            let Some(ship) = self.world.ship(id) else {
                continue;
            };

            if !ship.stationary {
                let intercept = ship
                    .origin
                    .and_then(|origin| nearest_raider(&self.world, ship.owner, origin, ship.position))
                    .filter(|(_, distance)| *distance <= self.config.interception_range)
                    .and_then(|(raider, _)| self.world.ship(raider))
                    .map(|raider| raider.position);
                let aim = intercept.or_else(|| match ship.destination {
                    Some(Destination::Planet(target)) => self.world.planet(target).map(|p| {
                        if self.abilities.is_orbitally_frozen(target, now) {
                            p.position
                        } else {
                            let ticks = ship.position.distance(p.position) / ship.speed.max(f64::EPSILON);
                            p.predicted_position(ticks)
                        }
                    }),
                    Some(Destination::Point(point)) => Some(point),
                    None => None,
                });
                if let (Some(aim), Some(ship)) = (aim, self.world.ship_mut(id)) {
                    ship.step_towards(aim);
                }
            }

            let (max_points, max_age) = (self.config.trail_max_points, self.config.trail_max_age_ms);
            let Some(ship) = self.world.ship_mut(id) else {
                continue;
            };
            ship.record_trail(now, max_points, max_age);
            let (position, destination) = (ship.position, ship.destination);

            match destination {
                Some(Destination::Planet(target)) => {
                    let arrived = self
                        .world
                        .planet(target)
                        .is_some_and(|p| p.position.distance(position) <= p.radius(self.config.planet_size));
                    if arrived {
                        if let Some(ship) = self.world.remove_ship(id) {
                            self.combat.forget(id);
                            self.ship_arrives(ship, target, now);
                        }
                    }
                }
                Some(Destination::Point(point)) => {
                    if point.distance(position) <= self.config.point_arrival_radius {
                        self.world.remove_ship(id);
                        self.combat.forget(id);
                    }
                }
                None => {}
            }
        }
    }

    pub(super) fn tick_projectiles(&mut self, now: Millis) {
        let hit_radius = self.config.ship_size / 2.0;
        for id in self.world.projectile_ids() {
            let Some(projectile) = self.world.projectile_mut(id) else {
                continue;
            };
            projectile.advance();
            if projectile.is_spent() {
                self.world.remove_projectile(id);
                continue;
            }
            let projectile = projectile.clone();
            let hit = self
                .world
                .ship(projectile.target)
                .is_some_and(|s| projectile.hits(s.position, hit_radius));
            if hit {
                self.world.remove_projectile(id);
                self.damage_ship(projectile.target, projectile.damage, now);
            }
        }
    }

    /// Apply projectile damage to a ship.
    fn damage_ship(&mut self, id: ShipId, damage: f64, now: Millis) {
        let Some(ship) = self.world.ship(id) else {
            return;
        };
        let owner = ship.owner;
        if self.abilities.unstoppable(owner, now)
            || (owner.is_player() && self.config.debug.player_ships_invincible)
        {
            return;
        }
        let damage = if self.abilities.shield_active(owner, now) {
            damage * self.config.ship_shield_factor
        } else {
            damage
        };
        let Some(ship) = self.world.ship_mut(id) else {
            return;
        };
        ship.health -= damage;
        if !ship.is_alive() {
            self.destroy_ship(id, now);
        }
    }

    /// Remove a ship from play and leave an explosion behind.
    pub(super) fn destroy_ship(&mut self, id: ShipId, now: Millis) {
        let Some(ship) = self.world.remove_ship(id) else {
            return;
        };
        self.combat.forget(id);
        self.world.add_explosion(Explosion {
            position: ship.position,
            radius: self.config.explosion_radius,
            started: now,
            duration_ms: self.config.explosion_duration_ms,
        });
        self.emit(GameEvent::ShipDestroyed {
            ship: id,
            owner: ship.owner,
        });
    }
}
