//! Commands from human players and the session layer.
//!
//! Commands carry raw ids as they arrive over the wire. Each is validated
//! against the current world; a command naming something that no longer
//! exists fails with a [`CommandError`] and changes nothing.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::error::CommandError;
use crate::types::{KeyFromU64, KeyToU64, TenantId, UnitId};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    /// Rebuild the whole simulation from a fresh config
    Restart { config: SimConfig },
    /// Take control of a tenant
    SelectTenant { player: String, tenant: u64 },
    /// Hand the player's tenant back to automatic stepping
    ReleaseTenant { player: String },
    /// Move the player's tenant into a unit with a free place
    MoveTenant { player: String, unit: u64 },
    /// Pay into the collective on behalf of the player's tenant
    ContributeFunds { player: String, amount: f64 },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Restart { .. } => "restart",
            Command::SelectTenant { .. } => "select_tenant",
            Command::ReleaseTenant { .. } => "release_tenant",
            Command::MoveTenant { .. } => "move_tenant",
            Command::ContributeFunds { .. } => "contribute_funds",
        }
    }

    pub fn player(&self) -> Option<&str> {
        match self {
            Command::Restart { .. } => None,
            Command::SelectTenant { player, .. }
            | Command::ReleaseTenant { player }
            | Command::MoveTenant { player, .. }
            | Command::ContributeFunds { player, .. } => Some(player),
        }
    }
}

impl World {
    fn tenant_of(&self, player: &str) -> Result<TenantId, CommandError> {
        self.players
            .get(player)
            .copied()
            .filter(|id| self.tenants.contains_key(*id))
            .ok_or_else(|| CommandError::UnknownPlayer(player.to_string()))
    }

    pub fn select_tenant(&mut self, player: &str, tenant: u64) -> Result<(), CommandError> {
        let id = TenantId::from_u64(tenant);
        let current = self
            .tenants
            .get(id)
            .ok_or(CommandError::UnknownTenant(tenant))?;
        if let Some(other) = current.player.as_deref() {
            if other != player {
                return Err(CommandError::TenantTaken {
                    tenant,
                    player: other.to_string(),
                });
            }
        }

        if let Some(previous) = self.players.insert(player.to_string(), id) {
            if previous != id {
                if let Some(t) = self.tenants.get_mut(previous) {
                    t.player = None;
                }
            }
        }
        if let Some(t) = self.tenants.get_mut(id) {
            t.player = Some(player.to_string());
        }
        Ok(())
    }

    pub fn release_tenant(&mut self, player: &str) -> Result<(), CommandError> {
        let id = self
            .players
            .remove(player)
            .ok_or_else(|| CommandError::UnknownPlayer(player.to_string()))?;
        if let Some(t) = self.tenants.get_mut(id) {
            t.player = None;
        }
        Ok(())
    }

    pub fn move_tenant(&mut self, player: &str, unit: u64) -> Result<(), CommandError> {
        let tenant_id = self.tenant_of(player)?;
        let unit_id = UnitId::from_u64(unit);
        let target = self
            .city
            .unit(unit_id)
            .ok_or(CommandError::UnknownUnit(unit))?;
        if target.tenants.contains(&tenant_id) {
            return Ok(());
        }
        if !target.has_vacancy() {
            return Err(CommandError::UnitFull(unit));
        }

        let from = self.tenants.get(tenant_id).and_then(|t| t.unit);
        if self.move_in(tenant_id, unit_id) {
            self.log_relocation(tenant_id, from, Some(unit_id), "player");
        }
        Ok(())
    }

    pub fn contribute_funds(&mut self, player: &str, amount: f64) -> Result<(), CommandError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CommandError::InvalidAmount(amount));
        }
        let tenant_id = self.tenant_of(player)?;
        self.collective.contribute(tenant_id, amount);
        Ok(())
    }

    /// Apply anything but `Restart`, which replaces the world and is
    /// handled by the orchestrator
    pub fn apply_command(&mut self, command: &Command) -> Result<(), CommandError> {
        match command {
            Command::Restart { .. } => Ok(()),
            Command::SelectTenant { player, tenant } => self.select_tenant(player, *tenant),
            Command::ReleaseTenant { player } => self.release_tenant(player),
            Command::MoveTenant { player, unit } => self.move_tenant(player, *unit),
            Command::ContributeFunds { player, amount } => self.contribute_funds(player, *amount),
        }
    }

    /// Player-steered tenants start each command window unmoved
    pub(crate) fn reset_player_moves(&mut self) {
        for id in self.players.values() {
            if let Some(t) = self.tenants.get_mut(*id) {
                t.moved = false;
            }
        }
    }

    /// Raw id of the tenant a player controls
    pub fn player_tenant_id(&self, player: &str) -> Option<u64> {
        self.players.get(player).map(|id| id.to_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapSpec;

    fn world() -> World {
        let mut config = SimConfig {
            seed: 71,
            map: MapSpec::Procedural {
                rows: 8,
                cols: 8,
                parcels: 30,
            },
            ..SimConfig::default()
        };
        config.population.tenants = 30;
        config.population.landlords = 2;
        World::new(config).unwrap()
    }

    fn some_tenant(world: &World) -> u64 {
        world.tenants.keys().next().unwrap().to_u64()
    }

    #[test]
    fn test_select_and_release() {
        let mut world = world();
        let tenant = some_tenant(&world);
        world.select_tenant("ana", tenant).unwrap();
        assert_eq!(world.player_tenant_id("ana"), Some(tenant));
        let id = TenantId::from_u64(tenant);
        assert_eq!(world.tenants[id].player.as_deref(), Some("ana"));

        assert_eq!(
            world.select_tenant("bo", tenant),
            Err(CommandError::TenantTaken {
                tenant,
                player: "ana".to_string()
            })
        );

        world.release_tenant("ana").unwrap();
        assert_eq!(world.tenants[id].player, None);
        assert_eq!(
            world.release_tenant("ana"),
            Err(CommandError::UnknownPlayer("ana".to_string()))
        );
    }

    #[test]
    fn test_reselect_frees_previous_tenant() {
        let mut world = world();
        let ids: Vec<TenantId> = world.tenants.keys().take(2).collect();
        world.select_tenant("ana", ids[0].to_u64()).unwrap();
        world.select_tenant("ana", ids[1].to_u64()).unwrap();
        assert_eq!(world.tenants[ids[0]].player, None);
        assert_eq!(world.player_tenant("ana"), Some(ids[1]));
    }

    #[test]
    fn test_stale_ids_are_rejected() {
        let mut world = world();
        assert!(matches!(
            world.select_tenant("ana", u64::MAX),
            Err(CommandError::UnknownTenant(u64::MAX))
        ));
        assert!(matches!(
            world.move_tenant("nobody", 1),
            Err(CommandError::UnknownPlayer(_))
        ));

        let tenant = some_tenant(&world);
        world.select_tenant("ana", tenant).unwrap();
        assert_eq!(
            world.move_tenant("ana", u64::MAX),
            Err(CommandError::UnknownUnit(u64::MAX))
        );
    }

    #[test]
    fn test_move_tenant_into_vacancy() {
        let mut world = world();
        let tenant = some_tenant(&world);
        world.select_tenant("ana", tenant).unwrap();
        let id = TenantId::from_u64(tenant);
        let home = world.tenants[id].unit;
        let target = world
            .vacancies
            .iter()
            .copied()
            .find(|u| Some(*u) != home)
            .unwrap();

        world.move_tenant("ana", target.to_u64()).unwrap();
        assert_eq!(world.tenants[id].unit, Some(target));
        assert!(world.tenants[id].moved);
        assert!(world.check_invariants().is_empty());
    }

    #[test]
    fn test_move_into_full_unit_fails() {
        let mut world = world();
        let tenant = some_tenant(&world);
        world.select_tenant("ana", tenant).unwrap();
        let id = TenantId::from_u64(tenant);
        let full = world
            .city
            .units
            .iter()
            .find(|(_, u)| !u.has_vacancy() && !u.tenants.contains(&id))
            .map(|(uid, _)| uid);
        if let Some(full) = full {
            assert_eq!(
                world.move_tenant("ana", full.to_u64()),
                Err(CommandError::UnitFull(full.to_u64()))
            );
        }
    }

    #[test]
    fn test_contribution_buys_shares() {
        let mut world = world();
        let tenant = some_tenant(&world);
        world.select_tenant("ana", tenant).unwrap();
        let fund = world.collective.property_fund;

        assert_eq!(
            world.contribute_funds("ana", -5.0),
            Err(CommandError::InvalidAmount(-5.0))
        );
        world.contribute_funds("ana", 250.0).unwrap();
        assert_eq!(world.collective.property_fund, fund + 250.0);
        assert_eq!(world.collective.shares(TenantId::from_u64(tenant)), 1.0);
    }

    #[test]
    fn test_commands_parse_from_tagged_json() {
        let cmd: Command =
            serde_json::from_str(r#"{"type":"MoveTenant","player":"ana","unit":7}"#).unwrap();
        assert_eq!(
            cmd,
            Command::MoveTenant {
                player: "ana".to_string(),
                unit: 7
            }
        );
        assert_eq!(cmd.name(), "move_tenant");
        assert_eq!(cmd.player(), Some("ana"));
    }
}
