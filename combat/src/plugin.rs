//! Bevy integration
//!
//! Inserts the catalog, tuning, projectile engine and collision resolver as
//! resources so a host app's systems can drive combat from its fixed update.

use bevy::prelude::{App, Plugin};
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::projectile::ProjectileEngine;
use crate::resolver::CollisionResolver;
use crate::tuning::{CombatTuning, BUILTIN_TUNING};

/// Combat resources built from the shipped data files, or from the given
/// catalog/tuning when the host has its own
#[derive(Default)]
pub struct CombatPlugin {
    pub catalog: Option<(String, String)>,
    pub tuning: Option<CombatTuning>,
}

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        let catalog = match &self.catalog {
            Some((effects, weapons)) => Catalog::load_or_fallback(effects, weapons),
            None => Catalog::builtin(),
        };
        let tuning = self.tuning.clone().unwrap_or_else(|| {
            CombatTuning::from_ron_str(BUILTIN_TUNING).unwrap_or_else(|err| {
                warn!("Combat tuning failed to parse ({}); using defaults", err);
                CombatTuning::default()
            })
        });

        info!("Combat ready: {} weapons", catalog.len());

        app.insert_resource(CollisionResolver::new(&tuning))
            .insert_resource(ProjectileEngine::new(tuning.clone()))
            .insert_resource(tuning)
            .insert_resource(catalog);
    }
}
