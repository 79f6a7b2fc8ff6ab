//! Building factory that turns queued lots into floor-stack designs.
//!
//! Requests pair a lot polygon with a shared [`BuildingSpec`]. Each request
//! is designed with its own seeded RNG and metadata store so results do not
//! depend on the order requests are processed in.

use std::sync::Arc;

use bevy::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{DesignError, DesignResult};
use crate::procgen::context::DesignContext;
use crate::procgen::designer::{BuildingDesign, BuildingSpec, FloorStackDesigner};
use crate::procgen::lot_geometry::polygon_area;
use crate::procgen::metadata::Metadata;
use crate::procgen::scripts::{ScriptLibrary, TaggedScripts};

pub struct BuildingFactoryPlugin;

impl Plugin for BuildingFactoryPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<BuildingDesignConfig>()
            .init_resource::<DesignRequests>()
            .init_resource::<TaggedScripts>()
            .init_resource::<BuildingDesigns>()
            .add_systems(Update, plan_designs.run_if(has_pending_requests));
    }
}

#[derive(Resource)]
pub struct BuildingDesignConfig {
    /// Base seed, mixed with each request id.
    pub seed: u64,
    /// Log a one-line summary per finished design.
    pub log_summaries: bool,
}

impl Default for BuildingDesignConfig {
    fn default() -> Self {
        Self {
            seed: 31415,
            log_summaries: true,
        }
    }
}

/// A lot waiting to be designed.
#[derive(Clone, Debug)]
pub struct DesignRequest {
    pub id: u64,
    pub spec: Arc<BuildingSpec>,
    pub lot: Vec<Vec2>,
}

#[derive(Resource, Default)]
pub struct DesignRequests {
    pub pending: Vec<DesignRequest>,
}

impl DesignRequests {
    pub fn push(&mut self, id: u64, spec: Arc<BuildingSpec>, lot: Vec<Vec2>) {
        self.pending.push(DesignRequest { id, spec, lot });
    }
}

/// A finished design and the metadata it left behind.
#[derive(Clone, Debug)]
pub struct PlannedBuilding {
    pub request: u64,
    pub lot: Vec<Vec2>,
    pub design: BuildingDesign,
    pub metadata: Metadata,
}

#[derive(Resource, Default)]
pub struct BuildingDesigns {
    pub designs: Vec<PlannedBuilding>,
    pub failed: Vec<(u64, DesignError)>,
    /// Total requests processed, successful or not.
    pub generated: usize,
}

fn has_pending_requests(requests: Res<DesignRequests>) -> bool {
    !requests.pending.is_empty()
}

fn plan_designs(
    mut requests: ResMut<DesignRequests>,
    mut designs: ResMut<BuildingDesigns>,
    scripts: Res<TaggedScripts>,
    config: Res<BuildingDesignConfig>,
) {
    let pending = std::mem::take(&mut requests.pending);
    info!("Designing floor stacks for {} lots", pending.len());

    for request in pending {
        designs.generated += 1;
        match design_request(&request, &*scripts, config.seed) {
            Ok((design, metadata)) => {
                if config.log_summaries {
                    info!(
                        "Lot {} ({:.0} m2): {} floors up ({:.1} m), {} down, {} verticals",
                        request.id,
                        polygon_area(&request.lot),
                        design.above_ground(),
                        design.height_above_ground(),
                        design.below_ground(),
                        design.verticals.len()
                    );
                }
                designs.designs.push(PlannedBuilding {
                    request: request.id,
                    lot: request.lot,
                    design,
                    metadata,
                });
            }
            Err(err) => {
                warn!("Lot {} could not be designed: {}", request.id, err);
                designs.failed.push((request.id, err));
            }
        }
    }
}

/// Design one request with an RNG seeded from `seed` and the request id.
pub fn design_request(
    request: &DesignRequest,
    scripts: &dyn ScriptLibrary,
    seed: u64,
) -> DesignResult<(BuildingDesign, Metadata)> {
    let mut rng = StdRng::seed_from_u64(seed ^ request.id);
    let mut metadata = Metadata::new();
    let mut designer = FloorStackDesigner::new(request.spec.clone())?;
    let design = {
        let mut ctx = DesignContext::new(&mut rng, &mut metadata, scripts);
        designer.design(&mut ctx, &request.lot)?
    };
    Ok((design, metadata))
}
