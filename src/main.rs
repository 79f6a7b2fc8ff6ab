//! Floorstack - headless floor-stack designer.
//!
//! Queues a handful of demo lots against a mixed-use tower spec, runs the
//! design systems once and logs the resulting stacks.

use std::sync::Arc;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use floorstack::procgen::building_factory::{
    BuildingDesignConfig, BuildingDesigns, DesignRequests,
};
use floorstack::procgen::designer::BuildingSpec;
use floorstack::procgen::floors::{
    FloorRangeSpec, FloorSelector, FloorSpec, RangeInclude, RepeatSpec,
};
use floorstack::procgen::footprint::{FootprintAlgorithm, FootprintChain};
use floorstack::procgen::refs::{FilterMode, FloorRef};
use floorstack::procgen::scripts::{TagCandidate, TaggedScripts, WeightedTags};
use floorstack::procgen::values::ValueGenerator;
use floorstack::procgen::verticals::VerticalElementSpec;
use floorstack::procgen::ProcgenPlugin;

fn main() {
    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(31415);

    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_once()))
        .add_plugins(LogPlugin::default())
        .add_plugins(ProcgenPlugin)
        .insert_resource(BuildingDesignConfig {
            seed,
            log_summaries: true,
        })
        .add_systems(Startup, queue_demo_lots)
        .add_systems(Last, report_designs)
        .run();
}

fn queue_demo_lots(mut requests: ResMut<DesignRequests>, mut scripts: ResMut<TaggedScripts>) {
    *scripts = TaggedScripts::default()
        .with("parking_deck", &["parking"])
        .with("plant_room", &["plant"])
        .with("lobby_atrium", &["lobby", "tall"])
        .with("lobby", &["lobby"])
        .with("retail_hall", &["retail"])
        .with("open_office", &["office"])
        .with("cellular_office", &["office", "cellular"])
        .with("apartments", &["residential"])
        .with("roof_garden", &["roof"])
        .with("passenger_lift", &["lift"])
        .with("stair_core", &["stair"]);

    let spec = Arc::new(mixed_use_tower());
    let lots = [
        rectangle(24.0, 18.0),
        rectangle(40.0, 30.0),
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(32.0, 0.0),
            Vec2::new(32.0, 14.0),
            Vec2::new(18.0, 26.0),
            Vec2::new(0.0, 26.0),
        ],
    ];
    for (id, lot) in lots.into_iter().enumerate() {
        requests.push(id as u64, spec.clone(), lot);
    }
}

fn report_designs(designs: Res<BuildingDesigns>) {
    for planned in &designs.designs {
        info!("Lot {}:", planned.request);
        for floor in &planned.design.floors {
            info!(
                "  {:>3} {:<10} {:<16} {:.2} m",
                floor.index, floor.id, floor.script, floor.height
            );
        }
        for vertical in &planned.design.verticals {
            info!(
                "  {} from {} to {}",
                vertical.script, vertical.bottom, vertical.top
            );
        }
    }
    if !designs.failed.is_empty() {
        warn!("{} lots failed to design", designs.failed.len());
    }
}

fn rectangle(width: f32, depth: f32) -> Vec<Vec2> {
    vec![
        Vec2::ZERO,
        Vec2::new(width, 0.0),
        Vec2::new(width, depth),
        Vec2::new(0.0, depth),
    ]
}

fn floor(id: &str, tags: WeightedTags, height: ValueGenerator) -> FloorSelector {
    FloorSelector::Floor(FloorSpec::new(id, tags, height))
}

fn mixed_use_tower() -> BuildingSpec {
    BuildingSpec {
        floors: vec![
            floor("plant", WeightedTags::single(&["plant"]), ValueGenerator::constant(4.0)),
            floor("parking", WeightedTags::single(&["parking"]), ValueGenerator::constant(3.0)),
            FloorSelector::ground(FootprintChain::new(vec![FootprintAlgorithm::Shrink {
                distance: ValueGenerator::uniform(1.0, 2.5),
            }])),
            floor(
                "lobby",
                WeightedTags::new(vec![
                    TagCandidate::new(1.0, &["lobby", "tall"]),
                    TagCandidate::new(2.0, &["lobby"]),
                ]),
                ValueGenerator::uniform(4.0, 6.0),
            ),
            FloorSelector::Range(FloorRangeSpec::new(vec![
                RangeInclude::new(
                    "office",
                    WeightedTags::new(vec![
                        TagCandidate::new(3.0, &["office"]),
                        TagCandidate::new(1.0, &["office", "cellular"]),
                    ]),
                    ValueGenerator::normal(3.2, 3.8),
                    ValueGenerator::uniform(3.0, 8.0),
                ),
                RangeInclude::new(
                    "retail",
                    WeightedTags::single(&["retail"]),
                    ValueGenerator::constant(4.5),
                    ValueGenerator::uniform(0.0, 2.0),
                )
                .with_vary(false),
            ])),
            FloorSelector::footprint(FootprintChain::new(vec![
                FootprintAlgorithm::Shrink {
                    distance: ValueGenerator::constant(3.0),
                },
                FootprintAlgorithm::Twist {
                    angle: ValueGenerator::uniform(-8.0, 8.0),
                },
                FootprintAlgorithm::Clip {
                    against: Default::default(),
                },
            ])),
            FloorSelector::Repeat(RepeatSpec::new(
                ValueGenerator::uniform(2.0, 10.0),
                vec![floor(
                    "apartment",
                    WeightedTags::single(&["residential"]),
                    ValueGenerator::constant(3.0),
                )],
            )),
            floor(
                "roof",
                WeightedTags::new(vec![
                    TagCandidate::new(1.0, &["roof"]),
                    TagCandidate::nothing(1.0),
                ]),
                ValueGenerator::constant(1.0),
            ),
        ],
        verticals: vec![
            VerticalElementSpec::new(
                WeightedTags::single(&["lift"]),
                FloorRef::id("lobby"),
                FloorRef::id("apartment").up().with_filter(FilterMode::Last),
            )
            .with_id("lift"),
            VerticalElementSpec::new(
                WeightedTags::single(&["stair"]),
                FloorRef::num(-2),
                FloorRef::num(0).up(),
            )
            .with_id("stair"),
        ],
    }
}
