//! End-to-end designs from JSON building specs.

use std::sync::Arc;

use bevy::prelude::*;
use floorstack::error::DesignError;
use floorstack::procgen::building_factory::{design_request, DesignRequest};
use floorstack::procgen::designer::BuildingSpec;
use floorstack::procgen::floors::{FloorSelector, FloorSpec, RepeatSpec};
use floorstack::procgen::footprint::FootprintChain;
use floorstack::procgen::lot_geometry::polygon_area;
use floorstack::procgen::scripts::{TaggedScripts, WeightedTags};
use floorstack::procgen::values::ValueGenerator;

const TOWER: &str = r#"{
    "floors": [
        {
            "type": "floor",
            "id": "parking",
            "tags": [{ "weight": 1.0, "tags": ["parking"] }],
            "height": { "type": "constant", "value": 3.0 }
        },
        {
            "type": "ground_marker",
            "footprint": [{ "type": "shrink", "distance": { "type": "constant", "value": 1.0 } }]
        },
        {
            "type": "floor",
            "id": "lobby",
            "tags": [
                { "weight": 2.0, "tags": ["lobby", "tall"] },
                { "weight": 1.0, "tags": ["lobby"] }
            ],
            "height": { "type": "uniform", "min": 4, "max": 6 }
        },
        {
            "type": "repeat",
            "count": { "type": "uniform", "min": 2, "max": 5 },
            "items": [
                {
                    "type": "floor",
                    "id": "office",
                    "tags": [{ "weight": 1.0, "tags": ["office"] }],
                    "height": { "type": "normal", "min": 3.0, "max": 4.0 }
                }
            ]
        },
        {
            "type": "footprint_marker",
            "footprint": [{ "type": "bevel", "distance": { "type": "constant", "value": 1.0 } }]
        },
        {
            "type": "floor",
            "id": "roof",
            "tags": [{ "weight": 1.0, "tags": ["roof"] }],
            "height": { "type": "constant", "value": 1.5 }
        }
    ],
    "verticals": [
        {
            "id": "lift",
            "tags": [{ "weight": 1.0, "tags": ["lift"] }],
            "bottom": { "type": "id", "id": "lobby" },
            "top": { "type": "tagged", "tags": ["roof"], "direction": "up", "filter": "first" }
        },
        {
            "id": "ramp",
            "tags": [{ "weight": 1.0, "tags": ["ramp"] }],
            "bottom": { "type": "num", "index": -1 },
            "top": { "type": "regex_id", "pattern": "^lob", "direction": "up" }
        }
    ]
}"#;

fn scripts() -> TaggedScripts {
    TaggedScripts::default()
        .with("parking", &["parking"])
        .with("lobby", &["lobby"])
        .with("office", &["office"])
        .with("roof", &["roof"])
        .with("lift", &["lift"])
        .with("ramp", &["ramp"])
}

fn request(id: u64, json: &str) -> DesignRequest {
    let spec: BuildingSpec = serde_json::from_str(json).unwrap();
    DesignRequest {
        id,
        spec: Arc::new(spec),
        lot: vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(20.0, 0.0),
            Vec2::new(20.0, 20.0),
            Vec2::new(0.0, 20.0),
        ],
    }
}

#[test]
fn tower_from_json() {
    let (design, _) = design_request(&request(1, TOWER), &scripts(), 42).unwrap();

    let roof = design.floors[0].index;
    assert_eq!(design.floors[0].id, "roof");
    assert!((3..=6).contains(&roof));
    assert_eq!(design.floor(0).unwrap().id, "lobby");
    assert_eq!(design.floor(-1).unwrap().id, "parking");
    assert_eq!(design.below_ground(), 1);

    // The only lobby script lacks "tall", so selection fell back to plain lobby.
    assert_eq!(design.floor(0).unwrap().script.as_str(), "lobby");

    let ground = design.footprint_of(0).unwrap();
    assert!((polygon_area(ground) - 324.0).abs() < 1e-2);
    assert_eq!(design.footprint_of(-1).unwrap(), ground);
    assert_eq!(design.footprint_of(roof).unwrap().len(), 8);

    let spans: Vec<(&str, i32, i32)> = design
        .verticals
        .iter()
        .map(|v| (v.script.as_str(), v.bottom, v.top))
        .collect();
    assert_eq!(spans, vec![("lift", 0, roof), ("ramp", -1, 0)]);
}

#[test]
fn designs_are_reproducible() {
    let scripts = scripts();
    let (a, meta_a) = design_request(&request(3, TOWER), &scripts, 7).unwrap();
    let (b, meta_b) = design_request(&request(3, TOWER), &scripts, 7).unwrap();
    assert_eq!(a.floors, b.floors);
    assert_eq!(a.verticals, b.verticals);
    assert_eq!(meta_a.len(), meta_b.len());
}

#[test]
fn json_and_built_specs_agree() {
    let json = r#"{
        "floors": [
            { "type": "ground_marker" },
            {
                "type": "repeat",
                "count": { "type": "uniform", "min": 1, "max": 6 },
                "items": [{
                    "type": "floor",
                    "id": "office",
                    "tags": [{ "weight": 1.0, "tags": ["office"] }],
                    "height": { "type": "uniform", "min": 3.0, "max": 4.0 }
                }]
            }
        ]
    }"#;
    let built = BuildingSpec {
        floors: vec![
            FloorSelector::ground(FootprintChain::default()),
            FloorSelector::Repeat(RepeatSpec::new(
                ValueGenerator::uniform(1.0, 6.0),
                vec![FloorSelector::Floor(FloorSpec::new(
                    "office",
                    WeightedTags::single(&["office"]),
                    ValueGenerator::uniform(3.0, 4.0),
                ))],
            )),
        ],
        verticals: Vec::new(),
    };

    let scripts = scripts();
    let from_json = request(5, json);
    let from_code = DesignRequest {
        spec: Arc::new(built),
        ..from_json.clone()
    };
    let (a, _) = design_request(&from_json, &scripts, 11).unwrap();
    let (b, _) = design_request(&from_code, &scripts, 11).unwrap();
    assert_eq!(a.floors, b.floors);
}

#[test]
fn heights_stay_in_range() {
    let scripts = scripts();
    for seed in 0..32 {
        let (design, _) = design_request(&request(seed, TOWER), &scripts, seed).unwrap();
        for floor in &design.floors {
            match floor.id.as_str() {
                "lobby" => assert!((4.0..=6.0).contains(&floor.height)),
                "office" => assert!((3.0..=4.0).contains(&floor.height)),
                _ => {}
            }
        }
    }
}

#[test]
fn second_ground_marker_is_rejected() {
    let json = r#"{
        "floors": [
            { "type": "ground_marker" },
            { "type": "ground_marker" }
        ]
    }"#;
    let result = design_request(&request(0, json), &scripts(), 0);
    assert!(matches!(result, Err(DesignError::MalformedSpec(_))));
}

#[test]
fn unknown_selector_fails_to_parse() {
    let json = r#"{ "floors": [{ "type": "atrium" }] }"#;
    assert!(serde_json::from_str::<BuildingSpec>(json).is_err());
}
