//! Serialization of the value types exchanged with callers.

use tiled_delaunay::prelude::*;

#[test]
fn parameters_round_trip_through_json() {
    let params = BiomeGeneratorParametersBuilder::default()
        .grid_cell_count(8)
        .seed(-99)
        .max_points_per_cell(3)
        .biome_scale(250.0)
        .build()
        .unwrap();
    let json = serde_json::to_string(&params).unwrap();
    let back: BiomeGeneratorParameters = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);
    assert!(back.validate().is_ok());
}

#[test]
fn invalid_parameters_deserialize_but_fail_validation() {
    let json = serde_json::to_string(&BiomeGeneratorParameters::default()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["grid_cell_count"] = serde_json::json!(0);
    let params: BiomeGeneratorParameters = serde_json::from_value(value).unwrap();
    assert_eq!(params.validate(), Err(ParametersError::EmptyGrid));
    assert!(matches!(
        BiomeRegionLoader::new(params),
        Err(RegionError::Parameters(ParametersError::EmptyGrid))
    ));
}

#[test]
fn region_event_json_shape() {
    let event = RegionEvent::RegionsUpdated {
        offsets: vec![TileOffset::new(-1, 0), TileOffset::new(0, 0)],
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "RegionsUpdated": {
                "offsets": [{ "x": -1, "y": 0 }, { "x": 0, "y": 0 }]
            }
        })
    );
    let back: RegionEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}

#[test]
fn site_identities_and_flags_round_trip() {
    let site = SiteId {
        offset: TileOffset::new(3, -8),
        id: 41,
    };
    let back: SiteId = serde_json::from_str(&serde_json::to_string(&site).unwrap()).unwrap();
    assert_eq!(back, site);

    let owner = ForeignVertexRef {
        offset: TileOffset::new(1, 1),
        id: 7,
    };
    let back: ForeignVertexRef =
        serde_json::from_str(&serde_json::to_string(&owner).unwrap()).unwrap();
    assert_eq!(back, owner);

    let mut flags = NeighboursMerged::new();
    flags.set_merged(1, 0);
    flags.set_merged(-1, -1);
    let back: NeighboursMerged =
        serde_json::from_str(&serde_json::to_string(&flags).unwrap()).unwrap();
    assert_eq!(back, flags);
    assert_eq!(back.pending().count(), 6);

    let edge = Edge::new(9, 2);
    let back: Edge = serde_json::from_str(&serde_json::to_string(&edge).unwrap()).unwrap();
    assert_eq!(back, edge);
    assert_eq!(back.endpoints(), (2, 9));
}
