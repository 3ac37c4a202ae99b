// osm.rs
//
// Import-boundary helpers for Overpass API responses. Fetching is left to the
// caller; this module only builds the query text and turns the JSON answer
// into road segments.

use crate::error::CityResult;
use crate::simulation_engine::rasterize::{GeoBounds, LatLon, RoadSegment};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

/// Highway kinds that do not carry car traffic.
const EXCLUDED_HIGHWAYS: &str =
    "footway|path|steps|cycleway|pedestrian|track|service|corridor|bridleway|rest_area|escape";

#[derive(Debug, Deserialize)]
pub struct OsmData {
    pub elements: Vec<OsmElement>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OsmElement {
    Node { id: i64, lat: f64, lon: f64 },
    Way { id: i64, nodes: Vec<i64> },
    #[serde(other)]
    Other,
}

/// Overpass QL query selecting drivable ways (and their nodes) inside `bounds`.
pub fn overpass_query(bounds: &GeoBounds) -> String {
    let bbox = format!(
        "{},{},{},{}",
        bounds.south, bounds.west, bounds.north, bounds.east
    );
    format!(
        "[out:json][timeout:25];\n(\n  way[\"highway\"][\"highway\"!~\"{}\"]({});\n);\n(._;>;);\nout body;",
        EXCLUDED_HIGHWAYS, bbox
    )
}

/// Splits every way into consecutive node pairs. Ways with fewer than two
/// nodes and pairs referencing unknown nodes are skipped.
pub fn road_segments(data: &OsmData) -> Vec<RoadSegment> {
    let nodes: HashMap<i64, LatLon> = data
        .elements
        .iter()
        .filter_map(|el| match el {
            OsmElement::Node { id, lat, lon } => Some((*id, LatLon { lat: *lat, lon: *lon })),
            _ => None,
        })
        .collect();

    let mut segments = Vec::new();
    for el in &data.elements {
        if let OsmElement::Way { id, nodes: refs } = el {
            for pair in refs.windows(2) {
                match (nodes.get(&pair[0]), nodes.get(&pair[1])) {
                    (Some(&start), Some(&end)) => segments.push(RoadSegment { start, end }),
                    _ => debug!("Way {} references a missing node, pair skipped", id),
                }
            }
        }
    }
    segments
}

/// Parses a raw Overpass JSON document into road segments.
pub fn parse_overpass_json(raw: &str) -> CityResult<Vec<RoadSegment>> {
    let data: OsmData = serde_json::from_str(raw)?;
    Ok(road_segments(&data))
}
