//! GeoJSON to TopoJSON topology conversion
//!
//! Builds an unquantized topology with every feature of the input collection
//! under a single named object. Lines and rings are cut at junctions, the
//! points where geometries meet or diverge, and the resulting arcs are shared
//! between geometries. An arc reused in the opposite direction is referenced
//! by its one's complement index (`~i`, i.e. `-i - 1`).
//!
//! Features without a geometry are not represented in the topology.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::geojson::{FeatureCollection, Geometry, Position};
use crate::constants::cache::TOPOLOGY_OBJECT_NAME;

/// Arc reference: a non-negative index, or `!index` for a reversed arc
pub type ArcIndex = i64;

/// TopoJSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Topology")]
pub struct Topology {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    pub objects: BTreeMap<String, TopoGeometry>,
    pub arcs: Vec<Vec<Position>>,
}

/// Geometry object of a topology, referencing arcs instead of coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    Point {
        coordinates: Position,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    LineString {
        arcs: Vec<ArcIndex>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    MultiLineString {
        arcs: Vec<Vec<ArcIndex>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    Polygon {
        arcs: Vec<Vec<ArcIndex>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
    MultiPolygon {
        arcs: Vec<Vec<Vec<ArcIndex>>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        properties: Option<Map<String, Value>>,
    },
}

/// Build the topology of a feature collection
pub fn topology(collection: &FeatureCollection) -> Topology {
    let mut builder = TopologyBuilder::default();

    let shapes: Vec<(Shape, Option<Map<String, Value>>)> = collection
        .features
        .iter()
        .filter_map(|feature| {
            let geometry = feature.geometry.as_ref()?;
            let properties = (!feature.properties.is_empty()).then(|| feature.properties.clone());
            Some((builder.extract(geometry), properties))
        })
        .collect();

    let bbox = builder.bbox();
    let junctions = builder.junctions();
    let line_arcs = builder.cut_and_dedup(&junctions);

    let geometries = shapes
        .into_iter()
        .map(|(shape, properties)| shape.into_topo(&line_arcs, properties))
        .collect();

    let mut objects = BTreeMap::new();
    objects.insert(
        TOPOLOGY_OBJECT_NAME.to_string(),
        TopoGeometry::GeometryCollection {
            geometries,
            properties: None,
        },
    );

    Topology {
        bbox,
        objects,
        arcs: builder.arcs,
    }
}

/// Hashable identity of a position, ignoring elevation
type PointKey = (u64, u64);

fn point_key(position: &Position) -> PointKey {
    let x = position.first().copied().unwrap_or_default();
    let y = position.get(1).copied().unwrap_or_default();
    // -0.0 and 0.0 are the same point
    ((x + 0.0).to_bits(), (y + 0.0).to_bits())
}

/// Geometry skeleton referencing extracted lines by index
#[derive(Debug)]
enum Shape {
    Point(Position),
    MultiPoint(Vec<Position>),
    Line(usize),
    MultiLine(Vec<usize>),
    Polygon(Vec<usize>),
    MultiPolygon(Vec<Vec<usize>>),
    Collection(Vec<Shape>),
}

impl Shape {
    fn into_topo(
        self,
        line_arcs: &[Vec<ArcIndex>],
        properties: Option<Map<String, Value>>,
    ) -> TopoGeometry {
        let arcs_of = |line: usize| line_arcs[line].clone();
        match self {
            Shape::Point(coordinates) => TopoGeometry::Point {
                coordinates,
                properties,
            },
            Shape::MultiPoint(coordinates) => TopoGeometry::MultiPoint {
                coordinates,
                properties,
            },
            Shape::Line(line) => TopoGeometry::LineString {
                arcs: arcs_of(line),
                properties,
            },
            Shape::MultiLine(lines) => TopoGeometry::MultiLineString {
                arcs: lines.into_iter().map(arcs_of).collect(),
                properties,
            },
            Shape::Polygon(rings) => TopoGeometry::Polygon {
                arcs: rings.into_iter().map(arcs_of).collect(),
                properties,
            },
            Shape::MultiPolygon(polygons) => TopoGeometry::MultiPolygon {
                arcs: polygons
                    .into_iter()
                    .map(|rings| rings.into_iter().map(arcs_of).collect())
                    .collect(),
                properties,
            },
            Shape::Collection(shapes) => TopoGeometry::GeometryCollection {
                geometries: shapes
                    .into_iter()
                    .map(|shape| shape.into_topo(line_arcs, None))
                    .collect(),
                properties,
            },
        }
    }
}

#[derive(Debug)]
struct Line {
    coordinates: Vec<Position>,
    ring: bool,
}

#[derive(Debug, Default)]
struct TopologyBuilder {
    lines: Vec<Line>,
    points: Vec<Position>,
    arcs: Vec<Vec<Position>>,
}

impl TopologyBuilder {
    fn extract(&mut self, geometry: &Geometry) -> Shape {
        match geometry {
            Geometry::Point { coordinates } => {
                self.points.push(coordinates.clone());
                Shape::Point(coordinates.clone())
            }
            Geometry::MultiPoint { coordinates } => {
                self.points.extend(coordinates.iter().cloned());
                Shape::MultiPoint(coordinates.clone())
            }
            Geometry::LineString { coordinates } => Shape::Line(self.push_line(coordinates, false)),
            Geometry::MultiLineString { coordinates } => Shape::MultiLine(
                coordinates
                    .iter()
                    .map(|line| self.push_line(line, false))
                    .collect(),
            ),
            Geometry::Polygon { coordinates } => Shape::Polygon(
                coordinates
                    .iter()
                    .map(|ring| self.push_line(ring, true))
                    .collect(),
            ),
            Geometry::MultiPolygon { coordinates } => Shape::MultiPolygon(
                coordinates
                    .iter()
                    .map(|polygon| {
                        polygon
                            .iter()
                            .map(|ring| self.push_line(ring, true))
                            .collect()
                    })
                    .collect(),
            ),
            Geometry::GeometryCollection { geometries } => Shape::Collection(
                geometries
                    .iter()
                    .map(|geometry| self.extract(geometry))
                    .collect(),
            ),
        }
    }

    fn push_line(&mut self, coordinates: &[Position], ring: bool) -> usize {
        self.lines.push(Line {
            coordinates: coordinates.to_vec(),
            ring,
        });
        self.lines.len() - 1
    }

    fn bbox(&self) -> Option<[f64; 4]> {
        let positions = self
            .lines
            .iter()
            .flat_map(|line| line.coordinates.iter())
            .chain(self.points.iter())
            .filter(|position| position.len() >= 2);

        positions.fold(None, |bbox, position| {
            let (x, y) = (position[0], position[1]);
            Some(match bbox {
                None => [x, y, x, y],
                Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
            })
        })
    }

    /// Points where a line starts or ends, or where lines sharing a point
    /// arrive from or leave towards different neighbours
    fn junctions(&self) -> HashSet<PointKey> {
        let mut junctions = HashSet::new();
        let mut neighbours: HashMap<PointKey, (Option<PointKey>, Option<PointKey>)> =
            HashMap::new();

        for line in &self.lines {
            let keys: Vec<PointKey> = line.coordinates.iter().map(point_key).collect();
            let n = keys.len();
            if n == 0 {
                continue;
            }

            junctions.insert(keys[0]);
            if !line.ring {
                junctions.insert(keys[n - 1]);
            }

            for i in 1..n - 1 {
                let previous = Some(keys[i - 1]);
                let next = Some(keys[i + 1]);
                match neighbours.get(&keys[i]) {
                    None => {
                        neighbours.insert(keys[i], (previous, next));
                    }
                    Some(&(a, b)) => {
                        let same_path = (a == previous && b == next) || (a == next && b == previous);
                        if !same_path {
                            junctions.insert(keys[i]);
                        }
                    }
                }
            }
        }
        junctions
    }

    /// Cut every line at its interior junctions and assign shared arcs
    fn cut_and_dedup(&mut self, junctions: &HashSet<PointKey>) -> Vec<Vec<ArcIndex>> {
        let mut index: HashMap<Vec<PointKey>, usize> = HashMap::new();
        let mut line_arcs = Vec::with_capacity(self.lines.len());

        for line in &self.lines {
            let coordinates = &line.coordinates;
            let mut references = Vec::new();
            if coordinates.is_empty() {
                line_arcs.push(references);
                continue;
            }

            let mut start = 0;
            let last = coordinates.len() - 1;
            for i in 1..=last {
                if i == last || junctions.contains(&point_key(&coordinates[i])) {
                    references.push(Self::share_arc(
                        &mut index,
                        &mut self.arcs,
                        &coordinates[start..=i],
                    ));
                    start = i;
                }
            }
            if last == 0 {
                references.push(Self::share_arc(&mut index, &mut self.arcs, coordinates));
            }
            line_arcs.push(references);
        }
        line_arcs
    }

    fn share_arc(
        index: &mut HashMap<Vec<PointKey>, usize>,
        arcs: &mut Vec<Vec<Position>>,
        slice: &[Position],
    ) -> ArcIndex {
        let forward: Vec<PointKey> = slice.iter().map(point_key).collect();
        if let Some(&i) = index.get(&forward) {
            return i as ArcIndex;
        }
        let reversed: Vec<PointKey> = forward.iter().rev().copied().collect();
        if let Some(&i) = index.get(&reversed) {
            return !(i as ArcIndex);
        }
        arcs.push(slice.to_vec());
        let i = arcs.len() - 1;
        index.insert(forward, i);
        i as ArcIndex
    }
}
