//! GPX to GeoJSON conversion
//!
//! Tracks become `LineString` features (or `MultiLineString` when they have
//! more than one segment), routes become `LineString` features and waypoints
//! become `Point` features. Features are emitted tracks first, then routes,
//! then waypoints, each in document order.
//!
//! Elevation is carried as a third coordinate when present and non-empty.
//! Point timestamps of a line are collected into a `coordTimes` property when
//! every point has one. Segments and routes with fewer than two points do not
//! form a line and are left out.

use std::mem;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use super::geojson::{Feature, FeatureCollection, Geometry, Position};
use crate::errors::{ConvertError, ConvertResult};

/// Fewest points that make a line
const MIN_LINE_POINTS: usize = 2;

/// Leaf elements copied into feature properties
const PROPERTY_ELEMENTS: &[&str] = &["name", "desc", "cmt", "type", "time", "sym"];

/// Convert GPX text to a GeoJSON feature collection
///
/// Fails when the text is not well-formed XML, has a root other than `gpx`,
/// or carries a coordinate that is not a number. A well-formed GPX document
/// without tracks yields an empty collection.
pub fn to_geojson(text: &str) -> ConvertResult<FeatureCollection> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut parser = GpxParser::default();
    loop {
        match reader.read_event()? {
            Event::Start(element) => parser.open(&element)?,
            Event::Empty(element) => {
                parser.open(&element)?;
                parser.close()?;
            }
            Event::End(_) => parser.close()?,
            Event::Text(text) => {
                let text = text.unescape().map_err(quick_xml::Error::from)?;
                parser.text(&text);
            }
            Event::CData(data) => {
                parser.text(&String::from_utf8_lossy(&data.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    parser.finish()
}

/// A trkpt, rtept or wpt under construction
#[derive(Debug, Default)]
struct PointBuilder {
    lon: f64,
    lat: f64,
    ele: Option<f64>,
    time: Option<String>,
    properties: Map<String, Value>,
}

impl PointBuilder {
    fn from_element(element: &BytesStart<'_>) -> ConvertResult<Self> {
        Ok(Self {
            lon: coordinate_attribute(element, "lon")?,
            lat: coordinate_attribute(element, "lat")?,
            ..Self::default()
        })
    }

    fn position(&self) -> Position {
        match self.ele {
            Some(ele) => vec![self.lon, self.lat, ele],
            None => vec![self.lon, self.lat],
        }
    }

    fn into_waypoint(mut self) -> Feature {
        let coordinates = self.position();
        if let Some(time) = self.time.take() {
            self.properties.insert("time".to_string(), Value::String(time));
        }
        Feature::new(Geometry::Point { coordinates }, self.properties)
    }
}

#[derive(Debug, Default)]
struct Segment {
    coordinates: Vec<Position>,
    times: Vec<Option<String>>,
}

impl Segment {
    fn push(&mut self, point: PointBuilder) {
        self.coordinates.push(point.position());
        self.times.push(point.time);
    }

    /// Timestamps, only when every point has one
    fn complete_times(&self) -> Option<Value> {
        self.times
            .iter()
            .map(|time| time.clone().map(Value::String))
            .collect::<Option<Vec<Value>>>()
            .map(Value::Array)
    }
}

/// A trk or rte under construction
#[derive(Debug, Default)]
struct LineBuilder {
    properties: Map<String, Value>,
    segments: Vec<Segment>,
}

impl LineBuilder {
    fn into_feature(self) -> Option<Feature> {
        let mut properties = self.properties;
        let mut segments: Vec<Segment> = self
            .segments
            .into_iter()
            .filter(|segment| segment.coordinates.len() >= MIN_LINE_POINTS)
            .collect();

        match segments.len() {
            0 => None,
            1 => {
                let segment = segments.remove(0);
                if let Some(times) = segment.complete_times() {
                    properties.insert("coordTimes".to_string(), times);
                }
                Some(Feature::new(
                    Geometry::LineString {
                        coordinates: segment.coordinates,
                    },
                    properties,
                ))
            }
            _ => {
                let times: Option<Vec<Value>> =
                    segments.iter().map(Segment::complete_times).collect();
                if let Some(times) = times {
                    properties.insert("coordTimes".to_string(), Value::Array(times));
                }
                Some(Feature::new(
                    Geometry::MultiLineString {
                        coordinates: segments.into_iter().map(|s| s.coordinates).collect(),
                    },
                    properties,
                ))
            }
        }
    }
}

/// Event-driven GPX reader state
#[derive(Debug, Default)]
struct GpxParser {
    stack: Vec<String>,
    text: String,
    root: Option<String>,
    tracks: Vec<Feature>,
    routes: Vec<Feature>,
    waypoints: Vec<Feature>,
    track: Option<LineBuilder>,
    route: Option<LineBuilder>,
    segment: Option<Segment>,
    point: Option<PointBuilder>,
}

impl GpxParser {
    fn open(&mut self, element: &BytesStart<'_>) -> ConvertResult<()> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        self.text.clear();

        if self.root.is_none() {
            self.root = Some(name.clone());
        }

        match name.as_str() {
            "trk" => self.track = Some(LineBuilder::default()),
            "trkseg" if self.track.is_some() => self.segment = Some(Segment::default()),
            "rte" => {
                self.route = Some(LineBuilder {
                    properties: Map::new(),
                    segments: vec![Segment::default()],
                })
            }
            "trkpt" | "rtept" | "wpt" => self.point = Some(PointBuilder::from_element(element)?),
            _ => {}
        }

        self.stack.push(name);
        Ok(())
    }

    fn close(&mut self) -> ConvertResult<()> {
        let Some(name) = self.stack.pop() else {
            return Ok(());
        };
        let text = mem::take(&mut self.text);
        let parent = self.stack.last().cloned();
        let parent = parent.as_deref();

        match name.as_str() {
            "trkpt" => {
                if let (Some(point), Some(segment)) = (self.point.take(), self.segment.as_mut()) {
                    segment.push(point);
                }
            }
            "rtept" => {
                let segment = self
                    .route
                    .as_mut()
                    .and_then(|route| route.segments.first_mut());
                if let (Some(point), Some(segment)) = (self.point.take(), segment) {
                    segment.push(point);
                }
            }
            "wpt" => {
                if let Some(point) = self.point.take() {
                    self.waypoints.push(point.into_waypoint());
                }
            }
            "trkseg" => {
                if let (Some(segment), Some(track)) = (self.segment.take(), self.track.as_mut()) {
                    track.segments.push(segment);
                }
            }
            "trk" => {
                if let Some(feature) = self.track.take().and_then(LineBuilder::into_feature) {
                    self.tracks.push(feature);
                }
            }
            "rte" => {
                if let Some(feature) = self.route.take().and_then(LineBuilder::into_feature) {
                    self.routes.push(feature);
                }
            }
            "ele" => {
                if let (Some(point), Some("trkpt" | "rtept" | "wpt")) = (self.point.as_mut(), parent)
                {
                    if !text.trim().is_empty() {
                        point.ele = Some(parse_coordinate("ele", &text)?);
                    }
                }
            }
            leaf if PROPERTY_ELEMENTS.contains(&leaf) => self.assign_property(leaf, text, parent),
            _ => {}
        }
        Ok(())
    }

    fn assign_property(&mut self, name: &str, text: String, parent: Option<&str>) {
        match parent {
            Some("trkpt" | "rtept" | "wpt") => {
                if let Some(point) = self.point.as_mut() {
                    if name == "time" {
                        point.time = Some(text);
                    } else {
                        point.properties.insert(name.to_string(), Value::String(text));
                    }
                }
            }
            Some("trk") => {
                if let Some(track) = self.track.as_mut() {
                    track.properties.insert(name.to_string(), Value::String(text));
                }
            }
            Some("rte") => {
                if let Some(route) = self.route.as_mut() {
                    route.properties.insert(name.to_string(), Value::String(text));
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn finish(self) -> ConvertResult<FeatureCollection> {
        if let Some(element) = self.stack.last() {
            return Err(ConvertError::Unclosed {
                element: element.clone(),
            });
        }

        match self.root.as_deref() {
            Some("gpx") => {}
            other => {
                return Err(ConvertError::NotGpx {
                    root: other.unwrap_or_default().to_string(),
                })
            }
        }

        let mut features = self.tracks;
        features.extend(self.routes);
        features.extend(self.waypoints);
        Ok(FeatureCollection::new(features))
    }
}

fn coordinate_attribute(element: &BytesStart<'_>, name: &str) -> ConvertResult<f64> {
    let attribute = element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
        .ok_or_else(|| ConvertError::InvalidCoordinate {
            name: name.to_string(),
            value: String::new(),
        })?;
    let value = attribute.unescape_value().map_err(quick_xml::Error::from)?;
    parse_coordinate(name, &value)
}

fn parse_coordinate(name: &str, value: &str) -> ConvertResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConvertError::InvalidCoordinate {
            name: name.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SIMPLE_TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><name>Ignored metadata name</name></metadata>
  <trk>
    <name>Sydney Loop</name>
    <trkseg>
      <trkpt lat="-33.86" lon="151.20"><ele>12.5</ele><time>2020-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="-33.87" lon="151.21"><ele>14</ele><time>2020-01-01T00:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_simple_track() {
        let collection = to_geojson(SIMPLE_TRACK).unwrap();
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        assert_eq!(feature.properties["name"], json!("Sydney Loop"));
        assert_eq!(
            feature.properties["coordTimes"],
            json!(["2020-01-01T00:00:00Z", "2020-01-01T00:01:00Z"])
        );
        assert_eq!(
            feature.geometry,
            Some(Geometry::LineString {
                coordinates: vec![vec![151.20, -33.86, 12.5], vec![151.21, -33.87, 14.0]]
            })
        );
    }

    #[test]
    fn test_multi_segment_track() {
        let gpx = r#"<gpx><trk>
            <trkseg><trkpt lat="1" lon="2"/><trkpt lat="3" lon="4"/></trkseg>
            <trkseg><trkpt lat="5" lon="6"/><trkpt lat="7" lon="8"/></trkseg>
            <trkseg><trkpt lat="9" lon="9"/></trkseg>
            <trkseg></trkseg>
        </trk></gpx>"#;
        let collection = to_geojson(gpx).unwrap();
        assert_eq!(
            collection.features[0].geometry,
            Some(Geometry::MultiLineString {
                coordinates: vec![
                    vec![vec![2.0, 1.0], vec![4.0, 3.0]],
                    vec![vec![6.0, 5.0], vec![8.0, 7.0]]
                ]
            })
        );
        assert!(!collection.features[0].properties.contains_key("coordTimes"));
    }

    #[test]
    fn test_feature_order_tracks_routes_waypoints() {
        let gpx = r#"<gpx>
            <wpt lat="0" lon="0"><name>Start</name><sym>Flag</sym></wpt>
            <rte><name>R</name><rtept lat="1" lon="1"/><rtept lat="2" lon="2"/></rte>
            <trk><name>T</name><trkseg><trkpt lat="3" lon="3"/><trkpt lat="4" lon="4"/></trkseg></trk>
        </gpx>"#;
        let collection = to_geojson(gpx).unwrap();
        let types: Vec<&str> = collection
            .features
            .iter()
            .map(|f| f.geometry.as_ref().unwrap().type_name())
            .collect();
        assert_eq!(types, ["LineString", "LineString", "Point"]);
        assert_eq!(collection.features[0].properties["name"], json!("T"));
        assert_eq!(collection.features[1].properties["name"], json!("R"));
        assert_eq!(collection.features[2].properties["sym"], json!("Flag"));
    }

    #[test]
    fn test_escaped_and_cdata_text() {
        let gpx = r#"<gpx><trk><name>Fish &amp; Chips</name><desc><![CDATA[<b>hilly</b>]]></desc>
            <trkseg><trkpt lat="1" lon="1"/><trkpt lat="2" lon="2"/></trkseg></trk></gpx>"#;
        let feature = &to_geojson(gpx).unwrap().features[0];
        assert_eq!(feature.properties["name"], json!("Fish & Chips"));
        assert_eq!(feature.properties["desc"], json!("<b>hilly</b>"));
    }

    #[test]
    fn test_single_point_lines_are_dropped() {
        let gpx = r#"<gpx>
            <trk><name>Stub</name><trkseg><trkpt lat="1" lon="2"/></trkseg></trk>
            <rte><name>Dot</name><rtept lat="1" lon="1"/></rte>
            <wpt lat="5" lon="6"/>
        </gpx>"#;
        let collection = to_geojson(gpx).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(
            collection.features[0].geometry,
            Some(Geometry::Point {
                coordinates: vec![6.0, 5.0]
            })
        );
    }

    #[test]
    fn test_single_point_segment_leaves_line_string() {
        let gpx = r#"<gpx><trk>
            <trkseg><trkpt lat="1" lon="2"/></trkseg>
            <trkseg><trkpt lat="3" lon="4"/><trkpt lat="5" lon="6"/></trkseg>
        </trk></gpx>"#;
        let collection = to_geojson(gpx).unwrap();
        assert_eq!(
            collection.features[0].geometry,
            Some(Geometry::LineString {
                coordinates: vec![vec![4.0, 3.0], vec![6.0, 5.0]]
            })
        );
    }

    #[test]
    fn test_empty_elevation_is_ignored() {
        let gpx = r#"<gpx><trk><trkseg>
            <trkpt lat="1" lon="2"><ele></ele></trkpt>
            <trkpt lat="3" lon="4"><ele> </ele></trkpt>
            <trkpt lat="5" lon="6"><ele>10</ele></trkpt>
        </trkseg></trk></gpx>"#;
        let collection = to_geojson(gpx).unwrap();
        assert_eq!(
            collection.features[0].geometry,
            Some(Geometry::LineString {
                coordinates: vec![vec![2.0, 1.0], vec![4.0, 3.0], vec![6.0, 5.0, 10.0]]
            })
        );
    }

    #[test]
    fn test_gpx_without_tracks_is_empty() {
        let collection = to_geojson(r#"<gpx version="1.1"></gpx>"#).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_html_is_not_gpx() {
        let result = to_geojson("<html><body><p>Not found</p></body></html>");
        assert!(matches!(result, Err(ConvertError::NotGpx { root }) if root == "html"));
    }

    #[test]
    fn test_empty_text_is_not_gpx() {
        assert!(matches!(to_geojson(""), Err(ConvertError::NotGpx { .. })));
    }

    #[test]
    fn test_truncated_document() {
        let result = to_geojson("<gpx><trk><trkseg><trkpt lat=\"1\" lon=\"1\">");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_coordinate() {
        let result = to_geojson(r#"<gpx><trk><trkseg><trkpt lat="north" lon="1"/></trkseg></trk></gpx>"#);
        assert!(matches!(
            result,
            Err(ConvertError::InvalidCoordinate { name, .. }) if name == "lat"
        ));

        let result = to_geojson(r#"<gpx><wpt lon="1"/></gpx>"#);
        assert!(matches!(result, Err(ConvertError::InvalidCoordinate { .. })));
    }
}
