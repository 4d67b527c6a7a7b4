//! Data models for permanent routes and their converted summaries
//!
//! Field names follow the portal's JSON records on input and the front-end's
//! expectations on output.

use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A permanent route as returned by the portal
///
/// Only the fields the pipeline uses are modelled; anything else in the
/// record is ignored. Text fields that are `null` or not strings read as
/// empty or as their JSON rendering, so one sloppy record never fails the
/// whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Route name
    #[serde(rename = "txtRideName", default, deserialize_with = "lenient_string")]
    pub name: String,
    /// Free-text description
    #[serde(
        rename = "txtRideDescription",
        default,
        deserialize_with = "lenient_string"
    )]
    pub description: String,
    /// Nominal distance in kilometres, number or numeric string
    #[serde(rename = "intRideDistanceNominal", default)]
    pub nominal_distance_km: Value,
    /// Canonical portal link for the route
    #[serde(rename = "directlink", default, deserialize_with = "lenient_string")]
    pub canonical_link: String,
    /// Attached links, in portal order
    #[serde(default, deserialize_with = "lenient_attachments")]
    pub attachments: Vec<Attachment>,
}

/// One attachment link of a route
///
/// The URL is kept as raw JSON because the portal sometimes sends `null`,
/// numbers or nothing at all. An entry that is not an object at all is read
/// as an attachment without a URL.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Attachment {
    #[serde(rename = "txtURL")]
    pub url: Option<Value>,
}

impl<'de> Deserialize<'de> for Attachment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value(value))
    }
}

impl Attachment {
    /// Attachment from an arbitrary JSON value
    pub fn from_value(value: Value) -> Self {
        let url = match value {
            Value::Object(mut fields) => fields.remove("txtURL"),
            _ => None,
        };
        Self { url }
    }

    /// Attachment with a string URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(Value::String(url.into())),
        }
    }

    /// The URL when it is a string
    pub fn url_str(&self) -> Option<&str> {
        self.url.as_ref().and_then(Value::as_str)
    }
}

impl Route {
    /// Distance rendered as `<nominal>km`, without added whitespace
    ///
    /// Whole-valued floats print without a fractional part so that `100.0`
    /// renders the same as `100`.
    pub fn distance_label(&self) -> String {
        let nominal = match &self.nominal_distance_km {
            Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => i.to_string(),
                (_, Some(u), _) => u.to_string(),
                (_, _, Some(f)) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
                _ => n.to_string(),
            },
            Value::String(s) => s.clone(),
            Value::Null => "null".to_string(),
            other => other.to_string(),
        };
        format!("{}km", nominal)
    }
}

/// `null` reads as empty, other non-strings as their JSON text
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Anything but an array reads as no attachments
fn lenient_attachments<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Attachment>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(Attachment::from_value).collect(),
        _ => Vec::new(),
    })
}

/// Route summary written to the aggregate file
///
/// Only produced for routes with at least one converted track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedRoute {
    pub name: String,
    pub description: String,
    pub distance: String,
    pub links: Vec<String>,
    /// Cached topology files, one per converted attachment, in attachment order
    #[serde(rename = "topoJson")]
    pub topology_paths: Vec<PathBuf>,
}

impl ConvertedRoute {
    /// Build the summary for a route and its converted topology files
    pub fn from_route(route: &Route, topology_paths: Vec<PathBuf>) -> Self {
        Self {
            name: route.name.clone(),
            description: route.description.clone(),
            distance: route.distance_label(),
            links: vec![route.canonical_link.clone()],
            topology_paths,
        }
    }
}
