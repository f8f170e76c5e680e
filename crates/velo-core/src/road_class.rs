//! Safety class of a road segment.
//!
//! The four classes are ordered from safest to least safe for a cyclist.
//! OSM `highway=*` values are folded onto them by
//! [`RoadClass::from_highway_tag`]; values a bicycle cannot use at all return
//! `None` and are dropped at load time.

use std::str::FromStr;

use crate::CoreError;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    /// Service lanes, cycleways, paths.
    Service,
    /// Residential and other internal roads.
    Internal,
    /// Tertiary to primary roads.
    Arterial,
    /// Trunk roads and motorways.  Never excluded outright, only penalized.
    Highway,
}

impl RoadClass {
    /// Map an OSM `highway=*` value to a safety class.
    pub fn from_highway_tag(tag: &str) -> Option<RoadClass> {
        match tag {
            "service" | "cycleway" | "path" | "footway" | "living_street" => {
                Some(RoadClass::Service)
            }
            "residential" | "unclassified" => Some(RoadClass::Internal),
            "tertiary" | "tertiary_link" | "secondary" | "secondary_link"
            | "primary" | "primary_link" => Some(RoadClass::Arterial),
            "trunk" | "trunk_link" | "motorway" | "motorway_link" => Some(RoadClass::Highway),
            // steps, track, construction, proposed, ...
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoadClass::Service  => "service",
            RoadClass::Internal => "internal",
            RoadClass::Arterial => "arterial",
            RoadClass::Highway  => "highway",
        }
    }
}

impl FromStr for RoadClass {
    type Err = CoreError;

    /// Accepts the class names themselves or any OSM `highway=*` value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "service"  => Ok(RoadClass::Service),
            "internal" => Ok(RoadClass::Internal),
            "arterial" => Ok(RoadClass::Arterial),
            "highway"  => Ok(RoadClass::Highway),
            other => RoadClass::from_highway_tag(other)
                .ok_or_else(|| CoreError::Parse(format!("unknown road class {other:?}"))),
        }
    }
}

impl std::fmt::Display for RoadClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
