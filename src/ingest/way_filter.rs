//! OSM way tag semantics for the ride/walk graph
//!
//! One place decides which ways enter the graph, which directions each
//! mode may travel, and what surface code the way carries. The oneway
//! rule is applied in a single fixed order: base direction from
//! `oneway`/`junction=roundabout` (with `-1` flipping it), then
//! `oneway:bicycle=no` or `cycleway=opposite*` restores both directions.

use crate::surface::{surface_from_tag, SurfacePrimary};

/// Per-way access metadata derived in pass 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WayMeta {
    pub bike_fwd: bool,
    pub bike_back: bool,
    pub foot_allowed: bool,
    pub surface: SurfacePrimary,
}

fn is_yes(v: Option<&str>) -> bool {
    matches!(v, Some("yes") | Some("designated") | Some("permissive"))
}

fn is_no(v: Option<&str>) -> bool {
    matches!(v, Some("no") | Some("private"))
}

fn is_bike_highway(v: &str) -> bool {
    matches!(
        v,
        "cycleway"
            | "path"
            | "residential"
            | "service"
            | "secondary"
            | "tertiary"
            | "unclassified"
            | "track"
            | "pedestrian"
    )
}

fn is_foot_highway(v: &str) -> bool {
    matches!(
        v,
        "footway"
            | "path"
            | "pedestrian"
            | "steps"
            | "residential"
            | "service"
            | "living_street"
            | "track"
            | "unclassified"
    )
}

fn is_bike_route(v: &str) -> bool {
    matches!(v, "bicycle" | "mtb" | "road")
}

fn is_foot_route(v: &str) -> bool {
    matches!(v, "hiking" | "foot" | "nordic_walking" | "running" | "fitness_trail")
}

fn is_transport_route(v: &str) -> bool {
    matches!(
        v,
        "ferry"
            | "bus"
            | "tram"
            | "train"
            | "railway"
            | "subway"
            | "light_rail"
            | "trolleybus"
            | "monorail"
            | "ski"
    )
}

/// `railway=*` values that mean live rail infrastructure. Leftover or
/// planned values (platform, razed, abandoned, disused, dismantled,
/// proposed) do not block a way.
fn is_active_rail(v: Option<&str>) -> bool {
    matches!(
        v,
        Some("rail")
            | Some("tram")
            | Some("subway")
            | Some("light_rail")
            | Some("monorail")
            | Some("funicular")
            | Some("narrow_gauge")
            | Some("preserved")
            | Some("construction")
    )
}

fn get<'a>(tags: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    tags.iter().find(|(k, _)| *k == key).map(|&(_, v)| v)
}

/// Classify a way from its tag list. `None` means the way does not enter
/// the graph at all.
pub fn classify_way(tags: &[(&str, &str)]) -> Option<WayMeta> {
    let highway = get(tags, "highway");
    let access = get(tags, "access");
    let bicycle = get(tags, "bicycle");
    let foot = get(tags, "foot");
    let route = get(tags, "route");

    // Exclude obvious non-walk/bike transport infrastructure up front.
    if route.is_some_and(is_transport_route)
        || get(tags, "aerialway").is_some()
        || get(tags, "waterway").is_some()
        || is_active_rail(get(tags, "railway"))
    {
        return None;
    }

    let mut candidate_bike = highway.is_some_and(is_bike_highway) || is_yes(bicycle);
    let mut candidate_foot = highway.is_some_and(is_foot_highway) || is_yes(foot);

    // Walking and cycling routes are additive, never overriding a deny.
    if let Some(r) = route {
        if is_bike_route(r) {
            candidate_bike = true;
        }
        if is_foot_route(r) {
            candidate_foot = true;
        }
    }

    if is_no(bicycle) {
        candidate_bike = false;
    }
    if is_no(foot) {
        candidate_foot = false;
    }

    // A general access block stands unless a per-mode tag overrides it.
    if is_no(access) && !is_yes(bicycle) && !is_yes(foot) {
        return None;
    }

    if !candidate_bike && !candidate_foot {
        return None;
    }

    let mut bike_allowed = candidate_bike;
    let foot_allowed = !is_no(foot) && (candidate_foot || highway != Some("motorway"));

    if bicycle == Some("dismount") {
        bike_allowed = false;
    }

    let (mut fwd, mut back) = (true, true);
    let oneway = get(tags, "oneway");
    if matches!(oneway, Some("yes") | Some("1")) || get(tags, "junction") == Some("roundabout") {
        back = false;
    } else if oneway == Some("-1") {
        fwd = false;
    }

    // Contraflow cycling relaxes the oneway restriction.
    if get(tags, "oneway:bicycle") == Some("no")
        || matches!(
            get(tags, "cycleway"),
            Some("opposite") | Some("opposite_lane") | Some("opposite_track")
        )
    {
        fwd = true;
        back = true;
    }

    Some(WayMeta {
        bike_fwd: bike_allowed && fwd,
        bike_back: bike_allowed && back,
        foot_allowed,
        surface: surface_from_tag(get(tags, "surface")),
    })
}
