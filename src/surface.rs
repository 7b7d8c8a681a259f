//! Surface taxonomy, per-edge mode bits, and path step labels
//!
//! `SurfacePrimary` values are part of the `edges.bin` wire contract:
//! they index the per-surface factor tables and the preference mask, so
//! the order below is fixed.

/// Riding permitted in this direction.
pub const MODE_BIKE: u8 = 0x01;
/// Walking permitted in this direction.
pub const MODE_FOOT: u8 = 0x02;

/// Primary surface code, one byte per edge. Index into per-surface
/// weight tables and the bike preference mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SurfacePrimary {
    Paved = 0,
    Asphalt,
    Concrete,
    PavingStones,
    Sett,
    UnhewnCobblestones,
    Cobblestones,
    Bricks,
    Unpaved,
    Compacted,
    FineGravel,
    Gravel,
    Ground,
    Dirt,
    Earth,
    Unknown,
}

pub const SURFACE_COUNT: usize = 16;

/// Map an OSM `surface=*` tag to its primary code. Missing or
/// unrecognised values map to `Unknown` (neutral: no penalty, factor 1).
pub fn surface_from_tag(value: Option<&str>) -> SurfacePrimary {
    match value {
        Some("paved") => SurfacePrimary::Paved,
        Some("asphalt") => SurfacePrimary::Asphalt,
        Some("concrete") => SurfacePrimary::Concrete,
        Some("paving_stones") => SurfacePrimary::PavingStones,
        Some("sett") => SurfacePrimary::Sett,
        Some("unhewn_cobblestones") => SurfacePrimary::UnhewnCobblestones,
        Some("cobblestones") => SurfacePrimary::Cobblestones,
        Some("bricks") => SurfacePrimary::Bricks,
        Some("unpaved") => SurfacePrimary::Unpaved,
        Some("compacted") => SurfacePrimary::Compacted,
        Some("fine_gravel") => SurfacePrimary::FineGravel,
        Some("gravel") => SurfacePrimary::Gravel,
        Some("ground") => SurfacePrimary::Ground,
        Some("dirt") => SurfacePrimary::Dirt,
        Some("earth") => SurfacePrimary::Earth,
        _ => SurfacePrimary::Unknown,
    }
}

/// Label attached to each step of a returned path. Distinct from the
/// edge-access bits above; only used to colour path segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StepLabel {
    BikePreferred = 0x01,
    BikeNonPreferred = 0x02,
    Foot = 0x04,
}

impl StepLabel {
    pub fn from_u8(v: u8) -> Option<StepLabel> {
        match v {
            0x01 => Some(StepLabel::BikePreferred),
            0x02 => Some(StepLabel::BikeNonPreferred),
            0x04 => Some(StepLabel::Foot),
            _ => None,
        }
    }
}
