//! Distance kernels shared by the builder, the spatial index, and the search

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points in decimal degrees.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let sin_half_dlat = (d_lat * 0.5).sin();
    let sin_half_dlon = (d_lon * 0.5).sin();

    let a = sin_half_dlat * sin_half_dlat + lat1.cos() * lat2.cos() * sin_half_dlon * sin_half_dlon;
    let central_angle = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * central_angle
}

/// Squared distance in degrees² under the local equirectangular
/// approximation: `dlat² + (dlon · cos(lat_q))²`.
///
/// Not a geodesic. Only used to rank nearby graph nodes, where the
/// query-latitude scaling is accurate enough at OSM node density.
pub fn equirect_d2(query_lat: f64, query_lon: f64, lat: f64, lon: f64, cos_query_lat: f64) -> f64 {
    let d_lat = lat - query_lat;
    let d_lon = (lon - query_lon) * cos_query_lat;
    d_lat * d_lat + d_lon * d_lon
}
