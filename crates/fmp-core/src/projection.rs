//! Forward/inverse mapping between geographic (lon/lat) and the single
//! supported planar system, EPSG:26917 (UTM zone 17N on the GRS80 ellipsoid).
//!
//! Implements the Krüger flattening series to order n^6, which keeps the
//! round trip far inside the 1e-6 degree tolerance anywhere near the zone.

/// GRS80 semi-major axis in meters.
const SEMI_MAJOR_M: f64 = 6_378_137.0;
/// GRS80 flattening.
const FLATTENING: f64 = 1.0 / 298.257_222_101;
/// UTM scale factor on the central meridian.
const SCALE_FACTOR: f64 = 0.9996;
/// Central meridian of UTM zone 17.
const LON_ORIGIN_DEG: f64 = -81.0;
const FALSE_EASTING_M: f64 = 500_000.0;

/// Third flattening n = f / (2 - f).
fn third_flattening() -> f64 {
    FLATTENING / (2.0 - FLATTENING)
}

/// Rectifying radius A = a/(1+n) (1 + n^2/4 + n^4/64 + n^6/256).
fn rectifying_radius(n: f64) -> f64 {
    SEMI_MAJOR_M / (1.0 + n) * (1.0 + n * n / 4.0 + n.powi(4) / 64.0 + n.powi(6) / 256.0)
}

/// Forward series coefficients (Karney 2011, eq. 35).
fn alpha(n: f64) -> [f64; 6] {
    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;
    let n5 = n4 * n;
    let n6 = n5 * n;
    [
        n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
            + 7891.0 / 37800.0 * n6,
        13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
            - 1_983_433.0 / 1_935_360.0 * n6,
        61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
            + 167_603.0 / 181_440.0 * n6,
        49561.0 / 161_280.0 * n4 - 179.0 / 168.0 * n5 + 6_601_661.0 / 7_257_600.0 * n6,
        34729.0 / 80640.0 * n5 - 3_418_889.0 / 1_995_840.0 * n6,
        212_378_941.0 / 319_334_400.0 * n6,
    ]
}

/// Inverse series coefficients (Karney 2011, eq. 36).
fn beta(n: f64) -> [f64; 6] {
    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;
    let n5 = n4 * n;
    let n6 = n5 * n;
    [
        n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
            + 96199.0 / 604_800.0 * n6,
        1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
            - 1_118_711.0 / 3_870_720.0 * n6,
        17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
        4397.0 / 161_280.0 * n4 - 11.0 / 504.0 * n5 - 830_251.0 / 7_257_600.0 * n6,
        4583.0 / 161_280.0 * n5 - 108_847.0 / 3_991_680.0 * n6,
        20_648_693.0 / 638_668_800.0 * n6,
    ]
}

/// Series recovering geodetic latitude from conformal latitude.
fn delta(n: f64) -> [f64; 6] {
    let n2 = n * n;
    let n3 = n2 * n;
    let n4 = n3 * n;
    let n5 = n4 * n;
    let n6 = n5 * n;
    [
        2.0 * n - 2.0 / 3.0 * n2 - 2.0 * n3 + 116.0 / 45.0 * n4 + 26.0 / 45.0 * n5
            - 2854.0 / 675.0 * n6,
        7.0 / 3.0 * n2 - 8.0 / 5.0 * n3 - 227.0 / 45.0 * n4 + 2704.0 / 315.0 * n5
            + 2323.0 / 945.0 * n6,
        56.0 / 15.0 * n3 - 136.0 / 35.0 * n4 - 1262.0 / 105.0 * n5 + 73814.0 / 2835.0 * n6,
        4279.0 / 630.0 * n4 - 332.0 / 35.0 * n5 - 399_572.0 / 14175.0 * n6,
        4174.0 / 315.0 * n5 - 144_838.0 / 6237.0 * n6,
        601_676.0 / 22275.0 * n6,
    ]
}

/// Project geographic lon/lat (degrees) to planar easting/northing (meters).
pub fn geographic_to_planar(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let n = third_flattening();
    let radius = rectifying_radius(n);
    let coeffs = alpha(n);

    let phi = lat_deg.to_radians();
    let dlon = (lon_deg - LON_ORIGIN_DEG).to_radians();

    // Conformal latitude via the tangent form.
    let sigma = 2.0 * n.sqrt() / (1.0 + n);
    let t = (phi.sin().atanh() - sigma * (sigma * phi.sin()).atanh()).sinh();

    let xi_prime = t.atan2(dlon.cos());
    let eta_prime = (dlon.sin() / (1.0 + t * t).sqrt()).atanh();

    let mut xi = xi_prime;
    let mut eta = eta_prime;
    for (j, a) in coeffs.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi += a * (k * xi_prime).sin() * (k * eta_prime).cosh();
        eta += a * (k * xi_prime).cos() * (k * eta_prime).sinh();
    }

    let x = FALSE_EASTING_M + SCALE_FACTOR * radius * eta;
    let y = SCALE_FACTOR * radius * xi;
    (x, y)
}

/// Inverse projection from planar easting/northing (meters) to lon/lat
/// (degrees).
pub fn planar_to_geographic(x: f64, y: f64) -> (f64, f64) {
    let n = third_flattening();
    let radius = rectifying_radius(n);
    let betas = beta(n);
    let deltas = delta(n);

    let xi = y / (SCALE_FACTOR * radius);
    let eta = (x - FALSE_EASTING_M) / (SCALE_FACTOR * radius);

    let mut xi_prime = xi;
    let mut eta_prime = eta;
    for (j, b) in betas.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        xi_prime -= b * (k * xi).sin() * (k * eta).cosh();
        eta_prime -= b * (k * xi).cos() * (k * eta).sinh();
    }

    let chi = (xi_prime.sin() / eta_prime.cosh()).asin();
    let mut phi = chi;
    for (j, d) in deltas.iter().enumerate() {
        let k = 2.0 * (j as f64 + 1.0);
        phi += d * (k * chi).sin();
    }

    let lon = LON_ORIGIN_DEG.to_radians() + eta_prime.sinh().atan2(xi_prime.cos());
    (lon.to_degrees(), phi.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let (x, y) = geographic_to_planar(-81.0, 0.0);
        assert!((x - 500_000.0).abs() < 1e-6, "x = {x}");
        assert!(y.abs() < 1e-6, "y = {y}");
    }

    #[test]
    fn northing_grows_with_latitude() {
        let (_, y1) = geographic_to_planar(-81.0, 25.0);
        let (_, y2) = geographic_to_planar(-81.0, 30.0);
        assert!(y2 > y1);
        // One degree of latitude is roughly 110.6 km of northing at k0.
        let (_, ya) = geographic_to_planar(-81.0, 27.0);
        let (_, yb) = geographic_to_planar(-81.0, 28.0);
        assert!((yb - ya - 110_700.0).abs() < 1_000.0);
    }

    #[test]
    fn round_trip_over_region_extent() {
        // Grid covering the full Florida extent, beyond nominal zone width.
        let mut lon = -87.6;
        while lon <= -79.9 {
            let mut lat = 24.4;
            while lat <= 31.1 {
                let (x, y) = geographic_to_planar(lon, lat);
                let (lon2, lat2) = planar_to_geographic(x, y);
                assert!(
                    (lon - lon2).abs() < 1e-6 && (lat - lat2).abs() < 1e-6,
                    "round trip drift at ({lon}, {lat}): ({lon2}, {lat2})"
                );
                lat += 0.7;
            }
            lon += 0.7;
        }
    }

    #[test]
    fn round_trip_from_planar_side() {
        let x = 551_000.0;
        let y = 2_850_000.0;
        let (lon, lat) = planar_to_geographic(x, y);
        let (x2, y2) = geographic_to_planar(lon, lat);
        assert!((x - x2).abs() < 1e-3, "x drift {}", (x - x2).abs());
        assert!((y - y2).abs() < 1e-3, "y drift {}", (y - y2).abs());
    }
}
