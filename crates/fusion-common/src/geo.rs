//! Geographic points and polar radar beam-path math.
//!
//! The pipeline never talks to a real geodesy library: every projection in
//! the original system assumes a spherical Earth and a 4/3-effective-radius
//! beam path (Doviak & Zrnic), which is what lets the cache layers in
//! `fusion-geo` precompute trig once per cell and reuse it across volumes.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers (sphere approximation used throughout).
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Effective Earth radius for standard-refraction beam propagation (4/3 rule).
pub const EFFECTIVE_EARTH_RADIUS_KM: f64 = EARTH_RADIUS_KM * 4.0 / 3.0;

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LL {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl LL {
    pub fn new(latitude_deg: f64, longitude_deg: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
        }
    }

    /// Great-circle surface distance to another point, in kilometers.
    pub fn surface_distance_to_km(&self, other: &LL) -> f64 {
        let lat1 = self.latitude_deg * DEG_TO_RAD;
        let lat2 = other.latitude_deg * DEG_TO_RAD;
        let dlat = lat2 - lat1;
        let dlon = (other.longitude_deg - self.longitude_deg) * DEG_TO_RAD;

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

/// A latitude/longitude/height triple; height is meters above the geoid,
/// matching how the original system stores station and grid locations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LLH {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub height_m: f64,
}

impl LLH {
    pub fn new(latitude_deg: f64, longitude_deg: f64, height_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            height_m,
        }
    }

    pub fn ll(&self) -> LL {
        LL::new(self.latitude_deg, self.longitude_deg)
    }
}

/// Beam-path projection routines, all using the 4/3-Earth approximation.
pub struct Project;

impl Project {
    /// Project forward from `(lat, lon)` along `bearing_deg` for
    /// `distance_km`, returning the destination point. Used to inset a
    /// coverage grid to a radar's maximum range and to convert a cached
    /// ground-range/azimuth pair back to a lat/lon.
    pub fn ll_bearing_distance(
        lat_deg: f64,
        lon_deg: f64,
        bearing_deg: f64,
        distance_km: f64,
    ) -> (f64, f64) {
        let lat1 = lat_deg * DEG_TO_RAD;
        let lon1 = lon_deg * DEG_TO_RAD;
        let theta = bearing_deg * DEG_TO_RAD;
        let delta = distance_km / EARTH_RADIUS_KM;

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lon2 = lon1
            + (theta.sin() * delta.sin() * lat1.cos())
                .atan2(delta.cos() - lat1.sin() * lat2.sin());

        (lat2 * RAD_TO_DEG, lon2 * RAD_TO_DEG)
    }

    /// Height above the station, in kilometers, of a beam at `elev_deg`
    /// after traveling `range_km` along its slant path, for a station at
    /// `station_height_km` above sea level. Standard Doviak & Zrnic
    /// equation under the 4/3-Earth approximation.
    pub fn attenuation_height_km(station_height_km: f64, range_km: f64, elev_deg: f64) -> f64 {
        let elev = elev_deg * DEG_TO_RAD;
        let ke_a = EFFECTIVE_EARTH_RADIUS_KM;
        let h = (range_km * range_km + ke_a * ke_a + 2.0 * range_km * ke_a * elev.sin()).sqrt()
            - ke_a;
        h + station_height_km
    }

    /// Great-circle ground range, in kilometers, covered by a beam at
    /// `elev_deg` after `range_km` of slant travel.
    pub fn attenuation_ground_range_km(range_km: f64, elev_deg: f64) -> f64 {
        let elev = elev_deg * DEG_TO_RAD;
        let ke_a = EFFECTIVE_EARTH_RADIUS_KM;
        let h = (range_km * range_km + ke_a * ke_a + 2.0 * range_km * ke_a * elev.sin()).sqrt()
            - ke_a;
        ke_a * ((range_km * elev.cos()) / (ke_a + h)).asin()
    }

    /// Inverse of the two functions above: given a fixed elevation tilt and
    /// the ground-range angle (central angle, radians, at Earth's center)
    /// to a target cell, solve for the slant range along that tilt whose
    /// ground projection lands on the cell. This is what lets a resolver
    /// index into a real `RadialSet`'s gates for an arbitrary virtual grid
    /// layer height.
    pub fn beam_path_llh_to_attenuation_range_km(
        station_height_km: f64,
        sin_gcd_over_re: f64,
        cos_gcd_over_re: f64,
        elev_tan: f64,
        elev_cos: f64,
        target_height_km: f64,
    ) -> f64 {
        let ke_a = EFFECTIVE_EARTH_RADIUS_KM;
        let dh = target_height_km - station_height_km;
        let ground_km = ke_a * sin_gcd_over_re.atan2(cos_gcd_over_re);
        (ground_km + dh * elev_tan) / elev_cos
    }

    /// Inverse of `attenuation_height_km`/`attenuation_ground_range_km`:
    /// given the ground range to a target cell and its height above sea
    /// level, solve for the elevation angle and slant range a beam would
    /// need to exactly pass through that point. This is the virtual
    /// elevation/range a Stage 1 projection cache reports for a grid
    /// cell so the volume lookup knows which real tilts to bracket it
    /// with. Derived from the law of cosines on the same
    /// (Earth-center, radar, target) triangle the forward formulas use,
    /// with the effective-Earth-radius approximation throughout.
    pub fn virtual_elevation_range_km(
        station_height_km: f64,
        ground_km: f64,
        target_height_km: f64,
    ) -> (f64, f64) {
        let ke_a = EFFECTIVE_EARTH_RADIUS_KM;
        let rho = ground_km / ke_a;
        let target_radius = ke_a + (target_height_km - station_height_km);

        let range_km = (ke_a * ke_a + target_radius * target_radius
            - 2.0 * ke_a * target_radius * rho.cos())
        .sqrt();

        let sin_elev = if range_km > 1e-9 {
            ((target_radius * target_radius - ke_a * ke_a - range_km * range_km) / (2.0 * ke_a * range_km))
                .clamp(-1.0, 1.0)
        } else {
            0.0
        };

        (sin_elev.asin() * RAD_TO_DEG, range_km)
    }

    /// Convert an azimuth/elevation/range triple (as seen from a radar at
    /// `lat`, `lon`, `station_height_km`) into a lat/lon/height triple.
    pub fn beam_path_az_ran_elev_to_llh(
        lat_deg: f64,
        lon_deg: f64,
        station_height_km: f64,
        az_deg: f64,
        elev_deg: f64,
        range_km: f64,
    ) -> LLH {
        let ground_km = Self::attenuation_ground_range_km(range_km, elev_deg);
        let height_km = Self::attenuation_height_km(station_height_km, range_km, elev_deg);
        let (out_lat, out_lon) = Self::ll_bearing_distance(lat_deg, lon_deg, az_deg, ground_km);
        LLH::new(out_lat, out_lon, height_km * 1000.0)
    }
}
