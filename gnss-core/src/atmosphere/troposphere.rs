//! Saastamoinen tropospheric delay with a standard-atmosphere profile and
//! a simple cosecant mapping function, optionally split into zenith total
//! delay (ZTD) with a north/east gradient for the filter to estimate.
use crate::config::TropoModel;

const STD_TEMP_K: f64 = 288.15;
const STD_PRESSURE_HPA: f64 = 1013.25;
const STD_HUMIDITY: f64 = 0.5;
const STD_LAPSE_K_PER_M: f64 = 6.5e-3;

struct StandardAtmosphere {
    pressure_hpa: f64,
    temp_k: f64,
    humidity: f64,
}

fn standard_atmosphere(height_m: f64) -> StandardAtmosphere {
    let h = height_m.max(0.0);
    let temp_k = STD_TEMP_K - STD_LAPSE_K_PER_M * h;
    let pressure_hpa = STD_PRESSURE_HPA * (1.0 - STD_LAPSE_K_PER_M * h / STD_TEMP_K).powf(5.2559);
    let humidity = STD_HUMIDITY * (-6.396e-4 * h).exp();
    StandardAtmosphere {
        pressure_hpa,
        temp_k,
        humidity,
    }
}

/// Zenith hydrostatic and wet delay, meters, from the Saastamoinen model
/// evaluated on a standard atmosphere profile at `height_m` above the
/// ellipsoid and `lat_rad` geodetic latitude.
pub fn zenith_delays(height_m: f64, lat_rad: f64) -> (f64, f64) {
    let atm = standard_atmosphere(height_m);
    let e_hpa = atm.humidity * 6.108 * (-37.2465 + 0.213166 * atm.temp_k - 0.000256908 * atm.temp_k * atm.temp_k).exp();

    let f = 1.0 - 0.00266 * (2.0 * lat_rad).cos() - 0.00028e-3 * height_m;
    let zhd = 0.0022768 * atm.pressure_hpa / f;
    let zwd = 0.0022768 * (1255.0 / atm.temp_k + 0.05) * e_hpa / f;
    (zhd, zwd)
}

/// Niell-style cosecant mapping function (simplified to `1/sin(el)` plus
/// a small low-elevation correction term, adequate above a 5 degree mask).
pub fn mapping_function(elevation_rad: f64) -> f64 {
    let sin_el = elevation_rad.sin().max(1e-3);
    1.0 / sin_el - 0.0032 / (sin_el + 0.0121)
}

/// Slant tropospheric delay for one satellite, combining zenith delays,
/// the mapping function, and (when the estimator tracks them) horizontal
/// gradients.
pub fn slant_delay(
    model: TropoModel,
    height_m: f64,
    lat_rad: f64,
    elevation_rad: f64,
    azimuth_rad: f64,
    estimated_ztd: Option<f64>,
    gradients_ne: Option<(f64, f64)>,
) -> f64 {
    let (zhd, zwd_model) = zenith_delays(height_m, lat_rad);
    let mf = mapping_function(elevation_rad);

    let zwd = match (model, estimated_ztd) {
        (TropoModel::ModelOnly, _) => zwd_model,
        (_, Some(ztd)) => (ztd - zhd).max(0.0),
        (_, None) => zwd_model,
    };

    let mut delay = (zhd + zwd) * mf;

    if let (TropoModel::ZtdAndGradients, Some((gn, ge))) = (model, gradients_ne) {
        let grad_mf = mf / (elevation_rad.sin() + 0.0032);
        delay += grad_mf * (gn * azimuth_rad.cos() + ge * azimuth_rad.sin());
    }

    delay
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sea_level_zenith_hydrostatic_is_about_2_3_meters() {
        let (zhd, _) = zenith_delays(0.0, 0.7);
        assert!((zhd - 2.3).abs() < 0.1, "zhd={zhd}");
    }

    #[test]
    fn mapping_function_grows_at_low_elevation() {
        let high = mapping_function(1.4);
        let low = mapping_function(0.2);
        assert!(low > high);
    }

    #[test]
    fn higher_station_reduces_zenith_delay() {
        let (zhd_sea, _) = zenith_delays(0.0, 0.7);
        let (zhd_high, _) = zenith_delays(2000.0, 0.7);
        assert!(zhd_high < zhd_sea);
    }
}
