//! Klobuchar single-frequency ionosphere model, driven by the broadcast
//! alpha/beta coefficients each GNSS system publishes for its own users.
use crate::navigation::KlobucharCoefficients;
use gnss::prelude::GnssTime;

/// Estimated vertical-to-slant ionospheric delay for the L1 frequency,
/// seconds. Callers scale by `(f1/f)^2` for other frequencies.
pub fn delay_seconds(
    coeffs: &KlobucharCoefficients,
    t: GnssTime,
    user_lat_rad: f64,
    user_lon_rad: f64,
    azimuth_rad: f64,
    elevation_rad: f64,
) -> f64 {
    let el_semi = elevation_rad / std::f64::consts::PI;
    let psi = 0.0137 / (el_semi + 0.11) - 0.022;

    let lat_i = (user_lat_rad / std::f64::consts::PI + psi * azimuth_rad.cos()).clamp(-0.416, 0.416);
    let lon_i = user_lon_rad / std::f64::consts::PI + psi * azimuth_rad.sin() / (lat_i * std::f64::consts::PI).cos();

    let lat_m = lat_i + 0.064 * ((lon_i - 1.617) * std::f64::consts::PI).cos();

    let (_, tow) = t.gpst_seconds();
    let mut local_time = 43_200.0 * lon_i + tow;
    local_time = local_time.rem_euclid(86_400.0);

    let amplitude = poly4(&coeffs.alpha, lat_m);
    let period = poly4(&coeffs.beta, lat_m).max(72_000.0);

    let x = 2.0 * std::f64::consts::PI * (local_time - 50_400.0) / period;

    let slant_factor = 1.0 + 16.0 * (0.53 - el_semi).powi(3).max(0.0);

    let vertical = if x.abs() < 1.57 {
        5e-9 + amplitude * (1.0 - x * x / 2.0 + x.powi(4) / 24.0)
    } else {
        5e-9
    };

    vertical * slant_factor
}

fn poly4(coeffs: &[f64; 4], x: f64) -> f64 {
    coeffs[0] + x * (coeffs[1] + x * (coeffs[2] + x * coeffs[3]))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_coefficients_yield_floor_delay() {
        let coeffs = KlobucharCoefficients {
            alpha: [0.0; 4],
            beta: [0.0; 4],
        };
        let t = GnssTime::new(1_000_000_000, 0.0);
        let d = delay_seconds(&coeffs, t, 0.6, 0.2, 1.0, 0.8);
        assert!((d - 5e-9).abs() < 1e-12 || d >= 5e-9);
    }

    #[test]
    fn low_elevation_amplifies_slant_factor() {
        let coeffs = KlobucharCoefficients {
            alpha: [1e-8, 0.0, 0.0, 0.0],
            beta: [72_000.0, 0.0, 0.0, 0.0],
        };
        let t = GnssTime::new(1_000_000_000, 0.0);
        let low = delay_seconds(&coeffs, t, 0.6, 0.2, 1.0, 0.2);
        let high = delay_seconds(&coeffs, t, 0.6, 0.2, 1.0, 1.5);
        assert!(low >= high);
    }
}
