//! IONEX-style global TEC grid: a time-ordered sequence of latitude by
//! longitude maps, bilinearly interpolated in space and linearly in time.
use gnss::prelude::GnssTime;

#[derive(Debug, Clone, PartialEq)]
pub struct TecMap {
    pub t: GnssTime,
    pub lat_min: f64,
    pub lat_step: f64,
    pub lon_min: f64,
    pub lon_step: f64,
    pub n_lat: usize,
    pub n_lon: usize,
    /// Row-major, `n_lat * n_lon` TEC values in TECU.
    pub values: Vec<f64>,
}

impl TecMap {
    fn at(&self, lat_idx: usize, lon_idx: usize) -> f64 {
        let lat_idx = lat_idx.min(self.n_lat - 1);
        let lon_idx = lon_idx % self.n_lon;
        self.values[lat_idx * self.n_lon + lon_idx]
    }

    fn bilinear(&self, lat_deg: f64, lon_deg: f64) -> f64 {
        let lat_f = ((lat_deg - self.lat_min) / self.lat_step).clamp(0.0, (self.n_lat - 1) as f64);
        let lon_f = (lon_deg - self.lon_min) / self.lon_step;
        let lon_f = lon_f.rem_euclid(self.n_lon as f64);

        let lat0 = lat_f.floor() as usize;
        let lat1 = (lat0 + 1).min(self.n_lat - 1);
        let lon0 = lon_f.floor() as usize;
        let lon1 = lon0 + 1;

        let flat = lat_f - lat0 as f64;
        let flon = lon_f - lon0 as f64;

        let v00 = self.at(lat0, lon0);
        let v01 = self.at(lat0, lon1);
        let v10 = self.at(lat1, lon0);
        let v11 = self.at(lat1, lon1);

        let v0 = v00 + flon * (v01 - v00);
        let v1 = v10 + flon * (v11 - v10);
        v0 + flat * (v1 - v0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TecGrid {
    maps: Vec<TecMap>,
}

impl TecGrid {
    pub fn push(&mut self, map: TecMap) {
        self.maps.push(map);
    }

    /// Vertical TEC at `(lat_deg, lon_deg)` at `t`, linearly interpolated
    /// in time between the two bracketing maps. Returns `None` if `t`
    /// falls outside the grid's time span or the grid is empty.
    pub fn vertical_tec(&self, t: GnssTime, lat_deg: f64, lon_deg: f64) -> Option<f64> {
        if self.maps.len() < 2 {
            return self.maps.first().map(|m| m.bilinear(lat_deg, lon_deg));
        }
        let idx = self.maps.partition_point(|m| m.t.seconds_since(&t) < 0.0);
        if idx == 0 || idx >= self.maps.len() {
            return None;
        }
        let before = &self.maps[idx - 1];
        let after = &self.maps[idx];
        let span = after.t.seconds_since(&before.t);
        if span.abs() < 1e-9 {
            return Some(before.bilinear(lat_deg, lon_deg));
        }
        let frac = before.t.seconds_since(&t).abs() / span.abs();
        let v0 = before.bilinear(lat_deg, lon_deg);
        let v1 = after.bilinear(lat_deg, lon_deg);
        Some(v0 + frac * (v1 - v0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn flat_map(t: GnssTime, value: f64) -> TecMap {
        TecMap {
            t,
            lat_min: -87.5,
            lat_step: 2.5,
            lon_min: -180.0,
            lon_step: 5.0,
            n_lat: 71,
            n_lon: 73,
            values: vec![value; 71 * 73],
        }
    }

    #[test]
    fn flat_grid_interpolates_to_constant() {
        let mut grid = TecGrid::default();
        grid.push(flat_map(GnssTime::new(1_000_000_000, 0.0), 10.0));
        grid.push(flat_map(GnssTime::new(1_000_007_200, 0.0), 20.0));
        let v = grid
            .vertical_tec(GnssTime::new(1_000_003_600, 0.0), 10.0, 20.0)
            .unwrap();
        assert!((v - 15.0).abs() < 1e-6);
    }

    #[test]
    fn outside_time_span_returns_none() {
        let mut grid = TecGrid::default();
        grid.push(flat_map(GnssTime::new(1_000_000_000, 0.0), 10.0));
        grid.push(flat_map(GnssTime::new(1_000_007_200, 0.0), 20.0));
        assert!(grid
            .vertical_tec(GnssTime::new(999_999_000, 0.0), 0.0, 0.0)
            .is_none());
    }
}
