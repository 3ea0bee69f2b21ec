//! Shell configuration and the observations used as fitting targets.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_TIME_WARP_APEX, DEFAULT_TIME_WARP_MIN_RATE, GRAVITY_MPS2, STANDARD_AIR_DENSITY,
};
use crate::linear_drag::TimeWarp;

fn default_weight() -> f64 {
    1.0
}

/// A single known ballistic observation for fitting the drag coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallisticDataPoint {
    pub elevation: f64,       // radians
    pub range: f64,           // meters, 0 = unused
    pub time: f64,            // seconds, 0 = unused
    pub impact_velocity: f64, // m/s, 0 = unused
    #[serde(default)]
    pub max_height: f64,      // meters, 0 = unused
    #[serde(default = "default_weight")]
    pub weight: f64,          // relative weight among data points
}

impl BallisticDataPoint {
    pub fn new(elevation: f64, range: f64, time: f64, impact_velocity: f64) -> Self {
        Self {
            elevation,
            range,
            time,
            impact_velocity,
            max_height: 0.0,
            weight: 1.0,
        }
    }

    /// Same as `new` with the elevation given in degrees.
    pub fn from_degrees(elevation_deg: f64, range: f64, time: f64, impact_velocity: f64) -> Self {
        Self::new(elevation_deg.to_radians(), range, time, impact_velocity)
    }

    pub fn with_max_height(mut self, max_height: f64) -> Self {
        self.max_height = max_height;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn uses_height(&self) -> bool {
        self.max_height > 0.0
    }
}

/// Immutable description of a shell and its calibration targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellParameters {
    pub name: String,
    pub caliber: f64,         // meters
    pub mass: f64,            // kg
    pub muzzle_velocity: f64, // m/s
    pub max_range: f64,       // meters, simulations stop past this
    #[serde(default)]
    pub data_points: Vec<BallisticDataPoint>,
    pub linear_gravity: f64,  // m/s², gravity of the analytic models
    pub time_warp_min_rate: f64,
    pub time_warp_apex: f64,  // seconds
}

impl Default for ShellParameters {
    fn default() -> Self {
        Self {
            name: "Shell".to_string(),
            caliber: 0.380,
            mass: 800.0,
            muzzle_velocity: 820.0,
            max_range: 38000.0,
            data_points: Vec::new(),
            linear_gravity: GRAVITY_MPS2,
            time_warp_min_rate: DEFAULT_TIME_WARP_MIN_RATE,
            time_warp_apex: DEFAULT_TIME_WARP_APEX,
        }
    }
}

impl ShellParameters {
    /// Look up a preset shell by name, ignoring case.
    pub fn preset(name: &str) -> Option<ShellParameters> {
        SHELL_PRESETS
            .iter()
            .find(|shell| shell.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// First data point, the one the linear sweep is matched against.
    pub fn primary_data_point(&self) -> Option<&BallisticDataPoint> {
        self.data_points.first()
    }

    pub fn target_elevation(&self) -> f64 {
        self.primary_data_point().map_or(0.0, |dp| dp.elevation)
    }

    pub fn target_range(&self) -> f64 {
        self.primary_data_point().map_or(0.0, |dp| dp.range)
    }

    pub fn time_warp(&self) -> TimeWarp {
        TimeWarp::new(self.time_warp_min_rate, self.time_warp_apex)
    }

    /// Frontal area of the shell (m²)
    pub fn cross_sectional_area(&self) -> f64 {
        std::f64::consts::PI * 0.25 * self.caliber * self.caliber
    }

    /// Quadratic drag coefficient k = ρ·Cd·A / (2m) for a given drag coefficient Cd.
    ///
    /// Useful as a physically motivated starting point before fitting.
    pub fn quadratic_drag_from_cd(&self, cd: f64) -> f64 {
        if self.mass <= 0.0 {
            return 0.0;
        }
        STANDARD_AIR_DENSITY * cd * self.cross_sectional_area() / (2.0 * self.mass)
    }
}

/// Built-in shells with published range tables
pub static SHELL_PRESETS: Lazy<Vec<ShellParameters>> = Lazy::new(|| {
    vec![
        ShellParameters {
            name: "380mm".to_string(),
            caliber: 0.380,
            mass: 800.0,
            muzzle_velocity: 820.0,
            max_range: 38000.0,
            data_points: vec![
                BallisticDataPoint::from_degrees(29.1, 35000.0, 69.9, 462.0)
                    .with_max_height(8500.0),
                BallisticDataPoint::from_degrees(16.8, 25000.0, 43.0, 473.0)
                    .with_max_height(3800.0),
            ],
            linear_gravity: GRAVITY_MPS2,
            time_warp_min_rate: 1.0,
            time_warp_apex: 30.0,
        },
        ShellParameters {
            name: "203mm".to_string(),
            caliber: 0.203,
            mass: 152.0,
            muzzle_velocity: 762.0,
            max_range: 30000.0,
            data_points: vec![
                BallisticDataPoint::from_degrees(45.28, 27900.0, 84.0, 404.0)
                    .with_max_height(12000.0)
                    .with_weight(0.1),
                BallisticDataPoint::from_degrees(10.75, 14630.0, 26.93, 419.0),
            ],
            linear_gravity: GRAVITY_MPS2,
            time_warp_min_rate: 0.88,
            time_warp_apex: 30.0,
        },
        ShellParameters {
            name: "380mm (height-only)".to_string(),
            caliber: 0.380,
            mass: 800.0,
            muzzle_velocity: 820.0,
            max_range: 40000.0,
            data_points: vec![
                BallisticDataPoint::from_degrees(45.0, 0.0, 0.0, 0.0).with_max_height(15000.0),
            ],
            linear_gravity: GRAVITY_MPS2,
            time_warp_min_rate: 1.0,
            time_warp_apex: 30.0,
        },
        ShellParameters {
            name: "150mm gerat".to_string(),
            caliber: 0.15,
            mass: 42.0,
            muzzle_velocity: 1200.0,
            max_range: 35000.0,
            data_points: vec![
                BallisticDataPoint::from_degrees(85.0, 0.0, 0.0, 0.0)
                    .with_max_height(18000.0)
                    .with_weight(42.0),
            ],
            linear_gravity: GRAVITY_MPS2,
            time_warp_min_rate: 1.0,
            time_warp_apex: 30.0,
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup_is_case_insensitive() {
        let shell = ShellParameters::preset("380MM").unwrap();
        assert_eq!(shell.muzzle_velocity, 820.0);
        assert_eq!(shell.data_points.len(), 2);
        assert!(ShellParameters::preset("does-not-exist").is_none());
    }

    #[test]
    fn test_primary_data_point_accessors() {
        let shell = ShellParameters::preset("203mm").unwrap();
        assert!((shell.target_elevation() - 45.28_f64.to_radians()).abs() < 1e-12);
        assert_eq!(shell.target_range(), 27900.0);

        let empty = ShellParameters::default();
        assert_eq!(empty.target_elevation(), 0.0);
        assert_eq!(empty.target_range(), 0.0);
    }

    #[test]
    fn test_data_point_builders() {
        let dp = BallisticDataPoint::from_degrees(30.0, 1000.0, 10.0, 300.0)
            .with_max_height(250.0)
            .with_weight(2.0);
        assert!(dp.uses_height());
        assert_eq!(dp.weight, 2.0);
        assert!(!BallisticDataPoint::new(0.5, 1.0, 1.0, 1.0).uses_height());
    }

    #[test]
    fn test_quadratic_drag_from_cd() {
        let shell = ShellParameters::default();
        let k = shell.quadratic_drag_from_cd(0.3);
        // 380mm / 800kg shells sit in the 1e-5 decade
        assert!(k > 1e-6 && k < 1e-4);
        assert!(shell.quadratic_drag_from_cd(0.6) > k);
    }

    #[test]
    fn test_data_point_weight_defaults_when_missing() {
        let json = r#"{"elevation":0.5,"range":1000.0,"time":10.0,"impact_velocity":300.0}"#;
        let dp: BallisticDataPoint = serde_json::from_str(json).unwrap();
        assert_eq!(dp.weight, 1.0);
        assert_eq!(dp.max_height, 0.0);
    }
}
