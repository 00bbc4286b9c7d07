use thiserror::Error;

use crate::discretization::mesh::Mesh;
use crate::processing::hardening::HARDENING_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("scan velocity must be positive and finite, got {0}")]
    InvalidVelocity(f64),
    #[error("parameter `{name}` is out of range: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("velocity sweep is empty")]
    EmptySweep,
}

/// Physical and numerical constants of the hardening problem, in mm, s and °C.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatParams {
    pub diffusivity: f64,       // alpha [mm^2/s]
    pub conductivity: f64,      // k
    pub peak_flux: f64,         // qmax
    pub beam_radius: f64,       // r_b [mm], intensity drops to 1/e
    pub penetration_depth: f64, // sigma_z [mm]
    pub ambient: f64,           // T0
    pub length: f64,            // L, characteristic domain length [mm]
    pub resolution: usize,      // n, cells per L along each axis
    pub refinement_width: f64,  // w, refinement band in units of r_b
    pub refinement_passes: usize,
    pub threshold: f64,
    pub reference_velocity: f64, // [mm/s]
    pub velocities: Vec<f64>,
    pub boundary_tolerance: f64,
}

impl Default for HeatParams {
    fn default() -> Self {
        Self {
            diffusivity: 18.7,
            conductivity: 63.9e3,
            peak_flux: 113.35e6,
            beam_radius: 2.0,
            penetration_depth: 1e-5,
            ambient: 25.0,
            length: 25.0,
            resolution: 10,
            refinement_width: 3.0,
            refinement_passes: 2,
            threshold: HARDENING_THRESHOLD,
            reference_velocity: 500.0 / 60.0,
            velocities: (1..=16).map(f64::from).collect(),
            boundary_tolerance: 1e-6,
        }
    }
}

/// Opposite corners of the block. `x` runs along the scan line, `z = 0` is
/// the heated surface and the block extends to `z = -L`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub corner_a: [f64; 3],
    pub corner_b: [f64; 3],
}

impl Domain {
    pub fn x_min(&self) -> f64 {
        self.corner_a[0].min(self.corner_b[0])
    }

    pub fn x_max(&self) -> f64 {
        self.corner_a[0].max(self.corner_b[0])
    }

    pub fn z_top(&self) -> f64 {
        self.corner_a[2].max(self.corner_b[2])
    }

    /// `|x1 - x0|`, the scan length the horizon is derived from.
    pub fn scan_length(&self) -> f64 {
        (self.corner_b[0] - self.corner_a[0]).abs()
    }
}

impl HeatParams {
    pub fn with_velocities(mut self, velocities: Vec<f64>) -> Self {
        self.velocities = velocities;
        self
    }

    pub fn with_resolution(mut self, resolution: usize) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    pub fn with_refinement(mut self, width: f64, passes: usize) -> Self {
        self.refinement_width = width;
        self.refinement_passes = passes;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_peak_flux(mut self, peak_flux: f64) -> Self {
        self.peak_flux = peak_flux;
        self
    }

    pub fn domain(&self) -> Domain {
        let l = self.length;
        Domain {
            corner_a: [-l / 2.0, -l / 2.0, 0.0],
            corner_b: [3.0 * l / 2.0, l / 2.0, -l],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("diffusivity", self.diffusivity),
            ("conductivity", self.conductivity),
            ("beam_radius", self.beam_radius),
            ("penetration_depth", self.penetration_depth),
            ("length", self.length),
            ("resolution", self.resolution as f64),
            ("refinement_width", self.refinement_width),
            ("reference_velocity", self.reference_velocity),
            ("boundary_tolerance", self.boundary_tolerance),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if !(self.peak_flux.is_finite() && self.peak_flux >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "peak_flux",
                value: self.peak_flux,
            });
        }
        for (name, value) in [("ambient", self.ambient), ("threshold", self.threshold)] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }
        if self.velocities.is_empty() {
            return Err(ConfigError::EmptySweep);
        }
        if let Some(&v) = self.velocities.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(ConfigError::InvalidVelocity(v));
        }
        Ok(())
    }
}

/// Time discretisation for one scan velocity. Built fresh for every sweep point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfig {
    pub velocity: f64,
    pub dt: f64,
    pub final_time: f64,
    pub num_steps: usize,
}

impl RunConfig {
    /// The beam covers half the scan length; one step moves it by the
    /// smallest edge length of the mesh.
    pub fn for_velocity(
        params: &HeatParams,
        mesh: &Mesh,
        velocity: f64,
    ) -> Result<Self, ConfigError> {
        if !(velocity.is_finite() && velocity > 0.0) {
            return Err(ConfigError::InvalidVelocity(velocity));
        }
        let h_min = mesh.h_min();
        if !(h_min.is_finite() && h_min > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "h_min",
                value: h_min,
            });
        }

        let final_time = params.domain().scan_length() / velocity / 2.0;
        let dt = h_min / velocity;
        let num_steps = (final_time / dt).floor() as usize;

        Ok(Self {
            velocity,
            dt,
            final_time,
            num_steps,
        })
    }
}
