use super::VolumetricSource;

/// Gaussian beam travelling along +x on the top surface, embedded as a thin
/// volumetric source:
///
/// `q = (alpha*dt/k) * qmax * exp(-((x - vel*t)^2 + y^2)/r_b^2 - z^2/sigma_z^2)`
///
/// Only `t` changes between steps; everything else is fixed per run.
#[derive(Clone, Debug, PartialEq)]
pub struct MovingGaussianSource {
    diffusivity: f64,
    conductivity: f64,
    peak_flux: f64,
    velocity: f64,
    beam_radius: f64,
    penetration_depth: f64,
    dt: f64,
    t: f64,
}

impl MovingGaussianSource {
    pub fn new(
        diffusivity: f64,
        conductivity: f64,
        peak_flux: f64,
        velocity: f64,
        beam_radius: f64,
        penetration_depth: f64,
        dt: f64,
    ) -> Self {
        Self {
            diffusivity,
            conductivity,
            peak_flux,
            velocity,
            beam_radius,
            penetration_depth,
            dt,
            t: 0.0,
        }
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn beam_radius(&self) -> f64 {
        self.beam_radius
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// `alpha*dt/k * qmax`
    #[inline]
    pub fn amplitude(&self) -> f64 {
        self.diffusivity * self.dt / self.conductivity * self.peak_flux
    }

    /// Current beam centre on the surface.
    pub fn beam_centre(&self) -> [f64; 3] {
        [self.velocity * self.t, 0.0, 0.0]
    }
}

impl VolumetricSource for MovingGaussianSource {
    fn set_time(&mut self, t: f64) {
        self.t = t;
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn evaluate(&self, p: [f64; 3]) -> f64 {
        let [x, y, z] = p;
        let dx = x - self.velocity * self.t;
        let lateral = (dx * dx + y * y) / (self.beam_radius * self.beam_radius);
        let vertical = z * z / (self.penetration_depth * self.penetration_depth);
        self.amplitude() * (-lateral - vertical).exp()
    }
}

/// Source that contributes nothing, for checks against the steady ambient state.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSource {
    t: f64,
}

impl VolumetricSource for NoSource {
    fn set_time(&mut self, t: f64) {
        self.t = t;
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn evaluate(&self, _p: [f64; 3]) -> f64 {
        0.0
    }
}
