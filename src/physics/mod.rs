pub mod bc;
pub mod source;
pub mod space;
pub mod weak_form;

use crate::physics::space::FunctionSpace;
use nalgebra::DVector;

/// A time-dependent volumetric source term entering the heat equation.
pub trait VolumetricSource {
    /// Move the source to time `t`. Nothing else about the source changes.
    fn set_time(&mut self, t: f64);

    fn time(&self) -> f64;

    /// Source value at a point for the current time.
    fn evaluate(&self, p: [f64; 3]) -> f64;

    /// Degree-1 interpolation of the source at every mesh vertex.
    fn interpolate(&self, space: &FunctionSpace) -> DVector<f64> {
        DVector::from_iterator(
            space.dim(),
            space.mesh().nodes.iter().map(|n| self.evaluate(n.position)),
        )
    }
}
