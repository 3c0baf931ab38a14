use std::fmt;

use crate::linear::LinearTransform;

/// Outcome of building a descriptor from header keywords.
///
/// Only `Conformant` guarantees astrometric accuracy. The other two still
/// produce a usable descriptor so data can be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WcsStatus {
    #[default]
    Conformant,
    /// Mandatory keywords were missing and FITS defaults were synthesized.
    Repaired,
    /// The keyword set was structurally invalid; the descriptor is pixel-only.
    Fallback,
}

impl WcsStatus {
    pub fn code(self) -> i32 {
        match self {
            Self::Conformant => 0,
            Self::Repaired => 1,
            Self::Fallback => 2,
        }
    }

    pub fn is_conformant(self) -> bool {
        self == Self::Conformant
    }
}

impl fmt::Display for WcsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Conformant => "conformant",
            Self::Repaired => "repaired",
            Self::Fallback => "fallback",
        };
        write!(f, "{} ({})", label, self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisDescriptor {
    pub ctype: String,
    pub cunit: String,
    pub crpix: f64,
    pub crval: f64,
}

impl AxisDescriptor {
    pub fn pixel_only() -> Self {
        Self {
            ctype: String::new(),
            cunit: String::new(),
            crpix: 0.0,
            crval: 0.0,
        }
    }

    /// Projection code from a `CTYPE` like `RA---SIN`, if it has one.
    pub fn projection_code(&self) -> Option<&str> {
        let (_, code) = self.ctype.rsplit_once('-')?;
        let code = code.trim();
        (!code.is_empty()).then_some(code)
    }
}

/// Immutable world-coordinate description of a data cube.
///
/// World coordinates follow `w = crval + M (p - crpix)` with `p` the 1-based
/// FITS pixel coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct WcsDescriptor {
    axes: Vec<AxisDescriptor>,
    linear: LinearTransform,
    status: WcsStatus,
}

impl WcsDescriptor {
    pub(crate) fn new(axes: Vec<AxisDescriptor>, linear: LinearTransform, status: WcsStatus) -> Self {
        Self {
            axes,
            linear,
            status,
        }
    }

    /// Unit scale, no rotation, world equals pixel coordinate.
    pub fn pixel_only(naxis: usize, status: WcsStatus) -> Self {
        Self {
            axes: vec![AxisDescriptor::pixel_only(); naxis],
            linear: LinearTransform::identity(naxis),
            status,
        }
    }

    #[inline]
    pub fn naxis(&self) -> usize {
        self.axes.len()
    }

    #[inline]
    pub fn axes(&self) -> &[AxisDescriptor] {
        &self.axes
    }

    pub fn axis(&self, index: usize) -> Option<&AxisDescriptor> {
        self.axes.get(index)
    }

    #[inline]
    pub fn status(&self) -> WcsStatus {
        self.status
    }

    #[inline]
    pub fn linear(&self) -> &LinearTransform {
        &self.linear
    }

    pub fn crpix(&self) -> Vec<f64> {
        self.axes.iter().map(|a| a.crpix).collect()
    }

    pub fn crval(&self) -> Vec<f64> {
        self.axes.iter().map(|a| a.crval).collect()
    }

    pub fn pixel_to_world(&self, pixel: &[f64]) -> Vec<f64> {
        self.linear
            .pixel_to_intermediate(pixel)
            .into_iter()
            .zip(&self.axes)
            .map(|(q, axis)| axis.crval + q)
            .collect()
    }

    pub fn world_to_pixel(&self, world: &[f64]) -> Vec<f64> {
        let intermediate: Vec<f64> = world
            .iter()
            .zip(&self.axes)
            .map(|(w, axis)| w - axis.crval)
            .collect();
        self.linear.intermediate_to_pixel(&intermediate)
    }
}
