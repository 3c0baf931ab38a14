use serde::{Deserialize, Serialize};

use crate::descriptor::WcsDescriptor;

/// Sign applied to each of the first three FITS axes on the way to RAS.
/// Longitude increases to the east, which is display-left.
pub const AXIS_SIGNS: [f64; 3] = [-1.0, 1.0, 1.0];

/// Where the volume sits in RAS space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginMode {
    /// The reference pixel lands on the reference world value.
    #[default]
    Native,
    /// The geometric centre of the volume lands on the RAS origin.
    Centered,
}

/// Row-major 4×4 affine matrix. The last row is always `[0, 0, 0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine4 {
    m: [[f64; 4]; 4],
}

impl Default for Affine4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine4 {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { m }
    }

    pub fn from_parts(linear: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        let mut m = [[0.0; 4]; 4];
        for i in 0..3 {
            m[i][..3].copy_from_slice(&linear[i]);
            m[i][3] = translation[i];
        }
        m[3][3] = 1.0;
        Self { m }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[row][col]
    }

    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.m
    }

    pub fn linear(&self) -> [[f64; 3]; 3] {
        let mut a = [[0.0; 3]; 3];
        for (dst, src) in a.iter_mut().zip(&self.m) {
            dst.copy_from_slice(&src[..3]);
        }
        a
    }

    pub fn translation(&self) -> [f64; 3] {
        [self.m[0][3], self.m[1][3], self.m[2][3]]
    }

    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (o, row) in out.iter_mut().zip(&self.m) {
            *o = row[0] * point[0] + row[1] * point[1] + row[2] * point[2] + row[3];
        }
        out
    }

    pub fn determinant(&self) -> f64 {
        let a = self.linear();
        a[0][0] * (a[1][1] * a[2][2] - a[1][2] * a[2][1])
            - a[0][1] * (a[1][0] * a[2][2] - a[1][2] * a[2][0])
            + a[0][2] * (a[1][0] * a[2][1] - a[1][1] * a[2][0])
    }

    /// `None` when the linear block is singular.
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.linear();
        let inv = [
            [
                (a[1][1] * a[2][2] - a[1][2] * a[2][1]) / det,
                (a[0][2] * a[2][1] - a[0][1] * a[2][2]) / det,
                (a[0][1] * a[1][2] - a[0][2] * a[1][1]) / det,
            ],
            [
                (a[1][2] * a[2][0] - a[1][0] * a[2][2]) / det,
                (a[0][0] * a[2][2] - a[0][2] * a[2][0]) / det,
                (a[0][2] * a[1][0] - a[0][0] * a[1][2]) / det,
            ],
            [
                (a[1][0] * a[2][1] - a[1][1] * a[2][0]) / det,
                (a[0][1] * a[2][0] - a[0][0] * a[2][1]) / det,
                (a[0][0] * a[1][1] - a[0][1] * a[1][0]) / det,
            ],
        ];
        let t = self.translation();
        let mut inv_t = [0.0; 3];
        for (o, row) in inv_t.iter_mut().zip(&inv) {
            *o = -(row[0] * t[0] + row[1] * t[1] + row[2] * t[2]);
        }
        Some(Self::from_parts(inv, inv_t))
    }
}

/// Voxel-index to RAS display transform derived from a [`WcsDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasTransform {
    ijk_to_ras: Affine4,
    ras_to_ijk: Option<Affine4>,
    origin: OriginMode,
}

impl RasTransform {
    /// `extents` are the voxel counts per axis, fastest first; only
    /// [`OriginMode::Centered`] uses them.
    pub fn from_descriptor(wcs: &WcsDescriptor, extents: &[usize], origin: OriginMode) -> Self {
        let linear = wcs.linear();
        let mut crpix = [1.0; 3];
        let mut crval = [0.0; 3];
        for (i, axis) in wcs.axes().iter().take(3).enumerate() {
            crpix[i] = axis.crpix;
            crval[i] = axis.crval;
        }

        let mut a = [[0.0; 3]; 3];
        let mut t = [0.0; 3];
        for i in 0..3 {
            // voxel index k is FITS pixel k + 1
            let mut offset = 0.0;
            for j in 0..3 {
                let m = linear.element(i, j);
                a[i][j] = AXIS_SIGNS[i] * m;
                offset += m * (crpix[j] - 1.0);
            }
            t[i] = AXIS_SIGNS[i] * (crval[i] - offset);
        }

        if origin == OriginMode::Centered {
            let mut centre = [0.0; 3];
            for (c, &n) in centre.iter_mut().zip(extents) {
                *c = n.saturating_sub(1) as f64 / 2.0;
            }
            for i in 0..3 {
                t[i] = -(a[i][0] * centre[0] + a[i][1] * centre[1] + a[i][2] * centre[2]);
            }
        }

        let ijk_to_ras = Affine4::from_parts(a, t);
        Self {
            ijk_to_ras,
            ras_to_ijk: ijk_to_ras.inverse(),
            origin,
        }
    }

    #[inline]
    pub fn ijk_to_ras(&self) -> &Affine4 {
        &self.ijk_to_ras
    }

    #[inline]
    pub fn ras_to_ijk(&self) -> Option<&Affine4> {
        self.ras_to_ijk.as_ref()
    }

    #[inline]
    pub fn origin(&self) -> OriginMode {
        self.origin
    }
}
