use crate::error::{WcsError, WcsResult};

/// Pivots below this (after row normalisation) mark the matrix as singular.
const SINGULARITY_TOLERANCE: f64 = 1e-12;

/// The linear part of a FITS WCS: `q = M (p - crpix)` over all axes.
///
/// `M` is stored row-major, one row per world axis. Rows routinely differ by
/// many orders of magnitude (degrees against hertz), so singularity is judged
/// on a row-normalised copy rather than on the raw determinant.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearTransform {
    crpix: Vec<f64>,
    matrix: Vec<Vec<f64>>,
    inverse: Vec<Vec<f64>>,
    determinant: f64,
}

impl LinearTransform {
    /// Unit matrix with every reference pixel at zero.
    pub fn identity(naxis: usize) -> Self {
        Self {
            crpix: vec![0.0; naxis],
            matrix: identity_rows(naxis),
            inverse: identity_rows(naxis),
            determinant: 1.0,
        }
    }

    pub fn from_cd(crpix: Vec<f64>, cd: Vec<Vec<f64>>) -> WcsResult<Self> {
        let naxis = crpix.len();
        if cd.len() != naxis || cd.iter().any(|row| row.len() != naxis) {
            return Err(WcsError::invalid_parameter(format!(
                "linear matrix must be {naxis}x{naxis}"
            )));
        }
        if cd.iter().flatten().any(|v| !v.is_finite()) {
            return Err(WcsError::invalid_parameter(
                "linear matrix contains non-finite values",
            ));
        }
        let (inverse, determinant) = invert(&cd)?;
        Ok(Self {
            crpix,
            matrix: cd,
            inverse,
            determinant,
        })
    }

    pub fn from_pc_cdelt(crpix: Vec<f64>, pc: Vec<Vec<f64>>, cdelt: &[f64]) -> WcsResult<Self> {
        if cdelt.len() != pc.len() {
            return Err(WcsError::invalid_parameter(format!(
                "expected {} CDELT values, got {}",
                pc.len(),
                cdelt.len()
            )));
        }
        let cd = pc
            .into_iter()
            .zip(cdelt)
            .map(|(row, &scale)| row.into_iter().map(|v| v * scale).collect())
            .collect();
        Self::from_cd(crpix, cd)
    }

    /// AIPS convention: `CROTA2` rotates the first two axes, the rest stay diagonal.
    pub fn from_cdelt_crota(crpix: Vec<f64>, cdelt: &[f64], crota_deg: f64) -> WcsResult<Self> {
        let naxis = cdelt.len();
        let mut cd = identity_rows(naxis);
        for (i, row) in cd.iter_mut().enumerate() {
            row[i] = cdelt[i];
        }
        if naxis >= 2 {
            let rho = crota_deg.to_radians();
            let (sin_rho, cos_rho) = (libm::sin(rho), libm::cos(rho));
            cd[0][0] = cdelt[0] * cos_rho;
            cd[0][1] = -cdelt[1] * sin_rho;
            cd[1][0] = cdelt[0] * sin_rho;
            cd[1][1] = cdelt[1] * cos_rho;
        }
        Self::from_cd(crpix, cd)
    }

    pub fn naxis(&self) -> usize {
        self.crpix.len()
    }

    pub fn pixel_to_intermediate(&self, pixel: &[f64]) -> Vec<f64> {
        // q[i] = sum over j of m[i][j] * (p[j] - r[j])
        self.matrix
            .iter()
            .map(|row| {
                row.iter()
                    .zip(pixel.iter().zip(&self.crpix))
                    .map(|(m, (p, r))| m * (p - r))
                    .sum()
            })
            .collect()
    }

    pub fn intermediate_to_pixel(&self, intermediate: &[f64]) -> Vec<f64> {
        self.inverse
            .iter()
            .zip(&self.crpix)
            .map(|(row, r)| {
                let offset: f64 = row.iter().zip(intermediate).map(|(m, q)| m * q).sum();
                offset + r
            })
            .collect()
    }

    #[inline]
    pub fn crpix(&self) -> &[f64] {
        &self.crpix
    }

    #[inline]
    pub fn matrix(&self) -> &[Vec<f64>] {
        &self.matrix
    }

    #[inline]
    pub fn inverse(&self) -> &[Vec<f64>] {
        &self.inverse
    }

    #[inline]
    pub fn determinant(&self) -> f64 {
        self.determinant
    }

    /// Matrix element, or the identity value outside the stored axes.
    pub fn element(&self, row: usize, col: usize) -> f64 {
        match self.matrix.get(row).and_then(|r| r.get(col)) {
            Some(&v) => v,
            None if row == col => 1.0,
            None => 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.matrix.iter().enumerate().all(|(i, row)| {
            row.iter()
                .enumerate()
                .all(|(j, &v)| v == if i == j { 1.0 } else { 0.0 })
        })
    }
}

fn identity_rows(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

/// Gauss-Jordan inversion with partial pivoting on a row-normalised copy.
fn invert(m: &[Vec<f64>]) -> WcsResult<(Vec<Vec<f64>>, f64)> {
    let n = m.len();

    let mut row_scale = Vec::with_capacity(n);
    for row in m {
        let scale = row.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 {
            return Err(WcsError::non_invertible_matrix(0.0));
        }
        row_scale.push(scale);
    }

    let mut a: Vec<Vec<f64>> = m
        .iter()
        .zip(&row_scale)
        .map(|(row, scale)| row.iter().map(|v| v / scale).collect())
        .collect();
    let mut inv = identity_rows(n);
    let mut determinant: f64 = row_scale.iter().product();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        let pivot = a[pivot_row][col];
        if pivot.abs() < SINGULARITY_TOLERANCE {
            return Err(WcsError::non_invertible_matrix(determinant * pivot));
        }
        if pivot_row != col {
            a.swap(pivot_row, col);
            inv.swap(pivot_row, col);
            determinant = -determinant;
        }
        determinant *= pivot;

        for k in 0..n {
            a[col][k] /= pivot;
            inv[col][k] /= pivot;
        }

        let a_pivot = a[col].clone();
        let inv_pivot = inv[col].clone();
        for r in (0..n).filter(|&r| r != col) {
            let factor = a[r][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..n {
                a[r][k] -= factor * a_pivot[k];
                inv[r][k] -= factor * inv_pivot[k];
            }
        }
    }

    // (D^-1 M)^-1 = M^-1 D, so undo the row scaling on the columns.
    for row in inv.iter_mut() {
        for (v, scale) in row.iter_mut().zip(&row_scale) {
            *v /= scale;
        }
    }

    Ok((inv, determinant))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} != {b} (tol {tol})");
    }

    #[test]
    fn test_roundtrip_pixel_intermediate_pixel() {
        let crpix = vec![512.0, 512.0];
        let cd = vec![vec![0.001, 0.0], vec![0.0, 0.001]];
        let transform = LinearTransform::from_cd(crpix, cd).unwrap();

        let original = [256.0, 768.0];
        let intermediate = transform.pixel_to_intermediate(&original);
        let recovered = transform.intermediate_to_pixel(&intermediate);

        assert_close(recovered[0], original[0], 1e-9);
        assert_close(recovered[1], original[1], 1e-9);
    }

    #[test]
    fn test_known_values() {
        let crpix = vec![512.0, 512.0];
        let cd = vec![vec![0.001, 0.0], vec![0.0, 0.001]];
        let transform = LinearTransform::from_cd(crpix, cd).unwrap();

        let inter = transform.pixel_to_intermediate(&[256.0, 256.0]);
        assert_close(inter[0], -0.256, 1e-15);
        assert_close(inter[1], -0.256, 1e-15);
    }

    #[test]
    fn test_pc_cdelt_equivalence() {
        let crpix = vec![100.0, 100.0];
        let cd = vec![vec![0.002, 0.001], vec![-0.001, 0.002]];
        let transform_cd = LinearTransform::from_cd(crpix.clone(), cd).unwrap();

        let pc = vec![vec![1.0, 0.5], vec![-0.5, 1.0]];
        let transform_pc = LinearTransform::from_pc_cdelt(crpix, pc, &[0.002, 0.002]).unwrap();

        assert_eq!(transform_cd.matrix(), transform_pc.matrix());
    }

    #[test]
    fn test_mixed_scale_cube_is_invertible() {
        // degrees on the sky axes, hertz on the spectral axis
        let crpix = vec![64.0, 64.0, 10.0];
        let cd = vec![
            vec![-1.0e-4, 0.0, 0.0],
            vec![0.0, 1.0e-4, 0.0],
            vec![0.0, 0.0, 2.5e4],
        ];
        let transform = LinearTransform::from_cd(crpix, cd).unwrap();
        assert_close(transform.determinant(), -2.5e-4, 1e-18);

        let pixel = [10.0, 20.0, 30.0];
        let back = transform.intermediate_to_pixel(&transform.pixel_to_intermediate(&pixel));
        for (a, b) in back.iter().zip(pixel) {
            assert_close(*a, b, 1e-9);
        }
    }

    #[test]
    fn test_non_invertible_matrix() {
        let crpix = vec![512.0, 512.0];
        let cd = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let result = LinearTransform::from_cd(crpix, cd);
        assert!(matches!(result, Err(WcsError::NonInvertibleMatrix { .. })));
    }

    #[test]
    fn test_zero_row_is_singular() {
        let cd = vec![vec![0.0, 0.0], vec![0.0, 1.0]];
        let result = LinearTransform::from_cd(vec![1.0, 1.0], cd);
        assert!(matches!(
            result,
            Err(WcsError::NonInvertibleMatrix { determinant }) if determinant == 0.0
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let result = LinearTransform::from_cd(vec![1.0, 1.0, 1.0], vec![vec![1.0, 0.0]]);
        assert!(matches!(result, Err(WcsError::InvalidParameter { .. })));
    }

    #[test]
    fn test_cdelt_crota_rotates_first_two_axes() {
        let transform =
            LinearTransform::from_cdelt_crota(vec![0.0; 3], &[-0.5, 0.5, 4.0], 90.0).unwrap();
        assert_close(transform.element(0, 0), 0.0, 1e-15);
        assert_close(transform.element(0, 1), -0.5, 1e-15);
        assert_close(transform.element(1, 0), -0.5, 1e-15);
        assert_close(transform.element(1, 1), 0.0, 1e-15);
        assert_eq!(transform.element(2, 2), 4.0);
        assert_eq!(transform.element(0, 2), 0.0);
    }

    #[test]
    fn test_identity() {
        let transform = LinearTransform::identity(3);
        assert!(transform.is_identity());
        assert_eq!(transform.crpix(), &[0.0, 0.0, 0.0]);
        assert_eq!(transform.pixel_to_intermediate(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_element_outside_axes_is_identity() {
        let transform = LinearTransform::from_cd(vec![1.0], vec![vec![2.0]]).unwrap();
        assert_eq!(transform.element(0, 0), 2.0);
        assert_eq!(transform.element(1, 1), 1.0);
        assert_eq!(transform.element(2, 1), 0.0);
    }
}
