use std::collections::HashMap;

use tracing::{debug, warn};

use crate::descriptor::{AxisDescriptor, WcsDescriptor, WcsStatus};
use crate::error::{WcsError, WcsResult};
use crate::header::KeywordProvider;
use crate::linear::LinearTransform;

/// Most axes a WCS is built for. FITS allows 999, but a matrix that large
/// only ever comes from degenerate headers.
const MAX_WCS_AXES: usize = 16;

#[derive(Debug, Clone, PartialEq, Default)]
enum MatrixSpec {
    #[default]
    None,
    Cd(Vec<Vec<f64>>),
    PcCdelt {
        pc: Vec<Vec<f64>>,
        cdelt: Vec<f64>,
    },
    CdeltCrota {
        cdelt: Vec<f64>,
        crota: f64,
    },
}

/// Collects WCS keywords and turns them into a [`WcsDescriptor`].
///
/// Building never fails. Structural problems (malformed numbers, a bad axis
/// count, a singular matrix) degrade to a pixel-only descriptor with
/// [`WcsStatus::Fallback`]; missing mandatory keywords are filled with FITS
/// defaults and reported as [`WcsStatus::Repaired`].
#[derive(Debug, Clone, Default)]
pub struct WcsBuilder {
    naxis: Option<usize>,
    crpix: HashMap<usize, f64>,
    crval: HashMap<usize, f64>,
    ctype: HashMap<usize, String>,
    cunit: HashMap<usize, String>,
    matrix: MatrixSpec,
    defaulted: Vec<String>,
    problems: Vec<WcsError>,
}

impl WcsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn naxis(mut self, naxis: usize) -> Self {
        self.naxis = Some(naxis);
        self
    }

    /// Axis indices are 0-based; axis 0 is described by `CRPIX1`.
    pub fn crpix(mut self, axis: usize, value: f64) -> Self {
        self.crpix.insert(axis, value);
        self
    }

    pub fn crval(mut self, axis: usize, value: f64) -> Self {
        self.crval.insert(axis, value);
        self
    }

    pub fn ctype(mut self, axis: usize, value: impl Into<String>) -> Self {
        self.ctype.insert(axis, value.into());
        self
    }

    pub fn cunit(mut self, axis: usize, value: impl Into<String>) -> Self {
        self.cunit.insert(axis, value.into());
        self
    }

    pub fn cd_matrix(mut self, cd: Vec<Vec<f64>>) -> Self {
        self.matrix = MatrixSpec::Cd(cd);
        self
    }

    pub fn pc_cdelt(mut self, pc: Vec<Vec<f64>>, cdelt: Vec<f64>) -> Self {
        self.matrix = MatrixSpec::PcCdelt { pc, cdelt };
        self
    }

    pub fn cdelt_crota(mut self, cdelt: Vec<f64>, crota: f64) -> Self {
        self.matrix = MatrixSpec::CdeltCrota { cdelt, crota };
        self
    }

    pub fn from_header(header: &impl KeywordProvider) -> Self {
        let mut builder = Self::new();

        let naxis = match resolve_axis_count(header) {
            Ok(naxis) => naxis,
            Err(err) => {
                builder.problems.push(err);
                header
                    .get_int("NAXIS")
                    .filter(|&n| n >= 0)
                    .map_or(0, |n| (n as usize).min(MAX_WCS_AXES))
            }
        };
        builder.naxis = Some(naxis);

        for axis in 0..naxis {
            let n = axis + 1;
            if let Some(ctype) = header.get_string(&format!("CTYPE{n}")) {
                builder.ctype.insert(axis, ctype.trim().to_string());
            }
            if let Some(cunit) = header.get_string(&format!("CUNIT{n}")) {
                builder.cunit.insert(axis, cunit.trim().to_string());
            }
            match header.lookup_float(&format!("CRPIX{n}")) {
                Ok(Some(value)) => {
                    builder.crpix.insert(axis, value);
                }
                Ok(None) => {}
                Err(err) => builder.problems.push(err),
            }
            match header.lookup_float(&format!("CRVAL{n}")) {
                Ok(Some(value)) => {
                    builder.crval.insert(axis, value);
                }
                Ok(None) => {}
                Err(err) => builder.problems.push(err),
            }
        }

        match parse_matrix(header, naxis, &mut builder.defaulted) {
            Ok(matrix) => builder.matrix = matrix,
            Err(err) => builder.problems.push(err),
        }

        builder
    }

    pub fn validate(&self) -> WcsResult<()> {
        match self.problems.first() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    pub fn build(self) -> WcsDescriptor {
        let naxis = self.resolved_naxis();

        if let Err(err) = self.validate() {
            warn!(error = %err, problems = self.problems.len(), "invalid WCS keywords, using pixel-only coordinates");
            return WcsDescriptor::pixel_only(naxis, WcsStatus::Fallback);
        }

        let mut defaulted = self.defaulted;
        let mut axes = Vec::with_capacity(naxis);
        for axis in 0..naxis {
            let n = axis + 1;
            let crpix = self.crpix.get(&axis).copied().unwrap_or_else(|| {
                defaulted.push(format!("CRPIX{n}"));
                0.0
            });
            let crval = self.crval.get(&axis).copied().unwrap_or_else(|| {
                defaulted.push(format!("CRVAL{n}"));
                0.0
            });
            axes.push(AxisDescriptor {
                ctype: self.ctype.get(&axis).cloned().unwrap_or_default(),
                cunit: self.cunit.get(&axis).cloned().unwrap_or_default(),
                crpix,
                crval,
            });
        }
        let crpix: Vec<f64> = axes.iter().map(|a| a.crpix).collect();

        let linear = match self.matrix {
            MatrixSpec::Cd(cd) => LinearTransform::from_cd(crpix, cd),
            MatrixSpec::PcCdelt { pc, cdelt } => LinearTransform::from_pc_cdelt(crpix, pc, &cdelt),
            MatrixSpec::CdeltCrota { cdelt, crota } => {
                LinearTransform::from_cdelt_crota(crpix, &cdelt, crota)
            }
            MatrixSpec::None => {
                if naxis > 0 {
                    defaulted.push("CDELT".to_string());
                }
                LinearTransform::from_cdelt_crota(crpix, &vec![1.0; naxis], 0.0)
            }
        };

        let linear = match linear {
            Ok(linear) => linear,
            Err(err) => {
                warn!(error = %err, "unusable WCS linear transform, using pixel-only coordinates");
                return WcsDescriptor::pixel_only(naxis, WcsStatus::Fallback);
            }
        };

        let status = if defaulted.is_empty() {
            WcsStatus::Conformant
        } else {
            debug!(keywords = ?defaulted, "synthesized default WCS keywords");
            WcsStatus::Repaired
        };

        WcsDescriptor::new(axes, linear, status)
    }

    fn resolved_naxis(&self) -> usize {
        if let Some(naxis) = self.naxis {
            return naxis;
        }
        let from_keys = self
            .crpix
            .keys()
            .chain(self.crval.keys())
            .chain(self.ctype.keys())
            .chain(self.cunit.keys())
            .map(|&axis| axis + 1)
            .max()
            .unwrap_or(0);
        let from_matrix = match &self.matrix {
            MatrixSpec::None => 0,
            MatrixSpec::Cd(cd) => cd.len(),
            MatrixSpec::PcCdelt { cdelt, .. } | MatrixSpec::CdeltCrota { cdelt, .. } => cdelt.len(),
        };
        from_keys.max(from_matrix)
    }
}

fn resolve_axis_count(header: &impl KeywordProvider) -> WcsResult<usize> {
    let value = match header.lookup_int("WCSAXES")? {
        Some(value) => value,
        None => header
            .lookup_int("NAXIS")?
            .ok_or_else(|| WcsError::missing_keyword("NAXIS"))?,
    };
    if value < 0 || value as u64 > MAX_WCS_AXES as u64 {
        return Err(WcsError::invalid_axis_count(value));
    }
    Ok(value as usize)
}

/// CD takes precedence over PC+CDELT, which takes precedence over CDELT+CROTA2.
fn parse_matrix(
    header: &impl KeywordProvider,
    naxis: usize,
    defaulted: &mut Vec<String>,
) -> WcsResult<MatrixSpec> {
    let mut cd = vec![vec![0.0; naxis]; naxis];
    let mut pc = vec![vec![0.0; naxis]; naxis];
    let mut cd_rows = vec![false; naxis];
    let mut has_pc = false;

    for i in 0..naxis {
        pc[i][i] = 1.0;
        for j in 0..naxis {
            if let Some(value) = header.lookup_float(&format!("CD{}_{}", i + 1, j + 1))? {
                cd[i][j] = value;
                cd_rows[i] = true;
            }
            if let Some(value) = header.lookup_float(&format!("PC{}_{}", i + 1, j + 1))? {
                pc[i][j] = value;
                has_pc = true;
            }
        }
    }

    let mut cdelt = Vec::with_capacity(naxis);
    let mut missing_cdelt = Vec::new();
    for i in 1..=naxis {
        let key = format!("CDELT{i}");
        match header.lookup_float(&key)? {
            Some(value) => cdelt.push(value),
            None => {
                cdelt.push(1.0);
                missing_cdelt.push(key);
            }
        }
    }

    if cd_rows.contains(&true) {
        // rows without any CDi_j fall back to CDELTi on the diagonal
        for (i, present) in cd_rows.iter().enumerate() {
            if !present {
                cd[i][i] = cdelt[i];
                defaulted.push(format!("CD{0}_{0}", i + 1));
            }
        }
        return Ok(MatrixSpec::Cd(cd));
    }

    if has_pc {
        return Ok(MatrixSpec::PcCdelt { pc, cdelt });
    }

    if missing_cdelt.len() == naxis {
        return Ok(MatrixSpec::None);
    }
    defaulted.extend(missing_cdelt);

    let crota = match header.lookup_float("CROTA2")? {
        Some(value) => Some(value),
        None => header.lookup_float("CROTA1")?,
    };
    match crota {
        Some(crota) if crota != 0.0 && naxis >= 2 => Ok(MatrixSpec::CdeltCrota { cdelt, crota }),
        _ => Ok(MatrixSpec::PcCdelt { pc, cdelt }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::KeywordMap;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-12, "{a} != {b}");
    }

    fn radio_cube_header() -> KeywordMap {
        let mut map = KeywordMap::new();
        map.set_int("NAXIS", 3)
            .set_string("CTYPE1", "RA---SIN")
            .set_string("CTYPE2", "DEC--SIN")
            .set_string("CTYPE3", "VRAD")
            .set_string("CUNIT3", "m/s")
            .set_float("CRPIX1", 33.0)
            .set_float("CRPIX2", 33.0)
            .set_float("CRPIX3", 1.0)
            .set_float("CRVAL1", 180.0)
            .set_float("CRVAL2", 45.0)
            .set_float("CRVAL3", 1.2e6)
            .set_float("CDELT1", -0.002)
            .set_float("CDELT2", 0.002)
            .set_float("CDELT3", 5000.0);
        map
    }

    #[test]
    fn test_builder_new() {
        let builder = WcsBuilder::new();
        assert!(builder.naxis.is_none());
        assert!(builder.crpix.is_empty());
        assert_eq!(builder.matrix, MatrixSpec::None);
        assert!(builder.validate().is_ok());
    }

    #[test]
    fn test_builder_chaining() {
        let wcs = WcsBuilder::new()
            .crpix(0, 10.0)
            .crpix(1, 20.0)
            .crval(0, 1.0)
            .crval(1, 2.0)
            .ctype(0, "GLON-CAR")
            .ctype(1, "GLAT-CAR")
            .cd_matrix(vec![vec![0.5, 0.0], vec![0.0, 0.5]])
            .build();

        assert_eq!(wcs.naxis(), 2);
        assert_eq!(wcs.status(), WcsStatus::Conformant);
        assert_eq!(wcs.crpix(), vec![10.0, 20.0]);
        assert_eq!(wcs.axis(0).unwrap().ctype, "GLON-CAR");
    }

    #[test]
    fn test_from_header_conformant_cube() {
        let wcs = WcsBuilder::from_header(&radio_cube_header()).build();

        assert_eq!(wcs.status(), WcsStatus::Conformant);
        assert_eq!(wcs.naxis(), 3);
        assert_eq!(wcs.crval(), vec![180.0, 45.0, 1.2e6]);
        assert_eq!(wcs.axis(2).unwrap().cunit, "m/s");
        assert_close(wcs.linear().element(0, 0), -0.002);
        assert_close(wcs.linear().element(2, 2), 5000.0);
    }

    #[test]
    fn test_cd_takes_precedence_over_pc() {
        let mut header = radio_cube_header();
        header
            .set_float("PC1_1", 0.0)
            .set_float("PC1_2", 1.0)
            .set_float("CD1_1", -0.001)
            .set_float("CD2_2", 0.001)
            .set_float("CD3_3", 2500.0);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Conformant);
        assert_close(wcs.linear().element(0, 0), -0.001);
        assert_close(wcs.linear().element(0, 1), 0.0);
        assert_close(wcs.linear().element(2, 2), 2500.0);
    }

    #[test]
    fn test_pc_takes_precedence_over_crota() {
        let mut header = radio_cube_header();
        header.set_float("CROTA2", 30.0).set_float("PC1_2", 0.25);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_close(wcs.linear().element(0, 0), -0.002);
        assert_close(wcs.linear().element(0, 1), -0.002 * 0.25);
        assert_close(wcs.linear().element(1, 0), 0.0);
    }

    #[test]
    fn test_crota_rotation_applied() {
        let mut header = radio_cube_header();
        header.set_float("CROTA2", 90.0);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Conformant);
        assert!(wcs.linear().element(0, 0).abs() < 1e-15);
        assert_close(wcs.linear().element(0, 1), -0.002);
        assert_close(wcs.linear().element(1, 0), -0.002);
        assert_close(wcs.linear().element(2, 2), 5000.0);
    }

    #[test]
    fn test_missing_crpix_is_repaired() {
        let mut header = KeywordMap::new();
        header
            .set_int("NAXIS", 2)
            .set_float("CRVAL1", 10.0)
            .set_float("CRVAL2", 20.0)
            .set_float("CDELT1", 0.5)
            .set_float("CDELT2", 0.5);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Repaired);
        assert_eq!(wcs.crpix(), vec![0.0, 0.0]);
        assert_eq!(wcs.crval(), vec![10.0, 20.0]);
        assert_close(wcs.linear().element(1, 1), 0.5);
    }

    #[test]
    fn test_no_wcs_keywords_synthesizes_unit_scale() {
        let mut header = KeywordMap::new();
        header.set_int("NAXIS", 3);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Repaired);
        assert_eq!(wcs.naxis(), 3);
        assert!(wcs.linear().is_identity());
        assert_eq!(wcs.pixel_to_world(&[1.0, 2.0, 3.0]), vec![1.0, 2.0, 3.0]);
    }

    fn cube_without(skip: &str) -> KeywordMap {
        let full = radio_cube_header();
        let mut map = KeywordMap::new();
        map.set_int("NAXIS", 3);
        for axis in 1..=3 {
            for prefix in ["CRPIX", "CRVAL", "CDELT"] {
                let key = format!("{prefix}{axis}");
                if key != skip {
                    map.set_float(key.as_str(), full.get_float(&key).unwrap());
                }
            }
        }
        map
    }

    #[test]
    fn test_partial_cdelt_is_repaired() {
        let header = cube_without("CDELT3");

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Repaired);
        assert_close(wcs.linear().element(0, 0), -0.002);
        assert_close(wcs.linear().element(2, 2), 1.0);
    }

    #[test]
    fn test_malformed_value_falls_back_to_pixel_only() {
        let mut header = cube_without("CDELT3");
        header.set_string("CDELT3", "fast");

        let builder = WcsBuilder::from_header(&header);
        assert!(builder.validate().is_err());

        let wcs = builder.build();
        assert_eq!(wcs.status(), WcsStatus::Fallback);
        assert_eq!(wcs.naxis(), 3);
        assert!(wcs.linear().is_identity());
        assert_eq!(wcs.crval(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_singular_matrix_falls_back() {
        let mut header = radio_cube_header();
        header
            .set_float("CD1_1", 1.0)
            .set_float("CD1_2", 2.0)
            .set_float("CD2_1", 2.0)
            .set_float("CD2_2", 4.0)
            .set_float("CD3_3", 1.0);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Fallback);
        assert_eq!(wcs.naxis(), 3);
    }

    #[test]
    fn test_missing_naxis_falls_back_with_no_axes() {
        let header = KeywordMap::new();
        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Fallback);
        assert_eq!(wcs.naxis(), 0);
    }

    #[test]
    fn test_invalid_wcsaxes_keeps_naxis() {
        let mut header = radio_cube_header();
        header.set_int("WCSAXES", -1);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Fallback);
        assert_eq!(wcs.naxis(), 3);
    }

    #[test]
    fn test_wcsaxes_overrides_naxis() {
        let mut header = radio_cube_header();
        header.set_int("WCSAXES", 2);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.naxis(), 2);
        assert_eq!(wcs.status(), WcsStatus::Conformant);
    }

    #[test]
    fn test_zero_axes_is_conformant() {
        let mut header = KeywordMap::new();
        header.set_int("NAXIS", 0);
        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Conformant);
        assert_eq!(wcs.naxis(), 0);
    }

    #[test]
    fn test_partial_cd_block_uses_cdelt_for_missing_rows() {
        let mut header = radio_cube_header();
        header.set_float("CD1_1", -0.001).set_float("CD2_2", 0.001);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Repaired);
        assert_close(wcs.linear().element(0, 0), -0.001);
        assert_close(wcs.linear().element(1, 1), 0.001);
        assert_close(wcs.linear().element(2, 2), 5000.0);
        assert_close(wcs.linear().element(2, 0), 0.0);
        assert_eq!(wcs.crval(), vec![180.0, 45.0, 1.2e6]);
    }

    #[test]
    fn test_partial_cd_block_with_stokes_axis() {
        let mut header = radio_cube_header();
        header
            .set_int("NAXIS", 4)
            .set_string("CTYPE4", "STOKES")
            .set_float("CRPIX4", 1.0)
            .set_float("CRVAL4", 1.0)
            .set_float("CD1_1", -0.001)
            .set_float("CD2_2", 0.001)
            .set_float("CD3_3", 2500.0);

        let wcs = WcsBuilder::from_header(&header).build();
        assert_eq!(wcs.status(), WcsStatus::Repaired);
        assert_eq!(wcs.naxis(), 4);
        assert_close(wcs.linear().element(2, 2), 2500.0);
        assert_close(wcs.linear().element(3, 3), 1.0);
        assert_eq!(wcs.pixel_to_world(&[33.0, 33.0, 1.0, 1.0]), vec![180.0, 45.0, 1.2e6, 1.0]);
    }

    #[test]
    fn test_oversized_axis_count_falls_back_capped() {
        let mut header = KeywordMap::new();
        header.set_int("NAXIS", 999);

        let builder = WcsBuilder::from_header(&header);
        assert!(matches!(
            builder.validate(),
            Err(WcsError::InvalidAxisCount { value: 999 })
        ));
        let wcs = builder.build();
        assert_eq!(wcs.status(), WcsStatus::Fallback);
        assert_eq!(wcs.naxis(), MAX_WCS_AXES);
    }
}
