//! Normalization of headers written by the GIPSY reduction package.
//!
//! GIPSY predates several FITS WCS conventions. Each rule fires only when the
//! legacy keyword is present without its standard companion, so conformant
//! headers pass through untouched.

use std::fmt;

use super::store::HeaderStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyFix {
    /// `FREQ0` renamed to `RESTFRQ`.
    RestFrequency,
    /// `EPOCH` renamed to `EQUINOX`.
    Equinox,
    /// `CTYPEn = 'FREQ-xxxx'` split into `FREQ` and a `SPECSYS` frame.
    SpectralFrame { axis: usize, specsys: &'static str },
}

impl fmt::Display for LegacyFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestFrequency => write!(f, "FREQ0 -> RESTFRQ"),
            Self::Equinox => write!(f, "EPOCH -> EQUINOX"),
            Self::SpectralFrame { axis, specsys } => {
                write!(f, "CTYPE{axis} -> FREQ, SPECSYS = {specsys}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub header: HeaderStore,
    pub applied: Vec<LegacyFix>,
}

impl RepairOutcome {
    pub fn is_unchanged(&self) -> bool {
        self.applied.is_empty()
    }
}

fn spectral_frame(ctype: &str) -> Option<&'static str> {
    match ctype.trim().to_ascii_uppercase().as_str() {
        "FREQ-OHEL" | "FREQ-RHEL" => Some("BARYCENT"),
        "FREQ-OLSR" | "FREQ-RLSR" => Some("LSRK"),
        _ => None,
    }
}

fn axis_number(key: &str) -> Option<usize> {
    let digits = key.strip_prefix("CTYPE")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Returns a repaired copy of `header`; the input is never modified.
pub fn repair_legacy_header(header: &HeaderStore) -> RepairOutcome {
    let mut repaired = header.clone();
    let mut applied = Vec::new();

    if !header.contains_key("RESTFRQ") && !header.contains_key("RESTFREQ") {
        if let Some(freq0) = repaired.remove("FREQ0") {
            repaired.insert("RESTFRQ", freq0);
            applied.push(LegacyFix::RestFrequency);
        }
    }

    if !header.contains_key("EQUINOX") {
        if let Some(epoch) = repaired.remove("EPOCH") {
            repaired.insert("EQUINOX", epoch);
            applied.push(LegacyFix::Equinox);
        }
    }

    if !header.contains_key("SPECSYS") {
        let mut frames: Vec<(usize, &'static str)> = header
            .iter()
            .filter_map(|(key, value)| Some((axis_number(key)?, spectral_frame(value)?)))
            .collect();
        frames.sort_unstable_by_key(|&(axis, _)| axis);

        for (axis, specsys) in frames {
            repaired.insert(format!("CTYPE{axis}"), "FREQ");
            if !repaired.contains_key("SPECSYS") {
                repaired.insert("SPECSYS", specsys);
            }
            applied.push(LegacyFix::SpectralFrame { axis, specsys });
        }
    }

    RepairOutcome {
        header: repaired,
        applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str)]) -> HeaderStore {
        pairs.iter().copied().collect()
    }

    #[test]
    fn conformant_header_is_untouched() {
        let header = store(&[
            ("CTYPE3", "FREQ"),
            ("RESTFRQ", "1.42040575E9"),
            ("EQUINOX", "2000.0"),
            ("SPECSYS", "LSRK"),
        ]);
        let outcome = repair_legacy_header(&header);
        assert!(outcome.is_unchanged());
        assert_eq!(outcome.header, header);
    }

    #[test]
    fn freq0_becomes_restfrq() {
        let header = store(&[("FREQ0", "1.42040575E9")]);
        let outcome = repair_legacy_header(&header);
        assert_eq!(outcome.applied, vec![LegacyFix::RestFrequency]);
        assert_eq!(outcome.header.get("RESTFRQ"), Some("1.42040575E9"));
        assert!(!outcome.header.contains_key("FREQ0"));
        assert!(header.contains_key("FREQ0"));
    }

    #[test]
    fn freq0_kept_when_restfreq_present() {
        let header = store(&[("FREQ0", "1.0E9"), ("RESTFREQ", "1.42E9")]);
        let outcome = repair_legacy_header(&header);
        assert!(outcome.is_unchanged());
        assert_eq!(outcome.header.get("FREQ0"), Some("1.0E9"));
    }

    #[test]
    fn epoch_becomes_equinox() {
        let outcome = repair_legacy_header(&store(&[("EPOCH", "1950.0")]));
        assert_eq!(outcome.applied, vec![LegacyFix::Equinox]);
        assert_eq!(outcome.header.get("EQUINOX"), Some("1950.0"));
        assert!(!outcome.header.contains_key("EPOCH"));
    }

    #[test]
    fn epoch_kept_when_equinox_present() {
        let outcome = repair_legacy_header(&store(&[("EPOCH", "1950.0"), ("EQUINOX", "2000.0")]));
        assert!(outcome.is_unchanged());
    }

    #[test]
    fn heliocentric_frequency_axis() {
        let outcome = repair_legacy_header(&store(&[("CTYPE3", "FREQ-OHEL")]));
        assert_eq!(outcome.header.get("CTYPE3"), Some("FREQ"));
        assert_eq!(outcome.header.get("SPECSYS"), Some("BARYCENT"));
        assert_eq!(
            outcome.applied,
            vec![LegacyFix::SpectralFrame {
                axis: 3,
                specsys: "BARYCENT"
            }]
        );
    }

    #[test]
    fn lsr_frequency_axis() {
        let outcome = repair_legacy_header(&store(&[("CTYPE3", "FREQ-RLSR")]));
        assert_eq!(outcome.header.get("CTYPE3"), Some("FREQ"));
        assert_eq!(outcome.header.get("SPECSYS"), Some("LSRK"));
    }

    #[test]
    fn frequency_axis_kept_when_specsys_present() {
        let header = store(&[("CTYPE3", "FREQ-OHEL"), ("SPECSYS", "TOPOCENT")]);
        let outcome = repair_legacy_header(&header);
        assert!(outcome.is_unchanged());
        assert_eq!(outcome.header.get("CTYPE3"), Some("FREQ-OHEL"));
    }

    #[test]
    fn all_rules_together() {
        let outcome = repair_legacy_header(&store(&[
            ("CTYPE1", "RA---NCP"),
            ("CTYPE3", "FREQ-OLSR"),
            ("FREQ0", "1.4E9"),
            ("EPOCH", "1950.0"),
        ]));
        assert_eq!(outcome.applied.len(), 3);
        assert_eq!(outcome.header.get("CTYPE1"), Some("RA---NCP"));
        assert_eq!(
            outcome.applied[2].to_string(),
            "CTYPE3 -> FREQ, SPECSYS = LSRK"
        );
    }

    #[test]
    fn axis_number_parsing() {
        assert_eq!(axis_number("CTYPE3"), Some(3));
        assert_eq!(axis_number("CTYPE12"), Some(12));
        assert_eq!(axis_number("CTYPE"), None);
        assert_eq!(axis_number("CTYPE3A"), None);
        assert_eq!(axis_number("CUNIT3"), None);
    }
}
