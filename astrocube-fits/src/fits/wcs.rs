use astrocube_wcs::{Affine4, KeywordProvider, OriginMode, RasTransform, WcsBuilder, WcsDescriptor, WcsStatus};
use tracing::{debug, warn};

use crate::fits::header::HeaderStore;

struct FitsKeywordAdapter<'a> {
    header: &'a HeaderStore,
}

impl KeywordProvider for FitsKeywordAdapter<'_> {
    fn get_string(&self, key: &str) -> Option<String> {
        self.header.get(key).map(|s| s.to_string())
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        self.header.get_float(key)
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.header.get_int(key)
    }

    fn contains(&self, key: &str) -> bool {
        self.header.contains_key(key)
    }
}

/// World coordinates of a cube together with its RAS display transform.
#[derive(Debug, Clone, PartialEq)]
pub struct WcsInfo {
    descriptor: WcsDescriptor,
    transform: RasTransform,
}

impl WcsInfo {
    /// Never fails; degraded keyword sets are reported through
    /// [`WcsInfo::status`].
    pub fn from_header(header: &HeaderStore, extents: &[usize], origin: OriginMode) -> Self {
        let adapter = FitsKeywordAdapter { header };
        let descriptor = WcsBuilder::from_header(&adapter).build();
        match descriptor.status() {
            WcsStatus::Conformant => debug!(naxis = descriptor.naxis(), "WCS conformant"),
            status => warn!(%status, naxis = descriptor.naxis(), "WCS degraded"),
        }
        let transform = RasTransform::from_descriptor(&descriptor, extents, origin);
        Self {
            descriptor,
            transform,
        }
    }

    #[inline]
    pub fn descriptor(&self) -> &WcsDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn status(&self) -> WcsStatus {
        self.descriptor.status()
    }

    #[inline]
    pub fn transform(&self) -> &RasTransform {
        &self.transform
    }

    #[inline]
    pub fn ijk_to_ras(&self) -> &Affine4 {
        self.transform.ijk_to_ras()
    }

    #[inline]
    pub fn ras_to_ijk(&self) -> Option<&Affine4> {
        self.transform.ras_to_ijk()
    }
}
