use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use astrocube_wcs::{Affine4, WcsStatus};
use tracing::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::core::{BitPix, ByteOrder};
use crate::fits::data::{decode_segment, Extent, Scaling, VoxelBuffer};
use crate::fits::header::{decode_from, repair_legacy_header, HeaderStore, LegacyFix};
use crate::fits::wcs::WcsInfo;
use crate::fits::{FitsError, Result};
use crate::stats::VolumeStatistics;

const FITS_SIGNATURE: &[u8] = b"SIMPLE  =";
const FILE_EXTENSIONS: &[&str] = &[".fits", ".fit", ".fts"];
const MAX_AXES: i64 = 999;
const MAX_LOADED_AXES: usize = 3;

/// Whether `path` starts with a FITS primary header.
pub fn can_read<P: AsRef<Path>>(path: P) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut signature = [0u8; 9];
    file.read_exact(&mut signature).is_ok() && signature == FITS_SIGNATURE
}

pub fn file_extensions() -> &'static [&'static str] {
    FILE_EXTENSIONS
}

pub type CubeFile = BufReader<File>;

/// Everything needed to interpret the data segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLayout {
    pub bitpix: BitPix,
    pub extents: Vec<usize>,
    pub scaling: Scaling,
    pub data_offset: u64,
}

impl DataLayout {
    /// Bytes the header promises, without block padding.
    pub fn byte_len(&self) -> Result<u64> {
        self.extents
            .iter()
            .try_fold(self.bitpix.bytes_per_pixel() as u64, |acc, &n| acc.checked_mul(n as u64))
            .ok_or_else(|| FitsError::InvalidDimensions("data dimensions too large".to_string()))
    }
}

/// Reader for the primary image of a FITS cube.
///
/// Construction decodes the header, applies legacy repairs and builds the
/// WCS; [`CubeReader::load`] then reads the voxels. The reader owns its
/// source, so a file handle lives exactly as long as the reader.
pub struct CubeReader<R> {
    reader: R,
    config: ReaderConfig,
    header: HeaderStore,
    repairs: Vec<LegacyFix>,
    data_offset: u64,
    extents: Vec<usize>,
    wcs: WcsInfo,
    volume: Option<VoxelBuffer>,
    statistics: Option<VolumeStatistics>,
    attributes: HeaderStore,
}

impl CubeReader<CubeFile> {
    /// Opens `path` and loads the whole volume.
    pub fn open<P: AsRef<Path>>(path: P, config: ReaderConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut cube = Self::new(BufReader::new(file), config)?;
        cube.load()?;
        info!(path = %path.display(), extents = ?cube.extents, "opened cube");
        Ok(cube)
    }
}

impl<R: Read + Seek> CubeReader<R> {
    /// Reads header information only; no voxels are loaded.
    pub fn new(mut reader: R, config: ReaderConfig) -> Result<Self> {
        reader.seek(SeekFrom::Start(0))?;
        let decoded = decode_from(&mut reader, config.max_header_blocks)?;
        if !decoded.status.is_complete() {
            return Err(FitsError::InvalidFormat(format!(
                "unusable header: {}",
                decoded.status
            )));
        }
        if decoded.store.get_logical("SIMPLE") != Some(true) {
            return Err(FitsError::InvalidFormat(
                "primary header must start with SIMPLE = T".to_string(),
            ));
        }

        let (header, repairs) = if config.repair_legacy_headers {
            let outcome = repair_legacy_header(&decoded.store);
            for fix in &outcome.applied {
                info!(%fix, "repaired legacy header");
            }
            (outcome.header, outcome.applied)
        } else {
            (decoded.store, Vec::new())
        };

        let extents = parse_extents(&header)?;
        let wcs = WcsInfo::from_header(&header, &extents, config.origin);
        debug!(
            keywords = header.len(),
            data_offset = decoded.end_offset,
            extents = ?extents,
            "decoded primary header"
        );

        Ok(Self {
            reader,
            config,
            attributes: header.clone(),
            header,
            repairs,
            data_offset: decoded.end_offset,
            extents,
            wcs,
            volume: None,
            statistics: None,
        })
    }

    pub fn layout(&self) -> Result<DataLayout> {
        let code = required_int(&self.header, "BITPIX")?;
        let bitpix = BitPix::from_value(code).ok_or(FitsError::InvalidBitPix(code))?;
        Ok(DataLayout {
            bitpix,
            extents: self.extents.clone(),
            scaling: Scaling::from_header(&self.header, bitpix),
            data_offset: self.data_offset,
        })
    }

    /// Reads the whole volume, replacing any previous one. On failure no
    /// volume is left behind.
    pub fn load(&mut self) -> Result<()> {
        self.volume = None;
        self.statistics = None;
        self.attributes = self.header.clone();

        let layout = self.layout()?;
        let volume = self.read_region(&layout, &Extent::full(&self.extents))?;
        debug!(bitpix = %layout.bitpix, elements = volume.len(), "loaded volume");
        self.volume = Some(volume);

        if self.config.compute_statistics_on_load {
            if let Err(err) = self.compute_statistics() {
                warn!(error = %err, "volume statistics unavailable");
            }
        }
        Ok(())
    }

    /// Reads only the voxels inside `extent`. The loaded volume is untouched.
    pub fn read_extent(&mut self, extent: &Extent) -> Result<VoxelBuffer> {
        extent.validate(&self.extents)?;
        let layout = self.layout()?;
        self.read_region(&layout, extent)
    }

    /// Computes range and noise over the loaded volume and publishes them in
    /// [`CubeReader::attributes`].
    pub fn compute_statistics(&mut self) -> Result<VolumeStatistics> {
        let volume = self.volume.as_ref().ok_or(FitsError::NoVolume)?;
        let stats = VolumeStatistics::compute(volume)?;

        let mut attributes = self.header.clone();
        stats.write_attributes(&mut attributes);
        self.attributes = attributes;
        self.statistics = Some(stats);
        Ok(stats)
    }

    fn read_region(&mut self, layout: &DataLayout, extent: &Extent) -> Result<VoxelBuffer> {
        let expected = layout.byte_len()?;
        let file_len = self.reader.seek(SeekFrom::End(0))?;
        let available = file_len.saturating_sub(layout.data_offset);
        if available < expected {
            return Err(FitsError::TruncatedData {
                expected,
                actual: available,
            });
        }

        let runs = extent.runs(&layout.extents);
        let bpp = layout.bitpix.bytes_per_pixel();
        if runs.len() > 1 {
            debug!(runs = runs.len(), elements = extent.element_count(), "reading sub-extent");
        }

        let mut raw = Vec::with_capacity(extent.element_count() * bpp);
        for run in runs {
            let offset = layout.data_offset + (run.offset * bpp) as u64;
            self.reader.seek(SeekFrom::Start(offset))?;
            let start = raw.len();
            raw.resize(start + run.len * bpp, 0);
            self.reader.read_exact(&mut raw[start..])?;
        }

        let data = decode_segment(layout.bitpix, &raw, ByteOrder::BigEndian)?;
        VoxelBuffer::new(data, extent.shape(), 1, layout.scaling)
    }

    #[inline]
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    #[inline]
    pub fn header(&self) -> &HeaderStore {
        &self.header
    }

    /// Header keywords plus the statistics keys once computed.
    #[inline]
    pub fn attributes(&self) -> &HeaderStore {
        &self.attributes
    }

    pub fn repairs(&self) -> &[LegacyFix] {
        &self.repairs
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    #[inline]
    pub fn wcs(&self) -> &WcsInfo {
        &self.wcs
    }

    pub fn wcs_status(&self) -> WcsStatus {
        self.wcs.status()
    }

    pub fn ijk_to_ras(&self) -> &Affine4 {
        self.wcs.ijk_to_ras()
    }

    pub fn ras_to_ijk(&self) -> Option<&Affine4> {
        self.wcs.ras_to_ijk()
    }

    #[inline]
    pub fn volume(&self) -> Option<&VoxelBuffer> {
        self.volume.as_ref()
    }

    /// The loaded volume, or the placeholder when there is none.
    pub fn volume_or_placeholder(&self) -> Cow<'_, VoxelBuffer> {
        match &self.volume {
            Some(volume) => Cow::Borrowed(volume),
            None => Cow::Owned(VoxelBuffer::placeholder()),
        }
    }

    pub fn statistics(&self) -> Option<&VolumeStatistics> {
        self.statistics.as_ref()
    }
}

fn required_int(header: &HeaderStore, key: &str) -> Result<i64> {
    match header.get(key) {
        None => Err(FitsError::keyword_not_found(key)),
        Some(raw) => header
            .get_int(key)
            .ok_or_else(|| FitsError::invalid_value(key, raw.trim())),
    }
}

/// Axis lengths, fastest first. Trailing length-1 axes past the third are
/// dropped (degenerate Stokes or frequency axes).
fn parse_extents(header: &HeaderStore) -> Result<Vec<usize>> {
    let naxis = required_int(header, "NAXIS")?;
    if !(0..=MAX_AXES).contains(&naxis) {
        return Err(FitsError::invalid_value("NAXIS", naxis.to_string()));
    }

    let mut extents = Vec::with_capacity(naxis as usize);
    for i in 1..=naxis {
        let key = format!("NAXIS{i}");
        let n = required_int(header, &key)?;
        let n = usize::try_from(n).map_err(|_| FitsError::invalid_value(&key, n.to_string()))?;
        extents.push(n);
    }

    while extents.len() > MAX_LOADED_AXES && extents.last() == Some(&1) {
        extents.pop();
    }
    if extents.is_empty() || extents.len() > MAX_LOADED_AXES {
        return Err(FitsError::InvalidDimensions(format!(
            "expected 1 to {MAX_LOADED_AXES} data axes, header declares {extents:?}"
        )));
    }
    Ok(extents)
}
