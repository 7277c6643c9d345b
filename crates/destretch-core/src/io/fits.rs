use std::fs::File;
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder};
use memmap2::Mmap;
use ndarray::{ArrayD, IxDyn};
use num_traits::AsPrimitive;

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::{DestretchError, Result};

const SIMPLE_KEYWORD: &[u8] = b"SIMPLE  =";

/// Primary-HDU header of a FITS file.
#[derive(Clone, Debug)]
pub struct FitsHeader {
    /// Sample type code: 8, 16, 32 (integers) or -32, -64 (IEEE floats).
    pub bitpix: i32,
    /// NAXIS1..NAXISn, fastest-varying axis first.
    pub axes: Vec<usize>,
    pub bscale: f64,
    pub bzero: f64,
    /// Raw keyword/value pairs in card order, comments stripped.
    pub keywords: Vec<(String, String)>,
    /// Byte offset of the data unit (header length rounded up to a block).
    pub data_offset: usize,
}

impl FitsHeader {
    pub fn bytes_per_sample(&self) -> usize {
        (self.bitpix.unsigned_abs() / 8) as usize
    }

    /// `None` when the axis product does not fit in `usize`.
    pub fn sample_count(&self) -> Option<usize> {
        self.axes.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
    }

    pub fn data_byte_size(&self) -> Option<usize> {
        self.sample_count()?.checked_mul(self.bytes_per_sample())
    }

    /// Byte offset one past the end of the data unit.
    pub fn data_end(&self) -> Result<usize> {
        self.data_byte_size()
            .and_then(|size| size.checked_add(self.data_offset))
            .ok_or_else(|| DestretchError::InvalidFits("Data size overflows".into()))
    }

    /// Array shape, slowest-varying axis first (NAXISn..NAXIS1).
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().rev().copied().collect()
    }

    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Memory-mapped reader for the primary image of a FITS file.
pub struct FitsReader {
    mmap: Mmap,
    pub header: FitsHeader,
}

impl FitsReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() < FITS_BLOCK_SIZE as u64 {
            return Err(DestretchError::InvalidFits(
                "File too small for a FITS header".into(),
            ));
        }
        let mmap = unsafe { Mmap::map(&file)? };

        if !mmap.starts_with(SIMPLE_KEYWORD) {
            return Err(DestretchError::InvalidFits("Missing SIMPLE keyword".into()));
        }

        let header = parse_header(&mmap)?;

        let expected = header.data_end()?;
        if mmap.len() < expected {
            return Err(DestretchError::InvalidFits(format!(
                "File truncated: expected at least {} bytes, got {}",
                expected,
                mmap.len()
            )));
        }

        Ok(Self { mmap, header })
    }

    /// Decode the data unit into physical values (BSCALE/BZERO applied).
    ///
    /// The returned shape is slowest-varying axis first.
    pub fn read_array(&self) -> Result<ArrayD<f32>> {
        let h = &self.header;
        let raw = &self.mmap[h.data_offset..h.data_end()?];

        let samples = match h.bitpix {
            8 => decode(raw, 1, |b| b[0], h.bscale, h.bzero),
            16 => decode(raw, 2, BigEndian::read_i16, h.bscale, h.bzero),
            32 => decode(raw, 4, BigEndian::read_i32, h.bscale, h.bzero),
            -32 => decode(raw, 4, BigEndian::read_f32, h.bscale, h.bzero),
            -64 => decode(raw, 8, BigEndian::read_f64, h.bscale, h.bzero),
            other => {
                return Err(DestretchError::InvalidFits(format!(
                    "Unsupported BITPIX {other}"
                )))
            }
        };

        ArrayD::from_shape_vec(IxDyn(&h.shape()), samples)
            .map_err(|e| DestretchError::InvalidFits(e.to_string()))
    }
}

fn decode<T, F>(raw: &[u8], width: usize, read: F, bscale: f64, bzero: f64) -> Vec<f32>
where
    T: AsPrimitive<f64>,
    F: Fn(&[u8]) -> T,
{
    raw.chunks_exact(width)
        .map(|chunk| (read(chunk).as_() * bscale + bzero) as f32)
        .collect()
}

/// Summary of a FITS file for display.
#[derive(Clone, Debug)]
pub struct FitsInfo {
    pub filename: PathBuf,
    pub shape: Vec<usize>,
    pub bitpix: i32,
    pub object: Option<String>,
    pub telescope: Option<String>,
    pub instrument: Option<String>,
    pub date_obs: Option<String>,
}

pub fn fits_info(path: &Path) -> Result<FitsInfo> {
    let reader = FitsReader::open(path)?;
    let h = &reader.header;
    let text = |key: &str| h.keyword(key).map(|v| v.trim_matches('\'').trim().to_string());
    Ok(FitsInfo {
        filename: path.to_path_buf(),
        shape: h.shape(),
        bitpix: h.bitpix,
        object: text("OBJECT"),
        telescope: text("TELESCOP"),
        instrument: text("INSTRUME"),
        date_obs: text("DATE-OBS"),
    })
}

fn parse_header(bytes: &[u8]) -> Result<FitsHeader> {
    let mut keywords = Vec::new();
    let mut end_card = None;

    for (i, card) in bytes.chunks_exact(FITS_CARD_SIZE).enumerate() {
        let keyword = String::from_utf8_lossy(&card[..8]).trim_end().to_string();
        if keyword == "END" {
            end_card = Some(i);
            break;
        }
        if &card[8..10] == b"= " {
            let value = card_value(&card[10..]);
            keywords.push((keyword, value));
        }
    }

    let end_card =
        end_card.ok_or_else(|| DestretchError::InvalidFits("Header has no END card".into()))?;
    let header_bytes = (end_card + 1) * FITS_CARD_SIZE;
    let data_offset = header_bytes.div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE;

    let int = |key: &str| -> Result<i64> {
        let value = keywords
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| DestretchError::InvalidFits(format!("Missing {key} keyword")))?;
        value
            .parse::<i64>()
            .map_err(|_| DestretchError::InvalidFits(format!("Invalid {key} value '{value}'")))
    };
    let float_or = |key: &str, default: f64| -> f64 {
        keywords
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.replace('D', "E").parse::<f64>().ok())
            .unwrap_or(default)
    };

    let bitpix = int("BITPIX")? as i32;
    let naxis = int("NAXIS")?;
    if !(2..=3).contains(&naxis) {
        return Err(DestretchError::InvalidFits(format!(
            "Expected a 2-D or 3-D image, found NAXIS = {naxis}"
        )));
    }
    let axes = (1..=naxis)
        .map(|n| int(&format!("NAXIS{n}")).map(|v| v.max(0) as usize))
        .collect::<Result<Vec<_>>>()?;
    let bscale = float_or("BSCALE", 1.0);
    let bzero = float_or("BZERO", 0.0);

    let header = FitsHeader {
        bitpix,
        axes,
        bscale,
        bzero,
        keywords,
        data_offset,
    };
    header.data_end()?;
    Ok(header)
}

/// Extract the value field of a card, dropping any trailing comment.
fn card_value(field: &[u8]) -> String {
    let text = String::from_utf8_lossy(field);
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('\'') {
        // Quoted strings may contain '/', and '' escapes a quote.
        let mut value = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    value.push('\'');
                    chars.next();
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        return value.trim_end().to_string();
    }
    text.split('/').next().unwrap_or("").trim().to_string()
}
