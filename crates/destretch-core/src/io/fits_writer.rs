use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, WriteBytesExt};

use crate::consts::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};
use crate::error::Result;
use crate::frame::Frame;

/// Write a frame as a single-HDU FITS file with 32-bit float samples.
///
/// Single-plane frames are written as 2-D images, stacks as 3-D.
/// Existing files are overwritten.
pub fn write_fits(path: &Path, frame: &Frame) -> Result<()> {
    let file = File::create(path)?;
    let mut w = BufWriter::new(file);

    let mut cards = vec![
        card("SIMPLE", "T"),
        card("BITPIX", "-32"),
    ];
    if frame.planes() == 1 {
        cards.push(card("NAXIS", "2"));
    } else {
        cards.push(card("NAXIS", "3"));
    }
    cards.push(card("NAXIS1", &frame.width().to_string()));
    cards.push(card("NAXIS2", &frame.height().to_string()));
    if frame.planes() != 1 {
        cards.push(card("NAXIS3", &frame.planes().to_string()));
    }
    cards.push(format!("{:<80}", "END"));

    let mut written = 0;
    for c in &cards {
        w.write_all(c.as_bytes())?;
        written += FITS_CARD_SIZE;
    }
    pad(&mut w, written, b' ')?;

    for &v in frame.data.iter() {
        w.write_f32::<BigEndian>(v)?;
    }
    pad(&mut w, frame.data.len() * 4, 0)?;

    w.flush()?;
    Ok(())
}

/// Fixed-format card: keyword in columns 1-8, value right-aligned to column 30.
fn card(keyword: &str, value: &str) -> String {
    format!("{:<80}", format!("{keyword:<8}= {value:>20}"))
}

fn pad(w: &mut impl Write, written: usize, byte: u8) -> Result<()> {
    let rem = written % FITS_BLOCK_SIZE;
    if rem != 0 {
        w.write_all(&vec![byte; FITS_BLOCK_SIZE - rem])?;
    }
    Ok(())
}
