use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use destretch_core::io::fits_info;

#[derive(Args)]
pub struct InfoArgs {
    /// Input FITS file
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let info = fits_info(&args.file)?;

    println!("File:        {}", info.filename.display());
    let shape: Vec<String> = info.shape.iter().map(|n| n.to_string()).collect();
    println!("Shape:       {}", shape.join(" x "));
    println!("BITPIX:      {}", info.bitpix);

    if let Some(ref object) = info.object {
        println!("Object:      {}", object);
    }
    if let Some(ref tel) = info.telescope {
        println!("Telescope:   {}", tel);
    }
    if let Some(ref inst) = info.instrument {
        println!("Instrument:  {}", inst);
    }
    if let Some(ref date) = info.date_obs {
        println!("Date:        {}", date);
    }

    let samples: usize = info.shape.iter().product();
    let bytes = samples * (info.bitpix.unsigned_abs() as usize / 8);
    println!("Data size:   {:.1} MB", bytes as f64 / (1024.0 * 1024.0));

    Ok(())
}
