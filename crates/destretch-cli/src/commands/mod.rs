pub mod apply;
pub mod config;
pub mod destretch;
pub mod info;
pub mod offsets;
pub mod rolling;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use destretch_core::frame::IndexConvention;
use destretch_core::io::source::is_fits;
use destretch_core::pipeline::config::{DestretchConfig, ReferenceMethod, RunConfig};
use destretch_core::rolling::EdgePolicy;

#[derive(Clone, Copy, ValueEnum)]
pub enum ConventionArg {
    Tyx,
    Yxt,
    Xyt,
}

impl From<ConventionArg> for IndexConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Tyx => Self::Tyx,
            ConventionArg::Yxt => Self::Yxt,
            ConventionArg::Xyt => Self::Xyt,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum EdgeArg {
    KeepRange,
    TrimMargins,
}

impl From<EdgeArg> for EdgePolicy {
    fn from(arg: EdgeArg) -> Self {
        match arg {
            EdgeArg::KeepRange => Self::KeepRange,
            EdgeArg::TrimMargins => Self::TrimMargins,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ReferenceArg {
    Previous,
    Composite,
}

/// Options shared by every registering command.
#[derive(Args)]
pub struct RegistrationArgs {
    /// Input frames, or directories of FITS files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Run config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Comma-separated kernel sizes, coarse to fine
    #[arg(long, value_delimiter = ',')]
    pub kernels: Option<Vec<usize>>,

    /// Reference supplier (default: composite for destretch, previous for offsets)
    #[arg(long, value_enum)]
    pub reference: Option<ReferenceArg>,

    /// Left and right margins of the composite reference (default: whole sequence)
    #[arg(long, num_args = 2, value_names = ["LEFT", "RIGHT"], allow_negative_numbers = true)]
    pub composite_margins: Option<Vec<i64>>,

    /// Window edge handling of the composite reference
    #[arg(long, value_enum)]
    pub composite_edges: Option<EdgeArg>,

    /// Axis order of the stored input arrays
    #[arg(long, value_enum)]
    pub axes: Option<ConventionArg>,

    /// Subtract each frame's mean before registration
    #[arg(long)]
    pub zero_mean: bool,
}

impl RegistrationArgs {
    /// Config file values, overridden by whatever was given on the command line.
    ///
    /// `default_reference` is used when neither names a reference.
    pub fn resolve(&self, default_reference: ReferenceMethod) -> Result<DestretchConfig> {
        let (run, names_reference) = read_run_config(self.config.as_deref())?;
        let mut config = run.destretch;
        if !names_reference {
            config.reference = default_reference;
        }
        if let Some(ref kernels) = self.kernels {
            config.kernel_sizes = kernels.clone();
        }
        if let Some(axes) = self.axes {
            config.index_convention = axes.into();
        }
        if self.zero_mean {
            config.zero_mean = true;
        }

        let wants_composite = matches!(self.reference, Some(ReferenceArg::Composite))
            || self.composite_margins.is_some()
            || self.composite_edges.is_some();
        match self.reference {
            Some(ReferenceArg::Previous) => config.reference = ReferenceMethod::PreviousOutput,
            _ if wants_composite => {
                let (mut margins, mut edge_policy) = match config.reference {
                    ReferenceMethod::MarginComposite {
                        margins,
                        edge_policy,
                    } => (margins, edge_policy),
                    ReferenceMethod::PreviousOutput => (None, EdgePolicy::default()),
                };
                if let Some(ref m) = self.composite_margins {
                    margins = Some([m[0], m[1]]);
                }
                if let Some(edges) = self.composite_edges {
                    edge_policy = edges.into();
                }
                config.reference = ReferenceMethod::MarginComposite {
                    margins,
                    edge_policy,
                };
            }
            _ => {}
        }
        Ok(config)
    }
}

/// Read a `--config` file, or the defaults when none is given.
pub fn load_run_config(path: Option<&Path>) -> Result<RunConfig> {
    read_run_config(path).map(|(config, _)| config)
}

/// Like [`load_run_config`], also reporting whether the file sets
/// `destretch.reference`.
fn read_run_config(path: Option<&Path>) -> Result<(RunConfig, bool)> {
    let Some(path) = path else {
        return Ok((RunConfig::default(), false));
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let table: toml::Table = toml::from_str(&contents).context("Invalid run config")?;
    let names_reference = table
        .get("destretch")
        .and_then(|section| section.get("reference"))
        .is_some();
    let config: RunConfig = toml::Value::Table(table)
        .try_into()
        .context("Invalid run config")?;
    Ok((config, names_reference))
}

/// Expand directories to their FITS files in name order; files pass through.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)
                .with_context(|| format!("Failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_fits(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    if files.is_empty() {
        bail!("No input frames found");
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(reference: Option<ReferenceArg>) -> RegistrationArgs {
        RegistrationArgs {
            inputs: vec![PathBuf::from("a.fits")],
            config: None,
            kernels: None,
            reference,
            composite_margins: None,
            composite_edges: None,
            axes: None,
            zero_mean: false,
        }
    }

    #[test]
    fn command_default_applies_without_reference_flag() {
        let whole = ReferenceMethod::MarginComposite {
            margins: None,
            edge_policy: EdgePolicy::KeepRange,
        };
        let config = args(None).resolve(whole.clone()).unwrap();
        assert_eq!(config.reference, whole);

        let config = args(None).resolve(ReferenceMethod::PreviousOutput).unwrap();
        assert_eq!(config.reference, ReferenceMethod::PreviousOutput);
    }

    #[test]
    fn reference_flag_overrides_command_default() {
        let whole = ReferenceMethod::MarginComposite {
            margins: None,
            edge_policy: EdgePolicy::KeepRange,
        };
        let config = args(Some(ReferenceArg::Previous)).resolve(whole).unwrap();
        assert_eq!(config.reference, ReferenceMethod::PreviousOutput);

        let config = args(Some(ReferenceArg::Composite))
            .resolve(ReferenceMethod::PreviousOutput)
            .unwrap();
        assert!(matches!(
            config.reference,
            ReferenceMethod::MarginComposite { margins: None, .. }
        ));
    }
}
