use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_APODIZATION_FRACTION, DEFAULT_KERNEL_SIZES, DEFAULT_MARGIN};
use crate::frame::IndexConvention;
use crate::rolling::EdgePolicy;

fn default_kernel_sizes() -> Vec<usize> {
    DEFAULT_KERNEL_SIZES.to_vec()
}

fn default_apodization() -> f64 {
    DEFAULT_APODIZATION_FRACTION
}

/// Settings for a registration run (`destretch`, `offsets`, `apply`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DestretchConfig {
    /// Subframe sizes, coarse to fine.
    #[serde(default = "default_kernel_sizes")]
    pub kernel_sizes: Vec<usize>,
    #[serde(default)]
    pub index_convention: IndexConvention,
    /// Subtract each frame's mean before registration.
    #[serde(default)]
    pub zero_mean: bool,
    #[serde(default)]
    pub reference: ReferenceMethod,
    /// Fraction of each subframe edge covered by the cosine taper.
    #[serde(default = "default_apodization")]
    pub apodization: f64,
}

impl Default for DestretchConfig {
    fn default() -> Self {
        Self {
            kernel_sizes: default_kernel_sizes(),
            index_convention: IndexConvention::default(),
            zero_mean: false,
            reference: ReferenceMethod::default(),
            apodization: DEFAULT_APODIZATION_FRACTION,
        }
    }
}

impl DestretchConfig {
    /// The last, finest kernel size.
    pub fn finest_kernel(&self) -> Option<usize> {
        self.kernel_sizes.last().copied()
    }
}

/// Where each frame's reference comes from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum ReferenceMethod {
    /// The corrected output of the previous frame; the first frame is its
    /// own reference.
    #[default]
    PreviousOutput,
    /// Per-pixel median of a neighbourhood of raw frames. Without margins
    /// the neighbourhood is the whole sequence.
    MarginComposite {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        margins: Option<[i64; 2]>,
        #[serde(default)]
        edge_policy: EdgePolicy,
    },
}

impl std::fmt::Display for ReferenceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreviousOutput => write!(f, "Previous Output"),
            Self::MarginComposite { margins: None, .. } => {
                write!(f, "Margin Composite (whole sequence)")
            }
            Self::MarginComposite {
                margins: Some([left, right]),
                edge_policy,
            } => write!(f, "Margin Composite ({left}, {right}, {edge_policy})"),
        }
    }
}

/// Settings for `rolling_aggregate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollingConfig {
    pub margin_left: i64,
    pub margin_right: i64,
    #[serde(default)]
    pub edge_policy: EdgePolicy,
    #[serde(default)]
    pub index_convention: IndexConvention,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            margin_left: DEFAULT_MARGIN,
            margin_right: DEFAULT_MARGIN,
            edge_policy: EdgePolicy::default(),
            index_convention: IndexConvention::default(),
        }
    }
}

impl std::fmt::Display for RollingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "-{} / +{} ({})",
            self.margin_left, self.margin_right, self.edge_policy
        )
    }
}

/// Everything the CLI can read from a `--config` file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub destretch: DestretchConfig,
    #[serde(default)]
    pub rolling: RollingConfig,
}
