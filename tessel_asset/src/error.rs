use crate::AssetId;
use snafu::Snafu;
use std::error::Error;
use std::sync::Arc;

/// Error type loaders may return. Anything convertible into it is accepted.
pub type BoxedError = Box<dyn Error + Send + Sync>;

/// Outcome of a load, shared by every requester that was waiting for it.
#[derive(Debug, Clone, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum LoadError {
    #[snafu(display("Loader for asset {asset} failed: {reason}"))]
    Loader {
        asset: AssetId,
        reason: Arc<dyn Error + Send + Sync>,
    },

    #[snafu(display("Loader for asset {asset} panicked: {message}"))]
    Panicked { asset: AssetId, message: String },

    #[snafu(display("Couldn't start a loader thread for asset {asset}: {message}"))]
    Spawn { asset: AssetId, message: String },

    #[snafu(display("Request for asset {asset} was abandoned before a result was delivered"))]
    Abandoned { asset: AssetId },
}

impl LoadError {
    pub fn asset(&self) -> AssetId {
        match self {
            LoadError::Loader { asset, .. }
            | LoadError::Panicked { asset, .. }
            | LoadError::Spawn { asset, .. }
            | LoadError::Abandoned { asset } => *asset,
        }
    }
}
