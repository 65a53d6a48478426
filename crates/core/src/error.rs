//! Centralized error types for the nftswap workspace.

use crate::types::{AssetId, Holder, TradeId};
use thiserror::Error;

/// Rejection of a single engine operation.
///
/// Every variant is caller-visible and leaves engine and registry state
/// exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SwapError {
    #[error("holder does not own asset {0}")]
    NotOwner(AssetId),

    #[error("escrow is not approved for asset {0}")]
    NotApproved(AssetId),

    /// Unknown id and closed trade are reported the same way.
    #[error("trade {0} is not open")]
    NotFound(TradeId),

    #[error("{caller} is not authorized to act on trade {id}")]
    Unauthorized { id: TradeId, caller: Holder },

    #[error("transfer failed: {0}")]
    Transfer(#[from] RegistryError),
}

pub type SwapResult<T> = Result<T, SwapError>;

/// Failures surfaced by an asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RegistryError {
    #[error("asset {0} does not exist")]
    AssetNotFound(AssetId),

    #[error("transfer of asset {asset} denied: {reason}")]
    TransferDenied { asset: AssetId, reason: String },
}

impl RegistryError {
    pub fn denied(asset: AssetId, reason: impl Into<String>) -> Self {
        Self::TransferDenied {
            asset,
            reason: reason.into(),
        }
    }

    /// The asset the failure refers to.
    pub fn asset(&self) -> AssetId {
        match self {
            Self::AssetNotFound(asset) | Self::TransferDenied { asset, .. } => *asset,
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, U256};

    #[test]
    fn messages_name_the_asset_and_trade() {
        assert_eq!(
            SwapError::NotOwner(U256::from(7)).to_string(),
            "holder does not own asset 7"
        );
        assert_eq!(SwapError::NotFound(3).to_string(), "trade 3 is not open");

        let err = SwapError::Unauthorized {
            id: 1,
            caller: Address::ZERO,
        };
        assert!(err.to_string().contains("trade 1"));
    }

    #[test]
    fn registry_error_converts_into_transfer_failure() {
        let inner = RegistryError::denied(U256::from(2), "operator not approved");
        assert_eq!(inner.asset(), U256::from(2));

        let err: SwapError = inner.clone().into();
        assert_eq!(err, SwapError::Transfer(inner));
    }
}
