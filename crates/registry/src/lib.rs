//! Asset registry abstraction and the in-memory reference registry.

pub mod memory;

use nftswap_core::{AssetId, Holder, RegistryResult, Transfer};

pub use memory::InMemoryRegistry;

/// Ownership and single-delegate approval store the escrow engine reads and
/// settles against.
///
/// Calls are synchronous. `operator` is the identity performing a transfer;
/// it must be the current owner or the asset's approved delegate.
pub trait AssetRegistry: Send + Sync {
    fn owner_of(&self, asset: AssetId) -> RegistryResult<Holder>;

    fn approved_delegate_of(&self, asset: AssetId) -> RegistryResult<Option<Holder>>;

    fn transfer(
        &self,
        operator: Holder,
        asset: AssetId,
        from: Holder,
        to: Holder,
    ) -> RegistryResult<()>;

    /// Applies every transfer or none of them.
    ///
    /// All legs are checked, in order and against the effects of earlier
    /// legs, before the first one is applied.
    fn transfer_all(&self, operator: Holder, transfers: &[Transfer]) -> RegistryResult<()>;
}
