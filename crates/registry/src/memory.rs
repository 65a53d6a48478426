//! In-memory registry with sequential minting.
//!
//! Follows the usual non-fungible token rules: one owner per asset, at most
//! one approved delegate, and any transfer clears the delegate.

use crate::AssetRegistry;
use alloy_primitives::{Address, U256};
use nftswap_core::{AssetId, Holder, RegistryError, RegistryResult, Transfer};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    owner: Holder,
    approved: Option<Holder>,
}

#[derive(Debug, Default)]
struct Ledger {
    tokens: HashMap<AssetId, Token>,
    next_id: u64,
}

impl Ledger {
    fn token(&self, asset: AssetId) -> RegistryResult<Token> {
        self.tokens
            .get(&asset)
            .copied()
            .ok_or(RegistryError::AssetNotFound(asset))
    }
}

/// Thread-safe registry backed by a `HashMap` behind one `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    ledger: RwLock<Ledger>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints the next asset id (0, 1, 2, ...) to `to`.
    pub fn mint(&self, to: Holder) -> AssetId {
        let mut ledger = self.write();
        let asset = U256::from(ledger.next_id);
        ledger.next_id += 1;
        ledger.tokens.insert(
            asset,
            Token {
                owner: to,
                approved: None,
            },
        );
        tracing::debug!(%asset, owner = %to, "minted");
        asset
    }

    /// Sets (`Some`) or clears (`None`) the delegate for `asset`.
    /// Only the current owner may do this.
    pub fn approve(
        &self,
        caller: Holder,
        asset: AssetId,
        delegate: Option<Holder>,
    ) -> RegistryResult<()> {
        let mut ledger = self.write();
        let token = ledger.token(asset)?;
        if token.owner != caller {
            return Err(RegistryError::denied(asset, "caller is not the owner"));
        }
        if let Some(t) = ledger.tokens.get_mut(&asset) {
            t.approved = delegate;
        }
        tracing::debug!(%asset, owner = %caller, ?delegate, "approval set");
        Ok(())
    }

    pub fn balance_of(&self, holder: Holder) -> usize {
        self.read()
            .tokens
            .values()
            .filter(|t| t.owner == holder)
            .count()
    }

    /// Assets currently owned by `holder`, ascending.
    pub fn assets_of(&self, holder: Holder) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self
            .read()
            .tokens
            .iter()
            .filter(|(_, t)| t.owner == holder)
            .map(|(id, _)| *id)
            .collect();
        assets.sort_unstable();
        assets
    }

    /// Number of assets ever minted.
    pub fn total_supply(&self) -> u64 {
        self.read().next_id
    }

    fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Ledger> {
        self.ledger.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Checks one leg against `token` and returns the token as it would be after.
fn check_leg(operator: Holder, token: Token, leg: &Transfer) -> RegistryResult<Token> {
    if leg.to == Address::ZERO {
        return Err(RegistryError::denied(leg.asset, "transfer to the zero address"));
    }
    if token.owner != leg.from {
        return Err(RegistryError::denied(leg.asset, "from is not the owner"));
    }
    if operator != token.owner && token.approved != Some(operator) {
        return Err(RegistryError::denied(leg.asset, "operator is not approved"));
    }
    Ok(Token {
        owner: leg.to,
        approved: None,
    })
}

impl AssetRegistry for InMemoryRegistry {
    fn owner_of(&self, asset: AssetId) -> RegistryResult<Holder> {
        Ok(self.read().token(asset)?.owner)
    }

    fn approved_delegate_of(&self, asset: AssetId) -> RegistryResult<Option<Holder>> {
        Ok(self.read().token(asset)?.approved)
    }

    fn transfer(
        &self,
        operator: Holder,
        asset: AssetId,
        from: Holder,
        to: Holder,
    ) -> RegistryResult<()> {
        self.transfer_all(operator, &[Transfer { asset, from, to }])
    }

    fn transfer_all(&self, operator: Holder, transfers: &[Transfer]) -> RegistryResult<()> {
        let mut ledger = self.write();

        // Stage every leg first; later legs see earlier staged effects.
        let mut staged: Vec<(AssetId, Token)> = Vec::with_capacity(transfers.len());
        for leg in transfers {
            let current = match staged.iter().rev().find(|(id, _)| *id == leg.asset) {
                Some((_, t)) => *t,
                None => ledger.token(leg.asset)?,
            };
            let next = check_leg(operator, current, leg).inspect_err(|e| {
                tracing::debug!(asset = %leg.asset, %operator, error = %e, "transfer rejected");
            })?;
            staged.push((leg.asset, next));
        }

        for (asset, token) in staged {
            ledger.tokens.insert(asset, token);
        }
        for leg in transfers {
            tracing::debug!(asset = %leg.asset, from = %leg.from, to = %leg.to, %operator, "transferred");
        }
        Ok(())
    }
}
