// devnet-engine/src/state.rs

use crate::{Amount, EngineError, EngineResult, ErrorCode, GenesisAccount};
use devnet_crypto::Address;
use std::collections::HashMap;

/// Name of the seed account that collects transaction fees
pub const TREASURY_ACCOUNT: &str = "treasury";

/// Account balances plus supply accounting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldState {
    balances: HashMap<Address, Amount>,
    total_supply: Amount,
    treasury: Option<Address>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the initial state from seed accounts
    pub fn from_genesis(accounts: &[GenesisAccount]) -> Self {
        let mut state = Self::new();
        for account in accounts {
            state.mint(&account.address, &account.balance);
            if account.name == TREASURY_ACCOUNT {
                state.treasury = Some(account.address.clone());
            }
        }
        state
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.balances.get(address).cloned().unwrap_or_default()
    }

    pub fn total_supply(&self) -> &Amount {
        &self.total_supply
    }

    pub fn treasury(&self) -> Option<&Address> {
        self.treasury.as_ref()
    }

    fn mint(&mut self, address: &Address, amount: &Amount) {
        self.credit(address, amount);
        self.total_supply = &self.total_supply + amount;
    }

    fn credit(&mut self, address: &Address, amount: &Amount) {
        let entry = self.balances.entry(address.clone()).or_default();
        *entry = &*entry + amount;
    }

    /// Move `value` from `from` to `to` and route `fee` to the treasury.
    ///
    /// Without a treasury account the fee is burned. Fails without touching
    /// any balance when `from` cannot cover `value + fee`.
    pub fn transfer(&mut self, from: &Address, to: &Address, value: &Amount, fee: &Amount) -> EngineResult<()> {
        let required = value + fee;
        let remaining = self.balance(from).checked_sub(&required).ok_or_else(|| {
            EngineError::domain(
                ErrorCode::OutOfBalance,
                format!("Out of balance: balance({}) < value({}) + fee({})", self.balance(from), value, fee),
            )
        })?;

        self.balances.insert(from.clone(), remaining);
        self.credit(to, value);

        if !fee.is_zero() {
            match self.treasury.clone() {
                Some(treasury) => self.credit(&treasury, fee),
                None => {
                    self.total_supply = self.total_supply.checked_sub(fee).unwrap_or_default();
                }
            }
        }
        Ok(())
    }
}
