//! Account state seen by the executor
//!
//! The [`AccountState`] trait is the only way the executor touches accounts:
//! balance reads and deltas, touches, code writes and snapshots. The
//! persistent database behind it is provided by the embedder.
//! [`MemoryState`] is a journaled in-memory implementation.

use std::collections::{HashMap, HashSet};

use anyhow::{bail, Result};
use fhe_common::{Address, U256};
use log::debug;

/// Signed change applied to a balance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BalanceDelta {
    Credit(U256),
    Debit(U256),
}

/// Checkpoint in the state history
///
/// Move-only: committing or reverting consumes it, so a snapshot can be
/// closed exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct Snapshot(usize);

impl Snapshot {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn id(&self) -> usize {
        self.0
    }
}

pub trait AccountState {
    fn get_balance(&self, address: &Address) -> Result<U256>;

    fn delta_balance(&mut self, address: &Address, delta: BalanceDelta) -> Result<()>;

    /// Mark an account as part of the transaction even if nothing changes
    fn touch_account(&mut self, address: &Address) -> Result<()>;

    fn get_code(&self, address: &Address) -> Result<Vec<u8>>;

    fn set_code(&mut self, address: &Address, code: Vec<u8>) -> Result<()>;

    fn snapshot(&mut self) -> Snapshot;

    /// Keep every change made since the snapshot
    fn commit(&mut self, snapshot: Snapshot) -> Result<()>;

    /// Undo every change made since the snapshot
    fn revert(&mut self, snapshot: Snapshot) -> Result<()>;
}

enum JournalEntry {
    Balance {
        address: Address,
        previous: Option<U256>,
    },
    Code {
        address: Address,
        previous: Option<Vec<u8>>,
    },
    Touch {
        address: Address,
    },
}

#[derive(Default)]
pub struct MemoryState {
    balances: HashMap<Address, U256>,
    codes: HashMap<Address, Vec<u8>>,
    touched: HashSet<Address>,
    journal: Vec<JournalEntry>,
    // journal length at each open snapshot
    checkpoints: Vec<usize>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
        self.balances.insert(address, balance);
        self
    }

    pub fn balance(&self, address: &Address) -> U256 {
        self.balances.get(address).copied().unwrap_or_default()
    }

    pub fn code(&self, address: &Address) -> &[u8] {
        self.codes.get(address).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_touched(&self, address: &Address) -> bool {
        self.touched.contains(address)
    }

    pub fn open_snapshots(&self) -> usize {
        self.checkpoints.len()
    }

    fn checkpoint(&self, snapshot: &Snapshot) -> Result<usize> {
        match self.checkpoints.get(snapshot.id()) {
            Some(position) => Ok(*position),
            None => bail!("Unknown snapshot {}", snapshot.id()),
        }
    }

    // changes made outside any snapshot can never be reverted
    fn record(&mut self, entry: JournalEntry) {
        if !self.checkpoints.is_empty() {
            self.journal.push(entry);
        }
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Balance { address, previous } => match previous {
                Some(balance) => {
                    self.balances.insert(address, balance);
                }
                None => {
                    self.balances.remove(&address);
                }
            },
            JournalEntry::Code { address, previous } => match previous {
                Some(code) => {
                    self.codes.insert(address, code);
                }
                None => {
                    self.codes.remove(&address);
                }
            },
            JournalEntry::Touch { address } => {
                self.touched.remove(&address);
            }
        }
    }
}

impl AccountState for MemoryState {
    fn get_balance(&self, address: &Address) -> Result<U256> {
        Ok(self.balance(address))
    }

    fn delta_balance(&mut self, address: &Address, delta: BalanceDelta) -> Result<()> {
        let previous = self.balances.get(address).copied();
        let current = previous.unwrap_or_default();
        let updated = match delta {
            BalanceDelta::Credit(amount) => match current.checked_add(amount) {
                Some(value) => value,
                None => bail!("Balance overflow for {}", address),
            },
            BalanceDelta::Debit(amount) => match current.checked_sub(amount) {
                Some(value) => value,
                None => bail!("Balance underflow for {}: {} < {}", address, current, amount),
            },
        };

        self.record(JournalEntry::Balance {
            address: *address,
            previous,
        });
        self.balances.insert(*address, updated);
        Ok(())
    }

    fn touch_account(&mut self, address: &Address) -> Result<()> {
        if self.touched.insert(*address) {
            self.record(JournalEntry::Touch { address: *address });
        }
        Ok(())
    }

    fn get_code(&self, address: &Address) -> Result<Vec<u8>> {
        Ok(self.code(address).to_vec())
    }

    fn set_code(&mut self, address: &Address, code: Vec<u8>) -> Result<()> {
        let previous = self.codes.insert(*address, code);
        self.record(JournalEntry::Code {
            address: *address,
            previous,
        });
        Ok(())
    }

    fn snapshot(&mut self) -> Snapshot {
        self.checkpoints.push(self.journal.len());
        Snapshot::new(self.checkpoints.len() - 1)
    }

    fn commit(&mut self, snapshot: Snapshot) -> Result<()> {
        self.checkpoint(&snapshot)?;
        // inner snapshots still open are merged into the committed one
        self.checkpoints.truncate(snapshot.id());
        if self.checkpoints.is_empty() {
            self.journal.clear();
        }
        debug!("Committed snapshot {}", snapshot.id());
        Ok(())
    }

    fn revert(&mut self, snapshot: Snapshot) -> Result<()> {
        let position = self.checkpoint(&snapshot)?;
        while self.journal.len() > position {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.checkpoints.truncate(snapshot.id());
        debug!("Reverted snapshot {}", snapshot.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(byte: u8) -> Address {
        Address::from_bytes_padded(&[byte])
    }

    #[test]
    fn test_revert_restores_balances_and_code() {
        let mut state = MemoryState::new().with_balance(address(1), U256::from(100u64));
        let snapshot = state.snapshot();

        state
            .delta_balance(&address(1), BalanceDelta::Debit(U256::from(40u64)))
            .unwrap();
        state
            .delta_balance(&address(2), BalanceDelta::Credit(U256::from(40u64)))
            .unwrap();
        state.set_code(&address(2), vec![0x60, 0x00]).unwrap();
        state.touch_account(&address(2)).unwrap();

        state.revert(snapshot).unwrap();
        assert_eq!(state.balance(&address(1)), U256::from(100u64));
        assert_eq!(state.balance(&address(2)), U256::zero());
        assert!(state.code(&address(2)).is_empty());
        assert!(!state.is_touched(&address(2)));
        assert_eq!(state.open_snapshots(), 0);
    }

    #[test]
    fn test_nested_snapshots() {
        let mut state = MemoryState::new().with_balance(address(1), U256::from(10u64));
        let outer = state.snapshot();
        state
            .delta_balance(&address(1), BalanceDelta::Credit(U256::from(5u64)))
            .unwrap();

        let inner = state.snapshot();
        state
            .delta_balance(&address(1), BalanceDelta::Credit(U256::from(5u64)))
            .unwrap();
        state.revert(inner).unwrap();
        assert_eq!(state.balance(&address(1)), U256::from(15u64));

        let inner = state.snapshot();
        state
            .delta_balance(&address(1), BalanceDelta::Credit(U256::from(1u64)))
            .unwrap();
        state.commit(inner).unwrap();
        assert_eq!(state.balance(&address(1)), U256::from(16u64));

        // reverting the outer snapshot also undoes the committed inner one
        state.revert(outer).unwrap();
        assert_eq!(state.balance(&address(1)), U256::from(10u64));
    }

    #[test]
    fn test_debit_underflow_is_rejected() {
        let mut state = MemoryState::new().with_balance(address(1), U256::from(10u64));
        assert!(state
            .delta_balance(&address(1), BalanceDelta::Debit(U256::from(11u64)))
            .is_err());
        assert_eq!(state.balance(&address(1)), U256::from(10u64));
    }

    #[test]
    fn test_unknown_snapshot() {
        let mut state = MemoryState::new();
        assert!(state.commit(Snapshot::new(3)).is_err());
        assert!(state.revert(Snapshot::new(0)).is_err());
    }
}
