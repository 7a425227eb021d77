//! Typed operand stack
//!
//! Entries are either plaintext words or encrypted words. Every pop names
//! the kind it expects, so a handler can never silently consume a
//! ciphertext as a plaintext value or the other way around.

use fhe_common::{crypto::EncryptedWord, U256};
use strum::Display;

use crate::VmError;

/// Tag of a stack entry, used as pop type hint
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum EntryKind {
    #[strum(serialize = "word")]
    Word,
    #[strum(serialize = "encrypted word")]
    Encrypted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackEntry {
    Word(U256),
    Encrypted(EncryptedWord),
}

impl StackEntry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Self::Word(_) => EntryKind::Word,
            Self::Encrypted(_) => EntryKind::Encrypted,
        }
    }
}

impl From<U256> for StackEntry {
    fn from(value: U256) -> Self {
        Self::Word(value)
    }
}

impl From<EncryptedWord> for StackEntry {
    fn from(value: EncryptedWord) -> Self {
        Self::Encrypted(value)
    }
}

#[derive(Debug, Default)]
pub struct Stack {
    values: Vec<StackEntry>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, entry: impl Into<StackEntry>) {
        self.values.push(entry.into());
    }

    pub fn push_word(&mut self, value: U256) {
        self.push(value);
    }

    pub fn push_encrypted(&mut self, value: EncryptedWord) {
        self.push(value);
    }

    /// Kind of the top entry, if any
    pub fn peek_kind(&self) -> Option<EntryKind> {
        self.values.last().map(StackEntry::kind)
    }

    /// Pop `n` entries of the `expected` kind, top of the stack first
    ///
    /// The stack is left untouched when the pop fails.
    pub fn pop(&mut self, n: usize, expected: EntryKind) -> Result<Vec<StackEntry>, VmError> {
        let available = self.values.len();
        if available < n {
            return Err(VmError::StackUnderflow {
                needed: n,
                available,
            });
        }

        if let Some(entry) = self.values[available - n..]
            .iter()
            .find(|entry| entry.kind() != expected)
        {
            return Err(VmError::TypeMismatch {
                expected,
                actual: entry.kind(),
            });
        }

        let mut popped = self.values.split_off(available - n);
        popped.reverse();
        Ok(popped)
    }

    /// Pop `N` plaintext words, top of the stack first
    pub fn pop_words<const N: usize>(&mut self) -> Result<[U256; N], VmError> {
        let mut words = [U256::zero(); N];
        for (slot, entry) in words.iter_mut().zip(self.pop(N, EntryKind::Word)?) {
            if let StackEntry::Word(value) = entry {
                *slot = value;
            }
        }
        Ok(words)
    }

    pub fn pop_word(&mut self) -> Result<U256, VmError> {
        let [value] = self.pop_words::<1>()?;
        Ok(value)
    }

    pub fn pop_encrypted(&mut self) -> Result<EncryptedWord, VmError> {
        match self.pop(1, EntryKind::Encrypted)?.pop() {
            Some(StackEntry::Encrypted(value)) => Ok(value),
            Some(other) => Err(VmError::TypeMismatch {
                expected: EntryKind::Encrypted,
                actual: other.kind(),
            }),
            None => Err(VmError::StackUnderflow {
                needed: 1,
                available: 0,
            }),
        }
    }
}
