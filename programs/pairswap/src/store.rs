//! Keyed account storage with staged, all-or-nothing writes.
//!
//! Every instruction runs against a [`Changeset`]: reads fall through to the
//! committed store, writes stay in the changeset. The store only changes
//! when a changeset is committed, so an aborted instruction leaves no trace.

use std::collections::BTreeMap;

use solana_program::pubkey::Pubkey;

/// Raw account: owning program plus opaque data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAccount {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

impl StoredAccount {
    pub fn new(owner: Pubkey, data: Vec<u8>) -> Self {
        Self { owner, data }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccountStore {
    accounts: BTreeMap<Pubkey, StoredAccount>,
}

impl AccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &Pubkey) -> Option<&StoredAccount> {
        self.accounts.get(key)
    }

    pub fn contains(&self, key: &Pubkey) -> bool {
        self.accounts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn begin(&self) -> Changeset<'_> {
        Changeset {
            base: self,
            writes: BTreeMap::new(),
        }
    }

    pub fn commit(&mut self, writes: WriteSet) {
        self.accounts.extend(writes.0);
    }
}

/// Writes detached from their changeset, ready to be committed.
#[derive(Debug, Default)]
pub struct WriteSet(BTreeMap<Pubkey, StoredAccount>);

impl WriteSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct Changeset<'a> {
    base: &'a AccountStore,
    writes: BTreeMap<Pubkey, StoredAccount>,
}

impl<'a> Changeset<'a> {
    pub fn get(&self, key: &Pubkey) -> Option<&StoredAccount> {
        self.writes.get(key).or_else(|| self.base.get(key))
    }

    pub fn exists(&self, key: &Pubkey) -> bool {
        self.get(key).is_some()
    }

    pub fn put(&mut self, key: Pubkey, account: StoredAccount) {
        self.writes.insert(key, account);
    }

    pub fn into_writes(self) -> WriteSet {
        WriteSet(self.writes)
    }
}
