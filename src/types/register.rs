/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Registers: the key-value units of execution state tracked per block.

use borsh::{BorshDeserialize, BorshSerialize};
use std::fmt::{self, Display, Formatter};

/// Identifies a single register, e.g. a field of an account.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct RegisterID {
    pub owner: Vec<u8>,
    pub key: Vec<u8>,
}

impl RegisterID {
    pub fn new(owner: impl Into<Vec<u8>>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            owner: owner.into(),
            key: key.into(),
        }
    }
}

impl Display for RegisterID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            String::from_utf8_lossy(&self.owner),
            String::from_utf8_lossy(&self.key)
        )
    }
}

pub type RegisterValue = Vec<u8>;

/// A register together with its value, as produced by executing a block.
#[derive(Clone, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct RegisterEntry {
    pub key: RegisterID,
    pub value: RegisterValue,
}

impl RegisterEntry {
    pub fn new(key: RegisterID, value: RegisterValue) -> Self {
        Self { key, value }
    }
}
