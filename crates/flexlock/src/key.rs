// SPDX-License-Identifier: LGPL-2.1-or-later
//
// This file is part of FlexLock.
//
// FlexLock is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// FlexLock is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with FlexLock. If not, see <https://www.gnu.org/licenses/>.

//! Lock keys and their store-native representation.

use std::fmt;
use std::hash::Hash;

/// Store-native representation of a lock key.
///
/// Backends dispatch on the variant when binding the key into the store's
/// primary-key column. The registry computes this once per key entry and
/// caches it, so the dispatch decision is not re-derived on every backend
/// call.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyValue {
    /// Whole-number keys (bound as a 64-bit integer)
    Integer(i64),
    /// Decimal keys (bound as a double)
    Decimal(f64),
    /// Textual keys, and the fallback rendering for everything else
    Text(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Integer(v) => write!(f, "{v}"),
            KeyValue::Decimal(v) => write!(f, "{v}"),
            KeyValue::Text(v) => f.write_str(v),
        }
    }
}

/// A value usable as a lock key.
///
/// Any type reducible to a stable textual or numeric form can be a key:
/// implement [`to_key_value`](LockKey::to_key_value) to pick the store
/// representation. Implementations are provided for the common shapes.
pub trait LockKey: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// The store-native representation of this key.
    fn to_key_value(&self) -> KeyValue;
}

impl LockKey for i32 {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Integer(*self as i64)
    }
}

impl LockKey for i64 {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Integer(*self)
    }
}

impl LockKey for u32 {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Integer(*self as i64)
    }
}

impl LockKey for String {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Text(self.clone())
    }
}

impl LockKey for &'static str {
    fn to_key_value(&self) -> KeyValue {
        KeyValue::Text((*self).to_string())
    }
}
