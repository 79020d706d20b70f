//! Generic parsing of key-value formatted cgroup stat files into structured types.
//!
//! # Traits
//!
//! - [`KeyValueStat`]: parses multi-line, key-value formatted stat files such as `cpu.stat`
//!   (`key value` per line) or `io.stat` (a device id followed by `key=value` tokens).
//!
//! # Key Features
//!
//! - Skips leading fields on every line (e.g. the device id in `io.stat`).
//! - Detects duplicate keys where they are not allowed.
//! - Ignores unknown keys, so newer kernels adding fields do not break parsing.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::LazyLock;
//! use cgroup_metrics_validator::cgroup::stats::KeyValueStat;
//!
//! #[derive(Default)]
//! struct Events {
//!     max: u64,
//!     oom: u64,
//! }
//!
//! impl Events {
//!     fn set_max(&mut self, max: u64) {
//!         self.max = max;
//!     }
//!
//!     fn set_oom(&mut self, oom: u64) {
//!         self.oom = oom;
//!     }
//! }
//!
//! static HANDLERS: LazyLock<HashMap<&'static str, fn(&mut Events, u64)>> = LazyLock::new(|| {
//!     let mut map: HashMap<&'static str, fn(&mut Events, u64)> = HashMap::new();
//!     map.insert("max", Events::set_max);
//!     map.insert("oom", Events::set_oom);
//!     map
//! });
//!
//! impl KeyValueStat for Events {
//!     const SPLIT_CHAR: Option<char> = None;
//!     const SKIP_VALUES: usize = 0;
//!     const ALLOW_DUPLICATE_KEYS: bool = false;
//!     const ALLOW_MULTIPLE_KV_PER_LINE: bool = false;
//!
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         &HANDLERS
//!     }
//! }
//!
//! let events = Events::parse("low 0\nhigh 0\nmax 12\noom 1\n").unwrap();
//! assert_eq!(events.max, 12);
//! assert_eq!(events.oom, 1);
//! ```

use std::collections::{HashMap, HashSet};

use super::StatParseError;

/// A trait for parsing structured key-value style `*.stat` files such as `cpu.stat` or
/// `io.stat`.
///
/// Implementors define a set of known keys and how to apply values for them; this trait
/// provides the line-by-line parsing with configurable behavior.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// If set to `Some(char)`, each key-value pair is one token joined by that character,
    /// e.g. `rbytes=123` with `Some('=')`.
    ///
    /// If `None`, keys and values are separate whitespace-delimited tokens.
    const SPLIT_CHAR: Option<char>;

    /// The number of whitespace-separated values to skip at the start of *each line*.
    const SKIP_VALUES: usize;

    /// If `true`, repeated keys are passed to the handler again (e.g. to accumulate).
    /// If `false`, encountering the same key twice is an error.
    const ALLOW_DUPLICATE_KEYS: bool;

    /// If `true`, every key-value pair on a line is consumed, otherwise only the first.
    const ALLOW_MULTIPLE_KV_PER_LINE: bool;

    /// Returns the known field names and the handlers that apply parsed values.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Parses the complete content of a stat file.
    ///
    /// Lines are split on any run of `\r`/`\n`. Unknown keys and incomplete pairs are
    /// ignored; empty content yields `Self::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`StatParseError::InvalidKeyValue`] if a known key has a non-numeric value,
    /// or [`StatParseError::DuplicateField`] if a key repeats while duplicates are disallowed.
    fn parse(content: &str) -> Result<Self, StatParseError> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let field_count = handlers.len();
        let mut seen_keys = HashSet::with_capacity(field_count);

        let lines = content.split(['\r', '\n']).filter(|line| !line.is_empty());
        for (idx, line) in lines.enumerate() {
            let mut parts = line.split_whitespace().skip(Self::SKIP_VALUES);
            match Self::SPLIT_CHAR {
                Some(split_char) => {
                    for part in parts {
                        if let Some((key, val)) = part.split_once(split_char) {
                            Self::parse_and_set(key, val, &mut stat, idx + 1, &mut seen_keys)?;
                        }
                        if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                            break;
                        }
                    }
                }
                None => {
                    while let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                        Self::parse_and_set(key, val, &mut stat, idx + 1, &mut seen_keys)?;
                        if !Self::ALLOW_MULTIPLE_KV_PER_LINE {
                            break;
                        }
                    }
                }
            }

            if !Self::ALLOW_DUPLICATE_KEYS && seen_keys.len() == field_count {
                break;
            }
        }

        Ok(stat)
    }

    /// Parses a single value and applies it through the key's handler.
    ///
    /// Unknown keys are passed to [`KeyValueStat::on_unknown_key`].
    ///
    /// # Errors
    ///
    /// See [`KeyValueStat::parse`].
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        seen_keys: &mut HashSet<&'static str>,
    ) -> Result<(), StatParseError> {
        let Some((k, handler)) = Self::field_handlers().get_key_value(key) else {
            Self::on_unknown_key(key, val, lineno);
            return Ok(());
        };

        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(*k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            });
        }
        handler(stat, parsed);
        Ok(())
    }

    /// Called for keys that have no handler. Ignored by default.
    #[inline]
    fn on_unknown_key(_key: &str, _val: &str, _lineno: usize) {}
}
