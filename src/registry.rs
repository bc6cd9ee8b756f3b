//! Read-only access to the Windows registry, behind a trait so lookups can be
//! served from memory off Windows.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::errors::Result;

/// Registry roots the resolver may read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    LocalMachine,
}

/// String-valued registry lookup.
pub trait RegistryReader {
    /// Read `value` under `hive\key`; `Ok(None)` when the key or value is absent.
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>>;
}

impl<T: RegistryReader + ?Sized> RegistryReader for Rc<T> {
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>> {
        (**self).read_string(hive, key, value)
    }
}

/// In-memory registry. Key paths compare case-insensitively.
#[derive(Debug, Default)]
pub struct MapRegistry {
    values: HashMap<(Hive, String, String), String>,
    reads: Cell<usize>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, hive: Hive, key: &str, value: &str, data: &str) -> Self {
        self.set(hive, key, value, data);
        self
    }

    pub fn set(&mut self, hive: Hive, key: &str, value: &str, data: &str) {
        self.values
            .insert((hive, fold(key), fold(value)), data.to_string());
    }

    /// Number of lookups served so far.
    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl RegistryReader for MapRegistry {
    fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.values.get(&(hive, fold(key), fold(value))).cloned())
    }
}

fn fold(s: &str) -> String {
    s.trim_matches('\\').to_ascii_lowercase()
}

#[cfg(windows)]
pub use self::windows::SystemRegistry;

#[cfg(windows)]
mod windows {
    use std::io;

    use winreg::enums::{HKEY_LOCAL_MACHINE, KEY_READ};
    use winreg::RegKey;

    use super::{Hive, RegistryReader};
    use crate::errors::{Result, VcvarsError};

    /// The live registry of this machine.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemRegistry;

    impl RegistryReader for SystemRegistry {
        fn read_string(&self, hive: Hive, key: &str, value: &str) -> Result<Option<String>> {
            let root = match hive {
                Hive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
            };
            let subkey = match root.open_subkey_with_flags(key, KEY_READ) {
                Ok(subkey) => subkey,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => {
                    return Err(VcvarsError::LookupError(format!(
                        "cannot open registry key {}: {}",
                        key, e
                    )))
                }
            };
            match subkey.get_value::<String, _>(value) {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(VcvarsError::LookupError(format!(
                    "cannot read registry value {}\\{}: {}",
                    key, value, e
                ))),
            }
        }
    }
}
