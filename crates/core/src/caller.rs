use crate::id::Address;

/// Identity of whoever invokes a mutating operation.
///
/// A `Caller` is asserted by the execution context (the call boundary that
/// authenticated the request), not parsed from operation arguments. Ledger
/// operations take `&Caller` for the acting identity and plain `Address`
/// values only for lookups.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Caller {
    address: Address,
}

impl Caller {
    /// Bind an identity the boundary has already authenticated.
    pub fn authenticated(address: Address) -> Self {
        Self { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl core::fmt::Display for Caller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.address, f)
    }
}
