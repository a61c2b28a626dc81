//! Secret redaction for log and debug output
//!
//! Wallet private keys pass through configuration structs that are routinely
//! logged with `{:?}`. Wrapping them in [`Redacted`] keeps them out of
//! `Debug`, `Display` and serialized output.

use std::fmt::{self, Debug, Display};

/// Wrapper that formats and serializes as `<redacted>`
///
/// ```ignore
/// use usdt0_router::redact::Redacted;
///
/// let key = Redacted("0xac09...".to_string());
/// tracing::info!(key = %key, "Loaded wallet");
/// // Logs: key = <redacted>
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Access the wrapped secret
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl<T> Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> serde::Serialize for Redacted<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        "<redacted>".serialize(serializer)
    }
}
