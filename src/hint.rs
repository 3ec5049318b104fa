//! Recovery hint policy.

use crate::error::HintError;

/// Minimum hint length in UTF-16 code units.
pub const MIN_HINT_LEN: usize = 2;
/// Maximum hint length in UTF-16 code units.
pub const MAX_HINT_LEN: usize = 12;

/// Checks `hint` against the passphrase it will be stored next to.
///
/// Rules run in order and the first failure wins: shorter than
/// [`MIN_HINT_LEN`], longer than [`MAX_HINT_LEN`], then overlapping the
/// passphrase: either string containing the other as a case-sensitive
/// substring. Length counts UTF-16 code units, so a character outside
/// the Basic Multilingual Plane counts twice.
pub fn validate_hint(new_passphrase: &str, hint: &str) -> Result<(), HintError> {
    let len = hint.encode_utf16().count();

    if len < MIN_HINT_LEN {
        return Err(HintError::TooShort);
    }
    if len > MAX_HINT_LEN {
        return Err(HintError::TooLong);
    }
    if hint.contains(new_passphrase) || new_passphrase.contains(hint) {
        return Err(HintError::ContainsPassphrase);
    }

    Ok(())
}
