/// Account state derived from `userAccountControl`

/// `ACCOUNTDISABLE`
pub const UAC_ACCOUNT_DISABLE: i64 = 0x0000_0002;
/// `LOCKOUT`
pub const UAC_LOCKOUT: i64 = 0x0000_0010;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    Enabled,
    Disabled,
    Locked,
}

impl AccountState {
    /// Evaluate the control flags. Disabled is checked before locked.
    pub fn from_control(value: i64) -> Self {
        if value | UAC_ACCOUNT_DISABLE == value {
            AccountState::Disabled
        } else if value | UAC_LOCKOUT == value {
            AccountState::Locked
        } else {
            AccountState::Enabled
        }
    }

    /// Parse the decoded attribute value (decimal, or hex with a `0x` prefix).
    pub fn parse(value: &str) -> Result<Self, std::num::ParseIntError> {
        let value = value.trim();
        let control = match value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
        {
            Some(hex) => i64::from_str_radix(hex, 16)?,
            None => value.parse::<i64>()?,
        };
        Ok(Self::from_control(control))
    }
}
