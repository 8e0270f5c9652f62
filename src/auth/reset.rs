use chrono::{DateTime, Duration, FixedOffset};
use rand::{RngCore, rngs::OsRng};

const RESET_TOKEN_BYTES: usize = 32;
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<FixedOffset>,
}

/// 32 bytes from the OS RNG, hex encoded, valid for one hour from `now`.
pub fn issue_reset_token(now: DateTime<FixedOffset>) -> ResetToken {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    ResetToken {
        token: to_hex(&bytes),
        expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    }
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}
