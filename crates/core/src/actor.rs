//! Acting-user identifiers.

use uuid::Uuid;

/// System actor ID as a 128-bit constant.
/// Writes performed by the expiration sweeper are attributed to this user.
pub const SYSTEM_USER_ID_U128: u128 = 0x00000000_0000_0000_0000_000000000001;

/// Get the system actor ID.
pub fn system_user_id() -> Uuid {
    Uuid::from_u128(SYSTEM_USER_ID_U128)
}
