//! SHA-256 helpers shared by refresh tokens and upload locking.

use sha2::{Digest, Sha256};

use crate::types::DbId;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Key for `pg_advisory_xact_lock` serializing uploads of one file name by
/// one user into one substep of one engagement.
///
/// Takes the first 8 bytes of the SHA-256 digest as a signed big-endian
/// integer, so equal inputs always map to the same lock.
pub fn upload_lock_key(
    engagement_id: DbId,
    substep_id: DbId,
    user_id: DbId,
    filename: &str,
) -> i64 {
    lock_key(&format!("pf:{engagement_id}:{substep_id}:{user_id}:{filename}"))
}

fn lock_key(raw: &str) -> i64 {
    let hash = Sha256::digest(raw.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash[..8]);
    i64::from_be_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn lock_key_is_stable_per_input() {
        let a = upload_lock_key(1, 2, 3, "report.pdf");
        assert_eq!(a, upload_lock_key(1, 2, 3, "report.pdf"));
        assert_ne!(a, upload_lock_key(1, 2, 4, "report.pdf"));
        assert_ne!(a, upload_lock_key(1, 2, 3, "report2.pdf"));
    }
}
