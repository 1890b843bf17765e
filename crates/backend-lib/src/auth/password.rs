// ============================
// crates/backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are PHC strings (`$scrypt$ln=..,r=..,p=..$salt$hash`), so the cost
//! a hash was created with travels with it and verification needs no extra
//! parameters.
use scrypt::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Params, Scrypt,
};
use zeroize::Zeroize;

/// Default cost factor (log2 of the scrypt CPU/memory parameter N)
pub const DEFAULT_PASSWORD_COST: u8 = 15;

/// Lowest accepted cost factor
pub const MIN_PASSWORD_COST: u8 = 10;

/// Highest accepted cost factor
pub const MAX_PASSWORD_COST: u8 = 20;

const BLOCK_SIZE: u32 = 8;
const PARALLELISM: u32 = 1;
const OUTPUT_LEN: usize = 32;

fn params_for(cost: u8) -> anyhow::Result<Params> {
    if !(MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(&cost) {
        anyhow::bail!(
            "password cost {cost} outside {MIN_PASSWORD_COST}..={MAX_PASSWORD_COST}"
        );
    }
    Params::new(cost, BLOCK_SIZE, PARALLELISM, OUTPUT_LEN)
        .map_err(|e| anyhow::anyhow!("invalid scrypt parameters for cost {cost}: {e}"))
}

/// Hash a password using scrypt with a fresh random salt
pub fn hash_password(plain: &str, cost: u8) -> anyhow::Result<String> {
    let params = params_for(cost)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Scrypt
        .hash_password_customized(plain.as_bytes(), None, None, params, &salt)?
        .to_string();
    Ok(hash)
}

/// Verify a password against a hash.
///
/// The digest comparison inside `PasswordVerifier` is constant-time. A
/// malformed hash never verifies.
pub fn verify_password(hash: &str, plain: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Scrypt.verify_password(plain.as_bytes(), &parsed_hash).is_ok()
}

/// Hash a password, then zeroize the plaintext buffer
pub fn hash_password_secure(plain: &mut String, cost: u8) -> anyhow::Result<String> {
    let hash = hash_password(plain, cost);
    plain.zeroize();
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("1234", MIN_PASSWORD_COST).unwrap();

        assert_ne!(hash, "1234");
        assert!(hash.starts_with("$scrypt$"));
        assert!(verify_password(&hash, "1234"));
        assert!(!verify_password(&hash, "wrong"));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("1234", MIN_PASSWORD_COST).unwrap();
        let second = hash_password("1234", MIN_PASSWORD_COST).unwrap();
        assert_ne!(first, second);
        assert!(verify_password(&second, "1234"));
    }

    #[test]
    fn test_cost_is_recorded_in_hash() {
        let hash = hash_password("1234", 11).unwrap();
        assert!(hash.contains("ln=11"), "unexpected hash format: {hash}");
    }

    #[test]
    fn test_cost_out_of_range_is_rejected() {
        assert!(hash_password("1234", MIN_PASSWORD_COST - 1).is_err());
        assert!(hash_password("1234", MAX_PASSWORD_COST + 1).is_err());
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "1234"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn test_hash_password_secure_zeroizes_input() {
        let mut plain = String::from("1234");
        let hash = hash_password_secure(&mut plain, MIN_PASSWORD_COST).unwrap();
        assert!(plain.is_empty());
        assert!(verify_password(&hash, "1234"));
    }
}
