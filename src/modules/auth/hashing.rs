use pbkdf2::pbkdf2;
use rand::Rng;

use crate::HmacSha256;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Default iteration count for stored password hashes
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Password hashing collaborator
pub trait PasswordHasher: Send + Sync {
    /// Produce a self-describing, salted hash of `plaintext`
    fn hash(&self, plaintext: &str) -> String;

    /// Check `plaintext` against a value produced by [`PasswordHasher::hash`].
    /// Malformed hashes never verify.
    fn verify(&self, plaintext: &str, encoded: &str) -> bool;
}

/// Salted PBKDF2-HMAC-SHA256 with a fixed iteration count.
/// Encoded as `pbkdf2-sha256$<iterations>$<salt hex>$<key hex>`.
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

/// Function to generate a random salt for PBKDF2
pub fn generate_random_salt() -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..SALT_LEN).map(|_| rng.gen()).collect()
}

/// Function to derive a 32-byte key from the password using PBKDF2
fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LEN];
    pbkdf2::<HmacSha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = generate_random_salt();
        let key = derive_key(plaintext, &salt, self.iterations);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            hex::encode(&salt),
            hex::encode(&key)
        )
    }

    fn verify(&self, plaintext: &str, encoded: &str) -> bool {
        let parts: Vec<&str> = encoded.split('$').collect();
        if parts.len() != 4 || parts[0] != SCHEME {
            return false;
        }
        // The stored iteration count wins so older hashes keep verifying
        let iterations = match parts[1].parse::<u32>() {
            Ok(n) if n > 0 => n,
            _ => return false,
        };
        let (salt, expected) = match (hex::decode(parts[2]), hex::decode(parts[3])) {
            (Ok(salt), Ok(expected)) => (salt, expected),
            _ => return false,
        };
        constant_time_eq(&derive_key(plaintext, &salt, iterations), &expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Pbkdf2Hasher::new(1_000);
        let encoded = hasher.hash("MySecurePassword123!");

        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("MySecurePassword123!", &encoded));
        assert!(!hasher.verify("DifferentPassword456!", &encoded));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = Pbkdf2Hasher::new(1_000);
        let first = hasher.hash("SamePassword1!");
        let second = hasher.hash("SamePassword1!");
        assert_ne!(first, second);
        assert!(hasher.verify("SamePassword1!", &second));
    }

    #[test]
    fn test_stored_iterations_are_honoured() {
        let old = Pbkdf2Hasher::new(500).hash("Password123!");
        assert!(Pbkdf2Hasher::new(2_000).verify("Password123!", &old));
    }

    #[test]
    fn test_malformed_hashes_never_verify() {
        let hasher = Pbkdf2Hasher::new(1_000);
        assert!(!hasher.verify("x", ""));
        assert!(!hasher.verify("x", "plain-text"));
        assert!(!hasher.verify("x", "pbkdf2-sha256$0$00$00"));
        assert!(!hasher.verify("x", "pbkdf2-sha256$10$zz$00"));
        assert!(!hasher.verify("x", "bcrypt$10$00$00"));
    }

    #[test]
    fn test_random_salt() {
        let salt1 = generate_random_salt();
        let salt2 = generate_random_salt();
        assert_eq!(salt1.len(), 16);
        assert_ne!(salt1, salt2);
    }
}
