use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroize;

use crate::error::AuthError;

/// Argon2id パラメータ: t=3, m=64MiB, p=1, salt=16B, key=32B。
/// 保存形式は PHC 文字列 `$argon2id$v=19$m=65536,t=3,p=1$<salt>$<hash>`。
const ARGON2_M_COST: u32 = 64 * 1024;
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 1;
const ARGON2_OUTPUT_LEN: usize = 32;

const MIN_PASSWORD_LENGTH: usize = 12;

/// Password はハッシュ済みパスワードを表す値オブジェクト。
/// 平文はハッシュ化直後にゼロ化され、このオブジェクトには残らない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Password {
    encoded: String,
}

impl Password {
    /// 平文から Argon2id でハッシュ化した Password を生成する。
    /// 12 文字未満の平文は InvalidInput を返す。
    pub fn hash(plaintext: &str) -> Result<Self, AuthError> {
        if plaintext.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::InvalidInput(format!(
                "password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        let mut buf = plaintext.as_bytes().to_vec();
        let salt = SaltString::generate(&mut OsRng);
        let result = hasher()
            .hash_password(&buf, &salt)
            .map(|hash| Self {
                encoded: hash.to_string(),
            })
            .map_err(|e| AuthError::Internal(format!("failed to hash password: {}", e)));
        buf.zeroize();
        result
    }

    /// 保存済みの PHC 文字列から Password を復元する。
    /// argon2id 以外のバリアントや形式不正は InvalidInput を返す。
    pub fn from_hash(encoded: &str) -> Result<Self, AuthError> {
        let parsed = PasswordHash::new(encoded)
            .map_err(|e| AuthError::InvalidInput(format!("invalid password hash format: {}", e)))?;
        if parsed.algorithm != argon2::ARGON2ID_IDENT {
            return Err(AuthError::InvalidInput(format!(
                "invalid password hash format: unsupported variant {}",
                parsed.algorithm
            )));
        }
        Ok(Self {
            encoded: encoded.to_string(),
        })
    }

    /// 平文がこのハッシュと一致するかを検証する。
    /// PHC 文字列に埋め込まれたパラメータで再導出し、定数時間で比較する。
    pub fn verify(&self, plaintext: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(&self.encoded)
            .map_err(|e| AuthError::InvalidInput(format!("invalid password hash format: {}", e)))?;
        match hasher().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::Internal(format!(
                "failed to verify password: {}",
                e
            ))),
        }
    }

    /// PHC エンコード済み文字列を返す。
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

fn hasher() -> Argon2<'static> {
    let params = Params::new(
        ARGON2_M_COST,
        ARGON2_T_COST,
        ARGON2_P_COST,
        Some(ARGON2_OUTPUT_LEN),
    )
    .expect("argon2 parameters are statically valid");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_produces_phc_format() {
        let password = Password::hash("StrongP@ssw0rd!").unwrap();
        let encoded = password.as_str();
        assert!(encoded.starts_with("$argon2id$v=19$m=65536,t=3,p=1$"));
        // $argon2id$v=19$m=...,t=...,p=...$salt$hash で 6 フィールド
        assert_eq!(encoded.split('$').count(), 6);
    }

    #[test]
    fn test_verify_roundtrip() {
        let password = Password::hash("StrongP@ssw0rd!").unwrap();
        assert!(password.verify("StrongP@ssw0rd!").unwrap());
        assert!(!password.verify("WrongP@ssw0rd!").unwrap());
    }

    #[test]
    fn test_same_plaintext_different_salt() {
        let a = Password::hash("StrongP@ssw0rd!").unwrap();
        let b = Password::hash("StrongP@ssw0rd!").unwrap();
        assert_ne!(a.as_str(), b.as_str());
        assert!(a.verify("StrongP@ssw0rd!").unwrap());
        assert!(b.verify("StrongP@ssw0rd!").unwrap());
    }

    #[test]
    fn test_short_password_rejected() {
        let result = Password::hash("short");
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[test]
    fn test_from_hash_roundtrip() {
        let password = Password::hash("StrongP@ssw0rd!").unwrap();
        let restored = Password::from_hash(password.as_str()).unwrap();
        assert!(restored.verify("StrongP@ssw0rd!").unwrap());
    }

    #[test]
    fn test_from_hash_rejects_other_variant() {
        // argon2i は variant が違うため拒否する
        let result = Password::from_hash(
            "$argon2i$v=19$m=65536,t=3,p=1$c29tZXNhbHRzb21lc2E$nJ8MxRn9rGBl0JeIlHIJTV2XT2hhUHFqSHV5WmRQaGM",
        );
        assert!(matches!(result, Err(AuthError::InvalidInput(_))));
    }

    #[test]
    fn test_from_hash_rejects_garbage() {
        assert!(Password::from_hash("not-a-phc-string").is_err());
        assert!(Password::from_hash("$argon2id$broken").is_err());
    }

    #[test]
    fn test_verify_with_embedded_parameters() {
        // 異なる (弱い) パラメータでも PHC に埋め込まれた値で再導出できる
        let params = Params::new(16, 2, 1, Some(32)).unwrap();
        let weak = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let encoded = weak
            .hash_password(b"StrongP@ssw0rd!", &salt)
            .unwrap()
            .to_string();

        let password = Password::from_hash(&encoded).unwrap();
        assert!(password.verify("StrongP@ssw0rd!").unwrap());
        assert!(!password.verify("other-password!").unwrap());
    }
}
