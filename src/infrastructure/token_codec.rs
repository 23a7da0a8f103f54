use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::token::TokenPair;
use crate::error::AuthError;

/// Claims は JWT のクレーム。
/// アクセストークンは sub/roles/iat/exp、リフレッシュトークンは
/// sub/iat/exp/jti を持つ。jti は発行時に必ず UUID を採番する。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

/// JwtTokenCodec は RS256 での JWT 発行・検証を行う。
/// RSA 鍵は起動時に PEM から読み込まれ、以後不変。ロックは持たない。
pub struct JwtTokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

impl JwtTokenCodec {
    /// PEM 文字列から生成する。
    /// 秘密鍵は PKCS#1 (`RSA PRIVATE KEY`) / PKCS#8 (`PRIVATE KEY`)、
    /// 公開鍵は PKIX (`PUBLIC KEY`) を受け付ける。RSA 以外の鍵は拒否する。
    pub fn from_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|e| anyhow::anyhow!("failed to parse RSA private key: {}", e))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|e| anyhow::anyhow!("failed to parse RSA public key: {}", e))?;
        Ok(Self {
            encoding_key,
            decoding_key,
            access_ttl,
            refresh_ttl,
        })
    }

    /// 鍵ファイルを読み込んで生成する。
    pub fn from_key_files(
        private_key_path: &str,
        public_key_path: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let private_pem = std::fs::read(private_key_path)
            .map_err(|e| anyhow::anyhow!("failed to read private key {}: {}", private_key_path, e))?;
        let public_pem = std::fs::read(public_key_path)
            .map_err(|e| anyhow::anyhow!("failed to read public key {}: {}", public_key_path, e))?;
        Self::from_pem(&private_pem, &public_pem, access_ttl, refresh_ttl)
    }

    /// アクセス/リフレッシュのトークンペアを発行する。
    /// リフレッシュトークンには UUID の jti を必ず付与する。
    pub fn issue_pair(&self, user_id: &str, roles: &[String]) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let iat = now.timestamp();
        let access_exp = iat + self.access_ttl.as_secs() as i64;
        let refresh_exp = iat + self.refresh_ttl.as_secs() as i64;

        let access_claims = Claims {
            sub: user_id.to_string(),
            roles: roles.to_vec(),
            iat,
            exp: access_exp,
            jti: None,
        };
        let refresh_claims = Claims {
            sub: user_id.to_string(),
            roles: Vec::new(),
            iat,
            exp: refresh_exp,
            jti: Some(Uuid::new_v4().to_string()),
        };

        let header = Header::new(Algorithm::RS256);
        let access_token = encode(&header, &access_claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign access token: {}", e)))?;
        let refresh_token = encode(&header, &refresh_claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("failed to sign refresh token: {}", e)))?;

        let expires_at = Utc
            .timestamp_opt(access_exp, 0)
            .single()
            .ok_or_else(|| AuthError::Internal("invalid access expiry timestamp".to_string()))?;
        TokenPair::new(&access_token, &refresh_token, expires_at)
    }

    /// トークンを検証して Claims を返す。
    /// RS256 以外の署名方式と期限切れは InvalidToken。
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AuthError::InvalidToken("token expired".to_string())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        Ok(data.claims)
    }

    /// ブラックリスト登録用にトークン識別子・exp・sub を取り出す。
    /// jti を持たないトークンはトークン文字列そのものを識別子とする。
    pub fn extract_blacklist_identity(
        &self,
        token: &str,
    ) -> Result<(String, DateTime<Utc>, String), AuthError> {
        let claims = self.verify(token)?;
        let token_id = claims.jti.clone().unwrap_or_else(|| token.to_string());
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| AuthError::InvalidToken("invalid exp claim".to_string()))?;
        Ok((token_id, expires_at, claims.sub))
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/test_rsa_private.pem");
    const TEST_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/test_rsa_public.pem");
    const TEST_EC_PRIVATE_PEM: &str = include_str!("../../tests/fixtures/test_ec_private.pem");
    const TEST_EC_PUBLIC_PEM: &str = include_str!("../../tests/fixtures/test_ec_public.pem");

    fn make_codec() -> JwtTokenCodec {
        JwtTokenCodec::from_pem(
            TEST_PRIVATE_PEM.as_bytes(),
            TEST_PUBLIC_PEM.as_bytes(),
            DEFAULT_ACCESS_TTL,
            DEFAULT_REFRESH_TTL,
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify_roundtrip() {
        let codec = make_codec();
        let pair = codec
            .issue_pair("user-uuid-1", &["USER".to_string(), "STREAMER".to_string()])
            .unwrap();

        let access = codec.verify(&pair.access_token).unwrap();
        assert_eq!(access.sub, "user-uuid-1");
        assert_eq!(access.roles, vec!["USER", "STREAMER"]);
        assert!(access.jti.is_none());
        assert_eq!(access.exp - access.iat, 15 * 60);

        let refresh = codec.verify(&pair.refresh_token).unwrap();
        assert_eq!(refresh.sub, "user-uuid-1");
        assert!(refresh.roles.is_empty());
        assert!(refresh.jti.is_some());
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    }

    #[test]
    fn test_refresh_jti_unique_per_issue() {
        let codec = make_codec();
        let a = codec.issue_pair("user-1", &[]).unwrap();
        let b = codec.issue_pair("user-1", &[]).unwrap();
        let jti_a = codec.verify(&a.refresh_token).unwrap().jti.unwrap();
        let jti_b = codec.verify(&b.refresh_token).unwrap().jti.unwrap();
        assert_ne!(jti_a, jti_b);
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = JwtTokenCodec::from_pem(
            TEST_PRIVATE_PEM.as_bytes(),
            TEST_PUBLIC_PEM.as_bytes(),
            Duration::from_secs(0),
            DEFAULT_REFRESH_TTL,
        )
        .unwrap();
        // access_ttl=0 なので発行直後から期限切れ
        let pair = codec.issue_pair("user-1", &[]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let result = codec.verify(&pair.access_token);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = make_codec();
        let pair = codec.issue_pair("user-1", &[]).unwrap();
        let mut tampered = pair.access_token.clone();
        tampered.truncate(tampered.len() - 4);
        tampered.push_str("AAAA");
        assert!(codec.verify(&tampered).is_err());
    }

    #[test]
    fn test_non_rsa_signed_token_rejected() {
        // ES256 で署名されたトークンは署名方式検証で拒否される
        let ec_encoding = EncodingKey::from_ec_pem(TEST_EC_PRIVATE_PEM.as_bytes()).unwrap();
        let claims = Claims {
            sub: "user-1".to_string(),
            roles: vec![],
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 900,
            jti: None,
        };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &ec_encoding).unwrap();

        let codec = make_codec();
        let result = codec.verify(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_non_rsa_key_rejected_at_load() {
        let result = JwtTokenCodec::from_pem(
            TEST_EC_PRIVATE_PEM.as_bytes(),
            TEST_EC_PUBLIC_PEM.as_bytes(),
            DEFAULT_ACCESS_TTL,
            DEFAULT_REFRESH_TTL,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_blacklist_identity_prefers_jti() {
        let codec = make_codec();
        let pair = codec.issue_pair("user-1", &[]).unwrap();

        let (token_id, expires_at, sub) = codec
            .extract_blacklist_identity(&pair.refresh_token)
            .unwrap();
        let jti = codec.verify(&pair.refresh_token).unwrap().jti.unwrap();
        assert_eq!(token_id, jti);
        assert_eq!(sub, "user-1");
        assert!(expires_at > Utc::now());

        // アクセストークンは jti を持たないのでトークン文字列そのもの
        let (token_id, _, _) = codec
            .extract_blacklist_identity(&pair.access_token)
            .unwrap();
        assert_eq!(token_id, pair.access_token);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let codec = make_codec();
        assert!(codec.verify("not-a-jwt").is_err());
        assert!(codec.verify("").is_err());
    }
}
