use crate::error::AuthError;

/// Email は検証済みのメールアドレスを表す値オブジェクト。
/// 構築時に形式検証と小文字への正規化を行うため、不正なインスタンスは存在しない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    address: String,
}

const MAX_EMAIL_LENGTH: usize = 255;

impl Email {
    /// 新しい Email を生成する。形式不正・255 文字超は InvalidInput を返す。
    pub fn new(address: &str) -> Result<Self, AuthError> {
        if address.is_empty() {
            return Err(AuthError::InvalidInput("email is required".to_string()));
        }
        if address.len() > MAX_EMAIL_LENGTH {
            return Err(AuthError::InvalidInput(format!(
                "email must be at most {} characters",
                MAX_EMAIL_LENGTH
            )));
        }
        if !is_valid_address(address) {
            return Err(AuthError::InvalidInput(format!(
                "invalid email format: {}",
                address
            )));
        }

        Ok(Self {
            address: address.to_lowercase(),
        })
    }

    /// 正規化済みアドレスを返す。
    pub fn address(&self) -> &str {
        &self.address
    }

    /// `@` より後ろのドメイン部を返す。
    pub fn domain(&self) -> &str {
        self.address.split_once('@').map(|(_, d)| d).unwrap_or("")
    }

    /// `@` より前のローカル部を返す。
    pub fn local_part(&self) -> &str {
        self.address.split_once('@').map(|(l, _)| l).unwrap_or("")
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// RFC 5322 相当の簡易形式チェック。local@domain で、ドメインにドットを要求する。
fn is_valid_address(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.starts_with('-') {
        return false;
    }
    if !domain.contains('.') {
        return false;
    }
    if address.contains(char::is_whitespace) || address.matches('@').count() != 1 {
        return false;
    }
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c))
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
