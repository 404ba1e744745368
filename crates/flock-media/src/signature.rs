//! Signed parameters that let a browser upload straight to the CDN
//! without ever seeing the private key.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha1::Sha1;

use crate::MediaClient;
use crate::error::{MediaError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Default validity of a signature, in seconds.
const DEFAULT_TTL: i64 = 30 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadAuth {
    pub token: String,
    pub expire: i64,
    pub signature: String,
}

impl MediaClient {
    /// `signature = hex(HMAC-SHA1(private_key, token + expire))`. A random
    /// token and an expiry 30 minutes out are used when not given.
    pub fn authentication_parameters(
        &self,
        token: Option<&str>,
        expire: Option<i64>,
    ) -> Result<UploadAuth> {
        let token = token
            .map(str::to_string)
            .unwrap_or_else(|| hex::encode(rand::random::<[u8; 16]>()));
        let expire = expire.unwrap_or_else(|| Utc::now().timestamp() + DEFAULT_TTL);

        let mut mac = HmacSha1::new_from_slice(self.config.private_key.as_bytes())
            .map_err(|e| MediaError::InvalidKey(e.to_string()))?;
        mac.update(token.as_bytes());
        mac.update(expire.to_string().as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(UploadAuth {
            token,
            expire,
            signature,
        })
    }
}
