//! Request signatures
//!
//! `TC3-HMAC-SHA256` for the v3 API and `HmacSHA256` query signing for the
//! legacy v2 API.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const TC3_ALGORITHM: &str = "TC3-HMAC-SHA256";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host";

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Inputs of a v3 signature
pub struct Tc3Request<'a> {
    pub secret_id: &'a str,
    pub secret_key: &'a str,
    pub service: &'a str,
    pub host: &'a str,
    pub payload: &'a str,
    pub timestamp: i64,
}

/// Build the `Authorization` header value for a v3 POST request
pub fn tc3_authorization(req: &Tc3Request<'_>) -> Result<String, ApiError> {
    let date = DateTime::<Utc>::from_timestamp(req.timestamp, 0)
        .ok_or_else(|| ApiError::Signing(format!("invalid timestamp {}", req.timestamp)))?
        .format("%Y-%m-%d")
        .to_string();

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
        CONTENT_TYPE_JSON,
        req.host,
        SIGNED_HEADERS,
        sha256_hex(req.payload.as_bytes())
    );

    let credential_scope = format!("{}/{}/tc3_request", date, req.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        TC3_ALGORITHM,
        req.timestamp,
        credential_scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let secret_date = hmac_sha256(format!("TC3{}", req.secret_key).as_bytes(), date.as_bytes())?;
    let secret_service = hmac_sha256(&secret_date, req.service.as_bytes())?;
    let secret_signing = hmac_sha256(&secret_service, b"tc3_request")?;
    let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

    Ok(format!(
        "{} Credential={}/{}, SignedHeaders={}, Signature={}",
        TC3_ALGORITHM, req.secret_id, credential_scope, SIGNED_HEADERS, signature
    ))
}

/// Signature of a legacy v2 POST request over already-complete parameters
pub fn legacy_signature(
    secret_key: &str,
    host: &str,
    path: &str,
    params: &BTreeMap<String, String>,
) -> Result<String, ApiError> {
    let query: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    let source = format!("POST{}{}?{}", host, path, query.join("&"));
    let digest = hmac_sha256(secret_key.as_bytes(), source.as_bytes())?;
    Ok(STANDARD.encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tc3_authorization_shape() {
        let auth = tc3_authorization(&Tc3Request {
            secret_id: "AKIDz8krbsJ5yKBZQpn74WFkmLPx3EXAMPLE",
            secret_key: "Gu5t9xGARNpq86cd98joQYCN3EXAMPLE",
            service: "cvm",
            host: "cvm.tencentcloudapi.com",
            payload: r#"{"Limit": 1, "Filters": [{"Values": ["未命名"], "Name": "instance-name"}]}"#,
            timestamp: 1551113065,
        })
        .unwrap();

        assert!(auth.starts_with(
            "TC3-HMAC-SHA256 Credential=AKIDz8krbsJ5yKBZQpn74WFkmLPx3EXAMPLE/2019-02-25/cvm/tc3_request, SignedHeaders=content-type;host, Signature="
        ));
        let signature = auth.rsplit('=').next().unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tc3_signature_depends_on_payload() {
        let base = Tc3Request {
            secret_id: "id",
            secret_key: "key",
            service: "vpc",
            host: "vpc.tencentcloudapi.com",
            payload: "{}",
            timestamp: 1700000000,
        };
        let first = tc3_authorization(&base).unwrap();
        let again = tc3_authorization(&base).unwrap();
        let other = tc3_authorization(&Tc3Request {
            payload: r#"{"VpcIds":["vpc-1"]}"#,
            ..base
        })
        .unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn test_legacy_signature_is_base64_of_sorted_params() {
        let mut params = BTreeMap::new();
        params.insert("Nonce".to_string(), "11886".to_string());
        params.insert("Action".to_string(), "DescribeInstances".to_string());
        params.insert("Timestamp".to_string(), "1465185768".to_string());
        params.insert("SecretId".to_string(), "AKIDz8krbsJ5yKBZQpn74WFkmLPx3gnPhESA".to_string());
        params.insert("Region".to_string(), "ap-guangzhou".to_string());
        params.insert("SignatureMethod".to_string(), "HmacSHA256".to_string());

        let signature = legacy_signature(
            "Gu5t9xGARNpq86cd98joQYCN3Cozk1qA",
            "cvm.api.qcloud.com",
            "/v2/index.php",
            &params,
        )
        .unwrap();

        let decoded = STANDARD.decode(&signature).unwrap();
        assert_eq!(decoded.len(), 32);

        let mut reordered = BTreeMap::new();
        for (k, v) in params.iter().rev() {
            reordered.insert(k.clone(), v.clone());
        }
        let again = legacy_signature(
            "Gu5t9xGARNpq86cd98joQYCN3Cozk1qA",
            "cvm.api.qcloud.com",
            "/v2/index.php",
            &reordered,
        )
        .unwrap();
        assert_eq!(signature, again);
    }
}
