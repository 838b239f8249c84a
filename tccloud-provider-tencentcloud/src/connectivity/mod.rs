//! Signed HTTP transport for the Tencent Cloud APIs
//!
//! - `call` - typed v3 API (`TC3-HMAC-SHA256`, `{"Response": ...}` envelope)
//! - `send_request` - legacy v2 API returning the raw JSON body

pub mod ratelimit;
pub mod sign;

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ProviderConfig;
use crate::error::ApiError;
use ratelimit::RateLimiter;
use sign::{CONTENT_TYPE_JSON, Tc3Request, legacy_signature, tc3_authorization};

const LEGACY_PATH: &str = "/v2/index.php";

static PASSWORD_FIELD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#""(\w*Password)"\s*:\s*"[^"]*""#).ok());

/// Hide password fields before a request body is logged
pub(crate) fn redact_payload(payload: &str) -> String {
    match PASSWORD_FIELD.as_ref() {
        Some(re) => re.replace_all(payload, r#""$1":"***""#).into_owned(),
        None => payload.to_string(),
    }
}

/// Client shared by every service of the provider
pub struct TencentCloudClient {
    http: reqwest::Client,
    config: ProviderConfig,
    limiter: RateLimiter,
}

impl TencentCloudClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            config,
            limiter: RateLimiter::default(),
        })
    }

    /// Host and URL of a v3 request
    fn api_target(&self, service: &str) -> (String, String) {
        match &self.config.endpoint {
            Some(endpoint) => (host_of(endpoint), format!("{}/", endpoint)),
            None => {
                let host = self.config.api_host(service);
                let url = format!("{}://{}/", self.config.protocol.scheme(), host);
                (host, url)
            }
        }
    }

    /// Host and URL of a legacy request
    fn legacy_target(&self, service: &str) -> (String, String) {
        match &self.config.endpoint {
            Some(endpoint) => (host_of(endpoint), format!("{}{}", endpoint, LEGACY_PATH)),
            None => {
                let host = self.config.legacy_host(service);
                let url = format!("{}://{}{}", self.config.protocol.scheme(), host, LEGACY_PATH);
                (host, url)
            }
        }
    }

    /// Call a v3 API action and decode the payload inside `Response`
    pub async fn call<Req, Resp>(
        &self,
        service: &str,
        version: &str,
        action: &str,
        request: &Req,
    ) -> Result<Resp, ApiError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let log_id = uuid::Uuid::new_v4();
        let payload = serde_json::to_string(request).map_err(|source| ApiError::Decode {
            action: action.to_string(),
            source,
        })?;

        self.limiter.check(action).await;

        let result = self.post_v3(service, version, action, &payload).await;
        match result {
            Ok(body) => match decode_response::<Resp>(action, &body) {
                Ok(resp) => {
                    log::debug!(
                        "[{}] api[{}] success, request body [{}], response body [{}]",
                        log_id,
                        action,
                        redact_payload(&payload),
                        body
                    );
                    Ok(resp)
                }
                Err(e) => {
                    log::error!("[{}] api[{}] fail, reason[{}]", log_id, action, e);
                    Err(e)
                }
            },
            Err(e) => {
                log::error!("[{}] api[{}] fail, reason[{}]", log_id, action, e);
                Err(e)
            }
        }
    }

    async fn post_v3(
        &self,
        service: &str,
        version: &str,
        action: &str,
        payload: &str,
    ) -> Result<String, ApiError> {
        let (host, url) = self.api_target(service);
        let timestamp = Utc::now().timestamp();
        let authorization = tc3_authorization(&Tc3Request {
            secret_id: &self.config.secret_id,
            secret_key: &self.config.secret_key,
            service,
            host: &host,
            payload,
            timestamp,
        })?;

        let mut request = self
            .http
            .post(&url)
            .header("Authorization", authorization)
            .header("Content-Type", CONTENT_TYPE_JSON)
            .header("X-TC-Action", action)
            .header("X-TC-Version", version)
            .header("X-TC-Region", &self.config.region)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Language", "en-US")
            .body(payload.to_string());
        if let Some(token) = &self.config.security_token {
            request = request.header("X-TC-Token", token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() && serde_json::from_str::<serde_json::Value>(&body).is_err() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Call a legacy v2 action.
    ///
    /// `params` must carry `Action`; the common parameters and the signature
    /// are added here. Returns the raw response body, which callers check
    /// with [`decode_legacy`].
    pub async fn send_request(
        &self,
        service: &str,
        params: BTreeMap<String, String>,
    ) -> Result<String, ApiError> {
        let log_id = uuid::Uuid::new_v4();
        let action = params
            .get("Action")
            .cloned()
            .ok_or_else(|| ApiError::InvalidRequest("legacy request without Action".to_string()))?;

        self.limiter.check(&action).await;

        let (host, url) = self.legacy_target(service);
        let mut signed = params.clone();
        let now = Utc::now();
        signed
            .entry("Region".to_string())
            .or_insert_with(|| self.config.region.clone());
        signed.insert("Timestamp".to_string(), now.timestamp().to_string());
        signed.insert("Nonce".to_string(), nonce().to_string());
        signed.insert("SecretId".to_string(), self.config.secret_id.clone());
        signed.insert("SignatureMethod".to_string(), "HmacSHA256".to_string());
        if let Some(token) = &self.config.security_token {
            signed.insert("Token".to_string(), token.clone());
        }
        let signature = legacy_signature(&self.config.secret_key, &host, LEGACY_PATH, &signed)?;
        signed.insert("Signature".to_string(), signature);

        let form: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(signed.iter())
            .finish();

        let result = async {
            let response = self
                .http
                .post(&url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(form)
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(ApiError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        }
        .await;

        match result {
            Ok(body) => {
                log::debug!(
                    "[{}] api[{}] success, request body [{:?}], response body [{}]",
                    log_id,
                    action,
                    params,
                    body
                );
                Ok(body)
            }
            Err(e) => {
                log::error!("[{}] api[{}] fail, reason[{}]", log_id, action, e);
                Err(e)
            }
        }
    }
}

fn host_of(endpoint: &str) -> String {
    match url::Url::parse(endpoint) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => endpoint.to_string(),
        },
        Err(_) => endpoint.to_string(),
    }
}

fn nonce() -> u32 {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Decode a v3 body: surface `Response.Error`, otherwise deserialize `Response`
pub fn decode_response<T: DeserializeOwned>(action: &str, body: &str) -> Result<T, ApiError> {
    let envelope: serde_json::Value =
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            action: action.to_string(),
            source,
        })?;

    let response = envelope
        .get("Response")
        .filter(|r| r.is_object())
        .ok_or_else(|| ApiError::EmptyResponse(action.to_string()))?;

    if let Some(error) = response.get("Error") {
        return Err(vendor_error(error, response.get("RequestId")));
    }

    serde_json::from_value(response.clone()).map_err(|source| ApiError::Decode {
        action: action.to_string(),
        source,
    })
}

fn vendor_error(error: &serde_json::Value, request_id: Option<&serde_json::Value>) -> ApiError {
    let field = |v: Option<&serde_json::Value>| {
        v.and_then(|v| v.as_str()).unwrap_or_default().to_string()
    };
    ApiError::vendor(
        field(error.get("Code")),
        field(error.get("Message")),
        field(request_id),
    )
}

/// Check a legacy body for the `{code, message, codeDesc}` error envelope.
///
/// Bodies in the v3 `{Response: {Error}}` shape are accepted as well.
pub fn decode_legacy(action: &str, body: &str) -> Result<serde_json::Value, ApiError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| ApiError::Decode {
            action: action.to_string(),
            source,
        })?;

    if let Some(response) = value.get("Response")
        && let Some(error) = response.get("Error")
    {
        return Err(vendor_error(error, response.get("RequestId")));
    }

    let code = match value.get("code") {
        Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(-1),
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(-1),
        Some(_) => -1,
        None => 0,
    };
    if code != 0 {
        let message = value
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        let code_desc = value
            .get("codeDesc")
            .and_then(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .map(String::from)
            .unwrap_or_else(|| code.to_string());
        return Err(ApiError::vendor(code_desc, message, ""));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct CreateVpcResponse {
        vpc: VpcId,
        request_id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct VpcId {
        vpc_id: String,
    }

    #[test]
    fn test_decode_response_payload() {
        let body = json!({"Response": {"Vpc": {"VpcId": "vpc-1"}, "RequestId": "r-1"}}).to_string();
        let resp: CreateVpcResponse = decode_response("CreateVpc", &body).unwrap();
        assert_eq!(resp.vpc.vpc_id, "vpc-1");
        assert_eq!(resp.request_id, "r-1");
    }

    #[test]
    fn test_decode_response_vendor_error() {
        let body = json!({"Response": {
            "Error": {"Code": "InvalidParameterValue.Malformed", "Message": "bad cidr"},
            "RequestId": "r-2"
        }})
        .to_string();
        let err = decode_response::<CreateVpcResponse>("CreateVpc", &body).unwrap_err();
        match err {
            ApiError::Vendor { code, message, request_id } => {
                assert_eq!(code, "InvalidParameterValue.Malformed");
                assert_eq!(message, "bad cidr");
                assert_eq!(request_id, "r-2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_response_empty_and_garbage() {
        assert!(matches!(
            decode_response::<CreateVpcResponse>("CreateVpc", "{}"),
            Err(ApiError::EmptyResponse(_))
        ));
        assert!(matches!(
            decode_response::<CreateVpcResponse>("CreateVpc", "<html>"),
            Err(ApiError::Decode { .. })
        ));
    }

    #[test]
    fn test_decode_legacy_error_envelope() {
        let body = json!({"code": 4000, "message": "route exists", "codeDesc": "InvalidRoute.Exist"})
            .to_string();
        let err = decode_legacy("CreateRoute", &body).unwrap_err();
        assert_eq!(err.code(), Some("InvalidRoute.Exist"));

        let body = json!({"code": 5100, "message": "internal"}).to_string();
        assert_eq!(decode_legacy("CreateRoute", &body).unwrap_err().code(), Some("5100"));
    }

    #[test]
    fn test_decode_legacy_success_and_v3_error() {
        let body = json!({"code": 0, "message": "", "data": [{"routeTableId": "rtb-1"}]}).to_string();
        let value = decode_legacy("DescribeRouteTable", &body).unwrap();
        assert_eq!(value["data"][0]["routeTableId"], "rtb-1");

        let body = json!({"Response": {"Error": {"Code": "AuthFailure", "Message": "no"}, "RequestId": "r"}})
            .to_string();
        assert_eq!(decode_legacy("DescribeInstanceTypeConfigs", &body).unwrap_err().code(), Some("AuthFailure"));
    }

    #[test]
    fn test_redact_payload() {
        let payload = r#"{"ClusterName":"app","Password":"s3cret","OldPassword": "old"}"#;
        let redacted = redact_payload(payload);
        assert!(!redacted.contains("s3cret"));
        assert!(!redacted.contains("old\""));
        assert!(redacted.contains(r#""ClusterName":"app""#));
    }

    #[test]
    fn test_host_of_endpoint() {
        assert_eq!(host_of("http://127.0.0.1:8080"), "127.0.0.1:8080");
        assert_eq!(host_of("https://vpc.tencentcloudapi.com"), "vpc.tencentcloudapi.com");
    }
}
