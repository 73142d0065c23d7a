//! Access to the hosting SharePoint site.
//!
//! The component never talks to the network directly. It is handed a
//! [`SiteHttp`] capability (a `reqwest` client in production, a canned map
//! in tests) and goes through [`SiteClient`] for the few REST calls it makes.

use crate::error::{Result, ScoreError};
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// Accept header for SharePoint JSON without OData envelopes.
pub const JSON_ACCEPT: &str = "application/json;odata=nometadata";
pub const BINARY_ACCEPT: &str = "application/octet-stream";

/// Raw response of a GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        HttpResponse {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The byte-fetching capability the host provides.
pub trait SiteHttp: Send + Sync + 'static {
    fn get(&self, url: &str, accept: &str) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// Production [`SiteHttp`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
    bearer_token: Option<String>,
}

impl ReqwestHttp {
    pub fn new(bearer_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(ReqwestHttp {
            client,
            bearer_token,
        })
    }
}

impl SiteHttp for ReqwestHttp {
    async fn get(&self, url: &str, accept: &str) -> Result<HttpResponse> {
        let mut request = self.client.get(url).header(reqwest::header::ACCEPT, accept);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

/// `/_api/web/currentuser`
#[derive(Debug, Clone, Deserialize)]
pub struct SpUser {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "LoginName", default)]
    pub login_name: String,
    #[serde(rename = "IsSiteAdmin", default)]
    pub is_site_admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpGroup {
    #[serde(rename = "Title", default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ValueList<T> {
    value: Vec<T>,
}

/// `/_api/web/effectiveBasePermissions`. OData serialises the Int64 halves
/// as strings, older farms as numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct BasePermissions {
    #[serde(rename = "High")]
    pub high: serde_json::Value,
    #[serde(rename = "Low")]
    pub low: serde_json::Value,
}

impl BasePermissions {
    pub fn halves(&self) -> Result<(u32, u32)> {
        Ok((lenient_u32(&self.high)?, lenient_u32(&self.low)?))
    }
}

fn lenient_u32(value: &serde_json::Value) -> Result<u32> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ScoreError::Network(format!("unexpected permission value {}", value)))
}

/// List item behind the hosting page.
#[derive(Debug, Clone, Deserialize)]
pub struct PageItem {
    #[serde(rename = "Id")]
    pub id: Option<i64>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
}

/// Typed REST calls against one site.
pub struct SiteClient<H> {
    http: H,
    site_url: String,
}

impl<H: SiteHttp> SiteClient<H> {
    pub fn new(http: H, site_url: &str) -> Self {
        SiteClient {
            http,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}/_api/{}", self.site_url, path.trim_start_matches('/'))
    }

    /// GET a URL and fail on any non-2xx status.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url, BINARY_ACCEPT).await?;
        if !response.is_success() {
            return Err(ScoreError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(response.body)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.get(url, JSON_ACCEPT).await?;
        if !response.is_success() {
            return Err(ScoreError::Http {
                status: response.status,
                url: url.to_string(),
            });
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub async fn current_user(&self) -> Result<SpUser> {
        self.get_json(&self.api_url("web/currentuser")).await
    }

    pub async fn current_user_groups(&self) -> Result<Vec<SpGroup>> {
        let list: ValueList<SpGroup> = self
            .get_json(&self.api_url("web/currentuser/groups"))
            .await?;
        Ok(list.value)
    }

    pub async fn effective_permissions(&self) -> Result<BasePermissions> {
        self.get_json(&self.api_url("web/effectiveBasePermissions"))
            .await
    }

    pub async fn page_item(&self, page_url: &str) -> Result<PageItem> {
        let url = self.api_url(&format!(
            "web/GetFileByServerRelativeUrl('{}')/ListItemAllFields?$select=Id,Title",
            quote_odata(page_url)
        ));
        self.get_json(&url).await
    }
}

/// Quote a value for use inside an OData string literal in a URL.
pub fn quote_odata(value: &str) -> String {
    urlencoding::encode(&value.replace('\'', "''")).into_owned()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned responses keyed by exact URL; anything else is a 404.
    #[derive(Default)]
    pub struct MockHttp {
        responses: HashMap<String, HttpResponse>,
        pub calls: Mutex<Vec<String>>,
    }

    impl MockHttp {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, url: &str, response: HttpResponse) -> Self {
            self.responses.insert(url.to_string(), response);
            self
        }

        pub fn with_json(self, url: &str, json: serde_json::Value) -> Self {
            self.with(url, HttpResponse::ok(json.to_string()))
        }
    }

    impl SiteHttp for MockHttp {
        async fn get(&self, url: &str, _accept: &str) -> Result<HttpResponse> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(url.to_string());
            }
            Ok(self.responses.get(url).cloned().unwrap_or(HttpResponse {
                status: 404,
                body: Vec::new(),
            }))
        }
    }
}
