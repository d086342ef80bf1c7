// Hand-crafted async HTTP client for the cloud firewall OpenAPI.
//
// Every call is `POST {endpoint}/?Action={Name}&Version={API_VERSION}`
// with a JSON body. Responses come wrapped in the
// `{ResponseMetadata, Result}` envelope; errors may arrive with HTTP 200
// inside `ResponseMetadata.Error`.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{
    self, API_VERSION, AddAddressBookRequest, AddAddressBookResponse, AddControlPolicyRequest,
    AddControlPolicyResponse, AddressBookPage, ControlPolicyPage, DeleteAddressBookRequest,
    DeleteControlPolicyRequest, DescribeAddressBookRequest, DescribeControlPolicyRequest, Empty,
    Envelope, ModifyAddressBookRequest,
};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-Api-Key";

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the firewall address-book and control-policy API.
pub struct FirewallClient {
    http: reqwest::Client,
    base_url: Url,
    region: String,
}

impl FirewallClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects the API key as a sensitive default header on every request.
    pub fn from_api_key(
        endpoint: &str,
        region: &str,
        api_key: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        Self::from_reqwest(endpoint, region, http)
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(endpoint: &str, region: &str, http: reqwest::Client) -> Result<Self, Error> {
        let mut base_url = Url::parse(endpoint)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            region: region.to_owned(),
        })
    }

    /// The endpoint this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The region sent with every action.
    pub fn region(&self) -> &str {
        &self.region
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn action_url(&self, action: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("Action", action)
            .append_pair("Version", API_VERSION)
            .append_pair("Region", &self.region);
        url
    }

    // ── Request / envelope handling ──────────────────────────────────

    /// POST an action and unwrap the envelope. `Result` may be absent.
    async fn call<B, T>(&self, action: &str, body: &B) -> Result<Option<T>, Error>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.action_url(action);
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        Self::parse_envelope(action, resp).await
    }

    /// POST an action whose envelope must carry a `Result`.
    async fn call_required<B, T>(&self, action: &str, body: &B) -> Result<T, Error>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.call(action, body).await?.ok_or_else(|| Error::Deserialization {
            message: format!("{action}: response has no Result"),
            body: String::new(),
        })
    }

    async fn parse_envelope<T: DeserializeOwned>(
        action: &str,
        resp: reqwest::Response,
    ) -> Result<Option<T>, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(1);
            return Err(Error::RateLimited { retry_after_secs });
        }

        let body = resp.text().await?;
        trace!(action, body = %preview(&body), "response body");

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(Error::Api {
                    message: if body.is_empty() {
                        status.to_string()
                    } else {
                        preview(&body).to_owned()
                    },
                    code: None,
                    status: status.as_u16(),
                    request_id: None,
                });
            }
            Err(e) => {
                return Err(Error::Deserialization {
                    message: format!("{e} (body preview: {:?})", preview(&body)),
                    body,
                });
            }
        };

        let meta = envelope.response_metadata;
        if let Some(err) = meta.error {
            return Err(Error::Api {
                message: err.message.unwrap_or_else(|| status.to_string()),
                code: err.code,
                status: status.as_u16(),
                request_id: meta.request_id,
            });
        }

        if !status.is_success() {
            return Err(Error::Api {
                message: status.to_string(),
                code: None,
                status: status.as_u16(),
                request_id: meta.request_id,
            });
        }

        Ok(envelope.result)
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Collect all pages into a single `Vec<T>`.
    ///
    /// `fetch` receives a 1-based page number and the page size, and
    /// returns the page items plus the server's total count. A total of
    /// zero is treated as unknown, so paging stops on a short page.
    pub async fn paginate_all<T, F, Fut>(page_size: u32, fetch: F) -> Result<Vec<T>, Error>
    where
        F: Fn(u32, u32) -> Fut,
        Fut: Future<Output = Result<(Vec<T>, u64), Error>>,
    {
        let mut all = Vec::new();
        let mut page_number: u32 = 1;

        loop {
            let (items, total_count) = fetch(page_number, page_size).await?;
            let received = items.len();
            all.extend(items);

            let page_size_usize = usize::try_from(page_size).unwrap_or(0);
            if received == 0
                || received < page_size_usize
                || (total_count > 0 && u64::try_from(all.len()).unwrap_or(u64::MAX) >= total_count)
            {
                break;
            }

            page_number += 1;
        }

        Ok(all)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Address books ────────────────────────────────────────────────

    pub async fn describe_address_book(
        &self,
        query: Option<&str>,
        group_type: Option<&str>,
        page_number: u32,
        page_size: u32,
    ) -> Result<AddressBookPage, Error> {
        let req = DescribeAddressBookRequest {
            query,
            group_type,
            page_number,
            page_size,
        };
        Ok(self
            .call("DescribeAddressBook", &req)
            .await?
            .unwrap_or(AddressBookPage {
                data: Vec::new(),
                total_count: 0,
                page_number,
                page_size,
            }))
    }

    pub async fn add_address_book(
        &self,
        group_name: &str,
        group_type: &str,
        description: &str,
        address_list: &[String],
    ) -> Result<AddAddressBookResponse, Error> {
        let req = AddAddressBookRequest {
            group_name,
            group_type,
            description,
            address_list,
        };
        self.call_required("AddAddressBook", &req).await
    }

    pub async fn modify_address_book(
        &self,
        group_uuid: &str,
        group_name: &str,
        description: &str,
        address_list: &[String],
    ) -> Result<(), Error> {
        let req = ModifyAddressBookRequest {
            group_uuid,
            group_name,
            description,
            address_list,
        };
        self.call::<_, Empty>("ModifyAddressBook", &req).await?;
        Ok(())
    }

    pub async fn delete_address_book(&self, group_uuid: &str) -> Result<(), Error> {
        let req = DeleteAddressBookRequest { group_uuid };
        self.call::<_, Empty>("DeleteAddressBook", &req).await?;
        Ok(())
    }

    // ── Control policies ─────────────────────────────────────────────

    pub async fn describe_control_policy(
        &self,
        direction: &str,
        description: Option<&str>,
        page_number: u32,
        page_size: u32,
    ) -> Result<ControlPolicyPage, Error> {
        let req = DescribeControlPolicyRequest {
            direction,
            description,
            page_number,
            page_size,
        };
        Ok(self
            .call("DescribeControlPolicy", &req)
            .await?
            .unwrap_or(ControlPolicyPage {
                data: Vec::new(),
                total_count: 0,
            }))
    }

    /// Every control policy in `direction`, optionally filtered by description.
    pub async fn list_control_policies(
        &self,
        direction: &str,
        description: Option<&str>,
        page_size: u32,
    ) -> Result<Vec<types::ControlPolicy>, Error> {
        Self::paginate_all(page_size, |page, size| async move {
            let page = self
                .describe_control_policy(direction, description, page, size)
                .await?;
            Ok((page.data, page.total_count))
        })
        .await
    }

    pub async fn add_control_policy(
        &self,
        req: &AddControlPolicyRequest<'_>,
    ) -> Result<AddControlPolicyResponse, Error> {
        self.call_required("AddControlPolicy", req).await
    }

    pub async fn delete_control_policy(&self, rule_id: &str, direction: &str) -> Result<(), Error> {
        let req = DeleteControlPolicyRequest { rule_id, direction };
        self.call::<_, Empty>("DeleteControlPolicy", &req).await?;
        Ok(())
    }
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
