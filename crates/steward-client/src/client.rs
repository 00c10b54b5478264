//! The live HTTP client and its conditional-write capsule.

use reqwest::header::{CONTENT_TYPE, ETAG, IF_MATCH, IF_NONE_MATCH};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::trace;
use url::Url;

use steward_types::User;

use crate::error::{ClientError, ClientResult};

/// Header carrying the acting user's name for audit attribution.
const USER_NAME_HEADER: &str = "Sous-User-Name";
/// Header carrying the acting user's email for audit attribution.
const USER_EMAIL_HEADER: &str = "Sous-User-Email";

/// Opaque capsule captured by a read and required by a conditional write.
///
/// Holds the resource's ETag plus two snapshots of the body: the raw JSON as
/// the server sent it, and the re-encoding of the value the caller parsed
/// out of it. Conditional writes use the pair to put back fields the
/// caller's type did not model. Never constructed by callers, only threaded
/// from a read into the following write; each capture is good for one
/// logical read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct ResourceState {
    etag: String,
    body: Value,
    resource: Value,
}

impl ResourceState {
    /// The version token the resource was read under.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Decode the parsed-body snapshot captured at read time.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.resource.clone())
    }
}

/// A client for a server speaking the conditional-write protocol.
///
/// Handles basic CRUD on opaque JSON resources. Reads capture a
/// [`ResourceState`]; creates require the resource to be absent
/// (`If-None-Match: *`); updates and deletes require it to be unchanged
/// (`If-Match`). A precondition failure on update or delete classifies as
/// retryable; everything else does not.
pub struct HttpClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    /// Create a client for the server at `base_url`.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = Url::parse(base_url).map_err(|source| ClientError::Url {
            url: base_url.to_string(),
            source,
        })?;

        // Transparent compression can rewrite ETags in flight; disable it so
        // version tokens round-trip unmodified.
        let client = reqwest::Client::builder()
            .no_gzip()
            .build()
            .map_err(|source| ClientError::Build { source })?;

        Ok(Self { client, base_url })
    }

    /// GET `path` and decode the JSON response.
    pub async fn retrieve<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        user: &User,
    ) -> ClientResult<T>
    where
        T: DeserializeOwned + Serialize,
    {
        let (body, _) = self.retrieve_with_state(path, query, user).await?;
        Ok(body)
    }

    /// GET `path`, decode the JSON response, and capture the
    /// [`ResourceState`] needed for a later conditional write.
    pub async fn retrieve_with_state<T>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        user: &User,
    ) -> ClientResult<(T, ResourceState)>
    where
        T: DeserializeOwned + Serialize,
    {
        let url = self.build_url(path, query)?;
        let request = self.with_user(self.client.get(url), user);
        let (status, etag, raw) = self.execute("GET", path, request).await?;
        status_error("GET", path, status, &raw, false)?;

        let body: Value =
            serde_json::from_slice(&raw).map_err(|source| decode_err("GET", path, source))?;
        let parsed: T =
            serde_json::from_value(body.clone()).map_err(|source| decode_err("GET", path, source))?;
        let resource =
            serde_json::to_value(&parsed).map_err(|source| encode_err("GET", path, source))?;

        Ok((
            parsed,
            ResourceState {
                etag,
                body,
                resource,
            },
        ))
    }

    /// Create a new resource at `path` from `body`.
    ///
    /// Issues a PUT with `If-None-Match: *`. A resource that already exists
    /// is rejected by the server, and the rejection is a plain error: a
    /// duplicate create reflects a logic error, not a transient race.
    pub async fn create<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: &B,
        user: &User,
    ) -> ClientResult<()> {
        let url = self.build_url(path, query)?;
        let payload =
            serde_json::to_vec(body).map_err(|source| encode_err("PUT", path, source))?;
        trace_body("sending", "PUT", &url, &payload);

        let request = self.with_user(
            self.client
                .put(url)
                .header(IF_NONE_MATCH, "*")
                .header(CONTENT_TYPE, "application/json")
                .body(payload),
            user,
        );
        let (status, _, raw) = self.execute("PUT", path, request).await?;
        status_error("PUT", path, status, &raw, false)
    }

    /// Conditionally replace the resource at `path` with `body`.
    ///
    /// Issues a PUT with `If-Match` set to the ETag captured in `from`, so
    /// the server rejects the write if the resource changed since that read.
    /// Such a rejection is retryable: re-read, recompute, retry. Fields
    /// present in the resource at read time but unmodeled by the caller's
    /// type are put back into the outgoing body rather than stripped.
    pub async fn update<B: Serialize>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        from: &ResourceState,
        body: &B,
        user: &User,
    ) -> ClientResult<()> {
        let url = self.build_url(path, query)?;
        let updated =
            serde_json::to_value(body).map_err(|source| encode_err("PUT", path, source))?;
        let merged = putback_json(&from.body, &from.resource, updated);
        let payload =
            serde_json::to_vec(&merged).map_err(|source| encode_err("PUT", path, source))?;
        trace_body("sending", "PUT", &url, &payload);

        let request = self.with_user(
            self.client
                .put(url)
                .header(IF_MATCH, from.etag.as_str())
                .header(CONTENT_TYPE, "application/json")
                .body(payload),
            user,
        );
        let (status, _, raw) = self.execute("PUT", path, request).await?;
        status_error("PUT", path, status, &raw, true)
    }

    /// Conditionally remove the resource at `path`.
    ///
    /// Same precondition discipline as [`HttpClient::update`], with no body.
    pub async fn delete(
        &self,
        path: &str,
        query: &[(&str, &str)],
        from: &ResourceState,
        user: &User,
    ) -> ClientResult<()> {
        let url = self.build_url(path, query)?;
        let request = self.with_user(
            self.client.delete(url).header(IF_MATCH, from.etag.as_str()),
            user,
        );
        let (status, _, raw) = self.execute("DELETE", path, request).await?;
        status_error("DELETE", path, status, &raw, true)
    }

    fn build_url(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<Url> {
        let mut url = self.base_url.join(path).map_err(|source| ClientError::Url {
            url: format!("{}{}", self.base_url, path),
            source,
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    fn with_user(&self, request: reqwest::RequestBuilder, user: &User) -> reqwest::RequestBuilder {
        request
            .header(USER_NAME_HEADER, user.name.as_str())
            .header(USER_EMAIL_HEADER, user.email.as_str())
    }

    async fn execute(
        &self,
        method: &'static str,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> ClientResult<(StatusCode, String, Vec<u8>)> {
        let response = request
            .send()
            .await
            .map_err(|source| transport_err(method, path, source))?;

        let status = response.status();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let url = response.url().clone();
        let raw = response
            .bytes()
            .await
            .map_err(|source| transport_err(method, path, source))?
            .to_vec();
        trace_body("received", method, &url, &raw);

        Ok((status, etag, raw))
    }
}

fn transport_err(method: &str, path: &str, source: reqwest::Error) -> ClientError {
    ClientError::Transport {
        method: method.to_string(),
        path: path.to_string(),
        source,
    }
}

fn decode_err(method: &str, path: &str, source: serde_json::Error) -> ClientError {
    ClientError::Decode {
        method: method.to_string(),
        path: path.to_string(),
        source,
    }
}

fn encode_err(method: &str, path: &str, source: serde_json::Error) -> ClientError {
    ClientError::Encode {
        method: method.to_string(),
        path: path.to_string(),
        source,
    }
}

/// Classify a response status.
///
/// 2xx passes. 409 is a retryable conflict only where the operation's
/// precondition makes retrying meaningful, that is, an update or delete
/// racing a concurrent writer. On create, 409 means the resource already
/// exists, which a retry cannot fix.
fn status_error(
    method: &str,
    path: &str,
    status: StatusCode,
    raw: &[u8],
    conflict_is_retryable: bool,
) -> ClientResult<()> {
    if status.is_success() {
        return Ok(());
    }
    let message = String::from_utf8_lossy(raw).into_owned();
    if status == StatusCode::CONFLICT && conflict_is_retryable {
        return Err(ClientError::Conflict {
            method: method.to_string(),
            path: path.to_string(),
            message,
        });
    }
    Err(ClientError::Api {
        method: method.to_string(),
        path: path.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// Reapply fields present in the resource as read but absent from the
/// caller's typed view, so a conditional write does not strip data written
/// by other tools.
///
/// `original` is the raw body as the server sent it, `snapshot` the
/// re-encoding of what the caller parsed, and `updated` the caller's new
/// value. A key the snapshot had but `updated` dropped was deleted
/// deliberately; a key only the original had was invisible to the caller
/// and is preserved.
fn putback_json(original: &Value, snapshot: &Value, updated: Value) -> Value {
    match (original, snapshot, updated) {
        (Value::Object(original), Value::Object(snapshot), Value::Object(updated)) => {
            let mut merged = original.clone();
            for key in snapshot.keys() {
                if !updated.contains_key(key) {
                    merged.remove(key);
                }
            }
            for (key, value) in updated {
                let value = match (original.get(&key), snapshot.get(&key)) {
                    (Some(orig), Some(snap)) => putback_json(orig, snap, value),
                    _ => value,
                };
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        (_, _, updated) => updated,
    }
}

/// Mirror a request or response body to the trace log, compacted. A pure
/// tee: failures to render never affect control flow.
fn trace_body(direction: &'static str, method: &str, url: &Url, body: &[u8]) {
    if body.is_empty() {
        trace!(method, %url, direction, "<empty body>");
        return;
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => trace!(method, %url, direction, body = %value, "http body"),
        Err(_) => trace!(
            method,
            %url,
            direction,
            body = %String::from_utf8_lossy(body),
            "http body (not JSON)"
        ),
    }
}
