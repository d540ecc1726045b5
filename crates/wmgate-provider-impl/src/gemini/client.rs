use std::path::Path;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use wreq::header::{CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use wmgate_common::GeminiConfig;
use wmgate_provider_core::{
    ChatSession, ContinuationMetadata, ProviderError, ProviderOutput, ProviderResult,
};

use super::constants::{self, GeminiEndpoints};
use super::cookies::{CookieJar, CookieSource, Credentials};
use super::decode::{DecodeError, ModelOutput, decode_candidates};
use crate::http_client::{SharedClientKind, normalize_proxy, shared_client, transport_error};

/// Known embeddings of the access token in the landing page; first
/// non-empty capture wins.
static TOKEN_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""SNlM0e":"(.*?)""#,
        r#"SNlM0e":"(.*?)""#,
        r#"SNlM0e\\":\\"(.*?)\\""#,
        r#""EOzIkf":"(.*?)""#,
        r#"EOzIkf":"(.*?)""#,
        r#"EOzIkf\\":\\"(.*?)\\""#,
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

pub(crate) fn extract_access_token(html: &str) -> Option<String> {
    TOKEN_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

fn header_value(value: &str) -> ProviderResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|err| ProviderError::Transport(format!("invalid header value: {err}")))
}

/// Authenticated client for the web RPC. Built only by a successful
/// [`GeminiWebClient::init`]; a new init is the only way to refresh the token.
pub struct GeminiWebClient {
    endpoints: GeminiEndpoints,
    proxy: Option<String>,
    cookies: CookieJar,
    access_token: String,
}

impl std::fmt::Debug for GeminiWebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiWebClient")
            .field("endpoints", &self.endpoints)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}

async fn resolve_credentials(
    config: &GeminiConfig,
    location: &str,
    cookie_source: &dyn CookieSource,
) -> ProviderResult<Credentials> {
    let configured = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    let mut psid = configured(&config.cookie_1psid);
    let mut psidts = configured(&config.cookie_1psidts);

    if (psid.is_none() || psidts.is_none()) && config.allow_browser_cookies {
        match cookie_source.read(config.browser).await {
            Ok(Some(found)) => {
                info!(browser = ?config.browser, "using cookies from browser store");
                psid = Some(found.psid);
                psidts = Some(found.psidts);
            }
            Ok(None) => warn!(browser = ?config.browser, "browser store holds no session cookies"),
            Err(err) => warn!(browser = ?config.browser, error = %err, "browser cookie read failed"),
        }
    }

    match (psid, psidts) {
        (Some(psid), Some(psidts)) => Ok(Credentials { psid, psidts }),
        _ => Err(ProviderError::CredentialsMissing {
            what: "gemini.cookie_1psid and gemini.cookie_1psidts (or enable gemini.allow_browser_cookies)"
                .to_string(),
            location: location.to_string(),
        }),
    }
}

impl GeminiWebClient {
    /// Resolves credentials, warms up cookies and extracts the access token.
    pub async fn init(
        config: &GeminiConfig,
        location: &str,
        endpoints: GeminiEndpoints,
        cookie_source: &dyn CookieSource,
    ) -> ProviderResult<Self> {
        let credentials = resolve_credentials(config, location, cookie_source).await?;
        let mut client = Self {
            endpoints,
            proxy: normalize_proxy(config.http_proxy.as_deref()),
            cookies: CookieJar::from_credentials(&credentials),
            access_token: String::new(),
        };

        if let Err(err) = client.warm_up().await {
            warn!(error = %err, "cookie warm-up failed; continuing without it");
        }

        let (mut status, mut html) = client.fetch_init_page(client.proxy.as_deref()).await?;
        let mut token = extract_access_token(&html);

        if token.is_none() && client.proxy.is_some() && config.retry_without_proxy {
            warn!("access token not found via proxy, retrying init page directly");
            match client.fetch_init_page(None).await {
                Ok((direct_status, direct_html)) => {
                    token = extract_access_token(&direct_html);
                    status = direct_status;
                    html = direct_html;
                }
                Err(err) => warn!(error = %err, "direct retry failed; keeping proxied response"),
            }
        }

        let Some(token) = token else {
            if config.debug_save_init_html {
                match tokio::fs::write(constants::DEBUG_INIT_HTML, &html).await {
                    Ok(()) => warn!(path = constants::DEBUG_INIT_HTML, "saved init page for inspection"),
                    Err(err) => warn!(error = %err, "could not save init page"),
                }
            }
            return Err(ProviderError::TokenExtractionFailed { status });
        };

        client.access_token = token;
        info!("web client initialized");
        Ok(client)
    }

    async fn warm_up(&mut self) -> ProviderResult<()> {
        let http = shared_client(SharedClientKind::Gemini, self.proxy.as_deref())?;
        let response = http
            .get(self.endpoints.warmup.as_str())
            .header(COOKIE, header_value(&self.cookies.header_value())?)
            .send()
            .await
            .map_err(transport_error)?;
        let rows: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        debug!(cookies = rows.len(), "warm-up returned cookies");
        self.cookies.merge_set_cookie(rows.iter().map(String::as_str));
        Ok(())
    }

    fn base_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(constants::FORM_CONTENT_TYPE),
        );
        headers.insert(
            wreq::header::ORIGIN,
            HeaderValue::from_static(constants::ORIGIN),
        );
        headers.insert(
            wreq::header::REFERER,
            HeaderValue::from_static(constants::REFERER),
        );
        headers.insert(
            wreq::header::USER_AGENT,
            HeaderValue::from_static(constants::USER_AGENT),
        );
        headers.insert(
            HeaderName::from_static("x-same-domain"),
            HeaderValue::from_static("1"),
        );
        headers.insert(COOKIE, header_value(&self.cookies.header_value())?);
        Ok(headers)
    }

    async fn fetch_init_page(&self, proxy: Option<&str>) -> ProviderResult<(u16, String)> {
        let http = shared_client(SharedClientKind::Gemini, proxy)?;
        let response = http
            .get(self.endpoints.init.as_str())
            .headers(self.base_headers()?)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status().as_u16();
        let html = response.text().await.map_err(transport_error)?;
        Ok((status, html))
    }

    async fn upload_file(&self, path: &str) -> ProviderResult<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| ProviderError::AttachmentRead {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        let file_name = file_name(path);
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let part = wreq::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime.essence_str())
            .map_err(transport_error)?;
        let form = wreq::multipart::Form::new().part("file", part);

        let http = shared_client(SharedClientKind::Gemini, self.proxy.as_deref())?;
        let response = http
            .post(self.endpoints.upload.as_str())
            .header(
                HeaderName::from_static("push-id"),
                HeaderValue::from_static(constants::UPLOAD_PUSH_ID),
            )
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UploadFailed {
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(transport_error)
    }

    async fn post_generate(&self, model_header: &HeaderValue, form: &str) -> ProviderResult<String> {
        let http = shared_client(SharedClientKind::Gemini, self.proxy.as_deref())?;
        let mut headers = self.base_headers()?;
        headers.insert(
            HeaderName::from_static(constants::MODEL_HEADER),
            model_header.clone(),
        );
        let response = http
            .post(self.endpoints.generate.as_str())
            .headers(headers)
            .body(form.to_string())
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "generate request rejected");
            return Err(ProviderError::UpstreamStatus {
                provider: constants::PROVIDER_LABEL.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    /// One generate round-trip. A payload that cannot be parsed at all is
    /// requested once more before the failure is surfaced.
    pub async fn generate_content(
        &self,
        prompt: &str,
        model: &str,
        files: &[String],
        metadata: &ContinuationMetadata,
    ) -> ProviderResult<ModelOutput> {
        if self.access_token.is_empty() {
            return Err(ProviderError::NotInitialized(
                constants::PROVIDER_LABEL.to_string(),
            ));
        }
        let model_header = constants::model_header_value(model)
            .ok_or_else(|| ProviderError::UnsupportedModel(model.to_string()))
            .and_then(|value| header_value(&value))?;

        let mut file_refs = Vec::with_capacity(files.len());
        for path in files {
            let reference = self.upload_file(path).await?;
            file_refs.push(json!([[reference], file_name(path)]));
        }

        let form = encode_generate_form(&self.access_token, prompt, file_refs, metadata)?;
        let raw = self.post_generate(&model_header, &form).await?;
        let output = match decode_candidates(&raw) {
            Err(DecodeError::PayloadParseFailed) => {
                warn!("response payload unparseable, retrying once");
                let raw = self.post_generate(&model_header, &form).await?;
                decode_candidates(&raw)?
            }
            other => other?,
        };
        debug!(
            candidates = output.candidates.len(),
            chars = output.text.chars().count(),
            "generate decoded"
        );
        Ok(output)
    }

    pub fn start_chat(self: &Arc<Self>, model: &str) -> GeminiChatSession {
        GeminiChatSession {
            client: self.clone(),
            model: model.to_string(),
            metadata: ContinuationMetadata::default(),
        }
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

/// `at=<token>&f.req=[null,"<payload json>"]` where payload is
/// `[[prompt(, 0, null, file refs)], null, metadata]`.
pub(crate) fn encode_generate_form(
    token: &str,
    prompt: &str,
    file_refs: Vec<Value>,
    metadata: &ContinuationMetadata,
) -> ProviderResult<String> {
    let prompt_part = if file_refs.is_empty() {
        json!([prompt])
    } else {
        json!([prompt, 0, null, file_refs])
    };
    let payload = json!([prompt_part, null, metadata.to_json()]);
    let f_req = json!([null, payload.to_string()]).to_string();
    serde_urlencoded::to_string([("at", token), ("f.req", f_req.as_str())])
        .map_err(form_encoding_error)
}

fn form_encoding_error(err: serde_urlencoded::ser::Error) -> ProviderError {
    ProviderError::RequestEncoding(err.to_string())
}

/// Conversation bound to one model. Continuation state advances only after
/// a successful turn.
pub struct GeminiChatSession {
    client: Arc<GeminiWebClient>,
    model: String,
    metadata: ContinuationMetadata,
}

impl GeminiChatSession {
    pub fn metadata(&self) -> &ContinuationMetadata {
        &self.metadata
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    fn model(&self) -> &str {
        &self.model
    }

    async fn send_message(
        &mut self,
        prompt: &str,
        files: &[String],
    ) -> ProviderResult<ProviderOutput> {
        let output: ProviderOutput = self
            .client
            .generate_content(prompt, &self.model, files, &self.metadata)
            .await?
            .into();
        self.metadata = ContinuationMetadata::after_turn(&output);
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_patterns_cover_known_embeddings() {
        assert_eq!(
            extract_access_token(r#"<script>{"SNlM0e":"tok-1","x":1}</script>"#).as_deref(),
            Some("tok-1")
        );
        assert_eq!(
            extract_access_token(r#"data='{\"EOzIkf\":\"tok-2\"}'"#).as_deref(),
            Some("tok-2")
        );
        assert_eq!(extract_access_token("<html>sign in</html>"), None);
    }

    #[test]
    fn empty_capture_falls_through_to_next_pattern() {
        let html = r#"{"SNlM0e":""} {"EOzIkf":"tok-3"}"#;
        assert_eq!(extract_access_token(html).as_deref(), Some("tok-3"));
    }

    fn decode_form(form: &str) -> (String, Value) {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(form).unwrap();
        assert_eq!(pairs[0].0, "at");
        assert_eq!(pairs[1].0, "f.req");
        let outer: Value = serde_json::from_str(&pairs[1].1).unwrap();
        assert!(outer[0].is_null());
        let payload: Value = serde_json::from_str(outer[1].as_str().unwrap()).unwrap();
        (pairs[0].1.clone(), payload)
    }

    #[test]
    fn generate_form_without_files() {
        let form =
            encode_generate_form("tok", "hi & bye", Vec::new(), &ContinuationMetadata::default())
                .unwrap();
        let (token, payload) = decode_form(&form);
        assert_eq!(token, "tok");
        assert_eq!(payload, json!([["hi & bye"], null, [null, null, null]]));
    }

    #[test]
    fn generate_form_with_files_and_metadata() {
        let metadata = ContinuationMetadata {
            conversation_id: Some("c_1".to_string()),
            response_id: Some("r_1".to_string()),
            candidate_id: Some("rc_1".to_string()),
        };
        let refs = vec![json!([["/contrib/ref"], "a.png"])];
        let form = encode_generate_form("tok", "look", refs, &metadata).unwrap();
        let (_, payload) = decode_form(&form);
        assert_eq!(
            payload,
            json!([["look", 0, null, [[["/contrib/ref"], "a.png"]]], null, ["c_1", "r_1", "rc_1"]])
        );
    }

    #[test]
    fn form_encoding_failure_is_reported() {
        let err = serde_urlencoded::to_string(5u8)
            .map_err(form_encoding_error)
            .unwrap_err();
        assert!(matches!(err, ProviderError::RequestEncoding(_)));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn file_name_is_basename() {
        assert_eq!(file_name("/tmp/docs/report.pdf"), "report.pdf");
    }
}
