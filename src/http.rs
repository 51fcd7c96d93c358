//! Blocking HTTP implementation of [`ApiGateway`].

use reqwest::blocking::{multipart, Client, Request};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::api::{ApiGateway, ApiResponse, FetchedBody, MultipartForm, Params, PostedResponse};
use crate::config::Config;
use crate::error::{KtError, Result};

const JSON_RPC_CONTENT_TYPE: &str = "application/json-rpc";
const FILE_PART_CONTENT_TYPE: &str = "application/octet-stream";

/// ktCloud HTTP client. One connect timeout and one total timeout apply to every call.
pub struct HttpGateway {
    config: Config,
    http: Client,
}

impl HttpGateway {
    pub fn new(config: Config) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .user_agent(concat!("kt-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn multipart_request(&self, url: &str, form: MultipartForm) -> Result<Request> {
        let mut body = multipart::Form::new();
        for (name, value) in form.fields {
            body = body.text(name, value);
        }

        let file = form.file;
        let part = multipart::Part::reader(file.body)
            .file_name(file.file_name)
            .mime_str(FILE_PART_CONTENT_TYPE)?;
        body = body.part(file.field, part);

        let mut request = self.http.post(url).multipart(body).build()?;
        if let Some(content_type) = form.content_type {
            let value = HeaderValue::from_str(&content_type).map_err(|_| {
                KtError::InvalidArgument(format!("invalid content type: {content_type}"))
            })?;
            // Replaces the boundary type set by `multipart`.
            request.headers_mut().insert(CONTENT_TYPE, value);
        }
        Ok(request)
    }

    /// Whether the service answers on `/ping`.
    pub fn ping(&self) -> bool {
        let Ok(response) = self.http.get(self.config.ping_url()).send() else {
            return false;
        };
        let ok = response.status().as_u16() == 200;
        ok || response.text().map(|t| t == "Pong!").unwrap_or(false)
    }
}

impl ApiGateway for HttpGateway {
    #[instrument(skip(self, token, params))]
    fn call(&self, token: &str, method: &str, mut params: Params) -> Result<ApiResponse> {
        params
            .entry("token")
            .or_insert_with(|| Value::from(token));
        let body = json!({ "method": method, "params": params });

        let response = self
            .http
            .post(self.config.api_url())
            .header(CONTENT_TYPE, JSON_RPC_CONTENT_TYPE)
            .body(serde_json::to_vec(&body)?)
            .send()?;
        debug!(status = response.status().as_u16(), "json-rpc response");

        let bytes = response.bytes()?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[instrument(skip(self, url))]
    fn fetch(&self, url: &str) -> Result<FetchedBody> {
        let response = self.http.get(url).send()?;
        let status = response.status();
        debug!(status = status.as_u16(), "content response");

        Ok(FetchedBody {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: Box::new(response),
        })
    }

    #[instrument(skip(self, form), fields(file = %form.file.file_name))]
    fn post_multipart(&self, url: &str, form: MultipartForm) -> Result<PostedResponse> {
        let request = self.multipart_request(url, form)?;
        let response = self.http.execute(request)?;
        let status = response.status();
        debug!(status = status.as_u16(), "upload response");

        Ok(PostedResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body: response.bytes()?.to_vec(),
        })
    }

    fn upload_url(&self) -> String {
        self.config.upload_url()
    }
}
