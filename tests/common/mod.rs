#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use kt_cli::api::{
    ApiGateway, ApiResponse, FetchedBody, MultipartForm, Params, PostedResponse,
};
use kt_cli::{KtError, Observer, Result, TransferEvent};
use serde_json::{json, Value};

pub const ALICE_PASSWORD: &str = "correct horse battery staple";
pub const BOB_PASSWORD: &str = "bob-secret";

pub const ALICE_PUBLIC: &str = include_str!("../fixtures/alice_public.asc");
pub const ALICE_PRIVATE: &str = include_str!("../fixtures/alice_private.asc");
pub const ALICE_CRYPTO_KEY: &str = include_str!("../fixtures/alice_crypto_key.asc");
pub const BOB_PUBLIC: &str = include_str!("../fixtures/bob_public.asc");
pub const BOB_PRIVATE: &str = include_str!("../fixtures/bob_private.asc");
pub const SIGNER_PUBLIC: &str = include_str!("../fixtures/signer_public.asc");
pub const HELLO_FOR_ALICE: &[u8] = include_bytes!("../fixtures/hello_for_alice.gpg");

pub const UPLOAD_URL: &str = "https://fake.test/upload";

/// One multipart POST as the server received it.
#[derive(Debug, Clone)]
pub struct ReceivedForm {
    pub url: String,
    pub fields: Vec<(String, String)>,
    pub field_name: String,
    pub file_name: String,
    /// Request content type.
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl ReceivedForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// In-memory [`ApiGateway`] that records every request.
pub struct FakeGateway {
    results: HashMap<String, ApiResponse>,
    content: HashMap<String, (u16, Vec<u8>)>,
    upload_response: PostedResponse,
    calls: RefCell<Vec<(String, Params)>>,
    fetches: RefCell<Vec<String>>,
    forms: RefCell<Vec<ReceivedForm>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            content: HashMap::new(),
            upload_response: upload_ok("file-1"),
            calls: RefCell::new(Vec::new()),
            fetches: RefCell::new(Vec::new()),
            forms: RefCell::new(Vec::new()),
        }
    }

    /// Answer `method` with `result`.
    pub fn with_result(mut self, method: &str, result: Value) -> Self {
        self.results
            .insert(method.to_string(), ApiResponse::ok(result));
        self
    }

    /// Answer `method` with an API error.
    pub fn with_error(mut self, method: &str, code: i64, message: &str) -> Self {
        self.results
            .insert(method.to_string(), ApiResponse::failure(code, message));
        self
    }

    /// Serve `body` with `status` on GET `url`.
    pub fn with_content(mut self, url: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.content.insert(url.to_string(), (status, body.into()));
        self
    }

    pub fn with_upload_response(mut self, response: PostedResponse) -> Self {
        self.upload_response = response;
        self
    }

    /// Answer `disks.get` with a single disk holding Alice's keys.
    pub fn with_alice_disk(self, id: &str) -> Self {
        self.with_result("disks.get", disk_list(&[alice_disk(id)]))
    }

    pub fn calls(&self) -> Vec<(String, Params)> {
        self.calls.borrow().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|(m, _)| m == method).count()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }

    pub fn forms(&self) -> Vec<ReceivedForm> {
        self.forms.borrow().clone()
    }

    pub fn single_form(&self) -> ReceivedForm {
        let forms = self.forms();
        assert_eq!(forms.len(), 1, "expected exactly one upload");
        forms.into_iter().next().unwrap()
    }
}

impl ApiGateway for FakeGateway {
    fn call(&self, _token: &str, method: &str, params: Params) -> Result<ApiResponse> {
        self.calls.borrow_mut().push((method.to_string(), params));
        self.results
            .get(method)
            .cloned()
            .ok_or_else(|| KtError::Network(format!("no fake response for {method}")))
    }

    fn fetch(&self, url: &str) -> Result<FetchedBody> {
        self.fetches.borrow_mut().push(url.to_string());
        let (status, body) = self
            .content
            .get(url)
            .cloned()
            .ok_or_else(|| KtError::Network(format!("no fake content at {url}")))?;

        Ok(FetchedBody {
            status,
            reason: if status == 200 { "OK" } else { "Not Found" }.into(),
            body: Box::new(Cursor::new(body)),
        })
    }

    fn post_multipart(&self, url: &str, form: MultipartForm) -> Result<PostedResponse> {
        let mut file = form.file;
        let mut body = Vec::new();
        // A failing body aborts the request, like a real transport would.
        file.body.read_to_end(&mut body)?;

        self.forms.borrow_mut().push(ReceivedForm {
            url: url.to_string(),
            fields: form.fields,
            field_name: file.field,
            file_name: file.file_name,
            content_type: form.content_type,
            body,
        });
        Ok(self.upload_response.clone())
    }

    fn upload_url(&self) -> String {
        UPLOAD_URL.to_string()
    }
}

/// Records events and answers confirmations with a fixed value.
pub struct RecordingObserver {
    answer: bool,
    events: RefCell<Vec<String>>,
    prompts: RefCell<Vec<String>>,
}

impl RecordingObserver {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            events: RefCell::new(Vec::new()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &TransferEvent<'_>) {
        self.events.borrow_mut().push(event.to_string());
    }

    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answer
    }
}

/// A reader that fails the test if anything reads from it.
pub struct UntouchedReader;

impl Read for UntouchedReader {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        panic!("content must not be read");
    }
}

/// A reader that yields some bytes, then fails.
pub struct FailingReader {
    pub served: bool,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.served {
            return Err(std::io::Error::other("disk read error"));
        }
        self.served = true;
        let n = buf.len().min(4);
        buf[..n].copy_from_slice(&b"data"[..n]);
        Ok(n)
    }
}

pub fn alice_disk(id: &str) -> Value {
    json!({
        "id": id,
        "title": "Alice",
        "crypto_key": ALICE_CRYPTO_KEY,
        "public_key": ALICE_PUBLIC,
    })
}

pub fn disk_list(disks: &[Value]) -> Value {
    json!({ "count": disks.len(), "list": disks })
}

pub fn file_record(id: &str, name: &str, disk: &str, encrypted: bool) -> Value {
    json!({
        "count": 1,
        "list": [{
            "id": id,
            "name": name,
            "mime": "application/octet-stream",
            "disk": disk,
            "folder": "",
            "encrypted": encrypted,
            "size": 0,
            "type_desc": "Binary",
        }]
    })
}

pub fn download_link(url: &str, crypto: bool) -> Value {
    json!({ "crypto": crypto, "name": "ignored", "url": url })
}

pub fn upload_ok(file_id: &str) -> PostedResponse {
    PostedResponse {
        status: 200,
        reason: "OK".into(),
        body: serde_json::to_vec(&json!({"result": {"ok": true, "file_id": file_id}}))
            .unwrap(),
    }
}

/// Spawn the kt-cli binary.
pub fn kt_cli_cmd() -> Command {
    cargo_bin_cmd!("kt-cli")
}
