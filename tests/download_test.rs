//! # Download Pipeline Tests
//!
//! Metadata lookup, key resolution, fetching and decryption against an in-memory gateway.
//!
//! ```bash
//! cargo test --test download_test
//! ```

mod common;

use common::*;
use kt_cli::{DownloadRequest, KeyMaterial, KeyRing, KtError};

const URL: &str = "https://cdn.fake.test/object";

fn request(file_id: &str, key_material: Option<KeyMaterial>) -> DownloadRequest<'_> {
    DownloadRequest {
        token: "tok",
        file_id,
        key_material,
    }
}

fn alice_ciphertext(plaintext: &[u8]) -> Vec<u8> {
    let (encryptor, _) = KeyRing::build(ALICE_PUBLIC, ALICE_PRIVATE, ALICE_PASSWORD).unwrap();
    encryptor.encrypt_bytes("secret.txt", plaintext).unwrap()
}

#[test]
fn test_plain_download_copies_bytes() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("abc123", "photo.jpg", "disk1", false))
        .with_result("files.download", download_link(URL, false))
        .with_content(URL, 200, b"jpeg bytes".to_vec());
    let observer = RecordingObserver::new(true);
    let mut sink = Vec::new();

    let downloaded = kt_cli::download(
        &gateway,
        &observer,
        request("abc123", Some(KeyMaterial::new())),
        &mut sink,
    )
    .unwrap();

    assert_eq!(sink, b"jpeg bytes");
    assert_eq!(downloaded.name, "photo.jpg");
    assert_eq!(downloaded.bytes, 10);
    assert_eq!(gateway.call_count("disks.get"), 0);
    assert_eq!(gateway.methods(), ["files.getById", "files.download"]);
    assert_eq!(gateway.fetches(), [URL]);
}

#[test]
fn test_file_id_is_trimmed_and_sent() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("abc123", "a.txt", "disk1", false))
        .with_result("files.download", download_link(URL, false))
        .with_content(URL, 200, b"x".to_vec());

    kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("  abc123 ", None),
        &mut Vec::new(),
    )
    .unwrap();

    for (_, params) in gateway.calls() {
        assert_eq!(params.get("file").and_then(|v| v.as_str()), Some("abc123"));
    }
}

#[test]
fn test_encrypted_download_decrypts() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "secret.txt", "disk1", true))
        .with_result("files.download", download_link(URL, true))
        .with_content(URL, 200, alice_ciphertext(b"top secret"))
        .with_alice_disk("disk1");
    let observer = RecordingObserver::new(true);
    let mut sink = Vec::new();

    let downloaded = kt_cli::download(
        &gateway,
        &observer,
        request("f1", Some(KeyMaterial::with_password(ALICE_PASSWORD))),
        &mut sink,
    )
    .unwrap();

    assert_eq!(sink, b"top secret");
    assert_eq!(downloaded.bytes, 10);
    assert_eq!(gateway.call_count("disks.get"), 1);
    assert!(observer
        .events()
        .iter()
        .any(|e| e == "File decrypted. Saving now"));
}

#[test]
fn test_decrypts_message_from_other_implementation() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "hello.txt", "disk1", true))
        .with_result("files.download", download_link(URL, true))
        .with_content(URL, 200, HELLO_FOR_ALICE.to_vec());
    let material = KeyMaterial::with_password(ALICE_PASSWORD)
        .raw_key(ALICE_PRIVATE)
        .public_key(ALICE_PUBLIC);
    let mut sink = Vec::new();

    kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", Some(material)),
        &mut sink,
    )
    .unwrap();

    assert_eq!(sink, b"hello from gpg\n");
    assert_eq!(gateway.call_count("disks.get"), 0);
}

#[test]
fn test_wrong_password_leaves_sink_empty() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "secret.txt", "disk1", true))
        .with_result("files.download", download_link(URL, true))
        .with_content(URL, 200, alice_ciphertext(b"top secret"))
        .with_alice_disk("disk1");
    let mut sink = Vec::new();

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", Some(KeyMaterial::with_password("wrong"))),
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(err, KtError::DecryptionFailed(_)));
    assert!(sink.is_empty());
}

#[test]
fn test_wrong_key_pair_leaves_sink_empty() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "secret.txt", "disk1", true))
        .with_result("files.download", download_link(URL, true))
        .with_content(URL, 200, alice_ciphertext(b"for alice only"));
    let bob = KeyMaterial::with_password(BOB_PASSWORD)
        .raw_key(BOB_PRIVATE)
        .public_key(BOB_PUBLIC);
    let mut sink = Vec::new();

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", Some(bob)),
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(err, KtError::DecryptionFailed(_)));
    assert!(sink.is_empty());
}

#[test]
fn test_tampered_ciphertext_leaves_sink_empty() {
    let mut ciphertext = alice_ciphertext(&[7u8; 4096]);
    let last = ciphertext.len() - 10;
    ciphertext[last] ^= 0xff;

    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "blob", "disk1", true))
        .with_result("files.download", download_link(URL, true))
        .with_content(URL, 200, ciphertext)
        .with_alice_disk("disk1");
    let mut sink = Vec::new();

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", Some(KeyMaterial::with_password(ALICE_PASSWORD))),
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(err, KtError::DecryptionFailed(_)));
    assert!(sink.is_empty());
}

#[test]
fn test_encrypted_without_key_material() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "secret.txt", "disk1", true));

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", None),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, KtError::EncryptedNoCryptoInfo(id) if id == "f1"));
    assert_eq!(gateway.methods(), ["files.getById"]);
}

#[test]
fn test_encrypted_without_password() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "secret.txt", "disk1", true))
        .with_alice_disk("disk1");

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", Some(KeyMaterial::new())),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, KtError::MissingCredentials));
    assert_eq!(gateway.call_count("disks.get"), 0);
}

#[test]
fn test_blank_file_id_makes_no_call() {
    let gateway = FakeGateway::new();

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("   ", None),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, KtError::MissingFileId));
    assert!(gateway.calls().is_empty());
}

#[test]
fn test_unknown_file() {
    let gateway = FakeGateway::new().with_result(
        "files.getById",
        serde_json::json!({"count": 0, "list": []}),
    );

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("nope", None),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, KtError::FileNotFound(id) if id == "nope"));
}

#[test]
fn test_empty_download_url() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "a.txt", "disk1", false))
        .with_result("files.download", download_link("", false));

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", None),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, KtError::EmptyDownloadUrl(_)));
    assert!(gateway.fetches().is_empty());
}

#[test]
fn test_bad_upstream_status() {
    let gateway = FakeGateway::new()
        .with_result("files.getById", file_record("f1", "a.txt", "disk1", false))
        .with_result("files.download", download_link(URL, false))
        .with_content(URL, 404, b"missing".to_vec());
    let mut sink = Vec::new();

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", None),
        &mut sink,
    )
    .unwrap_err();

    assert!(matches!(err, KtError::BadUpstreamStatus { status: 404, .. }));
    assert!(sink.is_empty());
}

#[test]
fn test_metadata_api_error() {
    let gateway = FakeGateway::new().with_error("files.getById", 403, "access denied");

    let err = kt_cli::download(
        &gateway,
        &RecordingObserver::new(true),
        request("f1", None),
        &mut Vec::new(),
    )
    .unwrap_err();

    assert!(matches!(err, KtError::Api { code: 403, message } if message == "access denied"));
}
