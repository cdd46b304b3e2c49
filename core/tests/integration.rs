//! Folder lifecycle test against the live mock DSM server.
//!
//! Starts the mock server on a random port, logs in, then exercises the full
//! dispatch path over real HTTP: session-cookie auth, query-parameter
//! marshaling, envelope decoding and error resolution.

use syno_core::filestation::{
    CreateFolderRequest, DeleteFolderRequest, InfoRequest, RenameRequest,
};
use syno_core::{Client, Response};

fn spawn_mock_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

#[test]
fn folder_lifecycle() {
    let addr = spawn_mock_server();
    let client = Client::new(&format!("http://{addr}"), false);

    // Step 1: a protected call before login resolves to the global 119 error.
    let response = client.send(&InfoRequest::new(2)).unwrap();
    let err = response.error().expect("expected a session error");
    assert_eq!(err.code, 119);
    assert_eq!(err.summary, "SID not found");

    // Step 2: login stores the session cookie in the agent's jar.
    client.login("api-client", "secret", "webui").unwrap();

    // Step 3: the same call now succeeds.
    let response = client.send(&InfoRequest::new(2)).unwrap();
    assert!(response.is_success());
    assert_eq!(response.hostname, "mock-dsm");

    // Step 4: create a folder, forcing the parent into existence.
    let request = CreateFolderRequest::new(2)
        .with_folder_path("/test-folder")
        .with_name("integration-test")
        .with_force_parent(true);
    let response = client.send(&request).unwrap();
    assert!(response.is_success(), "{:?}", response.error());
    assert_eq!(response.folders.len(), 1);
    assert_eq!(response.folders[0].path, "/test-folder/integration-test");
    assert_eq!(response.folders[0].name, "integration-test");
    assert!(response.folders[0].is_dir);

    // Step 5: rename it.
    let request = RenameRequest::new(2)
        .with_path("/test-folder/integration-test")
        .with_name("integration-test-renamed");
    let response = client.send(&request).unwrap();
    assert!(response.is_success(), "{:?}", response.error());
    assert_eq!(response.files.len(), 1);
    assert_eq!(response.files[0].name, "integration-test-renamed");
    assert_eq!(response.files[0].path, "/test-folder/integration-test-renamed");

    // Step 6: creating under a missing parent without force_parent fails
    // with a resolved, human-readable error — not a bare numeric code.
    let request = CreateFolderRequest::new(2)
        .with_folder_path("/no-such-parent")
        .with_name("child");
    let response = client.send(&request).unwrap();
    let err = response.error().expect("expected a create error");
    assert_eq!(err.code, 1100);
    assert_eq!(
        err.summary,
        "Failed to create a folder. More information in <errors> object."
    );
    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].code, 408);
    assert_eq!(err.errors[0].summary, "No such file or directory");
    assert_eq!(
        err.errors[0].details.get("path").and_then(|v| v.as_str()),
        Some("/no-such-parent")
    );

    // Step 7: delete the parent recursively.
    let request = DeleteFolderRequest::new(2)
        .with_path("/test-folder")
        .with_recursive(true);
    let response = client.send(&request).unwrap();
    assert!(response.is_success(), "{:?}", response.error());
}

#[test]
fn deleting_a_missing_path_resolves_item_errors() {
    let addr = spawn_mock_server();
    let client = Client::new(&format!("http://{addr}"), false);
    client.login("api-client", "secret", "webui").unwrap();

    let request = DeleteFolderRequest::new(2)
        .with_path("/ghost")
        .with_recursive(true);
    let response = client.send(&request).unwrap();

    let err = response.error().expect("expected a delete error");
    assert_eq!(err.code, 900);
    assert_eq!(
        err.summary,
        "Failed to delete file(s)/folder(s). More information in <errors> object."
    );
    assert_eq!(err.errors[0].summary, "No such file or directory");
}
