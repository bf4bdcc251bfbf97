use les_cli::{run, RunOutcome};
use les_config::{Protocol, RC_FILE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn argv(args: &[&str]) -> Vec<String> {
    std::iter::once("les".to_string())
        .chain(args.iter().map(|s| s.to_string()))
        .collect()
}

/// Minimal HTTP/1.1 GET, returning the response body.
async fn http_get_body(port: u16, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8_lossy(&raw)
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default()
}

#[tokio::test]
async fn no_args_starts_one_default_instance() {
    let cwd = tempfile::tempdir().unwrap();
    std::fs::create_dir(cwd.path().join("public")).unwrap();
    std::fs::write(cwd.path().join("public/index.html"), "hello les").unwrap();

    let outcome = run(argv(&[]), cwd.path()).await.unwrap();
    let RunOutcome::Started(mut started) = outcome else {
        panic!("expected servers to start");
    };
    assert_eq!(started.len(), 1);

    let info = &started[0].info;
    assert_eq!(info.proto, Protocol::Http);
    assert_eq!(info.host, "localhost");
    // 8080 by default; conflict recovery stays within the fallback window
    assert!(info.port >= 7580 && info.port <= 8580);

    let body = http_get_body(info.port, "/index.html").await;
    assert_eq!(body, "hello les");

    for server in &mut started {
        server.instance.stop();
    }
}

#[tokio::test]
async fn same_port_twice_recovers_to_a_distinct_port() {
    let cwd = tempfile::tempdir().unwrap();
    let port = les_server::probe::find_free_port((17000, 17400)).unwrap();
    let port_arg = port.to_string();

    let first = run(argv(&["--port", &port_arg]), cwd.path()).await.unwrap();
    let RunOutcome::Started(mut first) = first else {
        panic!("expected first start");
    };
    assert_eq!(first[0].info.port, port);

    // first instance still listening
    let second = run(argv(&["--port", &port_arg]), cwd.path()).await.unwrap();
    let RunOutcome::Started(mut second) = second else {
        panic!("expected second start");
    };
    assert_ne!(second[0].info.port, port);

    for server in first.iter_mut().chain(second.iter_mut()) {
        server.instance.stop();
    }
}

#[tokio::test]
async fn lesrc_entries_all_start_with_derived_ports() {
    let cwd = tempfile::tempdir().unwrap();
    // two consecutive free ports, the second for the derived sibling
    let base = (17500..17900)
        .find(|&p| les_server::probe::is_port_free(p) && les_server::probe::is_port_free(p + 1))
        .unwrap();
    std::fs::write(
        cwd.path().join(RC_FILE),
        format!(r#"[{{ "proto": "http", "port": {base}, "host": "127.0.0.1" }}, {{ "proto": "http", "host": "127.0.0.1" }}]"#),
    )
    .unwrap();

    let outcome = run(argv(&[]), cwd.path()).await.unwrap();
    let RunOutcome::Started(mut started) = outcome else {
        panic!("expected servers to start");
    };
    assert_eq!(started.len(), 2);
    // result slots are index-stable: entry 0 first, entry 1 offset by one
    assert_eq!(started[0].info.port, base);
    assert_eq!(started[1].info.port, base + 1);

    for server in &mut started {
        server.instance.stop();
    }
}

#[tokio::test]
async fn browser_open_failure_does_not_take_down_started_servers() {
    let cwd = tempfile::tempdir().unwrap();
    // no opener binary on the search path, so the spawn fails
    let saved_path = std::env::var_os("PATH");
    std::env::set_var("PATH", cwd.path());

    let outcome = run(argv(&["--open", "--port", "0"]), cwd.path()).await;

    match saved_path {
        Some(path) => std::env::set_var("PATH", path),
        None => std::env::remove_var("PATH"),
    }

    let RunOutcome::Started(mut started) = outcome.unwrap() else {
        panic!("expected the server to start despite the failed opener");
    };
    assert_eq!(started.len(), 1);
    assert!(started[0].instance.listening_info().is_some());
    for server in &mut started {
        server.instance.stop();
    }
}

#[tokio::test]
async fn unreadable_ssl_material_rejects_the_run() {
    let cwd = tempfile::tempdir().unwrap();
    let err = run(
        argv(&[
            "--proto",
            "https",
            "--sslKey",
            "/nonexistent/key.pem",
            "--sslCert",
            "/nonexistent/cert.pem",
        ]),
        cwd.path(),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("error reading ssl cert"));
}

#[tokio::test]
async fn unresolvable_host_rejects_the_run() {
    let cwd = tempfile::tempdir().unwrap();
    let err = run(argv(&["--host", "no-such-host.invalid"]), cwd.path())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("bind failed"));
}

#[tokio::test]
async fn malformed_range_rejects_before_any_socket() {
    let cwd = tempfile::tempdir().unwrap();
    let err = run(argv(&["--range", "not-a-range"]), cwd.path())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), les_config::RANGE_FORMAT_ERROR);
}

#[tokio::test]
async fn help_renders_usage_without_starting_servers() {
    let cwd = tempfile::tempdir().unwrap();
    let outcome = run(argv(&["--help"]), cwd.path()).await.unwrap();
    let RunOutcome::Usage(usage) = outcome else {
        panic!("expected usage text");
    };
    assert!(usage.contains("les [path] [options]"));
    assert!(usage.contains("--port"));
}

#[tokio::test]
async fn init_scaffolds_into_the_given_path() {
    let cwd = tempfile::tempdir().unwrap();
    let dest = cwd.path().join("fresh-app");
    let outcome = run(
        argv(&[&format!("--init={}", dest.display()), "--port", "3000"]),
        cwd.path(),
    )
    .await
    .unwrap();
    assert!(matches!(outcome, RunOutcome::Initialized));
    assert!(dest.join("package.json").exists());

    let cfgs: Vec<les_config::ConfigEntry> =
        serde_json::from_str(&std::fs::read_to_string(dest.join(RC_FILE)).unwrap()).unwrap();
    assert_eq!(cfgs[0].port, Some(3000));
}
