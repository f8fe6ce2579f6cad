//! Integration tests for Spaces

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn spaces(config_dir: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("spaces");
        cmd.env_remove("SPACES_URL")
            .env_remove("SPACES_CONFIG")
            .arg("--config")
            .arg(config_dir.path().join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        spaces(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Gameplan workspace browser"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        spaces(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("spaces"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        spaces(&dir)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_defaults() {
        let dir = TempDir::new().unwrap();
        spaces(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[endpoints]"))
            .stdout(predicate::str::contains("get_gp_projects_with_members"));
    }

    #[test]
    fn config_init_writes_file() {
        let dir = TempDir::new().unwrap();
        spaces(&dir).args(["config", "init"]).assert().success();
        assert!(dir.path().join("config.toml").exists());

        spaces(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--force"));
    }

    #[test]
    fn list_without_server_fails() {
        let dir = TempDir::new().unwrap();
        spaces(&dir)
            .args(["list"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Server URL not configured"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[server\nurl = 1").unwrap();
        spaces(&dir)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn completions_generate() {
        let dir = TempDir::new().unwrap();
        spaces(&dir)
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("spaces"));
    }
}

mod http_tests {
    use assert_cmd::cargo::cargo_bin_cmd;
    use predicates::prelude::*;
    use spaces::config::schema::EndpointsConfig;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use tempfile::TempDir;

    /// Serve canned Frappe responses, one request per connection
    fn serve(routes: Vec<(String, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                }

                let body = routes
                    .iter()
                    .find(|(method, _)| request_line.contains(&format!("/api/method/{} ", method)))
                    .map(|(_, body)| *body);
                let (status, body) = match body {
                    Some(body) => ("200 OK", body),
                    None => ("404 Not Found", r#"{"exc_type": "DoesNotExistError"}"#),
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });

        url
    }

    fn gameplan() -> String {
        let endpoints = EndpointsConfig::default();
        serve(vec![
            (
                endpoints.workspaces,
                r#"{"message": [
                    {"name": 1, "title": "Eng", "team": "core", "members": [{"user": "a@example.com"}]},
                    {"name": "2", "title": "Design", "is_private": 1, "members": []}
                ]}"#,
            ),
            (endpoints.joined_workspaces, r#"{"message": ["1"]}"#),
            (endpoints.unread_counts, r#"{"message": {"1": 3}}"#),
        ])
    }

    #[test]
    fn list_json_joins_all_three_queries() {
        let url = gameplan();
        let dir = TempDir::new().unwrap();

        cargo_bin_cmd!("spaces")
            .env_remove("SPACES_CONFIG")
            .args(["list", "--format", "json", "--url", &url, "--config"])
            .arg(dir.path().join("config.toml"))
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""title": "Eng""#))
            .stdout(predicate::str::contains(r#""title": "Design""#))
            .stdout(predicate::str::contains(r#""unread": 3"#))
            .stdout(predicate::str::contains(r#""joined": true"#));
    }

    #[test]
    fn unread_prints_count_for_string_or_numeric_id() {
        let url = gameplan();
        let dir = TempDir::new().unwrap();

        for id in ["1", "01"] {
            cargo_bin_cmd!("spaces")
                .env_remove("SPACES_CONFIG")
                .args(["unread", id, "--url", &url, "--config"])
                .arg(dir.path().join("config.toml"))
                .assert()
                .success()
                .stdout("3\n");
        }
    }

    #[test]
    fn show_unknown_workspace_fails() {
        let url = gameplan();
        let dir = TempDir::new().unwrap();

        cargo_bin_cmd!("spaces")
            .env_remove("SPACES_CONFIG")
            .args(["show", "99", "--format", "json", "--url", &url, "--config"])
            .arg(dir.path().join("config.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Workspace not found"));
    }
}

mod scenario_tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use spaces::cache::{QueryOptions, QueryStatus, QueryStore, Settled};
    use spaces::config::schema::EndpointsConfig;
    use spaces::error::{SpacesError, SpacesResult};
    use spaces::transport::{Endpoint, Transport};
    use spaces::{Accessor, Selectors, WorkspaceQueries};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    /// Transport answering from a script, with optional per-method gates
    #[derive(Default)]
    struct ScriptedTransport {
        responses: Mutex<HashMap<String, Result<Value, String>>>,
        calls: Mutex<HashMap<String, usize>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
    }

    impl ScriptedTransport {
        fn respond(&self, method: &str, payload: Value) {
            self.responses
                .lock()
                .unwrap()
                .insert(method.to_string(), Ok(payload));
        }

        fn fail(&self, method: &str, reason: &str) {
            self.responses
                .lock()
                .unwrap()
                .insert(method.to_string(), Err(reason.to_string()));
        }

        fn gate(&self, method: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates
                .lock()
                .unwrap()
                .insert(method.to_string(), Arc::clone(&gate));
            gate
        }

        fn calls(&self, method: &str) -> usize {
            self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn call(&self, endpoint: &Endpoint) -> SpacesResult<Value> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(endpoint.name().to_string())
                .or_default() += 1;

            let gate = self.gates.lock().unwrap().get(endpoint.name()).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            self.responses
                .lock()
                .unwrap()
                .get(endpoint.name())
                .cloned()
                .unwrap_or_else(|| Err("no response scripted".to_string()))
                .map_err(SpacesError::transport)
        }

        fn transport_name(&self) -> &'static str {
            "scripted"
        }
    }

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        endpoints: EndpointsConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let endpoints = EndpointsConfig::default();
            let transport = Arc::new(ScriptedTransport::default());
            transport.respond(
                &endpoints.workspaces,
                json!([
                    {"name": 1, "title": "Eng", "members": []},
                    {"name": "2", "title": "Design", "members": [{"user": "d@example.com"}]}
                ]),
            );
            transport.respond(&endpoints.joined_workspaces, json!([1]));
            transport.respond(&endpoints.unread_counts, json!({"1": 4}));
            Self {
                transport,
                endpoints,
            }
        }

        fn store(&self) -> QueryStore {
            QueryStore::new(Arc::clone(&self.transport) as Arc<dyn Transport>)
        }

        fn register(&self) -> WorkspaceQueries {
            WorkspaceQueries::register(&self.store(), &self.endpoints).unwrap()
        }
    }

    #[tokio::test]
    async fn find_workspace_is_stable_under_id_type() {
        let fixture = Fixture::new();
        let queries = fixture.register();
        queries.ready().await;
        let selectors = Selectors::new(&queries);

        let design = selectors.find_workspace(2).unwrap();
        assert_eq!(design.title, "Design");
        assert_eq!(selectors.find_workspace("2"), Some(design.clone()));
        assert_eq!(selectors.find_workspace(json!(2)), Some(design));

        assert_eq!(selectors.find_workspace("2.0").unwrap().title, "Design");

        let eng = selectors.find_workspace("1").unwrap();
        assert_eq!(eng.title, "Eng");
        assert_eq!(selectors.find_workspace(1), Some(eng));
    }

    #[tokio::test]
    async fn find_workspace_misses_unknown_and_blank_ids() {
        let fixture = Fixture::new();
        let queries = fixture.register();
        queries.ready().await;
        let selectors = Selectors::new(&queries);

        assert!(selectors.find_workspace(3).is_none());
        assert!(selectors.find_workspace("design").is_none());
        assert!(selectors.find_workspace("").is_none());
        assert!(selectors.find_workspace(None::<i64>).is_none());
        assert!(!selectors.has_joined(""));
        assert_eq!(selectors.unread_count_for("  "), 0);
    }

    #[tokio::test]
    async fn unread_count_is_zero_when_never_submitted() {
        let fixture = Fixture::new();
        // Hold the workspace fetch so nothing triggers the unread counts
        let _gate = fixture.transport.gate(&fixture.endpoints.workspaces);
        let queries = fixture.register();
        let selectors = Selectors::new(&queries);

        assert_eq!(queries.unread_count().status(), QueryStatus::Idle);
        assert_eq!(selectors.unread_count_for("5"), 0);
        assert_eq!(selectors.unread_count_for(1), 0);
        assert_eq!(fixture.transport.calls(&fixture.endpoints.unread_counts), 0);
    }

    #[tokio::test]
    async fn workspace_success_submits_unread_count_once() {
        let fixture = Fixture::new();
        let unread_gate = fixture.transport.gate(&fixture.endpoints.unread_counts);
        let queries = fixture.register();
        assert_eq!(queries.unread_count().status(), QueryStatus::Idle);

        assert!(queries.workspaces().settled().await.is_loaded());
        assert_eq!(queries.unread_count().status(), QueryStatus::Loading);

        unread_gate.notify_one();
        assert!(queries.unread_count().settled().await.is_loaded());
        assert_eq!(fixture.transport.calls(&fixture.endpoints.unread_counts), 1);

        let selectors = Selectors::new(&queries);
        assert_eq!(selectors.unread_count_for("1"), 4);
        assert_eq!(selectors.unread_count_for(2), 0);
    }

    #[tokio::test]
    async fn unread_failure_leaves_workspaces_loaded() {
        let fixture = Fixture::new();
        fixture
            .transport
            .fail(&fixture.endpoints.unread_counts, "HTTP 500");
        let queries = fixture.register();
        let outcomes = queries.ready().await;
        let selectors = Selectors::new(&queries);

        assert!(outcomes[0].1.is_loaded());
        assert!(matches!(outcomes[2].1, Settled::Failed(_)));
        assert_eq!(queries.workspaces().status(), QueryStatus::Loaded);
        assert!(queries.workspaces().error().is_none());
        assert_eq!(queries.unread_count().status(), QueryStatus::Error);
        assert_eq!(selectors.unread_count_for("1"), 0);
        assert_eq!(selectors.find_workspace(1).unwrap().title, "Eng");
    }

    #[tokio::test]
    async fn failed_refetch_keeps_last_data() {
        let fixture = Fixture::new();
        let queries = fixture.register();
        queries.ready().await;

        fixture
            .transport
            .fail(&fixture.endpoints.workspaces, "connection reset");
        let outcome = queries.workspaces().submit().await;

        assert!(matches!(outcome, Settled::Failed(ref e) if e.message.contains("connection reset")));
        assert_eq!(queries.workspaces().status(), QueryStatus::Error);
        assert_eq!(queries.workspaces().data().unwrap().len(), 2);

        let selectors = Selectors::new(&queries);
        assert_eq!(selectors.find_workspace(2).unwrap().title, "Design");
    }

    #[tokio::test]
    async fn has_joined_follows_refetched_ids() {
        let fixture = Fixture::new();
        let queries = fixture.register();
        queries.ready().await;
        let selectors = Selectors::new(&queries);

        assert!(selectors.has_joined("1"));
        assert!(selectors.has_joined(1));
        assert!(!selectors.has_joined(2));

        fixture
            .transport
            .respond(&fixture.endpoints.joined_workspaces, json!([2, "3"]));
        queries.joined_workspace_ids().submit().await;

        assert!(!selectors.has_joined(1));
        assert!(selectors.has_joined("2"));
        assert!(selectors.has_joined(3));
        assert_eq!(selectors.joined_workspaces().len(), 1);
    }

    #[tokio::test]
    async fn accessor_ids_are_read_per_call() {
        let fixture = Fixture::new();
        let queries = fixture.register();
        queries.ready().await;
        let selectors = Selectors::new(&queries);

        let current = spaces::signal::Signal::new(Some("1".to_string()));
        assert_eq!(selectors.unread_count_for(&current), 4);
        current.set(Some("2".to_string()));
        assert_eq!(selectors.unread_count_for(&current), 0);
        assert_eq!(
            selectors.find_workspace(Accessor(|| current.get())).unwrap().title,
            "Design"
        );
    }

    #[tokio::test]
    async fn concurrent_submits_share_one_call_and_hook() {
        let fixture = Fixture::new();
        let gate = fixture.transport.gate("numbers");
        fixture.transport.respond("numbers", json!([1, 2]));
        let store = fixture.store();

        let hooks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hooks);
        let query = store
            .register::<Vec<u32>>(
                "numbers",
                Endpoint::method("numbers"),
                QueryOptions::new().on_success(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            )
            .unwrap();

        let first = store.submit("numbers").unwrap();
        let second = query.submit();
        gate.notify_one();

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, Settled::Loaded { fetched_at: 1 });
        assert_eq!(a, b);
        assert_eq!(fixture.transport.calls("numbers"), 1);
        assert_eq!(hooks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reset_returns_to_initial_data() {
        let fixture = Fixture::new();
        let queries = fixture.register();
        queries.ready().await;

        queries.store().reset();
        assert_eq!(queries.workspaces().status(), QueryStatus::Idle);
        assert!(queries.workspaces().data().unwrap().is_empty());
        assert!(queries.unread_count().data().is_none());

        for fetch in queries.refresh() {
            assert!(fetch.await.is_loaded());
        }
        assert_eq!(queries.workspaces().data().unwrap().len(), 2);
        assert!(queries.unread_count().settled().await.is_loaded());
    }
}
