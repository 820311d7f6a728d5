use std::io::Write;

use super::*;

#[test]
fn defaults_to_module_backend_on_localhost() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(settings.views.root.is_none());
    assert!(matches!(settings.views.backend, BackendSettings::Module));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.views.root = Some("from-file".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        views: ViewOverrides {
            root: Some("from-cli".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.views.root.as_deref(), Some("from-cli"));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn root_is_trimmed_and_blank_roots_are_dropped() {
    let mut raw = RawSettings::default();
    raw.views.root = Some(" /views/ ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.views.root.as_deref(), Some("views"));

    let mut raw = RawSettings::default();
    raw.views.root = Some("  ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.views.root.is_none());
}

#[test]
fn memory_backend_requires_a_directory() {
    let mut raw = RawSettings::default();
    raw.views.backend = Some(BackendKind::Memory);

    let err = Settings::from_raw(raw.clone()).expect_err("directory missing");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "views.memory.directory",
            ..
        }
    ));

    raw.views.memory.directory = Some(PathBuf::from("templates"));
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(matches!(
        settings.views.backend,
        BackendSettings::Memory { ref directory } if directory == std::path::Path::new("templates")
    ));
}

#[test]
fn store_backend_requires_a_database_url() {
    let mut raw = RawSettings::default();
    raw.views.backend = Some(BackendKind::Store);
    raw.views.store.database_url = Some("   ".to_string());

    let err = Settings::from_raw(raw.clone()).expect_err("url missing");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "views.store.database_url",
            ..
        }
    ));

    raw.views.store.database_url = Some("postgres://localhost/views".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    match settings.views.backend {
        BackendSettings::Store {
            database_url,
            max_connections,
        } => {
            assert_eq!(database_url, "postgres://localhost/views");
            assert_eq!(max_connections.get(), DEFAULT_STORE_MAX_CONNECTIONS);
        }
        other => panic!("unexpected backend {other:?}"),
    }
}

#[test]
fn store_pool_size_must_be_positive() {
    let mut raw = RawSettings::default();
    raw.views.backend = Some(BackendKind::Store);
    raw.views.store.database_url = Some("postgres://localhost/views".to_string());
    raw.views.store.max_connections = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero pool");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "views.store.max_connections",
            ..
        }
    ));
}

#[test]
fn remote_base_url_is_validated_and_normalized() {
    let mut raw = RawSettings::default();
    raw.views.backend = Some(BackendKind::Remote);
    raw.views.remote.base_url = Some("https://content.example/views".to_string());
    raw.views.remote.timeout_ms = Some(250);

    let settings = Settings::from_raw(raw.clone()).expect("valid settings");
    match settings.views.backend {
        BackendSettings::Remote { base_url, timeout } => {
            assert_eq!(base_url.as_str(), "https://content.example/views/");
            assert_eq!(timeout, Duration::from_millis(250));
        }
        other => panic!("unexpected backend {other:?}"),
    }

    raw.views.remote.base_url = Some("ftp://content.example/".to_string());
    assert!(Settings::from_raw(raw.clone()).is_err());

    raw.views.remote.base_url = Some("not a url".to_string());
    assert!(Settings::from_raw(raw.clone()).is_err());

    raw.views.remote.base_url = Some("https://content.example/".to_string());
    raw.views.remote.timeout_ms = Some(0);
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn zero_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.port",
            ..
        })
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["synthview"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "synthview",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--views-backend",
        "remote",
        "--views-remote-base-url",
        "https://content.example/",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.views.backend, Some(BackendKind::Remote));
            assert_eq!(
                serve.overrides.views.remote_base_url.as_deref(),
                Some("https://content.example/")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "synthview",
        "render",
        "home",
        "--set",
        "user=Ann",
        "--set",
        "title=Hi=there",
        "--views-root",
        "site",
    ]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert_eq!(render.name, "home");
            assert_eq!(
                render.assignments,
                vec![
                    ("user".to_string(), "Ann".to_string()),
                    ("title".to_string(), "Hi=there".to_string()),
                ]
            );
            assert_eq!(render.views.root.as_deref(), Some("site"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn render_rejects_malformed_assignments() {
    let result = CliArgs::try_parse_from(["synthview", "render", "home", "--set", "user"]);
    assert!(result.is_err());
}

#[test]
fn load_reads_an_explicit_config_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(
        file,
        "[server]\nport = 8123\n\n[views]\nroot = \"site\"\nbackend = \"memory\"\n\n[views.memory]\ndirectory = \"/srv/views\""
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "synthview",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "serve",
        "--server-port",
        "9000",
    ]);
    let settings = load(&args).expect("loads");

    assert_eq!(settings.server.addr.port(), 9000);
    assert_eq!(settings.views.root.as_deref(), Some("site"));
    assert_eq!(settings.views.backend.kind(), BackendKind::Memory);
}
