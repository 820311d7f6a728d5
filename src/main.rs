use std::{
    io::{self, Write},
    process,
    time::Duration,
};

use synthview::{
    application::error::AppError,
    config::{self, RenderArgs},
    domain::RenderOptions,
    infra::{
        bootstrap::build_view_factory,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let factory = build_view_factory(&settings.views).await?;
    let router = http::build_router(HttpState::new(factory));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let (drain_tx, drain_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = drain_tx.send(());
        },
    );
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(drain_rx, grace) => {
            warn!(grace_secs = grace.as_secs(), "graceful shutdown timed out");
        }
    }

    Ok(())
}

async fn drain_deadline(started: oneshot::Receiver<()>, grace: Duration) {
    match started.await {
        Ok(()) => tokio::time::sleep(grace).await,
        Err(_) => std::future::pending::<()>().await,
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

async fn run_render(settings: config::Settings, args: RenderArgs) -> Result<(), AppError> {
    let mut options = match args.options_json.as_deref() {
        Some(raw) => serde_json::from_str::<RenderOptions>(raw).map_err(|err| {
            AppError::unexpected(format!("--options-json must be a JSON object: {err}"))
        })?,
        None => RenderOptions::new(),
    };
    for (key, value) in args.assignments {
        options.insert(key, value);
    }

    let factory = build_view_factory(&settings.views).await?;
    let view = factory.create(&args.name)?;
    let output = view.render(&options).await?;

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(output.as_bytes())
        .and_then(|()| stdout.write_all(b"\n"))
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    Ok(())
}
