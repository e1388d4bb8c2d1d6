//! pipelink client
//!
//! Runs one engine against the local peer:
//! - config from `pipelink.yaml` (or the first argument)
//! - Unix socket transport over the resolved endpoint slots
//! - publishes a demo presence and logs every event until Ctrl-C

#[cfg(unix)]
#[tokio::main]
async fn main() {
    use serde_json::json;
    use tracing_subscriber::{fmt, EnvFilter};

    use pipelink_client::transport::{EndpointResolver, UnixPipeTransport};
    use pipelink_client::{config, Engine, Event, EventKind, Request};

    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "pipelink.yaml".into());
    let cfg = config::load_from_file(&path).expect("config load failed");

    let transport = UnixPipeTransport::new(EndpointResolver::from_env(), cfg.connection.read_timeout());
    let engine = Engine::spawn(cfg, transport).expect("engine spawn failed");

    for kind in [EventKind::Join, EventKind::Spectate, EventKind::JoinRequest] {
        engine.enqueue_command(Request::Subscribe(kind)).expect("engine closed");
    }
    engine
        .enqueue_command(Request::SetPresence(json!({
            "state": "Idling",
            "details": "pipelink demo",
            "timestamps": { "start": std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default() },
        })))
        .expect("engine closed");

    tracing::info!(%path, "pipelink-client running");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = engine.next_event() => match event {
                Event::Ready { user, .. } => {
                    tracing::info!(user = ?user.as_ref().map(|u| u.display_name()), "ready");
                }
                Event::JoinRequest { user } => {
                    tracing::info!(user = %user.display_name(), "join request; declining");
                    let reply = Request::RespondJoin { user_id: user.id, accept: false };
                    if engine.enqueue_command(reply).is_err() {
                        break;
                    }
                }
                other => tracing::info!(event = other.name(), ?other, "event"),
            },
        }
    }

    engine.shutdown();
    if let Err(e) = engine.join().await {
        tracing::error!(error = %e, "worker did not stop cleanly");
    }
}

#[cfg(not(unix))]
fn main() {
    eprintln!("pipelink-client: only Unix socket endpoints are supported on this platform");
}
