//! `pagelink serve` and `pagelink coordinate`: host a document over stdio.

use std::path::Path;

use anyhow::Context;
use pagelink_channel::Transport;
use pagelink_config::Config;
use pagelink_dom::Document;
use pagelink_host::Coordinator;
use tracing::info;

fn load_document(html: &Path, url: &str) -> anyhow::Result<Document> {
    let markup = std::fs::read_to_string(html)
        .with_context(|| format!("Failed to read {}", html.display()))?;
    Document::parse_html(&markup, url).context("Failed to parse document")
}

fn stdio() -> Transport {
    Transport::json_lines(tokio::io::stdin(), tokio::io::stdout())
}

pub(crate) async fn run(
    config: &Config,
    html: &Path,
    url: &str,
    peer: Option<&str>,
) -> anyhow::Result<()> {
    let document = load_document(html, url)?;

    info!("Starting pagelink v{}", env!("CARGO_PKG_VERSION"));
    info!("Serving {} as {}", html.display(), url);

    let server = pagelink_host::serve(config, document, stdio())?;
    let _agent = peer.map(|peer| server.join_relay(peer, &config.relay));

    tokio::select! {
        _ = server.closed() => info!("Peer disconnected"),
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!("Interrupted");
        }
    }

    server.shutdown().await;
    Ok(())
}

pub(crate) async fn coordinate(config: &Config, html: &Path, url: &str) -> anyhow::Result<()> {
    let document = load_document(html, url)?;

    info!("Starting pagelink v{} coordinator", env!("CARGO_PKG_VERSION"));
    info!("Hosting {} as {}", html.display(), url);

    let (host_side, coordinator_side) = Transport::memory_pair();
    let server = pagelink_host::serve(config, document, host_side)?;
    let coordinator = Coordinator::start(config, coordinator_side, stdio());

    tokio::select! {
        _ = coordinator.closed() => info!("Link closed"),
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!("Interrupted");
        }
    }

    coordinator.shutdown();
    server.shutdown().await;
    Ok(())
}
