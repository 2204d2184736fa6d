//! Example: a UDP user agent that answers OPTIONS and keeps INVITE dialogs
//!
//! ```text
//! cargo run -p sipua-dialog-core --example options_responder -- 0.0.0.0:5060 [config.json]
//! ```
//!
//! The optional config file is a JSON [`UaConfig`]; missing fields take
//! their defaults. Log output is controlled with `RUST_LOG`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sipua_dialog_core::prelude::*;
use sipua_sip_core::Method;

struct Options;

#[async_trait]
impl RequestHandler for Options {
    async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult {
        let mut response = request.create_response(200, None);
        response.headers.insert("allow", "INVITE, ACK, BYE, OPTIONS");
        ua.respond(request, response).await?;
        Ok(())
    }
}

struct Invite;

#[async_trait]
impl RequestHandler for Invite {
    async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult {
        let dialog = ua.create_dialog(request).await?;
        info!("Accepted call {}", dialog.id);

        let mut ok = request.create_response(200, None);
        ok.headers
            .append("contact", sipua_sip_core::AddressHeader::new(dialog.local_target.clone()));
        ua.respond(request, ok).await?;
        Ok(())
    }
}

struct Bye;

#[async_trait]
impl RequestHandler for Bye {
    async fn handle(&self, ua: &UserAgent, request: &IncomingRequest) -> HandlerResult {
        let Some(dialog) = &request.dialog else {
            return Err(HandlerError::status(481, "Call/Transaction Does Not Exist"));
        };
        ua.remove_dialog(&dialog.id).await?;
        info!("Call {} ended", dialog.id);
        ua.respond(request, request.create_response(200, None)).await?;
        Ok(())
    }
}

/// ACKs need no response
struct Ack;

#[async_trait]
impl RequestHandler for Ack {
    async fn handle(&self, _ua: &UserAgent, _request: &IncomingRequest) -> HandlerResult {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let addr: SocketAddr = args
        .next()
        .unwrap_or_else(|| "0.0.0.0:5060".to_string())
        .parse()
        .context("invalid listen address")?;

    let config = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path))?
        }
        None => UaConfig::default().with_user_agent("sipua-options-responder"),
    };
    config.validate().map_err(anyhow::Error::msg)?;

    let (transport, events) = sipua_sip_transport::bind_udp(addr).await?;
    info!("Listening on {}", transport.local_addr()?);

    let ua = UserAgent::new(config, Arc::new(transport), Arc::new(MemoryStorage::new()));
    ua.register_handler(Method::Options, Arc::new(Options));
    ua.register_handler(Method::Invite, Arc::new(Invite));
    ua.register_handler(Method::Ack, Arc::new(Ack));
    ua.register_handler(Method::Bye, Arc::new(Bye));

    ua.run(events).await;
    Ok(())
}
