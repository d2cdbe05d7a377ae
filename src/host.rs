//! Line-oriented JSON host. Each input line is a method call; each output line
//! is either the response to a call or a pushed tick update.

use anyhow::{Context, Result};
use log::{info, warn};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};

use crate::tracking::{CommandDispatcher, MethodCall, MethodResult, TickUpdate, TrackingController};

/// Updates queued for stdout before new ones are dropped.
const UPDATE_BUFFER: usize = 32;

pub fn response_json(method: &str, result: MethodResult) -> Value {
    match result {
        MethodResult::Success(value) => json!({ "method": method, "result": value }),
        MethodResult::Error(payload) => json!({ "method": method, "error": payload }),
        MethodResult::NotImplemented => json!({ "method": method, "notImplemented": true }),
    }
}

pub fn update_json(update: &TickUpdate) -> Value {
    json!({ "event": "update", "data": update })
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, value: &Value) -> Result<()> {
    let mut line = serde_json::to_vec(value).context("failed to encode output line")?;
    line.push(b'\n');
    writer.write_all(&line).await.context("failed to write output line")?;
    writer.flush().await.context("failed to flush output")
}

async fn handle_line(dispatcher: &CommandDispatcher, line: &str) -> Value {
    match serde_json::from_str::<MethodCall>(line) {
        Ok(call) => {
            let result = dispatcher.handle(&call).await;
            response_json(&call.method, result)
        }
        Err(err) => {
            warn!("Malformed request line: {}", err);
            json!({
                "method": Value::Null,
                "error": { "code": "MALFORMED_REQUEST", "message": err.to_string() },
            })
        }
    }
}

/// Serves method calls from `reader` until EOF, interleaving tick updates into
/// `writer`. The session is disposed when the input ends.
pub async fn serve<R, W>(controller: TrackingController, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (updates_tx, mut updates_rx) = mpsc::channel::<TickUpdate>(UPDATE_BUFFER);
    let dispatcher = CommandDispatcher::new(controller, updates_tx);
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input line")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = handle_line(&dispatcher, &line).await;
                write_line(&mut writer, &response).await?;
            }
            Some(update) = updates_rx.recv() => {
                write_line(&mut writer, &update_json(&update)).await?;
            }
        }
    }

    info!("Input closed; disposing session");
    let result = dispatcher.handle(&MethodCall::new("dispose", Value::Null)).await;
    if !result.is_success() {
        warn!("Dispose on shutdown failed: {:?}", result);
    }
    Ok(())
}
