pub mod intake;
pub mod local;
pub mod trigger;

use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::error::ServerError;

/// Сколько ждать in-flight запросы после сигнала остановки.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Обслуживать `app` до Ctrl+C / SIGTERM, затем graceful shutdown.
///
/// Отмена `token` прерывает ожидающие публикации (→ 500) и
/// останавливает фоновые задачи, держащие его клон.
pub(crate) async fn serve_until_signal(
    port: u16,
    app: Router,
    token: CancellationToken,
) -> Result<(), ServerError> {
    let server_token = token.clone();
    let mut server = tokio::spawn(async move {
        invites_api_server::run(port, app, server_token).await
    });

    tokio::select! {
        res = &mut server => {
            // Сервер завершился сам — обычно это ошибка bind.
            token.cancel();
            res??;
            return Ok(());
        }
        signal = shutdown_signal() => {
            signal?;
            tracing::info!("shutting down...");
        }
    }

    token.cancel();

    match tokio::time::timeout(DRAIN_TIMEOUT, &mut server).await {
        Ok(res) => res??,
        Err(_) => {
            tracing::warn!(timeout = ?DRAIN_TIMEOUT, "drain timed out, aborting server");
            server.abort();
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = term.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
