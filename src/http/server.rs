use crate::http::{router, AppContext};
use crate::shared::errors::{AppError, AppResult};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// HTTPサーバーを起動してリクエストを受け付け続ける
///
/// # 引数
/// * `addr` - 待ち受けアドレス
/// * `ctx` - 共有コンテキスト
pub async fn run(addr: SocketAddr, ctx: Arc<AppContext>) -> AppResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::configuration(format!("アドレス{addr}で待ち受けできません: {e}")))?;

    log::info!("HTTPサーバーを開始しました: http://{addr}");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                log::debug!("接続を受け付けました: peer={peer}");
                let ctx = Arc::clone(&ctx);
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, ctx).await {
                        log::error!("接続処理エラー: {e}");
                    }
                });
            }
            Err(e) => {
                log::error!("接続受け入れエラー: {e}");
            }
        }
    }
}

/// TCP接続を処理する
async fn handle_connection(stream: TcpStream, ctx: Arc<AppContext>) -> AppResult<()> {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| router::route(req, Arc::clone(&ctx)));

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::error!("HTTP接続処理エラー: {err}");
    }

    Ok(())
}
