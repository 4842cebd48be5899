use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::{Duration, Instant, timeout_at};

use crate::config::ServerConfig;
use crate::error::{ListenerError, SessionError};
use crate::reading::{PAYLOAD_LEN, Reading};

// 可恢复的 accept 错误后稍作等待，避免空转
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP server for sensor readings.
///
/// Each accepted connection carries one payload. Connections are only accepted
/// while a session permit is free; the rest wait in the kernel backlog.
pub struct Listener {
    inner: TcpListener,
    config: ServerConfig,
    sessions: Arc<Semaphore>,
}

impl Listener {
    /// Create, bind and listen. Every failure here is fatal.
    pub fn bind(config: &ServerConfig) -> Result<Self, ListenerError> {
        let addr = config.listen_addr();

        let socket = TcpSocket::new_v4().map_err(ListenerError::Socket)?;
        socket.set_reuseaddr(true).map_err(ListenerError::Socket)?;
        socket
            .bind(addr)
            .map_err(|source| ListenerError::Bind { addr, source })?;
        let inner = socket.listen(config.backlog).map_err(ListenerError::Listen)?;

        Ok(Self {
            inner,
            config: config.clone(),
            sessions: Arc::new(Semaphore::new(config.max_sessions.max(1))),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Accept loop. Only returns on a fatal accept error, or with `Ok` once the
    /// actuator side of `tx` is gone.
    pub async fn run(self, tx: mpsc::Sender<Reading>) -> Result<(), ListenerError> {
        log::info!(
            "Listening on {} (backlog={}, max_sessions={}, read_timeout={:?})",
            self.local_addr().unwrap_or_else(|_| self.config.listen_addr()),
            self.config.backlog,
            self.config.max_sessions,
            self.config.read_timeout,
        );

        loop {
            // 先拿到会话许可再 accept，其余连接留在内核队列里排队
            let permit = tokio::select! {
                permit = self.sessions.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Ok(()),
                },
                _ = tx.closed() => return Ok(()),
            };

            let (stream, peer) = tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        let err = ListenerError::Accept(e);
                        if err.is_fatal() {
                            log::error!("{}", err);
                            return Err(err);
                        }
                        log::warn!("{}, still listening", err);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
                _ = tx.closed() => return Ok(()),
            };
            log::debug!("Accepted sensor connection from {}", peer);

            let tx = tx.clone();
            let read_timeout = self.config.read_timeout;
            tokio::spawn(async move {
                // 许可一直持有到读数送出，保证 max_sessions = 1 时按到达顺序执行
                let _permit = permit;
                match serve_session(stream, peer, read_timeout).await {
                    Ok(reading) => {
                        if tx.send(reading).await.is_err() {
                            log::warn!("Actuator stopped, dropping reading from {}", peer);
                        }
                    }
                    Err(e) => log::warn!("Dropped connection from {}: {}", peer, e),
                }
            });
        }
    }
}

/// Read one payload, close the connection, parse.
async fn serve_session(
    mut stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
) -> Result<Reading, SessionError> {
    let raw = read_payload(&mut stream, read_timeout).await?;
    // 服务端不回写任何数据，读完即关闭
    drop(stream);

    let reading = Reading::from_payload(peer, &raw)?;
    log::info!("Reading from {}: {}", peer, reading.text());
    Ok(reading)
}

/// Read until `PAYLOAD_LEN` bytes, end of stream, or `limit` elapses.
///
/// Running out of time with nothing received is an error. Running out of time
/// after a partial payload returns what arrived, since some sensors leave the
/// socket open after writing.
pub async fn read_payload<R>(stream: &mut R, limit: Duration) -> Result<Vec<u8>, SessionError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; PAYLOAD_LEN];
    let mut filled = 0;
    let deadline = Instant::now() + limit;

    while filled < PAYLOAD_LEN {
        match timeout_at(deadline, stream.read(&mut buf[filled..])).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => filled += n,
            Ok(Err(e)) => return Err(SessionError::Io(e)),
            Err(_) if filled == 0 => return Err(SessionError::Timeout(limit)),
            Err(_) => break,
        }
    }

    Ok(buf[..filled].to_vec())
}
