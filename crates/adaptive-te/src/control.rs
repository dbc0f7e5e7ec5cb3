//! Line-oriented remote control over TCP
//!
//! One client at a time sends `Start`, `Stop` or `Reroute`, one per line.
//! Nothing is ever written back.

use adaptive_common::AdaptiveResult;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Remote command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Traffic session started
    Start,
    /// Traffic session stopped
    Stop,
    /// Recompute the shortest path now
    Reroute,
}

impl FromStr for ControlCommand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Start" => Ok(Self::Start),
            "Stop" => Ok(Self::Stop),
            "Reroute" => Ok(Self::Reroute),
            _ => Err(()),
        }
    }
}

/// Receiver of control commands
pub trait ControlTarget: Send + Sync {
    /// Handle `Start`
    fn start(&self);
    /// Handle `Stop`
    fn stop(&self);
    /// Handle `Reroute`
    fn reroute(&self);
}

/// Dispatch one command
pub fn dispatch(command: ControlCommand, target: &dyn ControlTarget) {
    tracing::info!(?command, "Control command");
    match command {
        ControlCommand::Start => target.start(),
        ControlCommand::Stop => target.stop(),
        ControlCommand::Reroute => target.reroute(),
    }
}

/// Longest accepted control line; longer lines are discarded
pub const MAX_LINE_LEN: usize = 256;

/// Read commands from one session until EOF
///
/// Lines are decoded lossily, so bytes that are not UTF-8 only spoil the
/// line they appear on. Lines longer than [`MAX_LINE_LEN`] are dropped
/// without buffering them.
pub async fn serve_session<R>(reader: R, target: &dyn ControlTarget) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(MAX_LINE_LEN);
    let mut discarding = false;

    loop {
        buf.clear();
        let n = (&mut reader)
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            break;
        }

        let complete = buf.last() == Some(&b'\n');
        if discarding {
            discarding = !complete;
            continue;
        }
        if !complete && n == MAX_LINE_LEN {
            tracing::debug!("Discarding control line over {} bytes", MAX_LINE_LEN);
            discarding = true;
            continue;
        }

        let line = String::from_utf8_lossy(&buf);
        match line.parse::<ControlCommand>() {
            Ok(command) => dispatch(command, target),
            Err(()) => tracing::debug!("Ignoring control line {:?}", line),
        }
    }
    Ok(())
}

/// TCP listener serving one control session at a time
pub struct RemoteControlChannel {
    listener: TcpListener,
    target: Arc<dyn ControlTarget>,
}

impl RemoteControlChannel {
    /// Bind the listen socket
    pub async fn bind(addr: SocketAddr, target: Arc<dyn ControlTarget>) -> AdaptiveResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Control channel listening on {}", listener.local_addr()?);
        Ok(Self { listener, target })
    }

    /// Bound address
    pub fn local_addr(&self) -> AdaptiveResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve sessions until `shutdown` flips
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };

            let (socket, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::warn!("Control accept failed: {}", e);
                    continue;
                }
            };
            tracing::info!("Control client connected from {}", peer);

            tokio::select! {
                result = serve_session(socket, self.target.as_ref()) => {
                    if let Err(e) = result {
                        tracing::warn!("Control session error: {}", e);
                    }
                }
                _ = shutdown.changed() => break,
            }
            tracing::info!("Control client {} disconnected", peer);
        }
        tracing::info!("Control channel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    #[derive(Default)]
    struct Recorder {
        commands: Mutex<Vec<ControlCommand>>,
    }

    impl Recorder {
        fn commands(&self) -> Vec<ControlCommand> {
            self.commands.lock().clone()
        }
    }

    impl ControlTarget for Recorder {
        fn start(&self) {
            self.commands.lock().push(ControlCommand::Start);
        }
        fn stop(&self) {
            self.commands.lock().push(ControlCommand::Stop);
        }
        fn reroute(&self) {
            self.commands.lock().push(ControlCommand::Reroute);
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!("Start".parse::<ControlCommand>(), Ok(ControlCommand::Start));
        assert_eq!("  Stop\r".parse::<ControlCommand>(), Ok(ControlCommand::Stop));
        assert_eq!("Reroute\n".parse::<ControlCommand>(), Ok(ControlCommand::Reroute));
        assert_eq!("start".parse::<ControlCommand>(), Err(()));
        assert_eq!("".parse::<ControlCommand>(), Err(()));
    }

    #[tokio::test]
    async fn test_session_dispatches_in_order() {
        let recorder = Recorder::default();
        let stream = tokio_test::io::Builder::new()
            .read(b"Start\r\nhello\n")
            .read(b"Rer")
            .read(b"oute\nStop\n")
            .build();

        serve_session(stream, &recorder).await.unwrap();
        assert_eq!(
            recorder.commands(),
            vec![ControlCommand::Start, ControlCommand::Reroute, ControlCommand::Stop]
        );
    }

    #[tokio::test]
    async fn test_session_read_error_ends_session() {
        let recorder = Recorder::default();
        let stream = tokio_test::io::Builder::new()
            .read(b"Start\n")
            .read_error(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
            .build();

        assert!(serve_session(stream, &recorder).await.is_err());
        assert_eq!(recorder.commands(), vec![ControlCommand::Start]);
    }

    #[tokio::test]
    async fn test_non_utf8_line_is_ignored() {
        let recorder = Recorder::default();
        let stream = tokio_test::io::Builder::new()
            .read(b"Start\n\xff\xfe garbage\nStop\n")
            .build();

        serve_session(stream, &recorder).await.unwrap();
        assert_eq!(recorder.commands(), vec![ControlCommand::Start, ControlCommand::Stop]);
    }

    #[tokio::test]
    async fn test_overlong_line_is_dropped() {
        let recorder = Recorder::default();
        let mut long = b"Reroute".repeat(MAX_LINE_LEN);
        long.push(b'\n');
        let stream = tokio_test::io::Builder::new()
            .read(b"Start\n")
            .read(&long)
            .read(b"Stop")
            .build();

        serve_session(stream, &recorder).await.unwrap();
        assert_eq!(recorder.commands(), vec![ControlCommand::Start, ControlCommand::Stop]);
    }

    async fn wait_for(recorder: &Recorder, count: usize) {
        for _ in 0..200 {
            if recorder.commands().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_next_client_served_after_disconnect() {
        let recorder = Arc::new(Recorder::default());
        let channel = RemoteControlChannel::bind(SocketAddr::from(([127, 0, 0, 1], 0)), recorder.clone())
            .await
            .unwrap();
        let addr = channel.local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(channel.run(rx));

        let mut first = TcpStream::connect(addr).await.unwrap();
        first.write_all(b"Start\n").await.unwrap();
        wait_for(&recorder, 1).await;
        drop(first);

        let mut second = TcpStream::connect(addr).await.unwrap();
        second.write_all(b"Stop\n").await.unwrap();
        wait_for(&recorder, 2).await;

        assert_eq!(recorder.commands(), vec![ControlCommand::Start, ControlCommand::Stop]);

        tx.send(true).unwrap();
        server.await.unwrap();
    }
}
