//! Connection state machine shared by every link

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Framed};
use tracing::{debug, info, warn};

use sublink_protocol::{Body, CodecError, Endpoint, Message, Tag};

use super::{Dialer, LinkDriver, LinkError, LinkState, TcpDialer, WorkerConfig};

/// What the inbox asked the engine to do
enum Command {
    Nothing,
    Initialize(Endpoint),
    Shutdown,
    /// Inbox closed; same as shutdown but nobody is listening
    Closed,
}

/// Where the run loop goes next
enum Flow<S> {
    /// `self.state` already names the next phase
    Next,
    Serve(S),
    Exit,
}

/// Generic link worker
///
/// Consumes messages addressed to its tag and emits status and data
/// messages addressed to `gui`.
pub struct ChannelWorker<L: LinkDriver, D: Dialer = TcpDialer> {
    driver: L,
    dialer: D,
    config: WorkerConfig,
    inbox: mpsc::UnboundedReceiver<Message>,
    outbox: mpsc::UnboundedSender<Message>,
    state: LinkState,
    endpoint: Option<Endpoint>,
    retry_count: u32,
}

impl<L: LinkDriver> ChannelWorker<L, TcpDialer> {
    pub fn new(
        driver: L,
        inbox: mpsc::UnboundedReceiver<Message>,
        outbox: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self {
            driver,
            dialer: TcpDialer::default(),
            config: WorkerConfig::default(),
            inbox,
            outbox,
            state: LinkState::Idle,
            endpoint: None,
            retry_count: 0,
        }
    }
}

impl<L: LinkDriver, D: Dialer> ChannelWorker<L, D> {
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the dialer used for every connect attempt
    pub fn with_dialer<D2: Dialer>(self, dialer: D2) -> ChannelWorker<L, D2> {
        ChannelWorker {
            driver: self.driver,
            dialer,
            config: self.config,
            inbox: self.inbox,
            outbox: self.outbox,
            state: self.state,
            endpoint: self.endpoint,
            retry_count: self.retry_count,
        }
    }

    pub fn tag(&self) -> Tag {
        L::TAG
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until `shutdown` arrives or the inbox closes
    pub async fn run(mut self) {
        info!(link = %L::TAG, "worker started");

        loop {
            let flow = match self.state {
                LinkState::Idle | LinkState::Failed => self.idle().await,
                LinkState::Connecting => self.connecting().await,
                LinkState::Disconnected => self.reconnecting().await,
                // Connected is only entered through Flow::Serve
                LinkState::Connected => {
                    self.state = LinkState::Disconnected;
                    Flow::Next
                }
            };

            let flow = match flow {
                Flow::Serve(stream) => self.serve(stream).await,
                other => other,
            };

            if let Flow::Exit = flow {
                break;
            }
        }

        info!(link = %L::TAG, state = %self.state, "worker stopped");
    }

    /// Send a message to `gui`; false once the router is gone
    fn emit(&self, body: Body) -> bool {
        self.outbox.send(Message::new(Tag::Gui, L::TAG, body)).is_ok()
    }

    fn dispatch(&mut self, msg: Message) -> Command {
        match msg.body {
            Body::Initialize(endpoint) => Command::Initialize(endpoint),
            Body::Shutdown => Command::Shutdown,
            body => {
                if !self.driver.on_message(&body) {
                    debug!(
                        link = %L::TAG,
                        source = %msg.source,
                        verb = body.verb(),
                        "ignoring message"
                    );
                }
                Command::Nothing
            }
        }
    }

    /// Handle whatever is already queued without waiting
    fn drain_inbox(&mut self) -> Command {
        loop {
            match self.inbox.try_recv() {
                Ok(msg) => match self.dispatch(msg) {
                    Command::Nothing => continue,
                    command => return command,
                },
                Err(TryRecvError::Empty) => return Command::Nothing,
                Err(TryRecvError::Disconnected) => return Command::Closed,
            }
        }
    }

    fn begin_connecting(&mut self, endpoint: Endpoint) {
        info!(link = %L::TAG, %endpoint, "connecting");
        self.endpoint = Some(endpoint);
        self.retry_count = 0;
        self.state = LinkState::Connecting;
    }

    async fn idle(&mut self) -> Flow<D::Stream> {
        loop {
            let command = match self.inbox.recv().await {
                Some(msg) => self.dispatch(msg),
                None => Command::Closed,
            };

            match command {
                Command::Initialize(endpoint) => {
                    self.begin_connecting(endpoint);
                    if !self.emit(Body::Connecting) {
                        return Flow::Exit;
                    }
                    return Flow::Next;
                }
                Command::Shutdown | Command::Closed => return Flow::Exit,
                Command::Nothing => {}
            }
        }
    }

    async fn connecting(&mut self) -> Flow<D::Stream> {
        let max_attempts = self.config.retry.max_attempts;

        loop {
            let Some(endpoint) = self.endpoint.clone() else {
                self.state = LinkState::Idle;
                return Flow::Next;
            };

            match self.dialer.dial(&endpoint).await {
                Ok(stream) => {
                    info!(link = %L::TAG, %endpoint, "connected");
                    self.retry_count = 0;
                    self.state = LinkState::Connected;
                    if !self.emit(Body::Connected) {
                        return Flow::Exit;
                    }
                    return Flow::Serve(stream);
                }
                Err(e) => {
                    self.retry_count += 1;
                    let err = LinkError::ConnectRefused {
                        attempt: self.retry_count,
                        reason: e.to_string(),
                    };
                    warn!(
                        link = %L::TAG,
                        attempt = self.retry_count,
                        max = max_attempts,
                        error = %err,
                        "connect attempt {}/{} failed",
                        self.retry_count,
                        max_attempts
                    );

                    if self.retry_count >= max_attempts {
                        warn!(link = %L::TAG, %endpoint, "giving up until re-initialized");
                        self.state = LinkState::Failed;
                        if !self.emit(Body::Disconnected) {
                            return Flow::Exit;
                        }
                        return Flow::Next;
                    }
                }
            }

            match self.drain_inbox() {
                Command::Initialize(endpoint) => self.begin_connecting(endpoint),
                Command::Shutdown | Command::Closed => return Flow::Exit,
                Command::Nothing => {}
            }
        }
    }

    async fn reconnecting(&mut self) -> Flow<D::Stream> {
        let delay = self.config.reconnect_delay;

        loop {
            let Some(endpoint) = self.endpoint.clone() else {
                self.state = LinkState::Idle;
                return Flow::Next;
            };

            match self.dialer.dial(&endpoint).await {
                Ok(stream) => {
                    info!(link = %L::TAG, %endpoint, "reconnected");
                    self.state = LinkState::Connected;
                    if !self.emit(Body::Connected) {
                        return Flow::Exit;
                    }
                    return Flow::Serve(stream);
                }
                Err(e) => {
                    debug!(link = %L::TAG, %endpoint, error = %e, "reconnect failed");
                }
            }

            match self.wait_listening(delay).await {
                Command::Initialize(endpoint) => {
                    self.begin_connecting(endpoint);
                    return Flow::Next;
                }
                Command::Shutdown | Command::Closed => return Flow::Exit,
                Command::Nothing => {}
            }
        }
    }

    /// Sleep for `delay` while still handling the inbox
    async fn wait_listening(&mut self, delay: Duration) -> Command {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;

                msg = self.inbox.recv() => {
                    let command = match msg {
                        Some(msg) => self.dispatch(msg),
                        None => Command::Closed,
                    };
                    if !matches!(command, Command::Nothing) {
                        return command;
                    }
                }

                _ = &mut sleep => return Command::Nothing,
            }
        }
    }

    /// Connected phase: poll, decode, emit, repeat
    async fn serve(&mut self, stream: D::Stream) -> Flow<D::Stream> {
        let mut framed = Framed::new(stream, self.driver.codec());
        let read_timeout = self.config.read_timeout;
        let malformed_limit = self.config.malformed_limit;
        let mut malformed = 0u32;

        if let Some(request) = self.driver.next_request() {
            if let Err(e) = framed.send(request).await {
                return self.link_dropped(LinkError::TransportClosed(e.to_string()));
            }
        }

        // Measured from the last reply, not from the last inbox message
        let deadline = tokio::time::sleep(read_timeout.unwrap_or_default());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;

                msg = self.inbox.recv() => {
                    let command = match msg {
                        Some(msg) => self.dispatch(msg),
                        None => Command::Closed,
                    };

                    match command {
                        Command::Nothing => {}
                        Command::Initialize(endpoint) => {
                            if !self.emit(Body::Disconnected) {
                                return Flow::Exit;
                            }
                            self.begin_connecting(endpoint);
                            return Flow::Next;
                        }
                        Command::Shutdown => {
                            self.emit(Body::Disconnected);
                            return Flow::Exit;
                        }
                        Command::Closed => return Flow::Exit,
                    }
                }

                _ = &mut deadline, if read_timeout.is_some() => {
                    let waited = read_timeout.unwrap_or_default();
                    return self.link_dropped(LinkError::TransportClosed(format!(
                        "no reply within {}ms",
                        waited.as_millis()
                    )));
                }

                reply = read_reply(&mut framed) => {
                    let reply = match reply {
                        Ok(reply) => reply,
                        Err(e) => return self.link_dropped(e),
                    };
                    if let Some(limit) = read_timeout {
                        deadline.as_mut().reset(tokio::time::Instant::now() + limit);
                    }

                    let request = match self.driver.on_reply(reply) {
                        Ok(cycle) => {
                            malformed = 0;
                            for record in cycle.records {
                                if !self.emit(record) {
                                    return Flow::Exit;
                                }
                            }
                            cycle.request
                        }
                        Err(LinkError::MalformedRecord(reason)) => {
                            malformed += 1;
                            warn!(
                                link = %L::TAG,
                                count = malformed,
                                limit = malformed_limit,
                                %reason,
                                "dropping malformed record"
                            );
                            if malformed >= malformed_limit {
                                return self.link_dropped(LinkError::TransportClosed(format!(
                                    "{} consecutive malformed records",
                                    malformed
                                )));
                            }
                            self.driver.next_request()
                        }
                        Err(e) => return self.link_dropped(e),
                    };

                    if let Some(request) = request {
                        if let Err(e) = framed.send(request).await {
                            return self.link_dropped(LinkError::TransportClosed(e.to_string()));
                        }
                    }
                }
            }
        }
    }

    fn link_dropped(&mut self, err: LinkError) -> Flow<D::Stream> {
        warn!(link = %L::TAG, error = %err, "link dropped");
        self.state = LinkState::Disconnected;
        if !self.emit(Body::Disconnected) {
            return Flow::Exit;
        }
        Flow::Next
    }
}

async fn read_reply<S, C>(framed: &mut Framed<S, C>) -> Result<C::Item, LinkError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: Decoder<Error = CodecError>,
{
    match framed.next().await {
        Some(Ok(item)) => Ok(item),
        Some(Err(e)) => Err(LinkError::TransportClosed(e.to_string())),
        None => Err(LinkError::TransportClosed("peer closed connection".into())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;

    use sublink_protocol::{TelemetryRecord, ThrusterVector};

    use super::*;
    use crate::worker::{PilotLink, RetryPolicy, TelemetryLink, VideoLink};

    const WAIT: Duration = Duration::from_secs(5);

    /// Dialer that refuses every attempt and counts them
    #[derive(Clone, Default)]
    struct RefusingDialer {
        attempts: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Dialer for RefusingDialer {
        type Stream = TcpStream;

        async fn dial(&self, _endpoint: &Endpoint) -> std::io::Result<TcpStream> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused",
            ))
        }
    }

    struct Harness {
        tag: Tag,
        to_worker: mpsc::UnboundedSender<Message>,
        from_worker: mpsc::UnboundedReceiver<Message>,
    }

    impl Harness {
        fn send(&self, body: Body) {
            self.to_worker
                .send(Message::new(self.tag, Tag::Main, body))
                .unwrap();
        }

        async fn next(&mut self) -> Message {
            timeout(WAIT, self.from_worker.recv())
                .await
                .expect("worker went quiet")
                .expect("worker outbox closed")
        }

        async fn next_body(&mut self) -> Body {
            self.next().await.body
        }
    }

    fn worker<L: LinkDriver>(driver: L) -> (ChannelWorker<L>, Harness) {
        let (to_worker, inbox) = mpsc::unbounded_channel();
        let (outbox, from_worker) = mpsc::unbounded_channel();
        let worker = ChannelWorker::new(driver, inbox, outbox).with_config(WorkerConfig {
            reconnect_delay: Duration::from_millis(20),
            ..WorkerConfig::default()
        });
        (
            worker,
            Harness {
                tag: L::TAG,
                to_worker,
                from_worker,
            },
        )
    }

    async fn listener() -> (TcpListener, Endpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, Endpoint::new("127.0.0.1", port))
    }

    #[tokio::test]
    async fn test_initial_connect_bounded_by_retry_policy() {
        let dialer = RefusingDialer::default();
        let attempts = dialer.attempts.clone();
        let (worker, mut h) = worker(VideoLink::new());
        let handle = worker.with_dialer(dialer).spawn();

        h.send(Body::Initialize(Endpoint::new("127.0.0.1", 9)));

        assert_eq!(h.next_body().await, Body::Connecting);
        let msg = h.next().await;
        assert_eq!(msg.body, Body::Disconnected);
        assert_eq!(msg.source, Tag::Video);
        assert_eq!(msg.destination, Tag::Gui);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        // Failed: no more attempts until re-initialized
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        h.send(Body::Initialize(Endpoint::new("127.0.0.1", 9)));
        assert_eq!(h.next_body().await, Body::Connecting);
        assert_eq!(h.next_body().await, Body::Disconnected);
        assert_eq!(attempts.load(Ordering::SeqCst), 6);

        h.send(Body::Shutdown);
        timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_custom_retry_budget() {
        let dialer = RefusingDialer::default();
        let attempts = dialer.attempts.clone();
        let (worker, mut h) = worker(TelemetryLink::new());
        let worker = worker
            .with_config(WorkerConfig {
                retry: RetryPolicy { max_attempts: 5 },
                ..WorkerConfig::default()
            })
            .with_dialer(dialer);
        let _handle = worker.spawn();

        h.send(Body::Initialize(Endpoint::new("127.0.0.1", 9)));
        assert_eq!(h.next_body().await, Body::Connecting);
        assert_eq!(h.next_body().await, Body::Disconnected);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_shutdown_while_idle() {
        let (worker, h) = worker(VideoLink::new());
        let handle = worker.spawn();
        h.send(Body::Shutdown);
        timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_inbox_closed_ends_worker() {
        let (worker, h) = worker(VideoLink::new());
        let handle = worker.spawn();
        drop(h);
        timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_video_frames_and_polls() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(VideoLink::new());
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);

        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        for payload in [&b"frame-one"[..], &b"frame-two"[..]] {
            let mut poll = [0u8; 1];
            peer.read_exact(&mut poll).await.unwrap();
            assert_eq!(&poll, b"1");

            peer.write_all(&(payload.len() as u32).to_be_bytes())
                .await
                .unwrap();
            peer.write_all(payload).await.unwrap();

            match h.next_body().await {
                Body::Frame(frame) => assert_eq!(&frame[..], payload),
                other => panic!("expected frame, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_reconnect_after_drop() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(TelemetryLink::new());
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);

        let (peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);
        drop(peer);

        assert_eq!(h.next_body().await, Body::Disconnected);

        // Still listening, so the worker comes back by itself
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        let mut poll = [0u8; 1];
        peer.read_exact(&mut poll).await.unwrap();
        let record = TelemetryRecord {
            pressure: 1001.0,
            ..Default::default()
        };
        peer.write_all(&record.to_bytes()).await.unwrap();
        assert_eq!(h.next_body().await, Body::Telemetry(record));
    }

    #[tokio::test]
    async fn test_initialize_while_connected_moves_endpoint() {
        let (first, first_endpoint) = listener().await;
        let (second, second_endpoint) = listener().await;
        let (worker, mut h) = worker(VideoLink::new());
        let _handle = worker.spawn();

        h.send(Body::Initialize(first_endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (_peer, _) = timeout(WAIT, first.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        h.send(Body::Initialize(second_endpoint));
        assert_eq!(h.next_body().await, Body::Disconnected);
        let (_peer, _) = timeout(WAIT, second.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);
    }

    #[tokio::test]
    async fn test_shutdown_while_connected_reports_disconnect() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(VideoLink::new());
        let handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (_peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        h.send(Body::Shutdown);
        assert_eq!(h.next_body().await, Body::Disconnected);
        timeout(WAIT, handle).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_limit_forces_reconnect() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(VideoLink::new());
        let worker = worker.with_config(WorkerConfig {
            malformed_limit: 2,
            reconnect_delay: Duration::from_millis(20),
            ..WorkerConfig::default()
        });
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        // Two empty frames, each answered by a fresh poll
        for _ in 0..2 {
            let mut poll = [0u8; 1];
            peer.read_exact(&mut poll).await.unwrap();
            peer.write_all(&0u32.to_be_bytes()).await.unwrap();
        }

        assert_eq!(h.next_body().await, Body::Disconnected);
    }

    #[tokio::test]
    async fn test_read_timeout_drops_link() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(TelemetryLink::new());
        let worker = worker.with_config(WorkerConfig {
            read_timeout: Some(Duration::from_millis(50)),
            reconnect_delay: Duration::from_secs(60),
            ..WorkerConfig::default()
        });
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (_peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        // Never answer the poll
        assert_eq!(h.next_body().await, Body::Disconnected);
    }

    #[tokio::test]
    async fn test_read_timeout_holds_under_inbox_traffic() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(PilotLink::new());
        let worker = worker.with_config(WorkerConfig {
            read_timeout: Some(Duration::from_millis(100)),
            reconnect_delay: Duration::from_secs(60),
            ..WorkerConfig::default()
        });
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        // Peer stays silent: no ready byte ever
        let (_peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        let to_worker = h.to_worker.clone();
        let chatter = tokio::spawn(async move {
            loop {
                let msg =
                    Message::new(Tag::Pilot, Tag::Gui, Body::Control(ThrusterVector::NEUTRAL));
                if to_worker.send(msg).is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
        });

        let msg = timeout(Duration::from_secs(1), h.from_worker.recv())
            .await
            .expect("read timeout never fired")
            .unwrap();
        assert_eq!(msg.body, Body::Disconnected);
        chatter.abort();
    }

    #[tokio::test]
    async fn test_reconnect_after_serving_records() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(TelemetryLink::new());
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        for n in 0..3 {
            let mut poll = [0u8; 1];
            peer.read_exact(&mut poll).await.unwrap();
            let record = TelemetryRecord {
                pressure: 1000.0 + n as f64,
                ..Default::default()
            };
            peer.write_all(&record.to_bytes()).await.unwrap();
            assert_eq!(h.next_body().await, Body::Telemetry(record));
        }
        drop(peer);

        // One disconnect, then back without a fresh initialize
        assert_eq!(h.next_body().await, Body::Disconnected);
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        let mut poll = [0u8; 1];
        peer.read_exact(&mut poll).await.unwrap();
        let record = TelemetryRecord {
            pressure: 999.0,
            ..Default::default()
        };
        peer.write_all(&record.to_bytes()).await.unwrap();
        assert_eq!(h.next_body().await, Body::Telemetry(record));
        assert!(h.from_worker.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_pilot_resends_last_vector() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(PilotLink::new());
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        let vector = ThrusterVector::new([10, 20, 30, -10, -20, -30]).unwrap();
        h.send(Body::Control(vector));
        // Let the worker take the control message before the first ready byte
        tokio::time::sleep(Duration::from_millis(50)).await;

        for _ in 0..3 {
            peer.write_all(b"1").await.unwrap();
            let mut raw = [0u8; 6];
            timeout(WAIT, peer.read_exact(&mut raw))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(raw, vector.to_bytes());
        }
    }

    #[tokio::test]
    async fn test_pilot_unexpected_byte_drops_link() {
        let (listener, endpoint) = listener().await;
        let (worker, mut h) = worker(PilotLink::new());
        let worker = worker.with_config(WorkerConfig {
            reconnect_delay: Duration::from_secs(60),
            ..WorkerConfig::default()
        });
        let _handle = worker.spawn();

        h.send(Body::Initialize(endpoint));
        assert_eq!(h.next_body().await, Body::Connecting);
        let (mut peer, _) = timeout(WAIT, listener.accept()).await.unwrap().unwrap();
        assert_eq!(h.next_body().await, Body::Connected);

        peer.write_all(b"x").await.unwrap();
        assert_eq!(h.next_body().await, Body::Disconnected);
    }
}
