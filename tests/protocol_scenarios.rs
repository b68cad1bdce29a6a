use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use remote_engine::agent::{Config, Engine};
use remote_engine::rig::{ManualClock, Recorder, Rig};
use remote_engine::transport::client::Controller;
use remote_engine::transport::{
    decode_status, status_channel, Command, DeliveryError, Endpoint, Status, BOOKMARK, FINISHED,
    REJECTED, STARTED,
};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;

struct Harness {
    engine: Arc<Engine>,
    endpoint: Arc<Endpoint>,
    clock: ManualClock,
    recorder: Recorder,
    tasks: Vec<JoinHandle<()>>,
}

impl Harness {
    async fn start(mut config: Config) -> Self {
        config.network.local_ip = "127.0.0.1".to_string();
        config.network.local_port = 0;

        let clock = ManualClock::new(0.0);
        let recorder = Recorder::new();
        let (sink, statuses) = status_channel();
        // one spoken word per second
        let engine = Arc::new(
            Engine::build(
                &config,
                Rig::recording(&recorder, 60.0),
                Arc::new(clock.clone()),
                sink,
            )
            .unwrap(),
        );
        let endpoint = Arc::new(Endpoint::bind(&config.network).await.unwrap());

        let receiver = {
            let endpoint = endpoint.clone();
            let dispatcher = engine.dispatcher();
            tokio::spawn(async move { endpoint.serve(&dispatcher).await })
        };
        let forwarder = {
            let endpoint = endpoint.clone();
            tokio::spawn(async move { endpoint.forward_statuses(statuses).await })
        };

        Self {
            engine,
            endpoint,
            clock,
            recorder,
            tasks: vec![receiver, forwarder],
        }
    }

    fn addr(&self) -> SocketAddr {
        self.endpoint.local_addr().unwrap()
    }

    async fn controller(&self) -> Controller {
        Controller::connect("127.0.0.1:0".parse().unwrap(), self.addr(), 4096)
            .await
            .unwrap()
    }

    /// Advance the clock in 20 ms steps, ticking every channel.
    fn run_for(&self, secs: f64) {
        let steps = (secs / 0.02).ceil() as usize;
        for _ in 0..steps {
            self.clock.advance(0.02);
            self.engine.tick();
        }
    }

    async fn wait_until_forgotten(&self, task_id: &str) -> bool {
        for _ in 0..100 {
            if matches!(
                self.endpoint.deliveries().route(task_id).await,
                Err(DeliveryError::NotFound(_))
            ) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn recv(controller: &Controller) -> Status {
    timeout(Duration::from_secs(2), controller.next_status())
        .await
        .expect("timed out waiting for status")
        .unwrap()
}

fn gaze(task: &str, x: &str, y: &str, z: &str, time: &str) -> Command {
    Command::new(task, "gaze")
        .with_param("x", x)
        .with_param("y", y)
        .with_param("z", z)
        .with_param("time", time)
}

#[tokio::test]
async fn gaze_command_starts_then_finishes() {
    let harness = Harness::start(Config::default()).await;
    let controller = harness.controller().await;

    controller.send(&gaze("T1", "0", "0", "1", "1000")).await.unwrap();
    let started = recv(&controller).await;
    assert_eq!((started.task_id.as_str(), started.status.as_str()), ("T1", STARTED));

    harness.run_for(1.04);
    let finished = recv(&controller).await;
    assert_eq!((finished.task_id.as_str(), finished.status.as_str()), ("T1", FINISHED));

    let (yaw, pitch) = harness.recorder.last_gaze().unwrap();
    assert!(yaw.abs() < 1e-6);
    assert!((pitch + 60.0).abs() < 1e-6);
    assert!(harness.wait_until_forgotten("T1").await);
}

#[tokio::test]
async fn unknown_command_type_is_rejected() {
    let harness = Harness::start(Config::default()).await;
    let controller = harness.controller().await;

    controller.send(&Command::new("X", "bogus")).await.unwrap();
    let status = recv(&controller).await;
    assert_eq!(status.task_id, "X");
    assert_eq!(status.status, REJECTED);
    assert_eq!(status.detail("reason"), Some("unsupported command type"));
}

#[tokio::test]
async fn speech_bookmark_arrives_with_its_word() {
    let harness = Harness::start(Config::default()).await;
    let controller = harness.controller().await;

    controller
        .send(&Command::new("S1", "speech").with_param("text", "hello $1 world"))
        .await
        .unwrap();
    assert_eq!(recv(&controller).await.status, STARTED);

    // word 0 is reported on the first tick, word 1 a second later
    harness.engine.tick();
    harness.clock.set(1.0);
    harness.engine.tick();
    let bookmark = recv(&controller).await;
    assert_eq!(bookmark.status, BOOKMARK);
    assert_eq!(bookmark.detail("id"), Some("1"));

    harness.clock.set(2.0);
    harness.engine.tick();
    assert_eq!(recv(&controller).await.status, FINISHED);
}

#[tokio::test]
async fn preemption_finishes_previous_task_first() {
    let harness = Harness::start(Config::default()).await;
    let controller = harness.controller().await;

    controller.send(&gaze("A", "1", "1", "0", "1000")).await.unwrap();
    assert_eq!(recv(&controller).await.status, STARTED);
    harness.run_for(0.5);

    controller.send(&gaze("B", "1", "-1", "0", "1000")).await.unwrap();
    let first = recv(&controller).await;
    let second = recv(&controller).await;
    assert_eq!((first.task_id.as_str(), first.status.as_str()), ("A", FINISHED));
    assert_eq!((second.task_id.as_str(), second.status.as_str()), ("B", STARTED));
}

#[tokio::test]
async fn stop_speech_always_finishes() {
    let harness = Harness::start(Config::default()).await;
    let controller = harness.controller().await;

    controller
        .send(&Command::new("S1", "speech").with_param("text", "a rather long sentence"))
        .await
        .unwrap();
    assert_eq!(recv(&controller).await.status, STARTED);

    controller.send(&Command::new("X1", "stopSpeech")).await.unwrap();
    let a = recv(&controller).await;
    let b = recv(&controller).await;
    assert_eq!((a.task_id.as_str(), a.status.as_str()), ("S1", FINISHED));
    assert_eq!((b.task_id.as_str(), b.status.as_str()), ("X1", FINISHED));
}

#[tokio::test]
async fn malformed_datagrams_are_dropped() {
    let harness = Harness::start(Config::default()).await;
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.connect(harness.addr()).await.unwrap();

    socket.send(b"<command task=\"no-type\"/>").await.unwrap();
    socket.send(b"not xml at all").await.unwrap();
    socket.send(&[0xff, 0xfe, 0x00]).await.unwrap();
    socket
        .send(b"<command task=\"ok\" type=\"bogus\"/>")
        .await
        .unwrap();

    let mut buf = [0u8; 1024];
    let read = timeout(Duration::from_secs(2), socket.recv(&mut buf))
        .await
        .unwrap()
        .unwrap();
    let status = decode_status(std::str::from_utf8(&buf[..read]).unwrap()).unwrap();
    assert_eq!(status.task_id, "ok");
    assert_eq!(status.status, REJECTED);
}

#[tokio::test]
async fn statuses_go_back_to_the_issuing_peer() {
    let harness = Harness::start(Config::default()).await;
    let first = harness.controller().await;
    let second = harness.controller().await;

    first.send(&Command::new("F1", "bogus")).await.unwrap();
    second.send(&Command::new("S1", "bogus")).await.unwrap();

    assert_eq!(recv(&first).await.task_id, "F1");
    assert_eq!(recv(&second).await.task_id, "S1");
}

#[tokio::test]
async fn disabled_channel_is_reported() {
    let mut config = Config::default();
    config.gaze.enabled = false;
    let harness = Harness::start(config).await;
    let controller = harness.controller().await;

    controller.send(&gaze("G1", "1", "0", "0", "100")).await.unwrap();
    let status = recv(&controller).await;
    assert_eq!(status.status, REJECTED);
    assert_eq!(status.detail("reason"), Some("gaze animation not supported"));
}

#[tokio::test]
async fn await_terminal_collects_the_whole_lifecycle() {
    let harness = Harness::start(Config::default()).await;
    let controller = harness.controller().await;

    controller
        .send(&Command::new("A1", "anim").with_param("name", "nod").with_param("time", "0"))
        .await
        .unwrap();
    assert_eq!(recv(&controller).await.status, STARTED);
    harness.engine.tick();

    let mut seen = Vec::new();
    let terminal = controller
        .await_terminal("A1", Duration::from_secs(2), |s| seen.push(s.status.clone()))
        .await
        .unwrap();
    assert_eq!(terminal.map(|s| s.status), Some(FINISHED.to_string()));
    assert_eq!(seen, vec![FINISHED.to_string()]);
}
