//! 接口回环测试
//!
//! 在本地回环地址上启动真实接口，用 tokio-tungstenite / TcpStream 客户端驱动。

use futures_util::{SinkExt, StreamExt};
use gripper_driver::{
    CommandBus, InboundMessage, InterfaceAdapter, InterfaceHooks, LoopLink, SharedFlags,
};
use gripper_interface::{TcpLineInterface, WebSocketInterface};
use gripper_protocol::InputStatus;
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

const RECV: Duration = Duration::from_secs(2);

struct Harness {
    flags: SharedFlags,
    loop_link: LoopLink,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    fn start(interface: Box<dyn InterfaceAdapter>) -> Self {
        let bus = CommandBus::new();
        let flags = SharedFlags::new();
        let link = bus.interface_link();
        let hooks = InterfaceHooks {
            run: flags.run_accessor(),
            set_connected: flags.connected_setter(),
        };
        let thread = std::thread::spawn(move || interface.run(link, hooks));
        Self {
            flags,
            loop_link: bus.loop_link(),
            thread: Some(thread),
        }
    }

    fn recv(&self) -> InboundMessage {
        self.loop_link.recv_timeout(RECV).unwrap()
    }

    fn stop(mut self) {
        self.flags.request_shutdown();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

fn status(position: u8) -> InputStatus {
    InputStatus {
        activation_status: 1,
        gripper_status: 3,
        actual_position: position,
        ..InputStatus::default()
    }
}

fn ws_url(addr: SocketAddr) -> String {
    format!("ws://{}", addr)
}

#[tokio::test]
async fn websocket_commands_and_clean_close() {
    let iface = WebSocketInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = iface.local_addr();
    let harness = Harness::start(Box::new(iface));

    let (mut ws, _) = tokio_tungstenite::connect_async(ws_url(addr)).await.unwrap();
    ws.send(Message::Text("c".into())).await.unwrap();
    ws.send(Message::Text("  128 ".into())).await.unwrap();
    ws.send(Message::Text("   ".into())).await.unwrap();
    ws.send(Message::Text("o".into())).await.unwrap();

    assert_eq!(harness.recv(), InboundMessage::Command("c".into()));
    assert_eq!(harness.recv(), InboundMessage::Command("128".into()));
    // 空消息被忽略
    assert_eq!(harness.recv(), InboundMessage::Command("o".into()));
    assert!(harness.flags.is_connected());

    ws.close(None).await.unwrap();
    assert_eq!(harness.recv(), InboundMessage::Termination(true));

    harness.stop();
}

#[tokio::test]
async fn websocket_relistens_after_termination() {
    let iface = WebSocketInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = iface.local_addr();
    let harness = Harness::start(Box::new(iface));

    for round in 0..2 {
        let (mut ws, _) = tokio_tungstenite::connect_async(ws_url(addr)).await.unwrap();
        ws.send(Message::Text(format!("{}", round))).await.unwrap();
        assert_eq!(harness.recv(), InboundMessage::Command(round.to_string()));
        ws.close(None).await.unwrap();
        assert_eq!(harness.recv(), InboundMessage::Termination(true));
    }
    assert!(!harness.flags.is_connected());

    harness.stop();
}

#[tokio::test]
async fn websocket_new_client_receives_latest_status() {
    let iface = WebSocketInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = iface.local_addr();
    let harness = Harness::start(Box::new(iface));

    // 无客户端时积压的状态只保留最新一条
    harness.loop_link.push_status(status(10));
    harness.loop_link.push_status(status(20));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(ws_url(addr)).await.unwrap();
    let frame = tokio::time::timeout(RECV, ws.next()).await.unwrap().unwrap().unwrap();
    let Message::Text(text) = frame else {
        panic!("Expected text frame, got {:?}", frame);
    };
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["actual_position"], 20);

    // 连接期间的新状态实时转发
    harness.loop_link.push_status(status(30));
    let frame = tokio::time::timeout(RECV, ws.next()).await.unwrap().unwrap().unwrap();
    let Message::Text(text) = frame else {
        panic!("Expected text frame, got {:?}", frame);
    };
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["actual_position"], 30);
    assert_eq!(value["gripper_status"], 3);

    ws.close(None).await.unwrap();
    harness.stop();
}

#[tokio::test]
async fn websocket_invalid_binary_frame_is_abnormal() {
    let iface = WebSocketInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = iface.local_addr();
    let harness = Harness::start(Box::new(iface));

    let (mut ws, _) = tokio_tungstenite::connect_async(ws_url(addr)).await.unwrap();
    ws.send(Message::Binary(vec![0xFF, 0xFE])).await.unwrap();
    assert_eq!(harness.recv(), InboundMessage::Termination(false));

    harness.stop();
}

#[tokio::test]
async fn tcp_line_commands_and_status() {
    let iface = TcpLineInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = iface.local_addr();
    let harness = Harness::start(Box::new(iface));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    writer.write_all(b"a\n\n c \r\n255\n").await.unwrap();
    assert_eq!(harness.recv(), InboundMessage::Command("a".into()));
    assert_eq!(harness.recv(), InboundMessage::Command("c".into()));
    assert_eq!(harness.recv(), InboundMessage::Command("255".into()));

    harness.loop_link.push_status(status(99));
    let line = tokio::time::timeout(RECV, lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(value["actual_position"], 99);

    writer.shutdown().await.unwrap();
    assert_eq!(harness.recv(), InboundMessage::Termination(true));

    harness.stop();
}

#[tokio::test]
async fn tcp_line_invalid_utf8_terminates_connection_only() {
    let iface = TcpLineInterface::bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let addr = iface.local_addr();
    let harness = Harness::start(Box::new(iface));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(&[0xC3, 0x28, b'\n']).await.unwrap();
    assert_eq!(harness.recv(), InboundMessage::Termination(false));

    // 监听仍然可用
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"o\n").await.unwrap();
    assert_eq!(harness.recv(), InboundMessage::Command("o".into()));

    harness.stop();
}
