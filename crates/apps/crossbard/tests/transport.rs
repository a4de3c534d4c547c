//! TCP transport behavior and a full daemon round trip over a real socket.

use std::sync::Arc;
use std::time::Duration;

use crossbar_api::{Message, ServerTransport, StubBroker};
use crossbar_daemon::codec;
use crossbar_daemon::transport::TcpTransport;
use crossbar_rpc::{RpcConfig, RpcServer};
use rmpv::Value;
use tokio::net::TcpStream;
use tokio::time;

fn request(id: i64, method: &str, params: Vec<Value>) -> Value {
    Value::Map(vec![
        (Value::from("id"), Value::from(id)),
        (Value::from("method"), Value::from(method)),
        (Value::from("params"), Value::Array(params)),
    ])
}

fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value
        .as_map()?
        .iter()
        .find(|(key, _)| key.as_str() == Some(name))
        .map(|(_, value)| value)
}

#[tokio::test]
async fn transport_delivers_frames_and_routes_replies() {
    let transport = TcpTransport::bind("127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("bind");

    // Nothing connected yet: the bounded wait elapses quietly.
    assert_eq!(
        transport.recv(Duration::from_millis(30)).await.expect("recv"),
        None
    );

    let mut client = TcpStream::connect(transport.local_addr())
        .await
        .expect("connect");
    let envelope = request(1, "list", vec![Value::from("sid"), Value::from("*")]);
    codec::write_frame(&mut client, &envelope).await.expect("write");

    let message = time::timeout(Duration::from_secs(2), transport.recv(Duration::from_secs(1)))
        .await
        .expect("recv in time")
        .expect("recv")
        .expect("message");
    assert_eq!(message.body, envelope);

    let reply_body = Value::Map(vec![(Value::from("jsonrpc"), Value::from("2.0"))]);
    transport
        .send(Message::with_body(message.peer, reply_body.clone()))
        .await
        .expect("send");
    let reply = time::timeout(Duration::from_secs(2), codec::read_frame(&mut client))
        .await
        .expect("reply in time")
        .expect("read");
    assert_eq!(reply, reply_body);

    // Responses for peers that are gone are dropped, not errors.
    transport
        .send(Message::with_body(9999, Value::Nil))
        .await
        .expect("send to vanished peer");

    transport.close();
}

#[tokio::test]
async fn daemon_stack_answers_challenge_and_unknown_methods() {
    let transport = TcpTransport::bind("127.0.0.1:0".parse().expect("addr"))
        .await
        .expect("bind");
    let server = RpcServer::start(
        transport.clone(),
        Arc::new(StubBroker),
        RpcConfig {
            recv_timeout_us: 20_000,
            num_workers: 2,
        },
    );

    let mut client = TcpStream::connect(transport.local_addr())
        .await
        .expect("connect");

    // First accepted connection gets peer id 1, so the token is fixed.
    codec::write_frame(&mut client, &request(1, "challenge", vec![]))
        .await
        .expect("write");
    let reply = time::timeout(Duration::from_secs(2), codec::read_frame(&mut client))
        .await
        .expect("reply in time")
        .expect("read");
    assert_eq!(field(&reply, "jsonrpc"), Some(&Value::from("2.0")));
    assert_eq!(field(&reply, "id"), Some(&Value::from(1)));
    let result = field(&reply, "result").expect("result");
    assert_eq!(field(result, "token"), Some(&Value::from("00000001")));

    codec::write_frame(&mut client, &request(2, "frobnicate", vec![]))
        .await
        .expect("write");
    let reply = time::timeout(Duration::from_secs(2), codec::read_frame(&mut client))
        .await
        .expect("reply in time")
        .expect("read");
    let error = field(&reply, "error").expect("error");
    assert_eq!(field(error, "code"), Some(&Value::from(-22)));
    assert_eq!(field(error, "str"), Some(&Value::from("Invalid Method")));
    assert!(field(&reply, "result").is_none());

    server.shutdown().await;
    transport.close();
}
