//! End-to-end tests over real sockets: clients speak the line-delimited
//! JSON protocol against a relay running the full server stack.

use std::sync::Arc;
use tokio::net::TcpListener;
use tongyeok::config::Config;
use tongyeok::lang::Language;
use tongyeok::relay::coordinator::Coordinator;
use tongyeok::relay::protocol::ServerMessage;
use tongyeok::relay::server::serve;
use tongyeok::relay::RelayClient;
use tongyeok::translate::{MockGateway, TranslationGateway};

async fn start_relay(secret: &str) -> (String, Arc<MockGateway>) {
    let mut config = Config::default();
    config.auth.secret = secret.to_string();
    // Keep the environment out of tests
    config.auth.secret_env = "TONGYEOK_TEST_SECRET_UNSET".to_string();

    let gateway = Arc::new(MockGateway::new());
    let gateway_dyn: Arc<dyn TranslationGateway> = gateway.clone();
    let (coordinator, events) = Coordinator::new(&config, gateway_dyn);
    tokio::spawn(coordinator.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        let _ = serve(listener, events).await;
    });
    (addr, gateway)
}

/// Read server messages until one matches, panicking on disconnect.
async fn recv_until<F>(client: &mut RelayClient, mut pred: F) -> ServerMessage
where
    F: FnMut(&ServerMessage) -> bool,
{
    loop {
        match client.recv().await.unwrap() {
            Some(message) if pred(&message) => return message,
            Some(_) => continue,
            None => panic!("relay closed the connection"),
        }
    }
}

#[tokio::test]
async fn publisher_to_subscriber_roundtrip() {
    let (addr, gateway) = start_relay("hunter2").await;

    let mut subscriber = RelayClient::connect(&addr).await.unwrap();
    let mut publisher = RelayClient::connect(&addr).await.unwrap();
    publisher.authenticate("hunter2").await.unwrap();

    publisher.send_fragment("안녕하세요", true).await.unwrap();

    let message = recv_until(&mut subscriber, |m| {
        matches!(m, ServerMessage::Translation { .. })
    })
    .await;
    let ServerMessage::Translation { event } = message else {
        unreachable!();
    };
    assert!(event.is_final);
    assert_eq!(event.source_text, "안녕하세요");
    assert_eq!(event.source_lang, Language::Korean);
    assert_eq!(event.target_lang, Language::English);
    assert_eq!(event.translated_text, "en:안녕하세요");

    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn publisher_receives_its_own_broadcast() {
    let (addr, _gateway) = start_relay("hunter2").await;

    let mut publisher = RelayClient::connect(&addr).await.unwrap();
    publisher.authenticate("hunter2").await.unwrap();
    publisher.send_fragment("hello world", true).await.unwrap();

    let message = recv_until(&mut publisher, |m| {
        matches!(m, ServerMessage::Translation { .. })
    })
    .await;
    let ServerMessage::Translation { event } = message else {
        unreachable!();
    };
    assert_eq!(event.source_lang, Language::English);
    assert_eq!(event.target_lang, Language::Korean);
}

#[tokio::test]
async fn subscriber_count_announced_to_new_connection() {
    let (addr, _gateway) = start_relay("hunter2").await;

    let mut first = RelayClient::connect(&addr).await.unwrap();
    let message = recv_until(&mut first, |m| {
        matches!(m, ServerMessage::SubscriberCount { .. })
    })
    .await;
    assert_eq!(message, ServerMessage::SubscriberCount { count: 1 });

    let mut second = RelayClient::connect(&addr).await.unwrap();
    let message = recv_until(&mut second, |m| {
        matches!(m, ServerMessage::SubscriberCount { .. })
    })
    .await;
    assert_eq!(message, ServerMessage::SubscriberCount { count: 2 });

    // The first connection hears about the second
    let message = recv_until(&mut first, |m| {
        matches!(m, ServerMessage::SubscriberCount { count: 2 })
    })
    .await;
    assert_eq!(message, ServerMessage::SubscriberCount { count: 2 });
}

#[tokio::test]
async fn second_authenticator_takes_over_without_closing_the_first() {
    let (addr, gateway) = start_relay("hunter2").await;

    let mut first = RelayClient::connect(&addr).await.unwrap();
    first.authenticate("hunter2").await.unwrap();

    let mut second = RelayClient::connect(&addr).await.unwrap();
    second.authenticate("hunter2").await.unwrap();

    // The demoted publisher is rejected but still connected
    first.send_fragment("hello", true).await.unwrap();
    let message = recv_until(&mut first, |m| matches!(m, ServerMessage::Error { .. })).await;
    let ServerMessage::Error { reason } = message else {
        unreachable!();
    };
    assert!(reason.contains("not the active publisher"));
    assert!(gateway.calls().is_empty());

    // It keeps receiving broadcasts as a subscriber
    second.send_fragment("real fragment", true).await.unwrap();
    let message = recv_until(&mut first, |m| {
        matches!(m, ServerMessage::Translation { .. })
    })
    .await;
    let ServerMessage::Translation { event } = message else {
        unreachable!();
    };
    assert_eq!(event.source_text, "real fragment");
}
