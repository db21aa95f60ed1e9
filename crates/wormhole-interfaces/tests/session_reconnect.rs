//! Client and server sessions talking to each other over loopback.

use std::time::Duration;

use wormhole_core::Frame;
use wormhole_interfaces::testing::assert_transient;
use wormhole_interfaces::{
    TcpClientConfig, TcpClientSession, TcpServerConfig, TcpServerSession, Transport,
};

const FAST: Duration = Duration::from_millis(50);

fn client_for(addr: std::net::SocketAddr) -> TcpClientSession {
    TcpClientSession::new(
        TcpClientConfig::new("uplink", addr.to_string())
            .with_reconnect_wait(FAST)
            .with_connect_timeout(Duration::from_millis(500)),
    )
}

async fn server_at(name: &str, addr: std::net::SocketAddr) -> TcpServerSession {
    TcpServerSession::bind(TcpServerConfig::new(name, addr).with_reconnect_wait(FAST))
        .await
        .unwrap()
}

#[tokio::test]
async fn frame_crosses_from_client_to_server() {
    let mut server = server_at("downlink", "127.0.0.1:0".parse().unwrap()).await;
    let mut client = client_for(server.local_addr());

    let receiver = tokio::spawn(async move {
        let frame = server.recv_frame().await.unwrap();
        (server, frame)
    });

    let frame = Frame::new(vec![0xAA, 0xBB, 0xCC]).unwrap();
    assert_eq!(client.send_frame(&frame).await.unwrap(), 8);

    let (server, received) = receiver.await.unwrap();
    assert_eq!(received.as_bytes(), &[0xAA, 0xBB, 0xCC]);
    assert!(server.is_connected());
}

#[tokio::test]
async fn client_survives_server_restart() {
    let mut server = server_at("first", "127.0.0.1:0".parse().unwrap()).await;
    let addr = server.local_addr();
    let mut client = client_for(addr);

    let receiver = tokio::spawn(async move {
        let frame = server.recv_frame().await.unwrap();
        (server, frame)
    });
    let first = Frame::new(vec![0x01]).unwrap();
    client.send_frame(&first).await.unwrap();
    let (server, received) = receiver.await.unwrap();
    assert_eq!(received, first);

    // Kill the peer, then bring a new one up on the same port a bit later.
    drop(server);
    let restarted = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut server = server_at("second", addr).await;
        server.recv_frame().await.unwrap()
    });

    assert_transient(client.recv_frame().await);
    assert_eq!(client.reconnects(), 1);
    assert!(client.is_connected());

    let second = Frame::new(vec![0x02, 0x03]).unwrap();
    client.send_frame(&second).await.unwrap();
    let received = tokio::time::timeout(Duration::from_secs(5), restarted)
        .await
        .expect("restarted server never received the frame")
        .unwrap();
    assert_eq!(received, second);
}

#[tokio::test]
async fn send_on_severed_link_is_transient_then_recovers() {
    use tokio::io::AsyncReadExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut client = client_for(listener.local_addr().unwrap());
    client.establish().await;
    let (peer, _) = listener.accept().await.unwrap();
    drop(peer);

    // The kernel may accept a write or two after the peer closed; the failure
    // surfaces once the reset arrives.
    let frame = Frame::new(vec![0xAA, 0xBB, 0xCC]).unwrap();
    let mut failure = None;
    for _ in 0..50 {
        match client.send_frame(&frame).await {
            Ok(n) => assert_eq!(n, 8),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let failure = failure.expect("sending on a severed link never failed");
    assert!(failure.is_transient(), "expected a transient error, got: {failure}");
    assert_eq!(client.reconnects(), 1);
    assert!(client.is_connected());

    // The session already reconnected; the listener backlog holds the new
    // connection.
    assert_eq!(client.send_frame(&frame).await.unwrap(), 8);
    let (mut peer, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
        .await
        .expect("client never reconnected")
        .unwrap();
    let mut wire = [0u8; 8];
    peer.read_exact(&mut wire).await.unwrap();
    assert_eq!(wire, [0x53, 0x6E, 0x69, 0x66, 0x03, 0xAA, 0xBB, 0xCC]);
}
