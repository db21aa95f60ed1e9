//! Generic conformance assertions for [`Transport`] implementations.
//!
//! These helpers check behavior every session must share whether it plays the
//! client or the server role.
//!
//! # Usage
//!
//! ```rust,ignore
//! use wormhole_interfaces::testing;
//!
//! let session = TcpClientSession::new(config);
//! testing::assert_pre_establish_conformance(&session);
//! session.establish().await;
//! testing::assert_frame_exchange(&mut session, &mut peer).await;
//! ```

use tokio::io::{AsyncRead, AsyncWrite};
use wormhole_core::{Frame, FrameSynchronizer};

use crate::error::InterfaceError;
use crate::framing::{read_frame, write_frame};
use crate::traits::Transport;

/// Assert that the session has a non-empty name.
pub fn assert_has_name(session: &impl Transport) {
    assert!(!session.name().is_empty(), "session name must not be empty");
}

/// Assert that a fresh session holds no connection and has not reconnected.
pub fn assert_pre_establish_conformance(session: &impl Transport) {
    assert_has_name(session);
    assert!(
        !session.is_connected(),
        "session should not be connected before establish()"
    );
    assert_eq!(session.reconnects(), 0, "fresh session reports reconnects");
}

/// Exchange one frame each way between `session` and the raw `peer` stream.
///
/// The peer side is driven with the plain framing helpers, so this also checks
/// that the session speaks the wire format byte for byte.
pub async fn assert_frame_exchange<T, P>(session: &mut T, peer: &mut P)
where
    T: Transport,
    P: AsyncRead + AsyncWrite + Unpin,
{
    let outbound = Frame::new(vec![0xAA, 0xBB, 0xCC]).expect("valid frame");
    let sent = session
        .send_frame(&outbound)
        .await
        .expect("send_frame on a live session");
    assert_eq!(sent, outbound.wire_len(), "send_frame byte count");

    let mut sync = FrameSynchronizer::new();
    let received = read_frame(peer, &mut sync).await.expect("peer reads frame");
    assert_eq!(received, outbound, "peer received a different frame");

    let inbound = Frame::new(vec![0x01, 0x02]).expect("valid frame");
    write_frame(peer, &inbound).await.expect("peer writes frame");
    let got = session.recv_frame().await.expect("recv_frame on a live session");
    assert_eq!(got, inbound, "session received a different frame");
    assert!(session.is_connected());
}

/// Assert that an operation on a severed link failed transiently.
pub fn assert_transient<T: std::fmt::Debug>(result: Result<T, InterfaceError>) {
    match result {
        Err(e) if e.is_transient() => {}
        Err(e) => panic!("expected a transient error, got: {e}"),
        Ok(v) => panic!("operation on a severed link reported success: {v:?}"),
    }
}
