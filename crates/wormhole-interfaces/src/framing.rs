//! Async frame I/O over byte streams.
//!
//! Shared by the TCP sessions and by relay directions that write frames to a
//! local sink. Reading drives a [`FrameSynchronizer`] one byte at a time until
//! it enters the payload state, then waits for the whole declared payload in a
//! single exact read so short reads never surface.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use wormhole_core::constants::MAGIC;
use wormhole_core::{Frame, FrameSynchronizer};

/// Write `MAGIC`, the length byte, then the payload, and flush.
///
/// The three writes form one logical transmission. Returns the number of
/// bytes written.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(&MAGIC).await?;
    writer.write_all(&[frame.len_byte()]).await?;
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(frame.wire_len())
}

/// Read until `sync` completes a frame.
///
/// Heartbeats and bytes outside a frame are absorbed by the synchronizer.
/// End of stream surfaces as [`std::io::ErrorKind::UnexpectedEof`].
pub async fn read_frame<R>(reader: &mut R, sync: &mut FrameSynchronizer) -> std::io::Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        let remaining = sync.payload_remaining();
        if remaining > 0 {
            let mut payload = vec![0u8; remaining];
            reader.read_exact(&mut payload).await?;
            if let Some(frame) = sync.feed_slice(&payload).pop() {
                return Ok(frame);
            }
            continue;
        }

        let byte = reader.read_u8().await?;
        if let Some(frame) = sync.feed(byte) {
            return Ok(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let frame = Frame::new(vec![0xAA, 0xBB, 0xCC]).unwrap();

        let written = write_frame(&mut a, &frame).await.unwrap();
        assert_eq!(written, 8);

        let mut sync = FrameSynchronizer::new();
        let received = read_frame(&mut b, &mut sync).await.unwrap();
        assert_eq!(received, frame);
    }

    #[tokio::test]
    async fn read_skips_noise_and_heartbeats() {
        let mut data: Vec<u8> = vec![0x01, 0x53, 0x02];
        data.extend_from_slice(&Frame::heartbeat());
        data.extend_from_slice(&[0x53, 0x6E, 0x69, 0x66, 0x02, 0x10, 0x20]);
        let mut reader = &data[..];

        let mut sync = FrameSynchronizer::new();
        let frame = read_frame(&mut reader, &mut sync).await.unwrap();
        assert_eq!(frame.as_bytes(), &[0x10, 0x20]);
        assert_eq!(sync.heartbeats(), 1);
    }

    #[tokio::test]
    async fn payload_split_across_writes_is_not_short_read() {
        let (mut a, mut b) = tokio::io::duplex(64);
        let reader = tokio::spawn(async move {
            let mut sync = FrameSynchronizer::new();
            read_frame(&mut b, &mut sync).await
        });

        a.write_all(&[0x53, 0x6E, 0x69, 0x66, 0x04, 0x01]).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        a.write_all(&[0x02, 0x03, 0x04]).await.unwrap();

        let frame = reader.await.unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[0x01, 0x02, 0x03, 0x04]);
    }

    #[tokio::test]
    async fn eof_mid_frame_is_unexpected_eof() {
        let data = [0x53, 0x6E, 0x69, 0x66, 0x05, 0x01];
        let mut reader = &data[..];
        let mut sync = FrameSynchronizer::new();
        let err = read_frame(&mut reader, &mut sync).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
