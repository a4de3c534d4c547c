//! Length-prefixed msgpack framing: a 4-byte big-endian payload length
//! followed by one self-describing msgpack value.

use std::io::{self, ErrorKind};

use rmp_serde::{from_slice, Serializer};
use rmpv::Value;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame's payload; anything larger is treated as a
/// corrupt stream rather than buffered.
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Serializes `msg` into a framed buffer, length prefix included.
pub fn encode_frame<T: Serialize>(msg: &T) -> io::Result<Vec<u8>> {
    let mut framed = vec![0u8; 4];
    msg.serialize(&mut Serializer::new(&mut framed))
        .map_err(|err| io::Error::new(ErrorKind::InvalidData, err))?;
    let len = u32::try_from(framed.len() - 4)
        .map_err(|_| io::Error::new(ErrorKind::InvalidData, "frame too large"))?;
    framed[..4].copy_from_slice(&len.to_be_bytes());
    Ok(framed)
}

/// Decodes one framed value from `bytes`.
pub fn decode_frame(bytes: &[u8]) -> io::Result<Value> {
    from_slice(frame_payload(bytes)?).map_err(|err| io::Error::new(ErrorKind::InvalidData, err))
}

/// Reads one frame from `stream`, blocking until it is complete.
pub async fn read_frame<S>(stream: &mut S) -> io::Result<Value>
where
    S: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    stream.read_exact(&mut header).await?;
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(io::Error::new(ErrorKind::InvalidData, "frame too large"));
    }
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    from_slice(&payload).map_err(|err| io::Error::new(ErrorKind::InvalidData, err))
}

/// Writes `value` to `stream` as one frame and flushes.
pub async fn write_frame<S>(stream: &mut S, value: &Value) -> io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let framed = encode_frame(value)?;
    stream.write_all(&framed).await?;
    stream.flush().await
}

fn frame_payload(bytes: &[u8]) -> io::Result<&[u8]> {
    if bytes.len() < 4 {
        return Err(io::Error::new(
            ErrorKind::UnexpectedEof,
            "missing frame header",
        ));
    }
    let mut header = [0u8; 4];
    header.copy_from_slice(&bytes[..4]);
    let len = u32::from_be_bytes(header) as usize;
    bytes[4..]
        .get(..len)
        .ok_or_else(|| io::Error::new(ErrorKind::UnexpectedEof, "incomplete frame"))
}
