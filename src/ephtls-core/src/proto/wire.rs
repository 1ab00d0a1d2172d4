//! Little-endian fixed-width integers and exact-length byte runs.
//!
//! Reads either fill the whole buffer or fail with [`ProtoError::Truncated`];
//! writes either move every byte or fail with [`ProtoError::ShortWrite`].

use super::ProtoError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub async fn write_u16<W>(writer: &mut W, value: u16) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_exact(writer, &value.to_le_bytes()).await
}

pub async fn write_u32<W>(writer: &mut W, value: u32) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    write_exact(writer, &value.to_le_bytes()).await
}

pub async fn read_u16<R>(reader: &mut R) -> Result<u16, ProtoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; 2];
    read_exact(reader, &mut buf).await?;
    Ok(u16::from_le_bytes(buf))
}

pub async fn read_u32<R>(reader: &mut R) -> Result<u32, ProtoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf).await?;
    Ok(u32::from_le_bytes(buf))
}

/// Write all of `buf`, failing if the writer stops accepting bytes.
pub async fn write_exact<W>(writer: &mut W, buf: &[u8]) -> Result<(), ProtoError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut written = 0;
    while written < buf.len() {
        let n = writer.write(&buf[written..]).await?;
        if n == 0 {
            return Err(ProtoError::ShortWrite {
                expected: buf.len(),
                written,
            });
        }
        written += n;
    }
    Ok(())
}

/// Fill `buf` completely.
pub async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ProtoError::Truncated {
            expected: buf.len(),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Read exactly `len` bytes into a fresh buffer.
///
/// The buffer grows as data arrives instead of being allocated up front, so a
/// bogus length from the peer costs nothing until the bytes actually show up.
pub async fn read_frame<R>(reader: &mut R, len: usize) -> Result<Vec<u8>, ProtoError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::with_capacity(len.min(64 * 1024));
    (&mut *reader).take(len as u64).read_to_end(&mut buf).await?;
    if buf.len() != len {
        return Err(ProtoError::Truncated { expected: len });
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    #[tokio::test]
    async fn integers_are_little_endian() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 0x0102).await.unwrap();
        write_u32(&mut buf, 0x0304_0506).await.unwrap();
        assert_eq!(buf, [0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);

        let mut reader = buf.as_slice();
        assert_eq!(read_u16(&mut reader).await.unwrap(), 0x0102);
        assert_eq!(read_u32(&mut reader).await.unwrap(), 0x0304_0506);
    }

    #[tokio::test]
    async fn short_input_is_truncated() {
        let mut reader: &[u8] = &[0x01];
        let err = read_u16(&mut reader).await.unwrap_err();
        assert!(matches!(err, ProtoError::Truncated { expected: 2 }));

        let mut reader: &[u8] = &[1, 2, 3];
        let err = read_frame(&mut reader, 8).await.unwrap_err();
        assert!(matches!(err, ProtoError::Truncated { expected: 8 }));
    }

    #[tokio::test]
    async fn frame_reads_only_its_length() {
        let mut reader: &[u8] = &[1, 2, 3, 4, 5];
        assert_eq!(read_frame(&mut reader, 3).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(reader, &[4, 5]);
    }

    /// Accepts `limit` bytes and then reports a zero-length write.
    struct Stingy {
        limit: usize,
        taken: usize,
    }

    impl AsyncWrite for Stingy {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            let n = buf.len().min(self.limit - self.taken).min(1);
            self.taken += n;
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn stalled_writer_is_a_short_write() {
        let mut writer = Stingy { limit: 3, taken: 0 };
        let err = write_exact(&mut writer, &[0u8; 5]).await.unwrap_err();
        assert!(matches!(
            err,
            ProtoError::ShortWrite {
                expected: 5,
                written: 3
            }
        ));
    }
}
