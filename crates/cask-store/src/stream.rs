//! Single-pass hashing copy from an inbound body into a sink.

use std::io;

use cask_crypto::ContentHasher;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{StoreError, StoreResult};

/// Size of the buffer each copy reuses for its whole lifetime.
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Bounds checked while a body is being copied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyLimits {
    /// Abort with `ObjectTooLarge` once more than this many bytes arrive.
    pub max_size: Option<u64>,
    /// Exact length the sender declared; any other length is a broken stream.
    pub expected_len: Option<u64>,
}

/// Copy `reader` into `writer`, feeding every chunk to `hasher` on the way.
///
/// Returns the number of bytes copied. The writer is flushed but not synced.
pub async fn copy_hashed<R, W>(
    reader: &mut R,
    writer: &mut W,
    hasher: &mut ContentHasher,
    limits: CopyLimits,
) -> StoreResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        total += n as u64;

        if let Some(limit) = limits.max_size {
            if total > limit {
                return Err(StoreError::ObjectTooLarge { limit });
            }
        }
        if let Some(expected) = limits.expected_len {
            if total > expected {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("body is longer than the declared {expected} bytes"),
                )
                .into());
            }
        }

        hasher.update(&buf[..n]);
        writer.write_all(&buf[..n]).await?;
    }

    if let Some(expected) = limits.expected_len {
        if total < expected {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("body ended after {total} of {expected} declared bytes"),
            )
            .into());
        }
    }

    writer.flush().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FailingReader;
    use cask_types::DigestAlgorithm;

    async fn copy(data: &[u8], limits: CopyLimits) -> (StoreResult<u64>, Vec<u8>, ContentHasher) {
        let mut reader = data;
        let mut sink = Vec::new();
        let mut hasher = ContentHasher::new(DigestAlgorithm::Sha1);
        let result = copy_hashed(&mut reader, &mut sink, &mut hasher, limits).await;
        (result, sink, hasher)
    }

    #[tokio::test]
    async fn copies_and_hashes_in_one_pass() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let (result, sink, hasher) = copy(&data, CopyLimits::default()).await;
        assert_eq!(result.unwrap(), data.len() as u64);
        assert_eq!(sink, data);
        assert_eq!(hasher.bytes_hashed(), data.len() as u64);
        assert_eq!(hasher.finalize(), ContentHasher::hash(DigestAlgorithm::Sha1, &data));
    }

    #[tokio::test]
    async fn empty_body() {
        let (result, sink, _) = copy(b"", CopyLimits::default()).await;
        assert_eq!(result.unwrap(), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn enforces_size_limit() {
        let limits = CopyLimits { max_size: Some(4), ..Default::default() };
        let (result, _, _) = copy(b"12345", limits).await;
        assert!(matches!(result, Err(StoreError::ObjectTooLarge { limit: 4 })));

        let (result, _, _) = copy(b"1234", limits).await;
        assert_eq!(result.unwrap(), 4);
    }

    #[tokio::test]
    async fn short_body_is_broken_stream() {
        let limits = CopyLimits { expected_len: Some(10), ..Default::default() };
        let (result, _, _) = copy(b"12345", limits).await;
        match result {
            Err(StoreError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_body_is_broken_stream() {
        let limits = CopyLimits { expected_len: Some(2), ..Default::default() };
        let (result, _, _) = copy(b"12345", limits).await;
        match result {
            Err(StoreError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
            other => panic!("expected io error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reader_error_propagates() {
        let mut reader = FailingReader::new(vec![1u8; 100], 10);
        let mut sink = Vec::new();
        let mut hasher = ContentHasher::new(DigestAlgorithm::Blake3);
        let err = copy_hashed(&mut reader, &mut sink, &mut hasher, CopyLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert_eq!(sink.len(), 10);
    }
}
