use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use cask_types::{Bucket, BucketName, BucketPolicy};
use rand::RngCore;
use tokio::io::{AsyncRead, ReadBuf};

/// Body that delivers `fail_after` bytes and then errors like a dropped peer.
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: usize,
}

impl FailingReader {
    pub fn new(data: Vec<u8>, fail_after: usize) -> Self {
        Self { data, pos: 0, fail_after }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos >= self.fail_after {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "peer went away",
            )));
        }
        let end = self
            .fail_after
            .min(self.data.len())
            .min(self.pos + buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..end]);
        self.pos = end;
        Poll::Ready(Ok(()))
    }
}

/// Body that delivers its data and then never completes.
pub struct StalledReader {
    data: Vec<u8>,
    pos: usize,
}

impl StalledReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl AsyncRead for StalledReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos >= self.data.len() {
            return Poll::Pending;
        }
        let end = self.data.len().min(self.pos + buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..end]);
        self.pos = end;
        Poll::Ready(Ok(()))
    }
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut data);
    data
}

pub fn bucket(name: &str) -> Bucket {
    Bucket::open(BucketName::parse(name).unwrap())
}

pub fn bucket_with(name: &str, policy: BucketPolicy) -> Bucket {
    Bucket::new(BucketName::parse(name).unwrap(), policy)
}
