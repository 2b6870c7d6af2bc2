// src/services/export/spool.rs

//! Spool file that forwards finished archive bytes while the rest of the
//! archive is still being written.
//!
//! `ZipWriter` seeks back into an entry's local header once the entry's data
//! is complete, then returns to the end of the file. Everything before that
//! end is final from then on, so each return is a commit point.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom, Write},
};

use axum::body::Bytes;
use tokio::sync::mpsc;

/// Size of the chunks handed to the response body.
pub const CHUNK_SIZE: usize = 64 * 1024;

pub type Chunk = Result<Bytes, io::Error>;

pub struct Spool {
    file: File,
    pos: u64,
    end: u64,
    committed: u64,
    sent: u64,
    patching: bool,
    tx: mpsc::Sender<Chunk>,
}

impl Spool {
    pub fn new(file: File, tx: mpsc::Sender<Chunk>) -> Self {
        Self {
            file,
            pos: 0,
            end: 0,
            committed: 0,
            sent: 0,
            patching: false,
            tx,
        }
    }

    /// Forwards everything written so far. Only valid once the archive is
    /// finalized.
    pub fn flush_all(&mut self) -> io::Result<()> {
        self.committed = self.end;
        self.forward()
    }

    fn forward(&mut self) -> io::Result<()> {
        // Receiver gone: keep absorbing writes so the zip writer can wind down.
        if self.sent >= self.committed || self.tx.is_closed() {
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(self.sent))?;
        while self.sent < self.committed {
            let len = (self.committed - self.sent).min(CHUNK_SIZE as u64) as usize;
            let mut chunk = vec![0u8; len];
            self.file.read_exact(&mut chunk)?;
            self.tx
                .blocking_send(Ok(Bytes::from(chunk)))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive receiver dropped"))?;
            self.sent += len as u64;
        }
        self.file.seek(SeekFrom::Start(self.pos))?;
        Ok(())
    }
}

impl Write for Spool {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.file.write(buf)?;
        self.pos += written as u64;
        self.end = self.end.max(self.pos);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for Spool {
    fn seek(&mut self, to: SeekFrom) -> io::Result<u64> {
        self.pos = self.file.seek(to)?;
        if self.pos < self.end {
            self.patching = true;
        } else if self.patching {
            self.patching = false;
            self.committed = self.end;
            self.forward()?;
        }
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::Receiver<Chunk>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[test]
    fn bytes_are_forwarded_once_a_patch_returns_to_the_end() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut spool = Spool::new(tempfile::tempfile().unwrap(), tx);

        spool.write_all(b"HEADxxxxDATA").unwrap();
        assert!(drain(&mut rx).is_empty());

        spool.seek(SeekFrom::Start(4)).unwrap();
        spool.write_all(b"1234").unwrap();
        assert!(drain(&mut rx).is_empty());

        spool.seek(SeekFrom::Start(12)).unwrap();
        assert_eq!(drain(&mut rx), b"HEAD1234DATA");

        spool.write_all(b"TAIL").unwrap();
        assert!(drain(&mut rx).is_empty());

        spool.flush_all().unwrap();
        assert_eq!(drain(&mut rx), b"TAIL");
    }

    #[test]
    fn position_queries_do_not_commit() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut spool = Spool::new(tempfile::tempfile().unwrap(), tx);

        spool.write_all(b"abc").unwrap();
        assert_eq!(spool.stream_position().unwrap(), 3);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn large_commits_are_split_into_chunks() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut spool = Spool::new(tempfile::tempfile().unwrap(), tx);

        spool.write_all(&vec![7u8; CHUNK_SIZE * 2 + 10]).unwrap();
        spool.flush_all().unwrap();

        let sizes: Vec<usize> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|chunk| chunk.unwrap().len())
            .collect();
        assert_eq!(sizes, vec![CHUNK_SIZE, CHUNK_SIZE, 10]);
    }

    #[test]
    fn closed_receiver_absorbs_writes() {
        let (tx, rx) = mpsc::channel(16);
        let mut spool = Spool::new(tempfile::tempfile().unwrap(), tx);
        drop(rx);

        spool.write_all(b"data").unwrap();
        spool.seek(SeekFrom::Start(0)).unwrap();
        spool.seek(SeekFrom::Start(4)).unwrap();
        spool.flush_all().unwrap();
    }
}
