// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefix framing.
//!
//! TCP is a stream without message boundaries; every bridge message is
//! framed as a 4-byte big-endian length followed by the payload:
//!
//! ```text
//! +----------------+-------------------+
//! | Length (4B BE) | Message payload   |
//! +----------------+-------------------+
//! ```

use crate::error::{Error, Result};
use std::io::{self, Read, Write};

/// Frame header size (4 bytes for length).
pub const FRAME_HEADER_SIZE: usize = 4;

/// Write one framed payload.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8], max_size: usize) -> Result<()> {
    if payload.len() > max_size {
        return Err(Error::Protocol(format!(
            "frame too large: {} bytes (max {})",
            payload.len(),
            max_size
        )));
    }
    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one framed payload.
///
/// Returns `Ok(None)` on a clean end of stream at a frame boundary;
/// EOF mid-frame is an error. A read timeout (`WouldBlock`/`TimedOut`)
/// surfaces as `Error::Io` only while no frame is in progress, so
/// polling loops can treat it as an idle tick without losing sync;
/// once any frame byte has arrived, the read blocks until the frame
/// completes.
pub fn read_frame<R: Read>(reader: &mut R, max_size: usize) -> Result<Option<Vec<u8>>> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    match read_exact_or_eof(reader, &mut header)? {
        ReadOutcome::Eof => return Ok(None),
        ReadOutcome::Partial => {
            return Err(Error::Protocol("incomplete frame header".to_string()));
        }
        ReadOutcome::Full => {}
    }

    let len = u32::from_be_bytes(header) as usize;
    if len > max_size {
        return Err(Error::Protocol(format!(
            "frame too large: {} bytes (max {})",
            len, max_size
        )));
    }
    if len == 0 {
        return Ok(Some(Vec::new()));
    }

    let mut payload = vec![0u8; len];
    loop {
        // The header is consumed, so even a timeout before the first
        // body byte must retry rather than bubble up.
        match read_exact_or_eof(reader, &mut payload) {
            Ok(ReadOutcome::Full) => return Ok(Some(payload)),
            Ok(_) => return Err(Error::Protocol("incomplete frame body".to_string())),
            Err(Error::Io(e)) if is_timeout(&e) => continue,
            Err(e) => return Err(e),
        }
    }
}

enum ReadOutcome {
    Full,
    Partial,
    Eof,
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<ReadOutcome> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Ok(if filled == 0 {
                    ReadOutcome::Eof
                } else {
                    ReadOutcome::Partial
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // Nothing consumed yet: report the timeout to the caller.
            Err(e) if filled == 0 && is_timeout(&e) => return Err(Error::Io(e)),
            // Mid-item: the rest is on the wire, wait for it.
            Err(e) if is_timeout(&e) => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(ReadOutcome::Full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello, bridge", 1024).unwrap();
        assert_eq!(&buf[..4], &13u32.to_be_bytes());

        let mut cursor = Cursor::new(buf);
        let payload = read_frame(&mut cursor, 1024).unwrap();
        assert_eq!(payload.as_deref(), Some(b"hello, bridge".as_slice()));
    }

    #[test]
    fn multiple_frames_in_sequence() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"first", 1024).unwrap();
        write_frame(&mut buf, b"second", 1024).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(
            read_frame(&mut cursor, 1024).unwrap().as_deref(),
            Some(b"first".as_slice())
        );
        assert_eq!(
            read_frame(&mut cursor, 1024).unwrap().as_deref(),
            Some(b"second".as_slice())
        );
        assert!(read_frame(&mut cursor, 1024).unwrap().is_none());
    }

    #[test]
    fn clean_eof_at_boundary() {
        let mut cursor = Cursor::new(Vec::new());
        assert!(read_frame(&mut cursor, 1024).unwrap().is_none());
    }

    #[test]
    fn eof_mid_header_is_an_error() {
        let mut cursor = Cursor::new(vec![0u8, 0]);
        assert!(read_frame(&mut cursor, 1024).is_err());
    }

    #[test]
    fn eof_mid_body_is_an_error() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"truncated", 1024).unwrap();
        buf.truncate(buf.len() - 3);
        let mut cursor = Cursor::new(buf);
        assert!(read_frame(&mut cursor, 1024).is_err());
    }

    #[test]
    fn oversized_frames_rejected_both_ways() {
        let mut buf = Vec::new();
        assert!(write_frame(&mut buf, &[0u8; 64], 10).is_err());

        let mut wire = Vec::new();
        write_frame(&mut wire, &[0u8; 64], 1024).unwrap();
        let mut cursor = Cursor::new(wire);
        assert!(read_frame(&mut cursor, 10).is_err());
    }

    #[test]
    fn empty_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"", 1024).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor, 1024).unwrap(), Some(Vec::new()));
    }
}
