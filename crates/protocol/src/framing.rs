use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_BUFFER_BYTES: usize = if cfg!(test) { 4096 } else { 32 * 1024 * 1024 };
const MAX_MESSAGE_BYTES: usize = if cfg!(test) { 1024 } else { 16 * 1024 * 1024 };

const fn is_ascii_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn find_double_newline(buf: &[u8]) -> Option<usize> {
    // Prefer CRLFCRLF, fall back to LFLF.
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some(pos + 4);
    }
    if let Some(pos) = buf.windows(2).position(|w| w == b"\n\n") {
        return Some(pos + 2);
    }
    None
}

fn parse_content_length(headers: &str) -> Option<usize> {
    for raw_line in headers.lines() {
        let line = raw_line.trim_end_matches('\r').trim();
        if line.len() < "content-length:".len() {
            continue;
        }
        if line.as_bytes()[.."content-length:".len()].eq_ignore_ascii_case(b"content-length:") {
            let value = line["content-length:".len()..].trim();
            if let Ok(n) = value.parse::<usize>() {
                return Some(n);
            }
        }
    }
    None
}

/// Reads `Content-Length: N\r\n\r\n<body>` frames from an async byte stream.
///
/// Frame boundaries only: the body comes back as raw text for the codec to
/// interpret. Header case and `\r\n` vs `\n` are both tolerated.
pub struct FrameReader<R> {
    read: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(read: R) -> Self {
        Self {
            read,
            buf: Vec::new(),
        }
    }

    /// Returns the next frame body, or `None` at end of stream. Errors are
    /// transport-fatal: an oversized frame or EOF mid-message ends the read
    /// loop rather than risking desynchronized framing.
    pub async fn next_frame(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(body) = self.try_decode()? {
                return Ok(Some(body));
            }

            let mut tmp = [0u8; 8192];
            let n = self.read.read(&mut tmp).await?;
            if n == 0 {
                let trailing = self.buf.iter().any(|b| !is_ascii_whitespace(*b));
                if trailing {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream closed in the middle of a frame",
                    ));
                }
                return Ok(None);
            }
            self.buf.extend_from_slice(&tmp[..n]);
            if self.buf.len() > MAX_BUFFER_BYTES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "input buffer exceeded maximum size ({} > {MAX_BUFFER_BYTES})",
                        self.buf.len()
                    ),
                ));
            }
        }
    }

    fn try_decode(&mut self) -> io::Result<Option<String>> {
        // Skip inter-frame whitespace so a sloppy peer cannot wedge us.
        let start = match self.buf.iter().position(|b| !is_ascii_whitespace(*b)) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        if start > 0 {
            self.buf.drain(..start);
        }

        let Some(header_end) = find_double_newline(&self.buf) else {
            return Ok(None);
        };

        let header_str = std::str::from_utf8(&self.buf[..header_end])
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let Some(len) = parse_content_length(header_str) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "missing Content-Length header",
            ));
        };

        if len > MAX_MESSAGE_BYTES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Content-Length {len} exceeds maximum supported message size"),
            ));
        }

        if self.buf.len() < header_end + len {
            return Ok(None);
        }

        let body = self.buf[header_end..header_end + len].to_vec();
        self.buf.drain(..header_end + len);
        String::from_utf8(body)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Writes `Content-Length`-framed bodies to an async byte stream.
pub struct FrameWriter<W> {
    write: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(write: W) -> Self {
        Self { write }
    }

    pub async fn write_frame(&mut self, body: &str) -> io::Result<()> {
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        self.write.write_all(header.as_bytes()).await?;
        self.write.write_all(body.as_bytes()).await?;
        self.write.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_a_single_frame() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut reader = FrameReader::new(server);

        client
            .write_all(b"Content-Length: 13\r\n\r\n{\"jsonrpc\":1}")
            .await
            .expect("write frame");
        drop(client);

        let body = reader.next_frame().await.expect("read").expect("frame");
        assert_eq!(body, "{\"jsonrpc\":1}");
        assert!(reader.next_frame().await.expect("eof").is_none());
    }

    #[tokio::test]
    async fn reassembles_split_frames() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut reader = FrameReader::new(server);

        let write = tokio::spawn(async move {
            client.write_all(b"Content-Len").await.unwrap();
            client.write_all(b"gth: 2\r\n").await.unwrap();
            client.write_all(b"\r\n{}").await.unwrap();
            client.write_all(b"Content-Length: 4\n\n true").await.unwrap();
        });

        assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some("{}"));
        assert_eq!(reader.next_frame().await.unwrap().as_deref(), Some(" tru"));
        write.await.unwrap();
    }

    #[tokio::test]
    async fn rejects_excessive_content_length() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut reader = FrameReader::new(server);

        client
            .write_all(b"Content-Length: 999999\r\n\r\n")
            .await
            .expect("write header");
        drop(client);

        assert!(reader.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn errors_on_eof_mid_frame() {
        let (mut client, server) = tokio::io::duplex(4096);
        let mut reader = FrameReader::new(server);

        client
            .write_all(b"Content-Length: 10\r\n\r\nabc")
            .await
            .expect("write partial");
        drop(client);

        assert!(reader.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn round_trips_through_writer() {
        let (client, server) = tokio::io::duplex(4096);
        let mut writer = FrameWriter::new(client);
        let mut reader = FrameReader::new(server);

        writer.write_frame("{\"id\":1}").await.expect("write");
        let body = reader.next_frame().await.expect("read").expect("frame");
        assert_eq!(body, "{\"id\":1}");
    }
}
