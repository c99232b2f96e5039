//! Blocking FTP client for talking to a PDU's management card.
//!
//! Only the small subset of RFC 959 needed to move one file each way is
//! implemented:
//!
//! ```text
//! client                               server
//! ──────                               ──────
//! connect ───────────────────────────► 220 ready
//! USER apc ──────────────────────────► 331 need password
//! PASS apc ──────────────────────────► 230 logged in
//! TYPE A ────────────────────────────► 200
//! PASV ──────────────────────────────► 227 (h1,h2,h3,h4,p1,p2)
//!   (or PORT h1,h2,h3,h4,p1,p2 ──────► 200   when active)
//! RETR config.ini / STOR config.ini ─► 150 ... 226
//! QUIT ──────────────────────────────► 221
//! ```
//!
//! Every socket gets the connector's timeout for connect, read and write, so
//! a stalled device surfaces as an I/O error instead of a hang.

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{
    IpAddr, Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpListener, TcpStream, ToSocketAddrs,
};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{Connector, TransferHandle, TransferMode, TransportError};

/// Standard FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Default socket timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for the server to open an active-mode data
/// connection.
const ACCEPT_POLL: Duration = Duration::from_millis(20);

/// Opens [`FtpHandle`]s on a fixed control port.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    port: u16,
    timeout: Duration,
}

impl FtpConnector {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl Default for FtpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_FTP_PORT, DEFAULT_TIMEOUT)
    }
}

impl Connector for FtpConnector {
    type Handle = FtpHandle;

    fn open_handle(&self, host: &str) -> Result<FtpHandle, TransportError> {
        let unreachable = |source| TransportError::Unreachable {
            host: host.to_string(),
            source,
        };

        let addr = (host, self.port)
            .to_socket_addrs()
            .map_err(unreachable)?
            .next()
            .ok_or_else(|| {
                unreachable(io::Error::new(
                    io::ErrorKind::NotFound,
                    "host resolved to no addresses",
                ))
            })?;

        debug!(%addr, "opening FTP control connection");
        let stream = TcpStream::connect_timeout(&addr, self.timeout).map_err(unreachable)?;
        FtpHandle::from_stream(stream, self.timeout)
    }
}

/// A single server reply: three-digit code plus the text after it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    message: String,
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Where the next data connection comes from.
enum DataChannel {
    /// Passive mode: we already connected to the server.
    Connected(TcpStream),
    /// Active mode: the server will connect to us.
    Listening(TcpListener),
}

impl DataChannel {
    fn establish(self, timeout: Duration) -> io::Result<TcpStream> {
        let stream = match self {
            DataChannel::Connected(stream) => stream,
            DataChannel::Listening(listener) => accept_with_timeout(&listener, timeout)?,
        };
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        Ok(stream)
    }
}

/// An authenticated (or about to be) FTP control connection.
pub struct FtpHandle {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    passive: bool,
    timeout: Duration,
}

impl FtpHandle {
    /// Wraps a connected control stream and consumes the server greeting.
    fn from_stream(stream: TcpStream, timeout: Duration) -> Result<Self, TransportError> {
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let writer = stream.try_clone()?;

        let mut handle = Self {
            reader: BufReader::new(stream),
            writer,
            passive: false,
            timeout,
        };
        let greeting = handle.expect_reply("connect", &[220])?;
        debug!(greeting = %greeting.message, "FTP server ready");
        Ok(handle)
    }

    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        // Never log arguments: PASS carries the password.
        let verb = line.split(' ').next().unwrap_or(line);
        debug!(command = verb, "FTP >");
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\r\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, TransportError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(TransportError::MalformedReply(
                "connection closed by server".to_string(),
            ));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Reads one reply, folding multi-line (`123-...` / `123 ...`) replies.
    fn read_reply(&mut self) -> Result<Reply, TransportError> {
        let first = self.read_line()?;
        let (code, multiline) = parse_reply_prefix(&first)?;
        let mut message = first.get(4..).unwrap_or("").to_string();

        if multiline {
            let terminator = format!("{code} ");
            loop {
                let line = self.read_line()?;
                if line.starts_with(&terminator) || line == code.to_string() {
                    message.push('\n');
                    message.push_str(line.get(4..).unwrap_or(""));
                    break;
                }
                message.push('\n');
                message.push_str(&line);
            }
        }

        debug!(code, "FTP <");
        Ok(Reply { code, message })
    }

    fn expect_reply(&mut self, command: &str, expected: &[u16]) -> Result<Reply, TransportError> {
        let reply = self.read_reply()?;
        if expected.contains(&reply.code) {
            Ok(reply)
        } else {
            Err(TransportError::UnexpectedReply {
                command: command.to_string(),
                code: reply.code,
                message: reply.message,
            })
        }
    }

    fn command(&mut self, line: &str, expected: &[u16]) -> Result<Reply, TransportError> {
        self.send(line)?;
        let verb = line.split(' ').next().unwrap_or(line).to_string();
        self.expect_reply(&verb, expected)
    }

    fn set_type(&mut self, mode: TransferMode) -> Result<(), TransportError> {
        let code = match mode {
            TransferMode::Text => "A",
            TransferMode::Binary => "I",
        };
        self.command(&format!("TYPE {code}"), &[200])?;
        Ok(())
    }

    fn prepare_data_channel(&mut self) -> Result<DataChannel, TransportError> {
        if self.passive {
            let reply = self.command("PASV", &[227])?;
            let mut addr = parse_pasv_reply(&reply.message)?;
            // Some servers advertise 0.0.0.0; reuse the control peer instead.
            if addr.ip().is_unspecified() {
                if let IpAddr::V4(peer) = self.writer.peer_addr()?.ip() {
                    addr.set_ip(peer);
                }
            }
            debug!(%addr, "connecting passive data channel");
            let stream = TcpStream::connect_timeout(&SocketAddr::V4(addr), self.timeout)?;
            return Ok(DataChannel::Connected(stream));
        }

        let local_ip = self.writer.local_addr()?.ip();
        let listener = TcpListener::bind((local_ip, 0))?;
        let port = listener.local_addr()?.port();
        let line = match local_ip {
            IpAddr::V4(ip) => port_command(ip, port),
            IpAddr::V6(ip) => format!("EPRT |2|{ip}|{port}|"),
        };
        self.command(&line, &[200])?;
        Ok(DataChannel::Listening(listener))
    }
}

impl TransferHandle for FtpHandle {
    fn authenticate(&mut self, username: &str, password: &str) -> Result<(), TransportError> {
        let rejected = |reply: Reply| TransportError::LoginRejected {
            username: username.to_string(),
            reply: reply.to_string(),
        };

        self.send(&format!("USER {username}"))?;
        let reply = self.read_reply()?;
        match reply.code {
            230 => return Ok(()),
            331 | 332 => {}
            _ => return Err(rejected(reply)),
        }

        self.send(&format!("PASS {password}"))?;
        let reply = self.read_reply()?;
        match reply.code {
            230 | 202 => Ok(()),
            _ => Err(rejected(reply)),
        }
    }

    fn set_transfer_mode(&mut self, passive: bool) -> Result<(), TransportError> {
        self.passive = passive;
        Ok(())
    }

    fn download(
        &mut self,
        remote_name: &str,
        local_path: &Path,
        mode: TransferMode,
    ) -> Result<(), TransportError> {
        self.set_type(mode)?;
        let channel = self.prepare_data_channel()?;
        self.command(&format!("RETR {remote_name}"), &[125, 150])?;

        let mut data = channel.establish(self.timeout)?;
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)?;
        drop(data);
        self.expect_reply("RETR", &[226, 250])?;

        let bytes = match mode {
            TransferMode::Text => from_network_text(&bytes),
            TransferMode::Binary => bytes,
        };
        fs::write(local_path, &bytes)?;
        info!(remote = remote_name, local = %local_path.display(), bytes = bytes.len(), "downloaded");
        Ok(())
    }

    fn upload(
        &mut self,
        local_path: &Path,
        remote_name: &str,
        mode: TransferMode,
    ) -> Result<(), TransportError> {
        let content = fs::read(local_path)?;
        let payload = match mode {
            TransferMode::Text => to_network_text(&content),
            TransferMode::Binary => content,
        };

        self.set_type(mode)?;
        let channel = self.prepare_data_channel()?;
        self.command(&format!("STOR {remote_name}"), &[125, 150])?;

        let mut data = channel.establish(self.timeout)?;
        data.write_all(&payload)?;
        data.flush()?;
        data.shutdown(Shutdown::Write)?;
        drop(data);
        self.expect_reply("STOR", &[226, 250])?;

        info!(local = %local_path.display(), remote = remote_name, bytes = payload.len(), "uploaded");
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.command("QUIT", &[221])?;
        // The server closes the control connection after 221 anyway.
        if let Err(e) = self.writer.shutdown(Shutdown::Both) {
            debug!(error = %e, "control connection shutdown after QUIT failed");
        }
        Ok(())
    }
}

// ── Wire helpers ──────────────────────────────────────────────────────────────

/// Parses the `NNN ` / `NNN-` prefix of a reply line.
///
/// Returns the code and whether this is the first line of a multi-line reply.
fn parse_reply_prefix(line: &str) -> Result<(u16, bool), TransportError> {
    let malformed = || TransportError::MalformedReply(line.to_string());

    let digits = line.get(..3).ok_or_else(malformed)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let code: u16 = digits.parse().map_err(|_| malformed())?;

    match line.as_bytes().get(3).copied() {
        None | Some(b' ') => Ok((code, false)),
        Some(b'-') => Ok((code, true)),
        Some(_) => Err(malformed()),
    }
}

/// Extracts the data address from a `227` reply text such as
/// `Entering Passive Mode (10,0,0,5,195,80).`
fn parse_pasv_reply(message: &str) -> Result<SocketAddrV4, TransportError> {
    let malformed = || TransportError::MalformedReply(message.to_string());

    let start = match message.find('(') {
        Some(open) => open + 1,
        None => message.find(|c: char| c.is_ascii_digit()).ok_or_else(malformed)?,
    };
    let numbers: Vec<u8> = message[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == ','))
        .next()
        .unwrap_or("")
        .split(',')
        .map(|n| n.parse::<u8>())
        .collect::<Result<_, _>>()
        .map_err(|_| malformed())?;

    let [a, b, c, d, p1, p2] = numbers[..] else {
        return Err(malformed());
    };
    let port = u16::from(p1) << 8 | u16::from(p2);
    Ok(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port))
}

fn port_command(ip: Ipv4Addr, port: u16) -> String {
    let [a, b, c, d] = ip.octets();
    format!("PORT {a},{b},{c},{d},{},{}", port >> 8, port & 0xff)
}

/// CRLF → LF.  Lone CRs are kept.
fn from_network_text(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().peekable();
    while let Some(&b) = iter.next() {
        if b == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

/// LF → CRLF, leaving existing CRLF pairs alone.
fn to_network_text(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 16);
    let mut prev = 0u8;
    for &b in bytes {
        if b == b'\n' && prev != b'\r' {
            out.push(b'\r');
        }
        out.push(b);
        prev = b;
    }
    out
}

fn accept_with_timeout(listener: &TcpListener, timeout: Duration) -> io::Result<TcpStream> {
    listener.set_nonblocking(true)?;
    let deadline = Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                if Instant::now() >= deadline {
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        "server did not open the active-mode data connection",
                    ));
                }
                thread::sleep(ACCEPT_POLL);
            }
            Err(e) => return Err(e),
        }
    }
}
