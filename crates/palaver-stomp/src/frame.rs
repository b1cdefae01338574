//! STOMP 1.2 frame codec (text frames).
//!
//! Implements the subset of STOMP the chat protocol uses: CONNECT/STOMP,
//! CONNECTED, SEND, SUBSCRIBE, UNSUBSCRIBE, DISCONNECT, MESSAGE, and ERROR.
//! Header values are escaped per the STOMP 1.2 rules on every frame except
//! CONNECT and CONNECTED, and `content-length` is honored when present.

use crate::error::{FrameError, FrameResult};
use palaver_commons::{SessionId, SubscriptionId};
use std::fmt;

/// Well-known header names.
pub mod headers {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const DESTINATION: &str = "destination";
    pub const ID: &str = "id";
    pub const MESSAGE: &str = "message";
    pub const MESSAGE_ID: &str = "message-id";
    pub const SERVER: &str = "server";
    pub const SESSION: &str = "session";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const VERSION: &str = "version";
}

/// STOMP commands understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Client commands
    Connect,
    Stomp,
    Send,
    Subscribe,
    Unsubscribe,
    Disconnect,
    // Server commands
    Connected,
    Message,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> FrameResult<Self> {
        match s {
            "CONNECT" => Ok(Command::Connect),
            "STOMP" => Ok(Command::Stomp),
            "SEND" => Ok(Command::Send),
            "SUBSCRIBE" => Ok(Command::Subscribe),
            "UNSUBSCRIBE" => Ok(Command::Unsubscribe),
            "DISCONNECT" => Ok(Command::Disconnect),
            "CONNECTED" => Ok(Command::Connected),
            "MESSAGE" => Ok(Command::Message),
            "ERROR" => Ok(Command::Error),
            other => Err(FrameError::Protocol(format!("unknown command '{}'", other))),
        }
    }

    /// True for the session-opening commands.
    pub fn is_open(&self) -> bool {
        matches!(self, Command::Connect | Command::Stomp)
    }

    /// True for the session-closing command.
    pub fn is_close(&self) -> bool {
        matches!(self, Command::Disconnect)
    }

    /// CONNECT and CONNECTED frames do not escape header values (STOMP 1.2).
    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header, if present. Names compare ASCII
    /// case-insensitively; repeated headers keep STOMP first-wins semantics.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Required `destination` header.
    pub fn destination(&self) -> FrameResult<&str> {
        self.header(headers::DESTINATION)
            .ok_or_else(|| FrameError::Protocol("missing 'destination' header".to_string()))
    }

    // ---- server frame constructors ----

    /// CONNECTED answer for a freshly opened session.
    pub fn connected(session_id: &SessionId) -> Self {
        Frame::new(Command::Connected)
            .with_header(headers::VERSION, "1.2")
            .with_header(headers::SESSION, session_id.as_str())
            .with_header(headers::SERVER, concat!("palaver/", env!("CARGO_PKG_VERSION")))
    }

    /// MESSAGE frame delivering `body` to one subscription.
    pub fn message(
        destination: &str,
        subscription: &SubscriptionId,
        message_id: &str,
        content_type: &str,
        body: &str,
    ) -> Self {
        Frame::new(Command::Message)
            .with_header(headers::DESTINATION, destination)
            .with_header(headers::SUBSCRIPTION, subscription.as_str())
            .with_header(headers::MESSAGE_ID, message_id)
            .with_header(headers::CONTENT_TYPE, content_type)
            .with_body(body)
    }

    /// ERROR frame with a short reason.
    pub fn error(reason: &str) -> Self {
        Frame::new(Command::Error).with_header(headers::MESSAGE, reason)
    }

    // ---- codec ----

    /// Parse one frame from the text payload of a WebSocket message.
    ///
    /// Accepts `\n` or `\r\n` line endings and an optional trailing NUL.
    pub fn parse(input: &str) -> FrameResult<Self> {
        let mut lines = input.split('\n');

        // Tolerate EOL-only heartbeat padding before the command line.
        let command_line = loop {
            match lines.next() {
                Some(line) => {
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    if !line.is_empty() {
                        break line;
                    }
                }
                None => return Err(FrameError::Protocol("empty frame".to_string())),
            }
        };
        let command = Command::parse(command_line)?;

        let mut headers = Vec::new();
        let mut consumed = 0usize;
        // Byte offset of the body: everything up to and including the blank
        // line separating headers from body.
        let mut body_offset = None;
        for (offset, line) in split_with_offsets(input) {
            if consumed == 0 {
                // skip lines until the command line we already handled
                let trimmed = line.strip_suffix('\r').unwrap_or(line);
                if trimmed == command_line {
                    consumed = 1;
                }
                continue;
            }
            let trimmed = line.strip_suffix('\r').unwrap_or(line);
            if trimmed.is_empty() {
                body_offset = Some(offset + line.len() + 1);
                break;
            }
            let (name, value) = trimmed.split_once(':').ok_or_else(|| {
                FrameError::Protocol(format!("malformed header line '{}'", trimmed))
            })?;
            let value = if command.escapes_headers() {
                unescape_header(value)?
            } else {
                value.to_string()
            };
            headers.push((name.to_string(), value));
        }

        let body_offset = body_offset
            .ok_or_else(|| FrameError::Protocol("missing header terminator".to_string()))?;
        let raw_body = if body_offset >= input.len() {
            ""
        } else {
            &input[body_offset..]
        };

        let body = match headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(headers::CONTENT_LENGTH))
        {
            Some((_, len)) => {
                let len: usize = len.parse().map_err(|_| {
                    FrameError::Protocol(format!("invalid content-length '{}'", len))
                })?;
                if raw_body.len() < len {
                    return Err(FrameError::Protocol(
                        "body shorter than content-length".to_string(),
                    ));
                }
                raw_body
                    .get(..len)
                    .ok_or_else(|| {
                        FrameError::Protocol("content-length splits a UTF-8 sequence".to_string())
                    })?
                    .to_string()
            }
            None => raw_body
                .split('\0')
                .next()
                .unwrap_or_default()
                .to_string(),
        };

        Ok(Self {
            command,
            headers,
            body,
        })
    }

    /// Serialize to the wire format, NUL terminated.
    pub fn to_wire(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            if self.command.escapes_headers() {
                escape_header_into(value, &mut out);
            } else {
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() {
            out.push_str(headers::CONTENT_LENGTH);
            out.push(':');
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Iterate lines of `input` together with their byte offsets.
fn split_with_offsets(input: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0usize;
    input.split('\n').map(move |line| {
        let this = offset;
        offset += line.len() + 1;
        (this, line)
    })
}

fn escape_header_into(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape_header(value: &str) -> FrameResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(FrameError::Protocol(format!(
                    "invalid header escape '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
