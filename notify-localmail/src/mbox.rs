//! Flag-aware mbox store
//!
//! Messages are kept as raw bytes so that anything we do not touch is written
//! back byte for byte. Only the `Status` and `X-Status` headers of updated
//! messages are regenerated.
//!
//! Flag letters follow the usual mbox convention:
//!
//! | Flag | Header     | Meaning  |
//! |------|------------|----------|
//! | `R`  | `Status`   | read     |
//! | `O`  | `Status`   | old      |
//! | `D`  | `X-Status` | deleted  |
//! | `F`  | `X-Status` | flagged  |
//! | `A`  | `X-Status` | answered |

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{NotifyError, Result};

pub const FLAG_READ: char = 'R';
pub const FLAG_DELETED: char = 'D';

const STATUS_FLAGS: [char; 2] = ['R', 'O'];
const XSTATUS_FLAGS: [char; 3] = ['D', 'F', 'A'];

/// Path of the dot-lock belonging to `path`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// One raw header field, including continuation lines and line ending
#[derive(Debug, Clone, PartialEq)]
struct Header {
    name: String,
    raw: Vec<u8>,
}

/// Line ending used by `line`, defaulting to LF
fn line_ending(line: &[u8]) -> &'static str {
    if line.ends_with(b"\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

impl Header {
    fn new(name: &str, value: &str, eol: &str) -> Self {
        Self {
            name: name.to_string(),
            raw: format!("{}: {}{}", name, value, eol).into_bytes(),
        }
    }

    fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Unfolded value with surrounding whitespace removed
    fn value(&self) -> String {
        let text = String::from_utf8_lossy(&self.raw);
        let value = text.split_once(':').map(|(_, v)| v).unwrap_or("");
        value
            .split(['\r', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A message from an mbox file
#[derive(Debug, Clone, PartialEq)]
pub struct MboxMessage {
    /// The `From ` separator line, kept verbatim
    from_line: Vec<u8>,
    headers: Vec<Header>,
    /// Blank separator line plus body, kept verbatim
    body: Vec<u8>,
}

impl MboxMessage {
    fn parse(lines: &[&[u8]]) -> Self {
        let (from_line, rest) = match lines.split_first() {
            Some((first, rest)) => (first.to_vec(), rest),
            None => (Vec::new(), lines),
        };

        let mut headers: Vec<Header> = Vec::new();
        let mut body_start = rest.len();

        for (i, line) in rest.iter().enumerate() {
            let is_blank = matches!(*line, b"\n" | b"\r\n");
            let is_continuation = matches!(line.first(), Some(&b' ') | Some(&b'\t'));

            if is_continuation && !headers.is_empty() {
                if let Some(last) = headers.last_mut() {
                    last.raw.extend_from_slice(line);
                }
                continue;
            }

            let name = line
                .iter()
                .position(|&b| b == b':')
                .map(|colon| String::from_utf8_lossy(&line[..colon]).trim().to_string())
                .filter(|name| !name.is_empty() && !name.contains(' '));

            match name {
                Some(name) if !is_blank => headers.push(Header {
                    name,
                    raw: line.to_vec(),
                }),
                _ => {
                    body_start = i;
                    break;
                }
            }
        }

        Self {
            from_line,
            headers,
            body: rest[body_start..].concat(),
        }
    }

    /// Unfolded value of the first header called `name`
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.iter().find(|h| h.is(name)).map(Header::value)
    }

    /// Decoded subject line, if the message has one
    pub fn subject(&self) -> Option<String> {
        let mut raw: Vec<u8> = self.headers.iter().flat_map(|h| h.raw.iter().copied()).collect();
        raw.extend_from_slice(b"\n");

        mail_parser::MessageParser::default()
            .parse(raw.as_slice())
            .and_then(|msg| msg.subject().map(str::to_string))
            .or_else(|| self.header("Subject"))
    }

    /// Flags from `Status` followed by those from `X-Status`
    pub fn flags(&self) -> String {
        let mut flags = self.header("Status").unwrap_or_default();
        flags.push_str(&self.header("X-Status").unwrap_or_default());
        flags
    }

    pub fn has_flag(&self, flag: char) -> bool {
        self.flags().contains(flag)
    }

    /// Replace the flag set, regenerating `Status` and `X-Status`
    pub fn set_flags(&mut self, flags: &str) {
        let mut remaining: Vec<char> = flags.chars().filter(|c| !c.is_whitespace()).collect();
        remaining.sort_unstable();
        remaining.dedup();

        let status: String = STATUS_FLAGS.iter().filter(|f| remaining.contains(f)).collect();
        let mut xstatus: String = XSTATUS_FLAGS.iter().filter(|f| remaining.contains(f)).collect();
        xstatus.extend(
            remaining
                .iter()
                .filter(|f| !STATUS_FLAGS.contains(f) && !XSTATUS_FLAGS.contains(f)),
        );

        self.replace_header("Status", &status);
        self.replace_header("X-Status", &xstatus);
    }

    pub fn add_flag(&mut self, flag: char) {
        let mut flags = self.flags();
        if !flags.contains(flag) {
            flags.push(flag);
            self.set_flags(&flags);
        }
    }

    fn replace_header(&mut self, name: &str, value: &str) {
        if let Some(header) = self.headers.iter_mut().find(|h| h.is(name)) {
            *header = Header::new(&header.name, value, line_ending(&header.raw));
            return;
        }
        if value.is_empty() {
            return;
        }

        // The previous line may be the unterminated last line of the file
        let last = match self.headers.last_mut() {
            Some(header) => &mut header.raw,
            None => &mut self.from_line,
        };
        let eol = line_ending(last);
        if !last.ends_with(b"\n") {
            last.extend_from_slice(eol.as_bytes());
            if self.body.is_empty() {
                self.body.extend_from_slice(eol.as_bytes());
            }
        }
        self.headers.push(Header::new(name, value, eol));
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.from_line)?;
        for header in &self.headers {
            writer.write_all(&header.raw)?;
        }
        writer.write_all(&self.body)
    }
}

/// An mbox file loaded into memory
#[derive(Debug)]
pub struct Mbox {
    path: PathBuf,
    messages: Vec<MboxMessage>,
    dirty: bool,
}

impl Mbox {
    /// Load and parse the mbox at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read(&path)?;
        let messages = parse_messages(&content);

        debug!("Loaded {} messages from {}", messages.len(), path.display());

        Ok(Self {
            path,
            messages,
            dirty: false,
        })
    }

    /// Message keys in file order
    pub fn keys(&self) -> Range<usize> {
        0..self.messages.len()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Copy of the message stored under `key`
    pub fn get_message(&self, key: usize) -> Option<MboxMessage> {
        self.messages.get(key).cloned()
    }

    /// Store `message` under an existing `key`
    pub fn update(&mut self, key: usize, message: MboxMessage) -> Result<()> {
        let slot = self
            .messages
            .get_mut(key)
            .ok_or_else(|| NotifyError::MailboxParse(format!("No message with key {}", key)))?;
        *slot = message;
        self.dirty = true;
        Ok(())
    }

    /// Write pending changes back to disk
    ///
    /// The new content goes to a temporary file next to the mailbox which
    /// then replaces it, so a crash never leaves a half-written cache.
    pub fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        for message in &self.messages {
            message.write_to(&mut tmp)?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| NotifyError::Io(e.error))?;

        debug!("Flushed {} messages to {}", self.messages.len(), self.path.display());
        self.dirty = false;
        Ok(())
    }
}

/// Split raw mbox content into messages at `From ` lines
///
/// Anything before the first separator is not part of any message.
fn parse_messages(content: &[u8]) -> Vec<MboxMessage> {
    let lines: Vec<&[u8]> = content.split_inclusive(|&b| b == b'\n').collect();
    let Some(first) = lines.iter().position(|l| l.starts_with(b"From ")) else {
        return Vec::new();
    };

    let mut messages = Vec::new();
    let mut start = first;

    for i in first + 1..=lines.len() {
        if i == lines.len() || lines[i].starts_with(b"From ") {
            messages.push(MboxMessage::parse(&lines[start..i]));
            start = i;
        }
    }

    messages
}

/// Dot-lock on an mbox, removed when dropped
#[derive(Debug)]
pub struct MboxLock {
    path: PathBuf,
}

impl MboxLock {
    /// Create `<mailbox>.lock`, failing if it already exists
    pub fn acquire(mailbox: &Path) -> Result<Self> {
        let path = lock_path(mailbox);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(NotifyError::MailboxLocked(path)),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for MboxLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}
