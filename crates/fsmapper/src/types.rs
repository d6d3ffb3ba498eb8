//! Protocol messages exchanged with transport layers.
//!
//! Requests arrive as JSON objects `{ cmd, path, id }`. Responses are a
//! tagged union: a stat of a file or directory, a bare acknowledgement, or an
//! error `{ error, message }`. Serialization produces the flat JSON shape
//! clients expect, with `"type": "file" | "dir"` selecting the variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Malformed request: missing or unknown command.
pub const BAD_REQUEST: u16 = 400;

/// Resolution or filesystem failure.
pub const NOT_FOUND: u16 = 404;

/// Inbound protocol message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(default)]
    pub path: String,
    /// Correlation token, echoed verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Reserved for chunked transfer. Accepted and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Reserved for chunked transfer. Accepted and ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

impl Request {
    pub fn new(cmd: Command, path: impl Into<String>) -> Self {
        Self {
            cmd: Some(cmd.as_str().to_string()),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Protocol verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Metadata only; directories list their children.
    Head,
    /// Metadata plus file content, or flat child names for directories.
    Get,
    /// Same as `Get`; no watch is registered.
    Subscribe,
    /// No-op.
    Unsubscribe,
}

impl Command {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "head" => Some(Self::Head),
            "get" => Some(Self::Get),
            "subscribe" => Some(Self::Subscribe),
            "unsubscribe" => Some(Self::Unsubscribe),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Get => "get",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

/// Entry type as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Fields shared by file and directory stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatInfo {
    pub path: String,
    pub name: String,
    pub birthtime: DateTime<Utc>,
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub atime: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStat {
    #[serde(flatten)]
    pub info: StatInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirStat {
    #[serde(flatten)]
    pub info: StatInfo,
    pub entries: Vec<Listing>,
    /// Set for top-level directories: whether an entry point file is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hasindex: Option<bool>,
}

/// Result of a successful `head` or `get`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Stat {
    #[serde(rename = "file")]
    File(FileStat),
    #[serde(rename = "dir")]
    Dir(DirStat),
}

impl Stat {
    pub fn info(&self) -> &StatInfo {
        match self {
            Self::File(file) => &file.info,
            Self::Dir(dir) => &dir.info,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Self::File(_) => EntryKind::File,
            Self::Dir(_) => EntryKind::Dir,
        }
    }

    pub fn as_file(&self) -> Option<&FileStat> {
        match self {
            Self::File(file) => Some(file),
            Self::Dir(_) => None,
        }
    }

    pub fn as_dir(&self) -> Option<&DirStat> {
        match self {
            Self::Dir(dir) => Some(dir),
            Self::File(_) => None,
        }
    }
}

/// Structural node for a subdirectory in a single-level listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub path: String,
    pub entries: Vec<String>,
}

/// One element of a directory's `entries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    /// A bare child name.
    Name(String),
    /// A subdirectory with its child names, taken from the explored tree.
    Node(TreeNode),
    /// A fully stat'ed subdirectory produced by a crawl.
    Stat(Box<Stat>),
}

/// Outbound protocol message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Stat {
        #[serde(flatten)]
        stat: Stat,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    Ack {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
    },
    Error {
        error: u16,
        message: String,
    },
}

impl Response {
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::Error {
            error: code,
            message: message.into(),
        }
    }
}
