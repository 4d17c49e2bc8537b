//! The archive worker's wire protocol: a length-prefixed (`uint16`
//! little-endian) list of `\x01`-joined strings per message (§4.5.2,
//! §6 "Inter-process wire protocol").
//!
//! The worker and its clients are modeled as async tasks communicating
//! over in-process channels rather than a real Unix-domain socket
//! (§5), but the message shape is kept exactly as specified so the
//! encode/decode round-trip and verb set match a real wire
//! implementation.

use std::fmt;

const SEPARATOR: u8 = 0x01;

/// One message verb exchanged between the worker, its clients, and its
/// performers (§4.5.2 "Message verbs").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    /// `download(uri, path)` — client requests a URI be fetched to
    /// `path`.
    Download { uri: String, path: String },
    /// `set-download-size(uri, size)` — declares the expected size
    /// before transfer starts, for later mismatch detection.
    SetDownloadSize { uri: String, size: u64 },
    /// `set-short-alias(uri, alias)` — a short display name for
    /// progress reporting.
    SetShortAlias { uri: String, alias: String },
    /// `set-long-alias(uri, alias)` — a long display name.
    SetLongAlias { uri: String, alias: String },
    /// `done(uri, error)` — a performer finished; empty `error` means
    /// success.
    Done { uri: String, error: String },
    /// `done-ack(uri, error)` — a client acknowledges a `done`,
    /// allowing the worker to record the final result and notify
    /// duplicates.
    DoneAck { uri: String, error: String },
    /// `progress(uri, current, total)` — periodic transfer progress.
    Progress { uri: String, current: u64, total: u64 },
    /// `pop-download` — worker requests the next queued on-hold
    /// request be started, if capacity allows.
    PopDownload,
    /// `proceed-download(uri)` — worker tells a client its request has
    /// moved from on-hold to active.
    ProceedDownload { uri: String },
    /// `ping` — liveness probe.
    Ping,
    /// `exit` — client or parent requests the worker shut down.
    Exit,
    /// `eof` — a socket's peer closed its write half.
    Eof,
}

impl Verb {
    fn tag(&self) -> &'static str {
        match self {
            Self::Download { .. } => "download",
            Self::SetDownloadSize { .. } => "set-download-size",
            Self::SetShortAlias { .. } => "set-short-alias",
            Self::SetLongAlias { .. } => "set-long-alias",
            Self::Done { .. } => "done",
            Self::DoneAck { .. } => "done-ack",
            Self::Progress { .. } => "progress",
            Self::PopDownload => "pop-download",
            Self::ProceedDownload { .. } => "proceed-download",
            Self::Ping => "ping",
            Self::Exit => "exit",
            Self::Eof => "eof",
        }
    }

    /// Encode as the fields that would follow the verb tag on the
    /// wire.
    fn fields(&self) -> Vec<String> {
        match self {
            Self::Download { uri, path } => vec![uri.clone(), path.clone()],
            Self::SetDownloadSize { uri, size } => vec![uri.clone(), size.to_string()],
            Self::SetShortAlias { uri, alias } | Self::SetLongAlias { uri, alias } => vec![uri.clone(), alias.clone()],
            Self::Done { uri, error } | Self::DoneAck { uri, error } => vec![uri.clone(), error.clone()],
            Self::Progress { uri, current, total } => vec![uri.clone(), current.to_string(), total.to_string()],
            Self::ProceedDownload { uri } => vec![uri.clone()],
            Self::PopDownload | Self::Ping | Self::Exit | Self::Eof => vec![],
        }
    }

    /// Encode this verb as a length-prefixed `\x01`-joined byte
    /// message, matching §4.5.2's wire format.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut parts = vec![self.tag().to_string()];
        parts.extend(self.fields());
        let joined = parts.join(&(SEPARATOR as char).to_string());
        let body = joined.into_bytes();
        let len = u16::try_from(body.len()).unwrap_or(u16::MAX);
        let mut out = Vec::with_capacity(2 + body.len());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// Decode a message body (without its length prefix) back into a
    /// `Verb`.
    #[must_use]
    pub fn decode(body: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(body).ok()?;
        let mut fields = text.split(SEPARATOR as char);
        let tag = fields.next()?;
        let rest: Vec<&str> = fields.collect();

        Some(match tag {
            "download" => Self::Download { uri: (*rest.first()?).to_string(), path: (*rest.get(1)?).to_string() },
            "set-download-size" => {
                Self::SetDownloadSize { uri: (*rest.first()?).to_string(), size: rest.get(1)?.parse().ok()? }
            }
            "set-short-alias" => Self::SetShortAlias { uri: (*rest.first()?).to_string(), alias: (*rest.get(1)?).to_string() },
            "set-long-alias" => Self::SetLongAlias { uri: (*rest.first()?).to_string(), alias: (*rest.get(1)?).to_string() },
            "done" => Self::Done { uri: (*rest.first()?).to_string(), error: (*rest.get(1)?).to_string() },
            "done-ack" => Self::DoneAck { uri: (*rest.first()?).to_string(), error: (*rest.get(1)?).to_string() },
            "progress" => Self::Progress {
                uri: (*rest.first()?).to_string(),
                current: rest.get(1)?.parse().ok()?,
                total: rest.get(2)?.parse().ok()?,
            },
            "pop-download" => Self::PopDownload,
            "proceed-download" => Self::ProceedDownload { uri: (*rest.first()?).to_string() },
            "ping" => Self::Ping,
            "exit" => Self::Exit,
            "eof" => Self::Eof,
            _ => return None,
        })
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_round_trips() {
        let verb = Verb::Download { uri: "http://example/a.deb".to_string(), path: "/tmp/a.deb".to_string() };
        let encoded = verb.encode();
        let len = u16::from_le_bytes([encoded[0], encoded[1]]) as usize;
        let decoded = Verb::decode(&encoded[2..2 + len]).expect("valid message");
        assert_eq!(decoded, verb);
    }

    #[test]
    fn progress_round_trips() {
        let verb = Verb::Progress { uri: "http://example/a.deb".to_string(), current: 10, total: 100 };
        let encoded = verb.encode();
        let len = u16::from_le_bytes([encoded[0], encoded[1]]) as usize;
        assert_eq!(Verb::decode(&encoded[2..2 + len]), Some(verb));
    }
}
