//! Reply assembly for the Redis wire protocol.
//!
//! Mirrors the `CmdRes` contract of the admin-command layer this crate is grounded on: an
//! executor does not hand back a finished byte buffer, it accumulates a *result* (ok / error
//! kind / raw content) into a `CmdRes` and the dispatcher renders that into RESP bytes once the
//! executor is done. Keeping the two separate lets an executor change its mind mid-`do()` (e.g.
//! bail out with a syntax error after already deciding the happy path) without having written
//! any bytes yet.

use crate::protocol_constants::CRLF;

/// The six terminal shapes a command result can take, taken from the admin layer's `CmdRes`
/// enum verbatim (`kNone`, `kOk`, `kSyntaxErr`, `kOutofRange`, `kWrongNum`, `kErrOther`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmdKind {
    /// No canned reply; whatever was appended via the `append_*` methods is the reply.
    None,
    Ok,
    SyntaxErr,
    OutOfRange,
    WrongNum,
    ErrOther,
}

/// Accumulates a command's reply. `kind` selects a canned RESP reply unless it is `None`, in
/// which case `buf` (built via the `append_*` helpers) is sent verbatim.
#[derive(Debug, Clone)]
pub struct CmdRes {
    kind: CmdKind,
    message: String,
    buf: Vec<u8>,
}

impl Default for CmdRes {
    fn default() -> Self {
        Self::new()
    }
}

impl CmdRes {
    pub fn new() -> Self {
        CmdRes {
            kind: CmdKind::None,
            message: String::new(),
            buf: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.kind = CmdKind::None;
        self.message.clear();
        self.buf.clear();
    }

    pub fn kind(&self) -> CmdKind {
        self.kind
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.kind, CmdKind::Ok) || (matches!(self.kind, CmdKind::None) && !self.buf.is_empty())
    }

    pub fn set_ok(&mut self) {
        self.kind = CmdKind::Ok;
    }

    pub fn set_syntax_err(&mut self) {
        self.kind = CmdKind::SyntaxErr;
    }

    pub fn set_out_of_range(&mut self) {
        self.kind = CmdKind::OutOfRange;
    }

    pub fn set_wrong_num(&mut self, cmd_name: &str) {
        self.kind = CmdKind::WrongNum;
        self.message = cmd_name.to_string();
    }

    pub fn set_err_other(&mut self, msg: impl Into<String>) {
        self.kind = CmdKind::ErrOther;
        self.message = msg.into();
    }

    /// Appends a bulk-string length header (`$<n>\r\n`) to the raw reply buffer.
    pub fn append_bulk_len(&mut self, n: i64) {
        self.buf.extend_from_slice(format!("${}{}", n, CRLF).as_bytes());
    }

    /// Appends an array length header (`*<n>\r\n`).
    pub fn append_array_len(&mut self, n: i64) {
        self.buf.extend_from_slice(format!("*{}{}", n, CRLF).as_bytes());
    }

    /// Appends an integer reply (`:<n>\r\n`).
    pub fn append_integer(&mut self, n: i64) {
        self.buf.extend_from_slice(format!(":{}{}", n, CRLF).as_bytes());
    }

    /// Appends raw content followed by a trailing CRLF (used after `append_bulk_len`, or to
    /// build up a simple-string line by hand).
    pub fn append_content(&mut self, content: &str) {
        self.buf.extend_from_slice(content.as_bytes());
        self.buf.extend_from_slice(CRLF.as_bytes());
    }

    /// Appends a bulk string (length header + payload) in one call.
    pub fn append_bulk_string(&mut self, content: &str) {
        self.append_bulk_len(content.len() as i64);
        self.append_content(content);
    }

    /// Appends a nil bulk string (`$-1\r\n`), RESP's representation of a missing key.
    pub fn append_nil_bulk(&mut self) {
        self.buf.extend_from_slice(format!("$-1{}", CRLF).as_bytes());
    }

    /// Sets the whole reply to a custom simple string (`+<body>\r\n`), for replies like `PONG`
    /// that aren't the canned `OK`.
    pub fn set_simple_string(&mut self, body: &str) {
        self.buf.clear();
        self.buf.extend_from_slice(format!("+{}{}", body, CRLF).as_bytes());
    }

    /// Renders the accumulated result into the final RESP byte sequence.
    pub fn render(&self) -> Vec<u8> {
        match self.kind {
            CmdKind::None => self.buf.clone(),
            CmdKind::Ok => b"+OK\r\n".to_vec(),
            CmdKind::SyntaxErr => format!("-ERR syntax error{}", CRLF).into_bytes(),
            CmdKind::OutOfRange => format!("-ERR value is not an integer or out of range{}", CRLF).into_bytes(),
            CmdKind::WrongNum => format!(
                "-ERR wrong number of arguments for '{}' command{}",
                self.message, CRLF
            )
            .into_bytes(),
            CmdKind::ErrOther => format!("-ERR {}{}", self.message, CRLF).into_bytes(),
        }
    }
}

/// Top-level reply for a request the dispatcher could not even look up a command for.
pub fn unknown_command_reply(name: &str) -> Vec<u8> {
    format!("-ERR unknown command '{}'{}", name, CRLF).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_renders_simple_string() {
        let mut r = CmdRes::new();
        r.set_ok();
        assert_eq!(r.render(), b"+OK\r\n");
    }

    #[test]
    fn wrong_num_includes_command_name() {
        let mut r = CmdRes::new();
        r.set_wrong_num("get");
        let out = String::from_utf8(r.render()).unwrap();
        assert!(out.contains("'get'"));
        assert!(out.starts_with('-'));
    }

    #[test]
    fn bulk_string_round_trips_length_prefix() {
        let mut r = CmdRes::new();
        r.append_bulk_string("hello");
        assert_eq!(r.render(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn clear_resets_everything() {
        let mut r = CmdRes::new();
        r.set_err_other("boom");
        r.clear();
        assert_eq!(r.kind(), CmdKind::None);
        assert!(r.render().is_empty());
    }
}
