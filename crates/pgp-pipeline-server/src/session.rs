//! Per-connection session state and verb dispatch (spec.md §4.G).
//!
//! Business logic for `sign`/`verify`/`import`/`export`/key management is
//! explicitly out of spec.md's scope; those verbs are acknowledged but do
//! nothing beyond validating that the required descriptors are set.
//! `encrypt`/`decrypt` are implemented for real, since they are the verbs
//! that actually exercise descriptor-wrapping-into-pipelines (the thing
//! spec.md §4.G *does* put in scope).

use std::collections::HashMap;
use std::os::unix::io::RawFd;

use log::{error, info};
use pgp_pipeline_core::block::BlockFilter;
use pgp_pipeline_core::strlist::StrList;
use pgp_pipeline_core::{Direction, Pipeline};

use crate::status::StatusLine;

pub struct VerbOutcome {
    lines: Vec<StatusLine>,
    close: bool,
}

impl VerbOutcome {
    fn ok(mut lines: Vec<StatusLine>) -> Self {
        lines.push(StatusLine::Ok);
        VerbOutcome { lines, close: false }
    }

    fn err(code: u32, message: impl Into<String>) -> Self {
        VerbOutcome { lines: vec![StatusLine::err(code, message)], close: false }
    }

    fn bye() -> Self {
        VerbOutcome { lines: vec![StatusLine::Ok], close: true }
    }

    pub fn status_lines(&self) -> &[StatusLine] {
        &self.lines
    }

    pub fn should_close(&self) -> bool {
        self.close
    }
}

#[derive(Default)]
pub struct Session {
    input_fd: Option<RawFd>,
    output_fd: Option<RawFd>,
    message_fd: Option<RawFd>,
    recipients: StrList,
    signer: Option<String>,
    options: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    fn reset(&mut self) {
        self.input_fd = None;
        self.output_fd = None;
        self.message_fd = None;
        self.recipients.free_all();
        self.signer = None;
        self.options.clear();
    }

    pub fn dispatch(&mut self, line: &str) -> VerbOutcome {
        let mut parts = line.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_uppercase();
        let rest = parts.next().unwrap_or("").trim();
        info!("dispatch {verb} {rest}");

        match verb.as_str() {
            "RESET" => {
                self.reset();
                VerbOutcome::ok(vec![])
            }
            "OPTION" => self.handle_option(rest),
            "RECIPIENT" => {
                if rest.is_empty() {
                    return VerbOutcome::err(1, "RECIPIENT requires a name");
                }
                self.recipients.append(rest);
                VerbOutcome::ok(vec![])
            }
            "SIGNER" => {
                if rest.is_empty() {
                    return VerbOutcome::err(1, "SIGNER requires a name");
                }
                self.signer = Some(rest.to_string());
                VerbOutcome::ok(vec![])
            }
            "INPUT" => self.set_fd(rest, Slot::Input),
            "OUTPUT" => self.set_fd(rest, Slot::Output),
            "MESSAGE" => self.set_fd(rest, Slot::Message),
            "ENCRYPT" => self.encrypt(),
            "DECRYPT" => self.decrypt(),
            "GETINFO" => VerbOutcome::ok(vec![StatusLine::info("VERSION", self.getinfo_json())]),
            "SIGN" | "VERIFY" | "IMPORT" | "EXPORT" | "LISTKEYS" | "DUMPKEYS" | "DELKEYS" | "GENKEY"
            | "GETAUDITLOG" | "PASSWD" => {
                VerbOutcome::err(100, format!("{verb} is out of scope for this pipeline engine"))
            }
            "BYE" | "QUIT" => VerbOutcome::bye(),
            "" => VerbOutcome::err(1, "empty command"),
            other => VerbOutcome::err(1, format!("unknown verb: {other}")),
        }
    }

    fn getinfo_json(&self) -> String {
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "pid": std::process::id(),
            "recipients": self.recipients.len(),
            "signer": self.signer.is_some(),
        })
        .to_string()
    }

    fn handle_option(&mut self, rest: &str) -> VerbOutcome {
        let Some((key, value)) = rest.split_once(['=', ' ']) else {
            return VerbOutcome::err(1, "OPTION requires key=value");
        };
        self.options.insert(key.trim().to_string(), value.trim().to_string());
        VerbOutcome::ok(vec![])
    }

    fn set_fd(&mut self, rest: &str, slot: Slot) -> VerbOutcome {
        let digits = rest.strip_prefix("FD=").unwrap_or(rest);
        match digits.trim().parse::<RawFd>() {
            Ok(fd) => {
                match slot {
                    Slot::Input => self.input_fd = Some(fd),
                    Slot::Output => self.output_fd = Some(fd),
                    Slot::Message => self.message_fd = Some(fd),
                }
                VerbOutcome::ok(vec![])
            }
            Err(_) => VerbOutcome::err(1, format!("{:?} requires FD=<n>", slot)),
        }
    }

    fn encrypt(&mut self) -> VerbOutcome {
        let (Some(in_fd), Some(out_fd)) = (self.input_fd, self.output_fd) else {
            return VerbOutcome::err(2, "ENCRYPT requires INPUT and OUTPUT descriptors");
        };
        let mut src = Pipeline::attach_handle(in_fd, true, true);
        let mut dst = Pipeline::attach_handle(out_fd, false, true);
        if let Err(e) = dst.push(Direction::OutputStream, Box::new(BlockFilter::for_write())) {
            return VerbOutcome::err(3, format!("failed to install framing filter: {e}"));
        }
        match Pipeline::copy(&mut src, &mut dst) {
            Ok(n) => {
                let _ = src.close();
                if let Err(e) = dst.close() {
                    return VerbOutcome::err(4, format!("flush failed: {e}"));
                }
                VerbOutcome::ok(vec![StatusLine::info("PROGRESS", format!("{n} bytes"))])
            }
            Err(e) => {
                error!("encrypt failed: {e}");
                let _ = dst.cancel();
                VerbOutcome::err(4, format!("encrypt failed: {e}"))
            }
        }
    }

    fn decrypt(&mut self) -> VerbOutcome {
        let (Some(in_fd), Some(out_fd)) = (self.input_fd, self.output_fd) else {
            return VerbOutcome::err(2, "DECRYPT requires INPUT and OUTPUT descriptors");
        };
        let mut src = Pipeline::attach_handle(in_fd, true, true);
        let first_c = match src.read_byte() {
            Ok(Some(b)) => b,
            Ok(None) => return VerbOutcome::err(5, "empty input, nothing to decrypt"),
            Err(e) => return VerbOutcome::err(5, format!("read failed: {e}")),
        };
        if let Err(e) = src.push(Direction::InputStream, Box::new(BlockFilter::for_read(first_c))) {
            return VerbOutcome::err(3, format!("failed to install framing filter: {e}"));
        }
        let mut dst = Pipeline::attach_handle(out_fd, false, true);
        match Pipeline::copy(&mut src, &mut dst) {
            Ok(n) => {
                let _ = src.close();
                if let Err(e) = dst.close() {
                    return VerbOutcome::err(4, format!("flush failed: {e}"));
                }
                VerbOutcome::ok(vec![StatusLine::info("PROGRESS", format!("{n} bytes"))])
            }
            Err(e) => {
                error!("decrypt failed: {e}");
                let _ = dst.cancel();
                VerbOutcome::err(4, format!("decrypt failed: {e}"))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Input,
    Output,
    Message,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_parses_key_value() {
        let mut s = Session::new();
        let outcome = s.dispatch("OPTION compress=none");
        assert!(matches!(outcome.status_lines().last(), Some(StatusLine::Ok)));
        assert_eq!(s.options.get("compress"), Some(&"none".to_string()));
    }

    #[test]
    fn encrypt_without_descriptors_errors() {
        let mut s = Session::new();
        let outcome = s.dispatch("ENCRYPT");
        assert!(matches!(outcome.status_lines().first(), Some(StatusLine::Err { .. })));
    }

    #[test]
    fn recipient_and_signer_round_trip() {
        let mut s = Session::new();
        assert!(matches!(s.dispatch("RECIPIENT alice@example.com").status_lines()[0], StatusLine::Ok));
        assert!(matches!(s.dispatch("SIGNER bob@example.com").status_lines()[0], StatusLine::Ok));
        assert_eq!(s.recipients.len(), 1);
        assert_eq!(s.signer.as_deref(), Some("bob@example.com"));
    }
}
