//! Native messaging framing: a 32-bit length in native byte order followed by UTF-8 JSON.

use crate::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};

/// Largest request accepted from the browser.
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024 * 1024;

pub const STATUS_OK: &str = "ok";
pub const STATUS_INSTALLED: &str = "installed";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "URL")]
    pub url: Option<String>,
}

impl Request {
    /// A non-empty `status` marks an installation probe from the extension.
    pub fn is_probe(&self) -> bool {
        self.status.as_deref().is_some_and(|status| !status.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: String,
}

impl Response {
    pub fn ok() -> Self {
        Response {
            status: STATUS_OK.to_string(),
        }
    }

    pub fn installed() -> Self {
        Response {
            status: STATUS_INSTALLED.to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response {
            status: message.into(),
        }
    }
}

/// Read one framed request. `Ok(None)` means the browser closed the channel before sending one.
pub fn read_message<R: Read>(input: &mut R) -> Result<Option<Request>, BridgeError> {
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        match input.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => {
                return Err(BridgeError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated message header",
                )))
            }
            Ok(read) => filled += read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(BridgeError::Read(err)),
        }
    }

    let length = u32::from_ne_bytes(header);
    if length > MAX_MESSAGE_SIZE {
        return Err(BridgeError::TooLarge(length));
    }
    let mut body = vec![0u8; length as usize];
    input.read_exact(&mut body).map_err(BridgeError::Read)?;
    Ok(Some(serde_json::from_slice(&body)?))
}

/// Write one framed response and flush it.
pub fn write_message<W: Write>(output: &mut W, response: &Response) -> Result<(), BridgeError> {
    let body = serde_json::to_vec(response)?;
    let length = u32::try_from(body.len()).map_err(|_| {
        BridgeError::Write(io::Error::new(
            io::ErrorKind::InvalidInput,
            "response too large",
        ))
    })?;
    output
        .write_all(&length.to_ne_bytes())
        .and_then(|_| output.write_all(&body))
        .and_then(|_| output.flush())
        .map_err(BridgeError::Write)
}

/// Frame raw JSON the way a browser would.
pub fn frame(json: &str) -> Vec<u8> {
    let mut bytes = (json.len() as u32).to_ne_bytes().to_vec();
    bytes.extend_from_slice(json.as_bytes());
    bytes
}
