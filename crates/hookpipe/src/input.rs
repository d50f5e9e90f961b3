//! Reading the text to deliver.
//!
//! The whole input is buffered before chunking starts. Bytes that are not valid UTF-8
//! are replaced with U+FFFD rather than rejected.

use hookpipe_core::{Error, Result};
use std::io::IsTerminal;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read standard input to EOF.
///
/// Fails instead of waiting for keyboard input when stdin is an interactive terminal.
pub async fn read_stdin() -> Result<String> {
    if std::io::stdin().is_terminal() {
        return Err(Error::Read(
            "stdin is a terminal; pipe or redirect the text to send".to_string(),
        ));
    }
    read_text(tokio::io::stdin()).await
}

pub async fn read_text<R>(mut reader: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader
        .read_to_end(&mut buf)
        .await
        .map_err(|e| Error::Read(e.to_string()))?;
    Ok(match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_utf8_verbatim() {
        let text = read_text(&b"line 1\nl\xc3\xadnea 2\n"[..]).await.unwrap();
        assert_eq!(text, "line 1\nlínea 2\n");
    }

    #[tokio::test]
    async fn empty_input_is_empty_text() {
        assert_eq!(read_text(&b""[..]).await.unwrap(), "");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_rejected() {
        let text = read_text(&b"ok \xff\xfe end"[..]).await.unwrap();
        assert_eq!(text, "ok \u{fffd}\u{fffd} end");
    }
}
