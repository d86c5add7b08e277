//! Turning raw password input into text.

use std::ffi::OsString;

use crate::errors::Error;

/// Interpret password bytes as UTF-8 text, failing with an `Encoding` error otherwise.
pub fn password_from_bytes(bytes: Vec<u8>) -> Result<String, Error> {
    Ok(String::from_utf8(bytes)?)
}

/// Same as `password_from_bytes` for a command-line argument.
pub fn password_from_os(arg: OsString) -> Result<String, Error> {
    password_from_bytes(arg.into_encoded_bytes())
}

/// Drops one trailing `\n` or `\r\n`, as left behind by `echo` or an interactive prompt.
pub fn strip_line_ending(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }
    }
    bytes
}
