//! Cache keys for remote page locators.
//!
//! A key is the last two path segments of the locator (directory and file name)
//! joined with `_`. Using only the file name would collide across chapters that
//! all number their pages `001.jpg`, `002.jpg`, ...
//!
//! Every byte outside `[A-Za-z0-9.-]` is written as `%XX`, including `_` itself
//! and a segment's leading `.`,
//! so the mapping from `(dir, file)` to key is injective and the key is always a
//! single safe file name.

use std::borrow::Cow;

use url::Url;

pub const SEPARATOR: char = '_';

pub fn derive_key(locator: &str) -> String {
    let path = path_of(locator);
    let (dir, file) = last_two_segments(&path);
    let mut out = String::with_capacity(dir.len() + file.len() + 1);
    escape_into(&mut out, dir);
    out.push(SEPARATOR);
    escape_into(&mut out, file);
    out
}

fn path_of(locator: &str) -> Cow<'_, str> {
    match Url::parse(locator) {
        Ok(url) => Cow::Owned(url.path().to_string()),
        // query and fragment never take part in the key
        Err(_) => Cow::Borrowed(locator.split(['?', '#']).next().unwrap_or("")),
    }
}

fn last_two_segments(path: &str) -> (&str, &str) {
    let mut segs = path.rsplit('/').filter(|s| !s.is_empty());
    let file = segs.next().unwrap_or("");
    let dir = segs.next().unwrap_or("");
    (dir, file)
}

fn escape_into(out: &mut String, seg: &str) {
    for (i, b) in seg.bytes().enumerate() {
        // a leading dot would make a hidden or relative file name
        if b.is_ascii_alphanumeric() || b == b'-' || (b == b'.' && i > 0) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push_str(&hex::encode_upper([b]));
        }
    }
}
