use std::collections::HashMap;

use crate::error::{Error, Result};


/// Compares header name with a lowercase constant ignoring case
#[inline(always)]
pub fn is_header(val: &str, lowercase: &str) -> bool {
    if val.len() != lowercase.len() {
        return false;
    }
    for (idx, ch) in val.bytes().enumerate() {
        if lowercase.as_bytes()[idx] != ch.to_ascii_lowercase() {
            return false;
        }
    }
    return true;
}

#[inline(always)]
pub fn is_set_cookie(val: &str) -> bool {
    is_header(val, "set-cookie")
}

// tchar from RFC7230
fn is_token_char(ch: u8) -> bool {
    match ch {
        b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => true,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' |
        b'.' | b'^' | b'_' | b'`' | b'|' | b'~' => true,
        _ => false,
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid("header name must not be empty"));
    }
    if !name.bytes().all(is_token_char) {
        return Err(Error::invalid(
            format!("header name {:?} contains invalid characters", name)));
    }
    Ok(())
}

/// Trims spaces and tabs off every value
///
/// Fails if there are no values at all, or some value contains a line
/// break. Values which are empty after trimming are kept.
pub fn normalize_values<I>(values: I) -> Result<Vec<String>>
    where I: IntoIterator,
          I::Item: AsRef<str>,
{
    let mut result = Vec::new();
    for value in values {
        let value = value.as_ref();
        if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
            return Err(Error::invalid(
                format!("header value {:?} contains a line break", value)));
        }
        result.push(value.trim_matches(|c| c == ' ' || c == '\t')
            .to_string());
    }
    if result.is_empty() {
        return Err(Error::invalid("header value must not be empty"));
    }
    Ok(result)
}

fn push_line(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

/// Ordered table of headers with case-insensitive lookup
///
/// Each header is stored once under its canonical name: the casing it was
/// set with. All values of the header are kept in the order they were
/// added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    entries: Vec<(String, Vec<String>)>,
    /// Lowercase name -> canonical name
    index: HashMap<String, String>,
}

impl HeaderTable {
    pub fn new() -> HeaderTable {
        HeaderTable::default()
    }
    /// Builds a table from `(name, values)` pairs
    ///
    /// Pairs with the same name (in any casing) are merged like `add` does.
    pub fn from_pairs<I, N, V>(pairs: I) -> Result<HeaderTable>
        where I: IntoIterator<Item=(N, V)>,
              N: AsRef<str>,
              V: IntoIterator,
              V::Item: AsRef<str>,
    {
        let mut table = HeaderTable::new();
        for (name, values) in pairs {
            table.add(name.as_ref(), values)?;
        }
        Ok(table)
    }
    /// Number of distinct headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// Headers with their canonical names in order
    pub fn iter(&self) -> impl Iterator<Item=(&str, &[String])> {
        self.entries.iter().map(|(n, v)| (&n[..], &v[..]))
    }
    fn position(&self, name: &str) -> Option<usize> {
        let canonical = self.index.get(&name.to_ascii_lowercase())?;
        self.entries.iter().position(|(n, _)| n == canonical)
    }
    /// Canonical name the header is stored under
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.index.get(&name.to_ascii_lowercase()).map(|x| &x[..])
    }
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_ascii_lowercase())
    }
    /// All values of the header, empty slice if there is no such header
    pub fn get(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(pos) => &self.entries[pos].1,
            None => &[],
        }
    }
    /// All values of the header joined with a comma
    pub fn get_line(&self, name: &str) -> String {
        self.get(name).join(", ")
    }
    /// Returns true if `set(name, values)` wouldn't change anything
    ///
    /// Values are expected to be normalized already.
    pub fn is_same(&self, name: &str, values: &[String]) -> bool {
        self.canonical_name(name) == Some(name) && self.get(name) == values
    }
    /// Replaces all values of the header
    ///
    /// The old header (in any casing) is removed and the new one is
    /// appended to the end under `name`.
    pub fn set<I>(&mut self, name: &str, values: I) -> Result<()>
        where I: IntoIterator,
              I::Item: AsRef<str>,
    {
        check_name(name)?;
        let values = normalize_values(values)?;
        self.remove(name);
        self.index.insert(name.to_ascii_lowercase(), name.to_string());
        self.entries.push((name.to_string(), values));
        Ok(())
    }
    /// Same as `set` but puts the header in front of all others
    ///
    /// When the header exists its canonical name is kept.
    pub fn set_first<I>(&mut self, name: &str, values: I) -> Result<()>
        where I: IntoIterator,
              I::Item: AsRef<str>,
    {
        check_name(name)?;
        let values = normalize_values(values)?;
        let canonical = self.canonical_name(name)
            .unwrap_or(name).to_string();
        self.remove(name);
        self.index.insert(canonical.to_ascii_lowercase(), canonical.clone());
        self.entries.insert(0, (canonical, values));
        Ok(())
    }
    /// Appends values to the header, creates the header if it's absent
    pub fn add<I>(&mut self, name: &str, values: I) -> Result<()>
        where I: IntoIterator,
              I::Item: AsRef<str>,
    {
        check_name(name)?;
        let values = normalize_values(values)?;
        match self.position(name) {
            Some(pos) => self.entries[pos].1.extend(values),
            None => {
                self.index.insert(name.to_ascii_lowercase(), name.to_string());
                self.entries.push((name.to_string(), values));
            }
        }
        Ok(())
    }
    /// Removes the header, returns false if there was no such header
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(pos) => {
                self.entries.remove(pos);
                self.index.remove(&name.to_ascii_lowercase());
                true
            }
            None => false,
        }
    }
    /// Replaces the header with a single value without validation
    ///
    /// For names and values produced by the crate itself.
    pub(crate) fn put(&mut self, name: &'static str, value: String) {
        self.remove(name);
        self.index.insert(name.to_ascii_lowercase(), name.to_string());
        self.entries.push((name.to_string(), vec![value]));
    }
    /// A `Name: value, value\r\n` line for every header
    ///
    /// `Set-Cookie` can't be folded, so each of its values gets a line.
    pub(crate) fn to_lines(&self) -> String {
        let mut out = String::new();
        for (name, values) in &self.entries {
            if is_set_cookie(name) {
                for value in values {
                    push_line(&mut out, name, value);
                }
            } else {
                push_line(&mut out, name, &values.join(", "));
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::{is_header, is_set_cookie};
    use super::{normalize_values, HeaderTable};

    #[test]
    fn test_name_match() {
        assert!(is_header("Host", "host"));
        assert!(is_header("HOST", "host"));
        assert!(!is_header("Hos", "host"));
        assert!(is_header("content-LENGTH", "content-length"));
        assert!(is_set_cookie("Set-Cookie"));
        assert!(!is_set_cookie("Set-Cookie2"));
    }

    #[test]
    fn test_set_get_any_case() {
        let mut table = HeaderTable::new();
        table.set("X-Foo", [" a ", "\tb", "c d"]).unwrap();
        for name in &["X-Foo", "x-foo", "X-FOO", "x-fOo"] {
            assert!(table.has(name));
            assert_eq!(table.get(name), &["a", "b", "c d"]);
        }
        assert_eq!(table.get_line("x-foo"), "a, b, c d");
        assert_eq!(table.canonical_name("X-FOO"), Some("X-Foo"));
    }

    #[test]
    fn test_set_replaces() {
        let mut table = HeaderTable::new();
        table.set("Accept", ["text/html"]).unwrap();
        table.set("X-Other", ["1"]).unwrap();
        table.set("accept", ["*/*"]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.canonical_name("ACCEPT"), Some("accept"));
        let names: Vec<_> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["X-Other", "accept"]);
    }

    #[test]
    fn test_empty_values() {
        let mut table = HeaderTable::new();
        let empty: [&str; 0] = [];
        assert!(table.set("X-Foo", empty).unwrap_err().is_validation());
        assert!(table.add("X-Foo", empty).unwrap_err().is_validation());
        assert!(!table.has("X-Foo"));
        // whitespace-only value is still a value
        table.set("X-Foo", ["  "]).unwrap();
        assert_eq!(table.get("X-Foo"), &[""]);
    }

    #[test]
    fn test_invalid() {
        let mut table = HeaderTable::new();
        assert!(table.set("", ["x"]).unwrap_err().is_validation());
        assert!(table.set("Bad Name", ["x"]).unwrap_err().is_validation());
        assert!(table.set("X-Foo", ["a\r\nInjected: 1"])
                .unwrap_err().is_validation());
        assert!(table.is_empty());
    }

    #[test]
    fn test_add() {
        let mut table = HeaderTable::new();
        table.add("Vary", ["Accept"]).unwrap();
        table.add("VARY", ["Cookie"]).unwrap();
        assert_eq!(table.get("vary"), &["Accept", "Cookie"]);
        assert_eq!(table.canonical_name("vary"), Some("Vary"));
    }

    #[test]
    fn test_remove() {
        let mut table = HeaderTable::from_pairs(vec![
            ("A", vec!["1"]),
            ("B", vec!["2"]),
        ]).unwrap();
        assert!(table.remove("a"));
        assert!(!table.remove("a"));
        assert!(!table.has("A"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_set_first() {
        let mut table = HeaderTable::new();
        table.set("Accept", ["*/*"]).unwrap();
        table.set("HOST", ["old"]).unwrap();
        table.set_first("Host", ["new:8080"]).unwrap();
        let names: Vec<_> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["HOST", "Accept"]);
        assert_eq!(table.get("host"), &["new:8080"]);
    }

    #[test]
    fn test_is_same() {
        let mut table = HeaderTable::new();
        table.set("X-Foo", ["a"]).unwrap();
        let values = normalize_values([" a "]).unwrap();
        assert!(table.is_same("X-Foo", &values));
        assert!(!table.is_same("x-foo", &values));
    }

    #[test]
    fn test_lines() {
        let mut table = HeaderTable::new();
        table.set("A", ["1", "2"]).unwrap();
        table.set("B", ["3"]).unwrap();
        assert_eq!(table.to_lines(), "A: 1, 2\r\nB: 3\r\n");

        let mut table = HeaderTable::new();
        table.set("Set-Cookie", ["a=1", "b=2"]).unwrap();
        assert_eq!(table.to_lines(), "Set-Cookie: a=1\r\nSet-Cookie: b=2\r\n");
    }

    #[test]
    fn test_put() {
        let mut table = HeaderTable::new();
        table.set("content-length", ["1"]).unwrap();
        table.set("Accept", ["*/*"]).unwrap();
        table.put("Content-Length", "10".to_string());
        assert_eq!(table.len(), 2);
        assert_eq!(table.to_lines(), "Accept: */*\r\nContent-Length: 10\r\n");
    }
}
