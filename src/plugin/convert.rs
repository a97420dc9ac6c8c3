//! Conversion between plugin values and Rust types.
//!
//! Byte payloads are byte strings: every byte is the char with the same code
//! point (U+0000..U+00FF), so any byte sequence survives the trip into a
//! plugin and back unchanged.

use starlark::values::dict::DictRef;
use starlark::values::list::ListRef;
use starlark::values::tuple::TupleRef;
use starlark::values::Value;

use super::error::PluginError;

/// Byte string for a payload
pub fn bytes_to_text(data: &[u8]) -> String {
    data.iter().map(|&b| char::from(b)).collect()
}

/// Payload bytes of a byte string, `None` if a char is above U+00FF
pub fn text_to_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars().map(|c| u8::try_from(c).ok()).collect()
}

/// Printable form of plugin text: byte strings holding UTF-8 are shown decoded
pub fn display_text(text: &str) -> String {
    match text_to_bytes(text) {
        Some(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        None => text.to_string(),
    }
}

/// Elements of a list or tuple, `None` for any other type
fn sequence_items<'v>(value: Value<'v>) -> Option<Vec<Value<'v>>> {
    if let Some(list) = ListRef::from_value(value) {
        return Some(list.iter().collect());
    }
    TupleRef::from_value(value).map(|tuple| tuple.content().to_vec())
}

/// A non-negative test count
pub fn to_count(capability: &str, value: Value) -> Result<u32, PluginError> {
    let count = value
        .unpack_i32()
        .ok_or_else(|| PluginError::bad_return(capability, "int", value.get_type()))?;
    u32::try_from(count)
        .map_err(|_| PluginError::bad_return(capability, "a non-negative int", count.to_string()))
}

/// Raw bytes: a byte string or a list of byte-valued ints
pub fn to_bytes(capability: &str, value: Value) -> Result<Vec<u8>, PluginError> {
    if let Some(text) = value.unpack_str() {
        return text_to_bytes(text).ok_or_else(|| {
            PluginError::bad_return(
                capability,
                "a byte string (use encode_utf8() for text)",
                "a string with chars above U+00FF",
            )
        });
    }
    if let Some(items) = sequence_items(value) {
        return items
            .into_iter()
            .map(|item| {
                item.unpack_i32()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| {
                        PluginError::bad_return(capability, "bytes in 0..=255", item.to_str())
                    })
            })
            .collect();
    }
    Err(PluginError::bad_return(
        capability,
        "string or list of bytes",
        value.get_type(),
    ))
}

/// Ordered string tokens; `None` counts as no tokens
pub fn to_tokens(capability: &str, value: Value) -> Result<Vec<String>, PluginError> {
    if value.is_none() {
        return Ok(Vec::new());
    }
    let items = sequence_items(value)
        .ok_or_else(|| PluginError::bad_return(capability, "list of strings", value.get_type()))?;
    items
        .into_iter()
        .map(|item| {
            item.unpack_str()
                .map(str::to_string)
                .ok_or_else(|| PluginError::bad_return(capability, "list of strings", item.get_type()))
        })
        .collect()
}

/// Relative file name to content; `None` counts as no files
pub fn to_files(capability: &str, value: Value) -> Result<Vec<(String, Vec<u8>)>, PluginError> {
    if value.is_none() {
        return Ok(Vec::new());
    }
    let dict = DictRef::from_value(value)
        .ok_or_else(|| PluginError::bad_return(capability, "dict of files", value.get_type()))?;
    dict.iter()
        .map(|(name, content)| {
            let name = name
                .unpack_str()
                .ok_or_else(|| PluginError::bad_return(capability, "string file names", name.get_type()))?;
            Ok((name.to_string(), to_bytes(capability, content)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use starlark::environment::{Globals, Module};
    use starlark::eval::Evaluator;
    use starlark::syntax::{AstModule, Dialect};

    /// Evaluate an expression and run a conversion on the result
    fn convert<T>(expr: &str, f: impl FnOnce(Value) -> Result<T, PluginError>) -> Result<T, PluginError> {
        let ast = AstModule::parse("test.star", expr.to_string(), &Dialect::Standard).unwrap();
        let module = Module::new();
        let globals = Globals::standard();
        let mut eval = Evaluator::new(&module);
        let value = eval.eval_module(ast, &globals).unwrap();
        f(value)
    }

    #[test]
    fn test_count() {
        assert_eq!(convert("3", |v| to_count("n", v)).unwrap(), 3);
        assert_eq!(convert("0", |v| to_count("n", v)).unwrap(), 0);
        assert!(matches!(
            convert("-1", |v| to_count("n", v)),
            Err(PluginError::BadReturn { .. })
        ));
        assert!(matches!(
            convert("\"3\"", |v| to_count("n", v)),
            Err(PluginError::BadReturn { .. })
        ));
    }

    #[test]
    fn test_bytes() {
        assert_eq!(
            convert("\"5 -3 10\"", |v| to_bytes("b", v)).unwrap(),
            b"5 -3 10".to_vec()
        );
        assert_eq!(
            convert("[0, 255, 10]", |v| to_bytes("b", v)).unwrap(),
            vec![0u8, 255, 10]
        );
        assert!(convert("[256]", |v| to_bytes("b", v)).is_err());
        assert!(convert("None", |v| to_bytes("b", v)).is_err());
    }

    #[test]
    fn test_byte_strings_are_lossless() {
        let data: Vec<u8> = (0..=255).collect();
        let text = bytes_to_text(&data);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(text_to_bytes(&text), Some(data));

        assert_ne!(bytes_to_text(&[0xff]), bytes_to_text(&[0xfe]));
        assert_eq!(text_to_bytes("\u{101}"), None);
    }

    #[test]
    fn test_display_text() {
        let text = bytes_to_text("привет".as_bytes());
        assert_eq!(display_text(&text), "привет");
        assert_eq!(display_text("\u{101}x"), "\u{101}x");
    }

    #[test]
    fn test_bytes_from_byte_string() {
        assert_eq!(
            convert("chr(255) + chr(0)", |v| to_bytes("b", v)).unwrap(),
            vec![0xffu8, 0x00]
        );
        assert!(matches!(
            convert("chr(256)", |v| to_bytes("b", v)),
            Err(PluginError::BadReturn { .. })
        ));
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            convert("[\"--n\", \"5\"]", |v| to_tokens("t", v)).unwrap(),
            vec!["--n".to_string(), "5".to_string()]
        );
        assert_eq!(
            convert("(\"a\",)", |v| to_tokens("t", v)).unwrap(),
            vec!["a".to_string()]
        );
        assert!(convert("None", |v| to_tokens("t", v)).unwrap().is_empty());
        assert!(convert("[1]", |v| to_tokens("t", v)).is_err());
    }

    #[test]
    fn test_files() {
        let files = convert("{\"a.txt\": \"x\", \"b.bin\": [1, 2]}", |v| to_files("f", v)).unwrap();
        assert_eq!(
            files,
            vec![
                ("a.txt".to_string(), b"x".to_vec()),
                ("b.bin".to_string(), vec![1u8, 2]),
            ]
        );
        assert!(convert("None", |v| to_files("f", v)).unwrap().is_empty());
        assert!(convert("[\"a\"]", |v| to_files("f", v)).is_err());
    }
}
