//! `{placeholder}` substitution for log messages.

use serde_json::Value;

use crate::log_record::Context;

/// Replace every `{key}` in `message` whose context value is a scalar.
///
/// Strings are inserted verbatim, numbers and booleans in their display
/// form. Placeholders naming missing, null, array or object values are left
/// untouched. Substituted text is never scanned again.
pub fn interpolate(message: &str, context: &Context) -> String {
    if context.is_empty() || !message.contains('{') {
        return message.to_owned();
    }
    let mut out = String::with_capacity(message.len());
    let mut rest = message;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let replacement = after
            .find('}')
            .and_then(|close| scalar(context.get(&after[..close])?).map(|text| (close, text)));
        match replacement {
            Some((close, text)) => {
                out.push_str(&text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
