//! JSON line serialisation for shipped records.

use serde::Serialize;

use crate::log_record::LogRecord;

/// Line terminator placed after every record in the request body.
pub const RECORD_TERMINATOR: &[u8] = b"\r\n";

/// Wire shape of a single record.
#[derive(Debug, Serialize)]
pub struct WireRecord<'a> {
    pub level: &'a str,
    pub message: &'a str,
    pub timestamp: i64,
}

impl<'a> From<&'a LogRecord> for WireRecord<'a> {
    fn from(record: &'a LogRecord) -> Self {
        Self {
            level: record.level().as_str(),
            message: record.message(),
            timestamp: record.timestamp(),
        }
    }
}

/// Serialise `record` as one JSON object followed by `\r\n`.
///
/// The whole line is built before anything is returned, so a failure never
/// leaves partial output behind.
pub fn serialise_line<T: Serialize + ?Sized>(record: &T) -> serde_json::Result<Vec<u8>> {
    let mut line = serde_json::to_vec(record)?;
    line.extend_from_slice(RECORD_TERMINATOR);
    Ok(line)
}
