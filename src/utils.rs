use std::io::{Read, Write};

use anyhow::Result;
use chrono::Utc;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn compress_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let content = serde_json::to_vec(value)?;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&content)?;
    let bytes = encoder.finish()?;

    Ok(bytes)
}

pub fn decompress_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut content = Vec::new();
    decoder.read_to_end(&mut content)?;
    let value = serde_json::from_slice(&content)?;

    Ok(value)
}

pub fn nan_is_zero(value: f64) -> f64 {
    if value.is_nan() || value.is_infinite() {
        0.0
    } else {
        value
    }
}

/// `part / whole * 100`, zero when undefined.
pub fn percentage(part: i64, whole: i64) -> f64 {
    nan_is_zero(part as f64 / whole as f64 * 100.0)
}

pub fn per_second(value: i64, elapsed_secs: f64) -> f64 {
    nan_is_zero(value as f64 / elapsed_secs)
}

pub fn per_minute(value: i64, elapsed_secs: f64) -> f64 {
    nan_is_zero(value as f64 / elapsed_secs * 60.0)
}
