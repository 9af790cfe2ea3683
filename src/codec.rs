// Copyright (c) 2022 The Nakaflow developers
// Licensed under the Apache License, Version 2.0 see LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0 or the MIT license, see
// LICENSE-MIT or http://opensource.org/licenses/MIT

use serde::de::{DeserializeOwned, Error as DeError};
use serde::{Deserialize, Deserializer, Serialize};

/// Refuse to decode cached or exported documents larger than this
pub const CODEC_BYTES_LIMIT: usize = 512 * 1024 * 1024;

pub fn encode_to_vec<T: Serialize>(val: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(val)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    if bytes.len() > CODEC_BYTES_LIMIT {
        return Err(serde_json::Error::custom(format!(
            "document of {} bytes exceeds the {CODEC_BYTES_LIMIT} bytes limit",
            bytes.len()
        )));
    }

    serde_json::from_slice(bytes)
}

/// Subgraphs encode `BigInt` and `BigDecimal` values as JSON strings while
/// locally exported tables carry plain numbers. Accept both.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Str(String),
}

impl Lenient {
    fn to_f64(&self) -> Result<f64, String> {
        match self {
            Self::Unsigned(v) => Ok(*v as f64),
            Self::Signed(v) => Ok(*v as f64),
            Self::Float(v) => Ok(*v),
            Self::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|err| format!("invalid number {s:?}: {err}")),
        }
    }

    fn to_i64(&self) -> Result<i64, String> {
        match self {
            Self::Unsigned(v) => i64::try_from(*v).map_err(|_| format!("{v} does not fit in i64")),
            Self::Signed(v) => Ok(*v),
            Self::Str(s) => match s.trim().parse::<i64>() {
                Ok(v) => Ok(v),
                Err(_) => integral(Self::Str(s.clone()).to_f64()?).map(|v| v as i64),
            },
            Self::Float(v) => integral(*v).map(|v| v as i64),
        }
    }

    fn to_u64(&self) -> Result<u64, String> {
        match self {
            Self::Unsigned(v) => Ok(*v),
            Self::Signed(v) => u64::try_from(*v).map_err(|_| format!("{v} is negative")),
            Self::Str(s) => match s.trim().parse::<u64>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    let v = integral(Self::Str(s.clone()).to_f64()?)?;
                    if v < 0.0 {
                        return Err(format!("{v} is negative"));
                    }
                    Ok(v as u64)
                }
            },
            Self::Float(v) => {
                let v = integral(*v)?;
                if v < 0.0 {
                    return Err(format!("{v} is negative"));
                }
                Ok(v as u64)
            }
        }
    }
}

fn integral(v: f64) -> Result<f64, String> {
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(format!("{v} is not an integer"));
    }

    Ok(v)
}

pub fn de_u64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Lenient::deserialize(deserializer)?
        .to_u64()
        .map_err(D::Error::custom)
}

pub fn de_i64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Lenient::deserialize(deserializer)?
        .to_i64()
        .map_err(D::Error::custom)
}

pub fn de_f64_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Lenient::deserialize(deserializer)?
        .to_f64()
        .map_err(D::Error::custom)
}
