//! AMF0 value encoding/decoding.
//!
//! Written directly against the Adobe "Action Message Format 0" wire
//! format; see `DESIGN.md` for provenance notes on this module.

use std::collections::HashMap;

use crate::error::{Result, RtmpError};

const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0A;

#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(HashMap<String, AmfValue>),
    Null,
    Undefined,
    EcmaArray(HashMap<String, AmfValue>),
    StrictArray(Vec<AmfValue>),
}

impl AmfValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HashMap<String, AmfValue>> {
        match self {
            AmfValue::Object(m) | AmfValue::EcmaArray(m) => Some(m),
            _ => None,
        }
    }
}

pub fn encode(value: &AmfValue, out: &mut Vec<u8>) {
    match value {
        AmfValue::Number(n) => {
            out.push(MARKER_NUMBER);
            out.extend_from_slice(&n.to_be_bytes());
        }
        AmfValue::Boolean(b) => {
            out.push(MARKER_BOOLEAN);
            out.push(if *b { 1 } else { 0 });
        }
        AmfValue::String(s) => {
            out.push(MARKER_STRING);
            encode_utf8(s, out);
        }
        AmfValue::Object(map) => {
            out.push(MARKER_OBJECT);
            encode_object_body(map, out);
        }
        AmfValue::Null => out.push(MARKER_NULL),
        AmfValue::Undefined => out.push(MARKER_UNDEFINED),
        AmfValue::EcmaArray(map) => {
            out.push(MARKER_ECMA_ARRAY);
            out.extend_from_slice(&(map.len() as u32).to_be_bytes());
            encode_object_body(map, out);
        }
        AmfValue::StrictArray(items) => {
            out.push(MARKER_STRICT_ARRAY);
            out.extend_from_slice(&(items.len() as u32).to_be_bytes());
            for item in items {
                encode(item, out);
            }
        }
    }
}

fn encode_utf8(s: &str, out: &mut Vec<u8>) {
    let bytes = s.as_bytes();
    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn encode_object_body(map: &HashMap<String, AmfValue>, out: &mut Vec<u8>) {
    for (key, value) in map {
        encode_utf8(key, out);
        encode(value, out);
    }
    out.extend_from_slice(&[0x00, 0x00, MARKER_OBJECT_END]);
}

/// Decodes one AMF0 value starting at `pos`, advancing `pos` past it.
pub fn decode(data: &[u8], pos: &mut usize) -> Result<AmfValue> {
    let marker = read_u8(data, pos)?;
    match marker {
        MARKER_NUMBER => {
            let bytes = read_n(data, pos, 8)?;
            Ok(AmfValue::Number(f64::from_be_bytes(bytes.try_into().unwrap())))
        }
        MARKER_BOOLEAN => Ok(AmfValue::Boolean(read_u8(data, pos)? != 0)),
        MARKER_STRING => Ok(AmfValue::String(decode_utf8(data, pos)?)),
        MARKER_OBJECT => Ok(AmfValue::Object(decode_object_body(data, pos)?)),
        MARKER_NULL => Ok(AmfValue::Null),
        MARKER_UNDEFINED => Ok(AmfValue::Undefined),
        MARKER_ECMA_ARRAY => {
            let _count = read_u32(data, pos)?;
            Ok(AmfValue::EcmaArray(decode_object_body(data, pos)?))
        }
        MARKER_STRICT_ARRAY => {
            let count = read_u32(data, pos)? as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(decode(data, pos)?);
            }
            Ok(AmfValue::StrictArray(items))
        }
        other => Err(RtmpError::Parse(format!("unsupported AMF0 marker 0x{:02x}", other))),
    }
}

fn decode_object_body(data: &[u8], pos: &mut usize) -> Result<HashMap<String, AmfValue>> {
    let mut map = HashMap::new();
    loop {
        // An object-end sequence is an empty UTF-8 string followed by 0x09.
        if data.len() >= *pos + 3 && data[*pos] == 0 && data[*pos + 1] == 0 && data[*pos + 2] == MARKER_OBJECT_END {
            *pos += 3;
            break;
        }
        let key = decode_utf8(data, pos)?;
        let value = decode(data, pos)?;
        map.insert(key, value);
    }
    Ok(map)
}

fn decode_utf8(data: &[u8], pos: &mut usize) -> Result<String> {
    let len = read_u16(data, pos)? as usize;
    let bytes = read_n(data, pos, len)?;
    String::from_utf8(bytes.to_vec()).map_err(|e| RtmpError::Parse(e.to_string()))
}

fn read_u8(data: &[u8], pos: &mut usize) -> Result<u8> {
    let b = *data.get(*pos).ok_or_else(|| RtmpError::Parse("AMF0 underflow".to_string()))?;
    *pos += 1;
    Ok(b)
}

fn read_u16(data: &[u8], pos: &mut usize) -> Result<u16> {
    let bytes = read_n(data, pos, 2)?;
    Ok(u16::from_be_bytes(bytes.try_into().unwrap()))
}

fn read_u32(data: &[u8], pos: &mut usize) -> Result<u32> {
    let bytes = read_n(data, pos, 4)?;
    Ok(u32::from_be_bytes(bytes.try_into().unwrap()))
}

fn read_n<'a>(data: &'a [u8], pos: &mut usize, n: usize) -> Result<&'a [u8]> {
    if *pos + n > data.len() {
        return Err(RtmpError::Parse("AMF0 underflow".to_string()));
    }
    let slice = &data[*pos..*pos + n];
    *pos += n;
    Ok(slice)
}
