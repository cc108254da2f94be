use super::BencodeValue;
use crate::error::{Result, SeedError};
use std::collections::BTreeMap;

/// Deepest list/dict nesting accepted. Metainfo documents use about four.
pub const MAX_DEPTH: usize = 128;

/// Decode a complete bencoded document. Trailing bytes are an error.
pub fn decode(data: &[u8]) -> Result<BencodeValue> {
    let mut decoder = Decoder::new(data);
    let value = decoder.value()?;
    if decoder.pos != data.len() {
        return Err(bencode_error(format!(
            "{} trailing bytes after value",
            data.len() - decoder.pos
        )));
    }
    Ok(value)
}

/// Locate the raw encoded bytes of `key` in a top-level dictionary.
///
/// The info hash of a torrent is taken over the info dictionary exactly as
/// it appears on the wire, so this returns a slice of `data` instead of a
/// re-encoded value.
pub fn raw_dict_value<'a>(data: &'a [u8], key: &[u8]) -> Result<Option<&'a [u8]>> {
    let mut decoder = Decoder::new(data);
    decoder.expect(b'd')?;

    while decoder.peek()? != b'e' {
        let found = decoder.string()?;
        let start = decoder.pos;
        decoder.value()?;
        if found == key {
            return Ok(Some(&data[start..decoder.pos]));
        }
    }

    Ok(None)
}

fn bencode_error(msg: impl Into<String>) -> SeedError {
    SeedError::Bencode(msg.into())
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    depth: usize,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| bencode_error("Unexpected end of input"))
    }

    fn expect(&mut self, token: u8) -> Result<()> {
        let found = self.peek()?;
        if found != token {
            return Err(bencode_error(format!(
                "Expected '{}' at offset {}, found '{}'",
                token as char, self.pos, found as char
            )));
        }
        self.pos += 1;
        Ok(())
    }

    /// Read ASCII bytes up to (not including) `terminator`, consuming it
    fn until(&mut self, terminator: u8, what: &str) -> Result<&'a str> {
        let data = self.data;
        let start = self.pos;
        let len = data[start..]
            .iter()
            .position(|&b| b == terminator)
            .ok_or_else(|| bencode_error(format!("Unterminated {}", what)))?;
        self.pos = start + len + 1;

        std::str::from_utf8(&data[start..start + len])
            .map_err(|_| bencode_error(format!("Invalid {}", what)))
    }

    fn value(&mut self) -> Result<BencodeValue> {
        match self.peek()? {
            b'i' => self.integer(),
            b'l' => self.nested(Self::list),
            b'd' => self.nested(Self::dict),
            b'0'..=b'9' => Ok(BencodeValue::String(self.string()?.to_vec())),
            c => Err(bencode_error(format!("Invalid bencode token: {}", c as char))),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<BencodeValue>) -> Result<BencodeValue> {
        if self.depth == MAX_DEPTH {
            return Err(bencode_error(format!(
                "Nesting deeper than {} at offset {}",
                MAX_DEPTH, self.pos
            )));
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn integer(&mut self) -> Result<BencodeValue> {
        self.expect(b'i')?;
        let digits = self.until(b'e', "integer")?;

        // i-0e, i+5e and zero-padded integers are not canonical
        let unsigned = digits.strip_prefix('-').unwrap_or(digits);
        if !unsigned.starts_with(|c: char| c.is_ascii_digit())
            || (unsigned.len() > 1 && unsigned.starts_with('0'))
            || digits == "-0"
        {
            return Err(bencode_error(format!("Invalid integer: {:?}", digits)));
        }

        digits
            .parse::<i64>()
            .map(BencodeValue::Integer)
            .map_err(|_| bencode_error(format!("Invalid integer: {:?}", digits)))
    }

    fn string(&mut self) -> Result<&'a [u8]> {
        let len = self
            .until(b':', "string length")?
            .parse::<usize>()
            .map_err(|_| bencode_error("Invalid string length"))?;

        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| bencode_error("String length exceeds data"))?;

        let data = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn list(&mut self) -> Result<BencodeValue> {
        self.expect(b'l')?;

        let mut list = Vec::new();
        while self.peek()? != b'e' {
            list.push(self.value()?);
        }
        self.pos += 1;

        Ok(BencodeValue::List(list))
    }

    fn dict(&mut self) -> Result<BencodeValue> {
        self.expect(b'd')?;

        let mut dict = BTreeMap::new();
        let mut last_key: Option<&[u8]> = None;
        while self.peek()? != b'e' {
            if !self.peek()?.is_ascii_digit() {
                return Err(bencode_error("Dictionary key must be a string"));
            }
            let key = self.string()?;
            if last_key.is_some_and(|last| last >= key) {
                return Err(bencode_error(format!(
                    "Dictionary key {:?} out of order",
                    String::from_utf8_lossy(key)
                )));
            }
            last_key = Some(key);

            let value = self.value()?;
            dict.insert(key.to_vec(), value);
        }
        self.pos += 1;

        Ok(BencodeValue::Dict(dict))
    }
}
