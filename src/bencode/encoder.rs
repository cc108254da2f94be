use super::BencodeValue;
use crate::error::{Result, SeedError};
use bytes::{BufMut, Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Dict,
    List,
}

impl Container {
    fn name(self) -> &'static str {
        match self {
            Container::Dict => "dictionary",
            Container::List => "list",
        }
    }
}

/// Append-only bencode writer.
///
/// Tokens go straight into the sink as they are written; no value tree is
/// built. Dictionary keys are emitted in the order the caller writes them,
/// so callers assembling canonical documents must write keys sorted.
/// The only thing tracked is the stack of open containers, so that an
/// unbalanced `end_*` or an unfinished document is reported instead of
/// silently producing garbage.
#[derive(Debug)]
pub struct Encoder<B: BufMut = BytesMut> {
    sink: B,
    open: Vec<Container>,
}

impl Encoder<BytesMut> {
    pub fn new() -> Self {
        Self::with_sink(BytesMut::new())
    }
}

impl Default for Encoder<BytesMut> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BufMut> Encoder<B> {
    /// Write into an existing sink, appending after whatever it already holds
    pub fn with_sink(sink: B) -> Self {
        Self {
            sink,
            open: Vec::new(),
        }
    }

    /// i<decimal>e
    pub fn write_integer(&mut self, n: i64) -> &mut Self {
        self.sink.put_u8(b'i');
        self.sink.put_slice(n.to_string().as_bytes());
        self.sink.put_u8(b'e');
        self
    }

    /// <byte-length>:<raw bytes>
    pub fn write_string(&mut self, s: impl AsRef<[u8]>) -> &mut Self {
        let s = s.as_ref();
        self.sink.put_slice(s.len().to_string().as_bytes());
        self.sink.put_u8(b':');
        self.sink.put_slice(s);
        self
    }

    pub fn begin_dict(&mut self) -> &mut Self {
        self.open.push(Container::Dict);
        self.sink.put_u8(b'd');
        self
    }

    pub fn end_dict(&mut self) -> Result<&mut Self> {
        self.close(Container::Dict)
    }

    pub fn begin_list(&mut self) -> &mut Self {
        self.open.push(Container::List);
        self.sink.put_u8(b'l');
        self
    }

    pub fn end_list(&mut self) -> Result<&mut Self> {
        self.close(Container::List)
    }

    /// Write a dictionary key followed by its value
    pub fn write_key_value<V>(&mut self, key: &str, value: &V) -> Result<&mut Self>
    where
        V: ToBencode + ?Sized,
    {
        self.write_string(key);
        value.write_bencode(self)?;
        Ok(self)
    }

    /// Append bytes that are already bencoded, e.g. a persisted sub-dictionary
    pub fn write_raw(&mut self, encoded: &[u8]) -> &mut Self {
        self.sink.put_slice(encoded);
        self
    }

    /// Write a whole value tree. Dictionary keys come out sorted because
    /// `BencodeValue::Dict` is ordered.
    pub fn write_value(&mut self, value: &BencodeValue) -> Result<&mut Self> {
        match value {
            BencodeValue::Integer(i) => {
                self.write_integer(*i);
            }
            BencodeValue::String(s) => {
                self.write_string(s);
            }
            BencodeValue::List(items) => {
                self.begin_list();
                for item in items {
                    self.write_value(item)?;
                }
                self.end_list()?;
            }
            BencodeValue::Dict(dict) => {
                self.begin_dict();
                for (key, value) in dict {
                    self.write_string(key);
                    self.write_value(value)?;
                }
                self.end_dict()?;
            }
        }
        Ok(self)
    }

    /// Number of containers opened and not yet closed
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Hand back the sink. Fails if a list or dictionary is still open.
    pub fn finish(self) -> Result<B> {
        if let Some(container) = self.open.last() {
            return Err(SeedError::EncodingContract(format!(
                "{} unclosed container(s), innermost is a {}",
                self.open.len(),
                container.name()
            )));
        }
        Ok(self.sink)
    }

    fn close(&mut self, expected: Container) -> Result<&mut Self> {
        match self.open.pop() {
            Some(found) if found == expected => {
                self.sink.put_u8(b'e');
                Ok(self)
            }
            Some(found) => Err(SeedError::EncodingContract(format!(
                "cannot end a {} while a {} is open",
                expected.name(),
                found.name()
            ))),
            None => Err(SeedError::EncodingContract(format!(
                "cannot end a {} with no open container",
                expected.name()
            ))),
        }
    }
}

/// Values that can follow a key in `Encoder::write_key_value`
pub trait ToBencode {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()>;
}

impl ToBencode for i64 {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.write_integer(*self);
        Ok(())
    }
}

impl ToBencode for u64 {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        let n = i64::try_from(*self).map_err(|_| {
            SeedError::EncodingContract(format!("integer {} does not fit in i64", self))
        })?;
        encoder.write_integer(n);
        Ok(())
    }
}

impl ToBencode for str {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.write_string(self);
        Ok(())
    }
}

impl ToBencode for String {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.write_string(self);
        Ok(())
    }
}

impl ToBencode for [u8] {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.write_string(self);
        Ok(())
    }
}

impl ToBencode for Bytes {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.write_string(self);
        Ok(())
    }
}

impl ToBencode for BencodeValue {
    fn write_bencode<B: BufMut>(&self, encoder: &mut Encoder<B>) -> Result<()> {
        encoder.write_value(self)?;
        Ok(())
    }
}

/// Encode a BencodeValue into its byte representation
pub fn encode(value: &BencodeValue) -> Result<Bytes> {
    let mut encoder = Encoder::new();
    encoder.write_value(value)?;
    Ok(encoder.finish()?.freeze())
}
