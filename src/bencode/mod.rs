mod decoder;
mod encoder;
mod value;

pub use decoder::{decode, raw_dict_value, MAX_DEPTH};
pub use encoder::{encode, Encoder, ToBencode};
pub use value::BencodeValue;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeedError;
    use bytes::BytesMut;
    use std::collections::BTreeMap;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_integer_encoding() {
        let mut enc = Encoder::new();
        enc.write_integer(42).write_integer(-7).write_integer(0);
        assert_eq!(&assert_ok!(enc.finish())[..], b"i42ei-7ei0e");
    }

    #[test]
    fn test_string_encoding_uses_byte_length() {
        let mut enc = Encoder::new();
        enc.write_string("spam").write_string("héllo").write_string(b"\x00\xff");
        assert_eq!(
            &assert_ok!(enc.finish())[..],
            b"4:spam6:h\xc3\xa9llo2:\x00\xff"
        );
    }

    #[test]
    fn test_nested_containers() {
        let mut enc = Encoder::new();
        enc.begin_dict();
        assert_ok!(enc.write_key_value("a", &1i64));
        enc.write_string("b").begin_list();
        enc.begin_list().write_string("x");
        assert_ok!(enc.end_list());
        assert_ok!(enc.end_list());
        assert_ok!(enc.end_dict());
        assert_eq!(&assert_ok!(enc.finish())[..], b"d1:ai1e1:bll1:xeee");
    }

    #[test]
    fn test_key_value_scalars() {
        let mut enc = Encoder::new();
        enc.begin_dict();
        assert_ok!(enc.write_key_value("length", &10u64));
        assert_ok!(enc.write_key_value("name", "obj"));
        assert_ok!(enc.write_key_value("pieces", &b"\x01\x02"[..]));
        assert_ok!(enc.end_dict());
        assert_eq!(
            &assert_ok!(enc.finish())[..],
            b"d6:lengthi10e4:name3:obj6:pieces2:\x01\x02e"
        );
    }

    #[test]
    fn test_encoder_appends_to_existing_sink() {
        let mut sink = BytesMut::new();
        sink.extend_from_slice(b"d");
        let mut enc = Encoder::with_sink(sink);
        enc.write_string("k").write_raw(b"i1e");
        let mut out = assert_ok!(enc.finish());
        out.extend_from_slice(b"e");
        assert_eq!(&out[..], b"d1:ki1ee");
    }

    #[test]
    fn test_unbalanced_containers_are_contract_violations() {
        let mut enc = Encoder::new();
        assert!(matches!(
            enc.end_dict(),
            Err(crate::error::SeedError::EncodingContract(_))
        ));

        let mut enc = Encoder::new();
        enc.begin_list();
        assert_err!(enc.end_dict());

        let mut enc = Encoder::new();
        enc.begin_dict();
        assert_eq!(enc.depth(), 1);
        assert_err!(enc.finish());
    }

    #[test]
    fn test_oversized_unsigned_integer_rejected() {
        let mut enc = Encoder::new();
        assert_err!(enc.write_key_value("length", &u64::MAX));
    }

    #[test]
    fn test_dict_encoding_sorted() {
        let mut dict = BTreeMap::new();
        dict.insert(b"foo".to_vec(), BencodeValue::Integer(42));
        dict.insert(b"bar".to_vec(), BencodeValue::from("spam"));
        let encoded = assert_ok!(encode(&BencodeValue::Dict(dict)));
        assert_eq!(&encoded[..], b"d3:bar4:spam3:fooi42ee");
    }

    #[test]
    fn test_roundtrip_binary_strings() {
        let mut dict = BTreeMap::new();
        dict.insert(b"bin".to_vec(), BencodeValue::from(&b"\x00e:d\xff"[..]));
        dict.insert(
            b"list".to_vec(),
            BencodeValue::List(vec![BencodeValue::Integer(-123), BencodeValue::from("test")]),
        );
        let original = BencodeValue::Dict(dict);
        let encoded = assert_ok!(encode(&original));
        let decoded = assert_ok!(decode(&encoded));
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert_err!(decode(b"i-0e"));
        assert_err!(decode(b"i03e"));
        assert_err!(decode(b"ie"));
        assert_err!(decode(b"i+5e"));
        assert_err!(decode(b"i-+5e"));
        assert_err!(decode(b"i--5e"));
        assert_err!(decode(b"5:abc"));
        assert_err!(decode(b"l4:spam"));
        assert_err!(decode(b"i1ei2e"));
        assert_err!(decode(b"d1:bi1e1:ai2ee"));
        assert_err!(decode(b"di1ei2ee"));
    }

    #[test]
    fn test_decode_nesting_limit() {
        let within = format!("{}{}", "l".repeat(MAX_DEPTH), "e".repeat(MAX_DEPTH));
        assert_ok!(decode(within.as_bytes()));

        let too_deep = format!("{}{}", "l".repeat(MAX_DEPTH + 1), "e".repeat(MAX_DEPTH + 1));
        assert!(matches!(decode(too_deep.as_bytes()), Err(SeedError::Bencode(_))));

        let hostile = vec![b'l'; 1 << 20];
        assert_err!(decode(&hostile));
        assert_err!(raw_dict_value(&[&b"d1:a"[..], &hostile[..]].concat(), b"info"));
    }

    #[test]
    fn test_raw_dict_value() {
        let doc = b"d1:ai1e4:infod1:xi2ee1:zi3ee";
        let raw = assert_ok!(raw_dict_value(doc, b"info"));
        assert_eq!(raw, Some(&b"d1:xi2ee"[..]));
        assert_eq!(assert_ok!(raw_dict_value(doc, b"missing")), None);
        assert_err!(raw_dict_value(b"li1ee", b"info"));
    }
}
