//! Standard security handler, revisions 2 to 4, opened with the empty user password.
//!
//! Anything else (revision 5/6 AES-256, public-key handlers, or a non-empty
//! user password) is reported as [`ParseError::EncryptedDocument`].

use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};
use rc4::{consts, KeyInit, Rc4, StreamCipher};

use super::object::{Dict, ObjRef, PdfValue};
use crate::error::ParseError;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CryptMethod {
    Identity,
    Rc4,
    Aes128,
}

impl CryptMethod {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "None" | "Identity" => Some(Self::Identity),
            "V2" => Some(Self::Rc4),
            "AESV2" => Some(Self::Aes128),
            _ => None,
        }
    }
}

/// Per-document decryption state.
#[derive(Debug, Clone)]
pub struct Decryptor {
    key: Vec<u8>,
    stream_method: CryptMethod,
    string_method: CryptMethod,
    encrypt_metadata: bool,
}

impl Decryptor {
    /// Set up decryption from the trailer's `/Encrypt` dictionary and the first `/ID` string.
    pub fn new(dict: &Dict, id0: &[u8]) -> Result<Self, ParseError> {
        if dict.get_name("Filter") != Some("Standard") {
            log::warn!("unsupported security handler {:?}", dict.get_name("Filter"));
            return Err(ParseError::EncryptedDocument);
        }

        let v = dict.get_i64("V").unwrap_or(0);
        let revision = dict.get_i64("R").unwrap_or(0);
        if !(2..=4).contains(&revision) {
            log::warn!("unsupported standard security handler revision {}", revision);
            return Err(ParseError::EncryptedDocument);
        }
        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(PdfValue::as_bool)
            .unwrap_or(true);

        let (length_bits, stream_method, string_method) = match v {
            1 => (40, CryptMethod::Rc4, CryptMethod::Rc4),
            2 | 3 => (
                dict.get_i64("Length").unwrap_or(40),
                CryptMethod::Rc4,
                CryptMethod::Rc4,
            ),
            4 => {
                let stream = crypt_filter_method(dict, "StmF")?;
                let string = crypt_filter_method(dict, "StrF")?;
                (dict.get_i64("Length").unwrap_or(128), stream, string)
            }
            _ => {
                log::warn!("unsupported encryption algorithm V={}", v);
                return Err(ParseError::EncryptedDocument);
            }
        };
        // Some writers store /Length in bytes.
        let length_bits = if length_bits <= 16 { length_bits * 8 } else { length_bits };
        let key_len = (length_bits / 8).clamp(5, 16) as usize;

        let owner = string_entry(dict, "O")?;
        let user = string_entry(dict, "U")?;
        let permissions = dict.get_i64("P").ok_or(ParseError::EncryptedDocument)? as i32;

        let mut key = compute_key(
            revision,
            key_len,
            &owner,
            permissions,
            id0,
            encrypt_metadata,
        );
        if !authenticate_user(revision, &key, id0, &user) {
            log::info!("document requires a user password");
            return Err(ParseError::EncryptedDocument);
        }
        if v == 4 && key.len() < 16 {
            key.resize(16, 0);
        }

        Ok(Self {
            key,
            stream_method,
            string_method,
            encrypt_metadata,
        })
    }

    /// Whether `/Metadata` streams are encrypted.
    pub fn encrypts_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Decrypt every string and stream payload inside `value`, which belongs to object `id`.
    pub fn decrypt_value(&self, id: ObjRef, value: &mut PdfValue) {
        match value {
            PdfValue::String(bytes) => {
                *bytes = self.decrypt(id, bytes, self.string_method);
            }
            PdfValue::Array(items) => {
                for item in items {
                    self.decrypt_value(id, item);
                }
            }
            PdfValue::Dictionary(dict) => self.decrypt_dict(id, dict),
            PdfValue::Stream(stream) => {
                self.decrypt_dict(id, &mut stream.dict);
                let skip = stream.dict.has_type("XRef")
                    || (stream.dict.has_type("Metadata") && !self.encrypt_metadata);
                if !skip {
                    let data = self.decrypt(id, stream.raw_data(), self.stream_method);
                    stream.set_raw_data(data);
                }
            }
            _ => {}
        }
    }

    fn decrypt_dict(&self, id: ObjRef, dict: &mut Dict) {
        let decrypted: Dict = dict
            .iter()
            .map(|(k, v)| {
                let mut v = v.clone();
                self.decrypt_value(id, &mut v);
                (k.clone(), v)
            })
            .collect();
        *dict = decrypted;
    }

    fn decrypt(&self, id: ObjRef, data: &[u8], method: CryptMethod) -> Vec<u8> {
        match method {
            CryptMethod::Identity => data.to_vec(),
            CryptMethod::Rc4 => rc4_apply(&self.object_key(id, false), data),
            CryptMethod::Aes128 => {
                let key = self.object_key(id, true);
                decrypt_aes128(&key, data).unwrap_or_else(|| {
                    log::warn!("AES decryption failed for object {}", id);
                    Vec::new()
                })
            }
        }
    }

    /// Algorithm 1: per-object key.
    fn object_key(&self, id: ObjRef, aes: bool) -> Vec<u8> {
        let mut hasher = Md5::new();
        hasher.update(&self.key);
        hasher.update(&id.num.to_le_bytes()[..3]);
        hasher.update(id.gen.to_le_bytes());
        if aes {
            hasher.update(b"sAlT");
        }
        let digest = hasher.finalize();
        let len = (self.key.len() + 5).min(16);
        digest[..len].to_vec()
    }
}

fn crypt_filter_method(dict: &Dict, entry: &str) -> Result<CryptMethod, ParseError> {
    let name = dict.get_name(entry).unwrap_or("Identity");
    if name == "Identity" {
        return Ok(CryptMethod::Identity);
    }
    let cfm = dict
        .get("CF")
        .and_then(PdfValue::as_dict)
        .and_then(|cf| cf.get(name))
        .and_then(PdfValue::as_dict)
        .and_then(|f| f.get_name("CFM"))
        .unwrap_or("None");
    CryptMethod::from_name(cfm).ok_or_else(|| {
        log::warn!("unsupported crypt filter method {}", cfm);
        ParseError::EncryptedDocument
    })
}

fn string_entry(dict: &Dict, key: &str) -> Result<Vec<u8>, ParseError> {
    dict.get(key)
        .and_then(PdfValue::as_string)
        .map(<[u8]>::to_vec)
        .ok_or(ParseError::EncryptedDocument)
}

/// Algorithm 2: file key from the empty user password.
fn compute_key(
    revision: i64,
    key_len: usize,
    owner: &[u8],
    permissions: i32,
    id0: &[u8],
    encrypt_metadata: bool,
) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PADDING);
    hasher.update(&owner[..owner.len().min(32)]);
    hasher.update(permissions.to_le_bytes());
    hasher.update(id0);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF; 4]);
    }
    let mut digest = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest[..key_len]).to_vec();
        }
    }
    digest.truncate(if revision == 2 { 5 } else { key_len });
    digest
}

/// Algorithms 4 and 5: check the computed key against `/U`.
fn authenticate_user(revision: i64, key: &[u8], id0: &[u8], user: &[u8]) -> bool {
    if revision == 2 {
        let expected = rc4_apply(key, &PASSWORD_PADDING);
        return user.len() >= 32 && user[..32] == expected[..];
    }

    let mut hasher = Md5::new();
    hasher.update(PASSWORD_PADDING);
    hasher.update(id0);
    let mut value = rc4_apply(key, &hasher.finalize());
    for i in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        value = rc4_apply(&round_key, &value);
    }
    user.len() >= 16 && user[..16] == value[..16]
}

fn decrypt_aes128(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 16 {
        return None;
    }
    let (iv, body) = data.split_at(16);
    if body.is_empty() {
        return Some(Vec::new());
    }
    let mut buf = body.to_vec();
    let cipher = Aes128CbcDec::new_from_slices(key, iv).ok()?;
    let plain = cipher.decrypt_padded_mut::<Pkcs7>(&mut buf).ok()?;
    Some(plain.to_vec())
}

/// XOR `data` with the RC4 keystream for `key`.
fn rc4_apply(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut buf = data.to_vec();
    macro_rules! keyed {
        ($($len:literal => $size:ident),+ $(,)?) => {
            match key.len() {
                $($len => match Rc4::<consts::$size>::new_from_slice(key) {
                    Ok(mut cipher) => cipher.apply_keystream(&mut buf),
                    Err(e) => log::warn!("cannot initialise RC4: {}", e),
                },)+
                other => log::warn!("unsupported RC4 key length {}", other),
            }
        };
    }
    keyed!(
        1 => U1, 2 => U2, 3 => U3, 4 => U4, 5 => U5, 6 => U6, 7 => U7, 8 => U8,
        9 => U9, 10 => U10, 11 => U11, 12 => U12, 13 => U13, 14 => U14, 15 => U15, 16 => U16,
    );
    buf
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a revision-3 RC4 `/Encrypt` dictionary for the empty user password.
    pub(crate) fn rc4_encrypt_dict(id0: &[u8]) -> (Dict, Vec<u8>) {
        let owner = vec![0x11u8; 32];
        let permissions = -4i32;
        let key = compute_key(3, 16, &owner, permissions, id0, true);

        let mut hasher = Md5::new();
        hasher.update(PASSWORD_PADDING);
        hasher.update(id0);
        let mut u = rc4_apply(&key, &hasher.finalize());
        for i in 1..=19u8 {
            let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            u = rc4_apply(&round_key, &u);
        }
        u.resize(32, 0);

        let mut dict = Dict::new();
        dict.insert("Filter", PdfValue::Name("Standard".into()));
        dict.insert("V", PdfValue::Integer(2));
        dict.insert("R", PdfValue::Integer(3));
        dict.insert("Length", PdfValue::Integer(128));
        dict.insert("O", PdfValue::String(owner));
        dict.insert("U", PdfValue::String(u));
        dict.insert("P", PdfValue::Integer(i64::from(permissions)));
        (dict, key)
    }

    /// Encrypt `data` the way a writer would for object `id`.
    pub(crate) fn rc4_encrypt(key: &[u8], id: ObjRef, data: &[u8]) -> Vec<u8> {
        let decryptor = Decryptor {
            key: key.to_vec(),
            stream_method: CryptMethod::Rc4,
            string_method: CryptMethod::Rc4,
            encrypt_metadata: true,
        };
        // RC4 is symmetric.
        decryptor.decrypt(id, data, CryptMethod::Rc4)
    }

    #[test]
    fn test_rc4_known_vector() {
        let out = rc4_apply(b"Key", b"Plaintext");
        assert_eq!(out, vec![0xBB, 0xF3, 0x16, 0xE8, 0xD9, 0x40, 0xAF, 0x0A, 0xD3]);
    }

    #[test]
    fn test_empty_password_opens_document() {
        let id0 = b"0123456789abcdef";
        let (dict, key) = rc4_encrypt_dict(id0);
        let decryptor = Decryptor::new(&dict, id0).unwrap();

        let id = ObjRef::new(4, 0);
        let mut value = PdfValue::String(rc4_encrypt(&key, id, b"Hello"));
        decryptor.decrypt_value(id, &mut value);
        assert_eq!(value, PdfValue::String(b"Hello".to_vec()));
    }

    #[test]
    fn test_wrong_user_entry_is_encrypted() {
        let id0 = b"0123456789abcdef";
        let (mut dict, _) = rc4_encrypt_dict(id0);
        dict.insert("U", PdfValue::String(vec![0; 32]));
        assert_eq!(Decryptor::new(&dict, id0).unwrap_err(), ParseError::EncryptedDocument);
    }

    #[test]
    fn test_aes256_is_unsupported() {
        let mut dict = Dict::new();
        dict.insert("Filter", PdfValue::Name("Standard".into()));
        dict.insert("V", PdfValue::Integer(5));
        dict.insert("R", PdfValue::Integer(6));
        assert_eq!(Decryptor::new(&dict, b"").unwrap_err(), ParseError::EncryptedDocument);
    }
}
