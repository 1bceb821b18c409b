//! DESCRIBE request rendering and Basic/Digest `Authorization` headers.
//!
//! Everything here is a pure function of its inputs, so the two hashing
//! helpers keep a small memo table: the same credentials are hashed once per
//! target and stage, over and over.

use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine as _;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

pub const METHOD_DESCRIBE: &str = "DESCRIBE";

/// Credentials value meaning "send no Authorization header".
pub const NO_CREDENTIALS: &str = ":";

const BASIC_CACHE_CAPACITY: usize = 16;
const HA1_CACHE_CAPACITY: usize = 128;

static BASIC_CACHE: Lazy<Memo<String, String>> = Lazy::new(|| Memo::new(BASIC_CACHE_CAPACITY));
static HA1_CACHE: Lazy<Memo<(String, String, String), String>> =
    Lazy::new(|| Memo::new(HA1_CACHE_CAPACITY));

/// Bounded memo table; dropped wholesale when full.
struct Memo<K, V> {
    capacity: usize,
    entries: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V: Clone> Memo<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get_or_insert_with(&self, key: K, make: impl FnOnce() -> V) -> V {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(value) = entries.get(&key) {
            return value.clone();
        }
        if entries.len() >= self.capacity {
            entries.clear();
        }
        let value = make();
        entries.insert(key, value.clone());
        value
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

/// `Authorization: Basic <base64(credentials)>`
pub fn basic_auth_header(credentials: &str) -> String {
    BASIC_CACHE.get_or_insert_with(credentials.to_string(), || {
        format!("Authorization: Basic {}", Base64.encode(credentials))
    })
}

/// MD5 hex of `username:realm:password`.
pub fn digest_ha1(username: &str, realm: &str, password: &str) -> String {
    let key = (username.to_string(), realm.to_string(), password.to_string());
    HA1_CACHE.get_or_insert_with(key, || md5_hex(&format!("{}:{}:{}", username, realm, password)))
}

/// Digest header for `method` against `rtsp://host:port<path>`.
///
/// `credentials` is `user:pass`; everything after the first colon is the password.
pub fn digest_auth_header(
    method: &str,
    host: &str,
    port: u16,
    path: &str,
    credentials: &str,
    realm: &str,
    nonce: &str,
) -> String {
    debug_assert!(credentials.contains(':'), "credentials must be user:pass");
    let (username, password) = credentials.split_once(':').unwrap_or((credentials, ""));
    let uri = format!("rtsp://{}:{}{}", host, port, path);

    let ha1 = digest_ha1(username, realm, password);
    let ha2 = md5_hex(&format!("{}:{}", method, uri));
    let response = md5_hex(&format!("{}:{}:{}", ha1, nonce, ha2));

    format!(
        "Authorization: Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", response=\"{}\"",
        username, realm, nonce, uri, response
    )
}

/// Full DESCRIBE request. Digest is used once a realm is known, Basic otherwise.
pub fn build_describe(
    host: &str,
    port: u16,
    path: &str,
    cseq: u32,
    credentials: &str,
    realm: Option<&str>,
    nonce: Option<&str>,
) -> String {
    let auth = if credentials == NO_CREDENTIALS {
        String::new()
    } else {
        match realm.filter(|r| !r.is_empty()) {
            Some(realm) => format!(
                "{}\r\n",
                digest_auth_header(
                    METHOD_DESCRIBE,
                    host,
                    port,
                    path,
                    credentials,
                    realm,
                    nonce.unwrap_or_default(),
                )
            ),
            None => format!("{}\r\n", basic_auth_header(credentials)),
        }
    };

    format!(
        "{method} rtsp://{host}:{port}{path} RTSP/1.0\r\n\
         CSeq: {cseq}\r\n\
         {auth}\
         User-Agent: Mozilla/5.0\r\n\
         Accept: application/sdp\r\n\
         \r\n",
        method = METHOD_DESCRIBE,
        host = host,
        port = port,
        path = path,
        cseq = cseq,
        auth = auth,
    )
}
