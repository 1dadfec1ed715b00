//! Web Push message encryption (RFC 8291, `aes128gcm` content coding)
//!
//! Body layout: salt(16) || record size(4, BE) || key id length(1) ||
//! server public key(65) || AES-128-GCM(payload || 0x02).

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::{SecureRandom, SystemRandom};
use ring::{aead, agreement, hkdf};

const RECORD_SIZE: u32 = 4096;
const SALT_LEN: usize = 16;
const TAG_LEN: usize = 16;
const PUBLIC_KEY_LEN: usize = 65;
const AUTH_SECRET_LEN: usize = 16;
const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;
/// Padding delimiter of the final (and only) record
const LAST_RECORD: u8 = 0x02;

/// Largest payload that still fits a 4096-byte push message
pub const MAX_PAYLOAD: usize = RECORD_SIZE as usize - HEADER_LEN - 1 - TAG_LEN;

struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], out: &mut [u8]) -> Result<(), &'static str> {
    let prk = hkdf::Salt::new(hkdf::HKDF_SHA256, salt).extract(ikm);
    prk.expand(&[info], OkmLen(out.len()))
        .and_then(|okm| okm.fill(out))
        .map_err(|_| "Key derivation failed")
}

/// Content key and nonce for one message
fn derive_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<([u8; 16], [u8; 12]), &'static str> {
    let mut key_info = Vec::with_capacity(14 + 2 * PUBLIC_KEY_LEN);
    key_info.extend_from_slice(b"WebPush: info\0");
    key_info.extend_from_slice(ua_public);
    key_info.extend_from_slice(as_public);

    let mut ikm = [0u8; 32];
    hkdf_sha256(auth_secret, ecdh_secret, &key_info, &mut ikm)?;

    let mut cek = [0u8; 16];
    hkdf_sha256(salt, &ikm, b"Content-Encoding: aes128gcm\0", &mut cek)?;
    let mut nonce = [0u8; 12];
    hkdf_sha256(salt, &ikm, b"Content-Encoding: nonce\0", &mut nonce)?;
    Ok((cek, nonce))
}

fn decode_b64url(value: &str) -> Result<Vec<u8>, &'static str> {
    URL_SAFE_NO_PAD
        .decode(value.trim().trim_end_matches('='))
        .map_err(|_| "Subscription key is not base64url")
}

/// Encrypt `payload` for a subscription's `p256dh` / `auth` keys
pub fn encrypt(p256dh: &str, auth: &str, payload: &[u8]) -> Result<Vec<u8>, &'static str> {
    let ua_public = decode_b64url(p256dh)?;
    if ua_public.len() != PUBLIC_KEY_LEN || ua_public[0] != 0x04 {
        return Err("Subscription p256dh is not an uncompressed P-256 point");
    }
    let auth_secret = decode_b64url(auth)?;
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err("Subscription auth secret must be 16 bytes");
    }
    if payload.len() > MAX_PAYLOAD {
        return Err("Push payload too large");
    }

    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt).map_err(|_| "Random generator failed")?;
    let private = agreement::EphemeralPrivateKey::generate(&agreement::ECDH_P256, &rng)
        .map_err(|_| "Key generation failed")?;
    encrypt_with(&ua_public, &auth_secret, payload, private, salt)
}

fn encrypt_with(
    ua_public: &[u8],
    auth_secret: &[u8],
    payload: &[u8],
    private: agreement::EphemeralPrivateKey,
    salt: [u8; SALT_LEN],
) -> Result<Vec<u8>, &'static str> {
    let as_public_key = private
        .compute_public_key()
        .map_err(|_| "Key generation failed")?;
    let as_public = as_public_key.as_ref();

    let peer = agreement::UnparsedPublicKey::new(&agreement::ECDH_P256, ua_public);
    let ecdh_secret = agreement::agree_ephemeral(private, &peer, |secret| secret.to_vec())
        .map_err(|_| "Invalid subscription key")?;
    let (cek, nonce) = derive_keys(&ecdh_secret, auth_secret, ua_public, as_public, &salt)?;

    let key = aead::LessSafeKey::new(
        aead::UnboundKey::new(&aead::AES_128_GCM, &cek).map_err(|_| "Invalid content key")?,
    );
    let mut record = Vec::with_capacity(payload.len() + 1 + TAG_LEN);
    record.extend_from_slice(payload);
    record.push(LAST_RECORD);
    key.seal_in_place_append_tag(
        aead::Nonce::assume_unique_for_key(nonce),
        aead::Aad::empty(),
        &mut record,
    )
    .map_err(|_| "Encryption failed")?;

    let mut body = Vec::with_capacity(HEADER_LEN + record.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(as_public);
    body.extend_from_slice(&record);
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Browser side of the exchange
    struct UserAgent {
        private: agreement::EphemeralPrivateKey,
        public: Vec<u8>,
        auth: [u8; AUTH_SECRET_LEN],
    }

    impl UserAgent {
        fn new() -> Self {
            let rng = SystemRandom::new();
            let private =
                agreement::EphemeralPrivateKey::generate(&agreement::ECDH_P256, &rng).unwrap();
            let public = private.compute_public_key().unwrap().as_ref().to_vec();
            let mut auth = [0u8; AUTH_SECRET_LEN];
            rng.fill(&mut auth).unwrap();
            Self { private, public, auth }
        }

        fn p256dh(&self) -> String {
            URL_SAFE_NO_PAD.encode(&self.public)
        }

        fn auth(&self) -> String {
            URL_SAFE_NO_PAD.encode(self.auth)
        }

        fn decrypt(self, body: &[u8]) -> Vec<u8> {
            let salt = &body[..SALT_LEN];
            let rs = u32::from_be_bytes(body[SALT_LEN..SALT_LEN + 4].try_into().unwrap());
            assert_eq!(rs, RECORD_SIZE);
            assert_eq!(body[SALT_LEN + 4] as usize, PUBLIC_KEY_LEN);
            let as_public = &body[SALT_LEN + 5..HEADER_LEN];

            let peer = agreement::UnparsedPublicKey::new(&agreement::ECDH_P256, as_public);
            let ecdh = agreement::agree_ephemeral(self.private, &peer, |s| s.to_vec()).unwrap();
            let (cek, nonce) = derive_keys(&ecdh, &self.auth, &self.public, as_public, salt).unwrap();

            let key = aead::LessSafeKey::new(aead::UnboundKey::new(&aead::AES_128_GCM, &cek).unwrap());
            let mut record = body[HEADER_LEN..].to_vec();
            let plain = key
                .open_in_place(
                    aead::Nonce::assume_unique_for_key(nonce),
                    aead::Aad::empty(),
                    &mut record,
                )
                .unwrap();
            assert_eq!(plain.last(), Some(&LAST_RECORD));
            plain[..plain.len() - 1].to_vec()
        }
    }

    #[test]
    fn test_browser_can_decrypt() {
        let ua = UserAgent::new();
        let payload = br#"{"title":"Shift gewijzigd","body":"Je shift werd gewijzigd."}"#;
        let body = encrypt(&ua.p256dh(), &ua.auth(), payload).unwrap();

        assert_eq!(body.len(), HEADER_LEN + payload.len() + 1 + TAG_LEN);
        assert_eq!(body[SALT_LEN + 5], 0x04);
        assert_eq!(ua.decrypt(&body), payload);
    }

    #[test]
    fn test_padded_keys_accepted() {
        let ua = UserAgent::new();
        let auth = format!("{}==", ua.auth());
        let body = encrypt(&ua.p256dh(), &auth, b"hallo").unwrap();
        assert_eq!(ua.decrypt(&body), b"hallo");
    }

    #[test]
    fn test_each_message_uses_fresh_salt_and_key() {
        let ua = UserAgent::new();
        let a = encrypt(&ua.p256dh(), &ua.auth(), b"x").unwrap();
        let b = encrypt(&ua.p256dh(), &ua.auth(), b"x").unwrap();
        assert_ne!(a[..HEADER_LEN], b[..HEADER_LEN]);
    }

    #[test]
    fn test_rejects_bad_keys_and_oversized_payload() {
        let ua = UserAgent::new();
        assert!(encrypt("key", &ua.auth(), b"x").is_err());
        assert!(encrypt(&ua.p256dh(), "c2hvcnQ", b"x").is_err());
        assert!(encrypt(&ua.p256dh(), &ua.auth(), &vec![0u8; MAX_PAYLOAD + 1]).is_err());
        assert!(encrypt(&ua.p256dh(), &ua.auth(), &vec![0u8; MAX_PAYLOAD]).is_ok());
    }
}
