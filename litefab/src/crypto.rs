//! Cryptographic primitives: SHA-256 digests and RSA-2048 signatures.
//!
//! All digests in the system are hex-encoded SHA-256. Signatures are
//! RSA PKCS#1 v1.5 over SHA-256, armored as base64, and always computed
//! over a canonical JSON encoding (see [`crate::canonical`]). Key material
//! travels as PEM: PKCS#8 for private keys, SPKI for public keys.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

/// Modulus size for all identity keys.
pub const RSA_KEY_BITS: usize = 2048;

/// Hex-encoded SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A node or client signing identity backed by an RSA-2048 private key.
///
/// Wrapping the `rsa` types keeps raw key material out of public APIs and
/// pins the signature scheme (PKCS#1 v1.5 with SHA-256) in one place.
#[derive(Clone)]
pub struct SigningIdentity {
    private_key: RsaPrivateKey,
    signing_key: SigningKey<Sha256>,
    public_key: RsaPublicKey,
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material.
        f.debug_struct("SigningIdentity").finish_non_exhaustive()
    }
}

impl SigningIdentity {
    /// Generates a fresh RSA-2048 keypair.
    ///
    /// This is only used by config-generation tooling; nodes load their
    /// keys from disk at startup.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| CryptoError::KeyHandling(format!("key generation failed: {e}")))?;
        Ok(Self::from_private_key(private))
    }

    /// Parses a PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::InvalidKey(format!("private key PEM: {e}")))?;
        Ok(Self::from_private_key(private))
    }

    /// Reads a PKCS#8 PEM private key from `path`.
    pub fn from_pem_file(path: &std::path::Path) -> Result<Self, CryptoError> {
        let pem = std::fs::read_to_string(path).map_err(|e| {
            CryptoError::KeyHandling(format!("reading {}: {e}", path.display()))
        })?;
        Self::from_pkcs8_pem(&pem)
    }

    fn from_private_key(private: RsaPrivateKey) -> Self {
        let public_key = RsaPublicKey::from(&private);
        let signing_key = SigningKey::<Sha256>::new(private.clone());
        Self {
            private_key: private,
            signing_key,
            public_key,
        }
    }

    /// Signs `data` and returns the base64-armored signature.
    pub fn sign_base64(&self, data: &str) -> String {
        let signature = self.signing_key.sign(data.as_bytes());
        BASE64.encode(signature.to_bytes())
    }

    /// SPKI PEM encoding of the matching public key.
    pub fn public_key_pem(&self) -> Result<String, CryptoError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyHandling(format!("public key PEM: {e}")))
    }

    /// PKCS#8 PEM encoding of the private key, for config generation.
    pub fn private_key_pem(&self) -> Result<String, CryptoError> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|z| z.to_string())
            .map_err(|e| CryptoError::KeyHandling(format!("private key PEM: {e}")))
    }
}

/// Verifies a base64 signature over `data` against an SPKI PEM public key.
///
/// Returns `Ok(true)`/`Ok(false)` for well-formed inputs; `Err` only when
/// the key or signature cannot be parsed at all.
pub fn verify_base64(
    data: &str,
    signature_b64: &str,
    public_key_pem: &str,
) -> Result<bool, CryptoError> {
    let public = RsaPublicKey::from_public_key_pem(public_key_pem)
        .map_err(|e| CryptoError::InvalidKey(format!("public key PEM: {e}")))?;
    let verifying_key = VerifyingKey::<Sha256>::new(public);

    let raw = BASE64
        .decode(signature_b64)
        .map_err(|e| CryptoError::MalformedSignature(format!("base64: {e}")))?;
    let signature = Signature::try_from(raw.as_slice())
        .map_err(|e| CryptoError::MalformedSignature(format!("signature bytes: {e}")))?;

    Ok(verifying_key.verify(data.as_bytes(), &signature).is_ok())
}
