//! Key management for local actors
//!
//! Generates RSA key pairs, converts them to and from JWK and PEM, and
//! produces the `publicKey` descriptor published on actor profiles.
//! Nothing here touches storage; persisting keys is the host's job.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::{KeyConfig, MIN_KEY_BITS};
use crate::error::{FederationError, Result};
use crate::vocab::CryptographicKey;

/// Fragment appended to the actor URI to form the key id
pub const MAIN_KEY_FRAGMENT: &str = "main-key";

/// An RSA key pair owned by one local actor.
///
/// Imported public-only keys have no private half and cannot sign.
#[derive(Clone)]
pub struct KeyPair {
    public: RsaPublicKey,
    private: Option<RsaPrivateKey>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("bits", &self.bits())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}

impl KeyPair {
    /// Generate a new key pair.
    ///
    /// # Errors
    /// `Crypto` if `bits` is below 2048 or generation fails.
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_KEY_BITS {
            return Err(FederationError::Crypto(format!(
                "refusing to generate a {}-bit key; minimum is {}",
                bits, MIN_KEY_BITS
            )));
        }

        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| FederationError::Crypto(e.to_string()))?;

        Ok(Self::from_private_key(private_key))
    }

    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        Self {
            public: RsaPublicKey::from(&private_key),
            private: Some(private_key),
        }
    }

    pub fn from_public_key(public_key: RsaPublicKey) -> Self {
        Self {
            public: public_key,
            private: None,
        }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.public.size() * 8
    }

    /// SPKI PEM of the public half
    pub fn public_key_pem(&self) -> Result<String> {
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| FederationError::Crypto(e.to_string()))
    }

    /// PKCS#8 PEM of the private half
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let private_key = self.require_private()?;
        Ok(private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| FederationError::Crypto(e.to_string()))?
            .to_string())
    }

    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| FederationError::Parse(format!("Invalid private key: {}", e)))?;
        Ok(Self::from_private_key(private_key))
    }

    pub fn from_public_key_pem(pem: &str) -> Result<Self> {
        let public_key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| FederationError::Parse(format!("Invalid public key: {}", e)))?;
        Ok(Self::from_public_key(public_key))
    }

    /// Sign with RSASSA-PKCS1-v1_5 over SHA-256
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let private_key = self.require_private()?.clone();
        let signing_key = rsa::pkcs1v15::SigningKey::<Sha256>::new(private_key);
        let mut rng = rand::thread_rng();
        let signature = signing_key.sign_with_rng(&mut rng, message);
        Ok(signature.to_vec())
    }

    /// Verify an RSASSA-PKCS1-v1_5/SHA-256 signature with the public half
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(self.public.clone());
        rsa::pkcs1v15::Signature::try_from(signature)
            .map(|signature| verifying_key.verify(message, &signature).is_ok())
            .unwrap_or(false)
    }

    /// Export as a JWK; private members are included when present
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = Jwk {
            kty: "RSA".to_string(),
            n: Some(encode_uint(self.public.n())),
            e: Some(encode_uint(self.public.e())),
            ..Jwk::default()
        };

        if let Some(private_key) = &self.private {
            let primes = private_key.primes();
            jwk.d = Some(encode_uint(private_key.d()));
            jwk.p = primes.first().map(encode_uint);
            jwk.q = primes.get(1).map(encode_uint);
            jwk.dp = private_key.dp().map(encode_uint);
            jwk.dq = private_key.dq().map(encode_uint);
            jwk.qi = private_key.crt_coefficient().as_ref().map(encode_uint);
        }

        jwk
    }

    /// Import a JWK.
    ///
    /// `n` and `e` are required. When `d` is present, `p` and `q` must be
    /// too; `dp`, `dq` and `qi` are recomputed rather than trusted.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "RSA" {
            return Err(FederationError::Parse(format!(
                "Unsupported JWK key type: {}",
                jwk.kty
            )));
        }

        let n = decode_member("n", jwk.n.as_deref())?;
        let e = decode_member("e", jwk.e.as_deref())?;

        let Some(d) = jwk.d.as_deref() else {
            let public_key = RsaPublicKey::new(n, e)
                .map_err(|e| FederationError::Parse(format!("Invalid RSA public key: {}", e)))?;
            return Ok(Self::from_public_key(public_key));
        };

        let d = decode_member("d", Some(d))?;
        let p = decode_member("p", jwk.p.as_deref())?;
        let q = decode_member("q", jwk.q.as_deref())?;

        let mut private_key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| FederationError::Parse(format!("Invalid RSA private key: {}", e)))?;
        private_key
            .validate()
            .map_err(|e| FederationError::Parse(format!("Inconsistent RSA private key: {}", e)))?;
        private_key
            .precompute()
            .map_err(|e| FederationError::Parse(format!("Invalid RSA private key: {}", e)))?;

        Ok(Self::from_private_key(private_key))
    }

    fn require_private(&self) -> Result<&RsaPrivateKey> {
        self.private
            .as_ref()
            .ok_or_else(|| FederationError::Crypto("key pair has no private key".to_string()))
    }
}

/// JSON Web Key (RFC 7517) for RSA keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

fn encode_uint(value: &BigUint) -> String {
    BASE64URL.encode(value.to_bytes_be())
}

fn decode_member(name: &str, value: Option<&str>) -> Result<BigUint> {
    let value = value
        .ok_or_else(|| FederationError::Parse(format!("JWK is missing required member {}", name)))?;
    let bytes = BASE64URL
        .decode(value.trim_end_matches('='))
        .map_err(|e| FederationError::Parse(format!("JWK member {} is not base64url: {}", name, e)))?;
    if bytes.is_empty() {
        return Err(FederationError::Parse(format!("JWK member {} is empty", name)));
    }
    Ok(BigUint::from_bytes_be(&bytes))
}

/// Key pair lifecycle for local actors
#[derive(Debug, Clone)]
pub struct KeyManager {
    bits: usize,
}

impl KeyManager {
    pub fn new(config: &KeyConfig) -> Self {
        Self { bits: config.bits }
    }

    /// Generate a key pair of the configured size
    pub fn generate_key_pair(&self) -> Result<KeyPair> {
        let key_pair = KeyPair::generate(self.bits)?;
        tracing::debug!(bits = self.bits, "Generated key pair");
        Ok(key_pair)
    }

    /// Build the `publicKey` descriptor for an actor
    pub fn export_public_descriptor(owner_uri: &str, key_pair: &KeyPair) -> Result<CryptographicKey> {
        Ok(CryptographicKey {
            id: key_id(owner_uri),
            owner: owner_uri.to_string(),
            public_key_pem: key_pair.public_key_pem()?,
        })
    }

    /// Parse a serialized JWK
    pub fn import_jwk(serialized: &str) -> Result<KeyPair> {
        let jwk: Jwk = serde_json::from_str(serialized)
            .map_err(|e| FederationError::Parse(format!("Invalid JWK: {}", e)))?;
        KeyPair::from_jwk(&jwk)
    }

    /// Serialize a key pair as a JWK
    pub fn export_jwk(key_pair: &KeyPair) -> Result<String> {
        serde_json::to_string(&key_pair.to_jwk())
            .map_err(|e| FederationError::Crypto(format!("Failed to encode JWK: {}", e)))
    }
}

/// Key id for an actor: `<actor>#main-key`
pub fn key_id(owner_uri: &str) -> String {
    format!("{}#{}", owner_uri, MAIN_KEY_FRAGMENT)
}
