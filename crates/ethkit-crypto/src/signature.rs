//! Recoverable ECDSA signatures over secp256k1

use ethkit_primitives::{Address, H256};
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

use crate::{keccak256, CryptoError};

/// secp256k1 public key
pub type PublicKey = VerifyingKey;

/// secp256k1 private key
pub type PrivateKey = SigningKey;

/// ECDSA signature with its recovery parity.
///
/// `parity` is the raw recovery id (0 or 1). Transaction encodings fold it
/// into their own `v` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r scalar, big-endian
    pub r: [u8; 32],
    /// s scalar, big-endian, always in the lower half of the curve order
    pub s: [u8; 32],
    /// Recovery parity
    pub parity: u8,
}

impl Signature {
    /// Assemble a signature from its parts
    pub fn new(r: [u8; 32], s: [u8; 32], parity: u8) -> Self {
        Self { r, s, parity }
    }

    /// `r || s || v` with `v` as 27/28
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.parity + 27;
        bytes
    }

    /// Parse `r || s || v`, accepting `v` as 0/1 or 27/28
    pub fn from_bytes(bytes: &[u8; 65]) -> Result<Self, CryptoError> {
        let parity = match bytes[64] {
            v @ (0 | 1) => v,
            v @ (27 | 28) => v - 27,
            v => return Err(CryptoError::InvalidRecoveryId(v)),
        };
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Ok(Self { r, s, parity })
    }

    /// EIP-2: s must not exceed half the curve order
    pub fn is_low_s(&self) -> bool {
        self.to_k256()
            .map(|sig| sig.normalize_s().is_none())
            .unwrap_or(false)
    }

    fn to_k256(&self) -> Result<K256Signature, CryptoError> {
        let r: k256::FieldBytes = self.r.into();
        let s: k256::FieldBytes = self.s.into();
        K256Signature::from_scalars(r, s).map_err(|e| CryptoError::InvalidSignature(e.to_string()))
    }

    fn recovery_id(&self) -> Result<RecoveryId, CryptoError> {
        if self.parity > 1 {
            return Err(CryptoError::InvalidRecoveryId(self.parity));
        }
        RecoveryId::from_byte(self.parity).ok_or(CryptoError::InvalidRecoveryId(self.parity))
    }
}

/// Sign a 32-byte digest, normalizing to low-s
pub fn sign(digest: &H256, key: &PrivateKey) -> Result<Signature, CryptoError> {
    let (mut signature, mut recovery_id) = key
        .sign_prehash_recoverable(digest.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    if let Some(normalized) = signature.normalize_s() {
        signature = normalized;
        let flipped = recovery_id.to_byte() ^ 1;
        recovery_id =
            RecoveryId::from_byte(flipped).ok_or(CryptoError::InvalidRecoveryId(flipped))?;
    }

    let parity = recovery_id.to_byte();
    if parity > 1 {
        // x-reduced recovery ids cannot be expressed in a transaction v value
        return Err(CryptoError::SigningFailed(format!(
            "unsupported recovery id {parity}"
        )));
    }

    let (r, s) = signature.split_bytes();
    Ok(Signature {
        r: r.into(),
        s: s.into(),
        parity,
    })
}

/// Check a signature against a digest and public key. High-s signatures are rejected.
pub fn verify(
    digest: &H256,
    signature: &Signature,
    public_key: &PublicKey,
) -> Result<bool, CryptoError> {
    if !signature.is_low_s() {
        return Ok(false);
    }
    let sig = signature.to_k256()?;
    Ok(public_key.verify_prehash(digest.as_bytes(), &sig).is_ok())
}

/// Recover the public key that produced `signature` over `digest`
pub fn recover_public_key(digest: &H256, signature: &Signature) -> Result<PublicKey, CryptoError> {
    let sig = signature.to_k256()?;
    let recovery_id = signature.recovery_id()?;
    VerifyingKey::recover_from_prehash(digest.as_bytes(), &sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Recover the signer address of `signature` over `digest`
pub fn recover_address(digest: &H256, signature: &Signature) -> Result<Address, CryptoError> {
    recover_public_key(digest, signature).map(|pk| public_key_to_address(&pk))
}

/// Address of a public key: last 20 bytes of keccak(uncompressed point without prefix)
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let point = public_key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}
