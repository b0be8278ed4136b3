//! Legacy transactions with EIP-155 replay protection

use bytes::Bytes;
use ethkit_crypto::{keccak256, recover_address, Signature};
use ethkit_primitives::{Address, H256, U256};
use rlp::{Rlp, RlpStream};

use crate::TxError;

/// Gas charged to every transaction before any execution
pub const INTRINSIC_GAS: u64 = 21_000;

/// Unsigned legacy transaction
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct LegacyTx {
    /// Sender nonce
    pub nonce: u64,
    /// Price per gas unit in wei
    pub gas_price: u128,
    /// Gas the sender authorizes
    pub gas_limit: u64,
    /// Recipient; `None` creates a contract
    pub to: Option<Address>,
    /// Value in wei
    pub value: u128,
    /// Call data or init code
    pub data: Bytes,
}

impl LegacyTx {
    /// True when this transaction deploys a contract
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    /// Upper bound of wei this transaction can debit: `gas_limit * gas_price + value`
    pub fn max_cost(&self) -> Option<u128> {
        (self.gas_limit as u128)
            .checked_mul(self.gas_price)
            .and_then(|fee| fee.checked_add(self.value))
    }

    fn append_fields(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.to {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data.to_vec());
    }

    /// EIP-155 digest: `keccak(rlp[nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0])`
    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        let mut stream = RlpStream::new_list(9);
        self.append_fields(&mut stream);
        stream.append(&chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak256(stream.out())
    }

    /// Homestead digest without chain binding, used only to verify old signatures
    fn unprotected_signing_hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(6);
        self.append_fields(&mut stream);
        keccak256(stream.out())
    }
}

/// Signature fields as they appear on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxSignature {
    /// Parity and chain id folded together
    pub v: u64,
    /// r scalar
    pub r: U256,
    /// s scalar
    pub s: U256,
}

impl TxSignature {
    /// Fold a raw signature with `chain_id`: `v = parity + chain_id * 2 + 35`
    pub fn eip155(signature: &Signature, chain_id: u64) -> Result<Self, TxError> {
        if chain_id == 0 {
            return Err(TxError::InvalidChainId(chain_id));
        }
        let v = chain_id
            .checked_mul(2)
            .and_then(|v| v.checked_add(35 + signature.parity as u64))
            .ok_or(TxError::InvalidChainId(chain_id))?;
        Ok(Self {
            v,
            r: U256::from_big_endian(&signature.r),
            s: U256::from_big_endian(&signature.s),
        })
    }

    /// Chain id encoded in `v`, `None` for pre-EIP-155 signatures
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    /// Recovery parity (0 or 1)
    pub fn parity(&self) -> Result<u8, TxError> {
        match self.v {
            27 | 28 => Ok((self.v - 27) as u8),
            v if v >= 35 => Ok(((v - 35) % 2) as u8),
            v => Err(TxError::InvalidField {
                field: "v",
                reason: format!("{v} is not a valid recovery value"),
            }),
        }
    }

    /// Raw secp256k1 signature
    pub fn to_signature(&self) -> Result<Signature, TxError> {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        self.r.to_big_endian(&mut r);
        self.s.to_big_endian(&mut s);
        Ok(Signature::new(r, s, self.parity()?))
    }
}

/// Signed legacy transaction. Its hash is computed once at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: LegacyTx,
    signature: TxSignature,
    hash: H256,
}

impl SignedTransaction {
    /// Combine a transaction with a signature made over `tx.signing_hash(chain_id)`
    pub fn from_signature(
        tx: LegacyTx,
        signature: &Signature,
        chain_id: u64,
    ) -> Result<Self, TxError> {
        let signature = TxSignature::eip155(signature, chain_id)?;
        Ok(Self::new(tx, signature))
    }

    /// Wrap already-encoded signature fields
    pub fn new(tx: LegacyTx, signature: TxSignature) -> Self {
        let hash = keccak256(encode_signed(&tx, &signature));
        Self {
            tx,
            signature,
            hash,
        }
    }

    /// The unsigned body
    pub fn tx(&self) -> &LegacyTx {
        &self.tx
    }

    /// Wire signature fields
    pub fn signature(&self) -> &TxSignature {
        &self.signature
    }

    /// Transaction hash: keccak of the encoded form
    pub fn hash(&self) -> H256 {
        self.hash
    }

    /// Chain id bound into the signature
    pub fn chain_id(&self) -> Option<u64> {
        self.signature.chain_id()
    }

    /// RLP `[nonce, gasPrice, gasLimit, to, value, data, v, r, s]`
    pub fn encode(&self) -> Vec<u8> {
        encode_signed(&self.tx, &self.signature)
    }

    /// Decode a raw legacy transaction
    pub fn decode(raw: &[u8]) -> Result<Self, TxError> {
        let first = *raw
            .first()
            .ok_or_else(|| TxError::Rlp("empty transaction".to_string()))?;
        if first < 0xc0 {
            return Err(TxError::UnsupportedType(first));
        }

        let rlp = Rlp::new(raw);
        let items = rlp.item_count()?;
        if items != 9 {
            return Err(TxError::Rlp(format!(
                "legacy transaction has 9 fields, got {items}"
            )));
        }

        let to_bytes: Vec<u8> = rlp.val_at(3)?;
        let to = match to_bytes.len() {
            0 => None,
            20 => Some(Address::from_slice(&to_bytes).map_err(|e| TxError::InvalidField {
                field: "to",
                reason: e.to_string(),
            })?),
            n => {
                return Err(TxError::InvalidField {
                    field: "to",
                    reason: format!("{n} bytes"),
                })
            }
        };

        let tx = LegacyTx {
            nonce: rlp.val_at(0)?,
            gas_price: decode_u128(&rlp, 1, "gasPrice")?,
            gas_limit: rlp.val_at(2)?,
            to,
            value: decode_u128(&rlp, 4, "value")?,
            data: Bytes::from(rlp.val_at::<Vec<u8>>(5)?),
        };
        let signature = TxSignature {
            v: rlp.val_at(6)?,
            r: rlp.val_at(7)?,
            s: rlp.val_at(8)?,
        };

        Ok(Self {
            tx,
            signature,
            hash: keccak256(raw),
        })
    }

    /// Recover the sender from the signature and the digest it was made over
    pub fn recover_sender(&self) -> Result<Address, TxError> {
        let digest = match self.signature.chain_id() {
            Some(chain_id) => self.tx.signing_hash(chain_id),
            None => self.tx.unprotected_signing_hash(),
        };
        Ok(recover_address(&digest, &self.signature.to_signature()?)?)
    }

    /// Recover the sender, requiring the signature to be bound to `chain_id`
    pub fn recover_sender_on(&self, chain_id: u64) -> Result<Address, TxError> {
        let actual = self.signature.chain_id();
        if actual != Some(chain_id) {
            return Err(TxError::ChainIdMismatch {
                expected: chain_id,
                actual,
            });
        }
        self.recover_sender()
    }
}

fn encode_signed(tx: &LegacyTx, signature: &TxSignature) -> Vec<u8> {
    let mut stream = RlpStream::new_list(9);
    tx.append_fields(&mut stream);
    stream.append(&signature.v);
    stream.append(&signature.r);
    stream.append(&signature.s);
    stream.out().to_vec()
}

fn decode_u128(rlp: &Rlp, index: usize, field: &'static str) -> Result<u128, TxError> {
    let bytes: Vec<u8> = rlp.val_at(index)?;
    if bytes.len() > 16 {
        return Err(TxError::InvalidField {
            field,
            reason: format!("{} bytes exceeds 128 bits", bytes.len()),
        });
    }
    if bytes.first() == Some(&0) {
        return Err(TxError::InvalidField {
            field,
            reason: "leading zero byte".to_string(),
        });
    }
    let mut buf = [0u8; 16];
    buf[16 - bytes.len()..].copy_from_slice(&bytes);
    Ok(u128::from_be_bytes(buf))
}

/// Address of a contract deployed by `sender` with `nonce`: `keccak(rlp[sender, nonce])[12..]`
pub fn contract_address(sender: &Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(sender);
    stream.append(&nonce);
    let hash = keccak256(stream.out());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethkit_crypto::{public_key_to_address, sign, PrivateKey};
    use proptest::prelude::*;

    // EIP-155 reference vector
    const EIP155_KEY: &str = "4646464646464646464646464646464646464646464646464646464646464646";
    const EIP155_RAW: &str = "f86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";

    fn eip155_tx() -> LegacyTx {
        LegacyTx {
            nonce: 9,
            gas_price: 20_000_000_000,
            gas_limit: 21_000,
            to: Some(Address::from_bytes([0x35; 20])),
            value: 1_000_000_000_000_000_000,
            data: Bytes::new(),
        }
    }

    fn key(hex_key: &str) -> PrivateKey {
        PrivateKey::from_slice(&hex::decode(hex_key).unwrap()).unwrap()
    }

    #[test]
    fn test_eip155_signing_hash() {
        assert_eq!(
            eip155_tx().signing_hash(1).to_hex(),
            "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }

    #[test]
    fn test_eip155_signed_bytes() {
        let tx = eip155_tx();
        let signature = sign(&tx.signing_hash(1), &key(EIP155_KEY)).unwrap();
        let signed = SignedTransaction::from_signature(tx, &signature, 1).unwrap();

        assert_eq!(signed.signature().v, 37);
        assert_eq!(hex::encode(signed.encode()), EIP155_RAW);
    }

    #[test]
    fn test_decode_reference_transaction() {
        let raw = hex::decode(EIP155_RAW).unwrap();
        let signed = SignedTransaction::decode(&raw).unwrap();

        assert_eq!(signed.tx(), &eip155_tx());
        assert_eq!(signed.chain_id(), Some(1));
        assert_eq!(signed.hash(), keccak256(&raw));
        assert_eq!(
            signed.recover_sender().unwrap().to_hex(),
            "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f"
        );
    }

    #[test]
    fn test_hash_matches_after_decode() {
        let tx = eip155_tx();
        let signature = sign(&tx.signing_hash(5), &key(EIP155_KEY)).unwrap();
        let signed = SignedTransaction::from_signature(tx, &signature, 5).unwrap();
        let decoded = SignedTransaction::decode(&signed.encode()).unwrap();
        assert_eq!(decoded.hash(), signed.hash());
        assert_eq!(decoded, signed);
    }

    #[test]
    fn test_contract_creation_encodes_empty_to() {
        let tx = LegacyTx {
            to: None,
            data: Bytes::from_static(&[0x60, 0x80]),
            ..eip155_tx()
        };
        let signature = sign(&tx.signing_hash(1), &key(EIP155_KEY)).unwrap();
        let signed = SignedTransaction::from_signature(tx, &signature, 1).unwrap();
        let decoded = SignedTransaction::decode(&signed.encode()).unwrap();
        assert!(decoded.tx().is_create());
    }

    #[test]
    fn test_chain_id_zero_rejected() {
        let tx = eip155_tx();
        let signature = sign(&tx.signing_hash(1), &key(EIP155_KEY)).unwrap();
        assert_eq!(
            SignedTransaction::from_signature(tx, &signature, 0),
            Err(TxError::InvalidChainId(0))
        );
    }

    #[test]
    fn test_wrong_chain_rejected() {
        let tx = eip155_tx();
        let signature = sign(&tx.signing_hash(1), &key(EIP155_KEY)).unwrap();
        let signed = SignedTransaction::from_signature(tx, &signature, 1).unwrap();
        assert!(matches!(
            signed.recover_sender_on(5),
            Err(TxError::ChainIdMismatch { expected: 5, actual: Some(1) })
        ));
    }

    #[test]
    fn test_decode_rejects_typed_and_short() {
        assert_eq!(
            SignedTransaction::decode(&[0x02, 0xc0]),
            Err(TxError::UnsupportedType(0x02))
        );
        assert!(SignedTransaction::decode(&[]).is_err());
        assert!(SignedTransaction::decode(&[0xc0]).is_err());
    }

    #[test]
    fn test_contract_address_vectors() {
        let sender = Address::from_hex("0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            contract_address(&sender, 0).to_hex(),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            contract_address(&sender, 1).to_hex(),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn test_max_cost_overflow() {
        let tx = LegacyTx {
            gas_limit: u64::MAX,
            gas_price: u128::MAX,
            ..Default::default()
        };
        assert_eq!(tx.max_cost(), None);
        assert_eq!(eip155_tx().max_cost(), Some(21_000 * 20_000_000_000 + 1_000_000_000_000_000_000));
    }

    proptest! {
        #[test]
        fn prop_v_folds_chain_and_parity(chain_id in 1u64..=u32::MAX as u64, nonce in 0u64..1_000_000) {
            let tx = LegacyTx { nonce, ..eip155_tx() };
            let signing_key = key(EIP155_KEY);
            let signature = sign(&tx.signing_hash(chain_id), &signing_key).unwrap();
            let signed = SignedTransaction::from_signature(tx, &signature, chain_id).unwrap();

            prop_assert_eq!(signed.signature().v, signature.parity as u64 + chain_id * 2 + 35);
            prop_assert_eq!(signed.chain_id(), Some(chain_id));
            prop_assert_eq!(
                signed.recover_sender_on(chain_id).unwrap(),
                public_key_to_address(signing_key.verifying_key())
            );
            prop_assert!(signed.recover_sender_on(chain_id + 1).is_err());
        }

        #[test]
        fn prop_other_chain_digest_does_not_recover_signer(chain_id in 1u64..1_000_000) {
            let tx = eip155_tx();
            let signing_key = key(EIP155_KEY);
            let signature = sign(&tx.signing_hash(chain_id), &signing_key).unwrap();
            let expected = public_key_to_address(signing_key.verifying_key());
            let forged = recover_address(&tx.signing_hash(chain_id + 1), &signature);
            prop_assert!(forged.map(|a| a != expected).unwrap_or(true));
        }
    }
}
