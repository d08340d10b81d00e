//! # Deposit Notes
//!
//! A [`DepositNote`] is everything a depositor must keep to withdraw later.
//! Losing it loses the funds; leaking it lets anyone withdraw them.
//!
//! ## Text Form
//!
//! ```text
//! shadow-<amount in base units>-<secret ‖ nullifier seed, 128 hex>-<binding, 64 hex>
//! ```

use rand_core::{CryptoRng, RngCore};
use shadow_core::{Amount, FieldElement, FIELD_BYTES};
use zeroize::Zeroizing;

use crate::commitment::{
    commit, nullifier_hash, Commitment, NullifierHash, NullifierSeed, RecipientBinding, Secret,
};
use crate::error::CryptoError;

const NOTE_PREFIX: &str = "shadow";

/// Client-held secret material for one deposit.
#[derive(Clone, PartialEq, Eq)]
pub struct DepositNote {
    secret: Secret,
    nullifier_seed: NullifierSeed,
    amount: Amount,
    binding: RecipientBinding,
}

impl DepositNote {
    /// Generate fresh secret material for a deposit of `amount`.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        amount: Amount,
        binding: RecipientBinding,
    ) -> Self {
        Self {
            secret: Secret::random(rng),
            nullifier_seed: NullifierSeed::random(rng),
            amount,
            binding,
        }
    }

    /// Assemble a note from known parts.
    pub fn from_parts(
        secret: Secret,
        nullifier_seed: NullifierSeed,
        amount: Amount,
        binding: RecipientBinding,
    ) -> Self {
        Self {
            secret,
            nullifier_seed,
            amount,
            binding,
        }
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn nullifier_seed(&self) -> &NullifierSeed {
        &self.nullifier_seed
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn binding(&self) -> &RecipientBinding {
        &self.binding
    }

    /// The leaf this note deposits.
    pub fn commitment(&self) -> Result<Commitment, CryptoError> {
        commit(&self.secret, &self.nullifier_seed, self.amount, &self.binding)
    }

    /// The tag its withdrawal will reveal.
    pub fn nullifier_hash(&self) -> Result<NullifierHash, CryptoError> {
        nullifier_hash(&self.secret, &self.nullifier_seed)
    }

    /// Encode as text. The buffer is wiped when dropped.
    pub fn to_note_string(&self) -> Zeroizing<String> {
        let mut material = Zeroizing::new([0u8; FIELD_BYTES * 2]);
        material[..FIELD_BYTES].copy_from_slice(self.secret.expose_bytes());
        material[FIELD_BYTES..].copy_from_slice(self.nullifier_seed.expose_bytes());
        let hex_material = Zeroizing::new(hex::encode(material.as_slice()));
        Zeroizing::new(format!(
            "{NOTE_PREFIX}-{}-{}-{}",
            self.amount.base_units(),
            hex_material.as_str(),
            hex::encode(self.binding.to_field().as_bytes())
        ))
    }

    /// Decode the text form produced by [`to_note_string`](Self::to_note_string).
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let mut parts = s.trim().split('-');
        let (prefix, amount, material, binding) =
            match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
                (Some(p), Some(a), Some(m), Some(b), None) => (p, a, m, b),
                _ => return Err(malformed("expected four '-'-separated fields")),
            };
        if prefix != NOTE_PREFIX {
            return Err(malformed("unknown prefix"));
        }
        let amount = amount
            .parse::<u128>()
            .map(Amount)
            .map_err(|_| malformed("amount is not a base-unit integer"))?;
        if material.len() != FIELD_BYTES * 4 {
            return Err(malformed("secret material must be 128 hex digits"));
        }
        let raw = Zeroizing::new(
            hex::decode(material).map_err(|_| malformed("secret material is not hex"))?,
        );
        let mut secret = [0u8; FIELD_BYTES];
        let mut seed = [0u8; FIELD_BYTES];
        secret.copy_from_slice(&raw[..FIELD_BYTES]);
        seed.copy_from_slice(&raw[FIELD_BYTES..]);
        let note = Self {
            secret: Secret::from_bytes(secret)?,
            nullifier_seed: NullifierSeed::from_bytes(seed)?,
            amount,
            binding: RecipientBinding::from_field(FieldElement::from_hex(binding)?),
        };
        zeroize::Zeroize::zeroize(&mut secret);
        zeroize::Zeroize::zeroize(&mut seed);
        Ok(note)
    }
}

fn malformed(reason: &str) -> CryptoError {
    CryptoError::MalformedNote(reason.to_string())
}

impl std::str::FromStr for DepositNote {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Debug for DepositNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepositNote")
            .field("secret", &"[REDACTED]")
            .field("nullifier_seed", &"[REDACTED]")
            .field("amount", &self.amount)
            .field("binding", &self.binding)
            .finish()
    }
}
