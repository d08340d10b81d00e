//! # Proposal Actions
//!
//! A proposal carries parallel `targets / values / signatures / calldatas`
//! vectors, the shape wallets and explorers already understand. Each tuple is
//! decoded into a typed [`ParameterChange`] when the proposal is created, so
//! an undecodable action is rejected up front instead of at execution.
//!
//! Calldata is a sequence of 32-byte big-endian ABI words. Supported
//! signatures:
//!
//! | Signature | Words |
//! |---|---|
//! | `setFeeParameters(uint256,uint256)` | bps, fixed fee |
//! | `setPercentageFee(uint256)` | bps |
//! | `setFixedFee(uint256)` | fixed fee |
//! | `setVotingPeriod(uint256)` | blocks |
//! | `setQuorumVotes(uint256)` | votes |
//! | `setProposalThreshold(uint256)` | votes |

use serde::{Deserialize, Serialize};
use shadow_core::{Address, Amount, ParameterChange};

use crate::error::GovernanceError;

const WORD: usize = 32;

/// One decoded proposal action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalAction {
    pub target: Address,
    pub value: u128,
    pub signature: String,
    #[serde(with = "hex_bytes")]
    pub calldata: Vec<u8>,
    pub change: ParameterChange,
}

/// Decode a signature and its calldata.
pub fn decode_action(signature: &str, calldata: &[u8]) -> Result<ParameterChange, GovernanceError> {
    let sig: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
    let invalid = |reason: String| GovernanceError::InvalidCalldata {
        signature: sig.clone(),
        reason,
    };
    let words = split_words(calldata).map_err(&invalid)?;
    let expect = |n: usize| -> Result<(), GovernanceError> {
        if words.len() == n {
            Ok(())
        } else {
            Err(invalid(format!("expected {n} words, got {}", words.len())))
        }
    };
    let uint = |i: usize| -> Result<u128, GovernanceError> {
        word_to_u128(words[i]).ok_or_else(|| invalid(format!("word {i} exceeds 128 bits")))
    };

    let change = match sig.as_str() {
        "setFeeParameters(uint256,uint256)" => {
            expect(2)?;
            ParameterChange::SetFeeParameters {
                percentage_fee_bps: uint(0)?,
                fixed_fee: Amount(uint(1)?),
            }
        }
        "setPercentageFee(uint256)" => {
            expect(1)?;
            ParameterChange::SetPercentageFee {
                percentage_fee_bps: uint(0)?,
            }
        }
        "setFixedFee(uint256)" => {
            expect(1)?;
            ParameterChange::SetFixedFee {
                fixed_fee: Amount(uint(0)?),
            }
        }
        "setVotingPeriod(uint256)" => {
            expect(1)?;
            let period = u64::try_from(uint(0)?)
                .map_err(|_| invalid("voting period exceeds 64 bits".to_string()))?;
            ParameterChange::SetVotingPeriod {
                voting_period: period,
            }
        }
        "setQuorumVotes(uint256)" => {
            expect(1)?;
            ParameterChange::SetQuorumVotes {
                quorum_votes: uint(0)?,
            }
        }
        "setProposalThreshold(uint256)" => {
            expect(1)?;
            ParameterChange::SetProposalThreshold {
                proposal_threshold: uint(0)?,
            }
        }
        _ => return Err(GovernanceError::UnsupportedAction(sig.clone())),
    };
    Ok(change)
}

/// The canonical signature and calldata for `change`.
pub fn encode_action(change: &ParameterChange) -> (String, Vec<u8>) {
    let (sig, words): (&str, Vec<u128>) = match *change {
        ParameterChange::SetFeeParameters {
            percentage_fee_bps,
            fixed_fee,
        } => (
            "setFeeParameters(uint256,uint256)",
            vec![percentage_fee_bps, fixed_fee.0],
        ),
        ParameterChange::SetPercentageFee { percentage_fee_bps } => {
            ("setPercentageFee(uint256)", vec![percentage_fee_bps])
        }
        ParameterChange::SetFixedFee { fixed_fee } => ("setFixedFee(uint256)", vec![fixed_fee.0]),
        ParameterChange::SetVotingPeriod { voting_period } => {
            ("setVotingPeriod(uint256)", vec![u128::from(voting_period)])
        }
        ParameterChange::SetQuorumVotes { quorum_votes } => {
            ("setQuorumVotes(uint256)", vec![quorum_votes])
        }
        ParameterChange::SetProposalThreshold { proposal_threshold } => {
            ("setProposalThreshold(uint256)", vec![proposal_threshold])
        }
    };
    let mut calldata = Vec::with_capacity(words.len() * WORD);
    for w in words {
        calldata.extend_from_slice(&[0u8; 16]);
        calldata.extend_from_slice(&w.to_be_bytes());
    }
    (sig.to_string(), calldata)
}

fn split_words(calldata: &[u8]) -> Result<Vec<&[u8]>, String> {
    if calldata.len() % WORD != 0 {
        return Err(format!(
            "length {} is not a multiple of {WORD}",
            calldata.len()
        ));
    }
    Ok(calldata.chunks(WORD).collect())
}

fn word_to_u128(word: &[u8]) -> Option<u128> {
    let (high, low) = word.split_at(WORD - 16);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let arr: [u8; 16] = low.try_into().ok()?;
    Some(u128::from_be_bytes(arr))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(serde::de::Error::custom)
    }
}
