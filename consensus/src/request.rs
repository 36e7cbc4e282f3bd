//! The transaction proposed for locking, plus its protocol-level checks.

use instalock_types::{Amount, LockParams, Transaction, TxHash};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collaborators::ChainView;
use crate::config::LockConfig;
use crate::error::RequestRejection;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    tx: Transaction,
    hash: TxHash,
}

impl LockRequest {
    pub fn new(tx: Transaction) -> Self {
        let hash = tx.hash();
        Self { tx, hash }
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    pub fn min_fee(&self, params: &LockParams) -> Amount {
        params.min_fee(self.tx.inputs.len())
    }

    pub fn max_signatures(&self, params: &LockParams) -> usize {
        params.max_signatures(self.tx.inputs.len())
    }

    /// Check the request against the current chain state.
    ///
    /// Rejections are logged here; nothing is mutated.
    pub fn validate(&self, chain: &dyn ChainView, config: &LockConfig) -> Result<(), RequestRejection> {
        let result = self.check(chain, config);
        if let Err(reason) = &result {
            debug!(txid = %self.hash, %reason, "lock request invalid");
        }
        result
    }

    fn check(&self, chain: &dyn ChainView, config: &LockConfig) -> Result<(), RequestRejection> {
        let params = &config.params;

        if self.tx.outputs.is_empty() {
            return Err(RequestRejection::NoOutputs);
        }

        if self.tx.inputs.len() > params.warn_many_inputs {
            warn!(txid = %self.hash, inputs = self.tx.inputs.len(), "lock request has many inputs");
        }

        if !chain.is_final(&self.tx) {
            return Err(RequestRejection::NotFinal);
        }

        let tip = i64::from(chain.height());
        let required = params.min_input_age();
        let mut value_in = Amount::ZERO;

        for outpoint in self.tx.spent_outpoints() {
            let coin = chain
                .utxo(outpoint)
                .ok_or(RequestRejection::MissingInput(*outpoint))?;

            let age = tip - i64::from(coin.height) + 1;
            if age < i64::from(required) {
                return Err(RequestRejection::InputTooNew {
                    outpoint: *outpoint,
                    age,
                    required,
                });
            }

            value_in = value_in
                .checked_add(coin.value)
                .ok_or(RequestRejection::ValueOverflow)?;
        }

        let max = config.max_value();
        if value_in > max {
            return Err(RequestRejection::ValueTooHigh {
                value: value_in,
                max,
            });
        }

        let min = self.min_fee(params);
        let fee = self
            .tx
            .value_out()
            .and_then(|out| value_in.checked_sub(out))
            .unwrap_or(Amount::ZERO);
        if fee < min {
            return Err(RequestRejection::InsufficientFee { fee, min });
        }

        Ok(())
    }
}
