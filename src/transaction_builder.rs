use crate::coin::Coin;
use crate::messages::Message;
use crate::network::{AccountError, AkashNode};
use crate::transactions::{
    TransactionAssembler, TransactionError, TransactionInfo, UnsignedTransaction,
};
use crate::wallet::Wallet;
use crate::AccountAddress;

#[derive(Clone, Debug, Eq, PartialEq, Default)]
struct TransactionTemplate {
    messages: Vec<Message>,
    memo: Option<String>,
    gas_limit: Option<u64>,
    fee: Option<Coin>,
    timeout_height: Option<u64>,
    account: Option<(u64, u64)>,
}

/// Transaction builder allows to create and prepare transactions
/// with minimal developers efforts.
#[derive(Clone, Debug)]
pub struct TransactionBuilder {
    node: AkashNode,
    template: TransactionTemplate,
}

impl TransactionBuilder {
    #[must_use]
    pub fn new(node: AkashNode) -> Self {
        //! Create a new builder.
        Self {
            node,
            template: TransactionTemplate::default(),
        }
    }
    #[must_use]
    pub fn memo<S: Into<String>>(mut self, memo: S) -> Self {
        //! Attach a memo.
        self.template.memo = Some(memo.into());
        self
    }
    #[must_use]
    pub const fn gas_limit(mut self, gas_limit: u64) -> Self {
        //! Set maximal gas amount for transaction.
        self.template.gas_limit = Some(gas_limit);
        self
    }
    #[must_use]
    pub fn fee(mut self, fee: Coin) -> Self {
        //! Pay an explicit fee instead of one derived from gas price.
        //!
        //! The fee must be in the network's native denomination.
        self.template.fee = Some(fee);
        self
    }
    #[must_use]
    pub const fn timeout_height(mut self, timeout_height: u64) -> Self {
        //! Set block height after which transaction is no longer valid.
        self.template.timeout_height = Some(timeout_height);
        self
    }
    #[must_use]
    pub const fn account(mut self, account_number: u64, sequence: u64) -> Self {
        //! Use known account number and sequence instead of querying the node.
        self.template.account = Some((account_number, sequence));
        self
    }
    #[must_use]
    pub fn add_message(mut self, message: Message) -> Self {
        //! Add a message. Messages execute in insertion order.
        self.template.messages.push(message);
        self
    }
    #[must_use]
    pub fn add_messages<I: IntoIterator<Item = Message>>(mut self, messages: I) -> Self {
        //! Add several messages.
        self.template.messages.extend(messages);
        self
    }

    pub async fn build(
        &self,
        wallet: &Wallet,
    ) -> Result<(UnsignedTransaction, TransactionInfo), TransactionBuilderError> {
        //! Prepare an `UnsignedTransaction` and the metadata to sign it with.
        //! This may perform a network request to resolve the account.
        if self.template.messages.is_empty() {
            return Err(TransactionBuilderError::Transaction(
                TransactionError::EmptyTransaction,
            ));
        }
        if let Some(msg) = self
            .template
            .messages
            .iter()
            .find(|msg| msg.signer() != wallet.address())
        {
            return Err(TransactionBuilderError::ForeignMessage {
                type_url: msg.type_url(),
                signer: msg.signer().clone(),
                wallet: wallet.address().clone(),
            });
        }
        let config = self.node.config();
        let (account_number, sequence) = match self.template.account {
            Some(account) => account,
            None => {
                let info = self.node.resolve_account(wallet.address()).await?;
                (info.account_number, info.sequence)
            }
        };
        let mut tx_info = TransactionInfo::new(config.chain_id.clone(), account_number, sequence)
            .timeout_height(self.template.timeout_height.unwrap_or(0));
        if let Some(memo) = &self.template.memo {
            tx_info = tx_info.memo(memo.clone());
        }
        if let Some(fee) = &self.template.fee {
            tx_info = tx_info.fee(fee.clone());
        }
        let unsigned = TransactionAssembler::from_config(config).assemble(
            wallet,
            self.template.messages.clone(),
            &tx_info,
            self.template.gas_limit.unwrap_or(config.default_gas_limit),
        )?;
        Ok((unsigned, tx_info))
    }
}

/// Transaction creation errors
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum TransactionBuilderError {
    /// Account could not be resolved
    #[error(transparent)]
    Account(#[from] AccountError),
    /// Transaction could not be assembled
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// Message must be authorized by another account
    #[error("Message {type_url} must be signed by {signer}, not {wallet}")]
    ForeignMessage {
        /// Message type
        type_url: &'static str,
        /// Required signer
        signer: AccountAddress,
        /// Signing wallet address
        wallet: AccountAddress,
    },
}
