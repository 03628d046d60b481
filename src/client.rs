//! High-level client: resolve, assemble, sign and broadcast in one call.

use crate::address::AccountAddress;
use crate::broadcast::BroadcastResult;
use crate::config::NetworkConfig;
use crate::error::Error;
use crate::messages::{BidId, DeploymentSpec, Message, MessageBuilder, OrderId};
use crate::network::AkashNode;
use crate::transaction_builder::TransactionBuilder;
use crate::wallet::{SigningError, Wallet};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Gas limit of deployment creation when none is given.
pub const DEPLOYMENT_GAS_LIMIT: u64 = 300_000;

/// Single-flight queue keyed by account address.
///
/// The chain accepts at most one transaction per account sequence, so
/// submissions of one account must not overlap. Holding the guard returned
/// by [`SubmissionQueue::acquire`] grants exclusive submission rights for
/// that account; other accounts are not affected.
#[derive(Clone, Debug, Default)]
pub struct SubmissionQueue {
    slots: Arc<Mutex<HashMap<AccountAddress, Arc<AsyncMutex<()>>>>>,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        //! Create an empty queue.
        Self::default()
    }

    pub async fn acquire(&self, address: &AccountAddress) -> OwnedMutexGuard<()> {
        //! Wait until no other submission of `address` is in flight.
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // Slots nobody holds or waits for.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(address.clone()).or_default())
        };
        if let Ok(guard) = Arc::clone(&slot).try_lock_owned() {
            return guard;
        }
        debug!(%address, "waiting for in-flight submission");
        slot.lock_owned().await
    }

    pub fn in_flight(&self) -> usize {
        //! Number of accounts with a submission in progress or queued.
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}

/// Akash client bound to one network.
///
/// Cheap to clone: clones share the connection pool and the submission queue.
#[derive(Clone, Debug)]
pub struct AkashClient {
    node: AkashNode,
    messages: MessageBuilder,
    queue: SubmissionQueue,
}

impl AkashClient {
    pub fn new(config: NetworkConfig) -> Result<Self, Error> {
        //! Connect to the network described by `config`.
        Ok(Self::from_node(AkashNode::new(config)?))
    }

    pub fn from_node(node: AkashNode) -> Self {
        //! Wrap an existing node connection.
        let messages = MessageBuilder::new(node.config().denom.clone());
        Self {
            node,
            messages,
            queue: SubmissionQueue::new(),
        }
    }

    pub const fn node(&self) -> &AkashNode {
        //! Underlying node connection, for queries.
        &self.node
    }

    pub const fn message_builder(&self) -> &MessageBuilder {
        //! Builder validating amounts against the network denomination.
        &self.messages
    }

    pub async fn submit(
        &self,
        wallet: &Wallet,
        messages: Vec<Message>,
        gas_limit: Option<u64>,
    ) -> Result<BroadcastResult, Error> {
        //! Sign and broadcast `messages` as one transaction.
        //!
        //! Account number and sequence are fetched right before signing,
        //! while no other submission of the same account is running.
        //! Nothing is retried.
        if !wallet.can_sign() {
            return Err(SigningError::MissingPrivateKey.into());
        }
        let broadcaster = self.node.broadcaster()?;
        let mut builder = TransactionBuilder::new(self.node.clone()).add_messages(messages);
        if let Some(gas_limit) = gas_limit {
            builder = builder.gas_limit(gas_limit);
        }

        let _guard = self.queue.acquire(wallet.address()).await;
        let (unsigned, tx_info) = builder.build(wallet).await?;
        let signed = unsigned.sign(wallet, &tx_info)?;
        info!(
            address = %wallet.address(),
            sequence = tx_info.sequence,
            messages = signed.body.messages.len(),
            "submitting transaction"
        );
        Ok(broadcaster.broadcast(&signed).await?)
    }

    pub async fn create_deployment(
        &self,
        wallet: &Wallet,
        spec: &DeploymentSpec,
        deposit: &str,
    ) -> Result<BroadcastResult, Error> {
        //! Create a deployment owned by the wallet account.
        let message =
            self.messages
                .build_create_deployment(wallet.address().as_ref(), spec, deposit)?;
        self.submit(wallet, vec![message], Some(DEPLOYMENT_GAS_LIMIT))
            .await
    }

    pub async fn close_deployment(
        &self,
        wallet: &Wallet,
        dseq: u64,
    ) -> Result<BroadcastResult, Error> {
        //! Close a deployment of the wallet account.
        let message = self
            .messages
            .build_close_deployment(wallet.address().as_ref(), dseq)?;
        self.submit(wallet, vec![message], None).await
    }

    pub async fn create_bid(
        &self,
        wallet: &Wallet,
        order_id: &OrderId,
        price: &str,
    ) -> Result<BroadcastResult, Error> {
        //! Bid on an order as the provider owning the wallet.
        let message = self
            .messages
            .build_create_bid(wallet.address().as_ref(), order_id, price)?;
        self.submit(wallet, vec![message], None).await
    }

    pub async fn create_lease(
        &self,
        wallet: &Wallet,
        bid_id: &BidId,
    ) -> Result<BroadcastResult, Error> {
        //! Accept a bid as the tenant owning the wallet.
        let message = self.messages.build_create_lease(
            wallet.address().as_ref(),
            bid_id.provider.as_ref(),
            bid_id,
        )?;
        self.submit(wallet, vec![message], None).await
    }
}
