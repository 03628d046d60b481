//! Akash chain messages and their construction from high-level intents.
//!
//! Every [`Message`] serializes with a `@type` discriminator holding the
//! fully qualified message name, followed by the fixed field set of that
//! message. Field names here are a wire contract and must not be renamed.

use crate::address::{AccountAddress, AddressError};
use crate::canonical::{to_canonical_vec, CanonicalError};
use crate::coin::{AmountError, Coin, NATIVE_DENOM};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Deployment identifier.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentId {
    /// Deployment owner
    pub owner: AccountAddress,
    /// Deployment sequence number. Zero lets the chain assign one.
    #[serde_as(as = "DisplayFromStr")]
    pub dseq: u64,
}

/// Group identifier.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupId {
    /// Deployment owner
    pub owner: AccountAddress,
    /// Deployment sequence number
    #[serde_as(as = "DisplayFromStr")]
    pub dseq: u64,
    /// Group sequence number
    pub gseq: u32,
}

/// Order identifier.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderId {
    /// Deployment owner
    pub owner: AccountAddress,
    /// Deployment sequence number
    #[serde_as(as = "DisplayFromStr")]
    pub dseq: u64,
    /// Group sequence number
    pub gseq: u32,
    /// Order sequence number
    pub oseq: u32,
}

/// Bid identifier: an order plus the bidding provider.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidId {
    /// Deployment owner
    pub owner: AccountAddress,
    /// Deployment sequence number
    #[serde_as(as = "DisplayFromStr")]
    pub dseq: u64,
    /// Group sequence number
    pub gseq: u32,
    /// Order sequence number
    pub oseq: u32,
    /// Provider address
    pub provider: AccountAddress,
}

impl OrderId {
    pub fn new(group: &GroupId, oseq: u32) -> Self {
        //! Identify order `oseq` of a group.
        Self {
            owner: group.owner.clone(),
            dseq: group.dseq,
            gseq: group.gseq,
            oseq,
        }
    }

    pub fn group_id(&self) -> GroupId {
        //! Group this order belongs to.
        GroupId {
            owner: self.owner.clone(),
            dseq: self.dseq,
            gseq: self.gseq,
        }
    }
}

impl BidId {
    pub fn new(order: &OrderId, provider: AccountAddress) -> Self {
        //! Identify the bid of `provider` on `order`.
        Self {
            owner: order.owner.clone(),
            dseq: order.dseq,
            gseq: order.gseq,
            oseq: order.oseq,
            provider,
        }
    }
}

/// High-level deployment description (a typed subset of SDL).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Placement groups
    pub groups: Vec<GroupSpec>,
}

/// Group of identical resources placed on a single provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    /// Group name
    pub name: String,
    /// Provider requirements
    #[serde(default)]
    pub requirements: PlacementRequirements,
    /// Requested resources
    pub resources: Vec<ResourceSpec>,
}

/// Requirements a provider must satisfy to bid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequirements {
    /// Required auditor signatures
    #[serde(default)]
    pub signed_by: SignedBy,
    /// Required provider attributes
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

/// Auditor signature requirements.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBy {
    /// All of these auditors must have signed
    #[serde(default)]
    pub all_of: Vec<String>,
    /// At least one of these auditors must have signed
    #[serde(default)]
    pub any_of: Vec<String>,
}

/// Key-value attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name
    pub key: String,
    /// Attribute value
    pub value: String,
}

/// One requested resource profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// CPU in thousandths of a core
    pub cpu_millis: u32,
    /// Memory in bytes
    pub memory_bytes: u64,
    /// Storage volumes
    pub storage: Vec<StorageSpec>,
    /// Number of instances
    pub count: u32,
    /// Maximal price per block, e.g. `"1000uakt"`
    pub price: String,
}

/// Storage volume request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSpec {
    /// Volume name
    pub name: String,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Resource quantity as transmitted on chain.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceValue {
    /// Quantity
    #[serde_as(as = "DisplayFromStr")]
    pub val: u64,
}

/// CPU request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    /// Thousandths of a core
    pub units: ResourceValue,
}

/// Memory request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    /// Bytes
    pub quantity: ResourceValue,
}

/// Storage request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    /// Volume name
    pub name: String,
    /// Bytes
    pub quantity: ResourceValue,
}

/// Full resource set of one unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    /// CPU
    pub cpu: Cpu,
    /// Memory
    pub memory: Memory,
    /// Storage volumes
    pub storage: Vec<Storage>,
}

/// Resource unit: resources, instance count and price.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUnit {
    /// Resources of a single instance
    pub resources: Resources,
    /// Number of instances
    pub count: u32,
    /// Maximal price
    pub price: Coin,
}

/// Group specification as transmitted on chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpecMsg {
    /// Group name
    pub name: String,
    /// Provider requirements
    pub requirements: PlacementRequirements,
    /// Resource units
    pub resources: Vec<ResourceUnit>,
}

/// `MsgCreateDeployment`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateDeployment {
    /// Deployment identifier
    pub id: DeploymentId,
    /// Placement groups
    pub groups: Vec<GroupSpecMsg>,
    /// Base64 of the canonical deployment description
    pub version: String,
    /// Escrow deposit
    pub deposit: Coin,
    /// Deposit payer
    pub depositor: AccountAddress,
}

/// `MsgCloseDeployment`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCloseDeployment {
    /// Deployment identifier
    pub id: DeploymentId,
}

/// `MsgCreateBid`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateBid {
    /// Order to bid on
    pub order: OrderId,
    /// Bidding provider
    pub provider: AccountAddress,
    /// Offered price
    pub price: Coin,
}

/// `MsgCreateLease`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateLease {
    /// Accepted bid
    pub bid_id: BidId,
}

/// Chain message, tagged with its fully qualified type name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Message {
    /// Create a deployment
    #[serde(rename = "/akash.deployment.v1beta3.MsgCreateDeployment")]
    CreateDeployment(MsgCreateDeployment),
    /// Close a deployment
    #[serde(rename = "/akash.deployment.v1beta3.MsgCloseDeployment")]
    CloseDeployment(MsgCloseDeployment),
    /// Bid on an order
    #[serde(rename = "/akash.market.v1beta4.MsgCreateBid")]
    CreateBid(MsgCreateBid),
    /// Accept a bid
    #[serde(rename = "/akash.market.v1beta4.MsgCreateLease")]
    CreateLease(MsgCreateLease),
}

impl Message {
    pub const fn type_url(&self) -> &'static str {
        //! Fully qualified message name.
        match self {
            Self::CreateDeployment(_) => "/akash.deployment.v1beta3.MsgCreateDeployment",
            Self::CloseDeployment(_) => "/akash.deployment.v1beta3.MsgCloseDeployment",
            Self::CreateBid(_) => "/akash.market.v1beta4.MsgCreateBid",
            Self::CreateLease(_) => "/akash.market.v1beta4.MsgCreateLease",
        }
    }

    pub const fn signer(&self) -> &AccountAddress {
        //! Account that must authorize this message.
        match self {
            Self::CreateDeployment(msg) => &msg.id.owner,
            Self::CloseDeployment(msg) => &msg.id.owner,
            Self::CreateBid(msg) => &msg.provider,
            Self::CreateLease(msg) => &msg.bid_id.owner,
        }
    }
}

/// Builds chain messages, validating amounts against the native denomination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBuilder {
    denom: String,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new(NATIVE_DENOM)
    }
}

impl MessageBuilder {
    pub fn new<S: Into<String>>(denom: S) -> Self {
        //! Create a builder for the given native denomination.
        Self {
            denom: denom.into(),
        }
    }

    pub fn denom(&self) -> &str {
        //! Native denomination.
        &self.denom
    }

    pub fn build_create_deployment(
        &self,
        owner: &str,
        spec: &DeploymentSpec,
        deposit: &str,
    ) -> Result<Message, MessageError> {
        //! Create a deployment described by `spec`, escrowing `deposit`.
        let owner: AccountAddress = owner.parse()?;
        let deposit = Coin::parse_native(deposit, &self.denom)?;
        if spec.groups.is_empty() {
            return Err(MessageError::InvalidSpec("deployment has no groups".to_string()));
        }
        let groups = spec
            .groups
            .iter()
            .map(|group| self.expand_group(group))
            .collect::<Result<Vec<_>, _>>()?;
        let version = STANDARD.encode(to_canonical_vec(spec)?);
        Ok(Message::CreateDeployment(MsgCreateDeployment {
            id: DeploymentId {
                owner: owner.clone(),
                dseq: 0,
            },
            groups,
            version,
            deposit,
            depositor: owner,
        }))
    }

    pub fn build_close_deployment(&self, owner: &str, dseq: u64) -> Result<Message, MessageError> {
        //! Close an existing deployment.
        Ok(Message::CloseDeployment(MsgCloseDeployment {
            id: DeploymentId {
                owner: owner.parse()?,
                dseq,
            },
        }))
    }

    pub fn build_create_bid(
        &self,
        bidder: &str,
        order_id: &OrderId,
        price: &str,
    ) -> Result<Message, MessageError> {
        //! Place a bid of `price` on an order.
        Ok(Message::CreateBid(MsgCreateBid {
            order: order_id.clone(),
            provider: bidder.parse()?,
            price: Coin::parse_native(price, &self.denom)?,
        }))
    }

    pub fn build_create_lease(
        &self,
        tenant: &str,
        provider: &str,
        bid_id: &BidId,
    ) -> Result<Message, MessageError> {
        //! Accept a bid, creating a lease between `tenant` and `provider`.
        let tenant: AccountAddress = tenant.parse()?;
        let provider: AccountAddress = provider.parse()?;
        if bid_id.owner != tenant {
            return Err(MessageError::Mismatch {
                field: "owner",
                expected: tenant.to_bech32(),
                got: bid_id.owner.to_bech32(),
            });
        }
        if bid_id.provider != provider {
            return Err(MessageError::Mismatch {
                field: "provider",
                expected: provider.to_bech32(),
                got: bid_id.provider.to_bech32(),
            });
        }
        Ok(Message::CreateLease(MsgCreateLease {
            bid_id: bid_id.clone(),
        }))
    }

    fn expand_group(&self, group: &GroupSpec) -> Result<GroupSpecMsg, MessageError> {
        if group.resources.is_empty() {
            return Err(MessageError::InvalidSpec(format!(
                "group {:?} requests no resources",
                group.name
            )));
        }
        let resources = group
            .resources
            .iter()
            .map(|unit| {
                if unit.count == 0 {
                    return Err(MessageError::InvalidSpec(format!(
                        "group {:?} has a resource with zero count",
                        group.name
                    )));
                }
                Ok(ResourceUnit {
                    resources: Resources {
                        cpu: Cpu {
                            units: ResourceValue {
                                val: unit.cpu_millis.into(),
                            },
                        },
                        memory: Memory {
                            quantity: ResourceValue {
                                val: unit.memory_bytes,
                            },
                        },
                        storage: unit
                            .storage
                            .iter()
                            .map(|volume| Storage {
                                name: volume.name.clone(),
                                quantity: ResourceValue {
                                    val: volume.size_bytes,
                                },
                            })
                            .collect(),
                    },
                    count: unit.count,
                    price: Coin::parse_native(&unit.price, &self.denom)?,
                })
            })
            .collect::<Result<Vec<_>, MessageError>>()?;
        Ok(GroupSpecMsg {
            name: group.name.clone(),
            requirements: group.requirements.clone(),
            resources,
        })
    }
}

/// Message construction errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum MessageError {
    /// Amount is malformed or not in the native denomination.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
    /// Account address is malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),
    /// Deployment specification is not acceptable.
    #[error("Invalid deployment specification: {0}")]
    InvalidSpec(String),
    /// Identifier does not belong to the given party.
    #[error("Mismatched {field}: expected {expected}, got {got}")]
    Mismatch {
        /// Field name
        field: &'static str,
        /// Expected value
        expected: String,
        /// Provided value
        got: String,
    },
    /// Deployment description could not be encoded.
    #[error("Failed to encode: {0}")]
    Encoding(#[from] CanonicalError),
}
