//! Handler for the forever registry family.
//!
//! Forever names are bought once and never expire, so the whole
//! renewal surface is absent and registrations carry no expiry. Token
//! ids are second-level labelhashes and the controller is asked per
//! deployment, not per TLD, whether commit/reveal applies.

use super::{require_sld, token_id, HandlerConfig, RegistryFamily};
use crate::contracts::{self, Erc137Registry, ForeverController, ForeverRegistrar};
use crate::error::{NameError, Result};
use crate::gateway::{CallResult, ControllerGateway};
use crate::options::{RegisterOptions, RenewOptions, TransferOptions, TxOptions};
use crate::resolver;
use alloy_primitives::{fixed_bytes, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use namekit_provider::{contract_address, ChainProvider, ContractRole, PendingTransaction};
use namekit_types::{
    labelhash, Domain, Ownership, Price, RecordQuery, RecordUpdate, RecordValues, Registration,
    RegistrationSource, RegistrationStatus,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Capability id of the forever registration surface.
const CAPABILITY: FixedBytes<4> = fixed_bytes!("a608d7c6");

struct ForeverCtx {
    provider: Arc<dyn ChainProvider>,
    registry: Address,
    registrar: Address,
    default_resolver: Address,
    multi_resolver: Address,
    gateway: ControllerGateway,
}

impl ForeverCtx {
    fn resolve(config: &HandlerConfig) -> Result<Self> {
        let HandlerConfig { network, provider } = config.clone();
        Ok(ForeverCtx {
            registry: contract_address(network, ContractRole::ForeverRegistry)?,
            registrar: contract_address(network, ContractRole::ForeverRegistrar)?,
            default_resolver: contract_address(network, ContractRole::ForeverResolver)?,
            multi_resolver: contract_address(network, ContractRole::MultiRegistryResolver)?,
            gateway: ControllerGateway::new(network, provider.clone())?,
            provider,
        })
    }

    async fn controller_calls(
        &self,
        node: B256,
        calls: Vec<Bytes>,
    ) -> Result<(Vec<CallResult>, Address)> {
        self.gateway
            .multicall(self.registry, self.registrar, node, CAPABILITY, calls)
            .await
    }
}

/// Whether this deployment's controller insists on commit/reveal.
/// An unreadable answer means the commit flow applies.
async fn probe_commit_reveal(ctx: &ForeverCtx, parent: B256) -> Result<(bool, Address)> {
    let (results, controller) = ctx
        .controller_calls(
            parent,
            vec![ForeverController::requireCommitRevealCall {}.abi_encode().into()],
        )
        .await?;
    let required = results
        .first()
        .and_then(|r| r.decode::<ForeverController::requireCommitRevealCall>())
        .map(|ret| ret.required)
        .unwrap_or(true);
    Ok((required, controller))
}

pub(crate) struct ForeverHandler {
    ctx: RwLock<Arc<ForeverCtx>>,
}

impl ForeverHandler {
    pub fn new(config: HandlerConfig) -> Result<Self> {
        Ok(ForeverHandler {
            ctx: RwLock::new(Arc::new(ForeverCtx::resolve(&config)?)),
        })
    }

    fn ctx(&self) -> Arc<ForeverCtx> {
        self.ctx.read().clone()
    }
}

#[async_trait]
impl RegistryFamily for ForeverHandler {
    fn update(&self, config: HandlerConfig) -> Result<()> {
        let next = Arc::new(ForeverCtx::resolve(&config)?);
        *self.ctx.write() = next;
        Ok(())
    }

    async fn get_owner(&self, domain: &Domain) -> Result<Address> {
        let ctx = self.ctx();
        if domain.is_tld() {
            let ret =
                contracts::read(&ctx.provider, ctx.registrar, ForeverRegistrar::ownerCall {})
                    .await?;
            return Ok(ret.owner);
        }
        let Some(label_hash) = domain.sld_hash() else {
            return Err(NameError::UnsupportedNode {
                operation: "ownership lookup",
                name: domain.name(),
            });
        };
        let ret = contracts::read(
            &ctx.provider,
            ctx.registrar,
            ForeverRegistrar::ownerOfCall {
                id: token_id(label_hash),
            },
        )
        .await?;
        Ok(ret.owner)
    }

    async fn get_manager(&self, domain: &Domain) -> Result<Address> {
        let ctx = self.ctx();
        require_sld(domain, "management")?;
        let ret = contracts::read(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::ownerCall {
                node: domain.namehash(),
            },
        )
        .await?;
        Ok(ret.owner)
    }

    async fn set_manager(
        &self,
        domain: &Domain,
        to: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (sld, _) = require_sld(domain, "management")?;
        let node = domain.namehash();
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let owner = contracts::read(
            &ctx.provider,
            ctx.registrar,
            ForeverRegistrar::ownerOfCall {
                id: token_id(labelhash(sld)),
            },
        )
        .await?
        .owner;
        if signer == owner {
            return contracts::send(
                &ctx.provider,
                ctx.registrar,
                ForeverRegistrar::reclaimCall {
                    id: token_id(labelhash(sld)),
                    owner: to,
                },
                signer,
                options.value,
            )
            .await;
        }
        let manager = contracts::read(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::ownerCall { node },
        )
        .await?
        .owner;
        if signer == manager {
            return contracts::send(
                &ctx.provider,
                ctx.registry,
                Erc137Registry::setOwnerCall { node, owner: to },
                signer,
                options.value,
            )
            .await;
        }
        Err(NameError::NotAuthorized { signer })
    }

    async fn can_edit_records(&self, domain: &Domain, address: Address) -> Result<bool> {
        let ctx = self.ctx();
        let ret = contracts::read(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::ownerCall {
                node: domain.namehash(),
            },
        )
        .await?;
        Ok(ret.owner == address)
    }

    async fn get_registration(&self, domain: &Domain) -> Result<Registration> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "registration")?;
        let label_token = token_id(labelhash(sld));

        let availability = ctx.controller_calls(
            parent,
            vec![ForeverController::availableCall {
                name: sld.to_string(),
            }
            .abi_encode()
            .into()],
        );
        let owner = contracts::read(
            &ctx.provider,
            ctx.registrar,
            ForeverRegistrar::ownerOfCall { id: label_token },
        );
        let (availability, owner) = tokio::join!(availability, owner);

        let (results, controller) = availability?;
        let available = results
            .first()
            .and_then(|r| r.decode::<ForeverController::availableCall>())
            .ok_or_else(|| NameError::UnsupportedController {
                controller,
                tld: domain.tld().to_string(),
            })?
            .available;

        Ok(Registration {
            status: if available {
                RegistrationStatus::Unregistered
            } else {
                RegistrationStatus::Registered
            },
            ownership: Some(Ownership::Emancipated),
            owner: owner.map(|ret| ret.owner).unwrap_or(Address::ZERO),
            reserved_for: None,
            expiry: 0,
            source: RegistrationSource {
                name: "forever.registrar".into(),
                address: ctx.registrar,
                id: label_token.to_string(),
            },
        })
    }

    async fn get_price(&self, domain: &Domain, _duration: Option<U256>) -> Result<Price> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "registration")?;
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![ForeverController::priceCall {
                    name: sld.to_string(),
                }
                .abi_encode()
                .into()],
            )
            .await?;
        let amount = results
            .first()
            .and_then(|r| r.decode::<ForeverController::priceCall>())
            .ok_or(NameError::ControllerRead {
                method: "price",
                controller,
            })?
            .amount;
        Ok(Price::new(amount, U256::ZERO, false))
    }

    async fn requires_commitment(&self, domain: &Domain) -> Result<bool> {
        let ctx = self.ctx();
        let (_, parent) = require_sld(domain, "registration")?;
        let (required, _) = probe_commit_reveal(&ctx, parent).await?;
        Ok(required)
    }

    async fn get_min_commitment_age(&self, domain: &Domain) -> Result<U256> {
        let ctx = self.ctx();
        let (_, parent) = require_sld(domain, "registration")?;
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![ForeverController::minCommitmentAgeCall {}.abi_encode().into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<ForeverController::minCommitmentAgeCall>())
            .ok_or(NameError::ControllerRead {
                method: "minCommitmentAge",
                controller,
            })?
            .age)
    }

    async fn get_max_commitment_age(&self, domain: &Domain) -> Result<U256> {
        let ctx = self.ctx();
        let (_, parent) = require_sld(domain, "registration")?;
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![ForeverController::maxCommitmentAgeCall {}.abi_encode().into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<ForeverController::maxCommitmentAgeCall>())
            .ok_or(NameError::ControllerRead {
                method: "maxCommitmentAge",
                controller,
            })?
            .age)
    }

    async fn get_commitment_time(&self, domain: &Domain, commitment: B256) -> Result<U256> {
        let ctx = self.ctx();
        let (_, parent) = require_sld(domain, "registration")?;
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![ForeverController::commitmentsCall { commitment }
                    .abi_encode()
                    .into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<ForeverController::commitmentsCall>())
            .ok_or(NameError::ControllerRead {
                method: "commitments",
                controller,
            })?
            .time)
    }

    async fn make_commitment(&self, domain: &Domain, options: &RegisterOptions) -> Result<B256> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "registration")?;
        let secret = options.secret.ok_or(NameError::MissingOption("secret"))?;
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let owner = options.owner.unwrap_or(signer);
        let resolver = options.resolver.unwrap_or(ctx.default_resolver);
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![ForeverController::makeCommitmentWithConfigCall {
                    name: sld.to_string(),
                    owner,
                    secret,
                    resolver,
                    addr: owner,
                }
                .abi_encode()
                .into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<ForeverController::makeCommitmentWithConfigCall>())
            .ok_or(NameError::ControllerRead {
                method: "makeCommitmentWithConfig",
                controller,
            })?
            .commitment)
    }

    async fn commit(
        &self,
        domain: &Domain,
        commitment: B256,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (_, parent) = require_sld(domain, "registration")?;
        let (required, controller) = probe_commit_reveal(&ctx, parent).await?;
        if !required {
            return Err(NameError::CommitmentNotRequired);
        }
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        contracts::send(
            &ctx.provider,
            controller,
            ForeverController::commitCall { commitment },
            signer,
            options.value,
        )
        .await
    }

    async fn register(
        &self,
        domain: &Domain,
        options: &RegisterOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "registration")?;
        let calls = vec![
            ForeverController::availableCall {
                name: sld.to_string(),
            }
            .abi_encode()
            .into(),
            ForeverController::requireCommitRevealCall {}.abi_encode().into(),
        ];
        let (results, controller) = ctx.controller_calls(parent, calls).await?;
        let available = results
            .first()
            .and_then(|r| r.decode::<ForeverController::availableCall>())
            .ok_or_else(|| NameError::UnsupportedController {
                controller,
                tld: domain.tld().to_string(),
            })?
            .available;
        if !available {
            return Err(NameError::AlreadyTaken {
                name: domain.name(),
            });
        }
        let required = results
            .get(1)
            .and_then(|r| r.decode::<ForeverController::requireCommitRevealCall>())
            .map(|ret| ret.required)
            .unwrap_or(true);

        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let owner = options.owner.unwrap_or(signer);
        let resolver = options.resolver.unwrap_or(ctx.default_resolver);
        let secret = if required {
            options.secret.ok_or(NameError::MissingOption("secret"))?
        } else {
            B256::ZERO
        };
        contracts::send(
            &ctx.provider,
            controller,
            ForeverController::registerWithConfigCall {
                name: sld.to_string(),
                owner,
                secret,
                resolver,
                addr: owner,
            },
            signer,
            options.value,
        )
        .await
    }

    async fn renew(&self, domain: &Domain, _options: &RenewOptions) -> Result<PendingTransaction> {
        Err(NameError::NotRenewable {
            tld: domain.tld().to_string(),
        })
    }

    async fn transfer(
        &self,
        domain: &Domain,
        options: &TransferOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (sld, _) = require_sld(domain, "transfer")?;
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let from = options.from.unwrap_or(signer);
        contracts::send(
            &ctx.provider,
            ctx.registrar,
            ForeverRegistrar::safeTransferFromCall {
                from,
                to: options.to,
                id: token_id(labelhash(sld)),
            },
            signer,
            None,
        )
        .await
    }

    async fn get_resolver(&self, domain: &Domain) -> Result<Address> {
        let ctx = self.ctx();
        let ret = contracts::read(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::resolverCall {
                node: domain.namehash(),
            },
        )
        .await?;
        Ok(ret.resolver)
    }

    async fn set_resolver(
        &self,
        domain: &Domain,
        resolver: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        if domain.is_tld() {
            return contracts::send(
                &ctx.provider,
                ctx.registrar,
                ForeverRegistrar::setResolverCall { resolver },
                signer,
                options.value,
            )
            .await;
        }
        contracts::send(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::setResolverCall {
                node: domain.namehash(),
                resolver,
            },
            signer,
            options.value,
        )
        .await
    }

    async fn get_records(&self, domain: &Domain, query: &RecordQuery) -> Result<RecordValues> {
        let ctx = self.ctx();
        resolver::get_records(&ctx.provider, ctx.multi_resolver, ctx.registry, domain, query).await
    }

    async fn set_records(
        &self,
        domain: &Domain,
        update: &RecordUpdate,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        resolver::set_records(&ctx.provider, ctx.registry, signer, domain, update).await
    }

    async fn get_name(&self, domain: &Domain) -> Result<Option<String>> {
        let ctx = self.ctx();
        let Some(sld) = domain.sld() else {
            return Ok(None);
        };
        let hex = sld.strip_prefix("0x").unwrap_or(sld);
        resolver::reverse_lookup(&ctx.provider, ctx.multi_resolver, ctx.registry, hex).await
    }
}
