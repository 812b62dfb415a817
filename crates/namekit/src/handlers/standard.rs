//! Handler for the standard registry family.
//!
//! Standard registries share one registrar whose token ids are full
//! namehashes, manage TLD custody through a root contract (optionally
//! wrapped in an ERC-721), and leave commit/reveal to the controller:
//! a controller may advertise the optional-commitment capability and
//! then answer `requireCommitReveal` per TLD.

use super::{require_sld, required_read, token_id, HandlerConfig, RegistryFamily};
use crate::contracts::{
    self, Erc137Registry, LegacyRoot, RootWrapper, StandardController, StandardRegistrar,
};
use crate::error::{NameError, Result};
use crate::gateway::{Availability, CallResult, ControllerGateway};
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

/// Capability id of the standard registration surface.
const CAPABILITY: FixedBytes<4> = fixed_bytes!("490d5184");
/// Interface id a controller advertises when commit/reveal is optional.
const OPTIONAL_COMMIT_CAPABILITY: FixedBytes<4> = fixed_bytes!("fd7a9152");

struct StandardCtx {
    provider: Arc<dyn ChainProvider>,
    registry: Address,
    registrar: Address,
    root: Address,
    root_wrapper: Address,
    default_resolver: Address,
    multi_resolver: Address,
    gateway: ControllerGateway,
}

impl StandardCtx {
    fn resolve(config: &HandlerConfig) -> Result<Self> {
        let HandlerConfig { network, provider } = config.clone();
        Ok(StandardCtx {
            registry: contract_address(network, ContractRole::NamekitRegistry)?,
            registrar: contract_address(network, ContractRole::NamekitRegistrar)?,
            root: contract_address(network, ContractRole::NamekitRoot)?,
            root_wrapper: contract_address(network, ContractRole::NamekitRootWrapper)?,
            default_resolver: contract_address(network, ContractRole::NamekitResolver)?,
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

/// Who holds a TLD, and whether custody sits in the root wrapper.
async fn tld_owner(ctx: &StandardCtx, domain: &Domain) -> Result<(Address, bool)> {
    let node = domain.namehash();
    let owner = contracts::read(
        &ctx.provider,
        ctx.registrar,
        StandardRegistrar::ownerOfNodeCall { node },
    )
    .await?
    .owner;
    if owner == Address::ZERO {
        return Err(NameError::NotRegistered {
            name: domain.name(),
        });
    }
    if owner != ctx.root_wrapper {
        return Ok((owner, false));
    }
    let wrapped = contracts::read(
        &ctx.provider,
        ctx.root_wrapper,
        RootWrapper::ownerOfCall { id: token_id(node) },
    )
    .await?
    .owner;
    Ok((wrapped, true))
}

/// Whether the controller for `parent` insists on commit/reveal.
///
/// Controllers predating the optional-commitment capability cannot be
/// asked, so anything short of an explicit "not required" means the
/// commit flow applies.
async fn probe_commit_reveal(ctx: &StandardCtx, parent: B256) -> Result<(bool, Address)> {
    let calls = vec![
        StandardController::supportsInterfaceCall {
            interfaceId: OPTIONAL_COMMIT_CAPABILITY,
        }
        .abi_encode()
        .into(),
        StandardController::requireCommitRevealCall { node: parent }
            .abi_encode()
            .into(),
    ];
    let (results, controller) = ctx.controller_calls(parent, calls).await?;
    let supported = results
        .first()
        .and_then(|r| r.decode::<StandardController::supportsInterfaceCall>())
        .ok_or(NameError::ControllerRead {
            method: "supportsInterface",
            controller,
        })?
        .supported;
    if !supported {
        return Ok((true, controller));
    }
    let required = results
        .get(1)
        .and_then(|r| r.decode::<StandardController::requireCommitRevealCall>())
        .map(|ret| ret.required)
        .unwrap_or(true);
    Ok((required, controller))
}

pub(crate) struct StandardHandler {
    ctx: RwLock<Arc<StandardCtx>>,
}

impl StandardHandler {
    pub fn new(config: HandlerConfig) -> Result<Self> {
        Ok(StandardHandler {
            ctx: RwLock::new(Arc::new(StandardCtx::resolve(&config)?)),
        })
    }

    fn ctx(&self) -> Arc<StandardCtx> {
        self.ctx.read().clone()
    }
}

#[async_trait]
impl RegistryFamily for StandardHandler {
    fn update(&self, config: HandlerConfig) -> Result<()> {
        let next = Arc::new(StandardCtx::resolve(&config)?);
        *self.ctx.write() = next;
        Ok(())
    }

    async fn get_owner(&self, domain: &Domain) -> Result<Address> {
        let ctx = self.ctx();
        if domain.is_tld() {
            let (owner, _) = tld_owner(&ctx, domain).await?;
            return Ok(owner);
        }
        let ret = contracts::read(
            &ctx.provider,
            ctx.registrar,
            StandardRegistrar::ownerOfCall {
                tokenId: token_id(domain.namehash()),
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
        let (sld, parent) = require_sld(domain, "management")?;
        let node = domain.namehash();
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let owner = contracts::read(
            &ctx.provider,
            ctx.registrar,
            StandardRegistrar::ownerOfCall {
                tokenId: token_id(node),
            },
        )
        .await?
        .owner;
        if signer == owner {
            // Reclaiming reasserts the token holder as registry owner,
            // so route the new manager through the registrar.
            return contracts::send(
                &ctx.provider,
                ctx.registrar,
                StandardRegistrar::reclaimCall {
                    node: parent,
                    label: labelhash(sld),
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
        let node = domain.namehash();
        let token = token_id(node);

        let availability = ctx.controller_calls(
            parent,
            vec![StandardController::availabilityInfoCall {
                node: parent,
                name: sld.to_string(),
            }
            .abi_encode()
            .into()],
        );
        let owner = contracts::read(
            &ctx.provider,
            ctx.registrar,
            StandardRegistrar::ownerOfCall { tokenId: token },
        );
        let expiry = contracts::read(
            &ctx.provider,
            ctx.registrar,
            StandardRegistrar::nameExpiresCall { tokenId: token },
        );
        let locked = contracts::read(
            &ctx.provider,
            ctx.root,
            LegacyRoot::lockedCall {
                node: domain.tld_hash(),
            },
        );
        let (availability, owner, expiry, locked) =
            tokio::join!(availability, owner, expiry, locked);

        let (results, controller) = availability?;
        let info = results
            .first()
            .and_then(|r| r.decode::<StandardController::availabilityInfoCall>())
            .ok_or_else(|| NameError::UnsupportedController {
                controller,
                tld: domain.tld().to_string(),
            })?;

        let mut registration = Registration {
            status: RegistrationStatus::Unregistered,
            ownership: locked?.locked.then_some(Ownership::Emancipated),
            owner: Address::ZERO,
            reserved_for: None,
            expiry: 0,
            source: RegistrationSource {
                name: "namekit.registrar".into(),
                address: ctx.registrar,
                id: token.to_string(),
            },
        };
        match Availability::from(info.status) {
            Availability::Taken => {
                registration.status = RegistrationStatus::Registered;
                registration.owner = required_read("owner of a registered name", owner)?.owner;
                registration.expiry = required_read("expiry of a registered name", expiry)?
                    .expiry
                    .saturating_to::<u64>();
            }
            Availability::Reserved => {
                registration.status = RegistrationStatus::Reserved;
                registration.reserved_for = Some(info.reservedFor);
            }
            Availability::Closed => registration.status = RegistrationStatus::Closed,
            Availability::Available | Availability::Other(_) => {}
        }
        Ok(registration)
    }

    async fn get_price(&self, domain: &Domain, duration: Option<U256>) -> Result<Price> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "registration")?;
        let duration = duration.ok_or(NameError::MissingOption("duration"))?;
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![StandardController::rentPriceCall {
                    node: parent,
                    name: sld.to_string(),
                    duration,
                }
                .abi_encode()
                .into()],
            )
            .await?;
        let price = results
            .first()
            .and_then(|r| r.decode::<StandardController::rentPriceCall>())
            .ok_or(NameError::ControllerRead {
                method: "rentPrice",
                controller,
            })?
            .price;
        Ok(Price::new(price, U256::ZERO, true))
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
                vec![StandardController::minCommitmentAgeCall {}.abi_encode().into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<StandardController::minCommitmentAgeCall>())
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
                vec![StandardController::maxCommitmentAgeCall {}.abi_encode().into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<StandardController::maxCommitmentAgeCall>())
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
                vec![StandardController::commitmentsCall { commitment }
                    .abi_encode()
                    .into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<StandardController::commitmentsCall>())
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
                vec![StandardController::makeCommitmentWithConfigCall {
                    node: parent,
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
            .and_then(|r| r.decode::<StandardController::makeCommitmentWithConfigCall>())
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
            StandardController::commitCall { commitment },
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
            StandardController::availabilityInfoCall {
                node: parent,
                name: sld.to_string(),
            }
            .abi_encode()
            .into(),
            StandardController::supportsInterfaceCall {
                interfaceId: OPTIONAL_COMMIT_CAPABILITY,
            }
            .abi_encode()
            .into(),
            StandardController::requireCommitRevealCall { node: parent }
                .abi_encode()
                .into(),
        ];
        let (results, controller) = ctx.controller_calls(parent, calls).await?;
        let info = results
            .first()
            .and_then(|r| r.decode::<StandardController::availabilityInfoCall>())
            .ok_or_else(|| NameError::UnsupportedController {
                controller,
                tld: domain.tld().to_string(),
            })?;

        let availability = Availability::from(info.status);
        match availability {
            Availability::Taken => {
                return Err(NameError::AlreadyTaken {
                    name: domain.name(),
                })
            }
            Availability::Closed => {
                return Err(NameError::RegistrationsClosed {
                    tld: domain.tld().to_string(),
                })
            }
            _ => {}
        }
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        if availability == Availability::Reserved && info.reservedFor != signer {
            return Err(NameError::ReservedForOther {
                name: domain.name(),
                reserved_for: info.reservedFor,
                signer,
            });
        }
        let owner = options.owner.unwrap_or(signer);
        let resolver = options.resolver.unwrap_or(ctx.default_resolver);
        let duration = options.duration.ok_or(NameError::MissingOption("duration"))?;

        if availability == Availability::Reserved {
            return contracts::send(
                &ctx.provider,
                controller,
                StandardController::registerReservedWithConfigCall {
                    node: parent,
                    name: sld.to_string(),
                    owner,
                    duration,
                    resolver,
                    addr: owner,
                },
                signer,
                options.value,
            )
            .await;
        }

        let optional_commit = results
            .get(1)
            .and_then(|r| r.decode::<StandardController::supportsInterfaceCall>())
            .map(|ret| ret.supported)
            .unwrap_or(false);
        let skip_reveal = optional_commit
            && results
                .get(2)
                .and_then(|r| r.decode::<StandardController::requireCommitRevealCall>())
                .map(|ret| !ret.required)
                .unwrap_or(false);
        if skip_reveal {
            return contracts::send(
                &ctx.provider,
                controller,
                StandardController::registerNowCall {
                    node: parent,
                    name: sld.to_string(),
                    owner,
                    duration,
                    resolver,
                    addr: owner,
                },
                signer,
                options.value,
            )
            .await;
        }

        let secret = options.secret.ok_or(NameError::MissingOption("secret"))?;
        contracts::send(
            &ctx.provider,
            controller,
            StandardController::registerWithConfigCall {
                node: parent,
                name: sld.to_string(),
                owner,
                duration,
                secret,
                resolver,
                addr: owner,
            },
            signer,
            options.value,
        )
        .await
    }

    async fn renew(&self, domain: &Domain, options: &RenewOptions) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "renewal")?;
        let duration = options.duration.ok_or(NameError::MissingOption("duration"))?;
        let controller = ctx
            .gateway
            .find_controller(ctx.registry, ctx.registrar, parent, CAPABILITY)
            .await?;
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        contracts::send(
            &ctx.provider,
            controller,
            StandardController::renewCall {
                node: parent,
                name: sld.to_string(),
                duration,
            },
            signer,
            options.value,
        )
        .await
    }

    async fn transfer(
        &self,
        domain: &Domain,
        options: &TransferOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        if domain.is_subdomain() {
            return Err(NameError::UnsupportedNode {
                operation: "transfer",
                name: domain.name(),
            });
        }
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let from = options.from.unwrap_or(signer);
        let node = domain.namehash();

        if domain.is_tld() {
            let (_, wrapped) = tld_owner(&ctx, domain).await?;
            if wrapped {
                return contracts::send(
                    &ctx.provider,
                    ctx.root_wrapper,
                    RootWrapper::safeTransferFromCall {
                        from,
                        to: options.to,
                        id: token_id(node),
                    },
                    signer,
                    None,
                )
                .await;
            }
            return contracts::send(
                &ctx.provider,
                ctx.registrar,
                StandardRegistrar::transferNodeOwnershipCall {
                    node,
                    owner: options.to,
                },
                signer,
                None,
            )
            .await;
        }
        contracts::send(
            &ctx.provider,
            ctx.registrar,
            StandardRegistrar::safeTransferFromCall {
                from,
                to: options.to,
                tokenId: token_id(node),
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
        if domain.is_tld() {
            return Err(NameError::UnsupportedNode {
                operation: "resolver update",
                name: domain.name(),
            });
        }
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
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
