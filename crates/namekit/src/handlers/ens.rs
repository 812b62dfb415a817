//! Handler for ENS .eth names.
//!
//! ENS splits custody across three contracts. The registry holds the
//! working owner of every node, the base registrar tokenizes
//! second-level labels, and the name wrapper holds both when a name is
//! wrapped. `get_registration` reconciles all three, preferring the
//! wrapper only when every source agrees it is in charge. Commit/reveal
//! is mandatory for this family.

use super::{require_sld, required_read, token_id, HandlerConfig, RegistryFamily};
use crate::contracts::{self, EnsController, EnsRegistrar, Erc137Registry, NameWrapper};
use crate::error::{NameError, Result};
use crate::gateway::{CallResult, ControllerGateway};
use crate::options::{RegisterOptions, RenewOptions, TransferOptions, TxOptions};
use crate::resolver;
use alloy_primitives::{fixed_bytes, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use namekit_provider::{contract_address, ChainProvider, ContractRole, PendingTransaction};
use namekit_types::{
    labelhash, AddressValue, CoinType, Domain, Ownership, Price, RecordQuery, RecordUpdate,
    RecordValues, Registration, RegistrationSource, RegistrationStatus,
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Capability id of the ENS registration surface.
const CAPABILITY: FixedBytes<4> = fixed_bytes!("612e8c09");

struct EnsCtx {
    provider: Arc<dyn ChainProvider>,
    registry: Address,
    registrar: Address,
    name_wrapper: Address,
    default_resolver: Address,
    multi_resolver: Address,
    gateway: ControllerGateway,
}

impl EnsCtx {
    fn resolve(config: &HandlerConfig) -> Result<Self> {
        let HandlerConfig { network, provider } = config.clone();
        Ok(EnsCtx {
            registry: contract_address(network, ContractRole::EnsRegistry)?,
            registrar: contract_address(network, ContractRole::EnsRegistrar)?,
            name_wrapper: contract_address(network, ContractRole::EnsNameWrapper)?,
            default_resolver: contract_address(network, ContractRole::EnsResolver)?,
            multi_resolver: contract_address(network, ContractRole::MultiRegistryResolver)?,
            gateway: ControllerGateway::new(network, provider.clone())?,
            provider,
        })
    }

    // The name wrapper is the controllable that advertises ENS
    // controllers, so it rides in the registrar slot.
    async fn controller_calls(
        &self,
        node: B256,
        calls: Vec<Bytes>,
    ) -> Result<(Vec<CallResult>, Address)> {
        self.gateway
            .multicall(self.registry, self.name_wrapper, node, CAPABILITY, calls)
            .await
    }

    async fn find_controller(&self, node: B256) -> Result<Address> {
        self.gateway
            .find_controller(self.registry, self.name_wrapper, node, CAPABILITY)
            .await
    }
}

/// Everything the controller needs for a commitment or registration.
struct EnsRegistrationData {
    label: String,
    parent: B256,
    owner: Address,
    duration: U256,
    secret: B256,
    resolver: Address,
    data: Vec<Bytes>,
    signer: Address,
}

async fn registration_data(
    ctx: &EnsCtx,
    domain: &Domain,
    options: &RegisterOptions,
) -> Result<EnsRegistrationData> {
    let (sld, parent) = require_sld(domain, "registration")?;
    let secret = options.secret.ok_or(NameError::MissingOption("secret"))?;
    let duration = options.duration.ok_or(NameError::MissingOption("duration"))?;
    let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
    let owner = options.owner.unwrap_or(signer);
    let resolver = options.resolver.unwrap_or(ctx.default_resolver);

    // Seed the resolver with an ETH address record during registration.
    let mut update = RecordUpdate::default();
    update
        .address
        .insert(CoinType::ETH, AddressValue::Eth(owner));
    let data = resolver::encode_record_update(domain, &update)?;

    Ok(EnsRegistrationData {
        label: sld.to_string(),
        parent,
        owner,
        duration,
        secret,
        resolver,
        data,
        signer,
    })
}

pub(crate) struct EnsHandler {
    ctx: RwLock<Arc<EnsCtx>>,
}

impl EnsHandler {
    pub fn new(config: HandlerConfig) -> Result<Self> {
        Ok(EnsHandler {
            ctx: RwLock::new(Arc::new(EnsCtx::resolve(&config)?)),
        })
    }

    fn ctx(&self) -> Arc<EnsCtx> {
        self.ctx.read().clone()
    }
}

#[async_trait]
impl RegistryFamily for EnsHandler {
    fn update(&self, config: HandlerConfig) -> Result<()> {
        let next = Arc::new(EnsCtx::resolve(&config)?);
        *self.ctx.write() = next;
        Ok(())
    }

    async fn get_owner(&self, domain: &Domain) -> Result<Address> {
        let ctx = self.ctx();
        if domain.is_tld() {
            let ret =
                contracts::read(&ctx.provider, ctx.registrar, EnsRegistrar::ownerCall {}).await?;
            return Ok(ret.owner);
        }
        Ok(self.get_registration(domain).await?.owner)
    }

    async fn get_manager(&self, domain: &Domain) -> Result<Address> {
        let ctx = self.ctx();
        let node = domain.namehash();
        let wrapper = contracts::read(
            &ctx.provider,
            ctx.name_wrapper,
            NameWrapper::ownerOfCall {
                id: token_id(node),
            },
        );
        let registry = contracts::read(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::ownerCall { node },
        );
        let (wrapper, registry) = tokio::join!(wrapper, registry);
        let wrapper_owner = wrapper?.owner;
        if wrapper_owner != Address::ZERO {
            return Ok(wrapper_owner);
        }
        Ok(registry?.owner)
    }

    async fn set_manager(
        &self,
        domain: &Domain,
        to: Address,
        options: &TxOptions,
    ) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (sld, _) = require_sld(domain, "management")?;
        let registration = self.get_registration(domain).await?;
        if registration.status == RegistrationStatus::Unregistered {
            return Err(NameError::NotRegistered {
                name: domain.name(),
            });
        }
        if registration.source.address == ctx.name_wrapper {
            return Err(NameError::UnsupportedSource {
                operation: "management",
                source_name: registration.source.name,
            });
        }
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        if signer == registration.owner {
            return contracts::send(
                &ctx.provider,
                ctx.registrar,
                EnsRegistrar::reclaimCall {
                    id: token_id(labelhash(sld)),
                    owner: to,
                },
                signer,
                options.value,
            )
            .await;
        }
        let manager = self.get_manager(domain).await?;
        if signer == manager {
            return contracts::send(
                &ctx.provider,
                ctx.registry,
                Erc137Registry::setOwnerCall {
                    node: domain.namehash(),
                    owner: to,
                },
                signer,
                options.value,
            )
            .await;
        }
        Err(NameError::NotAuthorized { signer })
    }

    async fn can_edit_records(&self, domain: &Domain, address: Address) -> Result<bool> {
        Ok(self.get_manager(domain).await? == address)
    }

    async fn get_registration(&self, domain: &Domain) -> Result<Registration> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "registration")?;
        let node = domain.namehash();
        let node_token = token_id(node);
        let label_token = token_id(labelhash(sld));

        let availability = ctx.controller_calls(
            parent,
            vec![EnsController::availableCall {
                name: sld.to_string(),
            }
            .abi_encode()
            .into()],
        );
        let wrapper_data = contracts::read(
            &ctx.provider,
            ctx.name_wrapper,
            NameWrapper::getDataCall { id: node_token },
        );
        let registry_owner = contracts::read(
            &ctx.provider,
            ctx.registry,
            Erc137Registry::ownerCall { node },
        );
        let registrar_owner = contracts::read(
            &ctx.provider,
            ctx.registrar,
            EnsRegistrar::ownerOfCall { id: label_token },
        );
        let registrar_expiry = contracts::read(
            &ctx.provider,
            ctx.registrar,
            EnsRegistrar::nameExpiresCall { id: label_token },
        );
        let (availability, wrapper_data, registry_owner, registrar_owner, registrar_expiry) =
            tokio::join!(
                availability,
                wrapper_data,
                registry_owner,
                registrar_owner,
                registrar_expiry
            );

        // Availability is advisory; losing the probe degrades the
        // status to unknown instead of failing the whole lookup.
        let status = match availability {
            Ok((results, _)) => match results
                .first()
                .and_then(|r| r.decode::<EnsController::availableCall>())
            {
                Some(ret) if ret.available => RegistrationStatus::Unregistered,
                Some(_) => RegistrationStatus::Registered,
                None => RegistrationStatus::Unknown,
            },
            Err(_) => RegistrationStatus::Unknown,
        };

        let wrapper_data = required_read("wrapper state", wrapper_data)?;
        let registry_owner = required_read("registry owner", registry_owner)?.owner;
        let registrar_owner = registrar_owner.ok().map(|ret| ret.owner);

        let wrapper_source = RegistrationSource {
            name: "ens.nameWrapper".into(),
            address: ctx.name_wrapper,
            id: node_token.to_string(),
        };
        let mut registration = Registration {
            status,
            ownership: Some(Ownership::Emancipated),
            owner: Address::ZERO,
            reserved_for: None,
            expiry: 0,
            source: RegistrationSource {
                name: "ens.registry".into(),
                address: ctx.registry,
                id: node_token.to_string(),
            },
        };

        if wrapper_data.owner != Address::ZERO
            && registry_owner == ctx.name_wrapper
            && registrar_owner == Some(ctx.name_wrapper)
        {
            registration.owner = wrapper_data.owner;
            registration.expiry = wrapper_data.expiry;
            registration.source = wrapper_source;
        } else if let Some(owner) =
            registrar_owner.filter(|o| *o != Address::ZERO && *o != ctx.name_wrapper)
        {
            registration.owner = owner;
            registration.expiry = required_read("expiry of a registered name", registrar_expiry)?
                .expiry
                .saturating_to::<u64>();
            registration.source = RegistrationSource {
                name: "ens.registrar".into(),
                address: ctx.registrar,
                id: label_token.to_string(),
            };
        } else if registration.status == RegistrationStatus::Unregistered {
            registration.owner = wrapper_data.owner;
            registration.expiry = wrapper_data.expiry;
            registration.source = wrapper_source;
        } else {
            registration.owner = registry_owner;
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
                vec![EnsController::rentPriceCall {
                    name: sld.to_string(),
                    duration,
                }
                .abi_encode()
                .into()],
            )
            .await?;
        let price = results
            .first()
            .and_then(|r| r.decode::<EnsController::rentPriceCall>())
            .ok_or(NameError::ControllerRead {
                method: "rentPrice",
                controller,
            })?
            .price;
        Ok(Price::new(price.base, price.premium, true))
    }

    async fn requires_commitment(&self, domain: &Domain) -> Result<bool> {
        require_sld(domain, "registration")?;
        Ok(true)
    }

    async fn get_min_commitment_age(&self, domain: &Domain) -> Result<U256> {
        let ctx = self.ctx();
        let (_, parent) = require_sld(domain, "registration")?;
        let (results, controller) = ctx
            .controller_calls(
                parent,
                vec![EnsController::minCommitmentAgeCall {}.abi_encode().into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<EnsController::minCommitmentAgeCall>())
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
                vec![EnsController::maxCommitmentAgeCall {}.abi_encode().into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<EnsController::maxCommitmentAgeCall>())
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
                vec![EnsController::commitmentsCall { commitment }
                    .abi_encode()
                    .into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<EnsController::commitmentsCall>())
            .ok_or(NameError::ControllerRead {
                method: "commitments",
                controller,
            })?
            .time)
    }

    async fn make_commitment(&self, domain: &Domain, options: &RegisterOptions) -> Result<B256> {
        let ctx = self.ctx();
        let reg = registration_data(&ctx, domain, options).await?;
        let (results, controller) = ctx
            .controller_calls(
                reg.parent,
                vec![EnsController::makeCommitmentCall {
                    name: reg.label,
                    owner: reg.owner,
                    duration: reg.duration,
                    secret: reg.secret,
                    resolver: reg.resolver,
                    data: reg.data,
                    reverseRecord: false,
                    ownerControlledFuses: 0,
                }
                .abi_encode()
                .into()],
            )
            .await?;
        Ok(results
            .first()
            .and_then(|r| r.decode::<EnsController::makeCommitmentCall>())
            .ok_or(NameError::ControllerRead {
                method: "makeCommitment",
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
        let controller = ctx.find_controller(parent).await?;
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        contracts::send(
            &ctx.provider,
            controller,
            EnsController::commitCall { commitment },
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
        let reg = registration_data(&ctx, domain, options).await?;
        let (results, controller) = ctx
            .controller_calls(
                reg.parent,
                vec![EnsController::availableCall {
                    name: reg.label.clone(),
                }
                .abi_encode()
                .into()],
            )
            .await?;
        let available = results
            .first()
            .and_then(|r| r.decode::<EnsController::availableCall>())
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
        contracts::send(
            &ctx.provider,
            controller,
            EnsController::registerCall {
                name: reg.label,
                owner: reg.owner,
                duration: reg.duration,
                secret: reg.secret,
                resolver: reg.resolver,
                data: reg.data,
                reverseRecord: false,
                ownerControlledFuses: 0,
            },
            reg.signer,
            options.value,
        )
        .await
    }

    async fn renew(&self, domain: &Domain, options: &RenewOptions) -> Result<PendingTransaction> {
        let ctx = self.ctx();
        let (sld, parent) = require_sld(domain, "renewal")?;
        let duration = options.duration.ok_or(NameError::MissingOption("duration"))?;
        let controller = ctx.find_controller(parent).await?;
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        contracts::send(
            &ctx.provider,
            controller,
            EnsController::renewCall {
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
        let (sld, _) = require_sld(domain, "transfer")?;
        let registration = self.get_registration(domain).await?;
        if registration.status != RegistrationStatus::Registered {
            return Err(NameError::NotRegistered {
                name: domain.name(),
            });
        }
        let signer = contracts::resolve_signer(&ctx.provider, options.signer).await?;
        let from = options.from.unwrap_or(signer);

        if registration.source.address == ctx.name_wrapper {
            return contracts::send(
                &ctx.provider,
                ctx.name_wrapper,
                NameWrapper::safeTransferFromCall {
                    from,
                    to: options.to,
                    id: token_id(domain.namehash()),
                    amount: U256::from(1u8),
                    data: Bytes::new(),
                },
                signer,
                None,
            )
            .await;
        }
        if registration.source.address == ctx.registrar {
            return contracts::send(
                &ctx.provider,
                ctx.registrar,
                EnsRegistrar::safeTransferFromCall {
                    from,
                    to: options.to,
                    id: token_id(labelhash(sld)),
                },
                signer,
                None,
            )
            .await;
        }
        Err(NameError::UnsupportedSource {
            operation: "transfer",
            source_name: registration.source.name,
        })
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
                EnsRegistrar::setResolverCall { resolver },
                signer,
                options.value,
            )
            .await;
        }
        require_sld(domain, "resolver update")?;
        let registration = self.get_registration(domain).await?;
        if registration.source.address == ctx.name_wrapper {
            return contracts::send(
                &ctx.provider,
                ctx.name_wrapper,
                NameWrapper::setResolverCall {
                    node: domain.namehash(),
                    resolver,
                },
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
