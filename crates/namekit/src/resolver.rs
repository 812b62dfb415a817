//! Record reads and writes through the resolver layer.
//!
//! Reads go through the multi-registry resolver, which locates the
//! name's resolver and relays every requested profile call in one round
//! trip. The reply is positional: one `bytes` slot per relayed call,
//! empty when the resolver reverted or answered nothing. Writes go
//! straight to the resolver contract, batched with its own `multicall`
//! when an update touches more than one profile.

use crate::contracts::{self, Erc137Registry, MultiRegistryResolver, PublicResolver};
use crate::error::{NameError, Result};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use namekit_dnscodec::{decode_rrsets, encode_rrsets, encoded_name, rrset_id};
use namekit_provider::{ChainProvider, PendingTransaction, ProviderError, TransactionRequest};
use namekit_types::{
    namehash, AddressValue, CoinType, Domain, RawAddress, RawContentHash, RecordQuery,
    RecordUpdate, RecordValues,
};
use std::sync::Arc;

/// Reads every value named by `query` in a single relayed round trip.
pub(crate) async fn get_records(
    provider: &Arc<dyn ChainProvider>,
    multi_resolver: Address,
    registry: Address,
    domain: &Domain,
    query: &RecordQuery,
) -> Result<RecordValues> {
    let node = domain.namehash();
    let default_name = domain.name();
    let mut calls: Vec<Bytes> = Vec::new();

    for rrset in &query.dns {
        let owner = rrset.name.as_deref().unwrap_or(default_name.as_str());
        let (name, resource) = rrset_id(owner, rrset.rtype)?;
        calls.push(
            PublicResolver::dnsRecordCall {
                node,
                name,
                resource,
            }
            .abi_encode()
            .into(),
        );
    }
    for key in &query.text {
        calls.push(
            PublicResolver::textCall {
                node,
                key: key.clone(),
            }
            .abi_encode()
            .into(),
        );
    }
    for coin in &query.address {
        let call = if *coin == CoinType::ETH {
            PublicResolver::addr_0Call { node }.abi_encode()
        } else {
            PublicResolver::addr_1Call {
                node,
                coinType: U256::from(coin.0),
            }
            .abi_encode()
        };
        calls.push(call.into());
    }
    if query.content_hash {
        calls.push(PublicResolver::contenthashCall { node }.abi_encode().into());
    }

    let mut values = RecordValues::default();
    if calls.is_empty() {
        return Ok(values);
    }
    let expected = calls.len();

    let ret = contracts::read(
        provider,
        multi_resolver,
        MultiRegistryResolver::resolveCall {
            registry,
            name: encoded_name(&default_name)?.into(),
            data: calls,
        },
    )
    .await?;
    if ret.returnData.len() != expected {
        return Err(NameError::Provider(ProviderError::Inconsistent {
            message: format!(
                "{} resolver replies for {} record queries",
                ret.returnData.len(),
                expected
            ),
        }));
    }
    let mut slots = ret.returnData.into_iter();

    for _ in &query.dns {
        let slot = slots.next().unwrap_or_default();
        if slot.is_empty() {
            continue;
        }
        let data = PublicResolver::dnsRecordCall::abi_decode_returns(&slot, true)?.data;
        if data.is_empty() {
            continue;
        }
        values.dns.extend(decode_rrsets(&data)?);
    }
    for key in &query.text {
        let slot = slots.next().unwrap_or_default();
        let value = if slot.is_empty() {
            None
        } else {
            let text = PublicResolver::textCall::abi_decode_returns(&slot, true)?.value;
            (!text.is_empty()).then_some(text)
        };
        values.text.insert(key.clone(), value);
    }
    for coin in &query.address {
        let slot = slots.next().unwrap_or_default();
        let value = if slot.is_empty() {
            None
        } else if *coin == CoinType::ETH {
            let addr = PublicResolver::addr_0Call::abi_decode_returns(&slot, true)?.addr;
            Some(AddressValue::Eth(addr))
        } else {
            let raw = PublicResolver::addr_1Call::abi_decode_returns(&slot, true)?.addr;
            (!raw.is_empty()).then(|| AddressValue::Raw(RawAddress(raw)))
        };
        values.address.insert(*coin, value);
    }
    if query.content_hash {
        let slot = slots.next().unwrap_or_default();
        if !slot.is_empty() {
            let hash = PublicResolver::contenthashCall::abi_decode_returns(&slot, true)?.hash;
            if !hash.is_empty() {
                values.content_hash = Some(RawContentHash(hash));
            }
        }
    }
    Ok(values)
}

/// Encodes `update` as resolver calls, in write order: DNS record sets,
/// text values, the content hash, then coin addresses.
pub(crate) fn encode_record_update(domain: &Domain, update: &RecordUpdate) -> Result<Vec<Bytes>> {
    if update.is_empty() {
        return Err(NameError::NothingToSet);
    }
    let node = domain.namehash();
    let mut calls: Vec<Bytes> = Vec::new();

    if !update.dns.is_empty() {
        let data = encode_rrsets(&update.dns)?;
        calls.push(
            PublicResolver::setDNSRecordsCall {
                node,
                data: data.into(),
            }
            .abi_encode()
            .into(),
        );
    }
    for (key, value) in &update.text {
        calls.push(
            PublicResolver::setTextCall {
                node,
                key: key.clone(),
                value: value.clone(),
            }
            .abi_encode()
            .into(),
        );
    }
    if let Some(hash) = &update.content_hash {
        calls.push(
            PublicResolver::setContenthashCall {
                node,
                hash: hash.0.clone(),
            }
            .abi_encode()
            .into(),
        );
    }
    for (coin, value) in &update.address {
        let call = match value {
            AddressValue::Raw(raw) => PublicResolver::setAddr_1Call {
                node,
                coinType: U256::from(coin.0),
                addr: raw.0.clone(),
            }
            .abi_encode(),
            AddressValue::Eth(addr) if *coin == CoinType::ETH => {
                PublicResolver::setAddr_0Call { node, addr: *addr }.abi_encode()
            }
            AddressValue::Eth(_) => {
                return Err(NameError::UnsupportedCoin {
                    coin: coin.to_string(),
                })
            }
        };
        calls.push(call.into());
    }
    Ok(calls)
}

/// Submits `update` to the name's resolver, as one direct call or a
/// resolver multicall when several profiles change together. The
/// resolver comes from the family registry; a zero address means the
/// name cannot hold records yet. Empty and malformed updates are
/// rejected before anything touches the chain.
pub(crate) async fn set_records(
    provider: &Arc<dyn ChainProvider>,
    registry: Address,
    signer: Address,
    domain: &Domain,
    update: &RecordUpdate,
) -> Result<PendingTransaction> {
    let mut calls = encode_record_update(domain, update)?;
    let resolver = contracts::read(
        provider,
        registry,
        Erc137Registry::resolverCall {
            node: domain.namehash(),
        },
    )
    .await?
    .resolver;
    if resolver == Address::ZERO {
        return Err(NameError::NoResolver {
            name: domain.name(),
        });
    }
    let data = if calls.len() == 1 {
        calls.remove(0)
    } else {
        PublicResolver::multicallCall { data: calls }.abi_encode().into()
    };
    let tx = TransactionRequest {
        to: resolver,
        data,
        value: U256::ZERO,
        from: Some(signer),
    };
    Ok(provider.send_transaction(tx).await?)
}

/// Resolves the primary name claimed by an address, from its reverse
/// record under `addr.reverse`. The address hex carries no 0x prefix.
pub(crate) async fn reverse_lookup(
    provider: &Arc<dyn ChainProvider>,
    multi_resolver: Address,
    registry: Address,
    address_hex: &str,
) -> Result<Option<String>> {
    let reverse_name = format!("{address_hex}.addr.reverse");
    let node = namehash(&reverse_name)?;
    let ret = contracts::read(
        provider,
        multi_resolver,
        MultiRegistryResolver::resolveCall {
            registry,
            name: encoded_name(&reverse_name)?.into(),
            data: vec![PublicResolver::nameCall { node }.abi_encode().into()],
        },
    )
    .await?;
    let Some(slot) = ret.returnData.into_iter().next() else {
        return Ok(None);
    };
    if slot.is_empty() {
        return Ok(None);
    }
    let name = PublicResolver::nameCall::abi_decode_returns(&slot, true)?.name;
    Ok((!name.is_empty()).then_some(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use namekit_dnscodec::{Record, RecordData, RecordType};
    use std::net::Ipv4Addr;

    fn domain() -> Domain {
        Domain::parse("example.eth").unwrap()
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = encode_record_update(&domain(), &RecordUpdate::default()).unwrap_err();
        assert!(matches!(err, NameError::NothingToSet));
    }

    #[test]
    fn eth_payload_under_foreign_coin_is_rejected() {
        let mut update = RecordUpdate::default();
        update
            .address
            .insert(CoinType(0), AddressValue::Eth(Address::ZERO));
        let err = encode_record_update(&domain(), &update).unwrap_err();
        assert!(matches!(err, NameError::UnsupportedCoin { .. }));
    }

    #[test]
    fn raw_payload_works_for_any_coin() {
        let mut update = RecordUpdate::default();
        update.address.insert(
            CoinType(0),
            AddressValue::Raw(RawAddress(Bytes::from(vec![0xde, 0xad]))),
        );
        let calls = encode_record_update(&domain(), &update).unwrap();
        assert_eq!(calls.len(), 1);
        let decoded = PublicResolver::setAddr_1Call::abi_decode(&calls[0], true).unwrap();
        assert_eq!(decoded.coinType, U256::ZERO);
        assert_eq!(decoded.addr.as_ref(), &[0xde, 0xad]);
    }

    #[test]
    fn single_text_update_encodes_directly() {
        let mut update = RecordUpdate::default();
        update.text.insert("url".into(), "https://example.com".into());
        let calls = encode_record_update(&domain(), &update).unwrap();
        assert_eq!(calls.len(), 1);
        let decoded = PublicResolver::setTextCall::abi_decode(&calls[0], true).unwrap();
        assert_eq!(decoded.node, domain().namehash());
        assert_eq!(decoded.key, "url");
        assert_eq!(decoded.value, "https://example.com");
    }

    #[test]
    fn update_calls_keep_write_order() {
        let mut update = RecordUpdate::default();
        update.dns.push(Record::new(
            "example.eth",
            RecordType::A,
            3600,
            RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
        ));
        update.text.insert("avatar".into(), "ipfs://x".into());
        update.content_hash = Some(RawContentHash(Bytes::from(vec![0xe3, 0x01])));
        update
            .address
            .insert(CoinType::ETH, AddressValue::Eth(Address::repeat_byte(7)));

        let calls = encode_record_update(&domain(), &update).unwrap();
        let selectors: Vec<[u8; 4]> = calls
            .iter()
            .map(|call| call[..4].try_into().unwrap())
            .collect();
        assert_eq!(
            selectors,
            vec![
                PublicResolver::setDNSRecordsCall::SELECTOR,
                PublicResolver::setTextCall::SELECTOR,
                PublicResolver::setContenthashCall::SELECTOR,
                PublicResolver::setAddr_0Call::SELECTOR,
            ]
        );
    }
}
