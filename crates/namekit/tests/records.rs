//! Record reads and writes against a scripted provider.
//!
//! Reads ride the multi-registry resolver relay, so a whole query is
//! one `resolve` call whose reply carries a positional `bytes` slot per
//! requested value. Writes go straight to the resolver returned by the
//! family registry.

use alloy_primitives::{address, Address, Bytes};
use alloy_sol_types::{sol, SolCall, SolValue};
use namekit::{
    contract_address, AddressValue, CoinType, ContractRole, NameClient, NameError, Record,
    RecordData, RecordQuery, RecordType, RecordUpdate, TxOptions,
};
use namekit_dnscodec::{encode_rrsets, encoded_name};
use namekit_provider::testing::StubProvider;
use namekit_types::namehash;
use std::net::Ipv4Addr;
use std::sync::Arc;

sol! {
    contract MultiResolver {
        function resolve(address registry, bytes calldata name, bytes[] calldata data) external view returns (bytes[] memory returnData, address resolver);
    }

    contract Aggregator {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Call3Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Call3Result[] memory returnData);
    }

    contract Profile {
        function setText(bytes32 node, string calldata key, string calldata value) external;
        function setAddr(bytes32 node, address addr) external;
        function name(bytes32 node) external view returns (string memory name);
        function multicall(bytes[] calldata data) external returns (bytes[] memory results);
    }

    contract RecordRegistry {
        function resolver(bytes32 node) external view returns (address resolver);
    }
}

const NETWORK: u64 = 1;
const SIGNER: Address = address!("00000000000000000000000000000000000000A1");
const RESOLVER: Address = address!("00000000000000000000000000000000000000E7");

fn deployment(role: ContractRole) -> Address {
    contract_address(NETWORK, role).unwrap()
}

fn client() -> (Arc<StubProvider>, NameClient) {
    let stub = Arc::new(StubProvider::new(NETWORK).with_signer(SIGNER));
    let client = NameClient::new(NETWORK, stub.clone());
    (stub, client)
}

/// Scripts the relay's reply: one `bytes` slot per requested value.
fn route_resolve(stub: &StubProvider, slots: Vec<Bytes>) {
    stub.set_return(
        deployment(ContractRole::MultiRegistryResolver),
        MultiResolver::resolveCall::SELECTOR,
        (slots, RESOLVER).abi_encode_params(),
    );
}

#[tokio::test]
async fn text_lookup_makes_one_relayed_roundtrip() {
    let (stub, client) = client();
    route_resolve(
        &stub,
        vec![Bytes::from("https://example.com".to_string().abi_encode())],
    );

    let value = client.get_text("site.hello", "url").await.unwrap();
    assert_eq!(value.as_deref(), Some("https://example.com"));

    let reads = stub.reads();
    assert_eq!(reads.len(), 1);
    let aggregate = Aggregator::aggregate3Call::abi_decode(&reads[0].data, true).unwrap();
    assert_eq!(aggregate.calls.len(), 1);
    assert_eq!(
        aggregate.calls[0].target,
        deployment(ContractRole::MultiRegistryResolver)
    );
    let relayed =
        MultiResolver::resolveCall::abi_decode(&aggregate.calls[0].callData, true).unwrap();
    assert_eq!(relayed.registry, deployment(ContractRole::NamekitRegistry));
    assert_eq!(
        relayed.name,
        Bytes::from(encoded_name("site.hello").unwrap())
    );
    assert_eq!(relayed.data.len(), 1);
}

#[tokio::test]
async fn missing_record_slots_read_as_absent() {
    let (stub, client) = client();
    route_resolve(&stub, vec![Bytes::new(), Bytes::new(), Bytes::new()]);

    let query = RecordQuery {
        text: vec!["avatar".to_string()],
        address: vec![CoinType::ETH],
        content_hash: true,
        ..Default::default()
    };
    let values = client.get_records("site.hello", &query).await.unwrap();
    assert_eq!(values.text.get("avatar"), Some(&None));
    assert_eq!(values.address.get(&CoinType::ETH), Some(&None));
    assert!(values.content_hash.is_none());
    assert!(values.dns.is_empty());
}

#[tokio::test]
async fn dns_records_decode_from_relay_reply() {
    let (stub, client) = client();
    let record = Record::new(
        "site.hello",
        RecordType::A,
        300,
        RecordData::A(Ipv4Addr::new(1, 2, 3, 4)),
    );
    let wire = encode_rrsets(std::slice::from_ref(&record)).unwrap();
    route_resolve(&stub, vec![Bytes::from(wire).abi_encode().into()]);

    let records = client
        .get_dns("site.hello", vec![RecordType::A.into()])
        .await
        .unwrap();
    assert_eq!(records, vec![record]);
}

#[tokio::test]
async fn mismatched_slot_count_is_rejected() {
    let (stub, client) = client();
    route_resolve(&stub, vec![Bytes::new(), Bytes::new()]);

    let err = client.get_text("site.hello", "url").await.unwrap_err();
    match err {
        NameError::Provider(source) => {
            assert!(source.to_string().contains("2 resolver replies"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn single_update_sends_direct_call() {
    let (stub, client) = client();
    stub.set_return(
        deployment(ContractRole::NamekitRegistry),
        RecordRegistry::resolverCall::SELECTOR,
        RESOLVER.abi_encode(),
    );

    client
        .set_text("site.hello", "url", "https://example.com", &TxOptions::default())
        .await
        .unwrap();

    let txs = stub.transactions();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].to, RESOLVER);
    assert_eq!(txs[0].from, Some(SIGNER));
    let call = Profile::setTextCall::abi_decode(&txs[0].data, true).unwrap();
    assert_eq!(call.node, namehash("site.hello").unwrap());
    assert_eq!(call.key, "url");
    assert_eq!(call.value, "https://example.com");
}

#[tokio::test]
async fn multi_value_update_wraps_in_resolver_multicall() {
    let (stub, client) = client();
    stub.set_return(
        deployment(ContractRole::NamekitRegistry),
        RecordRegistry::resolverCall::SELECTOR,
        RESOLVER.abi_encode(),
    );

    let mut update = RecordUpdate::default();
    update
        .text
        .insert("url".to_string(), "https://example.com".to_string());
    update
        .address
        .insert(CoinType::ETH, AddressValue::Eth(SIGNER));
    client
        .set_records("site.hello", &update, &TxOptions::default())
        .await
        .unwrap();

    let txs = stub.transactions();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].to, RESOLVER);
    let call = Profile::multicallCall::abi_decode(&txs[0].data, true).unwrap();
    assert_eq!(call.data.len(), 2);
    let text = Profile::setTextCall::abi_decode(&call.data[0], true).unwrap();
    assert_eq!(text.key, "url");
    let addr = Profile::setAddrCall::abi_decode(&call.data[1], true).unwrap();
    assert_eq!(addr.addr, SIGNER);
}

#[tokio::test]
async fn empty_update_is_rejected_before_any_read() {
    let (stub, client) = client();
    let err = client
        .set_records("site.hello", &RecordUpdate::default(), &TxOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, NameError::NothingToSet));
    assert!(stub.reads().is_empty());
}

#[tokio::test]
async fn update_without_a_resolver_is_rejected() {
    let (stub, client) = client();
    stub.set_return(
        deployment(ContractRole::NamekitRegistry),
        RecordRegistry::resolverCall::SELECTOR,
        Address::ZERO.abi_encode(),
    );

    let err = client
        .set_text("site.hello", "url", "https://example.com", &TxOptions::default())
        .await
        .unwrap_err();
    match err {
        NameError::NoResolver { name } => assert_eq!(name, "site.hello"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(stub.transactions().is_empty());
}

#[tokio::test]
async fn reverse_names_prefer_ens_then_forever() {
    let (stub, client) = client();
    let holder = address!("00000000000000000000000000000000000000AB");
    let hex = hex::encode(holder);
    let reverse = format!("{hex}.addr.reverse");
    let node = namehash(&reverse).unwrap();
    let mrr = deployment(ContractRole::MultiRegistryResolver);

    // All three families relay through the same resolver deployment, so
    // routing keys off the full calldata, which differs per registry.
    let calldata = |registry: Address| {
        MultiResolver::resolveCall {
            registry,
            name: encoded_name(&reverse).unwrap().into(),
            data: vec![Profile::nameCall { node }.abi_encode().into()],
        }
        .abi_encode()
    };
    let reply = |name: &str| {
        (vec![Bytes::from(name.to_string().abi_encode())], RESOLVER).abi_encode_params()
    };
    let empty = (vec![Bytes::new()], Address::ZERO).abi_encode_params();

    stub.set_return_exact(
        mrr,
        calldata(deployment(ContractRole::EnsRegistry)),
        reply("me.eth"),
    );
    stub.set_return_exact(
        mrr,
        calldata(deployment(ContractRole::ForeverRegistry)),
        reply("me.forever"),
    );
    stub.set_return_exact(
        mrr,
        calldata(deployment(ContractRole::NamekitRegistry)),
        empty.clone(),
    );
    assert_eq!(
        client.get_name(holder).await.unwrap().as_deref(),
        Some("me.eth")
    );

    stub.set_return_exact(
        mrr,
        calldata(deployment(ContractRole::EnsRegistry)),
        empty.clone(),
    );
    assert_eq!(
        client.get_name(holder).await.unwrap().as_deref(),
        Some("me.forever")
    );

    stub.set_return_exact(
        mrr,
        calldata(deployment(ContractRole::ForeverRegistry)),
        empty,
    );
    assert_eq!(client.get_name(holder).await.unwrap(), None);
}
