//! Typed contract bindings and thin call helpers.
//!
//! Return values are decoded against these signatures directly, so a
//! malformed response surfaces as an ABI error instead of being read
//! field-by-field off a loose tuple.

use crate::error::Result;
use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use namekit_provider::{ChainProvider, PendingTransaction, ReadCall, TransactionRequest};
use std::sync::Arc;

sol! {
    /// ERC-137 registry, shared by every family.
    contract Erc137Registry {
        function setRecord(bytes32 node, address owner, address resolver, uint64 ttl) external;
        function setSubnodeRecord(bytes32 node, bytes32 label, address owner, address resolver, uint64 ttl) external;
        function setSubnodeOwner(bytes32 node, bytes32 label, address owner) external returns (bytes32);
        function setResolver(bytes32 node, address resolver) external;
        function setOwner(bytes32 node, address owner) external;
        function setTTL(bytes32 node, uint64 ttl) external;
        function setApprovalForAll(address operator, bool approved) external;
        function owner(bytes32 node) external view returns (address owner);
        function resolver(bytes32 node) external view returns (address resolver);
        function ttl(bytes32 node) external view returns (uint64 ttl);
        function recordExists(bytes32 node) external view returns (bool exists);
    }
}

sol! {
    /// Aggregating read gateway that locates a name's resolver before
    /// relaying resolution calls to it.
    contract MultiRegistryResolver {
        function resolve(address registry, bytes calldata name, bytes[] calldata data) external view returns (bytes[] memory returnData, address resolver);
    }
}

sol! {
    /// Read gateway that locates a registry's controller by capability
    /// and relays probe calls to it.
    contract ControllerResolver {
        struct CallOutcome {
            bytes data;
            bool success;
        }

        error ControllerNotFound(address registry, bytes32 node);
        error UnsupportedControllable(address controllable);

        function multicall(address registry, address registrar, bytes32 node, bytes4 capability, bytes[] calldata calls) external view returns (CallOutcome[] memory returnData, address controller);
        function findController(address registry, address registrar, bytes32 node, bytes4 capability) external view returns (address controller);
    }
}

sol! {
    /// Controller for the standard family, keyed by parent node.
    #[derive(Debug)]
    contract StandardController {
        function supportsInterface(bytes4 interfaceId) external view returns (bool supported);
        function availabilityInfo(bytes32 node, string calldata name) external view returns (uint8 status, address reservedFor);
        function requireCommitReveal(bytes32 node) external view returns (bool required);
        function rentPrice(bytes32 node, string calldata name, uint256 duration) external view returns (uint256 price);
        function minCommitmentAge() external view returns (uint256 age);
        function maxCommitmentAge() external view returns (uint256 age);
        function commitments(bytes32 commitment) external view returns (uint256 time);
        function makeCommitmentWithConfig(bytes32 node, string calldata name, address owner, bytes32 secret, address resolver, address addr) external pure returns (bytes32 commitment);
        function commit(bytes32 commitment) external;
        function registerWithConfig(bytes32 node, string calldata name, address owner, uint256 duration, bytes32 secret, address resolver, address addr) external payable;
        function registerReservedWithConfig(bytes32 node, string calldata name, address owner, uint256 duration, address resolver, address addr) external payable;
        function registerNow(bytes32 node, string calldata name, address owner, uint256 duration, address resolver, address addr) external payable;
        function renew(bytes32 node, string calldata name, uint256 duration) external payable;
    }
}

sol! {
    /// ENS .eth registration controller.
    contract EnsController {
        error CommitmentTooNew(bytes32 commitment);
        error CommitmentTooOld(bytes32 commitment);
        error NameNotAvailable(string name);
        error DurationTooShort(uint256 duration);
        error ResolverRequiredWhenDataSupplied();
        error UnexpiredCommitmentExists(bytes32 commitment);
        error InsufficientValue();
        error Unauthorised(bytes32 node);
        error MaxCommitmentAgeTooLow();
        error MaxCommitmentAgeTooHigh();

        struct RentPrice {
            uint256 base;
            uint256 premium;
        }

        function rentPrice(string calldata name, uint256 duration) external view returns (RentPrice memory price);
        function available(string calldata name) external view returns (bool available);
        function minCommitmentAge() external view returns (uint256 age);
        function maxCommitmentAge() external view returns (uint256 age);
        function commitments(bytes32 commitment) external view returns (uint256 time);
        function makeCommitment(string calldata name, address owner, uint256 duration, bytes32 secret, address resolver, bytes[] calldata data, bool reverseRecord, uint16 ownerControlledFuses) external pure returns (bytes32 commitment);
        function commit(bytes32 commitment) external;
        function register(string calldata name, address owner, uint256 duration, bytes32 secret, address resolver, bytes[] calldata data, bool reverseRecord, uint16 ownerControlledFuses) external payable;
        function renew(string calldata name, uint256 duration) external payable;
    }
}

sol! {
    /// Controller for the forever family; no expiry, no duration.
    contract ForeverController {
        function available(string calldata name) external view returns (bool available);
        function requireCommitReveal() external view returns (bool required);
        function price(string calldata name) external view returns (uint256 amount);
        function minCommitmentAge() external view returns (uint256 age);
        function maxCommitmentAge() external view returns (uint256 age);
        function commitments(bytes32 commitment) external view returns (uint256 time);
        function makeCommitmentWithConfig(string calldata name, address owner, bytes32 secret, address resolver, address addr) external pure returns (bytes32 commitment);
        function commit(bytes32 commitment) external;
        function registerWithConfig(string calldata name, address owner, bytes32 secret, address resolver, address addr) external payable;
    }
}

sol! {
    /// Standard-family registrar; tokens are full namehashes and TLD
    /// nodes are managed through the `*Node` entry points.
    contract StandardRegistrar {
        function ownerOf(uint256 tokenId) external view returns (address owner);
        function ownerOfNode(bytes32 node) external view returns (address owner);
        function nameExpires(uint256 tokenId) external view returns (uint256 expiry);
        function safeTransferFrom(address from, address to, uint256 tokenId) external;
        function transferNodeOwnership(bytes32 node, address owner) external;
        function setResolver(bytes32 node, address resolver) external;
        function reclaim(bytes32 node, bytes32 label, address owner) external;
    }
}

sol! {
    /// ENS .eth base registrar; tokens are second-level labelhashes.
    contract EnsRegistrar {
        function ownerOf(uint256 id) external view returns (address owner);
        function nameExpires(uint256 id) external view returns (uint256 expiry);
        function owner() external view returns (address owner);
        function safeTransferFrom(address from, address to, uint256 id) external;
        function setResolver(address resolver) external;
        function reclaim(uint256 id, address owner) external;
    }
}

sol! {
    /// Forever-family registrar; tokens are second-level labelhashes.
    contract ForeverRegistrar {
        function ownerOf(uint256 id) external view returns (address owner);
        function nameExpires(uint256 id) external view returns (uint256 expiry);
        function owner() external view returns (address owner);
        function safeTransferFrom(address from, address to, uint256 id) external;
        function setResolver(address resolver) external;
        function reclaim(uint256 id, address owner) external;
    }
}

sol! {
    /// ENS name wrapper, an ERC-1155 over wrapped names.
    contract NameWrapper {
        function getData(uint256 id) external view returns (address owner, uint32 fuses, uint64 expiry);
        function ownerOf(uint256 id) external view returns (address owner);
        function safeTransferFrom(address from, address to, uint256 id, uint256 amount, bytes calldata data) external;
        function setResolver(bytes32 node, address resolver) external;
    }
}

sol! {
    /// ERC-721 wrapper over standard-family TLD ownership.
    contract RootWrapper {
        function ownerOf(uint256 id) external view returns (address owner);
        function safeTransferFrom(address from, address to, uint256 id) external;
    }
}

sol! {
    /// Pre-wrapper root contract; still the source of emancipation state.
    contract LegacyRoot {
        function locked(bytes32 node) external view returns (bool locked);
    }
}

sol! {
    /// Public resolver profile used for record reads and writes.
    contract PublicResolver {
        function addr(bytes32 node) external view returns (address addr);
        function addr(bytes32 node, uint256 coinType) external view returns (bytes memory addr);
        function setAddr(bytes32 node, address addr) external;
        function setAddr(bytes32 node, uint256 coinType, bytes calldata addr) external;
        function text(bytes32 node, string calldata key) external view returns (string memory value);
        function setText(bytes32 node, string calldata key, string calldata value) external;
        function contenthash(bytes32 node) external view returns (bytes memory hash);
        function setContenthash(bytes32 node, bytes calldata hash) external;
        function name(bytes32 node) external view returns (string memory name);
        function setName(bytes32 node, string calldata name) external;
        function dnsRecord(bytes32 node, bytes32 name, uint16 resource) external view returns (bytes memory data);
        function setDNSRecords(bytes32 node, bytes calldata data) external;
        function multicall(bytes[] calldata data) external returns (bytes[] memory results);
    }
}

/// Executes a typed read against `to` and decodes the return.
pub(crate) async fn read<C>(
    provider: &Arc<dyn ChainProvider>,
    to: Address,
    call: C,
) -> Result<C::Return>
where
    C: SolCall + Send,
{
    let data = call.abi_encode();
    let returned = provider.call(ReadCall { to, data: data.into() }).await?;
    Ok(C::abi_decode_returns(&returned, true)?)
}

/// Signs and submits a typed call as a transaction from `from`.
pub(crate) async fn send<C>(
    provider: &Arc<dyn ChainProvider>,
    to: Address,
    call: C,
    from: Address,
    value: Option<U256>,
) -> Result<PendingTransaction>
where
    C: SolCall + Send,
{
    let tx = TransactionRequest {
        to,
        data: call.abi_encode().into(),
        value: value.unwrap_or(U256::ZERO),
        from: Some(from),
    };
    Ok(provider.send_transaction(tx).await?)
}

/// An explicit signer, or the provider default.
pub(crate) async fn resolve_signer(
    provider: &Arc<dyn ChainProvider>,
    explicit: Option<Address>,
) -> Result<Address> {
    match explicit {
        Some(signer) => Ok(signer),
        None => Ok(provider.default_signer().await?),
    }
}
