//! Solidity ABI interfaces the engine encodes against.

use alloy_sol_types::sol;

sol! {
    /// ERC-4337 v0.7 packed user operation.
    #[derive(Debug, PartialEq, Eq)]
    struct PackedUserOperation {
        address sender;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        bytes32 accountGasLimits;
        uint256 preVerificationGas;
        bytes32 gasFees;
        bytes paymasterAndData;
        bytes signature;
    }

    /// ERC-7579 batch execution element.
    #[derive(Debug, PartialEq, Eq)]
    struct Execution {
        address target;
        uint256 value;
        bytes callData;
    }

    interface IEntryPoint {
        /// Revert carrying the counterfactual sender from `getSenderAddress`.
        error SenderAddressResult(address sender);

        function getSenderAddress(bytes initCode) external;
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }

    interface IAccountFactory {
        function computeAccountAddress(address eoaOwner, uint256 index, address[] attesters, uint8 threshold)
            external
            view
            returns (address expectedAddress);
        function createAccount(address eoaOwner, uint256 index, address[] attesters, uint8 threshold)
            external
            payable
            returns (address account);
    }

    interface IERC7579Account {
        function execute(bytes32 mode, bytes executionCalldata) external payable;
        function installModule(uint256 moduleTypeId, address module, bytes initData) external payable;
        function uninstallModule(uint256 moduleTypeId, address module, bytes deInitData) external payable;
    }

    interface IERC1271 {
        function isValidSignature(bytes32 hash, bytes signature) external view returns (bytes4 magicValue);
    }
}
