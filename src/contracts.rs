//! USDT0 OFT and ERC20 ABI definitions
//!
//! Uses alloy's sol! macro to generate typed structs, call encoders and the
//! `OFTSent` event used to recover the LayerZero message GUID.

#![allow(clippy::too_many_arguments)]

use alloy::primitives::Bytes;
use alloy::sol;

sol! {
    #![sol(all_derives)]

    /// LayerZero OFT SendParam struct
    struct SendParam {
        uint32 dstEid;
        bytes32 to;
        uint256 amountLD;
        uint256 minAmountLD;
        bytes extraOptions;
        bytes composeMsg;
        bytes oftCmd;
    }

    /// LayerZero MessagingFee struct
    struct MessagingFee {
        uint256 nativeFee;
        uint256 lzTokenFee;
    }

    struct MessagingReceipt {
        bytes32 guid;
        uint64 nonce;
        MessagingFee fee;
    }

    struct OFTReceipt {
        uint256 amountSentLD;
        uint256 amountReceivedLD;
    }

    /// USDT0 OFT interface (subset used for bridging)
    interface IOFT {
        function quoteSend(SendParam sendParam, bool payInLzToken) external view returns (MessagingFee);

        function send(SendParam sendParam, MessagingFee fee, address refundAddress)
            external payable returns (MessagingReceipt, OFTReceipt);

        /// Emitted on the source chain; `guid` is the LayerZero message GUID
        event OFTSent(
            bytes32 indexed guid,
            uint32 dstEid,
            address indexed fromAddress,
            uint256 amountSentLD,
            uint256 amountReceivedLD
        );
    }

    /// ERC20 allowance/approve/balance subset
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// LayerZero executor options format version
const OPTIONS_TYPE_3: u16 = 3;
/// Executor worker ID
const EXECUTOR_WORKER_ID: u8 = 1;
/// Executor lzReceive option type
const OPTION_TYPE_LZRECEIVE: u8 = 1;

/// Build the `extraOptions` field for a send.
///
/// Without a destination gas limit the OFT's enforced options apply and the
/// field is empty. With one, a type-3 executor `lzReceive` option carrying the
/// gas limit (as uint128) is encoded.
pub fn build_extra_options(dst_gas_limit: Option<u128>) -> Bytes {
    let Some(gas) = dst_gas_limit else {
        return Bytes::new();
    };

    let option = gas.to_be_bytes();
    let mut out = Vec::with_capacity(2 + 1 + 2 + 1 + option.len());
    out.extend_from_slice(&OPTIONS_TYPE_3.to_be_bytes());
    out.push(EXECUTOR_WORKER_ID);
    out.extend_from_slice(&((option.len() + 1) as u16).to_be_bytes());
    out.push(OPTION_TYPE_LZRECEIVE);
    out.extend_from_slice(&option);
    Bytes::from(out)
}
