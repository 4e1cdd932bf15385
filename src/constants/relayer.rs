//! Relayer Service HTTP endpoints.
pub const RELAYER_CONFIG_PATH: &str = "config";
pub const RELAYER_BLOCKHASH_PATH: &str = "blockhash";
pub const RELAYER_PAYMENT_INSTRUCTION_PATH: &str = "payment-instruction";
pub const RELAYER_SIGN_PATH: &str = "sign";
pub const RELAYER_ORDER_STATUS_PATH: &str = "order-status";
